use serde::{Deserialize, Serialize};

/// A labelled value shown under a notice.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoticeField {
    pub name: String,
    pub value: String,
}

/// Rich content delivered to the reviewer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    /// Plain text sent alongside the rich body
    pub headline: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<NoticeField>,
}

impl Notice {
    pub fn new(
        headline: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            headline: headline.into(),
            title: title.into(),
            description: description.into(),
            image_url: None,
            fields: Vec::new(),
        }
    }

    pub fn with_image(mut self, url: Option<String>) -> Self {
        self.image_url = url;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(NoticeField {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
    }
}
