use crate::form::{field, FieldLimits, FormFields};
use crate::ValidationError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Discriminant of a [`PendingSubmission`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionKind {
    Simple,
    Publish,
}

impl std::fmt::Display for SubmissionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SubmissionKind::Simple => f.write_str("simple"),
            SubmissionKind::Publish => f.write_str("publish"),
        }
    }
}

/// Title and description captured by the post form, waiting for media.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSubmission {
    pub title: String,
    pub description: String,
    pub submitted_at: DateTime<Utc>,
}

impl PostSubmission {
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            submitted_at: Utc::now(),
        }
    }

    pub fn from_fields(fields: &FormFields, limits: &FieldLimits) -> Result<Self, ValidationError> {
        Ok(Self::new(
            fields.required(field::TITLE, limits.title)?,
            fields.required(field::DESCRIPTION, limits.description)?,
        ))
    }
}

/// An item offered for publication by a role holder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishSubmission {
    pub item_name: String,
    pub description: String,
    pub model_file_url: String,
    pub texture_file_url: String,
    pub submitted_at: DateTime<Utc>,
}

impl PublishSubmission {
    pub fn from_fields(fields: &FormFields, limits: &FieldLimits) -> Result<Self, ValidationError> {
        Ok(Self {
            item_name: fields.required(field::ITEM_NAME, limits.title)?,
            description: fields.required(field::DESCRIPTION, limits.description)?,
            model_file_url: fields.required(field::MODEL_FILE, limits.url)?,
            texture_file_url: fields.required(field::TEXTURE_FILE, limits.url)?,
            submitted_at: Utc::now(),
        })
    }
}

/// The single unfinished submission a user may have at any time.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingSubmission {
    Simple(PostSubmission),
    Publish(PublishSubmission),
}

impl PendingSubmission {
    pub fn kind(&self) -> SubmissionKind {
        match self {
            PendingSubmission::Simple(_) => SubmissionKind::Simple,
            PendingSubmission::Publish(_) => SubmissionKind::Publish,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            PendingSubmission::Simple(post) => &post.title,
            PendingSubmission::Publish(item) => &item.item_name,
        }
    }

    pub fn submitted_at(&self) -> DateTime<Utc> {
        match self {
            PendingSubmission::Simple(post) => post.submitted_at,
            PendingSubmission::Publish(item) => item.submitted_at,
        }
    }
}

impl From<PostSubmission> for PendingSubmission {
    fn from(post: PostSubmission) -> Self {
        PendingSubmission::Simple(post)
    }
}

impl From<PublishSubmission> for PendingSubmission {
    fn from(item: PublishSubmission) -> Self {
        PendingSubmission::Publish(item)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn publish_fields() -> FormFields {
        FormFields::new()
            .with(field::ITEM_NAME, "Lantern")
            .with(field::DESCRIPTION, "A brass lantern")
            .with(field::MODEL_FILE, "https://cdn.example/lantern.glb")
            .with(field::TEXTURE_FILE, "https://cdn.example/lantern.png")
    }

    #[test]
    fn test_post_from_fields() {
        let fields = FormFields::new()
            .with(field::TITLE, "Sunset")
            .with(field::DESCRIPTION, "Taken last night");
        let post = PostSubmission::from_fields(&fields, &FieldLimits::default()).unwrap();
        assert_eq!(post.title, "Sunset");
        assert_eq!(PendingSubmission::from(post).kind(), SubmissionKind::Simple);
    }

    #[test]
    fn test_post_description_limit() {
        let fields = FormFields::new()
            .with(field::TITLE, "Sunset")
            .with(field::DESCRIPTION, "x".repeat(1001));
        assert!(matches!(
            PostSubmission::from_fields(&fields, &FieldLimits::default()),
            Err(ValidationError::FieldTooLong {
                field: "description",
                ..
            })
        ));
    }

    #[test]
    fn test_publish_requires_texture() {
        let mut fields = publish_fields();
        fields = fields.with(field::TEXTURE_FILE, "");
        assert_eq!(
            PublishSubmission::from_fields(&fields, &FieldLimits::default()),
            Err(ValidationError::MissingField("texture_file"))
        );
    }

    #[test]
    fn test_publish_kind_and_title() {
        let item = PublishSubmission::from_fields(&publish_fields(), &FieldLimits::default())
            .unwrap();
        let pending = PendingSubmission::from(item);
        assert_eq!(pending.kind(), SubmissionKind::Publish);
        assert_eq!(pending.title(), "Lantern");
    }
}
