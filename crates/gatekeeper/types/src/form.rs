use crate::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Field names used by the three forms.
pub mod field {
    pub const TITLE: &str = "title";
    pub const DESCRIPTION: &str = "description";
    pub const ITEM_NAME: &str = "item_name";
    pub const MODEL_FILE: &str = "model_file";
    pub const TEXTURE_FILE: &str = "texture_file";
    pub const USERNAME: &str = "username";
    pub const USER_ID: &str = "user_id";
    pub const PORTFOLIO: &str = "portfolio";
    pub const ACKNOWLEDGMENT: &str = "acknowledgment";
}

/// Maximum character counts accepted for free-text fields.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldLimits {
    pub title: usize,
    pub description: usize,
    pub url: usize,
}

impl Default for FieldLimits {
    fn default() -> Self {
        Self {
            title: 100,
            description: 1000,
            url: 2048,
        }
    }
}

/// The forms a user can be shown and can submit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormKind {
    /// Title and description, followed by a media message
    Post,
    /// Role-gated item publication
    Publish,
    /// Identity verification leading to a role grant
    Verify,
}

impl FormKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Post => "post",
            FormKind::Publish => "publish",
            FormKind::Verify => "verify",
        }
    }
}

impl std::fmt::Display for FormKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raw values of a submitted form, keyed by field name.
///
/// The transport fills this in however it renders its input controls;
/// the core only reads named values out of it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormFields(HashMap<String, String>);

impl FormFields {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(name).map(String::as_str)
    }

    /// Trimmed, non-empty value no longer than `max` characters.
    pub fn required(&self, name: &'static str, max: usize) -> Result<String, ValidationError> {
        let value = self
            .get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .ok_or(ValidationError::MissingField(name))?;
        if value.chars().count() > max {
            return Err(ValidationError::FieldTooLong { field: name, max });
        }
        Ok(value.to_string())
    }

    /// Trimmed value, `None` when absent or blank.
    pub fn optional(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FormFields {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
