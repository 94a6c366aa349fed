use crate::form::{field, FieldLimits, FormFields};
use crate::ValidationError;
use serde::{Deserialize, Serialize};

/// Identity details a user submits to become verified.
///
/// Only a record with `acknowledgment == true` may reach the ledger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationRecord {
    pub external_username: String,
    /// Opaque; never parsed as a number.
    pub external_user_id: String,
    pub portfolio_link: String,
    pub acknowledgment: bool,
}

impl VerificationRecord {
    pub fn new(
        external_username: impl Into<String>,
        external_user_id: impl Into<String>,
        portfolio_link: impl Into<String>,
        acknowledgment: bool,
    ) -> Self {
        Self {
            external_username: external_username.into().trim().to_string(),
            external_user_id: external_user_id.into().trim().to_string(),
            portfolio_link: portfolio_link.into().trim().to_string(),
            acknowledgment,
        }
    }

    /// Build a record from the verify form.
    ///
    /// The acknowledgment field must equal `phrase`, ignoring case and
    /// surrounding whitespace. It is checked before anything else so a user
    /// who did not agree is told exactly that.
    pub fn from_fields(
        fields: &FormFields,
        phrase: &str,
        limits: &FieldLimits,
    ) -> Result<Self, ValidationError> {
        let acknowledged = fields
            .get(field::ACKNOWLEDGMENT)
            .is_some_and(|value| matches_phrase(value, phrase));
        if !acknowledged {
            return Err(ValidationError::AcknowledgmentRequired {
                phrase: phrase.to_string(),
            });
        }

        let record = Self::new(
            fields.required(field::USERNAME, limits.title)?,
            fields.required(field::USER_ID, limits.title)?,
            fields.optional(field::PORTFOLIO).unwrap_or_default(),
            true,
        );
        if record.portfolio_link.chars().count() > limits.url {
            return Err(ValidationError::FieldTooLong {
                field: field::PORTFOLIO,
                max: limits.url,
            });
        }
        Ok(record)
    }

    pub fn is_valid(&self) -> bool {
        self.acknowledgment
            && !self.external_username.is_empty()
            && !self.external_user_id.is_empty()
    }
}

fn matches_phrase(value: &str, phrase: &str) -> bool {
    value.trim().to_lowercase() == phrase.trim().to_lowercase()
}
