use thiserror::Error;

/// Bad or missing input on a submitted form or command.
///
/// Always user-visible and never accompanied by a side effect.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("you must type the confirmation phrase \"{phrase}\" to continue")]
    AcknowledgmentRequired { phrase: String },

    #[error("the field `{0}` is required")]
    MissingField(&'static str),

    #[error("the field `{field}` must be at most {max} characters")]
    FieldTooLong { field: &'static str, max: usize },

    #[error("unknown command: {0}")]
    UnknownCommand(String),
}
