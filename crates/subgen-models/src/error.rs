//! Model error types.

use thiserror::Error;

pub type ModelResult<T> = Result<T, ModelError>;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("Missing job field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value for job field {field}: {value}")]
    InvalidField { field: &'static str, value: String },

    #[error("Unknown job status: {0}")]
    UnknownStatus(String),

    #[error("Unknown priority: {0}")]
    UnknownPriority(String),
}

impl ModelError {
    pub fn invalid_field(field: &'static str, value: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            value: value.into(),
        }
    }
}
