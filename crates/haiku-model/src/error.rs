use thiserror::Error;

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} is empty after removing reserved characters: {raw:?}")]
    EmptyAfterSanitize { field: &'static str, raw: String },

    #[error("malformed watch event: {0}")]
    MalformedEvent(String),

    #[error("invalid model: {0}")]
    Invalid(String),
}

pub type ModelResult<T> = Result<T, ModelError>;
