//! Error types shared by the annotation data model and store

/// Errors raised by the data model before anything reaches the network
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// A draft or value failed client-side validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// A parent reference string could not be parsed
    #[error("invalid reference '{0}': expected 'DocumentElements/<id>' or 'Annotation/<id>'")]
    InvalidReference(String),

    /// A link body did not contain the expected JSON object
    #[error("malformed link body: {0}")]
    LinkBody(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] crate::config::ConfigError),
}

impl CoreError {
    /// Shorthand for building a validation error from anything displayable
    pub fn validation(message: impl Into<String>) -> Self {
        CoreError::Validation(message.into())
    }
}

/// Result alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
