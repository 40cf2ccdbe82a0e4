//! Errors from the API client and the sync layer

use marginalia_core::CoreError;

/// Errors from the annotation REST API
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.)
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The API returned a non-2xx status code
    #[error("annotation API error ({status}): {body}")]
    Status { status: u16, body: String },

    /// A 2xx response whose body was not what we expected
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status of a rejected request
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Request(err) => err.status().map(|s| s.as_u16()),
            ApiError::Decode(_) => None,
        }
    }

    /// Server reported the record missing
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}

/// Result alias for API calls
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors surfaced by sync operations
///
/// Validation errors are raised before any request is made. Transport errors
/// leave the store exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error(transparent)]
    Validation(#[from] CoreError),

    #[error(transparent)]
    Transport(#[from] ApiError),
}

/// Result alias for bucket sync operations
pub type SyncResult<T> = Result<T, SyncError>;
