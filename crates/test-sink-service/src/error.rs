//! Error types for the test sink service.

use crate::storage::StorageError;
use thiserror::Error;

/// A specialised Result type for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Errors that can surface from the request handlers.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Configuration error.
    #[error("configuration error")]
    Config(#[source] Box<figment::Error>),

    /// Storage collaborator failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The inbound request is missing something the handler needs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A response header value could not be constructed.
    #[error("invalid response header value")]
    ResponseHeader(#[from] http::header::InvalidHeaderValue),

    /// The response body failed to serialise.
    #[error("failed to serialise response body")]
    Body(#[from] serde_json::Error),
}

impl From<figment::Error> for ServiceError {
    fn from(err: figment::Error) -> Self {
        ServiceError::Config(Box::new(err))
    }
}
