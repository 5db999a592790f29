use crate::decoder::DecodeError;
use crate::validate::FieldViolations;
use hyper::StatusCode;
use thiserror::Error;

/// Result type alias for ingestion operations
pub type Result<T, E = IngestError> = std::result::Result<T, E>;

/// Errors that can terminate one ingestion request.
///
/// Exactly one of these is produced per failed request; the first failure in
/// source-array order wins. The display strings are part of the HTTP
/// contract.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("invalid JSON: expected '[' at start")]
    MissingArrayOpen,

    #[error("invalid JSON: expected ']' at end")]
    MissingArrayClose,

    #[error("invalid JSON airport structure")]
    MalformedElement(#[source] DecodeError),

    #[error("failed to read request body")]
    RequestBody(String),

    #[error("invalid JSON format")]
    MalformedArray(#[source] serde_json::Error),

    #[error("{0}")]
    Validation(FieldViolations),

    #[error("error upserting airport: {0}")]
    Persistence(#[from] store::StoreError),

    #[error("failed to commit response: {0}")]
    Commit(String),
}

impl IngestError {
    /// HTTP status class: client-input errors are 400, server-side failures
    /// are 500.
    pub fn status(&self) -> StatusCode {
        match self {
            IngestError::MissingArrayOpen
            | IngestError::MissingArrayClose
            | IngestError::MalformedElement(_)
            | IngestError::RequestBody(_)
            | IngestError::MalformedArray(_)
            | IngestError::Validation(_) => StatusCode::BAD_REQUEST,
            IngestError::Persistence(_) | IngestError::Commit(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
