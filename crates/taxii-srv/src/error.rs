//! Error types for the TAXII server core.

use taxii_core::{StatusResponse, TaxiiError};
use thiserror::Error;

/// Errors that can occur in taxii-srv operations.
#[derive(Error, Debug)]
pub enum SrvError {
    /// Protocol-level condition reported back to the client as a status message.
    #[error(transparent)]
    Taxii(#[from] TaxiiError),

    /// Configuration is invalid or missing required fields.
    #[error("config error: {0}")]
    Config(String),

    /// Persistence backend failed.
    #[error("storage error: {0}")]
    Storage(String),

    /// State snapshot read/write failed.
    #[error("state error: {0}")]
    State(String),

    /// IO error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SrvError {
    /// The protocol error, if this is one.
    #[must_use]
    pub const fn as_taxii(&self) -> Option<&TaxiiError> {
        match self {
            Self::Taxii(err) => Some(err),
            _ => None,
        }
    }

    /// Status message reporting this error to the client.
    ///
    /// Internal failures are reported as `FAILURE` without leaking details.
    #[must_use]
    pub fn to_status(&self) -> StatusResponse {
        match self {
            Self::Taxii(err) => StatusResponse::from_error(err),
            _ => StatusResponse::from_error(&TaxiiError::Failure(
                "internal server error".into(),
            )),
        }
    }
}
