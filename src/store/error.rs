//! Store adapter error types

use thiserror::Error;

use super::StoreKind;

/// Errors raised by any store adapter
#[derive(Error, Debug)]
pub enum StoreError {
    /// Could not reach the backend at all
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Backend did not answer within the configured timeout
    #[error("Request timeout")]
    Timeout,

    /// Transport-level failure not covered above
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Backend answered and refused the operation
    #[error("{message}")]
    Rejected { status: Option<u16>, message: String },

    /// Backend answered with something we could not understand
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Push channel broke; no further snapshots will arrive
    #[error("Subscription failed: {0}")]
    Subscription(String),

    /// Capability not offered by this adapter
    #[error("{operation} is not supported by the {store} store")]
    Unsupported {
        store: StoreKind,
        operation: &'static str,
    },

    /// Adapter cannot be built from the given settings
    #[error("Store configuration error: {0}")]
    Config(String),
}

impl StoreError {
    /// Classify a reqwest failure the same way for every adapter
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            StoreError::Timeout
        } else if err.is_connect() {
            StoreError::Unavailable(err.to_string())
        } else if err.is_decode() {
            StoreError::Decode(err.to_string())
        } else {
            StoreError::Request(err)
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Decode(err.to_string())
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
