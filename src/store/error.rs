//! Errors raised by document store adapters

use thiserror::Error;

/// Errors that can occur when reading from a document store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Request timeout")]
    Timeout,

    #[error("Malformed document in {path}: {message}")]
    Decode { path: String, message: String },

    #[error("Store configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    /// True when the store itself cannot be reached or refuses us
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StoreError::Unavailable(_) | StoreError::Auth(_) | StoreError::Timeout
        )
    }

    /// Map a transport error the way every HTTP adapter reports it
    pub(crate) fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            StoreError::Timeout
        } else if e.is_connect() {
            StoreError::Unavailable(e.to_string())
        } else {
            StoreError::Request(e)
        }
    }
}
