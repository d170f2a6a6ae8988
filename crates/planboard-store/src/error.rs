//! Error types for the record store.

use thiserror::Error;

/// Errors that can occur when talking to the durable store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Authentication failed or no session is active.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// No row matched the given identifier.
    #[error("record not found: {table}/{id}")]
    NotFound { table: String, id: String },

    /// The store refused the request.
    #[error("request rejected ({status}){}: {message}", match code {
        Some(code) => format!(" [{}]", code),
        None => String::new(),
    })]
    Rejected {
        status: u16,
        code: Option<String>,
        message: String,
    },

    /// Invalid response from the store.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// The table does not exist or is not reachable.
    #[error("table unavailable: {table}")]
    Unavailable { table: String },
}

impl StoreError {
    /// Check if the error is transient and an idempotent request is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            StoreError::Rejected { status, .. } => *status >= 500,
            StoreError::Http(e) => e.is_timeout() || e.is_connect(),
            _ => false,
        }
    }

    /// Check if the error indicates an expired or revoked access token.
    pub fn is_expired_token(&self) -> bool {
        matches!(self, StoreError::Rejected { status: 401, .. })
    }
}
