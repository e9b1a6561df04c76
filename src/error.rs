/// Unified error types for the MedInventory client
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum ClientError {
    /// Rejected locally before any network call
    #[error("Validation error: {0}")]
    Validation(String),

    /// Backend answered 401
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated call attempted without a session
    #[error("Not authenticated")]
    NotAuthenticated,

    /// Any other non-success backend response
    #[error("API error ({status}): {detail}")]
    Api { status: StatusCode, detail: String },

    /// Transport errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON encoding/decoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Item or alert missing from the local store
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ClientError {
    /// True for errors that should trigger the refresh-and-retry policy
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Unauthorized(_))
            || matches!(self, ClientError::Api { status, .. } if *status == StatusCode::UNAUTHORIZED)
    }

    /// Message suitable for inline display (server detail when available)
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Unauthorized(detail) => detail.clone(),
            ClientError::Api { detail, .. } => detail.clone(),
            ClientError::Validation(msg) => msg.clone(),
            ClientError::NotAuthenticated => "Please sign in to continue".to_string(),
            ClientError::Http(_) => "Unable to reach the server".to_string(),
            _ => self.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for ClientError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<String> = errors
            .field_errors()
            .into_iter()
            .map(|(field, errs)| {
                let reason = errs
                    .first()
                    .and_then(|e| e.message.as_ref().map(|m| m.to_string()))
                    .unwrap_or_else(|| "is invalid".to_string());
                format!("{} {}", field, reason)
            })
            .collect();
        fields.sort();
        ClientError::Validation(fields.join(", "))
    }
}

/// FastAPI-style error body returned by the backend
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub detail: serde_json::Value,
}

impl ErrorBody {
    /// Flatten `detail` into a single message; validation errors arrive as arrays
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Array(items) => items
                .iter()
                .filter_map(|i| i.get("msg").and_then(|m| m.as_str()))
                .collect::<Vec<_>>()
                .join("; "),
            other => other.to_string(),
        }
    }
}

/// Result type alias for client operations
pub type ClientResult<T> = Result<T, ClientError>;
