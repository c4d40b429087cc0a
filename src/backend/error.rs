//! Backend error types and failure classification
//!
//! Every failure coming back from the row store lands in one of two
//! classes. `Unreachable` means the request never got a usable answer
//! (transport failure, bad or expired credential, timeout). `Reachable`
//! means the backend answered but the table, column or policy did not
//! match what we asked for.

use serde::Deserialize;
use thiserror::Error;

/// Message fragments that mark an otherwise unclassified error as unreachable
const UNREACHABLE_SIGNATURES: &[&str] = &["failed to fetch", "invalid api key", "jwt", "timeout"];

/// Postgres / PostgREST codes for a missing relation or column
const MISSING_RELATION_CODES: &[&str] = &["42P01", "42703", "PGRST200", "PGRST204", "PGRST205"];

/// Postgres code for insufficient privilege (RLS / grants)
const PERMISSION_DENIED_CODE: &str = "42501";

/// Whether a failure means the service could not be reached at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network, credential or timeout failure
    Unreachable,
    /// The service answered; schema or policy mismatch
    Reachable,
}

/// Errors that can occur when talking to the row store
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Backend unreachable: {0}")]
    Network(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Authentication rejected ({status}): {message}")]
    Auth { status: u16, message: String },

    #[error("Relation not found: {message}")]
    MissingRelation {
        code: Option<String>,
        message: String,
    },

    #[error("Permission denied: {message}")]
    Denied {
        code: Option<String>,
        message: String,
    },

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Invalid response: {0}")]
    Decode(String),

    #[error("Backend not configured: {0}")]
    NotConfigured(String),
}

/// Result type alias for backend operations
pub type BackendResult<T> = Result<T, BackendError>;

/// Error body returned by the REST layer
#[derive(Debug, Default, Deserialize)]
struct RestErrorBody {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
    hint: Option<String>,
}

impl BackendError {
    /// Classify this error as reachable or unreachable
    pub fn class(&self) -> FailureClass {
        match self {
            BackendError::Request(_)
            | BackendError::Network(_)
            | BackendError::Timeout
            | BackendError::Auth { .. }
            | BackendError::NotConfigured(_) => FailureClass::Unreachable,
            BackendError::MissingRelation { .. }
            | BackendError::Denied { .. }
            | BackendError::Decode(_) => FailureClass::Reachable,
            BackendError::Api { message, .. } => {
                if message_signals_unreachable(message) {
                    FailureClass::Unreachable
                } else {
                    FailureClass::Reachable
                }
            }
        }
    }

    pub fn is_unreachable(&self) -> bool {
        self.class() == FailureClass::Unreachable
    }

    /// Map a reqwest transport error, the same way for every call site
    pub(crate) fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            BackendError::Timeout
        } else if err.is_connect() {
            BackendError::Network(err.to_string())
        } else {
            BackendError::Request(err)
        }
    }

    /// Build an error from a non-success HTTP response
    pub fn from_response(status: u16, body: &str) -> Self {
        let parsed: RestErrorBody = serde_json::from_str(body).unwrap_or_default();
        let message = parsed
            .message
            .clone()
            .or_else(|| parsed.details.clone())
            .or_else(|| parsed.hint.clone())
            .unwrap_or_else(|| body.trim().to_string());
        let code = parsed.code;

        if status == 401 || message_mentions_credential(&message) {
            return BackendError::Auth { status, message };
        }

        match code.as_deref() {
            Some(c) if MISSING_RELATION_CODES.contains(&c) => {
                return BackendError::MissingRelation { code, message };
            }
            Some(PERMISSION_DENIED_CODE) => return BackendError::Denied { code, message },
            _ => {}
        }

        match status {
            404 => BackendError::MissingRelation { code, message },
            403 => BackendError::Denied { code, message },
            _ => BackendError::Api { status, message },
        }
    }
}

/// Check an error message against the known unreachable signatures
pub fn message_signals_unreachable(message: &str) -> bool {
    let lower = message.to_lowercase();
    UNREACHABLE_SIGNATURES.iter().any(|sig| lower.contains(sig))
}

fn message_mentions_credential(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("invalid api key") || lower.contains("jwt")
}
