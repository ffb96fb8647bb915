//! Typed error hierarchy for the pipehub backend.
//!
//! Two top-level enums cover the two subsystems:
//! - `AuthError` for Discord OAuth exchange and profile failures
//! - `TicketError` for ticket repository and archive failures

use thiserror::Error;

/// Errors from the OAuth gateway. Upstream failures carry the HTTP status
/// and the response body so the caller can surface the detail verbatim.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token exchange failed with status {status}: {detail}")]
    Exchange { status: u16, detail: String },

    #[error("profile fetch failed with status {status}: {detail}")]
    Profile { status: u16, detail: String },

    #[error("OAuth not configured: {0}")]
    NotConfigured(String),

    #[error("Discord request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors from the ticket repository and the archive collaborator.
#[derive(Debug, Error)]
pub enum TicketError {
    #[error("Ticket {id} not found")]
    NotFound { id: String },

    #[error("Invalid {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl TicketError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound { id: id.into() }
    }

    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl From<rusqlite::Error> for TicketError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Storage(anyhow::Error::new(e))
    }
}
