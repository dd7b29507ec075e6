//! # Error Kinds
//!
//! Every I/O boundary in the core converts its failures into one of these
//! three kinds. None of them escape the component that produced them.

use thiserror::Error;

/// Remote catalog failure. Recoverable, surfaced to consumers, never retried
/// automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Connection, DNS, TLS or timeout failure
    #[error("transport failure: {0}")]
    Transport(String),
    /// The source answered with a non-2xx status (auth failures included)
    #[error("remote returned {status}: {message}")]
    Status { status: u16, message: String },
    /// The body could not be decoded into the expected envelope
    #[error("undecodable response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            Self::Status {
                status: status.as_u16(),
                message: err.to_string(),
            }
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Favorite store read/write failure. Logged only; never blocks in-memory state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    #[error("failed to read '{key}': {reason}")]
    Read { key: String, reason: String },
    #[error("failed to write '{key}': {reason}")]
    Write { key: String, reason: String },
}

/// A returned record is missing a required field. Only that record is dropped.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("malformed record (id: {id:?}): {reason}")]
pub struct MalformedRecordError {
    /// Identity of the record if it could be read at all
    pub id: Option<u64>,
    pub reason: String,
}

impl MalformedRecordError {
    pub fn new(id: Option<u64>, reason: impl Into<String>) -> Self {
        Self {
            id,
            reason: reason.into(),
        }
    }
}
