//! Error taxonomy shared by the store client, cache, search and session layers.

use std::fmt;

use thiserror::Error;

/// The remote call a [`StoreError`] was raised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreOperation {
    List,
    Read,
    Write,
    Delete,
}

impl fmt::Display for StoreOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::List => "list",
            Self::Read => "read",
            Self::Write => "write",
            Self::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Underlying cause of a failed store call.
#[derive(Debug, Error)]
pub enum StoreFailure {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {0}")]
    Status(u16),
    #[error("malformed index: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("cannot build request url for base {0}")]
    InvalidUrl(String),
}

/// A remote store call failed. Never retried.
#[derive(Debug, Error)]
#[error("note store {operation} failed{}: {cause}", describe_target(.target))]
pub struct StoreError {
    pub operation: StoreOperation,
    pub target: Option<String>,
    #[source]
    pub cause: StoreFailure,
}

fn describe_target(target: &Option<String>) -> String {
    match target {
        Some(name) => format!(" for '{name}'"),
        None => String::new(),
    }
}

impl StoreError {
    pub fn new(operation: StoreOperation, target: Option<&str>, cause: impl Into<StoreFailure>) -> Self {
        Self {
            operation,
            target: target.map(str::to_string),
            cause: cause.into(),
        }
    }

    /// Status code reported by the store, when the failure was a non-2xx reply.
    pub fn status(&self) -> Option<u16> {
        match self.cause {
            StoreFailure::Status(code) => Some(code),
            _ => None,
        }
    }
}

/// Failures of single-note operations and cache lookups.
#[derive(Debug, Error)]
pub enum NoteError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("note not found: {0}")]
    NotFound(String),
    #[error("note already exists: {0}")]
    AlreadyExists(String),
    #[error("note is read-only: {0}")]
    ReadOnly(String),
}

/// Session resolution and lifecycle failures.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Bad Request: No valid session ID provided")]
    MissingSessionId,
    #[error("Session not found: {0}")]
    UnknownSession(String),
    #[error("Session already closed: {0}")]
    Closed(String),
    #[error("Session initialization rejected: {0}")]
    InitializeRejected(String),
}

/// Client credential failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Unauthorized: missing bearer credential")]
    Missing,
    #[error("Unauthorized: invalid bearer credential")]
    Invalid,
}
