//! Remote note store client.
//!
//! The store is an opaque CRUD service: an `index.json` listing plus one
//! resource per note. Every trait method maps to exactly one remote call.

mod http;

pub use http::HttpNoteStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

/// Suffix that marks a store entry as a note.
pub const NOTE_SUFFIX: &str = ".md";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Permission {
    ReadWrite,
    ReadOnly,
}

impl Permission {
    /// Interpret the store's `perm` field. Anything without a write bit is read-only.
    pub fn from_store(perm: &str) -> Self {
        match perm.trim().to_ascii_lowercase().as_str() {
            "rw" | "wr" | "w" | "read-write" | "readwrite" => Self::ReadWrite,
            _ => Self::ReadOnly,
        }
    }

    pub fn is_writable(self) -> bool {
        self == Self::ReadWrite
    }
}

/// One row of the store's `index.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreEntry {
    pub name: String,
    pub last_modified: i64,
    #[serde(default)]
    pub content_type: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(default = "default_perm")]
    pub perm: String,
}

fn default_perm() -> String {
    "rw".to_string()
}

impl StoreEntry {
    pub fn is_note(&self) -> bool {
        self.name.ends_with(NOTE_SUFFIX)
    }

    pub fn permission(&self) -> Permission {
        Permission::from_store(&self.perm)
    }
}

/// A note as exposed to MCP clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NoteInfo {
    pub name: String,
    pub permission: Permission,
}

impl From<&StoreEntry> for NoteInfo {
    fn from(entry: &StoreEntry) -> Self {
        Self {
            name: entry.name.clone(),
            permission: entry.permission(),
        }
    }
}

/// Operations against the remote note store.
///
/// Implementations surface every failure as a [`StoreError`] and never retry.
#[async_trait]
pub trait NoteStore: Send + Sync {
    /// Full, unfiltered listing with modification timestamps.
    async fn list_full(&self) -> Result<Vec<StoreEntry>, StoreError>;

    /// Raw body of one note.
    async fn read(&self, name: &str) -> Result<String, StoreError>;

    /// Create or replace one note.
    async fn write(&self, name: &str, content: &str) -> Result<(), StoreError>;

    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// Listing restricted to notes, in store order.
    async fn list(&self) -> Result<Vec<NoteInfo>, StoreError> {
        let entries = self.list_full().await?;
        Ok(entries
            .iter()
            .filter(|e| e.is_note())
            .map(NoteInfo::from)
            .collect())
    }
}
