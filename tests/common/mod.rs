//! Shared fixtures: an instrumented in-memory note store.

#![allow(dead_code)]

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use mcp_note_bridge::error::{StoreError, StoreFailure, StoreOperation};
use mcp_note_bridge::handlers::ToolContext;
use mcp_note_bridge::store::{NoteStore, StoreEntry};

#[derive(Debug, Clone)]
struct StoredNote {
    name: String,
    content: String,
    last_modified: i64,
    perm: String,
}

/// In-memory store that counts calls per operation.
#[derive(Default)]
pub struct MemoryStore {
    notes: Mutex<Vec<StoredNote>>,
    clock: AtomicUsize,
    failing_reads: Mutex<HashSet<String>>,
    read_delay: Mutex<Option<Duration>>,
    pub lists: AtomicUsize,
    pub reads: AtomicUsize,
    pub writes: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Insert or replace a note with an explicit timestamp.
    pub fn put(&self, name: &str, content: &str, last_modified: i64) {
        self.put_with_perm(name, content, last_modified, "rw");
    }

    pub fn put_with_perm(&self, name: &str, content: &str, last_modified: i64, perm: &str) {
        let mut notes = self.notes.lock().unwrap();
        let note = StoredNote {
            name: name.to_string(),
            content: content.to_string(),
            last_modified,
            perm: perm.to_string(),
        };
        match notes.iter_mut().find(|n| n.name == name) {
            Some(existing) => *existing = note,
            None => notes.push(note),
        }
    }

    /// Make every read of `name` fail with a 500.
    pub fn fail_reads_of(&self, name: &str) {
        self.failing_reads.lock().unwrap().insert(name.to_string());
    }

    /// Make every read sleep before answering.
    pub fn delay_reads(&self, delay: Duration) {
        *self.read_delay.lock().unwrap() = Some(delay);
    }

    pub fn content_of(&self, name: &str) -> Option<String> {
        self.notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.content.clone())
    }

    pub fn list_calls(&self) -> usize {
        self.lists.load(Ordering::SeqCst)
    }

    pub fn read_calls(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn write_calls(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn tick(&self) -> i64 {
        1_000 + self.clock.fetch_add(1, Ordering::SeqCst) as i64
    }
}

fn status(op: StoreOperation, name: &str, code: u16) -> StoreError {
    StoreError::new(op, Some(name), StoreFailure::Status(code))
}

#[async_trait]
impl NoteStore for MemoryStore {
    async fn list_full(&self) -> Result<Vec<StoreEntry>, StoreError> {
        self.lists.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .notes
            .lock()
            .unwrap()
            .iter()
            .map(|n| StoreEntry {
                name: n.name.clone(),
                last_modified: n.last_modified,
                content_type: Some("text/markdown".into()),
                size: Some(n.content.len() as u64),
                perm: n.perm.clone(),
            })
            .collect())
    }

    async fn read(&self, name: &str) -> Result<String, StoreError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        let delay = *self.read_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing_reads.lock().unwrap().contains(name) {
            return Err(status(StoreOperation::Read, name, 500));
        }
        self.content_of(name)
            .ok_or_else(|| status(StoreOperation::Read, name, 404))
    }

    async fn write(&self, name: &str, content: &str) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let ts = self.tick();
        let perm = self
            .notes
            .lock()
            .unwrap()
            .iter()
            .find(|n| n.name == name)
            .map(|n| n.perm.clone())
            .unwrap_or_else(|| "rw".to_string());
        self.put_with_perm(name, content, ts, &perm);
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut notes = self.notes.lock().unwrap();
        let before = notes.len();
        notes.retain(|n| n.name != name);
        if notes.len() == before {
            return Err(status(StoreOperation::Delete, name, 404));
        }
        Ok(())
    }
}

pub fn tool_context(store: Arc<MemoryStore>) -> Arc<ToolContext> {
    Arc::new(ToolContext::with_page_size(store, 10))
}
