//! History entries

use std::sync::Arc;

use atelier_core::{ChangeRecord, Document};
use chrono::{DateTime, Utc};

/// One undoable unit in the history
///
/// Snapshots are shared, immutable documents; cloning a batch never copies
/// document content.
#[derive(Debug, Clone)]
pub struct Batch {
    /// Unique history entry id
    pub id: String,
    pub timestamp: DateTime<Utc>,
    /// Id supplied by the producer of the batch (or generated)
    pub batch_id: String,
    pub description: String,
    /// The user message that led to this batch, if any
    pub user_prompt: Option<String>,
    pub changes: Vec<ChangeRecord>,
    /// Document immediately before the batch ran
    pub snapshot_before: Arc<Document>,
    /// Document immediately after the batch ran
    pub snapshot_after: Arc<Document>,
    /// False once rolled back, true again after redo
    pub applied: bool,
}

impl Batch {
    pub fn change_count(&self) -> usize {
        self.changes.len()
    }

    /// Paths touched by this batch, deduplicated, in first-seen order
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = Vec::new();
        for change in &self.changes {
            if !paths.contains(&change.path) {
                paths.push(change.path.clone());
            }
        }
        paths
    }
}

/// Input to [`HistoryStore::push_batch`](crate::HistoryStore::push_batch)
#[derive(Debug, Clone)]
pub struct BatchRecord {
    pub batch_id: Option<String>,
    pub description: String,
    pub user_prompt: Option<String>,
    pub changes: Vec<ChangeRecord>,
    pub snapshot_before: Arc<Document>,
    pub snapshot_after: Arc<Document>,
}

impl BatchRecord {
    pub fn new(
        snapshot_before: Arc<Document>,
        snapshot_after: Arc<Document>,
        changes: Vec<ChangeRecord>,
    ) -> Self {
        Self {
            batch_id: None,
            description: String::new(),
            user_prompt: None,
            changes,
            snapshot_before,
            snapshot_after,
        }
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_user_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.user_prompt = Some(prompt.into());
        self
    }
}
