//! The batch history store

use std::sync::Arc;

use atelier_core::{AtelierConfig, IdGenerator, UuidIds};
use chrono::Utc;
use tracing::{debug, info};

use crate::batch::{Batch, BatchRecord};
use crate::summary::{BatchSummary, HistorySummary};

const DEFAULT_MAX_ENTRIES: usize = 50;

/// Append-only batch log with a movable cursor
///
/// `cursor` points at the last applied entry (`None` when nothing is
/// applied). Entries after the cursor are rolled back but kept for redo
/// until the next [`push_batch`](Self::push_batch).
pub struct HistoryStore {
    entries: Vec<Batch>,
    cursor: Option<usize>,
    max_entries: usize,
    ids: Arc<dyn IdGenerator>,
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

impl std::fmt::Debug for HistoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HistoryStore")
            .field("entries", &self.entries.len())
            .field("cursor", &self.cursor)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

impl HistoryStore {
    /// Create a store keeping at most `max_entries` batches (at least one)
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            cursor: None,
            max_entries: max_entries.max(1),
            ids: Arc::new(UuidIds),
        }
    }

    pub fn from_config(config: &AtelierConfig) -> Self {
        Self::new(config.max_history_entries()).with_ids(config.id_generator())
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Record a new batch after the cursor
    ///
    /// Anything after the cursor is discarded first. When the store is over
    /// capacity the oldest entries are evicted and the cursor rebased.
    pub fn push_batch(&mut self, record: BatchRecord) -> &Batch {
        let insert_at = self.cursor.map_or(0, |c| c + 1);
        if insert_at < self.entries.len() {
            let discarded = self.entries.len() - insert_at;
            self.entries.truncate(insert_at);
            debug!("Discarded {} redo entries", discarded);
        }

        let batch_id = record
            .batch_id
            .unwrap_or_else(|| self.ids.next_id("batch"));

        self.entries.push(Batch {
            id: self.ids.next_id("history"),
            timestamp: Utc::now(),
            batch_id,
            description: record.description,
            user_prompt: record.user_prompt,
            changes: record.changes,
            snapshot_before: record.snapshot_before,
            snapshot_after: record.snapshot_after,
            applied: true,
        });

        if self.entries.len() > self.max_entries {
            let excess = self.entries.len() - self.max_entries;
            self.entries.drain(..excess);
            info!("Evicted {} oldest history entries", excess);
        }

        let last = self.entries.len() - 1;
        self.cursor = Some(last);

        let batch = &self.entries[last];
        info!(
            "Recorded batch {} ({} changes): {}",
            batch.batch_id,
            batch.changes.len(),
            batch.description
        );
        batch
    }

    /// Roll back the entry at the cursor
    ///
    /// Returns the rolled-back entry; restore its `snapshot_before`.
    pub fn rollback_last(&mut self) -> Option<Batch> {
        let index = self.cursor?;
        let entry = &mut self.entries[index];
        entry.applied = false;
        self.cursor = index.checked_sub(1);

        info!("Rolled back batch {}", entry.batch_id);
        Some(entry.clone())
    }

    /// Roll back up to `count` entries, most recent first
    pub fn rollback_multiple(&mut self, count: usize) -> Vec<Batch> {
        let mut rolled_back = Vec::new();
        for _ in 0..count {
            match self.rollback_last() {
                Some(entry) => rolled_back.push(entry),
                None => break,
            }
        }
        rolled_back
    }

    /// Roll back every applied entry, most recent first
    pub fn rollback_all(&mut self) -> Vec<Batch> {
        let applied = self.cursor.map_or(0, |c| c + 1);
        self.rollback_multiple(applied)
    }

    /// Roll back to the state before the batch identified by `batch_id`
    ///
    /// `batch_id` is matched against producer batch ids first (oldest entry
    /// wins), then against history entry ids. Returns the rolled-back entries
    /// in chronological order, an empty list when the target is already
    /// rolled back, or `None` when nothing matches.
    pub fn rollback_to_batch(&mut self, batch_id: &str) -> Option<Vec<Batch>> {
        let index = self
            .entries
            .iter()
            .position(|b| b.batch_id == batch_id)
            .or_else(|| self.entries.iter().position(|b| b.id == batch_id))?;

        let Some(cursor) = self.cursor.filter(|&c| c >= index) else {
            debug!("Batch {} is already rolled back", batch_id);
            return Some(Vec::new());
        };

        for entry in &mut self.entries[index..] {
            entry.applied = false;
        }
        self.cursor = index.checked_sub(1);

        info!(
            "Rolled back to before batch {} ({} entries)",
            batch_id,
            cursor + 1 - index
        );
        Some(self.entries[index..=cursor].to_vec())
    }

    /// Re-apply the entry after the cursor
    ///
    /// Returns the entry; restore its `snapshot_after`.
    pub fn redo(&mut self) -> Option<Batch> {
        let next = self.cursor.map_or(0, |c| c + 1);
        let entry = self.entries.get_mut(next)?;
        entry.applied = true;
        self.cursor = Some(next);

        info!("Redid batch {}", entry.batch_id);
        Some(entry.clone())
    }

    pub fn can_rollback(&self) -> bool {
        self.cursor.is_some()
    }

    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.entries.len()
    }

    /// Index of the last applied entry
    pub fn current_index(&self) -> Option<usize> {
        self.cursor
    }

    /// The last applied entry
    pub fn current(&self) -> Option<&Batch> {
        self.cursor.map(|c| &self.entries[c])
    }

    pub fn entries(&self) -> &[Batch] {
        &self.entries
    }

    pub fn get(&self, batch_id: &str) -> Option<&Batch> {
        self.entries
            .iter()
            .find(|b| b.batch_id == batch_id || b.id == batch_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = None;
    }

    /// The last `count` applied entries, oldest first
    pub fn recent_actions(&self, count: usize) -> Vec<BatchSummary> {
        let end = self.cursor.map_or(0, |c| c + 1);
        let start = end.saturating_sub(count);
        self.entries[start..end]
            .iter()
            .map(BatchSummary::from)
            .collect()
    }

    /// Read-only view of the whole history
    pub fn history_summary(&self) -> HistorySummary {
        HistorySummary {
            total: self.entries.len(),
            applied: self.cursor.map_or(0, |c| c + 1),
            current_index: self.cursor,
            can_rollback: self.can_rollback(),
            can_redo: self.can_redo(),
            entries: self.entries.iter().map(BatchSummary::from).collect(),
        }
    }
}
