//! Read-only history views for the external assistant

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::batch::Batch;

/// One history entry without its snapshots
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub id: String,
    pub batch_id: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_prompt: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub change_count: usize,
    pub paths: Vec<String>,
    pub applied: bool,
}

impl From<&Batch> for BatchSummary {
    fn from(batch: &Batch) -> Self {
        Self {
            id: batch.id.clone(),
            batch_id: batch.batch_id.clone(),
            description: batch.description.clone(),
            user_prompt: batch.user_prompt.clone(),
            timestamp: batch.timestamp,
            change_count: batch.change_count(),
            paths: batch.paths(),
            applied: batch.applied,
        }
    }
}

/// Snapshot-free view of the whole store
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistorySummary {
    pub total: usize,
    pub applied: usize,
    pub current_index: Option<usize>,
    pub can_rollback: bool,
    pub can_redo: bool,
    pub entries: Vec<BatchSummary>,
}

impl HistorySummary {
    /// Plain-text rendering for an assistant prompt
    pub fn to_prompt_context(&self) -> String {
        if self.entries.is_empty() {
            return "No changes have been made yet.".to_string();
        }

        let mut out = format!(
            "History: {} batches ({} applied, {} undone)\n",
            self.total,
            self.applied,
            self.total - self.applied
        );

        for (i, entry) in self.entries.iter().enumerate() {
            let state = if entry.applied { "applied" } else { "undone" };
            out.push_str(&format!(
                "{}. [{}] {} ({}) id={}",
                i + 1,
                state,
                entry.description,
                entry.paths.join(", "),
                entry.batch_id
            ));
            if let Some(prompt) = &entry.user_prompt {
                out.push_str(&format!(" | asked: \"{}\"", prompt));
            }
            out.push('\n');
        }

        out
    }
}
