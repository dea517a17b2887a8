//! # atelier-history
//!
//! Linear undo history for Atelier documents.
//!
//! Each applied batch becomes one [`Batch`] holding the document before and
//! after it ran. The [`HistoryStore`] keeps those entries with a movable
//! cursor: rolling back moves the cursor left without deleting anything, so
//! the entries stay redoable until the next push cuts them off.

mod batch;
mod store;
mod summary;

pub use batch::{Batch, BatchRecord};
pub use store::HistoryStore;
pub use summary::{BatchSummary, HistorySummary};
