//! Id generation for new items and history entries

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

/// Source of unique ids; `prefix` names what the id is for (`item`, `batch`)
pub trait IdGenerator: Send + Sync {
    fn next_id(&self, prefix: &str) -> String;
}

/// Random v4 UUID ids, e.g. `item-6f1c...`
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn next_id(&self, prefix: &str) -> String {
        format!("{}-{}", prefix, Uuid::new_v4().simple())
    }
}

/// Monotonic counter ids, e.g. `item-1`, `item-2`
///
/// One counter is shared across prefixes so ids never repeat within a generator.
#[derive(Debug, Default)]
pub struct SequentialIds {
    namespace: Option<String>,
    counter: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a namespace between prefix and counter (`item-site-1`)
    pub fn with_namespace(namespace: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            counter: AtomicU64::new(0),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        match &self.namespace {
            Some(ns) => format!("{}-{}-{}", prefix, ns, n),
            None => format!("{}-{}", prefix, n),
        }
    }
}
