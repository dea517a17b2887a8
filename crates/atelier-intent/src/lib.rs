//! # atelier-intent
//!
//! Decides whether a chat message is a request to undo earlier edits.
//!
//! This is a fixed phrase heuristic (French and English), not language
//! understanding: messages that match nothing fall through to normal
//! handling. Rules are ordered and the first match wins, so specific forms
//! ("undo the last 3 changes", "undo everything except the title") sit above
//! the bare "undo".

mod intent;
mod rules;

pub use intent::{Classification, RollbackIntent, RollbackKind};
pub use rules::{builtin_rules, IntentClassifier, RollbackRule, RuleClassifier};
