//! # atelier-actions
//!
//! Declarative edits for an Atelier site document.
//!
//! This crate provides:
//! - The closed [`Action`] vocabulary, tagged by `type` on the wire
//! - Lenient decoding of producer payloads ([`ActionProposal`])
//! - The built-in theme [`PresetCatalog`]
//! - [`ActionExecutor`], which applies a batch best-effort against one working copy

mod action;
mod executor;
mod presets;
mod proposal;

pub use action::{Action, ACTION_TYPES};
pub use executor::{ActionExecutor, ExecutionOutcome};
pub use presets::{builtin_presets, Preset, PresetCatalog};
pub use proposal::ActionProposal;
