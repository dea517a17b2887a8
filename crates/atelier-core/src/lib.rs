//! # atelier-core
//!
//! Core types for the Atelier site-content mutation engine.
//!
//! A site is one JSON [`Document`]: named top-level sections holding scalar
//! fields, nested style objects and arrays of items that each carry an `id`.
//! Everything that edits a site goes through the same small vocabulary:
//!
//! - [`ContentPath`] addresses one field with a dotted string (`hero.styles.title.color`)
//! - [`PathResolver`] reads and writes through those paths without touching the input
//! - [`ChangeRecord`] and [`ActionResult`] describe what an edit did, as plain data
//! - [`IdGenerator`] hands out item and history ids

mod config;
mod error;
mod ids;
mod path;
mod types;

pub use config::{
    AssistantConfig, AtelierConfig, HistoryConfig, IdConfig, IdStrategy, PathConfig, PresetConfig,
};
pub use error::{ActionErrorKind, AtelierError, Result};
pub use ids::{IdGenerator, SequentialIds, UuidIds};
pub use path::{ContentPath, PathResolver};
pub use types::*;
