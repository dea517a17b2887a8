//! # atelier-session
//!
//! Editing sessions for Atelier sites.
//!
//! An [`EditingSession`] owns one document, its [`HistoryStore`](atelier_history::HistoryStore),
//! an executor and a rollback classifier. Chat messages go through
//! [`EditingSession::submit`]: rollback phrases are answered from history,
//! everything else is sent to a [`ProposalSource`] and either applied or held
//! for confirmation. The protocol itself is the pure [`transition`] function.

mod session;
mod source;
pub mod state_machine;

pub use session::{ApplyReport, EditingSession, ProposalPreview, RollbackReport, SubmitOutcome};
pub use source::{AssistantContext, ProposalSource, ScriptedProposalSource};
pub use state_machine::{transition, Effect, Event, State};
