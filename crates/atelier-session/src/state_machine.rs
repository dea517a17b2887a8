//! Pure state machine for the edit/confirm/rollback protocol
//!
//! This module implements a pure functional state machine with NO I/O.
//! The session feeds it one event per step and refuses any call the
//! protocol does not allow from the current state.
//!
//! ```text
//! Idle --Submit--> AwaitingResult
//! AwaitingResult --RollbackDetected--> RollbackApplied --SnapshotRestored--> Idle
//! AwaitingResult --ActionsReceived(confirm)--> ActionsProposed
//! AwaitingResult --ActionsReceived(direct)--> ActionsApplied
//! ActionsProposed --ConfirmSubset--> ActionsApplied --BatchSettled--> Idle
//! ActionsProposed --Cancel--> Idle
//! AwaitingResult --Error--> ErrorReported --Acknowledge--> Idle
//! ```

use atelier_core::{AtelierError, Result};
use atelier_intent::RollbackKind;

/// Session protocol state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum State {
    /// Ready for input; initial and terminal
    Idle,
    /// Input submitted, waiting for a rollback match or a proposal
    AwaitingResult { prompt: String },
    /// A proposal is held for confirmation
    ActionsProposed {
        batch_id: String,
        action_count: usize,
    },
    /// A batch is being executed
    ActionsApplied { batch_id: String },
    /// A rollback is being restored
    RollbackApplied { kind: RollbackKind },
    /// The proposal source failed; the document is unchanged
    ErrorReported { message: String },
}

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Submit { prompt: String },
    RollbackDetected { kind: RollbackKind },
    SnapshotRestored,
    ActionsReceived {
        batch_id: String,
        action_count: usize,
        requires_confirmation: bool,
    },
    ConfirmSubset { selected: usize },
    Cancel,
    /// Execution finished; `recorded` is false when nothing changed
    BatchSettled { recorded: bool },
    Error { message: String },
    Acknowledge,
}

/// Side effects the caller performs for a transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    LogActivity { message: String },
    RestoreSnapshot,
    HoldProposal { batch_id: String },
    DiscardProposal { batch_id: String },
    ExecuteActions { batch_id: String, count: usize },
    RecordBatch { batch_id: String },
    ReportError { message: String },
}

/// Pure state transition function
///
/// Takes current state and event, returns new state and effects to perform.
/// Transitions the protocol does not allow return
/// [`AtelierError::InvalidTransition`]; this function never panics.
pub fn transition(state: State, event: Event) -> Result<(State, Vec<Effect>)> {
    match (state, event) {
        // From Idle state
        (State::Idle, Event::Submit { prompt }) => {
            let effects = vec![Effect::LogActivity {
                message: format!("Received input: {}", prompt),
            }];
            Ok((State::AwaitingResult { prompt }, effects))
        }

        // From AwaitingResult state
        (State::AwaitingResult { .. }, Event::RollbackDetected { kind }) => {
            let effects = vec![
                Effect::LogActivity {
                    message: format!("Rollback requested ({})", kind),
                },
                Effect::RestoreSnapshot,
            ];
            Ok((State::RollbackApplied { kind }, effects))
        }

        (
            State::AwaitingResult { .. },
            Event::ActionsReceived {
                batch_id,
                action_count,
                requires_confirmation: true,
            },
        ) => {
            let effects = vec![
                Effect::LogActivity {
                    message: format!("Holding {} actions for confirmation", action_count),
                },
                Effect::HoldProposal {
                    batch_id: batch_id.clone(),
                },
            ];
            Ok((
                State::ActionsProposed {
                    batch_id,
                    action_count,
                },
                effects,
            ))
        }

        (
            State::AwaitingResult { .. },
            Event::ActionsReceived {
                batch_id,
                action_count,
                requires_confirmation: false,
            },
        ) => {
            let effects = vec![Effect::ExecuteActions {
                batch_id: batch_id.clone(),
                count: action_count,
            }];
            Ok((State::ActionsApplied { batch_id }, effects))
        }

        (State::AwaitingResult { prompt }, Event::Error { message }) => {
            let effects = vec![
                Effect::LogActivity {
                    message: format!("Request '{}' failed: {}", prompt, message),
                },
                Effect::ReportError {
                    message: message.clone(),
                },
            ];
            Ok((State::ErrorReported { message }, effects))
        }

        // From ActionsProposed state
        (State::ActionsProposed { batch_id, .. }, Event::ConfirmSubset { selected }) => {
            let effects = vec![Effect::ExecuteActions {
                batch_id: batch_id.clone(),
                count: selected,
            }];
            Ok((State::ActionsApplied { batch_id }, effects))
        }

        (State::ActionsProposed { batch_id, .. }, Event::Cancel) => {
            let effects = vec![
                Effect::LogActivity {
                    message: format!("Proposal {} cancelled", batch_id),
                },
                Effect::DiscardProposal { batch_id },
            ];
            Ok((State::Idle, effects))
        }

        // From ActionsApplied state
        (State::ActionsApplied { batch_id }, Event::BatchSettled { recorded }) => {
            let effects = if recorded {
                vec![Effect::RecordBatch { batch_id }]
            } else {
                vec![Effect::LogActivity {
                    message: format!("Batch {} changed nothing", batch_id),
                }]
            };
            Ok((State::Idle, effects))
        }

        // Return to Idle
        (State::RollbackApplied { .. }, Event::SnapshotRestored) => Ok((State::Idle, vec![])),

        (State::ErrorReported { .. }, Event::Acknowledge) => Ok((State::Idle, vec![])),

        // All other transitions are protocol violations
        (state, event) => Err(AtelierError::InvalidTransition(format!(
            "{:?} cannot handle event {:?}",
            state, event
        ))),
    }
}
