//! Replay scripts: canned assistant answers plus a list of user steps

use std::collections::HashMap;

use anyhow::{Context, Result};
use atelier_actions::ActionProposal;
use atelier_session::ScriptedProposalSource;
use serde::Deserialize;

/// One user interaction
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayStep {
    /// A chat message
    Say(String),
    /// Confirm the held proposal; `null` confirms every action
    Confirm(Option<Vec<usize>>),
    Cancel,
    Undo,
    Redo,
    /// A form edit applied directly
    Apply(ActionProposal),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReplayScript {
    /// Assistant proposal per chat message
    #[serde(default)]
    pub responses: HashMap<String, ActionProposal>,
    /// Assistant failure per chat message
    #[serde(default)]
    pub errors: HashMap<String, String>,
    pub steps: Vec<ReplayStep>,
}

impl ReplayScript {
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).context("Failed to parse replay script")
    }

    pub fn source(&self) -> ScriptedProposalSource {
        let mut source = self
            .errors
            .iter()
            .fold(ScriptedProposalSource::new(), |source, (prompt, message)| {
                source.with_error(prompt, message)
            });
        for (prompt, proposal) in &self.responses {
            source.insert(prompt, proposal.clone());
        }
        source
    }
}
