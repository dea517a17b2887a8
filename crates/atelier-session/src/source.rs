//! Seam between a session and whatever produces action proposals

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use atelier_actions::ActionProposal;
use atelier_core::{AtelierError, Document, Result};
use atelier_history::BatchSummary;
use serde::Serialize;

/// What a proposal source gets to see besides the user's message
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantContext {
    pub document: Arc<Document>,
    pub recent_actions: Vec<BatchSummary>,
    /// Plain-text history rendering, ready to paste into a prompt
    pub history: String,
}

/// Turns a free-text request into a batch of proposed actions
///
/// Implemented by the assistant integration. Failures are reported to the
/// user and leave the document untouched.
#[async_trait]
pub trait ProposalSource: Send + Sync {
    async fn propose(&self, prompt: &str, context: &AssistantContext) -> Result<ActionProposal>;
}

/// Proposal source that answers from a fixed table of prompts
///
/// Used for scripted replays and tests.
#[derive(Debug, Clone, Default)]
pub struct ScriptedProposalSource {
    responses: HashMap<String, std::result::Result<ActionProposal, String>>,
}

impl ScriptedProposalSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_response(mut self, prompt: &str, proposal: ActionProposal) -> Self {
        self.insert(prompt, proposal);
        self
    }

    pub fn with_error(mut self, prompt: &str, message: &str) -> Self {
        self.responses
            .insert(key(prompt), Err(message.to_string()));
        self
    }

    pub fn insert(&mut self, prompt: &str, proposal: ActionProposal) {
        self.responses.insert(key(prompt), Ok(proposal));
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

fn key(prompt: &str) -> String {
    prompt.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[async_trait]
impl ProposalSource for ScriptedProposalSource {
    async fn propose(&self, prompt: &str, _context: &AssistantContext) -> Result<ActionProposal> {
        let key = key(prompt);
        match self.responses.get(&key) {
            Some(Ok(proposal)) => Ok(proposal.clone()),
            Some(Err(message)) => Err(AtelierError::Proposal(message.clone())),
            None => Err(AtelierError::Proposal(format!(
                "No scripted response for: {}",
                key
            ))),
        }
    }
}
