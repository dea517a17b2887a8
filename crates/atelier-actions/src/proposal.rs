//! Producer payloads: a batch of raw actions plus confirmation metadata

use atelier_core::{AtelierError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::action::Action;

/// A batch proposed by a form or an assistant
///
/// Actions stay raw until execution so one malformed entry only fails itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionProposal {
    #[serde(default)]
    pub actions: Vec<Value>,

    /// Hold the batch for user confirmation instead of applying immediately
    #[serde(default)]
    pub requires_confirmation: bool,

    #[serde(default)]
    pub batch_id: Option<String>,

    /// Short summary from the producer, used as the history description
    #[serde(default, alias = "message")]
    pub description: Option<String>,
}

impl ActionProposal {
    pub fn new(actions: Vec<Value>) -> Self {
        Self {
            actions,
            ..Self::default()
        }
    }

    /// Build a proposal from typed actions
    pub fn from_actions(actions: &[Action]) -> Result<Self> {
        let actions = actions
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(Self::new(actions))
    }

    /// Parse a JSON payload; a bare array is accepted as the action list
    pub fn from_json_str(payload: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(payload)?;
        match value {
            Value::Array(actions) => Ok(Self::new(actions)),
            Value::Object(_) => Ok(serde_json::from_value(value)?),
            other => Err(AtelierError::Validation(format!(
                "expected an action list or proposal object, got {}",
                other
            ))),
        }
    }

    pub fn with_confirmation(mut self, requires_confirmation: bool) -> Self {
        self.requires_confirmation = requires_confirmation;
        self
    }

    pub fn with_batch_id(mut self, batch_id: impl Into<String>) -> Self {
        self.batch_id = Some(batch_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// The actions at `indices`, in the order given; unknown indices are skipped
    pub fn subset(&self, indices: &[usize]) -> Vec<Value> {
        indices
            .iter()
            .filter_map(|&i| self.actions.get(i).cloned())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }
}
