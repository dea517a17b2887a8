//! Core type definitions shared by the executor, history and session

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ActionErrorKind, AtelierError};

/// The full JSON content tree describing one site's editable state
pub type Document = Value;

/// One successfully executed mutation, used for diff previews
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeRecord {
    /// Dotted path of the changed field; item-level changes use `path[index]`
    pub path: String,
    /// Value before the change (`None` when the field did not exist)
    pub old_value: Option<Value>,
    /// Value after the change (`None` when the field was removed)
    pub new_value: Option<Value>,
}

impl ChangeRecord {
    pub fn new(path: impl Into<String>, old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self {
            path: path.into(),
            old_value,
            new_value,
        }
    }

    /// True when the path is a plain dotted path that can be written back
    pub fn is_addressable(&self) -> bool {
        !self.path.contains('[')
    }
}

/// Outcome of one attempted action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionResult {
    pub success: bool,
    /// Human description of the action
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ActionErrorKind>,
}

impl ActionResult {
    pub fn ok(label: impl Into<String>) -> Self {
        Self {
            success: true,
            label: label.into(),
            error: None,
            error_kind: None,
        }
    }

    pub fn failed(label: impl Into<String>, error: &AtelierError) -> Self {
        Self {
            success: false,
            label: label.into(),
            error: Some(error.to_string()),
            error_kind: Some(error.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_change_record_serializes_camel_case() {
        let record = ChangeRecord::new("hero.title", Some(json!("X")), Some(json!("Y")));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(
            value,
            json!({"path": "hero.title", "oldValue": "X", "newValue": "Y"})
        );
    }

    #[test]
    fn test_change_record_addressable() {
        assert!(ChangeRecord::new("hero.title", None, None).is_addressable());
        assert!(!ChangeRecord::new("services.items[1]", None, None).is_addressable());
    }

    #[test]
    fn test_action_result_failed_carries_kind() {
        let err = AtelierError::OutOfRange("index 5".to_string());
        let result = ActionResult::failed("Delete item", &err);
        assert!(!result.success);
        assert_eq!(result.error_kind, Some(ActionErrorKind::OutOfRange));
        assert!(result.error.unwrap().contains("index 5"));

        let ok = serde_json::to_value(ActionResult::ok("Update hero.title")).unwrap();
        assert_eq!(ok, json!({"success": true, "label": "Update hero.title"}));
    }
}
