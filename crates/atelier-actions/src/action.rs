//! The action vocabulary

use atelier_core::{AtelierError, ContentPath, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Wire names of every action variant, in declaration order
pub const ACTION_TYPES: &[&str] = &[
    "update",
    "update_item",
    "add_item",
    "delete_item",
    "apply_preset",
    "update_theme",
    "generate_section",
    "toggle_section",
];

/// A single declarative mutation instruction
///
/// Serialized with a `type` discriminant, e.g.
/// `{"type": "update", "path": "hero.title", "value": "Hi"}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Write `value` at `path`
    Update {
        path: ContentPath,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Shallow-merge `updates` into the array element at `index`
    UpdateItem {
        path: ContentPath,
        index: usize,
        updates: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Append `value` to the array at `path`
    AddItem {
        path: ContentPath,
        value: Value,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Remove the array element at `index`
    DeleteItem {
        path: ContentPath,
        index: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Merge a named color pair into `theme`
    ApplyPreset {
        #[serde(rename = "presetId", alias = "preset_id")]
        preset_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Merge the given colors into `theme`
    UpdateTheme {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        primary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        secondary: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Shallow-merge `data` into a top-level section
    GenerateSection {
        section: String,
        data: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
    /// Set `enabled` on an existing top-level section
    ToggleSection {
        section: String,
        enabled: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        label: Option<String>,
    },
}

impl Action {
    /// Decode one raw action object
    ///
    /// A missing or unrecognised `type` is [`AtelierError::UnknownAction`];
    /// a known type with bad fields is [`AtelierError::Validation`].
    pub fn from_value(raw: Value) -> Result<Self> {
        let kind = match raw.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            Some(other) => return Err(AtelierError::UnknownAction(other.to_string())),
            None => return Err(AtelierError::UnknownAction("<missing>".to_string())),
        };

        if !ACTION_TYPES.contains(&kind.as_str()) {
            return Err(AtelierError::UnknownAction(kind));
        }

        serde_json::from_value(raw)
            .map_err(|e| AtelierError::Validation(format!("{}: {}", kind, e)))
    }

    /// Wire name of this variant
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::UpdateItem { .. } => "update_item",
            Self::AddItem { .. } => "add_item",
            Self::DeleteItem { .. } => "delete_item",
            Self::ApplyPreset { .. } => "apply_preset",
            Self::UpdateTheme { .. } => "update_theme",
            Self::GenerateSection { .. } => "generate_section",
            Self::ToggleSection { .. } => "toggle_section",
        }
    }

    /// Explicit label supplied by the producer
    pub fn explicit_label(&self) -> Option<&str> {
        match self {
            Self::Update { label, .. }
            | Self::UpdateItem { label, .. }
            | Self::AddItem { label, .. }
            | Self::DeleteItem { label, .. }
            | Self::ApplyPreset { label, .. }
            | Self::UpdateTheme { label, .. }
            | Self::GenerateSection { label, .. }
            | Self::ToggleSection { label, .. } => label.as_deref(),
        }
    }

    /// Human description: the explicit label, or one derived from the fields
    pub fn label(&self) -> String {
        if let Some(label) = self.explicit_label() {
            return label.to_string();
        }

        match self {
            Self::Update { path, .. } => format!("Update {}", path),
            Self::UpdateItem { path, index, .. } => format!("Update {}", path.indexed(*index)),
            Self::AddItem { path, .. } => format!("Add item to {}", path),
            Self::DeleteItem { path, index, .. } => format!("Delete {}", path.indexed(*index)),
            Self::ApplyPreset { preset_id, .. } => format!("Apply preset {}", preset_id),
            Self::UpdateTheme {
                primary, secondary, ..
            } => {
                let fields: Vec<&str> = [
                    primary.as_ref().map(|_| "primary"),
                    secondary.as_ref().map(|_| "secondary"),
                ]
                .into_iter()
                .flatten()
                .collect();
                if fields.is_empty() {
                    "Update theme".to_string()
                } else {
                    format!("Update theme {}", fields.join(" and "))
                }
            }
            Self::GenerateSection { section, .. } => format!("Generate section {}", section),
            Self::ToggleSection {
                section, enabled, ..
            } => {
                if *enabled {
                    format!("Show section {}", section)
                } else {
                    format!("Hide section {}", section)
                }
            }
        }
    }
}

/// Best-effort label for an action that failed to decode
pub(crate) fn raw_label(raw: &Value) -> String {
    if let Some(label) = raw.get("label").and_then(Value::as_str) {
        return label.to_string();
    }
    match raw.get("type").and_then(Value::as_str) {
        Some(kind) => match raw.get("path").and_then(Value::as_str) {
            Some(path) => format!("{} {}", kind, path),
            None => kind.to_string(),
        },
        None => "unknown action".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_every_variant() {
        let raws = vec![
            json!({"type": "update", "path": "hero.title", "value": "Y"}),
            json!({"type": "update_item", "path": "services.items", "index": 0, "updates": {"title": "A"}}),
            json!({"type": "add_item", "path": "services.items", "value": {"title": "B"}}),
            json!({"type": "delete_item", "path": "services.items", "index": 1}),
            json!({"type": "apply_preset", "presetId": "ocean"}),
            json!({"type": "update_theme", "primary": "#000"}),
            json!({"type": "generate_section", "section": "faq", "data": {"items": []}}),
            json!({"type": "toggle_section", "section": "faq", "enabled": false, "label": "Hide FAQ"}),
        ];

        let kinds: Vec<&str> = raws
            .into_iter()
            .map(|raw| Action::from_value(raw).unwrap().kind())
            .collect();
        assert_eq!(kinds, ACTION_TYPES);
    }

    #[test]
    fn test_decode_snake_case_preset_alias() {
        let action = Action::from_value(json!({"type": "apply_preset", "preset_id": "forest"})).unwrap();
        assert_eq!(
            action,
            Action::ApplyPreset {
                preset_id: "forest".to_string(),
                label: None
            }
        );
    }

    #[test]
    fn test_decode_unknown_type() {
        let err = Action::from_value(json!({"type": "explode", "path": "hero"})).unwrap_err();
        assert!(matches!(err, AtelierError::UnknownAction(ref t) if t == "explode"));

        let err = Action::from_value(json!({"path": "hero"})).unwrap_err();
        assert!(matches!(err, AtelierError::UnknownAction(_)));

        let err = Action::from_value(json!({"type": 7})).unwrap_err();
        assert!(matches!(err, AtelierError::UnknownAction(_)));
    }

    #[test]
    fn test_decode_malformed_fields() {
        let cases = vec![
            json!({"type": "update", "value": 1}),
            json!({"type": "update", "path": "hero..title", "value": 1}),
            json!({"type": "delete_item", "path": "services.items", "index": -1}),
            json!({"type": "update_item", "path": "services.items", "index": 0, "updates": "nope"}),
            json!({"type": "toggle_section", "section": "faq"}),
        ];
        for raw in cases {
            let err = Action::from_value(raw.clone()).unwrap_err();
            assert!(matches!(err, AtelierError::Validation(_)), "{}", raw);
        }
    }

    #[test]
    fn test_serialize_round_trips_wire_shape() {
        let action = Action::ApplyPreset {
            preset_id: "ocean".to_string(),
            label: None,
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type": "apply_preset", "presetId": "ocean"})
        );
    }

    #[test]
    fn test_default_labels() {
        let update = Action::from_value(json!({"type": "update", "path": "hero.title", "value": 1})).unwrap();
        assert_eq!(update.label(), "Update hero.title");

        let delete = Action::from_value(json!({"type": "delete_item", "path": "services.items", "index": 2})).unwrap();
        assert_eq!(delete.label(), "Delete services.items[2]");

        let theme = Action::UpdateTheme {
            primary: Some("#000".into()),
            secondary: Some("#fff".into()),
            label: None,
        };
        assert_eq!(theme.label(), "Update theme primary and secondary");

        let toggle = Action::ToggleSection {
            section: "faq".into(),
            enabled: false,
            label: Some("Hide the FAQ".into()),
        };
        assert_eq!(toggle.label(), "Hide the FAQ");
    }

    #[test]
    fn test_raw_label() {
        assert_eq!(raw_label(&json!({"type": "explode", "path": "hero"})), "explode hero");
        assert_eq!(raw_label(&json!({"label": "Make it pop"})), "Make it pop");
        assert_eq!(raw_label(&json!(42)), "unknown action");
    }
}
