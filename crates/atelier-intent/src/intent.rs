//! Rollback directives

use serde::{Deserialize, Serialize};

/// What the user asked to undo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RollbackKind {
    /// The most recent batch
    Last,
    /// The most recent `count` batches
    Multiple,
    /// Everything back to before a named batch
    ToBatch,
    /// Every applied batch
    Reset,
    /// The most recent batch, except changes matching `keep`
    Partial,
}

impl std::fmt::Display for RollbackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Last => write!(f, "last"),
            Self::Multiple => write!(f, "multiple"),
            Self::ToBatch => write!(f, "toBatch"),
            Self::Reset => write!(f, "reset"),
            Self::Partial => write!(f, "partial"),
        }
    }
}

/// A detected rollback request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollbackIntent {
    #[serde(rename = "type")]
    pub kind: RollbackKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    /// Batch reference for [`RollbackKind::ToBatch`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    /// What to preserve for [`RollbackKind::Partial`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep: Option<String>,
}

impl RollbackIntent {
    pub fn last() -> Self {
        Self {
            kind: RollbackKind::Last,
            count: Some(1),
            target: None,
            keep: None,
        }
    }

    pub fn multiple(count: usize) -> Self {
        Self {
            kind: RollbackKind::Multiple,
            count: Some(count),
            target: None,
            keep: None,
        }
    }

    pub fn to_batch(target: impl Into<String>) -> Self {
        Self {
            kind: RollbackKind::ToBatch,
            count: None,
            target: Some(target.into()),
            keep: None,
        }
    }

    pub fn reset() -> Self {
        Self {
            kind: RollbackKind::Reset,
            count: None,
            target: None,
            keep: None,
        }
    }

    pub fn partial(keep: impl Into<String>) -> Self {
        Self {
            kind: RollbackKind::Partial,
            count: Some(1),
            target: None,
            keep: Some(keep.into()),
        }
    }

    /// Lower-cased content words of `keep`, for matching against change paths
    pub fn keep_terms(&self) -> Vec<String> {
        let Some(keep) = self.keep.as_deref() else {
            return Vec::new();
        };

        keep.split(|c: char| !c.is_alphanumeric())
            .filter(|word| word.chars().count() >= 3)
            .map(str::to_lowercase)
            .filter(|word| !KEEP_STOPWORDS.contains(&word.as_str()))
            .collect()
    }
}

const KEEP_STOPWORDS: &[&str] = &[
    "the", "and", "all", "this", "that", "les", "des", "une", "aux", "pour", "avec", "mais",
    "tout", "tous", "toute", "toutes", "change", "changes", "changement", "changements",
    "modification", "modifications",
];

/// Wire form: `{"isRollback": false}` or `{"isRollback": true, "type": ..}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub is_rollback: bool,
    #[serde(flatten)]
    pub intent: Option<RollbackIntent>,
}

impl From<Option<RollbackIntent>> for Classification {
    fn from(intent: Option<RollbackIntent>) -> Self {
        Self {
            is_rollback: intent.is_some(),
            intent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_classification_wire_shape() {
        let none = Classification::from(None);
        assert_eq!(serde_json::to_value(&none).unwrap(), json!({"isRollback": false}));

        let multiple = Classification::from(Some(RollbackIntent::multiple(3)));
        assert_eq!(
            serde_json::to_value(&multiple).unwrap(),
            json!({"isRollback": true, "type": "multiple", "count": 3})
        );

        let to_batch = Classification::from(Some(RollbackIntent::to_batch("b-9")));
        assert_eq!(
            serde_json::to_value(&to_batch).unwrap(),
            json!({"isRollback": true, "type": "toBatch", "target": "b-9"})
        );
    }

    #[test]
    fn test_keep_terms() {
        let intent = RollbackIntent::partial("the Title and the footer links!");
        assert_eq!(intent.keep_terms(), vec!["title", "footer", "links"]);

        let intent = RollbackIntent::partial("les changements du titre");
        assert_eq!(intent.keep_terms(), vec!["titre"]);

        assert!(RollbackIntent::last().keep_terms().is_empty());
    }

    #[test]
    fn test_kind_display_matches_serde() {
        for kind in [
            RollbackKind::Last,
            RollbackKind::Multiple,
            RollbackKind::ToBatch,
            RollbackKind::Reset,
            RollbackKind::Partial,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.to_string()));
        }
    }
}
