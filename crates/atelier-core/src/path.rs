//! Dotted-path addressing over a JSON document
//!
//! Paths never index into arrays: `services.items` addresses the array as a
//! whole, and element access goes through the index-bearing actions.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::{AtelierError, Document, Result};

/// A validated dot-separated path such as `hero.styles.title.color`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ContentPath {
    raw: String,
    segments: Vec<String>,
}

impl ContentPath {
    /// Parse a dotted path, rejecting empty paths and empty segments
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AtelierError::Validation("path is empty".to_string()));
        }

        let segments: Vec<String> = raw.split('.').map(str::to_string).collect();
        if segments.iter().any(|s| s.is_empty()) {
            return Err(AtelierError::Validation(format!(
                "path '{}' has an empty segment",
                raw
            )));
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Append a segment, e.g. `hero` + `enabled`
    pub fn child(&self, segment: &str) -> Result<Self> {
        Self::parse(&format!("{}.{}", self.raw, segment))
    }

    /// Display form for one element of the array at this path
    pub fn indexed(&self, index: usize) -> String {
        format!("{}[{}]", self.raw, index)
    }
}

impl std::fmt::Display for ContentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl std::str::FromStr for ContentPath {
    type Err = AtelierError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ContentPath {
    type Error = AtelierError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ContentPath> for String {
    fn from(path: ContentPath) -> Self {
        path.raw
    }
}

/// Reads and writes document fields by [`ContentPath`]
///
/// In lenient mode (the default) a scalar found where an intermediate object
/// is needed is replaced by an empty object. In strict mode the same write is
/// rejected with [`AtelierError::Validation`] and nothing changes. An array
/// in the middle of a path is rejected in both modes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver {
    strict: bool,
}

impl PathResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn strict() -> Self {
        Self { strict: true }
    }

    pub fn with_strict(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Read the value at `path`, or `None` as soon as any step is missing or
    /// not an object
    pub fn get<'a>(doc: &'a Document, path: &ContentPath) -> Option<&'a Value> {
        path.segments()
            .iter()
            .try_fold(doc, |current, segment| current.as_object()?.get(segment))
    }

    /// Mutable counterpart of [`get`](Self::get)
    pub fn get_mut<'a>(doc: &'a mut Document, path: &ContentPath) -> Option<&'a mut Value> {
        path.segments()
            .iter()
            .try_fold(doc, |current, segment| {
                current.as_object_mut()?.get_mut(segment)
            })
    }

    /// Return a new document with `value` written at `path`; `doc` is untouched
    pub fn set(&self, doc: &Document, path: &ContentPath, value: Value) -> Result<Document> {
        let mut next = doc.clone();
        self.set_in_place(&mut next, path, value)?;
        Ok(next)
    }

    /// Write `value` at `path` inside an owned working copy, creating missing
    /// intermediate objects. Returns the previous value at `path`, if any.
    ///
    /// The path is checked before anything is written, so a rejected write
    /// leaves `doc` exactly as it was. Arrays are never replaced on the way
    /// down; other scalars are replaced with objects unless the resolver is
    /// strict.
    pub fn set_in_place(
        &self,
        doc: &mut Document,
        path: &ContentPath,
        value: Value,
    ) -> Result<Option<Value>> {
        self.check_writable(doc, path)?;

        let (last, parents) = path
            .segments()
            .split_last()
            .ok_or_else(|| AtelierError::Validation("path is empty".to_string()))?;

        let mut current = doc;
        for segment in parents {
            let map = ensure_object(current, path);
            current = map
                .entry(segment.clone())
                .or_insert_with(|| Value::Object(Map::new()));
        }

        Ok(ensure_object(current, path).insert(last.clone(), value))
    }

    fn check_writable(&self, doc: &Document, path: &ContentPath) -> Result<()> {
        let mut current = Some(doc);
        let mut walked = Vec::new();

        for segment in path.segments() {
            let Some(value) = current else { break };
            match value {
                Value::Object(map) => current = map.get(segment),
                Value::Null => break,
                other if !self.strict && !other.is_array() => break,
                other => {
                    let at = if walked.is_empty() {
                        "<root>".to_string()
                    } else {
                        walked.join(".")
                    };
                    return Err(AtelierError::Validation(format!(
                        "cannot write '{}': '{}' holds a {} value",
                        path,
                        at,
                        kind_of(other)
                    )));
                }
            }
            walked.push(segment.as_str());
        }

        Ok(())
    }
}

fn ensure_object<'a>(value: &'a mut Value, path: &ContentPath) -> &'a mut Map<String, Value> {
    if !value.is_object() {
        if !value.is_null() {
            debug!("Overwriting {} value while writing {}", kind_of(value), path);
        }
        *value = Value::Object(Map::new());
    }
    match value {
        Value::Object(map) => map,
        _ => unreachable!("value was just replaced with an object"),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
