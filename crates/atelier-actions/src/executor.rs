//! Best-effort batch executor
//!
//! A batch is applied in order against one working copy of the document.
//! Every action either fully applies or leaves the working copy untouched and
//! yields a failure result; a failing action never stops the batch.

use std::sync::Arc;

use atelier_core::{
    ActionResult, AtelierConfig, AtelierError, ChangeRecord, ContentPath, Document, IdGenerator,
    PathResolver, Result, UuidIds,
};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::action::{raw_label, Action};
use crate::presets::PresetCatalog;

/// Output of one batch execution
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionOutcome {
    /// One result per attempted action, in input order
    pub results: Vec<ActionResult>,
    /// The new document; the input document is never modified
    pub updated_content: Document,
    /// One record per successful mutation, in application order
    pub changes: Vec<ChangeRecord>,
}

impl ExecutionOutcome {
    pub fn succeeded_count(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }

    pub fn failed_count(&self) -> usize {
        self.results.len() - self.succeeded_count()
    }

    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// True when nothing in the document changed
    pub fn is_noop(&self) -> bool {
        self.changes.is_empty()
    }

    /// Labels of the actions that applied, joined for a history description
    pub fn describe(&self) -> String {
        let labels: Vec<&str> = self
            .results
            .iter()
            .filter(|r| r.success)
            .map(|r| r.label.as_str())
            .collect();
        labels.join(", ")
    }
}

enum Step<'a> {
    Ready(&'a Action),
    Rejected {
        label: &'a str,
        error: &'a AtelierError,
    },
}

/// Applies [`Action`] lists to documents
#[derive(Clone)]
pub struct ActionExecutor {
    resolver: PathResolver,
    presets: PresetCatalog,
    ids: Arc<dyn IdGenerator>,
}

impl Default for ActionExecutor {
    fn default() -> Self {
        Self {
            resolver: PathResolver::new(),
            presets: PresetCatalog::default(),
            ids: Arc::new(UuidIds),
        }
    }
}

impl std::fmt::Debug for ActionExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActionExecutor")
            .field("resolver", &self.resolver)
            .field("presets", &self.presets.list().len())
            .finish()
    }
}

impl ActionExecutor {
    pub fn new(resolver: PathResolver, presets: PresetCatalog, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            resolver,
            presets,
            ids,
        }
    }

    /// Build an executor from site configuration
    pub fn from_config(config: &AtelierConfig) -> Self {
        Self::new(
            config.path_resolver(),
            PresetCatalog::with_overrides(&config.presets),
            config.id_generator(),
        )
    }

    pub fn with_ids(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn with_resolver(mut self, resolver: PathResolver) -> Self {
        self.resolver = resolver;
        self
    }

    pub fn with_presets(mut self, presets: PresetCatalog) -> Self {
        self.presets = presets;
        self
    }

    pub fn presets(&self) -> &PresetCatalog {
        &self.presets
    }

    pub fn ids(&self) -> Arc<dyn IdGenerator> {
        Arc::clone(&self.ids)
    }

    /// Apply `actions` in order to a copy of `document`
    #[instrument(skip_all, fields(actions = actions.len()))]
    pub fn execute(&self, actions: &[Action], document: &Document) -> ExecutionOutcome {
        self.run(actions.iter().map(Step::Ready), document)
    }

    /// Decode and apply raw action objects
    ///
    /// Objects that fail to decode produce a failure result in their position;
    /// the rest of the batch still runs.
    #[instrument(skip_all, fields(actions = raw.len()))]
    pub fn execute_raw(&self, raw: &[Value], document: &Document) -> ExecutionOutcome {
        let decoded: Vec<std::result::Result<Action, (String, AtelierError)>> = raw
            .iter()
            .map(|r| Action::from_value(r.clone()).map_err(|e| (raw_label(r), e)))
            .collect();

        let steps = decoded.iter().map(|d| match d {
            Ok(action) => Step::Ready(action),
            Err((label, error)) => Step::Rejected { label, error },
        });

        self.run(steps, document)
    }

    /// Dry run: what `actions` would change, without handing back a document
    pub fn preview(&self, actions: &[Action], document: &Document) -> (Vec<ActionResult>, Vec<ChangeRecord>) {
        let outcome = self.execute(actions, document);
        (outcome.results, outcome.changes)
    }

    fn run<'a>(&self, steps: impl Iterator<Item = Step<'a>>, document: &Document) -> ExecutionOutcome {
        let mut working = document.clone();
        let mut results = Vec::new();
        let mut changes = Vec::new();

        for step in steps {
            match step {
                Step::Ready(action) => {
                    let label = action.label();
                    match self.apply(action, &mut working) {
                        Ok(mut applied) => {
                            debug!("Applied {} ({} changes)", label, applied.len());
                            changes.append(&mut applied);
                            results.push(ActionResult::ok(label));
                        }
                        Err(e) => {
                            warn!("Action '{}' failed: {}", label, e);
                            results.push(ActionResult::failed(label, &e));
                        }
                    }
                }
                Step::Rejected { label, error } => {
                    warn!("Rejected action '{}': {}", label, error);
                    results.push(ActionResult::failed(label, error));
                }
            }
        }

        ExecutionOutcome {
            results,
            updated_content: working,
            changes,
        }
    }

    fn apply(&self, action: &Action, doc: &mut Document) -> Result<Vec<ChangeRecord>> {
        match action {
            Action::Update { path, value, .. } => {
                let old = self.resolver.set_in_place(doc, path, value.clone())?;
                Ok(vec![ChangeRecord::new(path.as_str(), old, Some(value.clone()))])
            }
            Action::UpdateItem {
                path,
                index,
                updates,
                ..
            } => self.update_item(doc, path, *index, updates),
            Action::AddItem { path, value, .. } => self.add_item(doc, path, value),
            Action::DeleteItem { path, index, .. } => {
                let items = array_at(doc, path)?;
                check_index(items.len(), *index, path)?;
                let removed = items.remove(*index);
                Ok(vec![ChangeRecord::new(path.indexed(*index), Some(removed), None)])
            }
            Action::ApplyPreset { preset_id, .. } => {
                let preset = self.presets.get(preset_id)?;
                self.merge_theme(
                    doc,
                    &[("primary", &preset.primary), ("secondary", &preset.secondary)],
                )
            }
            Action::UpdateTheme {
                primary, secondary, ..
            } => {
                let fields: Vec<(&str, &String)> = [("primary", primary), ("secondary", secondary)]
                    .into_iter()
                    .filter_map(|(name, value)| value.as_ref().map(|v| (name, v)))
                    .collect();
                if fields.is_empty() {
                    return Err(AtelierError::Validation(
                        "update_theme needs primary or secondary".to_string(),
                    ));
                }
                self.merge_theme(doc, &fields)
            }
            Action::GenerateSection { section, data, .. } => {
                self.generate_section(doc, section, data)
            }
            Action::ToggleSection {
                section, enabled, ..
            } => {
                let path = section_path(section)?;
                match PathResolver::get(doc, &path) {
                    Some(Value::Object(_)) => {}
                    Some(_) => {
                        return Err(AtelierError::Validation(format!(
                            "section '{}' is not an object",
                            section
                        )))
                    }
                    None => {
                        return Err(AtelierError::OutOfRange(format!(
                            "section '{}' does not exist",
                            section
                        )))
                    }
                }
                let field = path.child("enabled")?;
                let old = self
                    .resolver
                    .set_in_place(doc, &field, Value::Bool(*enabled))?;
                Ok(vec![ChangeRecord::new(
                    field.as_str(),
                    old,
                    Some(Value::Bool(*enabled)),
                )])
            }
        }
    }

    fn update_item(
        &self,
        doc: &mut Document,
        path: &ContentPath,
        index: usize,
        updates: &Map<String, Value>,
    ) -> Result<Vec<ChangeRecord>> {
        let items = array_at(doc, path)?;
        check_index(items.len(), index, path)?;

        let Value::Object(item) = &mut items[index] else {
            return Err(AtelierError::Validation(format!(
                "{} is not an object",
                path.indexed(index)
            )));
        };

        let old = Value::Object(item.clone());
        for (key, value) in updates {
            item.insert(key.clone(), value.clone());
        }
        let new = Value::Object(item.clone());

        Ok(vec![ChangeRecord::new(path.indexed(index), Some(old), Some(new))])
    }

    fn add_item(&self, doc: &mut Document, path: &ContentPath, value: &Value) -> Result<Vec<ChangeRecord>> {
        let mut item = value.clone();
        self.ensure_id(&mut item);

        let items = array_at(doc, path)?;
        items.push(item.clone());

        Ok(vec![ChangeRecord::new(
            path.indexed(items.len() - 1),
            None,
            Some(item),
        )])
    }

    fn merge_theme(&self, doc: &mut Document, fields: &[(&str, &String)]) -> Result<Vec<ChangeRecord>> {
        let mut changes = Vec::with_capacity(fields.len());
        for (name, color) in fields {
            let path = ContentPath::parse(&format!("theme.{}", name))?;
            let new = Value::String((*color).clone());
            let old = self.resolver.set_in_place(doc, &path, new.clone())?;
            changes.push(ChangeRecord::new(path.as_str(), old, Some(new)));
        }
        Ok(changes)
    }

    fn generate_section(
        &self,
        doc: &mut Document,
        section: &str,
        data: &Map<String, Value>,
    ) -> Result<Vec<ChangeRecord>> {
        let path = section_path(section)?;

        let mut data = data.clone();
        for value in data.values_mut() {
            if let Value::Array(items) = value {
                items.iter_mut().for_each(|item| self.ensure_id(item));
            }
        }

        let old = PathResolver::get(doc, &path).cloned();
        let merged = match &old {
            Some(Value::Object(existing)) => {
                let mut merged = existing.clone();
                merged.extend(data);
                merged
            }
            Some(Value::Null) | None => data,
            Some(_) if self.resolver.is_strict() => {
                return Err(AtelierError::Validation(format!(
                    "section '{}' is not an object",
                    section
                )))
            }
            Some(_) => data,
        };

        let merged = Value::Object(merged);
        self.resolver.set_in_place(doc, &path, merged.clone())?;
        Ok(vec![ChangeRecord::new(path.as_str(), old, Some(merged))])
    }

    /// Give an object item a fresh id if it has none
    fn ensure_id(&self, item: &mut Value) {
        if let Value::Object(map) = item {
            let missing = match map.get("id") {
                None | Some(Value::Null) => true,
                Some(Value::String(id)) => id.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                map.insert("id".to_string(), Value::String(self.ids.next_id("item")));
            }
        }
    }
}

fn array_at<'d>(doc: &'d mut Document, path: &ContentPath) -> Result<&'d mut Vec<Value>> {
    match PathResolver::get_mut(doc, path) {
        Some(Value::Array(items)) => Ok(items),
        Some(_) => Err(AtelierError::OutOfRange(format!("'{}' is not a list", path))),
        None => Err(AtelierError::OutOfRange(format!("'{}' does not exist", path))),
    }
}

fn check_index(len: usize, index: usize, path: &ContentPath) -> Result<()> {
    if index >= len {
        return Err(AtelierError::OutOfRange(format!(
            "index {} out of range for '{}' ({} items)",
            index, path, len
        )));
    }
    Ok(())
}

fn section_path(section: &str) -> Result<ContentPath> {
    let path = ContentPath::parse(section)?;
    if path.segments().len() != 1 {
        return Err(AtelierError::Validation(format!(
            "section name '{}' must be a single identifier",
            section
        )));
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use atelier_core::{ActionErrorKind, SequentialIds};
    use serde_json::json;

    fn executor() -> ActionExecutor {
        ActionExecutor::default().with_ids(Arc::new(SequentialIds::new()))
    }

    fn action(raw: Value) -> Action {
        Action::from_value(raw).unwrap()
    }

    fn site() -> Document {
        json!({
            "hero": { "title": "X", "enabled": true },
            "services": {
                "enabled": true,
                "items": [
                    { "id": "s1", "title": "Design" },
                    { "id": "s2", "title": "Build" }
                ]
            },
            "theme": { "primary": "#111111", "secondary": "#222222", "font": "Inter" }
        })
    }

    #[test]
    fn test_update_records_change() {
        let doc = json!({"hero": {"title": "X"}});
        let outcome = executor().execute(
            &[action(json!({"type": "update", "path": "hero.title", "value": "Y"}))],
            &doc,
        );

        assert_eq!(outcome.updated_content["hero"]["title"], json!("Y"));
        assert_eq!(
            outcome.changes,
            vec![ChangeRecord::new("hero.title", Some(json!("X")), Some(json!("Y")))]
        );
        assert!(outcome.all_succeeded());
        assert_eq!(doc["hero"]["title"], json!("X"));
    }

    #[test]
    fn test_delete_out_of_range_leaves_document_unchanged() {
        let doc = site();
        let outcome = executor().execute(
            &[action(json!({"type": "delete_item", "path": "services.items", "index": 5}))],
            &doc,
        );

        assert_eq!(outcome.updated_content, doc);
        assert_eq!(outcome.results.len(), 1);
        assert!(!outcome.results[0].success);
        assert_eq!(outcome.results[0].error_kind, Some(ActionErrorKind::OutOfRange));
        assert!(outcome.is_noop());
    }

    #[test]
    fn test_failure_is_isolated_within_batch() {
        let outcome = executor().execute(
            &[
                action(json!({"type": "delete_item", "path": "services.items", "index": 9})),
                action(json!({"type": "update", "path": "hero.title", "value": "Fresh"})),
            ],
            &site(),
        );

        assert!(!outcome.results[0].success);
        assert!(outcome.results[1].success);
        assert_eq!(outcome.updated_content["hero"]["title"], json!("Fresh"));
        assert_eq!(outcome.changes.len(), 1);
        assert_eq!(outcome.succeeded_count(), 1);
        assert_eq!(outcome.failed_count(), 1);
    }

    #[test]
    fn test_same_batch_is_deterministic() {
        let actions = vec![
            action(json!({"type": "add_item", "path": "services.items", "value": {"title": "Host"}})),
            action(json!({"type": "update_item", "path": "services.items", "index": 0, "updates": {"title": "UX"}})),
            action(json!({"type": "apply_preset", "presetId": "sunset"})),
            action(json!({"type": "toggle_section", "section": "hero", "enabled": false})),
        ];

        let first = executor().execute(&actions, &site());
        let second = executor().execute(&actions, &site().clone());
        assert_eq!(first.updated_content, second.updated_content);
        assert_eq!(first.changes, second.changes);
    }

    #[test]
    fn test_update_item_shallow_merges() {
        let outcome = executor().execute(
            &[action(json!({
                "type": "update_item", "path": "services.items", "index": 1,
                "updates": {"title": "Ship", "icon": "rocket"}
            }))],
            &site(),
        );

        assert_eq!(
            outcome.updated_content["services"]["items"][1],
            json!({"id": "s2", "title": "Ship", "icon": "rocket"})
        );
        assert_eq!(outcome.changes[0].path, "services.items[1]");
    }

    #[test]
    fn test_update_item_failures() {
        let exec = executor();
        let doc = site();
        let outcome = exec.execute(
            &[
                action(json!({"type": "update_item", "path": "hero.title", "index": 0, "updates": {}})),
                action(json!({"type": "update_item", "path": "services.items", "index": 2, "updates": {}})),
                action(json!({"type": "update_item", "path": "nowhere.items", "index": 0, "updates": {}})),
            ],
            &doc,
        );
        assert_eq!(outcome.failed_count(), 3);
        assert_eq!(outcome.updated_content, doc);
    }

    #[test]
    fn test_add_item_assigns_missing_id() {
        let outcome = executor().execute(
            &[
                action(json!({"type": "add_item", "path": "services.items", "value": {"title": "Host"}})),
                action(json!({"type": "add_item", "path": "services.items", "value": {"id": "keep", "title": "SEO"}})),
            ],
            &site(),
        );

        let items = outcome.updated_content["services"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 4);
        assert_eq!(items[2]["id"], json!("item-1"));
        assert_eq!(items[3]["id"], json!("keep"));
        assert_eq!(outcome.changes[0].path, "services.items[2]");
        assert_eq!(outcome.changes[0].old_value, None);
    }

    #[test]
    fn test_add_item_requires_array() {
        let outcome = executor().execute(
            &[action(json!({"type": "add_item", "path": "hero", "value": {}}))],
            &site(),
        );
        assert_eq!(outcome.results[0].error_kind, Some(ActionErrorKind::OutOfRange));
    }

    #[test]
    fn test_delete_item() {
        let outcome = executor().execute(
            &[action(json!({"type": "delete_item", "path": "services.items", "index": 0}))],
            &site(),
        );
        let items = outcome.updated_content["services"]["items"].as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], json!("s2"));
        assert_eq!(outcome.changes[0].new_value, None);
        assert_eq!(outcome.changes[0].old_value.as_ref().unwrap()["id"], json!("s1"));
    }

    #[test]
    fn test_apply_preset_merges_theme() {
        let outcome = executor().execute(
            &[action(json!({"type": "apply_preset", "presetId": "ocean"}))],
            &site(),
        );
        let theme = &outcome.updated_content["theme"];
        assert_eq!(theme["primary"], json!("#0ea5e9"));
        assert_eq!(theme["secondary"], json!("#0369a1"));
        assert_eq!(theme["font"], json!("Inter"));
        assert_eq!(outcome.changes.len(), 2);
    }

    #[test]
    fn test_apply_unknown_preset_fails() {
        let doc = site();
        let outcome = executor().execute(
            &[action(json!({"type": "apply_preset", "presetId": "neon"}))],
            &doc,
        );
        assert_eq!(outcome.results[0].error_kind, Some(ActionErrorKind::PresetNotFound));
        assert_eq!(outcome.updated_content, doc);
    }

    #[test]
    fn test_update_theme_only_touches_given_fields() {
        let outcome = executor().execute(
            &[action(json!({"type": "update_theme", "secondary": "#abcdef"}))],
            &site(),
        );
        let theme = &outcome.updated_content["theme"];
        assert_eq!(theme["primary"], json!("#111111"));
        assert_eq!(theme["secondary"], json!("#abcdef"));
        assert_eq!(
            outcome.changes,
            vec![ChangeRecord::new("theme.secondary", Some(json!("#222222")), Some(json!("#abcdef")))]
        );

        let empty = executor().execute(&[action(json!({"type": "update_theme"}))], &site());
        assert_eq!(empty.results[0].error_kind, Some(ActionErrorKind::Validation));
    }

    #[test]
    fn test_theme_created_when_missing() {
        let outcome = executor().execute(
            &[action(json!({"type": "update_theme", "primary": "#000"}))],
            &json!({"hero": {}}),
        );
        assert_eq!(outcome.updated_content["theme"], json!({"primary": "#000"}));
    }

    #[test]
    fn test_generate_section_merges_and_assigns_ids() {
        let outcome = executor().execute(
            &[action(json!({
                "type": "generate_section", "section": "services",
                "data": {
                    "title": "What we do",
                    "items": [{"title": "A"}, {"id": "b", "title": "B"}, "loose"]
                }
            }))],
            &site(),
        );

        let services = &outcome.updated_content["services"];
        assert_eq!(services["enabled"], json!(true));
        assert_eq!(services["title"], json!("What we do"));
        assert_eq!(services["items"][0]["id"], json!("item-1"));
        assert_eq!(services["items"][1]["id"], json!("b"));
        assert_eq!(services["items"][2], json!("loose"));
        assert_eq!(outcome.changes[0].path, "services");
    }

    #[test]
    fn test_generate_new_section() {
        let outcome = executor().execute(
            &[action(json!({
                "type": "generate_section", "section": "faq",
                "data": {"enabled": true, "questions": [{"q": "Why?"}]}
            }))],
            &site(),
        );
        assert_eq!(outcome.updated_content["faq"]["questions"][0]["id"], json!("item-1"));
        assert_eq!(outcome.changes[0].old_value, None);
    }

    #[test]
    fn test_generate_section_rejects_nested_name() {
        let outcome = executor().execute(
            &[action(json!({"type": "generate_section", "section": "a.b", "data": {}}))],
            &site(),
        );
        assert_eq!(outcome.results[0].error_kind, Some(ActionErrorKind::Validation));
    }

    #[test]
    fn test_toggle_section() {
        let outcome = executor().execute(
            &[
                action(json!({"type": "toggle_section", "section": "services", "enabled": false})),
                action(json!({"type": "toggle_section", "section": "pricing", "enabled": true})),
            ],
            &site(),
        );
        assert_eq!(outcome.updated_content["services"]["enabled"], json!(false));
        assert!(outcome.results[0].success);
        assert_eq!(outcome.results[1].error_kind, Some(ActionErrorKind::OutOfRange));
        assert!(outcome.updated_content.get("pricing").is_none());
    }

    #[test]
    fn test_execute_raw_rejects_per_action() {
        let raw = vec![
            json!({"type": "explode"}),
            json!({"type": "update", "path": "hero.title"}),
            json!({"type": "update", "path": "hero.title", "value": "Raw"}),
        ];
        let outcome = executor().execute_raw(&raw, &site());

        assert_eq!(outcome.results.len(), 3);
        assert_eq!(outcome.results[0].error_kind, Some(ActionErrorKind::UnknownAction));
        assert_eq!(outcome.results[0].label, "explode");
        assert_eq!(outcome.results[1].error_kind, Some(ActionErrorKind::Validation));
        assert!(outcome.results[2].success);
        assert_eq!(outcome.updated_content["hero"]["title"], json!("Raw"));
    }

    #[test]
    fn test_strict_resolver_rejects_scalar_overwrite() {
        let exec = executor().with_resolver(PathResolver::strict());
        let doc = site();
        let outcome = exec.execute(
            &[action(json!({"type": "update", "path": "hero.title.text", "value": "no"}))],
            &doc,
        );
        assert_eq!(outcome.results[0].error_kind, Some(ActionErrorKind::Validation));
        assert_eq!(outcome.updated_content, doc);
    }

    #[test]
    fn test_preview_and_describe() {
        let exec = executor();
        let doc = site();
        let actions = vec![
            action(json!({"type": "update", "path": "hero.title", "value": "Hi", "label": "Friendlier title"})),
            action(json!({"type": "apply_preset", "presetId": "forest"})),
        ];
        let (results, changes) = exec.preview(&actions, &doc);
        assert_eq!(results.len(), 2);
        assert_eq!(changes.len(), 3);

        let outcome = exec.execute(&actions, &doc);
        assert_eq!(outcome.describe(), "Friendlier title, Apply preset forest");
    }

    #[test]
    fn test_outcome_serializes_camel_case() {
        let outcome = executor().execute(&[], &json!({}));
        let value = serde_json::to_value(&outcome).unwrap();
        assert!(value.get("updatedContent").is_some());
        assert_eq!(value["results"], json!([]));
    }
}
