//! Editing session: one document, its history, and the edit protocol

use std::sync::Arc;

use atelier_actions::{Action, ActionExecutor, ActionProposal, ExecutionOutcome};
use atelier_core::{
    ActionResult, AtelierConfig, AtelierError, ChangeRecord, ContentPath, Document, Result,
};
use atelier_history::{Batch, BatchRecord, BatchSummary, HistoryStore};
use atelier_intent::{IntentClassifier, RollbackIntent, RollbackKind, RuleClassifier};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::source::{AssistantContext, ProposalSource};
use crate::state_machine::{transition, Event, State};

/// Result of executing a batch through the session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyReport {
    pub batch_id: String,
    pub results: Vec<ActionResult>,
    pub changes: Vec<ChangeRecord>,
    /// False when nothing changed and no history entry was written
    pub recorded: bool,
}

impl ApplyReport {
    pub fn failed_count(&self) -> usize {
        self.results.iter().filter(|r| !r.success).count()
    }
}

/// Dry run of a held proposal
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalPreview {
    pub batch_id: String,
    pub description: Option<String>,
    pub results: Vec<ActionResult>,
    pub changes: Vec<ChangeRecord>,
}

/// Result of a rollback request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RollbackReport {
    pub intent: RollbackIntent,
    /// Entries that were rolled back, most recent first
    pub rolled_back: Vec<BatchSummary>,
    /// Changes re-applied after a partial rollback
    pub kept: Vec<ChangeRecord>,
    pub message: String,
}

impl RollbackReport {
    pub fn is_noop(&self) -> bool {
        self.rolled_back.is_empty()
    }
}

/// What happened to a submitted message
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum SubmitOutcome {
    RolledBack(RollbackReport),
    /// Held for [`EditingSession::confirm`] or [`EditingSession::cancel`]
    Proposed(ProposalPreview),
    Applied(ApplyReport),
    /// The proposal source failed; the document is unchanged
    Failed { message: String },
}

struct PendingProposal {
    proposal: ActionProposal,
    batch_id: String,
    prompt: String,
}

/// A single-writer editing session over one site document
///
/// The session owns the current document and its history. Every call runs
/// to completion before the next one starts; `&mut self` enforces that.
pub struct EditingSession {
    document: Arc<Document>,
    history: HistoryStore,
    executor: ActionExecutor,
    classifier: Box<dyn IntentClassifier>,
    state: State,
    pending: Option<PendingProposal>,
    recent_actions: usize,
}

impl std::fmt::Debug for EditingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EditingSession")
            .field("state", &self.state)
            .field("history", &self.history)
            .field("pending", &self.pending.as_ref().map(|p| &p.batch_id))
            .finish()
    }
}

impl EditingSession {
    /// Session with default settings and the built-in rollback phrases
    pub fn new(document: Document) -> Result<Self> {
        Self::from_config(document, &AtelierConfig::default())
    }

    pub fn from_config(document: Document, config: &AtelierConfig) -> Result<Self> {
        let ids = config.id_generator();
        Ok(Self {
            document: Arc::new(document),
            history: HistoryStore::from_config(config).with_ids(Arc::clone(&ids)),
            executor: ActionExecutor::from_config(config).with_ids(ids),
            classifier: Box::new(RuleClassifier::builtin()?),
            state: State::Idle,
            pending: None,
            recent_actions: config.assistant.recent_actions,
        })
    }

    /// Replace the rollback classifier
    pub fn with_classifier(mut self, classifier: Box<dyn IntentClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_executor(mut self, executor: ActionExecutor) -> Self {
        self.executor = executor;
        self
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Shared handle to the current document
    pub fn snapshot(&self) -> Arc<Document> {
        Arc::clone(&self.document)
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn pending(&self) -> Option<&ActionProposal> {
        self.pending.as_ref().map(|p| &p.proposal)
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_rollback()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Context handed to a proposal source
    pub fn assistant_context(&self) -> AssistantContext {
        AssistantContext {
            document: self.snapshot(),
            recent_actions: self.history.recent_actions(self.recent_actions),
            history: self.history.history_summary().to_prompt_context(),
        }
    }

    /// Handle one chat message
    ///
    /// Rollback phrases are answered from history without consulting the
    /// source. Anything else is sent to `source`; its proposal is either held
    /// for confirmation or applied at once.
    #[instrument(skip(self, source))]
    pub async fn submit<S>(&mut self, source: &S, prompt: &str) -> Result<SubmitOutcome>
    where
        S: ProposalSource + ?Sized,
    {
        self.advance(Event::Submit {
            prompt: prompt.to_string(),
        })?;

        if let Some(intent) = self.classifier.classify(prompt) {
            self.advance(Event::RollbackDetected { kind: intent.kind })?;
            let report = self.rollback(intent);
            self.advance(Event::SnapshotRestored)?;
            return report.map(SubmitOutcome::RolledBack);
        }

        let context = self.assistant_context();
        let proposal = match source.propose(prompt, &context).await {
            Ok(proposal) => proposal,
            Err(e) => {
                let message = e.to_string();
                warn!("Proposal source failed: {}", message);
                self.advance(Event::Error {
                    message: message.clone(),
                })?;
                self.advance(Event::Acknowledge)?;
                return Ok(SubmitOutcome::Failed { message });
            }
        };

        let batch_id = proposal
            .batch_id
            .clone()
            .unwrap_or_else(|| self.executor.ids().next_id("batch"));

        self.advance(Event::ActionsReceived {
            batch_id: batch_id.clone(),
            action_count: proposal.actions.len(),
            requires_confirmation: proposal.requires_confirmation,
        })?;

        if proposal.requires_confirmation {
            let preview = self.preview(&proposal, &batch_id);
            self.pending = Some(PendingProposal {
                proposal,
                batch_id,
                prompt: prompt.to_string(),
            });
            return Ok(SubmitOutcome::Proposed(preview));
        }

        let description = proposal.description.clone();
        self.execute_and_record(
            &proposal.actions,
            batch_id,
            description,
            Some(prompt.to_string()),
        )
        .map(SubmitOutcome::Applied)
    }

    /// Dry run of the held proposal
    pub fn preview_pending(&self) -> Option<ProposalPreview> {
        self.pending
            .as_ref()
            .map(|p| self.preview(&p.proposal, &p.batch_id))
    }

    /// Apply the held proposal, or only the actions at `selection`
    #[instrument(skip(self))]
    pub fn confirm(&mut self, selection: Option<&[usize]>) -> Result<ApplyReport> {
        let selected = match (&self.pending, selection) {
            (Some(pending), Some(indices)) => pending.proposal.subset(indices).len(),
            (Some(pending), None) => pending.proposal.actions.len(),
            (None, _) => 0,
        };

        self.advance(Event::ConfirmSubset { selected })?;

        let pending = self.pending.take().ok_or_else(|| {
            AtelierError::InvalidTransition("no proposal is awaiting confirmation".to_string())
        })?;

        let actions = match selection {
            Some(indices) => pending.proposal.subset(indices),
            None => pending.proposal.actions,
        };

        self.execute_and_record(
            &actions,
            pending.batch_id,
            pending.proposal.description,
            Some(pending.prompt),
        )
    }

    /// Discard the held proposal without touching history
    pub fn cancel(&mut self) -> Result<()> {
        self.advance(Event::Cancel)?;
        if let Some(pending) = self.pending.take() {
            info!("Discarded proposal {}", pending.batch_id);
        }
        Ok(())
    }

    /// Apply typed actions from a form, recorded as one batch
    pub fn apply_actions(
        &mut self,
        actions: &[Action],
        description: Option<&str>,
    ) -> Result<ApplyReport> {
        let mut proposal = ActionProposal::from_actions(actions)?;
        proposal.description = description.map(str::to_string);
        self.apply_proposal(proposal)
    }

    /// Apply a proposal immediately, ignoring its confirmation flag
    pub fn apply_proposal(&mut self, proposal: ActionProposal) -> Result<ApplyReport> {
        let batch_id = proposal
            .batch_id
            .clone()
            .unwrap_or_else(|| self.executor.ids().next_id("batch"));
        let prompt = proposal
            .description
            .clone()
            .unwrap_or_else(|| "manual edit".to_string());

        self.advance(Event::Submit { prompt })?;
        self.advance(Event::ActionsReceived {
            batch_id: batch_id.clone(),
            action_count: proposal.actions.len(),
            requires_confirmation: false,
        })?;

        self.execute_and_record(&proposal.actions, batch_id, proposal.description, None)
    }

    /// Apply a rollback directive from outside the chat flow
    pub fn apply_rollback(&mut self, intent: RollbackIntent) -> Result<RollbackReport> {
        self.advance(Event::Submit {
            prompt: format!("rollback {}", intent.kind),
        })?;
        self.advance(Event::RollbackDetected { kind: intent.kind })?;
        let report = self.rollback(intent);
        self.advance(Event::SnapshotRestored)?;
        report
    }

    /// Roll back the most recent applied batch
    pub fn undo(&mut self) -> Result<RollbackReport> {
        self.apply_rollback(RollbackIntent::last())
    }

    /// Re-apply the batch after the cursor, if any
    pub fn redo(&mut self) -> Result<Option<BatchSummary>> {
        if self.state != State::Idle {
            return Err(AtelierError::InvalidTransition(format!(
                "cannot redo while {:?}",
                self.state
            )));
        }

        let Some(batch) = self.history.redo() else {
            return Ok(None);
        };

        self.document = Arc::clone(&batch.snapshot_after);
        info!("Redid batch {}", batch.batch_id);
        Ok(Some(BatchSummary::from(&batch)))
    }

    fn advance(&mut self, event: Event) -> Result<()> {
        let (next, effects) = transition(self.state.clone(), event)?;
        for effect in effects {
            debug!(?effect, "session effect");
        }
        self.state = next;
        Ok(())
    }

    fn preview(&self, proposal: &ActionProposal, batch_id: &str) -> ProposalPreview {
        let outcome = self.executor.execute_raw(&proposal.actions, &self.document);
        ProposalPreview {
            batch_id: batch_id.to_string(),
            description: proposal.description.clone(),
            results: outcome.results,
            changes: outcome.changes,
        }
    }

    fn execute_and_record(
        &mut self,
        actions: &[Value],
        batch_id: String,
        description: Option<String>,
        prompt: Option<String>,
    ) -> Result<ApplyReport> {
        let outcome = self.executor.execute_raw(actions, &self.document);
        let description = description.unwrap_or_else(|| outcome.describe());
        let results = outcome.results.clone();
        let changes = outcome.changes.clone();
        let recorded = self.record(outcome, &batch_id, description, prompt);

        self.advance(Event::BatchSettled { recorded })?;

        Ok(ApplyReport {
            batch_id,
            results,
            changes,
            recorded,
        })
    }

    /// Adopt an outcome and push it to history; no-ops are dropped
    fn record(
        &mut self,
        outcome: ExecutionOutcome,
        batch_id: &str,
        description: String,
        prompt: Option<String>,
    ) -> bool {
        if outcome.is_noop() {
            debug!("Batch {} changed nothing, not recorded", batch_id);
            return false;
        }

        let before = Arc::clone(&self.document);
        let after = Arc::new(outcome.updated_content);

        let mut record = BatchRecord::new(before, Arc::clone(&after), outcome.changes)
            .with_batch_id(batch_id)
            .with_description(description);
        if let Some(prompt) = prompt {
            record = record.with_user_prompt(prompt);
        }

        self.history.push_batch(record);
        self.document = after;
        true
    }

    fn rollback(&mut self, intent: RollbackIntent) -> Result<RollbackReport> {
        let undone: Vec<Batch> = match intent.kind {
            RollbackKind::Last | RollbackKind::Partial => {
                self.history.rollback_last().into_iter().collect()
            }
            RollbackKind::Multiple => self.history.rollback_multiple(intent.count.unwrap_or(1)),
            RollbackKind::Reset => self.history.rollback_all(),
            RollbackKind::ToBatch => {
                let target = intent.target.as_deref().unwrap_or_default();
                let mut batches = self.history.rollback_to_batch(target).unwrap_or_default();
                batches.reverse();
                batches
            }
        };

        // Most recent first, so the oldest undone entry is last
        let Some(oldest) = undone.last() else {
            info!("Nothing to roll back for {}", intent.kind);
            return Ok(RollbackReport {
                intent,
                rolled_back: Vec::new(),
                kept: Vec::new(),
                message: "Nothing to undo".to_string(),
            });
        };

        self.document = Arc::clone(&oldest.snapshot_before);
        let rolled_back: Vec<BatchSummary> = undone.iter().map(BatchSummary::from).collect();
        info!("Rolled back {} batch(es)", rolled_back.len());

        let kept = if intent.kind == RollbackKind::Partial {
            self.reapply_kept(&intent, &undone)?
        } else {
            Vec::new()
        };

        let message = match (rolled_back.len(), kept.is_empty()) {
            (1, true) => format!("Undid \"{}\"", rolled_back[0].description),
            (1, false) => format!(
                "Undid \"{}\" but kept {}",
                rolled_back[0].description,
                intent.keep.as_deref().unwrap_or_default()
            ),
            (n, _) => format!("Undid {} changes", n),
        };

        Ok(RollbackReport {
            intent,
            rolled_back,
            kept,
            message,
        })
    }

    /// Write back the undone changes whose path has a keep term as a segment
    fn reapply_kept(
        &mut self,
        intent: &RollbackIntent,
        undone: &[Batch],
    ) -> Result<Vec<ChangeRecord>> {
        let terms = intent.keep_terms();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut actions: Vec<Action> = Vec::new();
        for change in undone.iter().flat_map(|b| b.changes.iter()) {
            if !change.is_addressable() || !names_kept_segment(&change.path, &terms) {
                continue;
            }
            let Some(value) = change.new_value.clone() else {
                continue;
            };
            actions.push(Action::Update {
                path: ContentPath::parse(&change.path)?,
                value,
                label: Some(format!("Keep {}", change.path)),
            });
        }

        if actions.is_empty() {
            debug!("No undone change matches {:?}", terms);
            return Ok(Vec::new());
        }

        let outcome = self.executor.execute(&actions, &self.document);
        let changes = outcome.changes.clone();
        let batch_id = self.executor.ids().next_id("batch");
        let description = format!(
            "Kept {} from undone batch",
            intent.keep.as_deref().unwrap_or_default()
        );
        self.record(outcome, &batch_id, description, None);

        Ok(changes)
    }
}

/// Whole-segment match, so "title" keeps `hero.title` but not `hero.subtitle`
fn names_kept_segment(path: &str, terms: &[String]) -> bool {
    path.split('.')
        .any(|segment| terms.iter().any(|t| segment.eq_ignore_ascii_case(t)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn site() -> Document {
        json!({
            "hero": {"title": "Welcome", "subtitle": "Hello"},
            "theme": {"primary": "#000000", "secondary": "#ffffff"},
            "services": {"items": [{"id": "s1", "name": "Design"}]}
        })
    }

    fn update(path: &str, value: Value) -> Action {
        Action::Update {
            path: ContentPath::parse(path).unwrap(),
            value,
            label: None,
        }
    }

    #[test]
    fn test_apply_actions_records_batch() {
        let mut session = EditingSession::new(site()).unwrap();
        let report = session
            .apply_actions(&[update("hero.title", json!("Hi"))], Some("Retitle"))
            .unwrap();

        assert!(report.recorded);
        assert_eq!(session.document()["hero"]["title"], "Hi");
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().entries()[0].description, "Retitle");
        assert_eq!(session.state(), &State::Idle);
    }

    #[test]
    fn test_noop_batch_is_not_recorded() {
        let mut session = EditingSession::new(site()).unwrap();
        let bad = Action::DeleteItem {
            path: ContentPath::parse("services.items").unwrap(),
            index: 9,
            label: None,
        };
        let report = session.apply_actions(&[bad], None).unwrap();

        assert!(!report.recorded);
        assert_eq!(report.failed_count(), 1);
        assert!(session.history().is_empty());
        assert_eq!(session.state(), &State::Idle);
    }

    #[test]
    fn test_undo_redo_restore_snapshots() {
        let mut session = EditingSession::new(site()).unwrap();
        let original = session.document().clone();
        session
            .apply_actions(&[update("hero.title", json!("Hi"))], None)
            .unwrap();
        let edited = session.document().clone();

        let report = session.undo().unwrap();
        assert_eq!(report.rolled_back.len(), 1);
        assert_eq!(session.document(), &original);

        let redone = session.redo().unwrap();
        assert!(redone.is_some());
        assert_eq!(session.document(), &edited);

        assert!(session.redo().unwrap().is_none());
    }

    #[test]
    fn test_undo_with_empty_history_is_noop() {
        let mut session = EditingSession::new(site()).unwrap();
        let report = session.undo().unwrap();
        assert!(report.is_noop());
        assert_eq!(report.message, "Nothing to undo");
        assert_eq!(session.document(), &site());
    }

    #[test]
    fn test_reset_restores_oldest_snapshot() {
        let mut session = EditingSession::new(site()).unwrap();
        for title in ["One", "Two", "Three"] {
            session
                .apply_actions(&[update("hero.title", json!(title))], None)
                .unwrap();
        }

        let report = session.apply_rollback(RollbackIntent::reset()).unwrap();
        assert_eq!(report.rolled_back.len(), 3);
        assert_eq!(report.message, "Undid 3 changes");
        assert_eq!(session.document(), &site());
        assert!(!session.can_undo());
        assert!(session.can_redo());
    }

    #[test]
    fn test_partial_rollback_keeps_matching_paths() {
        let mut session = EditingSession::new(site()).unwrap();
        session
            .apply_actions(
                &[
                    update("hero.title", json!("New title")),
                    update("hero.subtitle", json!("New subtitle")),
                ],
                None,
            )
            .unwrap();

        let report = session
            .apply_rollback(RollbackIntent::partial("the title"))
            .unwrap();

        assert_eq!(report.kept.len(), 1);
        assert_eq!(report.kept[0].path, "hero.title");
        assert_eq!(session.document()["hero"]["title"], "New title");
        assert_eq!(session.document()["hero"]["subtitle"], "Hello");

        // The original batch is undone and the kept change is a new batch
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history().entries()[0].changes.len(), 1);
    }

    #[test]
    fn test_partial_rollback_keep_term_can_name_a_section() {
        let mut session = EditingSession::new(site()).unwrap();
        session
            .apply_actions(
                &[
                    update("hero.title", json!("New title")),
                    update("hero.subtitle", json!("New subtitle")),
                    update("theme.primary", json!("#ff0000")),
                ],
                None,
            )
            .unwrap();

        let report = session
            .apply_rollback(RollbackIntent::partial("the hero"))
            .unwrap();

        let kept: Vec<&str> = report.kept.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(kept, vec!["hero.title", "hero.subtitle"]);
        assert_eq!(session.document()["theme"]["primary"], "#000000");
    }

    #[test]
    fn test_keep_terms_match_whole_segments() {
        let terms = vec!["title".to_string()];
        assert!(names_kept_segment("hero.title", &terms));
        assert!(names_kept_segment("Hero.Title", &terms));
        assert!(!names_kept_segment("hero.subtitle", &terms));
        assert!(!names_kept_segment("titles.main", &terms));
    }

    #[test]
    fn test_redo_rejected_outside_idle() {
        let mut session = EditingSession::new(site()).unwrap();
        session.state = State::ActionsProposed {
            batch_id: "b".to_string(),
            action_count: 1,
        };
        assert!(matches!(
            session.redo(),
            Err(AtelierError::InvalidTransition(_))
        ));
    }

    #[test]
    fn test_confirm_without_pending_is_invalid() {
        let mut session = EditingSession::new(site()).unwrap();
        assert!(matches!(
            session.confirm(None),
            Err(AtelierError::InvalidTransition(_))
        ));
        assert!(matches!(
            session.cancel(),
            Err(AtelierError::InvalidTransition(_))
        ));
        assert_eq!(session.state(), &State::Idle);
    }
}
