//! In-memory corpus accumulator.
//!
//! `CorpusAudit` keeps every recorded outcome behind an `Arc<Mutex<_>>`, so a
//! clone can be handed to each scan worker while the caller keeps one to
//! export the report when the workers are done.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tracing::{debug, info};

use warden_contracts::{
    error::{WardenError, WardenResult},
    fix::FixResult,
};

use crate::report::{CorpusReport, DocumentOutcome};

// ── Internal mutable state ────────────────────────────────────────────────────

#[derive(Default)]
struct AuditState {
    outcomes: BTreeMap<String, DocumentOutcome>,
    changed: BTreeSet<String>,
    /// Missing action → documents that reference it.
    missing_actions: BTreeMap<String, BTreeSet<String>>,
}

impl AuditState {
    /// Drop everything previously recorded for `path`.
    fn forget(&mut self, path: &str) {
        self.outcomes.remove(path);
        self.changed.remove(path);
        for paths in self.missing_actions.values_mut() {
            paths.remove(path);
        }
        self.missing_actions.retain(|_, paths| !paths.is_empty());
    }
}

// ── Public accumulator ────────────────────────────────────────────────────────

/// Collects per-document outcomes from one or more scan workers.
///
/// Recording the same path twice replaces the earlier outcome.
#[derive(Clone, Default)]
pub struct CorpusAudit {
    state: Arc<Mutex<AuditState>>,
}

impl CorpusAudit {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> WardenResult<MutexGuard<'_, AuditState>> {
        self.state.lock().map_err(|e| WardenError::AuditFailed {
            reason: format!("audit state lock poisoned: {}", e),
        })
    }

    /// Record the fixer's result for the document at `path`.
    pub fn record(&self, path: &str, result: &FixResult) -> WardenResult<DocumentOutcome> {
        let outcome = DocumentOutcome::classify(result);
        let mut state = self.lock()?;
        state.forget(path);

        state.outcomes.insert(path.to_string(), outcome);
        if result.is_changed {
            state.changed.insert(path.to_string());
        }
        for action in &result.missing_actions {
            state
                .missing_actions
                .entry(action.clone())
                .or_default()
                .insert(path.to_string());
        }

        debug!(
            path = %path,
            outcome = ?outcome,
            missing = result.missing_actions.len(),
            "document recorded"
        );
        Ok(outcome)
    }

    /// Record a document that could not be read.
    pub fn record_unreadable(&self, path: &str) -> WardenResult<()> {
        let mut state = self.lock()?;
        state.forget(path);
        state
            .outcomes
            .insert(path.to_string(), DocumentOutcome::Unreadable);
        Ok(())
    }

    /// Number of documents recorded so far.
    pub fn len(&self) -> WardenResult<usize> {
        Ok(self.lock()?.outcomes.len())
    }

    pub fn is_empty(&self) -> WardenResult<bool> {
        Ok(self.lock()?.outcomes.is_empty())
    }

    /// Export a sorted summary of everything recorded so far.
    pub fn export_report(&self) -> WardenResult<CorpusReport> {
        let state = self.lock()?;

        let mut report = CorpusReport {
            generated_at: Utc::now(),
            documents: state.outcomes.len(),
            changed: state.changed.len(),
            solvable: BTreeSet::new(),
            unsolvable: BTreeSet::new(),
            unchanged: BTreeSet::new(),
            incorrect_yaml: BTreeSet::new(),
            unreadable: BTreeSet::new(),
            missing_actions: state
                .missing_actions
                .iter()
                .map(|(action, paths)| (action.clone(), paths.len()))
                .collect(),
        };
        for (path, outcome) in &state.outcomes {
            let bucket = match outcome {
                DocumentOutcome::Solvable => &mut report.solvable,
                DocumentOutcome::Unsolvable => &mut report.unsolvable,
                DocumentOutcome::Unchanged => &mut report.unchanged,
                DocumentOutcome::IncorrectYaml => &mut report.incorrect_yaml,
                DocumentOutcome::Unreadable => &mut report.unreadable,
            };
            bucket.insert(path.clone());
        }

        info!(
            documents = report.documents,
            solvable = report.solvable.len(),
            unsolvable = report.unsolvable.len(),
            unchanged = report.unchanged.len(),
            incorrect_yaml = report.incorrect_yaml.len(),
            missing_actions = report.missing_actions.len(),
            "corpus report exported"
        );
        Ok(report)
    }
}
