//! Corpus report types.
//!
//! `DocumentOutcome` classifies one `FixResult`; `CorpusReport` is the sealed
//! summary produced when a scan finishes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use warden_contracts::fix::FixResult;

/// How a single workflow document fared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentOutcome {
    /// At least one job was rewritten and nothing is missing or in error.
    Solvable,
    /// A referenced action is missing, allow-listed or not, or a job has an
    /// error that is not a known issue.
    Unsolvable,
    /// A valid workflow that needed no change, e.g. every job already
    /// declares permissions.
    Unchanged,
    /// The document is not a workflow.
    IncorrectYaml,
    /// The document could not be read from disk.
    Unreadable,
}

impl DocumentOutcome {
    pub fn classify(result: &FixResult) -> Self {
        if result.incorrect_yaml {
            DocumentOutcome::IncorrectYaml
        } else if result.has_errors || !result.missing_actions.is_empty() {
            DocumentOutcome::Unsolvable
        } else if result.is_changed {
            DocumentOutcome::Solvable
        } else {
            DocumentOutcome::Unchanged
        }
    }
}

/// Summary of one pass over a corpus.
///
/// All path and action collections are sorted so two scans of the same corpus
/// serialize identically apart from `generated_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusReport {
    /// Wall-clock time (UTC) the report was exported.
    pub generated_at: DateTime<Utc>,

    /// Number of documents recorded.
    pub documents: usize,

    /// Documents that were rewritten.
    pub changed: usize,

    pub solvable: BTreeSet<String>,
    pub unsolvable: BTreeSet<String>,
    pub unchanged: BTreeSet<String>,
    pub incorrect_yaml: BTreeSet<String>,
    pub unreadable: BTreeSet<String>,

    /// Missing `uses:` values and the number of documents that reference each.
    pub missing_actions: BTreeMap<String, usize>,
}

impl CorpusReport {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// The missing actions, most referenced first, ties broken by name.
    pub fn ranked_missing_actions(&self) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .missing_actions
            .iter()
            .map(|(action, count)| (action.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(b.0)));
        ranked
    }
}
