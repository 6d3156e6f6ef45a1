//! Outcome types for permission injection.
//!
//! None of the outcomes recorded here abort processing. A malformed document
//! comes back with `incorrect_yaml` set and its text untouched; a job that
//! cannot be solved carries a `JobError` while its siblings are still fixed.

use serde::{Deserialize, Serialize};

/// Prefix marking an error as an accepted, allow-listed limitation.
pub const KNOWN_ISSUE_MARKER: &str = "KnownIssue";

/// Diagnostics for a single job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobError {
    pub job_name: String,
    /// Error messages in the order they were encountered.
    pub errors: Vec<String>,
    /// True when every error in this job is an allow-listed known issue.
    pub known_issue: bool,
}

impl JobError {
    pub fn new(job_name: impl Into<String>) -> Self {
        Self {
            job_name: job_name.into(),
            errors: Vec::new(),
            known_issue: true,
        }
    }

    /// Record an error. Known issues are prefixed with `KnownIssue: `.
    pub fn push(&mut self, message: impl Into<String>, known_issue: bool) {
        let message = message.into();
        if known_issue {
            self.errors.push(format!("{KNOWN_ISSUE_MARKER}: {message}"));
        } else {
            self.known_issue = false;
            self.errors.push(message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

/// The result of `add_job_level_permissions`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixResult {
    /// The full workflow text after injection (the input when nothing changed).
    pub final_output: String,
    /// At least one job already declared its own permissions block.
    pub already_has_permissions: bool,
    /// The input could not be read as a workflow; `final_output` is the input.
    pub incorrect_yaml: bool,
    /// At least one job was rewritten.
    pub is_changed: bool,
    /// At least one job error is not an allow-listed known issue.
    pub has_errors: bool,
    pub job_errors: Vec<JobError>,
    /// Unresolved `uses:` values, in first-seen order, without duplicates.
    pub missing_actions: Vec<String>,
}

impl FixResult {
    /// A result that returns `input` unchanged with `incorrect_yaml` set.
    pub fn incorrect(input: &str) -> Self {
        Self {
            final_output: input.to_string(),
            incorrect_yaml: true,
            ..Self::default()
        }
    }

    /// Record a missing action once, keeping first-seen order.
    pub fn add_missing_action(&mut self, action: &str) {
        if !self.missing_actions.iter().any(|a| a == action) {
            self.missing_actions.push(action.to_string());
        }
    }

    /// Attach a job's diagnostics and refresh `has_errors`.
    pub fn add_job_error(&mut self, job_error: JobError) {
        if job_error.is_empty() {
            return;
        }
        if !job_error.known_issue {
            self.has_errors = true;
        }
        self.job_errors.push(job_error);
    }
}
