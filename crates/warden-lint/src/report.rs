//! Lint issue and report types.

use std::fmt;

use serde::Serialize;

/// A single rule violation in a knowledge-base file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LintIssue {
    /// Stable identifier of the violated rule, e.g. `fqdn-lowercase`.
    pub rule_id: &'static str,
    /// The offending file.
    pub path: String,
    /// Human-readable message; always names `path`.
    pub message: String,
}

impl LintIssue {
    pub fn new(rule_id: &'static str, path: &str, message: String) -> Self {
        Self {
            rule_id,
            path: path.to_string(),
            message,
        }
    }
}

impl fmt::Display for LintIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Every issue found in one pass over a knowledge-base tree.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LintReport {
    pub files_checked: usize,
    pub issues: Vec<LintIssue>,
}

impl LintReport {
    pub fn push(&mut self, issue: LintIssue) {
        self.issues.push(issue);
    }

    /// True when no issue was found.
    pub fn passed(&self) -> bool {
        self.issues.is_empty()
    }

    /// Issue messages in the order they were found.
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.message.clone()).collect()
    }
}
