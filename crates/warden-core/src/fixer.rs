//! The fixer: job-level and workflow-level permission injection.
//!
//! Pipeline per document:
//!
//!   text → Workflow → per job PermissionAggregator → rewrite → FixResult
//!
//! Each document is handled in one synchronous pass. Problems are returned as
//! data in `FixResult`; only the low-level rewrite helpers and the
//! workflow-level operation return `Err`.

use tracing::{debug, info, warn};

use warden_contracts::{
    error::{WardenError, WardenResult},
    fix::{FixResult, JobError},
    permission::PermissionSet,
};

use crate::aggregate::PermissionAggregator;
use crate::config::FixerConfig;
use crate::rewrite::{insert_job_permissions, set_workflow_permissions};
use crate::traits::PermissionResolver;
use crate::workflow::Workflow;

/// Computes and injects least-privilege permissions.
///
/// Construct one fixer at startup and reuse it for every document; it holds
/// no per-document state and is safe to share across threads.
pub struct Fixer {
    resolver: Box<dyn PermissionResolver>,
    config: FixerConfig,
}

impl Fixer {
    pub fn new(resolver: Box<dyn PermissionResolver>, config: FixerConfig) -> Self {
        Self { resolver, config }
    }

    pub fn config(&self) -> &FixerConfig {
        &self.config
    }

    /// Add a `permissions` block to every job that lacks one.
    ///
    /// - Jobs that already declare permissions are left alone and set
    ///   `already_has_permissions`.
    /// - Jobs that call a reusable workflow are skipped.
    /// - Jobs with unresolved steps are left alone and get a `JobError`,
    ///   marked `KnownIssue` when every unresolved step is allow-listed.
    /// - Invalid YAML returns the input unchanged with `incorrect_yaml` set.
    pub fn add_job_level_permissions(&self, text: &str) -> FixResult {
        let workflow = match Workflow::parse(text) {
            Ok(workflow) => workflow,
            Err(e) => {
                warn!(error = %e, "workflow is not valid, leaving it unchanged");
                return FixResult::incorrect(text);
            }
        };

        let aggregator = PermissionAggregator::new(self.resolver.as_ref());
        let mut result = FixResult::default();
        let mut output = text.to_string();

        for job in &workflow.jobs {
            if let Some(existing) = &job.permissions {
                debug!(job = %job.name, existing = ?existing, "job already declares permissions");
                result.already_has_permissions = true;
                continue;
            }
            if let Some(called) = &job.calls_workflow {
                debug!(job = %job.name, workflow = %called, "job calls a reusable workflow, skipping");
                continue;
            }

            let audit = aggregator.audit_job(job);
            for missing in audit.missing_actions() {
                result.add_missing_action(missing);
            }

            let Some(permissions) = audit.permissions() else {
                let mut job_error = JobError::new(&job.name);
                for unresolved in &audit.unresolved {
                    job_error.push(
                        unresolved.reason.clone(),
                        self.config.is_known_issue(&unresolved.key),
                    );
                }
                warn!(
                    job = %job.name,
                    unresolved = audit.unresolved.len(),
                    known_issue = job_error.known_issue,
                    "job permissions cannot be computed"
                );
                result.add_job_error(job_error);
                continue;
            };

            match insert_job_permissions(&output, &job.name, permissions) {
                Ok(updated) => {
                    info!(
                        job = %job.name,
                        scopes = permissions.len(),
                        "added job permissions"
                    );
                    output = updated;
                    result.is_changed = true;
                }
                Err(e) => {
                    warn!(job = %job.name, error = %e, "unable to rewrite job");
                    let mut job_error = JobError::new(&job.name);
                    job_error.push(e.to_string(), false);
                    result.add_job_error(job_error);
                }
            }
        }

        result.final_output = output;
        result
    }

    /// Compute one permission set for the whole workflow and write it as the
    /// top-level `permissions` block, replacing any existing one.
    ///
    /// Returns `IncorrectYaml` for invalid input and `UnresolvedActions` when
    /// any job contains a step whose permissions are unknown.
    pub fn add_workflow_level_permissions(&self, text: &str) -> WardenResult<String> {
        let workflow = Workflow::parse(text)?;
        let audit = PermissionAggregator::new(self.resolver.as_ref()).audit_workflow(&workflow);

        let Some(permissions) = audit.permissions() else {
            let mut actions: Vec<String> = Vec::new();
            for unresolved in &audit.unresolved {
                if !actions.contains(&unresolved.uses) {
                    actions.push(unresolved.uses.clone());
                }
            }
            warn!(unresolved = actions.len(), "workflow permissions cannot be computed");
            return Err(WardenError::UnresolvedActions { actions });
        };

        info!(
            jobs = workflow.jobs.len(),
            scopes = permissions.len(),
            replaced = workflow.permissions.is_some(),
            "setting workflow permissions"
        );
        set_workflow_permissions(text, permissions)
    }
}

/// Insert `permissions` into job `job_name` of `text`.
///
/// Fails without producing any text when `text` is not a workflow mapping or
/// the job cannot be located.
pub fn add_permissions(text: &str, job_name: &str, permissions: &PermissionSet) -> WardenResult<String> {
    let workflow = Workflow::parse(text)?;
    if workflow.job(job_name).is_none() {
        return Err(WardenError::JobNotFound {
            job: job_name.to_string(),
        });
    }
    insert_job_permissions(text, job_name, permissions)
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use warden_contracts::{
        action::ActionReference,
        error::{WardenError, WardenResult},
        fix::KNOWN_ISSUE_MARKER,
        permission::{Level, PermissionSet, Scope},
    };

    use crate::config::FixerConfig;
    use crate::traits::PermissionResolver;

    use super::{add_permissions, Fixer};

    // ── Mock helpers ─────────────────────────────────────────────────────────

    struct MockResolver {
        table: HashMap<String, PermissionSet>,
    }

    impl PermissionResolver for MockResolver {
        fn resolve(&self, action: &ActionReference) -> WardenResult<PermissionSet> {
            self.table
                .get(&action.key())
                .cloned()
                .ok_or_else(|| WardenError::ActionNotFound {
                    action: action.to_string(),
                })
        }
    }

    fn fixer_with(known_issues: &[&str]) -> Fixer {
        let mut table: HashMap<String, PermissionSet> = HashMap::new();
        table.insert(
            "actions/checkout".to_string(),
            [(Scope::Contents, Level::Read)].into_iter().collect(),
        );
        table.insert(
            "github/codeql-action/upload-sarif".to_string(),
            [(Scope::SecurityEvents, Level::Write)].into_iter().collect(),
        );
        table.insert(
            "actions/stale".to_string(),
            [(Scope::Issues, Level::Write), (Scope::PullRequests, Level::Write)]
                .into_iter()
                .collect(),
        );
        table.insert("actions/setup-go".to_string(), PermissionSet::new());
        Fixer::new(
            Box::new(MockResolver { table }),
            FixerConfig::with_known_issues(known_issues.iter().copied()),
        )
    }

    fn fixer() -> Fixer {
        fixer_with(&[])
    }

    // ── Job level ────────────────────────────────────────────────────────────

    #[test]
    fn checkout_job_gains_contents_read() {
        let input = "\
name: build
on: [push]

jobs:
  build:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - run: make
";
        let expected = "\
name: build
on: [push]

jobs:
  build:
    permissions:
      contents: read
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - run: make
";
        let result = fixer().add_job_level_permissions(input);
        assert_eq!(result.final_output, expected);
        assert!(result.is_changed);
        assert!(!result.has_errors);
        assert!(!result.already_has_permissions);
        assert!(result.job_errors.is_empty());
    }

    #[test]
    fn non_ascii_keys_are_fixed_not_rejected() {
        let input = "on: push\nnäme: x\njobs:\n  build:\n    ünicode: 1\n    steps:\n      - uses: actions/checkout@v3\n";
        let expected = "on: push\nnäme: x\njobs:\n  build:\n    permissions:\n      contents: read\n    ünicode: 1\n    steps:\n      - uses: actions/checkout@v3\n";
        let result = fixer().add_job_level_permissions(input);
        assert_eq!(result.final_output, expected);
        assert!(result.is_changed);
        assert!(!result.has_errors);
    }

    #[test]
    fn anchored_job_header_gains_permissions() {
        let input = "on: push\njobs:\n  build: &defaults\n    steps:\n      - uses: actions/checkout@v3\n";
        let expected = "on: push\njobs:\n  build: &defaults\n    permissions:\n      contents: read\n    steps:\n      - uses: actions/checkout@v3\n";
        let result = fixer().add_job_level_permissions(input);
        assert_eq!(result.final_output, expected);
        assert!(result.job_errors.is_empty());
    }

    #[test]
    fn write_all_job_is_left_unchanged() {
        let input = "\
on: push
jobs:
  release:
    permissions: write-all
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
";
        let result = fixer().add_job_level_permissions(input);
        assert!(result.already_has_permissions);
        assert!(!result.is_changed);
        assert_eq!(result.final_output, input);
    }

    #[test]
    fn incorrect_yaml_returns_input() {
        for input in ["123", "jobs: [\n", "on: push\n"] {
            let result = fixer().add_job_level_permissions(input);
            assert!(result.incorrect_yaml, "expected incorrect_yaml for {input:?}");
            assert_eq!(result.final_output, input);
            assert!(!result.is_changed);
        }
    }

    #[test]
    fn missing_action_is_reported_and_job_unchanged() {
        let input = "\
on: push
jobs:
  lint:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
  job-with-error:
    runs-on: ubuntu-latest
    steps:
      - uses: octo-org/unknown-action@v1
";
        let expected = "\
on: push
jobs:
  lint:
    permissions:
      contents: read
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
  job-with-error:
    runs-on: ubuntu-latest
    steps:
      - uses: octo-org/unknown-action@v1
";
        let result = fixer().add_job_level_permissions(input);
        assert_eq!(result.final_output, expected);
        assert_eq!(result.missing_actions, vec!["octo-org/unknown-action@v1"]);
        assert!(result.has_errors);
        assert!(result.is_changed);
        assert_eq!(result.job_errors.len(), 1);
        assert_eq!(result.job_errors[0].job_name, "job-with-error");
        assert!(!result.job_errors[0].known_issue);
        assert!(result.job_errors[0].errors[0].contains("octo-org/unknown-action@v1"));
    }

    #[test]
    fn allow_listed_missing_action_is_known_issue() {
        let input = "\
on: push
jobs:
  job-with-error:
    runs-on: ubuntu-latest
    steps:
      - uses: octo-org/unknown-action@v1
";
        let result = fixer_with(&["octo-org/unknown-action"]).add_job_level_permissions(input);
        assert!(!result.has_errors);
        assert_eq!(result.missing_actions, vec!["octo-org/unknown-action@v1"]);
        assert_eq!(result.final_output, input);
        let je = &result.job_errors[0];
        assert!(je.known_issue);
        assert!(je.errors[0].starts_with(KNOWN_ISSUE_MARKER));
    }

    #[test]
    fn job_without_actions_gets_empty_permissions() {
        let input = "\
on: push
jobs:
  test:
    runs-on: ubuntu-latest
    steps:
      - run: cargo test
";
        let result = fixer().add_job_level_permissions(input);
        assert!(result.is_changed);
        assert!(result
            .final_output
            .contains("  test:\n    permissions: {}\n    runs-on: ubuntu-latest\n"));
    }

    #[test]
    fn reusable_workflow_job_is_skipped() {
        let input = "\
on: push
jobs:
  call:
    uses: octo-org/workflows/.github/workflows/ci.yml@main
";
        let result = fixer().add_job_level_permissions(input);
        assert!(!result.is_changed);
        assert!(!result.has_errors);
        assert_eq!(result.final_output, input);
    }

    #[test]
    fn job_level_is_idempotent() {
        let input = "\
on:
  pull_request:
# comment kept
jobs:
  analyze:
    runs-on: ubuntu-latest
    steps:
      - uses: actions/checkout@v3
      - uses: github/codeql-action/upload-sarif@v2
  triage:
    steps:
      - uses: actions/stale@v8
      - uses: actions/setup-go@v4
";
        let f = fixer();
        let first = f.add_job_level_permissions(input);
        assert!(first.is_changed);
        let second = f.add_job_level_permissions(&first.final_output);
        assert!(second.already_has_permissions);
        assert!(!second.is_changed);
        assert_eq!(second.final_output, first.final_output);
        assert!(first
            .final_output
            .contains("    permissions:\n      contents: read\n      security-events: write\n"));
        assert!(first
            .final_output
            .contains("    permissions:\n      issues: write\n      pull-requests: write\n"));
    }

    #[test]
    fn lines_outside_permissions_are_preserved() {
        let input = "\
# top comment
'on':   push   # trailing
jobs:
  build:
    runs-on: \"ubuntu-latest\"
    steps:
      - uses: actions/checkout@v3
        with: { fetch-depth: 0 }
";
        let result = fixer().add_job_level_permissions(input);
        let removed: Vec<&str> = result
            .final_output
            .lines()
            .filter(|l| !l.trim_start().starts_with("permissions:") && !l.contains("contents: read"))
            .collect();
        assert_eq!(removed, input.lines().collect::<Vec<_>>());
    }

    // ── add_permissions ──────────────────────────────────────────────────────

    #[test]
    fn add_permissions_rejects_bad_yaml() {
        let result = add_permissions("123", "", &PermissionSet::new());
        assert!(matches!(result, Err(WardenError::IncorrectYaml { .. })));
    }

    #[test]
    fn add_permissions_rejects_unknown_job() {
        let result = add_permissions("on: push\njobs:\n  a:\n    steps: []\n", "b", &PermissionSet::new());
        assert!(matches!(result, Err(WardenError::JobNotFound { .. })));
    }

    // ── Workflow level ───────────────────────────────────────────────────────

    #[test]
    fn workflow_level_unions_all_jobs() {
        let input = "\
name: ci
on:
  push:
    branches: [main]

jobs:
  build:
    steps:
      - uses: actions/checkout@v3
  stale:
    steps:
      - uses: actions/stale@v8
";
        let expected = "\
name: ci
on:
  push:
    branches: [main]

permissions:
  contents: read
  issues: write
  pull-requests: write

jobs:
  build:
    steps:
      - uses: actions/checkout@v3
  stale:
    steps:
      - uses: actions/stale@v8
";
        let f = fixer();
        let out = f.add_workflow_level_permissions(input).unwrap();
        assert_eq!(out, expected);
        assert_eq!(f.add_workflow_level_permissions(&out).unwrap(), out);
    }

    #[test]
    fn workflow_level_handles_non_ascii_keys() {
        let input = "on: push\nbeschreibung_ä: x\njobs:\n  build:\n    steps:\n      - uses: actions/checkout@v3\n";
        let expected = "on: push\npermissions:\n  contents: read\n\nbeschreibung_ä: x\njobs:\n  build:\n    steps:\n      - uses: actions/checkout@v3\n";
        assert_eq!(fixer().add_workflow_level_permissions(input).unwrap(), expected);
    }

    #[test]
    fn workflow_level_reports_unresolved_actions() {
        let input = "\
on: push
jobs:
  a:
    steps:
      - uses: octo/one@v1
      - uses: octo/one@v1
      - uses: ./local
";
        match fixer().add_workflow_level_permissions(input) {
            Err(WardenError::UnresolvedActions { actions }) => {
                assert_eq!(actions, vec!["octo/one@v1", "./local"]);
            }
            other => panic!("expected UnresolvedActions, got {:?}", other),
        }
    }

    #[test]
    fn workflow_level_rejects_bad_yaml() {
        assert!(matches!(
            fixer().add_workflow_level_permissions("123"),
            Err(WardenError::IncorrectYaml { .. })
        ));
    }
}
