//! Knowledge-base linter.
//!
//! `KbLinter` checks `action-security.yml` entries in three layers:
//!
//! 1. **File**: only `action-security.yml` is an accepted name; the file must
//!    be readable, parse as an entry, and sit below `owner/repo`. An optional
//!    `RepositoryProbe` confirms the repository exists.
//! 2. **Endpoints**: every allowed endpoint needs a lower-case FQDN, a
//!    non-zero port and a reason starting with `to `.
//! 3. **Permissions**: every scope must be in the fixed vocabulary, with a
//!    level of `read` or `write` and a reason starting with `to `.
//!
//! Checks within an entry are independent and all failures are collected,
//! so one pass over a tree reports every problem.

use std::path::Path;

use tracing::{debug, warn};
use walkdir::WalkDir;

use warden_contracts::{
    metadata::{ActionMetadata, METADATA_FILE_NAME},
    permission::{Level, Scope},
};
use warden_core::traits::RepositoryProbe;
use warden_kb::{layout, parse_metadata};

use crate::report::{LintIssue, LintReport};

const REASON_PREFIX: &str = "to ";

/// Validates knowledge-base entries and trees.
#[derive(Default)]
pub struct KbLinter {
    /// Checks that each entry's repository exists. Skipped when unset.
    probe: Option<Box<dyn RepositoryProbe>>,
}

impl KbLinter {
    /// Create a linter that does not check repository existence.
    pub fn new() -> Self {
        Self { probe: None }
    }

    /// Create a linter that also asks `probe` whether each entry's repository exists.
    pub fn with_probe(probe: Box<dyn RepositoryProbe>) -> Self {
        Self { probe: Some(probe) }
    }

    /// Check the content rules of one entry. `path` is named in every issue.
    pub fn lint_metadata(&self, metadata: &ActionMetadata, path: &str) -> Vec<LintIssue> {
        let mut issues = Vec::new();

        if metadata.name.is_empty() {
            issues.push(LintIssue::new(
                "name",
                path,
                format!("Name must not be empty in {METADATA_FILE_NAME} at {path}"),
            ));
        }

        // ── Endpoints ─────────────────────────────────────────────────────────
        for endpoint in &metadata.allowed_endpoints {
            if endpoint.fqdn.is_empty() {
                issues.push(LintIssue::new(
                    "fqdn-empty",
                    path,
                    format!("FQDN must not be empty in {METADATA_FILE_NAME} at {path}"),
                ));
            } else if endpoint.fqdn.to_lowercase() != endpoint.fqdn {
                issues.push(LintIssue::new(
                    "fqdn-lowercase",
                    path,
                    format!(
                        "FQDN must be all lower case. It is currently {} in {METADATA_FILE_NAME} at {path}",
                        endpoint.fqdn
                    ),
                ));
            }

            if endpoint.port == 0 {
                issues.push(LintIssue::new(
                    "port",
                    path,
                    format!(
                        "Port must not be empty for fqdn {} in {METADATA_FILE_NAME} at {path}",
                        endpoint.fqdn
                    ),
                ));
            }

            if endpoint.reason.is_empty() {
                issues.push(LintIssue::new(
                    "endpoint-reason-empty",
                    path,
                    format!(
                        "Reason must not be empty for fqdn {} in {METADATA_FILE_NAME} at {path}",
                        endpoint.fqdn
                    ),
                ));
            } else if !endpoint.reason.starts_with(REASON_PREFIX) {
                issues.push(LintIssue::new(
                    "endpoint-reason-prefix",
                    path,
                    format!(
                        "Reason must start with 'to '. It is currently {} in {METADATA_FILE_NAME} at {path}",
                        endpoint.reason
                    ),
                ));
            }
        }

        // ── Permissions ───────────────────────────────────────────────────────
        if let Some(perms) = &metadata.permissions {
            for (scope, requirement) in &perms.scopes {
                if scope.parse::<Scope>().is_err() {
                    issues.push(LintIssue::new(
                        "scope",
                        path,
                        format!(
                            "Scope must be one of {}. It is currently {scope} in {METADATA_FILE_NAME} at {path}",
                            Scope::vocabulary()
                        ),
                    ));
                }

                if requirement.permission.parse::<Level>().is_err() {
                    issues.push(LintIssue::new(
                        "level",
                        path,
                        format!(
                            "Permissions must be either read or write. It is currently {} for scope {scope} in {METADATA_FILE_NAME} at {path}",
                            requirement.permission
                        ),
                    ));
                }

                if !requirement.reason.starts_with(REASON_PREFIX) {
                    issues.push(LintIssue::new(
                        "scope-reason-prefix",
                        path,
                        format!(
                            "Reason must start with 'to '. It is currently {} for scope {scope} in {METADATA_FILE_NAME} at {path}",
                            requirement.reason
                        ),
                    ));
                }
            }
        }

        issues
    }

    /// Check one YAML file found below `root`.
    ///
    /// A wrong file name, an unreadable or unparseable file, or a location
    /// outside `owner/repo` is reported and ends the checks for that file.
    pub fn lint_file(&self, root: &Path, file: &Path) -> Vec<LintIssue> {
        let path = file.display().to_string();

        if !layout::is_metadata_file(file) {
            let name = file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            return vec![LintIssue::new(
                "file-name",
                &path,
                format!("File must be named {METADATA_FILE_NAME}, not {name} at {path}"),
            )];
        }

        let Some((owner, repo)) = layout::owner_repo(root, file) else {
            return vec![LintIssue::new(
                "location",
                &path,
                format!("{METADATA_FILE_NAME} must be placed under <owner>/<repo> at {path}"),
            )];
        };

        if let Some(probe) = &self.probe {
            match probe.repository_exists(&owner, &repo) {
                Ok(true) => {}
                Ok(false) => {
                    return vec![LintIssue::new(
                        "repo-exists",
                        &path,
                        format!("Action repo {owner}/{repo} does not exist at {path}"),
                    )];
                }
                Err(e) => {
                    return vec![LintIssue::new(
                        "repo-exists",
                        &path,
                        format!("Unable to check action repo {owner}/{repo} at {path}: {e}"),
                    )];
                }
            }
        }

        let contents = match std::fs::read_to_string(file) {
            Ok(contents) => contents,
            Err(e) => {
                return vec![LintIssue::new(
                    "read",
                    &path,
                    format!("Unable to read {METADATA_FILE_NAME} at {path}: {e}"),
                )];
            }
        };

        match parse_metadata(&contents, &path) {
            Ok(metadata) => self.lint_metadata(&metadata, &path),
            Err(e) => vec![LintIssue::new(
                "parse",
                &path,
                format!("Unable to unmarshal {METADATA_FILE_NAME} at {path}: {e}"),
            )],
        }
    }

    /// Check every `.yml`/`.yaml` file below `root`, in file-name order.
    pub fn lint_tree(&self, root: &Path) -> LintReport {
        let mut report = LintReport::default();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e
                        .path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| root.display().to_string());
                    report.push(LintIssue::new(
                        "read",
                        &path,
                        format!("Error reading {path}: {e}"),
                    ));
                    continue;
                }
            };
            let file = entry.path();
            if !entry.file_type().is_file() || !layout::is_yaml_file(file) {
                continue;
            }

            report.files_checked += 1;
            let issues = self.lint_file(root, file);
            debug!(path = %file.display(), issues = issues.len(), "linted entry");
            for issue in issues {
                warn!(rule_id = issue.rule_id, message = %issue.message, "knowledge-base issue");
                report.push(issue);
            }
        }

        debug!(
            root = %root.display(),
            files = report.files_checked,
            issues = report.issues.len(),
            "lint complete"
        );
        report
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
