//! # warden-audit
//!
//! Batch permission audit over a corpus of workflow files.
//!
//! ## Overview
//!
//! The job-level fixer is run over every workflow in a directory and each
//! result is classified as solvable, unsolvable, unchanged or incorrect. Missing
//! actions are counted across documents, which shows which knowledge-base entries
//! would unblock the most workflows.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::path::Path;
//! use warden_audit::scan_dir;
//!
//! let report = scan_dir(&fixer, Path::new("workflows"), 4)?;
//! println!("{}", report.to_json()?);
//! ```

pub mod memory;
pub mod report;
pub mod scan;

pub use memory::CorpusAudit;
pub use report::{CorpusReport, DocumentOutcome};
pub use scan::{discover, scan_corpus, scan_dir};

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::fs;
    use std::path::PathBuf;

    use warden_contracts::{
        action::ActionReference,
        error::{WardenError, WardenResult},
        fix::{FixResult, JobError},
        permission::{Level, PermissionSet, Scope},
    };
    use warden_core::{traits::PermissionResolver, Fixer, FixerConfig};

    use super::{discover, scan_corpus, scan_dir, CorpusAudit, DocumentOutcome};

    // ── Helpers ───────────────────────────────────────────────────────────────

    /// Resolver backed by a fixed table of action keys.
    struct TableResolver {
        table: HashMap<String, PermissionSet>,
    }

    impl PermissionResolver for TableResolver {
        fn resolve(&self, action: &ActionReference) -> WardenResult<PermissionSet> {
            self.table
                .get(&action.key())
                .cloned()
                .ok_or_else(|| WardenError::ActionNotFound {
                    action: action.to_string(),
                })
        }
    }

    fn fixer(known_issues: &[&str]) -> Fixer {
        let mut table: HashMap<String, PermissionSet> = HashMap::new();
        table.insert(
            "actions/checkout".to_string(),
            [(Scope::Contents, Level::Read)].into_iter().collect(),
        );
        table.insert("actions/setup-node".to_string(), PermissionSet::default());
        Fixer::new(
            Box::new(TableResolver { table }),
            FixerConfig::with_known_issues(known_issues.iter().copied()),
        )
    }

    fn corpus_dir(name: &str, files: &[(&str, &str)]) -> PathBuf {
        let root = std::env::temp_dir().join(name);
        let _ = fs::remove_dir_all(&root);
        for (rel, body) in files {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, body).unwrap();
        }
        root
    }

    const SOLVABLE: &str = "on: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n";

    const UNSOLVABLE: &str = "on: push\njobs:\n  build:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: octo/unknown@v1\n      - uses: octo/other@v2\n";

    const ALSO_MISSING: &str = "on: push\njobs:\n  test:\n    runs-on: ubuntu-latest\n    steps:\n      - uses: octo/unknown@v1\n";

    const DECLARED: &str = "on: push\njobs:\n  build:\n    permissions: write-all\n    runs-on: ubuntu-latest\n    steps:\n      - uses: actions/checkout@v4\n";

    // ── 1. accumulator ────────────────────────────────────────────────────────

    #[test]
    fn test_record_classifies_results() {
        let audit = CorpusAudit::new();

        let mut unsolvable = FixResult::default();
        let mut je = JobError::new("build");
        je.push("unknown action", false);
        unsolvable.add_job_error(je);
        unsolvable.add_missing_action("octo/unknown@v1");

        let solved = FixResult {
            is_changed: true,
            ..FixResult::default()
        };

        assert_eq!(audit.record("a.yml", &solved).unwrap(), DocumentOutcome::Solvable);
        assert_eq!(
            audit.record("b.yml", &unsolvable).unwrap(),
            DocumentOutcome::Unsolvable
        );
        assert_eq!(
            audit.record("c.yml", &FixResult::incorrect("123")).unwrap(),
            DocumentOutcome::IncorrectYaml
        );
        audit.record_unreadable("d.yml").unwrap();
        assert_eq!(
            audit.record("e.yml", &FixResult::default()).unwrap(),
            DocumentOutcome::Unchanged
        );

        // A rewritten document with an allow-listed missing action is still unsolvable.
        let mut known = FixResult {
            is_changed: true,
            ..FixResult::default()
        };
        let mut je = JobError::new("deploy");
        je.push("private action", true);
        known.add_job_error(je);
        known.add_missing_action("octo/private@v1");
        assert!(!known.has_errors);
        assert_eq!(audit.record("f.yml", &known).unwrap(), DocumentOutcome::Unsolvable);

        let report = audit.export_report().unwrap();
        assert_eq!(report.documents, 6);
        assert_eq!(report.changed, 2);
        assert_eq!(report.solvable.len(), 1);
        assert!(report.solvable.contains("a.yml"));
        assert!(report.unsolvable.contains("b.yml"));
        assert!(report.unsolvable.contains("f.yml"));
        assert!(report.unchanged.contains("e.yml"));
        assert!(report.incorrect_yaml.contains("c.yml"));
        assert!(report.unreadable.contains("d.yml"));
        assert_eq!(report.missing_actions.get("octo/unknown@v1"), Some(&1));
    }

    #[test]
    fn test_rerecording_a_path_replaces_it() {
        let audit = CorpusAudit::new();
        let mut first = FixResult::default();
        first.add_missing_action("octo/unknown@v1");
        let mut je = JobError::new("build");
        je.push("unknown action", false);
        first.add_job_error(je);

        audit.record("a.yml", &first).unwrap();
        audit.record("a.yml", &FixResult::default()).unwrap();

        let report = audit.export_report().unwrap();
        assert_eq!(report.documents, 1);
        assert!(report.unsolvable.is_empty());
        assert!(report.unchanged.contains("a.yml"));
        assert!(report.missing_actions.is_empty());
    }

    #[test]
    fn test_clones_share_state() {
        let audit = CorpusAudit::new();
        let worker = audit.clone();
        worker.record("a.yml", &FixResult::default()).unwrap();
        assert_eq!(audit.len().unwrap(), 1);
    }

    // ── 2. scanning ───────────────────────────────────────────────────────────

    #[test]
    fn test_scan_dir_classifies_corpus() {
        let root = corpus_dir(
            "warden_audit_scan",
            &[
                ("ok/ci.yml", SOLVABLE),
                ("bad/release.yaml", UNSOLVABLE),
                ("bad/test.yml", ALSO_MISSING),
                ("ok/declared.yml", DECLARED),
                ("junk/not-a-workflow.yml", "123"),
                ("junk/README.md", "# not scanned"),
            ],
        );

        let report = scan_dir(&fixer(&[]), &root, 3).unwrap();
        fs::remove_dir_all(&root).ok();

        assert_eq!(report.documents, 5);
        assert_eq!(report.solvable.len(), 1);
        assert_eq!(report.unchanged.len(), 1);
        assert!(report.unchanged.iter().all(|p| p.ends_with("declared.yml")));
        assert_eq!(report.unsolvable.len(), 2);
        assert_eq!(report.incorrect_yaml.len(), 1);
        assert_eq!(report.changed, 1);
        assert_eq!(
            report.ranked_missing_actions(),
            vec![("octo/unknown@v1", 2), ("octo/other@v2", 1)]
        );
    }

    #[test]
    fn test_allow_listed_missing_actions_stay_unsolvable() {
        let root = corpus_dir("warden_audit_known", &[("ci.yml", ALSO_MISSING)]);
        let report = scan_dir(&fixer(&["Octo/Unknown"]), &root, 2).unwrap();
        fs::remove_dir_all(&root).ok();

        assert!(report.solvable.is_empty());
        assert_eq!(report.unsolvable.len(), 1);
        assert_eq!(report.changed, 0);
        assert_eq!(report.missing_actions.get("octo/unknown@v1"), Some(&1));
    }

    #[test]
    fn test_unreadable_path_is_reported() {
        let missing = std::env::temp_dir().join("warden_audit_no_such_file.yml");
        let _ = fs::remove_file(&missing);
        let report = scan_corpus(&fixer(&[]), &[missing], 8).unwrap();
        assert_eq!(report.documents, 1);
        assert_eq!(report.unreadable.len(), 1);
    }

    #[test]
    fn test_empty_corpus_and_json_report() {
        let report = scan_corpus(&fixer(&[]), &[], 4).unwrap();
        assert_eq!(report.documents, 0);

        let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
        assert_eq!(json["documents"], 0);
        assert!(json["generated_at"].is_string());
    }

    #[test]
    fn test_discover_sorts_and_filters() {
        let root = corpus_dir(
            "warden_audit_discover",
            &[("b.yaml", "x"), ("a/c.yml", "x"), ("a/notes.txt", "x")],
        );
        let found = discover(&root).unwrap();
        let rel: Vec<String> = found
            .iter()
            .map(|p| p.strip_prefix(&root).unwrap().display().to_string())
            .collect();
        fs::remove_dir_all(&root).ok();

        assert_eq!(rel, vec!["a/c.yml", "b.yaml"]);
        assert!(matches!(
            discover(&root),
            Err(WardenError::Io { .. })
        ));
    }
}
