//! Folding per-step requirements into one minimal permission set.
//!
//! Every action-reference step is resolved and merged with the widening rule
//! of `PermissionSet::grant`. Steps that cannot be resolved are collected as
//! `Unresolved` and make the audit unsolvable; the remaining steps are still
//! visited so a single pass reports every problem in the job.

use tracing::{debug, warn};

use warden_contracts::{error::WardenError, permission::PermissionSet};

use crate::traits::PermissionResolver;
use crate::workflow::{Job, Step, Workflow};

/// A step whose permissions could not be determined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved {
    /// The `uses:` value as written.
    pub uses: String,
    /// Lower-cased key compared against the known-issue allow-list.
    pub key: String,
    pub reason: String,
    /// True when the action simply has no knowledge-base entry.
    pub missing: bool,
}

/// The outcome of auditing one job or a whole workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionAudit {
    /// Union of everything resolved so far.
    pub resolved: PermissionSet,
    pub unresolved: Vec<Unresolved>,
}

impl PermissionAudit {
    /// The minimal permission set, or `None` when anything was unresolved.
    ///
    /// `Some` of an empty set means "audited, nothing needed".
    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.unresolved.is_empty().then_some(&self.resolved)
    }

    /// `uses:` values with no knowledge-base entry, in step order.
    pub fn missing_actions(&self) -> impl Iterator<Item = &str> {
        self.unresolved
            .iter()
            .filter(|u| u.missing)
            .map(|u| u.uses.as_str())
    }

    fn absorb(&mut self, other: PermissionAudit) {
        self.resolved.merge(&other.resolved);
        self.unresolved.extend(other.unresolved);
    }
}

/// Computes minimal permissions using a `PermissionResolver`.
pub struct PermissionAggregator<'r> {
    resolver: &'r dyn PermissionResolver,
}

impl<'r> PermissionAggregator<'r> {
    pub fn new(resolver: &'r dyn PermissionResolver) -> Self {
        Self { resolver }
    }

    /// Audit the steps of a single job.
    pub fn audit_job(&self, job: &Job) -> PermissionAudit {
        let mut audit = PermissionAudit::default();

        if let Some(called) = &job.calls_workflow {
            audit.unresolved.push(Unresolved {
                uses: called.clone(),
                key: key_without_ref(called),
                reason: format!("job calls reusable workflow '{called}'"),
                missing: false,
            });
            return audit;
        }

        for step in &job.steps {
            match step {
                Step::Command => {}
                Step::Action(action) => match self.resolver.resolve(action) {
                    Ok(set) => {
                        debug!(
                            job = %job.name,
                            action = %action,
                            scopes = set.len(),
                            "resolved action permissions"
                        );
                        audit.resolved.merge(&set);
                    }
                    Err(WardenError::ActionNotFound { .. }) => {
                        warn!(job = %job.name, action = %action, "action missing from knowledge base");
                        audit.unresolved.push(Unresolved {
                            uses: action.to_string(),
                            key: action.key(),
                            reason: format!("no knowledge-base entry for action '{action}'"),
                            missing: true,
                        });
                    }
                    Err(e) => {
                        warn!(job = %job.name, action = %action, error = %e, "unusable knowledge-base entry");
                        audit.unresolved.push(Unresolved {
                            uses: action.to_string(),
                            key: action.key(),
                            reason: format!("cannot resolve action '{action}': {e}"),
                            missing: false,
                        });
                    }
                },
                Step::Local(path) => audit.unresolved.push(Unresolved {
                    uses: path.clone(),
                    key: path.to_lowercase(),
                    reason: format!("local action '{path}' has no knowledge-base entry"),
                    missing: false,
                }),
                Step::Docker(image) => audit.unresolved.push(Unresolved {
                    uses: image.clone(),
                    key: key_without_ref(image),
                    reason: format!("container action '{image}' has no knowledge-base entry"),
                    missing: false,
                }),
                Step::Invalid { uses, reason } => audit.unresolved.push(Unresolved {
                    uses: uses.clone(),
                    key: uses.to_lowercase(),
                    reason: format!("invalid action reference '{uses}': {reason}"),
                    missing: false,
                }),
            }
        }

        audit
    }

    /// Audit every job and union the results.
    pub fn audit_workflow(&self, workflow: &Workflow) -> PermissionAudit {
        let mut audit = PermissionAudit::default();
        for job in &workflow.jobs {
            audit.absorb(self.audit_job(job));
        }
        audit
    }
}

fn key_without_ref(uses: &str) -> String {
    let bare = if uses.starts_with("docker://") {
        uses
    } else {
        uses.rsplit_once('@').map_or(uses, |(target, _)| target)
    };
    bare.to_lowercase()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use warden_contracts::{
        action::ActionReference,
        error::{WardenError, WardenResult},
        permission::{Level, PermissionSet, Scope},
    };

    use super::*;

    /// Resolver backed by a fixed key → permissions table.
    struct TableResolver {
        table: HashMap<&'static str, PermissionSet>,
    }

    impl PermissionResolver for TableResolver {
        fn resolve(&self, action: &ActionReference) -> WardenResult<PermissionSet> {
            if action.key() == "broken/entry" {
                return Err(WardenError::InvalidScope {
                    scope: "secrets".to_string(),
                });
            }
            self.table
                .get(action.key().as_str())
                .cloned()
                .ok_or_else(|| WardenError::ActionNotFound {
                    action: action.to_string(),
                })
        }
    }

    fn resolver() -> TableResolver {
        let mut table: HashMap<&'static str, PermissionSet> = HashMap::new();
        table.insert("actions/checkout", [(Scope::Contents, Level::Read)].into_iter().collect());
        table.insert(
            "peter-evans/create-pull-request",
            [(Scope::Contents, Level::Write), (Scope::PullRequests, Level::Write)]
                .into_iter()
                .collect(),
        );
        table.insert("actions/setup-node", PermissionSet::new());
        TableResolver { table }
    }

    fn job_with(uses: &[&str]) -> Job {
        Job {
            name: "build".to_string(),
            steps: uses.iter().map(|u| Step::from_uses(u)).collect(),
            permissions: None,
            calls_workflow: None,
        }
    }

    #[test]
    fn single_checkout_needs_contents_read() {
        let r = resolver();
        let audit = PermissionAggregator::new(&r).audit_job(&job_with(&["actions/checkout@v3"]));
        let perms = audit.permissions().unwrap();
        assert_eq!(perms.to_lines(), vec!["contents: read"]);
    }

    #[test]
    fn read_is_widened_to_write_regardless_of_order() {
        let r = resolver();
        let agg = PermissionAggregator::new(&r);
        let a = agg.audit_job(&job_with(&["actions/checkout@v3", "peter-evans/create-pull-request@v5"]));
        let b = agg.audit_job(&job_with(&["peter-evans/create-pull-request@v5", "actions/checkout@v3"]));
        assert_eq!(a.permissions(), b.permissions());
        assert_eq!(
            a.permissions().unwrap().to_lines(),
            vec!["contents: write", "pull-requests: write"]
        );
    }

    #[test]
    fn job_without_actions_is_audited_empty() {
        let r = resolver();
        let job = Job {
            name: "test".to_string(),
            steps: vec![Step::Command, Step::Command],
            permissions: None,
            calls_workflow: None,
        };
        let audit = PermissionAggregator::new(&r).audit_job(&job);
        assert_eq!(audit.permissions(), Some(&PermissionSet::new()));
    }

    #[test]
    fn missing_action_makes_job_unsolvable() {
        let r = resolver();
        let audit = PermissionAggregator::new(&r)
            .audit_job(&job_with(&["actions/checkout@v3", "octo/unknown@v1"]));
        assert_eq!(audit.permissions(), None);
        assert_eq!(audit.missing_actions().collect::<Vec<_>>(), vec!["octo/unknown@v1"]);
        assert_eq!(audit.unresolved[0].key, "octo/unknown");
        // The resolvable part is still tracked.
        assert_eq!(audit.resolved.level(Scope::Contents), Some(Level::Read));
    }

    #[test]
    fn local_docker_and_broken_entries_are_unresolved_but_not_missing() {
        let r = resolver();
        let audit = PermissionAggregator::new(&r).audit_job(&job_with(&[
            "./.github/actions/setup",
            "docker://alpine:3.18",
            "broken/entry@v1",
        ]));
        assert_eq!(audit.unresolved.len(), 3);
        assert_eq!(audit.missing_actions().count(), 0);
        assert_eq!(audit.unresolved[1].key, "docker://alpine:3.18");
        assert!(audit.unresolved[2].reason.contains("secrets"));
    }

    #[test]
    fn reusable_workflow_call_is_unresolved() {
        let r = resolver();
        let job = Job {
            name: "call".to_string(),
            steps: vec![],
            permissions: None,
            calls_workflow: Some("octo/wf/.github/workflows/ci.yml@main".to_string()),
        };
        let audit = PermissionAggregator::new(&r).audit_job(&job);
        assert_eq!(audit.permissions(), None);
        assert_eq!(audit.unresolved[0].key, "octo/wf/.github/workflows/ci.yml");
    }

    #[test]
    fn workflow_audit_unions_jobs() {
        let r = resolver();
        let text = "\
on: push
jobs:
  a:
    steps:
      - uses: actions/checkout@v3
  b:
    steps:
      - uses: peter-evans/create-pull-request@v5
      - uses: actions/setup-node@v4
";
        let wf = Workflow::parse(text).unwrap();
        let audit = PermissionAggregator::new(&r).audit_workflow(&wf);
        assert_eq!(
            audit.permissions().unwrap().to_lines(),
            vec!["contents: write", "pull-requests: write"]
        );
    }
}
