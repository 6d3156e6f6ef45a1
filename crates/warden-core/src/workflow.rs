//! Typed, forgiving view of a workflow document.
//!
//! Only the keys that matter for permission computation are read: `jobs`,
//! each job's `steps[].uses`, `uses` on the job itself, and `permissions` at
//! either level. Unknown keys are ignored. The raw text stays the source of
//! truth for output; this model is derived from it and never re-serialized.

use std::collections::BTreeMap;

use serde_yaml::{Mapping, Value};

use warden_contracts::{
    action::ActionReference,
    error::{WardenError, WardenResult},
};

/// A workflow parsed from YAML text.
#[derive(Debug, Clone)]
pub struct Workflow {
    pub raw: String,
    /// Jobs in document order.
    pub jobs: Vec<Job>,
    /// The top-level `permissions` block, when declared.
    pub permissions: Option<DeclaredPermissions>,
}

#[derive(Debug, Clone)]
pub struct Job {
    pub name: String,
    pub steps: Vec<Step>,
    /// The job's own `permissions` block, when declared.
    pub permissions: Option<DeclaredPermissions>,
    /// Set when the job calls a reusable workflow (`jobs.<id>.uses`).
    pub calls_workflow: Option<String>,
}

/// What a single step runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// `uses: owner/repo[/path]@ref`
    Action(ActionReference),
    /// `uses: ./path` inside the same repository.
    Local(String),
    /// `uses: docker://image`
    Docker(String),
    /// A `uses:` value that is not a valid action reference.
    Invalid { uses: String, reason: String },
    /// An inline `run:` command, or a step without `uses:`.
    Command,
}

/// Narrow view of an existing `permissions` block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeclaredPermissions {
    ReadAll,
    WriteAll,
    /// `permissions: {}` or a bare `permissions:`.
    Empty,
    /// Explicit scopes, kept as written.
    Scopes(BTreeMap<String, String>),
    /// Any other value (expressions, unexpected scalars).
    Other(String),
}

impl Workflow {
    /// Parse workflow text.
    ///
    /// Returns `WardenError::IncorrectYaml` when the text is not YAML, when the
    /// top level is not a mapping, or when `jobs` is missing or not a mapping
    /// of job mappings.
    pub fn parse(text: &str) -> WardenResult<Self> {
        let doc: Value = serde_yaml::from_str(text).map_err(|e| incorrect(e.to_string()))?;
        let Value::Mapping(root) = doc else {
            return Err(incorrect("top level is not a mapping"));
        };

        let jobs = match root.get("jobs") {
            Some(Value::Mapping(jobs)) => jobs,
            Some(_) => return Err(incorrect("'jobs' is not a mapping")),
            None => return Err(incorrect("missing 'jobs'")),
        };

        let mut parsed = Vec::with_capacity(jobs.len());
        for (name, body) in jobs {
            let name = scalar_to_string(name)
                .ok_or_else(|| incorrect("job name is not a scalar"))?;
            let Value::Mapping(body) = body else {
                return Err(incorrect(format!("job '{name}' is not a mapping")));
            };
            parsed.push(Job::from_mapping(name, body)?);
        }

        Ok(Self {
            raw: text.to_string(),
            jobs: parsed,
            permissions: root.get("permissions").map(DeclaredPermissions::from_value),
        })
    }

    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }
}

impl Job {
    fn from_mapping(name: String, body: &Mapping) -> WardenResult<Self> {
        let steps = match body.get("steps") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Sequence(seq)) => seq.iter().map(Step::from_value).collect(),
            Some(_) => return Err(incorrect(format!("steps of job '{name}' is not a sequence"))),
        };

        Ok(Self {
            steps,
            permissions: body.get("permissions").map(DeclaredPermissions::from_value),
            calls_workflow: body.get("uses").and_then(scalar_to_string),
            name,
        })
    }

    /// Action-reference steps, in order.
    pub fn actions(&self) -> impl Iterator<Item = &ActionReference> {
        self.steps.iter().filter_map(|s| match s {
            Step::Action(action) => Some(action),
            _ => None,
        })
    }
}

impl Step {
    fn from_value(value: &Value) -> Self {
        match value.get("uses").and_then(scalar_to_string) {
            Some(uses) => Step::from_uses(&uses),
            None => Step::Command,
        }
    }

    /// Classify a `uses:` string.
    pub fn from_uses(uses: &str) -> Self {
        let uses = uses.trim();
        if uses.starts_with("./") || uses.starts_with("../") {
            return Step::Local(uses.to_string());
        }
        if uses.starts_with("docker://") {
            return Step::Docker(uses.to_string());
        }
        match ActionReference::parse(uses) {
            Ok(action) => Step::Action(action),
            Err(WardenError::ActionParse { reason, .. }) => Step::Invalid {
                uses: uses.to_string(),
                reason,
            },
            Err(other) => Step::Invalid {
                uses: uses.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

impl DeclaredPermissions {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => DeclaredPermissions::Empty,
            Value::String(s) if s == "read-all" => DeclaredPermissions::ReadAll,
            Value::String(s) if s == "write-all" => DeclaredPermissions::WriteAll,
            Value::Mapping(m) if m.is_empty() => DeclaredPermissions::Empty,
            Value::Mapping(m) => DeclaredPermissions::Scopes(
                m.iter()
                    .filter_map(|(k, v)| Some((scalar_to_string(k)?, scalar_to_string(v)?)))
                    .collect(),
            ),
            other => DeclaredPermissions::Other(
                scalar_to_string(other).unwrap_or_else(|| format!("{other:?}")),
            ),
        }
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn incorrect(reason: impl Into<String>) -> WardenError {
    WardenError::IncorrectYaml {
        reason: reason.into(),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
