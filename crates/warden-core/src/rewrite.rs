//! Surgical insertion of `permissions` blocks into workflow text.
//!
//! Output is built by copying the input lines around a single insertion or
//! replacement point. Nothing outside the permissions block is re-rendered.

use tracing::debug;

use warden_contracts::{
    error::{WardenError, WardenResult},
    permission::PermissionSet,
};

use crate::outline::Outline;

/// Render a `permissions` block whose key sits at column `indent`.
///
/// An empty set renders as `permissions: {}`; otherwise one `scope: level`
/// line per grant, nested by `unit` spaces, in scope order.
pub fn render_block(set: &PermissionSet, indent: usize, unit: usize, eol: &str) -> Vec<String> {
    let pad = " ".repeat(indent);
    if set.is_empty() {
        return vec![format!("{pad}permissions: {{}}{eol}")];
    }
    let nested = " ".repeat(indent + unit);
    let mut block = Vec::with_capacity(set.len() + 1);
    block.push(format!("{pad}permissions:{eol}"));
    block.extend(set.to_lines().into_iter().map(|l| format!("{nested}{l}{eol}")));
    block
}

/// Insert `set` as the first key of job `job_name`.
///
/// Fails with `JobNotFound` when the job has no block-style header in the
/// text, and with `IncorrectYaml` when the job is written in flow style or
/// already has a `permissions` key.
pub fn insert_job_permissions(
    text: &str,
    job_name: &str,
    set: &PermissionSet,
) -> WardenResult<String> {
    let outline = Outline::new(text);
    let job = outline.job(job_name).ok_or_else(|| WardenError::JobNotFound {
        job: job_name.to_string(),
    })?;
    if job.inline {
        return Err(WardenError::IncorrectYaml {
            reason: format!("job '{job_name}' is written in flow style"),
        });
    }
    if outline.job_permissions(&job).is_some() {
        return Err(WardenError::IncorrectYaml {
            reason: format!("job '{job_name}' already declares permissions"),
        });
    }

    let unit = outline.indent_unit();
    let body_indent = job.body_indent.unwrap_or(job.indent + unit);
    let step = body_indent.saturating_sub(job.indent).max(1);
    let block = render_block(set, body_indent, step, outline.eol());

    debug!(
        job = %job_name,
        line = job.header + 1,
        indent = body_indent,
        scopes = set.len(),
        "inserting job permissions"
    );

    Ok(splice(&outline, job.header + 1, job.header + 1, &block, false))
}

/// Insert or replace the top-level `permissions` block.
///
/// An existing block is replaced in place. Otherwise the block goes right
/// after the `on:` section; without `on:` it goes before `jobs:`, and without
/// either it is appended at the end.
pub fn set_workflow_permissions(text: &str, set: &PermissionSet) -> WardenResult<String> {
    let outline = Outline::new(text);
    let unit = outline.indent_unit();
    let block = render_block(set, 0, unit, outline.eol());

    if let Some(existing) = outline.top_level_key("permissions") {
        let end = outline.section_content_end(existing.line);
        debug!(line = existing.line + 1, "replacing workflow permissions");
        return Ok(splice(&outline, existing.line, end, &block, false));
    }

    let keys = outline.top_level_keys();
    let anchor = match keys.iter().position(|k| k.key == "on") {
        Some(on) => keys.get(on + 1),
        None => keys.iter().find(|k| k.key == "jobs"),
    };

    Ok(match anchor {
        Some(next) => {
            let at = outline.insertion_point_before(next.line);
            debug!(line = at + 1, before = %next.key, "inserting workflow permissions");
            splice(&outline, at, at, &block, true)
        }
        None => {
            let at = outline.lines().len();
            debug!(line = at + 1, "appending workflow permissions");
            splice(&outline, at, at, &block, false)
        }
    })
}

/// Replace lines `from..to` with `block`, copying everything else verbatim.
fn splice(outline: &Outline<'_>, from: usize, to: usize, block: &[String], blank_after: bool) -> String {
    let lines = outline.lines();
    let mut out = String::new();
    for line in &lines[..from] {
        out.push_str(line);
    }
    if from == lines.len() && outline.missing_final_eol() {
        out.push_str(outline.eol());
    }
    for line in block {
        out.push_str(line);
    }
    if blank_after {
        out.push_str(outline.eol());
    }
    for line in &lines[to..] {
        out.push_str(line);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
