//! warden command-line interface.
//!
//! Computes least-privilege token permissions for CI workflow files using a
//! knowledge base of action metadata, and validates that knowledge base.
//!
//! Usage:
//!   warden jobs .github/workflows/ci.yml
//!   warden --kb knowledge-base workflow ci.yml --in-place
//!   warden lint knowledge-base
//!   warden scan workflows/ --jobs 8

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use warden_audit::scan_dir;
use warden_contracts::error::{WardenError, WardenResult};
use warden_core::{Fixer, FixerConfig};
use warden_kb::KnowledgeBase;
use warden_lint::KbLinter;

// ── CLI definition ────────────────────────────────────────────────────────────

/// warden: least-privilege token permissions for CI workflows.
#[derive(Parser)]
#[command(
    name = "warden",
    about = "Least-privilege token permissions for CI workflows",
    long_about = "Computes the minimal token permissions each workflow job needs from a\n\
                  knowledge base of action metadata and writes them into the workflow."
)]
struct Cli {
    /// Root of the action knowledge base.
    #[arg(long, global = true, default_value = "knowledge-base")]
    kb: PathBuf,

    /// TOML file with fixer settings (known issues).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add a permissions block to every job that lacks one.
    Jobs {
        file: PathBuf,
        /// Write the result back to the file instead of printing it.
        #[arg(long)]
        in_place: bool,
    },
    /// Set one permissions block for the whole workflow.
    Workflow {
        file: PathBuf,
        /// Write the result back to the file instead of printing it.
        #[arg(long)]
        in_place: bool,
    },
    /// Validate the knowledge base. Defaults to the --kb directory.
    Lint { root: Option<PathBuf> },
    /// Run the job-level fixer over every workflow below a directory and
    /// print a JSON report. Files are not modified.
    Scan {
        dir: PathBuf,
        /// Number of worker threads.
        #[arg(long, default_value_t = 4)]
        jobs: usize,
    },
}

// ── Entry point ───────────────────────────────────────────────────────────────

fn main() {
    // Set RUST_LOG=debug for verbose output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();

    let result = match &cli.command {
        Command::Jobs { file, in_place } => run_jobs(&cli, file, *in_place),
        Command::Workflow { file, in_place } => run_workflow(&cli, file, *in_place),
        Command::Lint { root } => run_lint(root.as_deref().unwrap_or(&cli.kb)),
        Command::Scan { dir, jobs } => run_scan(&cli, dir, *jobs),
    };

    match result {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("warden error: {}", e);
            std::process::exit(1);
        }
    }
}

// ── Commands ──────────────────────────────────────────────────────────────────
//
// Each command returns Ok(false) when it ran but found problems.

fn run_jobs(cli: &Cli, file: &Path, in_place: bool) -> WardenResult<bool> {
    let fixer = build_fixer(cli)?;
    let text = read_file(file)?;
    let result = fixer.add_job_level_permissions(&text);

    if result.incorrect_yaml {
        eprintln!("{}: not a valid workflow, left unchanged", file.display());
        return Ok(false);
    }
    if result.already_has_permissions {
        eprintln!("{}: some jobs already declare permissions", file.display());
    }
    for job_error in &result.job_errors {
        for message in &job_error.errors {
            eprintln!("{}: job '{}': {}", file.display(), job_error.job_name, message);
        }
    }
    for action in &result.missing_actions {
        eprintln!("{}: missing from knowledge base: {}", file.display(), action);
    }

    emit(file, &result.final_output, in_place, result.is_changed)?;
    Ok(!result.has_errors)
}

fn run_workflow(cli: &Cli, file: &Path, in_place: bool) -> WardenResult<bool> {
    let fixer = build_fixer(cli)?;
    let text = read_file(file)?;
    let output = fixer.add_workflow_level_permissions(&text)?;
    emit(file, &output, in_place, output != text)?;
    Ok(true)
}

fn run_lint(root: &Path) -> WardenResult<bool> {
    std::fs::metadata(root).map_err(|e| WardenError::Io {
        path: root.display().to_string(),
        source: e,
    })?;

    let report = KbLinter::new().lint_tree(root);
    for issue in &report.issues {
        println!("{}", issue);
    }
    println!(
        "{} files checked, {} issues",
        report.files_checked,
        report.issues.len()
    );
    Ok(report.passed())
}

fn run_scan(cli: &Cli, dir: &Path, jobs: usize) -> WardenResult<bool> {
    let fixer = build_fixer(cli)?;
    let report = scan_dir(&fixer, dir, jobs)?;
    let json = report.to_json().map_err(|e| WardenError::AuditFailed {
        reason: format!("failed to serialize corpus report: {}", e),
    })?;
    println!("{}", json);
    Ok(true)
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn build_fixer(cli: &Cli) -> WardenResult<Fixer> {
    let config = match &cli.config {
        Some(path) => FixerConfig::from_file(path)?,
        None => FixerConfig::default(),
    };
    let kb = KnowledgeBase::from_dir(&cli.kb)?;
    debug!(
        kb = %cli.kb.display(),
        entries = kb.len(),
        known_issues = config.known_issues.len(),
        "fixer ready"
    );
    Ok(Fixer::new(Box::new(kb), config))
}

fn read_file(path: &Path) -> WardenResult<String> {
    std::fs::read_to_string(path).map_err(|e| WardenError::Io {
        path: path.display().to_string(),
        source: e,
    })
}

/// Print `output`, or in in-place mode write it back to `file` when it changed.
fn emit(file: &Path, output: &str, in_place: bool, changed: bool) -> WardenResult<()> {
    if !in_place {
        print!("{}", output);
    } else if changed {
        std::fs::write(file, output).map_err(|e| WardenError::Io {
            path: file.display().to_string(),
            source: e,
        })?;
        info!(path = %file.display(), "workflow updated");
    }
    Ok(())
}
