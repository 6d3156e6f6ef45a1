//! Parallel scan of a workflow corpus.
//!
//! `scan_corpus` hands documents to a fixed pool of scoped worker threads.
//! Workers pull the next path from a shared cursor, run
//! `Fixer::add_job_level_permissions` on it and record the outcome in a
//! shared `CorpusAudit`. Nothing is written back to disk.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use tracing::{debug, info, warn};
use walkdir::WalkDir;

use warden_contracts::error::{WardenError, WardenResult};
use warden_core::Fixer;

use crate::memory::CorpusAudit;
use crate::report::CorpusReport;

/// Every `.yml` / `.yaml` file below `root`, in path order.
///
/// Returns `WardenError::Io` when `root` cannot be read.
pub fn discover(root: &Path) -> WardenResult<Vec<PathBuf>> {
    std::fs::metadata(root).map_err(|e| WardenError::Io {
        path: root.display().to_string(),
        source: e,
    })?;

    let mut paths: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_map(|e| match e {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable corpus entry");
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| {
            matches!(
                p.extension().and_then(|e| e.to_str()),
                Some("yml") | Some("yaml")
            )
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Run the job-level fixer over `paths` with up to `workers` threads.
pub fn scan_corpus(fixer: &Fixer, paths: &[PathBuf], workers: usize) -> WardenResult<CorpusReport> {
    let audit = CorpusAudit::new();
    let cursor = AtomicUsize::new(0);
    let workers = workers.clamp(1, paths.len().max(1));

    info!(documents = paths.len(), workers, "corpus scan started");

    let outcomes: Vec<WardenResult<()>> = thread::scope(|s| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let audit = audit.clone();
                let cursor = &cursor;
                s.spawn(move || scan_worker(worker, fixer, paths, cursor, &audit))
            })
            .collect();

        handles
            .into_iter()
            .map(|h| {
                h.join().unwrap_or_else(|_| {
                    Err(WardenError::AuditFailed {
                        reason: "scan worker panicked".to_string(),
                    })
                })
            })
            .collect()
    });
    outcomes.into_iter().collect::<WardenResult<()>>()?;

    audit.export_report()
}

/// Discover the corpus below `root` and scan it.
pub fn scan_dir(fixer: &Fixer, root: &Path, workers: usize) -> WardenResult<CorpusReport> {
    let paths = discover(root)?;
    scan_corpus(fixer, &paths, workers)
}

fn scan_worker(
    worker: usize,
    fixer: &Fixer,
    paths: &[PathBuf],
    cursor: &AtomicUsize,
    audit: &CorpusAudit,
) -> WardenResult<()> {
    loop {
        let index = cursor.fetch_add(1, Ordering::Relaxed);
        let Some(path) = paths.get(index) else {
            return Ok(());
        };
        let key = path.display().to_string();

        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                warn!(worker, path = %key, error = %e, "unable to read workflow");
                audit.record_unreadable(&key)?;
                continue;
            }
        };

        let result = fixer.add_job_level_permissions(&text);
        let outcome = audit.record(&key, &result)?;
        debug!(worker, path = %key, outcome = ?outcome, "workflow scanned");
    }
}
