//! On-disk layout of the knowledge base.
//!
//! Each entry lives at `<root>/<owner>/<repo>[/<path>]/action-security.yml`.
//! The directory path relative to the root, lower-cased, is the lookup key
//! and matches `ActionReference::key()`.

use std::path::Path;

use warden_contracts::metadata::METADATA_FILE_NAME;

/// True when `path` has the fixed metadata file name.
pub fn is_metadata_file(path: &Path) -> bool {
    path.file_name().and_then(|n| n.to_str()) == Some(METADATA_FILE_NAME)
}

/// True for files the knowledge base cares about at all (`.yml` / `.yaml`).
pub fn is_yaml_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yml") | Some("yaml")
    )
}

/// The directory components of `file` below `root`, without the file name.
fn components(root: &Path, file: &Path) -> Option<Vec<String>> {
    let dir = file.parent()?.strip_prefix(root).ok()?;
    Some(
        dir.components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect(),
    )
}

/// Lookup key for the entry at `file`, or `None` when the file does not sit
/// at least two directories (`owner/repo`) below `root`.
pub fn action_key(root: &Path, file: &Path) -> Option<String> {
    let parts = components(root, file)?;
    if parts.len() < 2 {
        return None;
    }
    Some(parts.join("/").to_lowercase())
}

/// The `(owner, repo)` pair implied by the entry's location.
pub fn owner_repo(root: &Path, file: &Path) -> Option<(String, String)> {
    let parts = components(root, file)?;
    match parts.as_slice() {
        [owner, repo, ..] => Some((owner.clone(), repo.clone())),
        _ => None,
    }
}
