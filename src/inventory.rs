//! Local inventory: resolve a workflow's glob patterns into upload candidates.

use serde::{Deserialize, Serialize};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info};

use crate::error::InventoryError;
use crate::keys::{KeyLayout, Namespace, Stage};

/// One local file and the raw-stage key it should be stored under.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UploadCandidate {
    pub local_path: PathBuf,
    pub remote_key: String,
}

/// Resolves every pattern under `root_dir` and maps each file to
/// `{raw}/{namespace}/{path relative to root_dir}`.
///
/// Results follow pattern order, then glob order. Directories are skipped.
pub fn build_inventory(
    layout: &KeyLayout,
    namespace: &Namespace,
    root_dir: &Path,
    patterns: &[String],
) -> Result<Vec<UploadCandidate>, InventoryError> {
    info!(
        root = %root_dir.display(),
        patterns = ?patterns,
        namespace = %namespace,
        "Gathering all raw image paths for this workflow"
    );

    let root = without_cur_dir(root_dir);
    let escaped_root = glob::Pattern::escape(&root.to_string_lossy());
    let mut candidates = Vec::new();

    for pattern in patterns {
        let pattern_tail = pattern.trim_start_matches('/');
        let full_pattern = if escaped_root.is_empty() {
            pattern_tail.to_string()
        } else {
            format!("{}/{}", escaped_root.trim_end_matches('/'), pattern_tail)
        };
        let paths = glob::glob(&full_pattern).map_err(|e| {
            error!(pattern = %pattern, error = %e, "Invalid glob pattern");
            InventoryError::Pattern {
                pattern: pattern.clone(),
                source: e,
            }
        })?;

        let before = candidates.len();
        for entry in paths {
            let path = entry.map_err(|e| {
                error!(path = %e.path().display(), error = %e, "Failed to read entry while scanning");
                InventoryError::Scan {
                    path: e.path().to_path_buf(),
                    source: e.into(),
                }
            })?;
            if !path.is_file() {
                continue;
            }
            let relative = relative_key_path(&root, &path)?;
            candidates.push(UploadCandidate {
                remote_key: layout.remote_key(Stage::Raw, namespace, &relative),
                local_path: path,
            });
        }
        debug!(pattern = %pattern, matched = candidates.len() - before, "Resolved pattern");
    }

    info!(count = candidates.len(), "Gathered local images");
    Ok(candidates)
}

/// Drops `.` components, so `./scans/`, `scans/./` and `scans` compare equal
/// and `.` becomes the empty path.
fn without_cur_dir(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// `path` relative to `root`, with `/` separators on every platform.
fn relative_key_path(root: &Path, path: &Path) -> Result<String, InventoryError> {
    let normalized = without_cur_dir(path);
    let relative = normalized
        .strip_prefix(root)
        .map_err(|_| InventoryError::OutsideRoot {
            path: path.to_path_buf(),
            root: root.to_path_buf(),
        })?;
    let segments: Vec<String> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect();
    Ok(segments.join("/"))
}
