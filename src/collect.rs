//! Local asset enumeration.
//!
//! Walks the source tree and pairs every regular file with the remote key
//! it syncs under. Keys are relative to the source root, use forward
//! slashes on every platform, and come back sorted so runs are
//! deterministic.

use jwalk::WalkDir;
use std::path::Path;

use crate::engine::FileEntry;
use crate::error::SyncError;

/// Enumerate the files under `source_root`.
///
/// Hidden files and directories are left out, symlinks are not followed,
/// and unreadable entries are logged and skipped rather than failing the
/// whole collection. A missing source root is fatal.
pub fn collect_entries(
    source_root: &Path,
    key_prefix: Option<&str>,
) -> Result<Vec<FileEntry>, SyncError> {
    if !source_root.is_dir() {
        return Err(SyncError::Configuration {
            message: format!(
                "source directory {} does not exist",
                source_root.display()
            ),
        });
    }

    let prefix = key_prefix
        .map(|p| p.trim_matches('/'))
        .filter(|p| !p.is_empty());

    let mut entries = Vec::new();

    // Walking in a separate pool keeps traversal off the runtime threads
    for walked in WalkDir::new(source_root)
        .parallelism(jwalk::Parallelism::RayonNewPool(0))
        .skip_hidden(true)
        .follow_links(false)
    {
        let walked = match walked {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(error = %e, "skipping unreadable entry");
                continue;
            }
        };

        if !walked.file_type().is_file() {
            continue;
        }

        let path = walked.path();
        let relative = match path.strip_prefix(source_root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };

        let key = relative.to_string_lossy().replace('\\', "/");
        let key = match prefix {
            Some(prefix) => format!("{}/{}", prefix, key),
            None => key,
        };

        entries.push(FileEntry::new(path, key));
    }

    entries.sort_by(|a, b| a.remote_key.cmp(&b.remote_key));
    Ok(entries)
}
