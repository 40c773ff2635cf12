//! Local state scanning and content hashing.
//!
//! A scan walks the manifest's include paths under the installation root,
//! plus the shared assets directory, and produces a fresh path-key → hash
//! map. Nothing is cached between runs; the scan is stateless and cheap
//! enough to recompute every invocation.
//!
//! The content hash is a streamed SHA-1 over the full file contents:
//! change detection, not security.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use sha1::{Digest, Sha1};

use crate::error::{SyncError, SyncResult};
use crate::object::{key_from_relative_path, ASSET_PREFIX};

/// Buffer size for hashing file contents (64KB).
const BUFFER_SIZE: usize = 64 * 1024;

/// Advisory progress callback: (files hashed, total files).
pub type ScanProgress = Box<dyn Fn(usize, usize) + Send>;

/// Scan the local installation and produce its path-key → hash map.
///
/// Include paths that are files contribute their own key; include paths
/// that are directories contribute every non-directory descendant. Every
/// file under `assets_dir` is included under the `assets/` namespace.
/// Include paths that do not exist locally are simply absent from the
/// result (they will show up in the download set instead).
///
/// The walk runs first so the progress callback has a stable denominator.
pub fn scan_local_state(
    install_dir: &Path,
    include: &[String],
    assets_dir: &Path,
    progress: Option<&ScanProgress>,
) -> SyncResult<BTreeMap<String, String>> {
    let mut candidates: Vec<(String, PathBuf)> = Vec::new();

    for rel in include {
        let path = install_dir.join(rel);
        if path.is_file() {
            candidates.push((key_from_relative_path(Path::new(rel)), path));
        } else if path.is_dir() {
            collect_files(install_dir, &path, "", &mut candidates)?;
        }
    }
    if assets_dir.is_dir() {
        collect_files(assets_dir, assets_dir, ASSET_PREFIX, &mut candidates)?;
    }

    let total = candidates.len();
    let mut state = BTreeMap::new();
    for (hashed, (key, path)) in candidates.into_iter().enumerate() {
        state.insert(key, hash_file(&path)?);
        if let Some(cb) = progress {
            cb(hashed + 1, total);
        }
    }
    Ok(state)
}

/// Recursively collect every non-directory descendant of `dir`, keyed
/// relative to `root` with the given namespace prefix.
fn collect_files(
    root: &Path,
    dir: &Path,
    prefix: &str,
    out: &mut Vec<(String, PathBuf)>,
) -> SyncResult<()> {
    let entries = std::fs::read_dir(dir).map_err(|e| SyncError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| SyncError::ReadFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(root, &path, prefix, out)?;
        } else {
            // strip_prefix cannot fail: path descends from root
            let rel = path.strip_prefix(root).unwrap_or(&path);
            out.push((format!("{}{}", prefix, key_from_relative_path(rel)), path));
        }
    }
    Ok(())
}

/// Streamed SHA-1 of a file's full contents, as lowercase hex.
pub fn hash_file(path: &Path) -> SyncResult<String> {
    let mut file = File::open(path).map_err(|e| SyncError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut hasher = Sha1::new();
    let mut buffer = vec![0u8; BUFFER_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|e| SyncError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-1 of a byte slice, as lowercase hex.
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}
