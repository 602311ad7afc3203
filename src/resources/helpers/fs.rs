//! File-system resource helpers.
use std::fmt::Write as _;
use std::io;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

/// Suffix of the sibling temp file used by [`write_atomic`].
const TMP_SUFFIX: &str = ".skill-deploy-tmp";

/// Ensure the parent directory of `path` exists, one level at a time, and
/// push every directory that had to be created onto `created`, shallowest
/// first.
///
/// Only directories strictly below `root` are reported; `root` itself is
/// created when missing but never reported. On failure `created` still holds
/// the directories made before the error.
///
/// # Errors
///
/// Returns an error if a directory cannot be created.
pub fn ensure_parent_dirs(path: &Path, root: &Path, created: &mut Vec<PathBuf>) -> io::Result<()> {
    let Some(parent) = path.parent() else {
        return Ok(());
    };
    let mut missing = Vec::new();
    let mut cursor = Some(parent);
    while let Some(dir) = cursor {
        if dir.is_dir() {
            break;
        }
        missing.push(dir);
        cursor = dir.parent();
    }
    for dir in missing.into_iter().rev() {
        match std::fs::create_dir(dir) {
            Ok(()) if dir != root && dir.starts_with(root) => created.push(dir.to_path_buf()),
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists && dir.is_dir() => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

/// Write `contents` to `path` via a sibling temp file and a rename, so a
/// crash never leaves a half-written file behind.
///
/// # Errors
///
/// Returns an error if the temp file cannot be written or renamed.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "path has no file name"))?;
    let mut tmp_name = file_name.to_os_string();
    tmp_name.push(TMP_SUFFIX);
    let tmp = path.with_file_name(tmp_name);

    std::fs::write(&tmp, contents)?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(())
}

/// Remove `start` and each empty ancestor up to, but not including, `stop`.
///
/// Stops at the first directory that is not empty or cannot be removed.
pub fn prune_empty_dirs(start: &Path, stop: &Path) {
    let mut cursor = Some(start);
    while let Some(dir) = cursor {
        if dir == stop || !dir.starts_with(stop) {
            break;
        }
        if std::fs::remove_dir(dir).is_err() {
            break;
        }
        cursor = dir.parent();
    }
}

/// Whether `dir` exists and has no entries.
#[must_use]
pub fn is_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir).is_ok_and(|mut entries| entries.next().is_none())
}

/// Lowercase hex SHA-256 digest of `bytes`.
#[must_use]
pub fn sha256_hex(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    let mut hex = String::with_capacity(64);
    for b in &digest {
        // Infallible for String.
        write!(hex, "{b:02x}").unwrap_or(());
    }
    hex
}

/// Convert a `/`-separated manifest key into a path under `root`.
#[must_use]
pub fn join_key(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|c| !c.is_empty())
        .fold(root.to_path_buf(), |path, c| path.join(c))
}

/// Convert a path under `root` into a `/`-separated manifest key.
///
/// Returns `None` for `root` itself or a path outside it.
#[must_use]
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let parts: Vec<String> = rel
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    (!parts.is_empty()).then(|| parts.join("/"))
}
