//! Shared persistence utilities: atomic file writes, copies, JSON load/save.
//!
//! Every write that lands on a path another reader may open (model files,
//! CSV splits, reports) goes through here: data is written to a temp sibling
//! in the same directory and then renamed over the target, so readers see
//! either the old file or the complete new one.

use std::io;
use std::path::{Path, PathBuf};

/// Temp sibling for `path`, unique per call so concurrent writers never share one.
pub fn tmp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "object".to_string());
    path.with_file_name(format!(".{name}.{}.tmp", uuid::Uuid::new_v4().simple()))
}

fn ensure_parent(path: &Path) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Rename `tmp` over `path`, removing `tmp` if the rename fails.
fn commit(tmp: &Path, path: &Path) -> io::Result<()> {
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(e);
    }
    Ok(())
}

/// Atomically write JSON data to a file.
///
/// Serializes `data` to pretty-printed JSON and hands it to [`atomic_write`].
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, data: &T) -> io::Result<()> {
    let json = serde_json::to_string_pretty(data).map_err(io::Error::other)?;
    atomic_write(path, json.as_bytes())
}

/// Atomically write raw bytes to a file.
///
/// Writes to a temp sibling file, then renames it over the target path.
/// Creates parent directories if they don't exist.
pub fn atomic_write(path: &Path, data: &[u8]) -> io::Result<()> {
    ensure_parent(path)?;
    let tmp = tmp_sibling(path);
    if let Err(e) = std::fs::write(&tmp, data) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e);
    }
    commit(&tmp, path)
}

/// Atomically copy `from` onto `to`.
///
/// The source is copied into a temp sibling of `to` and then renamed, so a
/// failure part-way leaves any existing `to` untouched.
pub fn atomic_copy(from: &Path, to: &Path) -> io::Result<u64> {
    // Fail before creating anything on the destination side.
    std::fs::metadata(from)?;
    ensure_parent(to)?;
    let tmp = tmp_sibling(to);
    let copied = match std::fs::copy(from, &tmp) {
        Ok(n) => n,
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            return Err(e);
        }
    };
    commit(&tmp, to)?;
    Ok(copied)
}

/// Move `from` onto `to`.
///
/// Tries a plain rename first; when that is not possible (different
/// filesystems) falls back to [`atomic_copy`] followed by removing the source.
pub fn atomic_move(from: &Path, to: &Path) -> io::Result<()> {
    std::fs::metadata(from)?;
    ensure_parent(to)?;
    match std::fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::CrossesDevices => {
            atomic_copy(from, to)?;
            std::fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}

/// Load and deserialize JSON from a file.
///
/// Returns `Ok(None)` if the file doesn't exist.
/// Returns `Err` on I/O errors or deserialization failures.
pub fn load_json<T: serde::de::DeserializeOwned>(path: &Path) -> io::Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)?;
    let value =
        serde_json::from_str(&data).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    Ok(Some(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Centroids {
        k: usize,
        values: Vec<f64>,
    }

    fn no_tmp_left(dir: &Path) -> bool {
        std::fs::read_dir(dir)
            .unwrap()
            .flatten()
            .all(|e| !e.file_name().to_string_lossy().ends_with(".tmp"))
    }

    #[test]
    fn test_atomic_write_json_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("centroids.json");
        let data = Centroids {
            k: 2,
            values: vec![0.5, -1.25],
        };

        atomic_write_json(&path, &data).unwrap();
        let loaded: Option<Centroids> = load_json(&path).unwrap();
        assert_eq!(loaded, Some(data));
        assert!(no_tmp_left(dir.path()));
    }

    #[test]
    fn test_atomic_write_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model").join("v").join("model.json");
        atomic_write(&path, b"{}").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_load_json_nonexistent() {
        let result: io::Result<Option<Centroids>> = load_json(Path::new("/nonexistent/m.json"));
        assert!(result.unwrap().is_none());
    }

    #[test]
    fn test_atomic_copy_replaces_destination() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("new.json");
        let dst = dir.path().join("serve").join("model.json");
        std::fs::write(&src, "new").unwrap();
        atomic_write(&dst, b"old").unwrap();

        atomic_copy(&src, &dst).unwrap();
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "new");
        assert!(src.exists());
        assert!(no_tmp_left(&dir.path().join("serve")));
    }

    #[test]
    fn test_atomic_copy_missing_source_leaves_destination() {
        let dir = TempDir::new().unwrap();
        let dst = dir.path().join("model.json");
        std::fs::write(&dst, "old").unwrap();

        let err = atomic_copy(&dir.path().join("missing.json"), &dst).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "old");
        assert!(no_tmp_left(dir.path()));
    }

    #[test]
    fn test_atomic_move() {
        let dir = TempDir::new().unwrap();
        let src = dir.path().join("a.csv");
        let dst = dir.path().join("bucket").join("b.csv");
        std::fs::write(&src, "x,y\n1,2\n").unwrap();

        atomic_move(&src, &dst).unwrap();
        assert!(!src.exists());
        assert_eq!(std::fs::read_to_string(&dst).unwrap(), "x,y\n1,2\n");
    }
}
