//! Small shared helpers

use serde::Serialize;
use std::io::{self, Write};
use std::path::Path;

/// Serialize `value` as pretty JSON and atomically replace `path` with it
///
/// The document is written to a temporary file in the target's directory,
/// synced, then renamed over the target, so readers see either the old or the
/// new file, never a partial one.
pub fn write_json_atomic<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    replace_file(path, &serde_json::to_vec_pretty(value).map_err(io::Error::other)?, true)
}

/// Like [`write_json_atomic`] without the fsync
///
/// For diagnostic files that are rewritten constantly: the rename still keeps
/// readers from seeing a torn document, but a crash may lose the last write.
pub fn write_json_snapshot<T: Serialize + ?Sized>(path: &Path, value: &T) -> io::Result<()> {
    replace_file(path, &serde_json::to_vec_pretty(value).map_err(io::Error::other)?, false)
}

fn replace_file(path: &Path, bytes: &[u8], sync: bool) -> io::Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    if sync {
        tmp.as_file().sync_all()?;
    }
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_atomic_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state.json");

        write_json_atomic(&path, &serde_json::json!({"v": 1})).unwrap();
        write_json_atomic(&path, &serde_json::json!({"v": 2})).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["v"], 2);

        // No temp files left behind
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_json_atomic_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/out.json");
        write_json_atomic(&path, &[1, 2, 3]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_write_json_snapshot_replaces_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snapshot.json");

        write_json_snapshot(&path, &serde_json::json!({"n": 1})).unwrap();
        write_json_snapshot(&path, &serde_json::json!({"n": 2})).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["n"], 2);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
    }
}
