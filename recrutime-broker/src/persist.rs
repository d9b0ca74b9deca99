//! Atomic JSON writes shared by the file-backed stores.

use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

use crate::error::StoreResult;

/// Directory holding `path`, `.` for a bare file name.
pub(crate) fn parent_directory(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}

/// Write `value` as pretty JSON to a temporary file next to `path`, then
/// atomically replace `path` with it.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> StoreResult<()> {
    let mut temp = NamedTempFile::new_in(parent_directory(path))?;
    serde_json::to_writer_pretty(&mut temp, value)?;
    temp.flush()?;
    temp.as_file().sync_all()?;
    temp.persist(path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parent_directory() {
        assert_eq!(parent_directory(Path::new("store.json")), Path::new("."));
        assert_eq!(
            parent_directory(Path::new("runtime/store.json")),
            Path::new("runtime")
        );
    }

    #[test]
    fn test_write_json_replaces_existing_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("doc.json");
        std::fs::write(&path, "stale").unwrap();

        write_json(&path, &serde_json::json!({ "ok": true })).unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({ "ok": true }));
        // Only the target remains; the temporary file was persisted over it
        assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 1);
    }
}
