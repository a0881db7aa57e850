//! All-or-nothing file writes

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use uuid::Uuid;

use crate::error::ClassifyError;

/// Write `contents` to `path` via a sibling temp file and a rename.
///
/// Either the destination ends up holding the full contents or it is left
/// untouched; the temp file never outlives the call.
pub(crate) fn write_atomic(path: &Path, contents: &[u8]) -> Result<(), ClassifyError> {
    let tmp = temp_sibling(path).ok_or_else(|| {
        ClassifyError::io(
            path,
            io::Error::new(io::ErrorKind::InvalidInput, "destination has no file name"),
        )
    })?;

    if let Err(source) = write_then_rename(&tmp, path, contents) {
        let _ = fs::remove_file(&tmp);
        return Err(ClassifyError::io(path, source));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> Option<PathBuf> {
    let name = path.file_name()?.to_string_lossy();
    Some(path.with_file_name(format!(".{name}.{}.tmp", Uuid::new_v4().simple())))
}

fn write_then_rename(tmp: &Path, dest: &Path, contents: &[u8]) -> io::Result<()> {
    let mut file = File::create(tmp)?;
    file.write_all(contents)?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, dest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
    }

    #[test]
    fn test_failed_rename_leaves_no_temp() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be replaced by a file, so the rename fails
        let blocker = dir.path().join("blocked");
        fs::create_dir(&blocker).unwrap();
        fs::write(blocker.join("keep"), "x").unwrap();

        let err = write_atomic(&blocker, b"data").unwrap_err();
        assert_eq!(err.kind(), "IO_FAILURE");

        let leftovers: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
        assert!(blocker.join("keep").exists());
    }

    #[test]
    fn test_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("out.txt");
        let err = write_atomic(&path, b"data").unwrap_err();
        assert!(matches!(err, ClassifyError::IoFailure { .. }));
        assert!(!path.exists());
    }
}
