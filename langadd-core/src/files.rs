//! Reading and replacing repository files.

use std::fs;
use std::io::Write;
use std::path::Path;

use tempfile::NamedTempFile;

use crate::error::{Result, UpdateError};

pub fn read_text(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|err| UpdateError::io(path, err))
}

/// Replace `path` with `bytes` without ever exposing a half-written file.
///
/// The content goes to a temporary file next to `path` which is then renamed over it.
/// The existing file's permissions are carried over. A symlinked `path` is resolved
/// first so the link stays in place and its target receives the content.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let resolved = fs::canonicalize(path).ok();
    let target = resolved.as_deref().unwrap_or(path);
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|err| UpdateError::io(path, err))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|err| UpdateError::io(path, err))?;
    if let Ok(meta) = fs::metadata(target) {
        tmp.as_file()
            .set_permissions(meta.permissions())
            .map_err(|err| UpdateError::io(path, err))?;
    }
    tmp.persist(target)
        .map_err(|err| UpdateError::io(path, err.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn replaces_existing_content() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("grammar.js");
        fs::write(&path, "old").unwrap();

        write_atomic(&path, b"new").unwrap();

        assert_eq!(read_text(&path).unwrap(), "new");
        let leftovers = fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }

    #[cfg(unix)]
    #[test]
    fn keeps_file_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("node-types.json");
        fs::write(&path, "[]").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        write_atomic(&path, b"[]\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o644);
    }

    #[cfg(unix)]
    #[test]
    fn writes_through_symlink() {
        use std::os::unix::fs::symlink;

        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("shared")).unwrap();
        let real = dir.path().join("shared").join("grammar.js");
        fs::write(&real, "old").unwrap();
        let link = dir.path().join("grammar.js");
        symlink(&real, &link).unwrap();

        write_atomic(&link, b"new").unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "new");
        assert_eq!(read_text(&link).unwrap(), "new");
    }

    #[test]
    fn missing_file_reports_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("absent.json");
        let err = read_text(&path).unwrap_err();
        assert!(err.to_string().contains("absent.json"), "{err}");
    }
}
