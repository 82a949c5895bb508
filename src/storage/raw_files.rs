//! Raw File Storage.
//!
//! Basic file system operations used by the artifact store and the genesis
//! writer.
//!
//! # Atomicity
//! - `write_atomic` replaces a file via write-sync-rename.
//! - `write_if_absent` publishes a synced temp file with a hard link, which
//!   fails if the target exists, so a completed artifact is never replaced
//!   and a reader never observes a half-written one.

use super::StorageError;

use std::fs::{self, File};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Largest file `read_file` accepts.
pub const MAX_FILE_LEN: u64 = 64 * 1024 * 1024;

fn temp_path_for(path: &Path) -> Result<PathBuf, StorageError> {
    let filename = path
        .file_name()
        .ok_or_else(|| StorageError::InvalidPath(path.to_path_buf()))?;
    let mut temp_path = path.to_path_buf();
    temp_path.set_file_name(format!(
        ".{}.{}.tmp",
        filename.to_string_lossy(),
        std::process::id()
    ));
    Ok(temp_path)
}

fn ensure_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            fs::create_dir_all(dir).map_err(|e| StorageError::io(dir, e))
        }
        _ => Ok(()),
    }
}

fn write_synced(path: &Path, data: &[u8], owner_only: bool) -> Result<(), StorageError> {
    let mut file = File::create(path).map_err(|e| StorageError::io(path, e))?;
    if owner_only {
        restrict_to_owner(path)?;
    }
    file.write_all(data).map_err(|e| StorageError::io(path, e))?;
    file.sync_all().map_err(|e| StorageError::io(path, e))
}

/// Owner read/write only (0600).
#[cfg(unix)]
fn restrict_to_owner(path: &Path) -> Result<(), StorageError> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o600))
        .map_err(|e| StorageError::io(path, e))
}

#[cfg(not(unix))]
fn restrict_to_owner(_path: &Path) -> Result<(), StorageError> {
    Ok(())
}

/// Writes data to a file atomically, replacing any previous content.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), StorageError> {
    let path = path.as_ref();
    ensure_parent(path)?;
    let temp_path = temp_path_for(path)?;

    write_synced(&temp_path, data, false)?;

    // Rename to final path (atomic on POSIX)
    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        StorageError::io(path, e)
    })
}

/// Writes data only if `path` does not exist yet.
///
/// # Returns
/// * `Ok(true)` if this call created the file.
/// * `Ok(false)` if the file already existed; it is left untouched.
pub fn write_if_absent<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<bool, StorageError> {
    publish_if_absent(path.as_ref(), data, false)
}

/// `write_if_absent` for secrets: the file is owner-only from creation.
pub fn write_private_if_absent<P: AsRef<Path>>(
    path: P,
    data: &[u8],
) -> Result<bool, StorageError> {
    publish_if_absent(path.as_ref(), data, true)
}

fn publish_if_absent(path: &Path, data: &[u8], owner_only: bool) -> Result<bool, StorageError> {
    if path.exists() {
        return Ok(false);
    }
    ensure_parent(path)?;
    let temp_path = temp_path_for(path)?;

    write_synced(&temp_path, data, owner_only)?;

    let linked = fs::hard_link(&temp_path, path);
    let _ = fs::remove_file(&temp_path);
    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(StorageError::io(path, e)),
    }
}

/// Reads data from a file.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, StorageError> {
    let path = path.as_ref();
    let mut file = File::open(path).map_err(|e| StorageError::io(path, e))?;
    let len = file
        .metadata()
        .map_err(|e| StorageError::io(path, e))?
        .len();

    if len > MAX_FILE_LEN {
        return Err(StorageError::TooLarge {
            path: path.to_path_buf(),
            len,
        });
    }

    let mut buffer = Vec::with_capacity(len as usize);
    file.read_to_end(&mut buffer)
        .map_err(|e| StorageError::io(path, e))?;
    Ok(buffer)
}

/// Reads a file, returning `None` when it does not exist.
pub fn read_optional<P: AsRef<Path>>(path: P) -> Result<Option<Vec<u8>>, StorageError> {
    match read_file(path) {
        Ok(data) => Ok(Some(data)),
        Err(StorageError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_atomic_write_read() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("test_atomic.bin");

        write_atomic(&path, b"Hello World").unwrap();
        assert!(path.exists());
        assert_eq!(read_file(&path).unwrap(), b"Hello World");

        write_atomic(&path, b"replaced").unwrap();
        assert_eq!(read_file(&path).unwrap(), b"replaced");
    }

    #[test]
    fn test_write_if_absent_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marker.txt");

        assert!(write_if_absent(&path, b"first").unwrap());
        assert!(!write_if_absent(&path, b"second").unwrap());
        assert_eq!(read_file(&path).unwrap(), b"first");
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("marker.txt");
        write_if_absent(&path, b"x").unwrap();
        write_if_absent(&path, b"y").unwrap();
        write_atomic(dir.path().join("other.txt"), b"z").unwrap();

        let names: Vec<_> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert!(names.iter().all(|n| !n.ends_with(".tmp")), "{names:?}");
    }

    #[cfg(unix)]
    #[test]
    fn test_private_write_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("key.txt");
        assert!(write_private_if_absent(&path, b"secret").unwrap());
        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_read_optional_missing() {
        let dir = TempDir::new().unwrap();
        assert_eq!(read_optional(dir.path().join("absent")).unwrap(), None);
    }
}
