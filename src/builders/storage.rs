use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::builders::system::PrivilegedCopy;
use crate::core::error::{HelperError, Result};

/// A configuration file held in memory for the duration of one operation.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub path: PathBuf,
    pub contents: String,
    /// The file is not owned by the invoking user and has to be written
    /// through the privileged copy.
    pub protected: bool,
}

impl ConfigFile {
    pub fn read(path: &Path, protected: bool) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| HelperError::io_at("read", path, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            contents,
            protected,
        })
    }

    /// Backs up the current file, then replaces it with `contents`. The write
    /// is never attempted if the backup fails. Returns the backup path, or
    /// `None` when there was no previous file to back up.
    pub fn replace(&self, contents: &str, copier: &dyn PrivilegedCopy) -> Result<Option<PathBuf>> {
        let backup = BackupStore::new(copier).backup(self)?;
        FileWriter::new(copier).write(&self.path, contents, self.protected)?;
        info!("wrote {}", self.path.display());
        Ok(backup)
    }
}

/// Sibling path `<dir>/<stem>_bak_<timestamp><.ext>` for a backup of `path`.
///
/// # Arguments
/// * `path`: The file being backed up.
/// * `timestamp`: Unix seconds embedded in the name.
///
/// # Returns
/// The backup path. Nothing is checked on disk; see [`unused_backup_path`].
pub fn backup_path(path: &Path, timestamp: i64) -> PathBuf {
    backup_sibling(path, &format!("_bak_{timestamp}"))
}

/// Like [`backup_path`], but never returns a path that already exists. A
/// second backup within the same second gets `_bak_<timestamp>_1<.ext>`,
/// then `_2`, and so on, so an earlier backup is never overwritten.
pub fn unused_backup_path(path: &Path, timestamp: i64) -> PathBuf {
    let first = backup_path(path, timestamp);
    if !first.exists() {
        return first;
    }
    let mut counter = 1u32;
    loop {
        let candidate = backup_sibling(path, &format!("_bak_{timestamp}_{counter}"));
        if !candidate.exists() {
            return candidate;
        }
        counter += 1;
    }
}

fn backup_sibling(path: &Path, suffix: &str) -> PathBuf {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let ext = path
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();
    path.with_file_name(format!("{stem}{suffix}{ext}"))
}

/// Keeps a timestamped copy of a file next to it before it is overwritten.
/// Backups are only for humans; nothing reads them back.
pub struct BackupStore<'a> {
    copier: &'a dyn PrivilegedCopy,
}

impl<'a> BackupStore<'a> {
    pub fn new(copier: &'a dyn PrivilegedCopy) -> Self {
        Self { copier }
    }

    /// Copies `file` to a fresh sibling backup path.
    ///
    /// # Arguments
    /// * `file`: The file about to be overwritten. Protected files are copied
    ///   with the privileged copy, others with `fs::copy`.
    ///
    /// # Returns
    /// `Result<Option<PathBuf>>` with the backup path, or `None` if the file
    /// does not exist yet. An error means the caller must not write.
    pub fn backup(&self, file: &ConfigFile) -> Result<Option<PathBuf>> {
        self.backup_at(file, chrono::Utc::now().timestamp())
    }

    /// [`BackupStore::backup`] with an explicit timestamp.
    pub fn backup_at(&self, file: &ConfigFile, timestamp: i64) -> Result<Option<PathBuf>> {
        if !file.path.exists() {
            return Ok(None);
        }
        let target = unused_backup_path(&file.path, timestamp);
        debug!("backing up {} to {}", file.path.display(), target.display());

        if file.protected {
            self.copier.copy(&file.path, &target)?;
        } else {
            fs::copy(&file.path, &target).map_err(|e| HelperError::io_at("back up", &file.path, e))?;
        }
        Ok(Some(target))
    }
}

/// Writes whole files. Ordinary files are staged next to the real target
/// (symlinks resolved), given the target's permissions, and renamed into
/// place. Protected files are staged in the temp directory and
/// committed with the privileged copy, so the target only ever sees the
/// fully staged contents.
pub struct FileWriter<'a> {
    copier: &'a dyn PrivilegedCopy,
}

impl<'a> FileWriter<'a> {
    pub fn new(copier: &'a dyn PrivilegedCopy) -> Self {
        Self { copier }
    }

    /// Replaces the whole contents of `path`.
    ///
    /// # Arguments
    /// * `path`: The file to write. A symlink is written through, never
    ///   replaced.
    /// * `contents`: The complete new contents.
    /// * `protected`: Whether the file needs the privileged copy.
    ///
    /// # Returns
    /// `Ok(())` once the target holds `contents` in full.
    pub fn write(&self, path: &Path, contents: &str, protected: bool) -> Result<()> {
        if protected {
            self.write_protected(path, contents)
        } else {
            write_direct(path, contents)
        }
    }

    fn write_protected(&self, path: &Path, contents: &str) -> Result<()> {
        let prefix = format!(
            "{}_temp",
            path.file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default()
        );
        let staged = tempfile::Builder::new()
            .prefix(&prefix)
            .tempfile()
            .map_err(|e| HelperError::io("Failed to create staging file", e))?;
        let staged = fill(staged, contents)?;
        debug!("staged {} for {}", staged.path().display(), path.display());

        self.copier.copy(staged.path(), path)
    }
}

fn write_direct(path: &Path, contents: &str) -> Result<()> {
    let target = match fs::canonicalize(path) {
        Ok(real) => real,
        Err(e) if e.kind() == ErrorKind::NotFound => path.to_path_buf(),
        Err(e) => return Err(HelperError::io_at("resolve", path, e)),
    };
    let dir = match target.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let staged = NamedTempFile::new_in(dir).map_err(|e| HelperError::io_at("stage", path, e))?;
    let staged = fill(staged, contents)?;

    // The staging file is created 0600; keep whatever mode the target had.
    if let Ok(metadata) = fs::metadata(&target) {
        staged
            .as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| HelperError::io_at("set permissions on", path, e))?;
    }
    staged
        .persist(&target)
        .map_err(|e| HelperError::io_at("write", path, e.error))?;
    Ok(())
}

fn fill(mut staged: NamedTempFile, contents: &str) -> Result<NamedTempFile> {
    staged
        .write_all(contents.as_bytes())
        .and_then(|()| staged.flush())
        .map_err(|e| HelperError::io("Failed to write staging file", e))?;
    Ok(staged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builders::system::LocalCopy;
    use std::cell::RefCell;
    use tempfile::tempdir;

    /// Records every copy and performs it with `fs::copy`.
    #[derive(Default)]
    struct RecordingCopy {
        copies: RefCell<Vec<(PathBuf, PathBuf)>>,
    }

    impl PrivilegedCopy for RecordingCopy {
        fn copy(&self, src: &Path, dst: &Path) -> Result<()> {
            self.copies
                .borrow_mut()
                .push((src.to_path_buf(), dst.to_path_buf()));
            LocalCopy.copy(src, dst)
        }
    }

    struct FailingCopy;

    impl PrivilegedCopy for FailingCopy {
        fn copy(&self, _src: &Path, _dst: &Path) -> Result<()> {
            Err(HelperError::CommandFailed {
                command: "sudo cp".to_string(),
                status: "exit status: 1".to_string(),
            })
        }
    }

    #[test]
    fn test_backup_path_keeps_extension() {
        assert_eq!(
            backup_path(Path::new("/etc/apache2/httpd.conf"), 1700000000),
            PathBuf::from("/etc/apache2/httpd_bak_1700000000.conf")
        );
        assert_eq!(
            backup_path(Path::new("/etc/hosts"), 42),
            PathBuf::from("/etc/hosts_bak_42")
        );
    }

    #[test]
    fn test_backup_of_plain_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("apache.conf");
        fs::write(&path, "").unwrap();
        let file = ConfigFile::read(&path, false).unwrap();

        let backup = BackupStore::new(&LocalCopy).backup_at(&file, 7).unwrap();
        let backup = backup.unwrap();
        assert_eq!(backup, dir.path().join("apache_bak_7.conf"));
        assert_eq!(fs::read_to_string(backup).unwrap(), "");
    }

    #[test]
    fn test_backup_of_protected_file_uses_copier() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hosts");
        fs::write(&path, "127.0.0.1 localhost\n").unwrap();
        let file = ConfigFile::read(&path, true).unwrap();
        let copier = RecordingCopy::default();

        BackupStore::new(&copier).backup_at(&file, 9).unwrap();
        let copies = copier.copies.borrow();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0], (path.clone(), dir.path().join("hosts_bak_9")));
    }

    #[test]
    fn test_missing_file_has_no_backup() {
        let dir = tempdir().unwrap();
        let file = ConfigFile {
            path: dir.path().join("absent.conf"),
            contents: String::new(),
            protected: false,
        };
        assert!(BackupStore::new(&LocalCopy).backup(&file).unwrap().is_none());
    }

    #[test]
    fn test_direct_write_replaces_contents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("apache.conf");
        fs::write(&path, "old\n").unwrap();
        FileWriter::new(&LocalCopy).write(&path, "new\n", false).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[test]
    fn test_protected_write_goes_through_staging() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("httpd.conf");
        fs::write(&path, "old\n").unwrap();
        let copier = RecordingCopy::default();

        FileWriter::new(&copier).write(&path, "new\n", true).unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
        let copies = copier.copies.borrow();
        assert_eq!(copies.len(), 1);
        assert_eq!(copies[0].1, path);
        assert_ne!(copies[0].0.parent(), Some(dir.path()));
        // The staging file is removed once committed.
        assert!(!copies[0].0.exists());
    }

    #[test]
    fn test_failed_backup_blocks_write() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("httpd.conf");
        fs::write(&path, "old\n").unwrap();
        let file = ConfigFile::read(&path, true).unwrap();

        let err = file.replace("new\n", &FailingCopy).unwrap_err();
        assert!(matches!(err, HelperError::CommandFailed { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old\n");
    }

    #[test]
    fn test_same_second_backups_do_not_collide() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("httpd.conf");
        fs::write(&path, "original\n").unwrap();

        let file = ConfigFile::read(&path, true).unwrap();
        let first = BackupStore::new(&LocalCopy).backup_at(&file, 5).unwrap().unwrap();
        fs::write(&path, "v1\n").unwrap();
        let file = ConfigFile::read(&path, true).unwrap();
        let second = BackupStore::new(&LocalCopy).backup_at(&file, 5).unwrap().unwrap();

        assert_eq!(first, dir.path().join("httpd_bak_5.conf"));
        assert_eq!(second, dir.path().join("httpd_bak_5_1.conf"));
        assert_eq!(fs::read_to_string(&first).unwrap(), "original\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "v1\n");
    }

    #[test]
    fn test_back_to_back_replace_keeps_original() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("httpd.conf");
        fs::write(&path, "original\n").unwrap();

        let file = ConfigFile::read(&path, true).unwrap();
        let first = file.replace("v1\n", &LocalCopy).unwrap().unwrap();
        let file = ConfigFile::read(&path, true).unwrap();
        let second = file.replace("v2\n", &LocalCopy).unwrap().unwrap();

        assert_ne!(first, second);
        assert_eq!(fs::read_to_string(&first).unwrap(), "original\n");
        assert_eq!(fs::read_to_string(&second).unwrap(), "v1\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "v2\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_direct_write_keeps_mode() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let path = dir.path().join("apache.conf");
        fs::write(&path, "old\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

        FileWriter::new(&LocalCopy).write(&path, "new\n", false).unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o644);
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }

    #[cfg(unix)]
    #[test]
    fn test_direct_write_follows_symlink() {
        let dir = tempdir().unwrap();
        let real = dir.path().join("dotfiles-apache.conf");
        let link = dir.path().join("apache.conf");
        fs::write(&real, "a\n").unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();

        let file = ConfigFile::read(&link, false).unwrap();
        let backup = file.replace("a\nb\n", &LocalCopy).unwrap().unwrap();

        assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
        assert_eq!(fs::read_to_string(&real).unwrap(), "a\nb\n");
        assert_eq!(fs::read_to_string(&backup).unwrap(), "a\n");
    }

    #[test]
    fn test_replace_returns_backup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("apache.conf");
        fs::write(&path, "old\n").unwrap();
        let file = ConfigFile::read(&path, false).unwrap();

        let backup = file.replace("new\n", &LocalCopy).unwrap().unwrap();
        assert_eq!(fs::read_to_string(&backup).unwrap(), "old\n");
        assert_eq!(fs::read_to_string(&path).unwrap(), "new\n");
    }
}
