//! Physical file I/O below the base path
//!
//! Writes create intermediate directories on demand. When a temp dir is
//! configured, a write first lands in a temp file there and is then renamed
//! into place, so readers never see a half-written record. The temp dir must
//! live on the same filesystem as the base path for the rename to work.

use crate::error::Result;
use crate::transform::PathKey;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Local filesystem backend rooted at a base directory
#[derive(Debug, Clone)]
pub struct DiskBackend {
    base: PathBuf,
    temp_dir: Option<PathBuf>,
    path_perm: u32,
    file_perm: u32,
    sync: bool,
}

impl DiskBackend {
    pub fn new(
        base: PathBuf,
        temp_dir: Option<PathBuf>,
        path_perm: u32,
        file_perm: u32,
        sync: bool,
    ) -> Self {
        DiskBackend {
            base,
            temp_dir,
            path_perm,
            file_perm,
            sync,
        }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    fn create_dirs(&self, dir: &Path) -> io::Result<()> {
        let mut builder = fs::DirBuilder::new();
        builder.recursive(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::DirBuilderExt;
            builder.mode(self.path_perm);
        }
        builder.create(dir)
    }

    #[cfg(unix)]
    fn apply_file_perm(&self, path: &Path) -> io::Result<()> {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(self.file_perm))
    }

    #[cfg(not(unix))]
    fn apply_file_perm(&self, _path: &Path) -> io::Result<()> {
        Ok(())
    }

    /// Write a file, replacing any previous content
    pub fn write(&self, pk: &PathKey, data: &[u8]) -> Result<()> {
        self.create_dirs(&pk.dir_in(&self.base))?;
        let target = pk.file_in(&self.base);

        match &self.temp_dir {
            Some(temp_dir) => {
                self.create_dirs(temp_dir)?;
                let mut tmp = tempfile::NamedTempFile::new_in(temp_dir)?;
                tmp.write_all(data)?;
                if self.sync {
                    tmp.as_file().sync_all()?;
                }
                self.apply_file_perm(tmp.path())?;
                tmp.persist(&target).map_err(|e| e.error)?;
                trace!("Renamed temp file into {:?}", target);
            }
            None => {
                let mut options = OpenOptions::new();
                options.write(true).create(true).truncate(true);
                #[cfg(unix)]
                {
                    use std::os::unix::fs::OpenOptionsExt;
                    options.mode(self.file_perm);
                }
                let mut file = options.open(&target)?;
                file.write_all(data)?;
                if self.sync {
                    file.sync_all()?;
                }
            }
        }

        Ok(())
    }

    /// Read a whole file
    pub fn read(&self, pk: &PathKey) -> io::Result<Vec<u8>> {
        let path = pk.file_in(&self.base);
        if path.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{:?} is a directory", path),
            ));
        }
        fs::read(path)
    }

    /// Whether a regular file exists at the location
    pub fn has(&self, pk: &PathKey) -> bool {
        fs::metadata(pk.file_in(&self.base))
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Remove a file and prune parent directories left empty
    pub fn erase(&self, pk: &PathKey) -> io::Result<()> {
        let path = pk.file_in(&self.base);
        if !fs::metadata(&path)?.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{:?} is not a file", path),
            ));
        }
        fs::remove_file(&path)?;
        self.prune_dirs(pk.dir_in(&self.base));
        Ok(())
    }

    fn prune_dirs(&self, mut dir: PathBuf) {
        while dir != self.base && dir.starts_with(&self.base) {
            // Fails on non-empty directories, which ends the walk
            if fs::remove_dir(&dir).is_err() {
                break;
            }
            trace!("Pruned empty directory {:?}", dir);
            if !dir.pop() {
                break;
            }
        }
    }

    /// Remove the base directory and everything in it
    pub fn erase_all(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.base) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::KeyTransform;
    use tempfile::TempDir;

    fn backend(base: &Path, temp_dir: Option<PathBuf>) -> DiskBackend {
        DiskBackend::new(base.to_path_buf(), temp_dir, 0o777, 0o666, false)
    }

    fn pk(key: &str) -> PathKey {
        KeyTransform::new(false, ".yaml").to_path(key).unwrap()
    }

    #[test]
    fn test_write_read_nested() {
        let temp = TempDir::new().unwrap();
        let disk = backend(temp.path(), None);

        disk.write(&pk("a/b/c/file"), b"nested").unwrap();
        assert_eq!(disk.read(&pk("a/b/c/file")).unwrap(), b"nested");
        assert!(temp.path().join("a/b/c/file").is_file());
    }

    #[test]
    fn test_atomic_write_through_temp_dir() {
        let temp = TempDir::new().unwrap();
        let base = temp.path().join("data");
        let tmp_dir = temp.path().join("tmp");
        let disk = backend(&base, Some(tmp_dir.clone()));

        disk.write(&pk("x"), b"one").unwrap();
        disk.write(&pk("x"), b"two").unwrap();

        assert_eq!(disk.read(&pk("x")).unwrap(), b"two");
        assert_eq!(fs::read_dir(&tmp_dir).unwrap().count(), 0);
    }

    #[test]
    fn test_erase_prunes_empty_dirs() {
        let temp = TempDir::new().unwrap();
        let disk = backend(temp.path(), None);

        disk.write(&pk("a/b/one"), b"1").unwrap();
        disk.write(&pk("a/two"), b"2").unwrap();

        disk.erase(&pk("a/b/one")).unwrap();
        assert!(!temp.path().join("a/b").exists());
        assert!(temp.path().join("a").is_dir());
        assert!(temp.path().exists());
    }

    #[test]
    fn test_erase_missing_is_not_found() {
        let temp = TempDir::new().unwrap();
        let disk = backend(temp.path(), None);

        let err = disk.erase(&pk("nope")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_directory_is_not_a_key() {
        let temp = TempDir::new().unwrap();
        let disk = backend(temp.path(), None);

        disk.write(&pk("dir/file"), b"x").unwrap();
        assert!(!disk.has(&pk("dir")));
        assert!(disk.read(&pk("dir")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_permissions_applied() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let disk = DiskBackend::new(temp.path().to_path_buf(), None, 0o755, 0o600, true);
        disk.write(&pk("secret"), b"s").unwrap();

        let mode = fs::metadata(temp.path().join("secret"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
