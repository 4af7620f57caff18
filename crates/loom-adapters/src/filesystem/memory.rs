//! In-memory filesystem adapter for testing and dry runs.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use loom_core::{
    application::{ApplicationError, ports::Filesystem},
    error::LoomResult,
};

/// In-memory filesystem. Clones share the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryFilesystem {
    inner: Arc<RwLock<MemoryFilesystemInner>>,
}

#[derive(Debug, Default)]
struct MemoryFilesystemInner {
    files: BTreeMap<PathBuf, String>,
    directories: BTreeSet<PathBuf>,
    executables: BTreeSet<PathBuf>,
}

impl MemoryFilesystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> LoomResult<RwLockReadGuard<'_, MemoryFilesystemInner>> {
        Ok(self
            .inner
            .read()
            .map_err(|_| ApplicationError::StoreLockError)?)
    }

    fn write(&self) -> LoomResult<RwLockWriteGuard<'_, MemoryFilesystemInner>> {
        Ok(self
            .inner
            .write()
            .map_err(|_| ApplicationError::StoreLockError)?)
    }

    /// Check if a file is marked executable.
    pub fn is_executable(&self, path: &Path) -> bool {
        self.read()
            .map(|inner| inner.executables.contains(path))
            .unwrap_or(false)
    }

    /// All files, sorted by path.
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.read()
            .map(|inner| inner.files.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear(&self) -> LoomResult<()> {
        let mut inner = self.write()?;
        inner.files.clear();
        inner.directories.clear();
        inner.executables.clear();
        Ok(())
    }
}

impl Filesystem for MemoryFilesystem {
    fn create_dir_all(&self, path: &Path) -> LoomResult<()> {
        let mut inner = self.write()?;
        let mut current = PathBuf::new();
        for component in path.components() {
            current.push(component);
            inner.directories.insert(current.clone());
        }
        Ok(())
    }

    fn write_file(&self, path: &Path, content: &str) -> LoomResult<()> {
        let mut inner = self.write()?;

        // Ensure parent exists
        let orphan = path
            .parent()
            .is_some_and(|parent| !parent.as_os_str().is_empty() && !inner.directories.contains(parent));
        if orphan {
            return Err(ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: "Parent directory does not exist".into(),
            }
            .into());
        }

        inner.files.insert(path.to_path_buf(), content.to_string());
        Ok(())
    }

    fn read_file(&self, path: &Path) -> LoomResult<String> {
        self.read()?.files.get(path).cloned().ok_or_else(|| {
            ApplicationError::FilesystemError {
                path: path.to_path_buf(),
                reason: "No such file".into(),
            }
            .into()
        })
    }

    fn set_permissions(&self, path: &Path, executable: bool) -> LoomResult<()> {
        let mut inner = self.write()?;
        if executable {
            inner.executables.insert(path.to_path_buf());
        } else {
            inner.executables.remove(path);
        }
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.read()
            .map(|inner| inner.files.contains_key(path) || inner.directories.contains(path))
            .unwrap_or(false)
    }

    fn remove_dir_all(&self, path: &Path) -> LoomResult<()> {
        let mut inner = self.write()?;
        inner.directories.retain(|p| !p.starts_with(path));
        inner.files.retain(|p, _| !p.starts_with(path));
        inner.executables.retain(|p| !p.starts_with(path));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_requires_parent_directory() {
        let fs = MemoryFilesystem::new();
        assert!(fs.write_file(Path::new("/out/a.txt"), "a").is_err());

        fs.create_dir_all(Path::new("/out")).unwrap();
        fs.write_file(Path::new("/out/a.txt"), "a").unwrap();
        assert_eq!(fs.read_file(Path::new("/out/a.txt")).unwrap(), "a");
        assert!(fs.exists(Path::new("/out")));
    }

    #[test]
    fn clones_share_contents() {
        let fs = MemoryFilesystem::new();
        let other = fs.clone();
        fs.create_dir_all(Path::new("/x")).unwrap();
        fs.write_file(Path::new("/x/run.sh"), "").unwrap();
        fs.set_permissions(Path::new("/x/run.sh"), true).unwrap();

        assert!(other.is_executable(Path::new("/x/run.sh")));
        assert_eq!(other.list_files(), vec![PathBuf::from("/x/run.sh")]);
    }

    #[test]
    fn remove_dir_all_drops_everything_below() {
        let fs = MemoryFilesystem::new();
        fs.create_dir_all(Path::new("/out/src")).unwrap();
        fs.write_file(Path::new("/out/src/lib.rs"), "").unwrap();

        fs.remove_dir_all(Path::new("/out")).unwrap();
        assert!(!fs.exists(Path::new("/out")));
        assert!(!fs.exists(Path::new("/out/src")));
        assert!(fs.list_files().is_empty());
    }
}
