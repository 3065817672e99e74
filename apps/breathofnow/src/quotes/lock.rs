use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fd_lock::{RwLock, RwLockWriteGuard};
use tracing::debug;

use super::GuardError;

/// Advisory lock file guarding one quote store across processes.
///
/// Lives beside the store as `<store>.lock`. Hold the write guard for the
/// whole load → register → save cycle.
pub struct StoreLock {
    path: PathBuf,
    inner: RwLock<File>,
}

impl StoreLock {
    pub fn open(store_path: &Path) -> Result<Self, GuardError> {
        let mut name = store_path.as_os_str().to_os_string();
        name.push(".lock");
        let path = PathBuf::from(name);

        if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|source| GuardError::Lock {
                path: path.clone(),
                source,
            })?;

        Ok(Self {
            path,
            inner: RwLock::new(file),
        })
    }

    /// Blocks until no other process holds the store.
    pub fn acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, GuardError> {
        debug!("Acquiring quote store lock {}", self.path.display());
        let path = self.path.clone();
        self.inner
            .write()
            .map_err(|source| GuardError::Lock { path, source })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
