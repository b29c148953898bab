use crate::error::PhotoPickError;
use fd_lock::{RwLock, RwLockWriteGuard};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Advisory lock next to the ledger file that keeps two runs from
/// interleaving their read-modify-write of the ledger.
pub struct LedgerLock {
    path: PathBuf,
    lock: RwLock<File>,
}

impl LedgerLock {
    pub fn open(ledger_path: &Path) -> Result<Self, PhotoPickError> {
        let mut lock_name = ledger_path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "ledger".into());
        lock_name.push(".lock");
        let path = ledger_path.with_file_name(lock_name);

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| PhotoPickError::LedgerLock {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        }

        let file = File::options()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&path)
            .map_err(|e| PhotoPickError::LedgerLock {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            path,
            lock: RwLock::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Takes the lock without blocking; fails if another run holds it.
    pub fn try_acquire(&mut self) -> Result<RwLockWriteGuard<'_, File>, PhotoPickError> {
        let path = self.path.clone();
        self.lock.try_write().map_err(|e| PhotoPickError::LedgerLock {
            path,
            reason: format!("another run appears to be in progress ({e})"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_file_sits_next_to_ledger() {
        let dir = tempfile::tempdir().unwrap();
        let lock = LedgerLock::open(&dir.path().join("fetched_photos.json")).unwrap();
        assert_eq!(lock.path(), dir.path().join("fetched_photos.json.lock"));
        assert!(lock.path().exists());
    }

    #[test]
    fn test_second_lock_is_refused_while_first_is_held() {
        let dir = tempfile::tempdir().unwrap();
        let ledger_path = dir.path().join("fetched_photos.json");
        let mut first = LedgerLock::open(&ledger_path).unwrap();
        let mut second = LedgerLock::open(&ledger_path).unwrap();

        let guard = first.try_acquire().unwrap();
        assert!(matches!(
            second.try_acquire(),
            Err(PhotoPickError::LedgerLock { .. })
        ));
        drop(guard);
        assert!(second.try_acquire().is_ok());
    }
}
