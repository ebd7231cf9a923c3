//! One file per key under a state directory

use parking_lot::Mutex;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use super::{check_entry, Backend, StoreError};

pub struct FileBackend {
    dir: PathBuf,
    lock: Mutex<()>,
}

impl FileBackend {
    /// Open the state directory, creating it if needed
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        info!(path = %dir.display(), "Opened layout store");
        Ok(Self {
            dir,
            lock: Mutex::new(()),
        })
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        if key.starts_with('.') || key.contains('/') || key.contains('\\') {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }

    /// Write to a uniquely named temp file in the same directory, then
    /// rename it over the target
    fn write_atomic(&self, path: &Path, value: &[u8]) -> Result<(), StoreError> {
        let io_err = |source: std::io::Error| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(value).map_err(io_err)?;
        tmp.as_file().sync_all().map_err(io_err)?;
        tmp.persist(path).map_err(|e| io_err(e.error))?;
        Ok(())
    }
}

impl Backend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        check_entry(key, None)?;
        let path = self.path_for(key)?;
        let _guard = self.lock.lock();
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        check_entry(key, Some(value))?;
        let path = self.path_for(key)?;
        let _guard = self.lock.lock();
        self.write_atomic(&path, value)?;
        debug!(key = key, bytes = value.len(), "Wrote key");
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        check_entry(key, None)?;
        let path = self.path_for(key)?;
        let _guard = self.lock.lock();
        match fs::remove_file(&path) {
            Ok(()) => {
                debug!(key = key, "Deleted key");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }

    fn write_batch(&self, entries: &[(&str, &[u8])]) -> Result<(), StoreError> {
        // Validate everything up front so a bad entry late in the batch
        // cannot leave the earlier ones half-applied.
        let mut paths = Vec::with_capacity(entries.len());
        for (key, value) in entries {
            check_entry(key, Some(*value))?;
            paths.push(self.path_for(key)?);
        }

        let _guard = self.lock.lock();
        for (path, (_, value)) in paths.iter().zip(entries) {
            self.write_atomic(path, value)?;
        }
        debug!(entries = entries.len(), "Wrote batch");
        Ok(())
    }
}
