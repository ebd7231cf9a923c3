//! Persistent layout storage
//!
//! Layouts are stored as JSON bodies keyed by fingerprint, plus one
//! `latest_layout` key naming the fingerprint believed active on the hardware.

mod file;

pub use file::FileBackend;

use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::constants::store::KEY_LATEST_LAYOUT;
use crate::fingerprint::Fingerprint;
use crate::xrandr::Snapshot;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid key {0:?}")]
    InvalidKey(String),

    #[error("invalid (empty) value for key {0:?}")]
    InvalidValue(String),

    #[error("I/O error on {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to encode layout {fingerprint}")]
    Encode {
        fingerprint: Fingerprint,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to decode value of key {key:?}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Byte-oriented key/value storage
pub trait Backend: Send + Sync {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError>;

    /// Removing a missing key is not an error
    fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Write entries in order. Earlier entries stay written if a later one fails.
    fn write_batch(&self, entries: &[(&str, &[u8])]) -> Result<(), StoreError> {
        for (key, value) in entries {
            self.write(key, value)?;
        }
        Ok(())
    }
}

impl<B: Backend> Backend for Arc<B> {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        (**self).read(key)
    }

    fn write(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        (**self).write(key, value)
    }

    fn delete(&self, key: &str) -> Result<(), StoreError> {
        (**self).delete(key)
    }

    fn write_batch(&self, entries: &[(&str, &[u8])]) -> Result<(), StoreError> {
        (**self).write_batch(entries)
    }
}

/// Shared argument checks for [`Backend`] implementations
pub(crate) fn check_entry(key: &str, value: Option<&[u8]>) -> Result<(), StoreError> {
    if key.is_empty() {
        return Err(StoreError::InvalidKey(key.to_string()));
    }
    if value.is_some_and(<[u8]>::is_empty) {
        return Err(StoreError::InvalidValue(key.to_string()));
    }
    Ok(())
}

/// Typed access to saved layouts
pub struct LayoutStore<B: Backend> {
    backend: B,
}

impl<B: Backend> LayoutStore<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn latest_fingerprint(&self) -> Result<Option<Fingerprint>, StoreError> {
        let Some(bytes) = self.backend.read(KEY_LATEST_LAYOUT)? else {
            return Ok(None);
        };
        let hex = String::from_utf8_lossy(&bytes).trim().to_string();
        if hex.is_empty() {
            return Ok(None);
        }
        Ok(Some(Fingerprint::from_hex(hex)))
    }

    pub fn saved_snapshot(&self, fingerprint: &Fingerprint) -> Result<Option<Snapshot>, StoreError> {
        let key = fingerprint.as_str();
        let Some(bytes) = self.backend.read(key)? else {
            return Ok(None);
        };
        let snapshot = serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            key: key.to_string(),
            source,
        })?;
        Ok(Some(snapshot))
    }

    /// Store a new layout and mark it latest. The body is written before
    /// `latest_layout` so latest never names a missing body.
    pub fn save_snapshot(&self, fingerprint: &Fingerprint, snapshot: &Snapshot) -> Result<(), StoreError> {
        let body = encode(fingerprint, snapshot)?;
        self.backend.write_batch(&[
            (fingerprint.as_str(), body.as_slice()),
            (KEY_LATEST_LAYOUT, fingerprint.as_str().as_bytes()),
        ])?;
        debug!(fingerprint = %fingerprint, bytes = body.len(), "Saved layout");
        Ok(())
    }

    /// Overwrite the body only
    pub fn refresh_snapshot(&self, fingerprint: &Fingerprint, snapshot: &Snapshot) -> Result<(), StoreError> {
        let body = encode(fingerprint, snapshot)?;
        self.backend.write(fingerprint.as_str(), &body)?;
        debug!(fingerprint = %fingerprint, bytes = body.len(), "Refreshed layout");
        Ok(())
    }

    pub fn set_latest(&self, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        self.backend.write(KEY_LATEST_LAYOUT, fingerprint.as_str().as_bytes())
    }

    /// Delete a saved layout, clearing `latest_layout` if it named it
    pub fn forget(&self, fingerprint: &Fingerprint) -> Result<(), StoreError> {
        self.backend.delete(fingerprint.as_str())?;
        if self.latest_fingerprint()?.as_ref() == Some(fingerprint) {
            self.backend.delete(KEY_LATEST_LAYOUT)?;
        }
        Ok(())
    }
}

fn encode(fingerprint: &Fingerprint, snapshot: &Snapshot) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(snapshot).map_err(|source| StoreError::Encode {
        fingerprint: fingerprint.clone(),
        source,
    })
}


#[cfg(test)]
mod tests {
    use super::memory::MemoryBackend;
    use super::*;
    use crate::xrandr::{fixtures, parse_snapshot};

    fn docked() -> (Fingerprint, Snapshot) {
        let snapshot = parse_snapshot(fixtures::DOCKED.as_bytes()).unwrap();
        (Fingerprint::of(&snapshot), snapshot)
    }

    #[test]
    fn test_empty_store() {
        let store = LayoutStore::new(MemoryBackend::new());
        let (fp, _) = docked();

        assert_eq!(store.latest_fingerprint().unwrap(), None);
        assert_eq!(store.saved_snapshot(&fp).unwrap(), None);
    }

    #[test]
    fn test_save_and_load() {
        let store = LayoutStore::new(MemoryBackend::new());
        let (fp, snapshot) = docked();

        store.save_snapshot(&fp, &snapshot).unwrap();

        assert_eq!(store.latest_fingerprint().unwrap(), Some(fp.clone()));
        assert_eq!(store.saved_snapshot(&fp).unwrap(), Some(snapshot));
    }

    #[test]
    fn test_body_is_json_array() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LayoutStore::new(Arc::clone(&backend));
        let (fp, snapshot) = docked();

        store.save_snapshot(&fp, &snapshot).unwrap();

        let body = backend.read(fp.as_str()).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(value.as_array().map(Vec::len), Some(snapshot.outputs.len()));
        assert_eq!(backend.read(KEY_LATEST_LAYOUT).unwrap().unwrap(), fp.as_str().as_bytes());
    }

    #[test]
    fn test_latest_not_updated_when_body_write_fails() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LayoutStore::new(Arc::clone(&backend));
        let (fp, snapshot) = docked();

        backend.fail_writes_to(fp.as_str());
        assert!(matches!(store.save_snapshot(&fp, &snapshot), Err(StoreError::Io { .. })));
        assert_eq!(store.latest_fingerprint().unwrap(), None);
    }

    #[test]
    fn test_refresh_leaves_latest_alone() {
        let store = LayoutStore::new(MemoryBackend::new());
        let (fp, snapshot) = docked();
        let other = Fingerprint::from_hex("abc123");

        store.save_snapshot(&fp, &snapshot).unwrap();
        store.set_latest(&other).unwrap();

        let arranged = parse_snapshot(fixtures::DOCKED_ARRANGED.as_bytes()).unwrap();
        store.refresh_snapshot(&fp, &arranged).unwrap();

        assert_eq!(store.latest_fingerprint().unwrap(), Some(other));
        assert_eq!(store.saved_snapshot(&fp).unwrap(), Some(arranged));
    }

    #[test]
    fn test_forget_clears_matching_latest() {
        let store = LayoutStore::new(MemoryBackend::new());
        let (fp, snapshot) = docked();

        store.save_snapshot(&fp, &snapshot).unwrap();
        store.forget(&fp).unwrap();

        assert_eq!(store.saved_snapshot(&fp).unwrap(), None);
        assert_eq!(store.latest_fingerprint().unwrap(), None);
    }

    #[test]
    fn test_forget_keeps_other_latest() {
        let store = LayoutStore::new(MemoryBackend::new());
        let (fp, snapshot) = docked();
        let laptop = parse_snapshot(fixtures::LAPTOP.as_bytes()).unwrap();
        let laptop_fp = Fingerprint::of(&laptop);

        store.save_snapshot(&fp, &snapshot).unwrap();
        store.save_snapshot(&laptop_fp, &laptop).unwrap();
        store.forget(&fp).unwrap();

        assert_eq!(store.latest_fingerprint().unwrap(), Some(laptop_fp));
    }

    #[test]
    fn test_corrupt_body_is_decode_error() {
        let backend = Arc::new(MemoryBackend::new());
        let store = LayoutStore::new(Arc::clone(&backend));
        let fp = Fingerprint::from_hex("deadbeef");

        backend.write(fp.as_str(), b"{not json").unwrap();

        assert!(matches!(store.saved_snapshot(&fp), Err(StoreError::Decode { .. })));
    }

    #[test]
    fn test_backend_rejects_empty_key_and_value() {
        let backend = MemoryBackend::new();

        assert!(matches!(backend.write("", b"x"), Err(StoreError::InvalidKey(_))));
        assert!(matches!(backend.read(""), Err(StoreError::InvalidKey(_))));
        assert!(matches!(backend.write("k", b""), Err(StoreError::InvalidValue(_))));
        assert!(backend.keys().is_empty());
    }
}
