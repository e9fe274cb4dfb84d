use crate::artifacts::{missing, validate_name, ArtifactHandle, ArtifactStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use parking_lot::Mutex;
use sled::Db;
use std::path::Path;
use std::sync::Arc;

/// Persistent artifact store using Sled embedded database.
///
/// Keys are `name \0 version` with the version big-endian, so a prefix scan over
/// one name yields its versions in ascending order.
#[derive(Clone)]
pub struct SledArtifactStore {
    db: Arc<Db>,
    artifacts_tree: sled::Tree,
    write_lock: Arc<Mutex<()>>,
}

fn storage_error(context: &str, e: sled::Error) -> AppError {
    AppError::Storage(format!("{}: {}", context, e))
}

impl SledArtifactStore {
    /// Open (or create) a store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path.as_ref())
            .map_err(|e| storage_error("Failed to open Sled database", e))?;

        let artifacts_tree = db
            .open_tree("artifacts")
            .map_err(|e| storage_error("Failed to open artifacts tree", e))?;

        tracing::info!("Initialized Sled artifact store at {:?}", path.as_ref());

        Ok(Self {
            db: Arc::new(db),
            artifacts_tree,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    fn prefix(name: &str) -> Vec<u8> {
        let mut key = Vec::with_capacity(name.len() + 1);
        key.extend_from_slice(name.as_bytes());
        key.push(0);
        key
    }

    fn key(name: &str, version: u64) -> Vec<u8> {
        let mut key = Self::prefix(name);
        key.extend_from_slice(&version.to_be_bytes());
        key
    }

    fn decode_version(key: &[u8]) -> Result<u64> {
        let tail = key
            .len()
            .checked_sub(8)
            .map(|start| &key[start..])
            .ok_or_else(|| AppError::Storage("Malformed artifact key".to_string()))?;

        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(tail);
        Ok(u64::from_be_bytes(bytes))
    }

    fn latest_version(&self, name: &str) -> Result<Option<u64>> {
        match self.artifacts_tree.scan_prefix(Self::prefix(name)).next_back() {
            Some(entry) => {
                let (key, _) = entry.map_err(|e| storage_error("Failed to scan artifacts", e))?;
                Self::decode_version(&key).map(Some)
            }
            None => Ok(None),
        }
    }

    fn resolve_version(&self, handle: &ArtifactHandle) -> Result<Option<u64>> {
        match handle.version {
            Some(v) => Ok(Some(v)),
            None => self.latest_version(&handle.name),
        }
    }

    /// Flush pending writes to disk
    pub async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| storage_error("Failed to flush database", e))?;
        Ok(())
    }

    /// Get database size in bytes
    pub fn size_on_disk(&self) -> Result<u64> {
        self.db
            .size_on_disk()
            .map_err(|e| storage_error("Failed to get database size", e))
    }
}

#[async_trait]
impl ArtifactStore for SledArtifactStore {
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactHandle> {
        validate_name(name)?;

        let version = {
            let _guard = self.write_lock.lock();
            let version = self.latest_version(name)?.map_or(1, |v| v + 1);

            self.artifacts_tree
                .insert(Self::key(name, version), bytes)
                .map_err(|e| storage_error("Failed to write artifact", e))?;

            self.artifacts_tree
                .flush()
                .map_err(|e| storage_error("Failed to flush artifacts tree", e))?;

            version
        };

        tracing::debug!(artifact = %name, version, "Artifact written");
        Ok(ArtifactHandle::pinned(name, version))
    }

    async fn read(&self, handle: &ArtifactHandle) -> Result<Vec<u8>> {
        validate_name(&handle.name)?;

        let version = self
            .resolve_version(handle)?
            .ok_or_else(|| missing(handle))?;

        self.artifacts_tree
            .get(Self::key(&handle.name, version))
            .map_err(|e| storage_error("Failed to read artifact", e))?
            .map(|bytes| bytes.to_vec())
            .ok_or_else(|| missing(handle))
    }

    async fn exists(&self, handle: &ArtifactHandle) -> Result<bool> {
        validate_name(&handle.name)?;

        match self.resolve_version(handle)? {
            Some(version) => self
                .artifacts_tree
                .contains_key(Self::key(&handle.name, version))
                .map_err(|e| storage_error("Failed to check artifact", e)),
            None => Ok(false),
        }
    }

    async fn versions(&self, name: &str) -> Result<Vec<u64>> {
        validate_name(name)?;

        self.artifacts_tree
            .scan_prefix(Self::prefix(name))
            .keys()
            .map(|key| {
                let key = key.map_err(|e| storage_error("Failed to scan artifacts", e))?;
                Self::decode_version(&key)
            })
            .collect()
    }
}
