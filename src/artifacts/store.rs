use crate::artifacts::{missing, validate_name, ArtifactHandle, ArtifactStore};
use crate::error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use std::sync::Arc;

/// In-memory artifact store (for development and testing)
#[derive(Clone, Default)]
pub struct InMemoryArtifactStore {
    artifacts: Arc<DashMap<String, BTreeMap<u64, Arc<Vec<u8>>>>>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lookup(&self, handle: &ArtifactHandle) -> Option<Arc<Vec<u8>>> {
        let versions = self.artifacts.get(&handle.name)?;
        match handle.version {
            Some(v) => versions.get(&v).cloned(),
            None => versions.values().next_back().cloned(),
        }
    }
}

#[async_trait]
impl ArtifactStore for InMemoryArtifactStore {
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactHandle> {
        validate_name(name)?;

        // The entry guard serializes concurrent writers of the same name
        let version = {
            let mut versions = self.artifacts.entry(name.to_string()).or_default();
            let version = versions.keys().next_back().map_or(1, |v| v + 1);
            versions.insert(version, Arc::new(bytes));
            version
        };

        tracing::debug!(artifact = %name, version, "Artifact written");
        Ok(ArtifactHandle::pinned(name, version))
    }

    async fn read(&self, handle: &ArtifactHandle) -> Result<Vec<u8>> {
        validate_name(&handle.name)?;
        self.lookup(handle)
            .map(|bytes| bytes.as_ref().clone())
            .ok_or_else(|| missing(handle))
    }

    async fn exists(&self, handle: &ArtifactHandle) -> Result<bool> {
        validate_name(&handle.name)?;
        Ok(self.lookup(handle).is_some())
    }

    async fn versions(&self, name: &str) -> Result<Vec<u64>> {
        validate_name(name)?;
        Ok(self
            .artifacts
            .get(name)
            .map(|versions| versions.keys().copied().collect())
            .unwrap_or_default())
    }
}
