pub mod codec;
pub mod factory;
pub mod fs_store;
pub mod sled_store;
pub mod store;

pub use codec::{ArtifactKind, EnvelopeInfo};
pub use factory::{create_artifact_store, create_in_memory_store};
pub use fs_store::FsArtifactStore;
pub use sled_store::SledArtifactStore;
pub use store::InMemoryArtifactStore;

use crate::error::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Longest accepted artifact name
pub const MAX_NAME_LEN: usize = 128;

/// Reference to a stored artifact; `version: None` resolves to the latest write
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ArtifactHandle {
    pub name: String,
    pub version: Option<u64>,
}

impl ArtifactHandle {
    pub fn latest(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: None,
        }
    }

    pub fn pinned(name: impl Into<String>, version: u64) -> Self {
        Self {
            name: name.into(),
            version: Some(version),
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.version.is_some()
    }
}

impl fmt::Display for ArtifactHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.version {
            Some(v) => write!(f, "{}@v{}", self.name, v),
            None => write!(f, "{}@latest", self.name),
        }
    }
}

/// Check an artifact name: 1 to 128 characters of `[A-Za-z0-9_.-]`
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.len() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "Artifact name must be 1 to {} characters, got {}",
            MAX_NAME_LEN,
            name.len()
        )));
    }

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-')))
    {
        return Err(AppError::Validation(format!(
            "Artifact name '{}' contains invalid character {:?}",
            name, c
        )));
    }

    if name == "." || name == ".." {
        return Err(AppError::Validation(format!(
            "Artifact name '{}' is reserved",
            name
        )));
    }

    Ok(())
}

pub(crate) fn missing(handle: &ArtifactHandle) -> AppError {
    AppError::ArtifactMissing(format!("No artifact stored for {}", handle))
}

/// Named, versioned, immutable blob storage.
///
/// Every write creates a new version (starting at 1) and never touches earlier ones.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store `bytes` as the next version of `name`
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactHandle>;

    /// Read the bytes a handle points to
    async fn read(&self, handle: &ArtifactHandle) -> Result<Vec<u8>>;

    /// Whether the handle resolves
    async fn exists(&self, handle: &ArtifactHandle) -> Result<bool>;

    /// All stored versions of `name`, ascending
    async fn versions(&self, name: &str) -> Result<Vec<u64>>;

    /// Pin a handle to a concrete version
    async fn resolve(&self, handle: &ArtifactHandle) -> Result<ArtifactHandle> {
        validate_name(&handle.name)?;

        match handle.version {
            Some(_) => {
                if self.exists(handle).await? {
                    Ok(handle.clone())
                } else {
                    Err(missing(handle))
                }
            }
            None => self
                .versions(&handle.name)
                .await?
                .last()
                .map(|v| ArtifactHandle::pinned(handle.name.clone(), *v))
                .ok_or_else(|| missing(handle)),
        }
    }
}

/// Pin `handle` and read the envelope header of that exact version.
///
/// `None` when the handle does not resolve. The returned handle is the version the
/// header describes, so follow-up decodes stay on the same version.
pub async fn inspect_handle(
    store: &dyn ArtifactStore,
    handle: &ArtifactHandle,
) -> Result<Option<(ArtifactHandle, EnvelopeInfo)>> {
    let pinned = match store.resolve(handle).await {
        Ok(pinned) => pinned,
        Err(AppError::ArtifactMissing(_)) => return Ok(None),
        Err(e) => return Err(e),
    };

    let header = codec::inspect(&store.read(&pinned).await?)?;
    Ok(Some((pinned, header)))
}
