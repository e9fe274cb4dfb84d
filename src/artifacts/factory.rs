use crate::artifacts::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore, SledArtifactStore};
use crate::config::{ArtifactBackend, ArtifactConfig};
use crate::error::{AppError, Result};
use std::sync::Arc;

/// Create an artifact store based on configuration
pub async fn create_artifact_store(config: &ArtifactConfig) -> Result<Arc<dyn ArtifactStore>> {
    match config.backend {
        ArtifactBackend::Filesystem => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Filesystem backend requires 'path' configuration".to_string(),
                )
            })?;

            tracing::info!(path = ?path, "Initializing filesystem artifact backend");

            let store = FsArtifactStore::new(path).await?;
            Ok(Arc::new(store))
        }

        ArtifactBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration("Sled backend requires 'path' configuration".to_string())
            })?;

            tracing::info!(path = ?path, "Initializing Sled artifact backend");

            let store = SledArtifactStore::new(path)?;
            Ok(Arc::new(store))
        }

        ArtifactBackend::Memory => Ok(create_in_memory_store()),
    }
}

/// Create an in-memory store (for testing and development)
pub fn create_in_memory_store() -> Arc<dyn ArtifactStore> {
    tracing::info!("Initializing in-memory artifact backend");
    Arc::new(InMemoryArtifactStore::new())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactHandle;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_sled_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = ArtifactConfig {
            backend: ArtifactBackend::Sled,
            path: Some(temp_dir.path().to_path_buf()),
        };

        let store = create_artifact_store(&config).await.unwrap();
        assert!(!store.exists(&ArtifactHandle::latest("model")).await.unwrap());
    }

    #[tokio::test]
    async fn test_create_filesystem_store() {
        let temp_dir = TempDir::new().unwrap();
        let config = ArtifactConfig {
            backend: ArtifactBackend::Filesystem,
            path: Some(temp_dir.path().join("artifacts")),
        };

        let store = create_artifact_store(&config).await.unwrap();
        let handle = store.write("model", vec![1, 2, 3]).await.unwrap();
        assert_eq!(handle.version, Some(1));
    }

    #[tokio::test]
    async fn test_persistent_backends_require_path() {
        for backend in [ArtifactBackend::Sled, ArtifactBackend::Filesystem] {
            let config = ArtifactConfig {
                backend,
                path: None,
            };
            assert!(matches!(
                create_artifact_store(&config).await,
                Err(AppError::Configuration(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_create_in_memory_store() {
        let store = create_in_memory_store();
        assert!(store.versions("model").await.unwrap().is_empty());
    }
}
