use crate::artifacts::{missing, validate_name, ArtifactHandle, ArtifactStore};
use crate::error::{AppError, Result};
use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

const EXTENSION: &str = "artifact";

/// Artifact store on a plain directory tree: `<root>/<name>/<version>.artifact`.
///
/// Files are written under a temporary name and renamed into place, so readers
/// never observe a partially written version.
#[derive(Clone)]
pub struct FsArtifactStore {
    root: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

fn storage_error(context: &str, path: &Path, e: std::io::Error) -> AppError {
    AppError::Storage(format!("{} {:?}: {}", context, path, e))
}

impl FsArtifactStore {
    pub async fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root)
            .await
            .map_err(|e| storage_error("Failed to create artifact root", &root, e))?;

        tracing::info!("Initialized filesystem artifact store at {:?}", root);

        Ok(Self {
            root,
            write_lock: Arc::new(Mutex::new(())),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn artifact_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn artifact_path(&self, name: &str, version: u64) -> PathBuf {
        self.artifact_dir(name)
            .join(format!("{:020}.{}", version, EXTENSION))
    }

    async fn list_versions(&self, name: &str) -> Result<Vec<u64>> {
        let dir = self.artifact_dir(name);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(storage_error("Failed to list", &dir, e)),
        };

        let mut versions = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| storage_error("Failed to list", &dir, e))?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(EXTENSION) {
                continue;
            }
            if let Some(version) = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok())
            {
                versions.push(version);
            }
        }

        versions.sort_unstable();
        Ok(versions)
    }

    async fn resolve_version(&self, handle: &ArtifactHandle) -> Result<Option<u64>> {
        match handle.version {
            Some(v) => Ok(Some(v)),
            None => Ok(self.list_versions(&handle.name).await?.last().copied()),
        }
    }
}

#[async_trait]
impl ArtifactStore for FsArtifactStore {
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<ArtifactHandle> {
        validate_name(name)?;

        let _guard = self.write_lock.lock().await;

        let dir = self.artifact_dir(name);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| storage_error("Failed to create", &dir, e))?;

        let version = self.list_versions(name).await?.last().map_or(1, |v| v + 1);
        let path = self.artifact_path(name, version);
        let temp_path = dir.join(format!(".{:020}.tmp", version));

        fs::write(&temp_path, &bytes)
            .await
            .map_err(|e| storage_error("Failed to write", &temp_path, e))?;
        fs::rename(&temp_path, &path)
            .await
            .map_err(|e| storage_error("Failed to publish", &path, e))?;

        tracing::debug!(artifact = %name, version, path = ?path, "Artifact written");
        Ok(ArtifactHandle::pinned(name, version))
    }

    async fn read(&self, handle: &ArtifactHandle) -> Result<Vec<u8>> {
        validate_name(&handle.name)?;

        let version = self
            .resolve_version(handle)
            .await?
            .ok_or_else(|| missing(handle))?;
        let path = self.artifact_path(&handle.name, version);

        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(missing(handle)),
            Err(e) => Err(storage_error("Failed to read", &path, e)),
        }
    }

    async fn exists(&self, handle: &ArtifactHandle) -> Result<bool> {
        validate_name(&handle.name)?;

        match self.resolve_version(handle).await? {
            Some(version) => {
                let path = self.artifact_path(&handle.name, version);
                fs::try_exists(&path)
                    .await
                    .map_err(|e| storage_error("Failed to check", &path, e))
            }
            None => Ok(false),
        }
    }

    async fn versions(&self, name: &str) -> Result<Vec<u64>> {
        validate_name(name)?;
        self.list_versions(name).await
    }
}
