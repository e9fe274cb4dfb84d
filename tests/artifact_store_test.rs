use retention_ai::artifacts::{
    ArtifactHandle, ArtifactStore, FsArtifactStore, InMemoryArtifactStore, SledArtifactStore,
};
use retention_ai::AppError;
use std::sync::Arc;
use tempfile::TempDir;

/// Versioning behaviour every backend must share
async fn test_versioning<S: ArtifactStore + 'static>(store: Arc<S>) {
    // Test 1: versions start at 1 and increase
    let first = store.write("preprocessor", b"first".to_vec()).await.unwrap();
    let second = store.write("preprocessor", b"second".to_vec()).await.unwrap();
    assert_eq!(first, ArtifactHandle::pinned("preprocessor", 1));
    assert_eq!(second, ArtifactHandle::pinned("preprocessor", 2));
    assert_eq!(store.versions("preprocessor").await.unwrap(), vec![1, 2]);

    // Test 2: latest wins, pins stay put
    let latest = ArtifactHandle::latest("preprocessor");
    assert_eq!(store.read(&latest).await.unwrap(), b"second");
    assert_eq!(store.read(&first).await.unwrap(), b"first");

    store.write("preprocessor", b"third".to_vec()).await.unwrap();
    assert_eq!(store.read(&latest).await.unwrap(), b"third");
    assert_eq!(store.read(&second).await.unwrap(), b"second");

    // Test 3: resolve pins latest handles
    assert_eq!(
        store.resolve(&latest).await.unwrap(),
        ArtifactHandle::pinned("preprocessor", 3)
    );
    assert_eq!(store.resolve(&first).await.unwrap(), first);

    // Test 4: names are independent
    let model = store.write("model", Vec::new()).await.unwrap();
    assert_eq!(model.version, Some(1));
    assert!(store.read(&model).await.unwrap().is_empty());
}

async fn test_missing<S: ArtifactStore + 'static>(store: Arc<S>) {
    let latest = ArtifactHandle::latest("nothing-here");
    assert!(matches!(
        store.read(&latest).await,
        Err(AppError::ArtifactMissing(_))
    ));
    assert!(matches!(
        store.resolve(&latest).await,
        Err(AppError::ArtifactMissing(_))
    ));
    assert!(!store.exists(&latest).await.unwrap());
    assert!(store.versions("nothing-here").await.unwrap().is_empty());

    store.write("model", b"x".to_vec()).await.unwrap();
    let beyond = ArtifactHandle::pinned("model", 2);
    assert!(!store.exists(&beyond).await.unwrap());
    assert!(matches!(
        store.read(&beyond).await,
        Err(AppError::ArtifactMissing(_))
    ));
}

async fn test_invalid_names<S: ArtifactStore + 'static>(store: Arc<S>) {
    for name in ["", "..", "a/b", "model v2"] {
        assert!(
            matches!(
                store.write(name, b"x".to_vec()).await,
                Err(AppError::Validation(_))
            ),
            "name {:?} should be rejected",
            name
        );
    }

    assert!(matches!(
        store.read(&ArtifactHandle::latest("../escape")).await,
        Err(AppError::Validation(_))
    ));
}

async fn test_concurrent_writers<S: ArtifactStore + 'static>(store: Arc<S>) {
    let mut tasks = Vec::new();
    for i in 0..16u8 {
        let store = store.clone();
        tasks.push(tokio::spawn(async move {
            store.write("model", vec![i]).await.unwrap()
        }));
    }

    let mut versions = Vec::new();
    for task in tasks {
        versions.push(task.await.unwrap().version.unwrap());
    }
    versions.sort_unstable();

    assert_eq!(versions, (1..=16).collect::<Vec<u64>>());
}

#[tokio::test]
async fn test_in_memory_store() {
    test_versioning(Arc::new(InMemoryArtifactStore::new())).await;
    test_missing(Arc::new(InMemoryArtifactStore::new())).await;
    test_invalid_names(Arc::new(InMemoryArtifactStore::new())).await;
    test_concurrent_writers(Arc::new(InMemoryArtifactStore::new())).await;
}

#[tokio::test]
async fn test_sled_store() {
    let temp_dir = TempDir::new().unwrap();

    let store = Arc::new(SledArtifactStore::new(temp_dir.path().join("versioning")).unwrap());
    test_versioning(store).await;

    let store = Arc::new(SledArtifactStore::new(temp_dir.path().join("missing")).unwrap());
    test_missing(store).await;

    let store = Arc::new(SledArtifactStore::new(temp_dir.path().join("names")).unwrap());
    test_invalid_names(store).await;

    let store = Arc::new(SledArtifactStore::new(temp_dir.path().join("concurrent")).unwrap());
    test_concurrent_writers(store).await;
}

#[tokio::test]
async fn test_filesystem_store() {
    let temp_dir = TempDir::new().unwrap();

    let store = Arc::new(FsArtifactStore::new(temp_dir.path().join("versioning")).await.unwrap());
    test_versioning(store).await;

    let store = Arc::new(FsArtifactStore::new(temp_dir.path().join("missing")).await.unwrap());
    test_missing(store).await;

    let store = Arc::new(FsArtifactStore::new(temp_dir.path().join("names")).await.unwrap());
    test_invalid_names(store).await;

    let store = Arc::new(FsArtifactStore::new(temp_dir.path().join("concurrent")).await.unwrap());
    test_concurrent_writers(store).await;
}

#[tokio::test]
async fn test_filesystem_store_survives_reopen() {
    let temp_dir = TempDir::new().unwrap();

    {
        let store = FsArtifactStore::new(temp_dir.path()).await.unwrap();
        store.write("model", b"v1".to_vec()).await.unwrap();
        store.write("model", b"v2".to_vec()).await.unwrap();
    }

    let store = FsArtifactStore::new(temp_dir.path()).await.unwrap();
    assert_eq!(store.versions("model").await.unwrap(), vec![1, 2]);
    assert_eq!(
        store.write("model", b"v3".to_vec()).await.unwrap(),
        ArtifactHandle::pinned("model", 3)
    );
    assert_eq!(
        store.read(&ArtifactHandle::pinned("model", 1)).await.unwrap(),
        b"v1"
    );
}
