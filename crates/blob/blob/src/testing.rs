use bytes::Bytes;

use depot_core::{BlobKey, FileId};

use crate::error::BlobError;
use crate::store::ObjectStore;

fn test_key() -> BlobKey {
    BlobKey::for_file(&FileId::generate())
}

/// Run the full object store conformance test suite.
///
/// Call this from your backend's test module with a fresh store instance.
///
/// # Errors
///
/// Returns an error if any backend call fails unexpectedly.
pub async fn run_object_store_conformance_tests(store: &dyn ObjectStore) -> Result<(), BlobError> {
    test_get_missing(store).await?;
    test_put_and_get(store).await?;
    test_put_overwrites(store).await?;
    test_delete(store).await?;
    test_list_prefix(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let result = store.get(&test_key()).await;
    assert!(
        matches!(result, Err(BlobError::NotFound(_))),
        "get on missing key should return NotFound"
    );
    Ok(())
}

async fn test_put_and_get(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let key = test_key();
    store
        .put(&key, Bytes::from_static(b"hello"), "text/plain")
        .await?;
    let data = store.get(&key).await?;
    assert_eq!(&data[..], b"hello");
    Ok(())
}

async fn test_put_overwrites(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let key = test_key();
    store.put(&key, Bytes::from_static(b"v1"), "text/plain").await?;
    store.put(&key, Bytes::from_static(b"v2"), "text/plain").await?;
    let data = store.get(&key).await?;
    assert_eq!(&data[..], b"v2", "second put should overwrite");
    Ok(())
}

async fn test_delete(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let key = test_key();
    store
        .put(&key, Bytes::from_static(b"bye"), "text/plain")
        .await?;
    let existed = store.delete(&key).await?;
    assert!(existed, "delete should return true for existing blob");
    assert!(matches!(store.get(&key).await, Err(BlobError::NotFound(_))));

    let existed = store.delete(&key).await?;
    assert!(!existed, "delete on missing blob should return false");
    Ok(())
}

async fn test_list_prefix(store: &dyn ObjectStore) -> Result<(), BlobError> {
    let key = test_key();
    store
        .put(&key, Bytes::from_static(b"12345"), "application/octet-stream")
        .await?;
    let foreign = BlobKey::new("conformance-other/blob");
    store
        .put(&foreign, Bytes::from_static(b"x"), "text/plain")
        .await?;

    let listed = store.list(BlobKey::PREFIX).await?;
    let entry = listed
        .iter()
        .find(|l| l.key == key)
        .expect("listing should include the stored blob");
    assert_eq!(entry.size_bytes, 5);
    assert!(
        listed.iter().all(|l| l.key.as_str().starts_with(BlobKey::PREFIX)),
        "listing should only include keys under the prefix"
    );

    store.delete(&key).await?;
    store.delete(&foreign).await?;
    Ok(())
}
