use std::time::Duration;

use bytes::Bytes;

use depot_core::{CacheKey, FileId};

use crate::error::CacheError;
use crate::store::Cache;

fn test_key() -> CacheKey {
    CacheKey::for_file(&FileId::generate())
}

const HOUR: Duration = Duration::from_secs(3600);

/// Run the cache conformance test suite.
///
/// Expiry is backend-specific and tested by each backend separately.
///
/// # Errors
///
/// Returns an error if any backend call fails unexpectedly.
pub async fn run_cache_conformance_tests(cache: &dyn Cache) -> Result<(), CacheError> {
    test_get_missing(cache).await?;
    test_set_and_get(cache).await?;
    test_set_overwrites(cache).await?;
    test_delete(cache).await?;
    Ok(())
}

async fn test_get_missing(cache: &dyn Cache) -> Result<(), CacheError> {
    let val = cache.get(&test_key()).await?;
    assert!(val.is_none(), "get on missing key should return None");
    Ok(())
}

async fn test_set_and_get(cache: &dyn Cache) -> Result<(), CacheError> {
    let key = test_key();
    cache.set(&key, Bytes::from_static(b"{\"name\":\"a\"}"), HOUR).await?;
    let val = cache.get(&key).await?;
    assert_eq!(val.as_deref(), Some(&b"{\"name\":\"a\"}"[..]));
    Ok(())
}

async fn test_set_overwrites(cache: &dyn Cache) -> Result<(), CacheError> {
    let key = test_key();
    cache.set(&key, Bytes::from_static(b"v1"), HOUR).await?;
    cache.set(&key, Bytes::from_static(b"v2"), HOUR).await?;
    let val = cache.get(&key).await?;
    assert_eq!(val.as_deref(), Some(&b"v2"[..]), "set should overwrite");
    Ok(())
}

async fn test_delete(cache: &dyn Cache) -> Result<(), CacheError> {
    let key = test_key();
    cache.set(&key, Bytes::from_static(b"gone"), HOUR).await?;
    assert!(cache.delete(&key).await?, "delete should return true");
    assert!(cache.get(&key).await?.is_none());
    assert!(
        !cache.delete(&key).await?,
        "delete on missing key should return false"
    );
    Ok(())
}
