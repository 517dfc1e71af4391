use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use depot_core::CacheKey;

use crate::error::CacheError;

/// Short-lived key/value cache for serialized file records.
///
/// Entries expire after the TTL given to [`Cache::set`]. An expired entry is
/// indistinguishable from one that was never written.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Read an entry. Returns `None` on a miss or after expiry.
    async fn get(&self, key: &CacheKey) -> Result<Option<Bytes>, CacheError>;

    /// Write an entry, replacing any previous value and TTL.
    async fn set(&self, key: &CacheKey, value: Bytes, ttl: Duration) -> Result<(), CacheError>;

    /// Remove an entry. Returns `true` if a live entry existed.
    async fn delete(&self, key: &CacheKey) -> Result<bool, CacheError>;
}
