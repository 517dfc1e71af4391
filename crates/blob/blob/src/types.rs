use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use depot_core::BlobKey;

/// One entry returned by [`ObjectStore::list`](crate::ObjectStore::list).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobListing {
    /// Key the blob is stored under.
    pub key: BlobKey,
    /// Size in bytes.
    pub size_bytes: u64,
    /// When the blob was last written.
    pub last_modified: DateTime<Utc>,
}
