pub mod error;
pub mod key;
pub mod record;
pub mod search;
pub mod types;

pub use error::CoreError;
pub use key::{BlobKey, CacheKey};
pub use record::{FileRecord, FileView};
pub use search::{DateRange, SearchFilter};
pub use types::{FileId, OwnerId};
