pub mod error;
pub mod store;
pub mod testing;

pub use error::CacheError;
pub use store::Cache;
