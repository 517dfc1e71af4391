pub mod error;
pub mod store;
pub mod testing;
pub mod types;

pub use error::BlobError;
pub use store::ObjectStore;
pub use types::BlobListing;
