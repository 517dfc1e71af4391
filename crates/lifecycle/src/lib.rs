//! File lifecycle orchestration for depot.
//!
//! [`FileLifecycle`] keeps three independent stores consistent: the object
//! store holding payloads, the metadata store holding [`FileRecord`]s, and a
//! disposable record cache. [`ExpirySweeper`] drives periodic cleanup through
//! the same [`FileLifecycle::sweep_expired`] entry point used on demand.
//!
//! [`FileRecord`]: depot_core::FileRecord

mod config;
mod error;
mod lifecycle;
mod sweep;
mod sweeper;

pub use config::LifecycleConfig;
pub use error::{ErrorKind, LifecycleError};
pub use lifecycle::{FileLifecycle, UploadRequest};
pub use sweep::{SweepFailure, SweepReport, SweepStep};
pub use sweeper::{ExpirySweeper, ExpirySweeperBuilder, ExpirySweeperConfig};
