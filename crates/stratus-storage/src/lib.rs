//! Block storage volumes for the Stratus cloud API
//!
//! [`BlockStorage`] lists, creates and deletes volumes; [`Volume`] carries
//! the per-resource operations and plugs into the polling engine so callers
//! can wait for `available`, `in-use` or `ACTIVE`.

pub mod api;
pub mod volume;

// Re-exports
pub use api::{BlockStorage, CreateVolumeOptions, VolumeType};
pub use volume::{Volume, VolumeDetail};
