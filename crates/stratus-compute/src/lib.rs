//! Servers, flavors and images for the Stratus cloud API
//!
//! [`Compute`] carries the collection-level operations; [`Server`] and
//! [`Image`] carry per-resource actions and plug into the polling engine so
//! callers can wait out the `BUILD`, `SAVING` and resize lifecycles.

pub mod api;
pub mod flavor;
pub mod image;
pub mod server;

// Re-exports
pub use api::{Compute, CreateServerOptions, ServerFilters};
pub use flavor::Flavor;
pub use image::{Image, ImageDetail};
pub use server::{
    Address, RebootType, RebuildOptions, ResourceRef, Server, ServerDetail, VolumeAttachment,
};
