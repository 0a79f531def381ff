//! otagate-api: Shared wire types
//!
//! Device, image and target types as exchanged with the director, registry
//! and repository backends, plus the request/response bodies served by the
//! daemon and printed by the CLI.

pub mod device;
pub mod requests;
pub mod responses;
pub mod target;

pub use device::{Device, EcuImage, ImageHash, ImageInfo, QueueEntry, QueuedTarget};
pub use target::{Catalog, Hashes, SignedTargets, Target, TargetCustom};
