//! otagate-core: Target resolution and update orchestration
//!
//! Derives device status from the registry and the director install queue,
//! resolves image hashes against the signed target catalog, dispatches
//! update campaigns and manages auto-update subscriptions. Nothing is stored
//! locally; every operation re-reads the backends.

pub mod autoupdate;
pub mod backends;
pub mod catalog;
pub mod config;
pub mod devices;
pub mod error;
pub mod feed;
pub mod pager;
pub mod service;
pub mod status;
pub mod update;

pub use autoupdate::{get_autoupdates, set_autoupdates};
pub use backends::Backends;
pub use catalog::{fetch_targets, find_by_hash};
pub use config::{BackendsConfig, RequestConfig};
pub use devices::{current_image, find_device, get_device};
pub use error::CoreError;
pub use feed::list_updates;
pub use pager::{DevicePager, PAGE_LIMIT};
pub use service::OtaService;
pub use status::{ResolvedStatus, resolve_status};
pub use update::apply_update;
