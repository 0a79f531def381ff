//! Device status derived from registry state and the director install queue

use std::fmt;

use otagate_api::device::STATUS_NOT_SEEN;
use otagate_api::{Device, QueueEntry};
use otagate_client::BackendClient;
use serde::{Serialize, Serializer};
use tracing::{instrument, warn};

use crate::error::CoreError;

/// Effective status shown to API consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedStatus {
    /// Device never checked in
    NotSeen,
    /// Registry status passed through unchanged
    Reported(String),
    /// Director has queued this image for the device
    Updating {
        /// Filepath of the queued image
        filepath: String,
    },
    /// Registry says outdated but the director queue is already empty
    Reconciling,
}

impl fmt::Display for ResolvedStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolvedStatus::NotSeen => f.write_str(STATUS_NOT_SEEN),
            ResolvedStatus::Reported(status) => f.write_str(status),
            ResolvedStatus::Updating { filepath } => write!(f, "Updating to {filepath}"),
            ResolvedStatus::Reconciling => f.write_str("Reconciling"),
        }
    }
}

impl Serialize for ResolvedStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

pub(crate) fn queue_resource(uuid: &str) -> String {
    format!("/api/v1/admin/devices/{uuid}/queue")
}

/// Derive the effective status of `device`
///
/// Only devices the registry marks `Outdated` cost a director round trip.
///
/// # Errors
/// Returns `CoreError::Backend` if the director queue cannot be read.
#[instrument(skip_all, fields(device = %device.uuid))]
pub async fn resolve_status(
    director: &BackendClient,
    device: &Device,
) -> Result<ResolvedStatus, CoreError> {
    if !device.is_seen() {
        return Ok(ResolvedStatus::NotSeen);
    }
    if !device.is_outdated() {
        return Ok(ResolvedStatus::Reported(device.device_status.clone()));
    }

    let queue: Vec<QueueEntry> = director.get(&queue_resource(&device.uuid)).await?;
    let queued = queue
        .first()
        .and_then(|entry| entry.targets.values().next());

    match queued {
        Some(target) => Ok(ResolvedStatus::Updating {
            filepath: target.image.filepath.clone(),
        }),
        None => {
            // registry and director disagree until the director catches up
            warn!("device outdated but director queue is empty");
            Ok(ResolvedStatus::Reconciling)
        }
    }
}
