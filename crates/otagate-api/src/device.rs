//! Device and image types reported by the registry and director

use std::collections::BTreeMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

/// Registry status of a device that has never checked in
pub const STATUS_NOT_SEEN: &str = "NotSeen";

/// Registry status of a device with a pending campaign
pub const STATUS_OUTDATED: &str = "Outdated";

/// A device as returned by the registry
///
/// Only the fields the orchestration layer reads are typed; everything else
/// the registry sends is carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    /// Registry-assigned device UUID
    pub uuid: String,
    /// Human readable name
    pub device_name: String,
    /// Identifier used for lookups by name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Raw registry status, replaced by the derived status once enriched
    pub device_status: String,
    /// Remaining registry fields
    #[serde(flatten)]
    #[schema(ignore)]
    pub extra: BTreeMap<String, Value>,
}

impl Device {
    /// Whether the device has checked in at least once
    #[must_use]
    pub fn is_seen(&self) -> bool {
        self.device_status != STATUS_NOT_SEEN
    }

    /// Whether the registry flags the device as having a pending update
    #[must_use]
    pub fn is_outdated(&self) -> bool {
        self.device_status == STATUS_OUTDATED
    }
}

/// Image installed on one ECU, as reported by the director
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EcuImage {
    /// ECU serial
    pub id: String,
    /// Hardware identifier of the ECU
    pub hardware_id: String,
    /// Whether this is the device's primary ECU
    #[serde(default)]
    pub primary: bool,
    /// Installed image
    pub image: ImageInfo,
}

impl EcuImage {
    /// Content hash of the installed image
    #[must_use]
    pub fn sha256(&self) -> &str {
        &self.image.hash.sha256
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageInfo {
    #[serde(default)]
    pub filepath: String,
    #[serde(default)]
    pub size: u64,
    pub hash: ImageHash,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ImageHash {
    pub sha256: String,
}

/// One entry of a device's install queue on the director
#[derive(Debug, Clone, Deserialize)]
pub struct QueueEntry {
    /// Queued images keyed by ECU serial, in the order the director sent them
    #[serde(default)]
    pub targets: IndexMap<String, QueuedTarget>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct QueuedTarget {
    pub image: ImageInfo,
}
