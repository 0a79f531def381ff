//! Request types for the API and the backends

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::target::Target;

/// Body of `PUT /devices/{name}/`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ApplyUpdateRequest {
    #[serde(default)]
    pub image: Option<ImageSelector>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ImageSelector {
    /// sha256 of the target to install
    #[serde(default)]
    pub hash: Option<String>,
}

/// Body of `PATCH /devices/{name}/`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct PatchDeviceRequest {
    #[serde(rename = "auto-updates", default, skip_serializing_if = "Option::is_none")]
    pub auto_updates: Option<bool>,
    /// New device name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Query of `GET /devices/{name}/packages/`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PackagesQuery {
    #[serde(default)]
    pub offset: u64,
    #[serde(default = "default_packages_limit")]
    pub limit: u64,
}

impl Default for PackagesQuery {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_packages_limit(),
        }
    }
}

fn default_packages_limit() -> u64 {
    50
}

/// Query of `GET /devices/`
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct ListDevicesQuery {
    /// Registry-side regular expression on device names
    #[serde(default)]
    pub regex: Option<String>,
}

/// Registry body for renaming a device
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryDeviceUpdate {
    pub device_name: String,
    pub device_id: String,
    pub device_type: String,
}

impl RegistryDeviceUpdate {
    #[must_use]
    pub fn rename(new_name: &str) -> Self {
        Self {
            device_name: new_name.to_string(),
            device_id: new_name.to_string(),
            device_type: "Other".to_string(),
        }
    }
}

/// Director campaign request, keyed by hardware id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MultiTargetUpdate {
    pub targets: BTreeMap<String, HardwareUpdate>,
}

impl MultiTargetUpdate {
    /// Campaign moving every ECU with `hardware_id` to `target`
    #[must_use]
    pub fn single(hardware_id: &str, target_name: &str, target: &Target) -> Self {
        let update = HardwareUpdate {
            to: TargetRef {
                target: target_name.to_string(),
                checksum: Checksum {
                    method: "sha256".to_string(),
                    hash: target.hashes.sha256.clone(),
                },
                target_length: target.length,
            },
            target_format: target.custom.target_format.clone(),
            generate_diff: false,
        };

        Self {
            targets: BTreeMap::from([(hardware_id.to_string(), update)]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HardwareUpdate {
    pub to: TargetRef,
    pub target_format: Option<String>,
    pub generate_diff: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TargetRef {
    pub target: String,
    pub checksum: Checksum,
    pub target_length: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Checksum {
    pub method: String,
    pub hash: String,
}
