//! Response types for the API

use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::device::{Device, EcuImage};
use crate::target::Target;

/// Device as shown in listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceSummary {
    #[serde(flatten)]
    pub device: Device,
    /// Image on the primary ECU, `null` until the device checks in
    pub device_image: Option<EcuImage>,
}

/// Device as shown by the detail endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeviceDetail {
    #[serde(flatten)]
    pub device: Device,
    pub device_image: Option<EcuImage>,
    /// Hardware report, `{}` until the device sends one
    #[schema(value_type = Object)]
    pub hardware_info: Value,
    /// Network report, `{}` until the device sends one
    #[schema(value_type = Object)]
    pub network_info: Value,
    pub auto_updates: bool,
}

/// Result of dispatching an update campaign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateApplied {
    #[serde(rename = "cur-image")]
    pub cur_image: EcuImage,
    #[serde(rename = "target-image")]
    pub target_image: Target,
}

/// One page of a registry listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryPage<T> {
    pub values: Vec<T>,
    pub total: u64,
    #[serde(default)]
    pub offset: u64,
    #[serde(default)]
    pub limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

/// Error body produced by the daemon itself
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorMessage {
    pub message: String,
}
