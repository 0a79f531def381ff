//! OpenAPI document

use axum::Json;
use otagate_api::requests::{ApplyUpdateRequest, ImageSelector, PatchDeviceRequest};
use otagate_api::responses::{
    DeviceDetail, DeviceSummary, ErrorMessage, HealthResponse, UpdateApplied,
};
use otagate_api::{Device, EcuImage, Hashes, ImageHash, ImageInfo, Target, TargetCustom};
use utoipa::OpenApi;

use crate::api::{devices, system};

#[derive(OpenApi)]
#[openapi(
    info(title = "otagate", description = "OTA device management"),
    paths(
        devices::list_devices,
        devices::get_device,
        devices::device_packages,
        devices::device_updates,
        devices::update_device,
        devices::patch_device,
        devices::delete_device,
        system::health,
    ),
    components(schemas(
        Device,
        DeviceSummary,
        DeviceDetail,
        EcuImage,
        ImageInfo,
        ImageHash,
        Target,
        TargetCustom,
        Hashes,
        UpdateApplied,
        ApplyUpdateRequest,
        ImageSelector,
        PatchDeviceRequest,
        HealthResponse,
        ErrorMessage,
    )),
    tags(
        (name = "devices", description = "Device status, update feed and dispatch"),
        (name = "system", description = "Daemon health"),
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
