//! Device lookup, enrichment and registry administration

use otagate_api::requests::RegistryDeviceUpdate;
use otagate_api::responses::{DeviceDetail, DeviceSummary, RegistryPage};
use otagate_api::{Device, EcuImage};
use otagate_client::{BackendClient, BackendError};
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::autoupdate::get_autoupdates;
use crate::backends::Backends;
use crate::error::CoreError;
use crate::status::resolve_status;

/// Registry collection of devices
pub const DEVICES_RESOURCE: &str = "/api/v1/devices";

pub(crate) fn device_resource(uuid: &str) -> String {
    format!("{DEVICES_RESOURCE}/{uuid}")
}

/// Lookups by `deviceId` come back either as a bare list or as a page
#[derive(Deserialize)]
#[serde(untagged)]
enum Lookup {
    List(Vec<Device>),
    Page(RegistryPage<Device>),
}

/// Resolve a device name to its registry record
///
/// # Errors
/// Returns `CoreError::DeviceNotFound` when the registry has no match.
#[instrument(skip(registry))]
pub async fn find_device(registry: &BackendClient, name: &str) -> Result<Device, CoreError> {
    let lookup: Lookup = registry
        .get_with(DEVICES_RESOURCE, &[("deviceId", name.to_string())])
        .await?;
    let devices = match lookup {
        Lookup::List(devices) => devices,
        Lookup::Page(page) => page.values,
    };

    devices
        .into_iter()
        .next()
        .ok_or_else(|| CoreError::DeviceNotFound(name.to_string()))
}

/// Image installed on the device's primary ECU
///
/// `None` while the device has never checked in. The first ECU stands in for
/// the primary when the director does not flag one.
///
/// # Errors
/// Returns `CoreError::Backend` if the director lookup fails.
#[instrument(skip_all, fields(device = %device.uuid))]
pub async fn current_image(
    director: &BackendClient,
    device: &Device,
) -> Result<Option<EcuImage>, CoreError> {
    if !device.is_seen() {
        return Ok(None);
    }

    let ecus: Vec<EcuImage> = director
        .get(&format!("/api/v1/admin/devices/{}", device.uuid))
        .await?;
    let primary = ecus.iter().position(|ecu| ecu.primary).unwrap_or(0);
    Ok(ecus.into_iter().nth(primary))
}

/// Like [`current_image`] but fails when there is no image to work from
///
/// # Errors
/// Returns `CoreError::PreconditionFailed` for a device that never checked in.
pub async fn require_image(
    director: &BackendClient,
    device: &Device,
) -> Result<EcuImage, CoreError> {
    current_image(director, device)
        .await?
        .ok_or_else(|| CoreError::never_seen(&device.device_name))
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

/// A report the device has not sent yet (404 or empty body) degrades to `{}`
fn or_empty(result: Result<Value, BackendError>) -> Result<Value, CoreError> {
    match result {
        Ok(Value::Null) => Ok(empty_object()),
        Ok(value) => Ok(value),
        Err(err) if err.is_not_found() => Ok(empty_object()),
        Err(err) => Err(err.into()),
    }
}

/// Hardware report sent by the device
///
/// The registry answers with a list of reports; only the first is kept and
/// any other shape reads as `{}`.
///
/// # Errors
/// Returns `CoreError::Backend` on any registry failure other than 404.
pub async fn hardware_info(registry: &BackendClient, device: &Device) -> Result<Value, CoreError> {
    let resource = format!("{}/system_info", device_resource(&device.uuid));
    match or_empty(registry.get(&resource).await)? {
        Value::Array(items) => Ok(items.into_iter().next().unwrap_or_else(empty_object)),
        _ => Ok(empty_object()),
    }
}

/// Network report sent by the device
///
/// # Errors
/// Returns `CoreError::Backend` on any registry failure other than 404.
pub async fn network_info(registry: &BackendClient, device: &Device) -> Result<Value, CoreError> {
    let resource = format!("{}/system_info/network", device_resource(&device.uuid));
    or_empty(registry.get(&resource).await)
}

/// Attach derived status and current image to a registry record
///
/// # Errors
/// Returns `CoreError::Backend` if the director cannot be queried.
pub async fn summarize(
    backends: &Backends,
    mut device: Device,
) -> Result<DeviceSummary, CoreError> {
    let status = resolve_status(&backends.director, &device).await?;
    let device_image = current_image(&backends.director, &device).await?;
    device.device_status = status.to_string();

    Ok(DeviceSummary {
        device,
        device_image,
    })
}

/// Fully enriched view of one device
///
/// # Errors
/// Returns `CoreError::DeviceNotFound` for an unknown name, or
/// `CoreError::Backend` if any backend fails.
#[instrument(skip(backends))]
pub async fn get_device(backends: &Backends, name: &str) -> Result<DeviceDetail, CoreError> {
    let device = find_device(&backends.registry, name).await?;
    let hardware_info = hardware_info(&backends.registry, &device).await?;
    let network_info = network_info(&backends.registry, &device).await?;
    let DeviceSummary {
        device,
        device_image,
    } = summarize(backends, device).await?;

    let auto_updates = match &device_image {
        Some(image) => get_autoupdates(&backends.director, &device, &image.id).await?,
        None => false,
    };

    Ok(DeviceDetail {
        device,
        device_image,
        hardware_info,
        network_info,
        auto_updates,
    })
}

/// One page of the device's installed package list
///
/// # Errors
/// Returns `CoreError::Backend` if the registry call fails.
pub async fn device_packages(
    registry: &BackendClient,
    device: &Device,
    offset: u64,
    limit: u64,
) -> Result<Value, CoreError> {
    let resource = format!("{}/packages", device_resource(&device.uuid));
    let query = [("offset", offset.to_string()), ("limit", limit.to_string())];
    Ok(registry.get_with(&resource, &query).await?)
}

/// Rename a device, keeping `deviceId` in step with the new name
///
/// # Errors
/// Returns `CoreError::Backend` if the registry rejects the update.
#[instrument(skip(registry, device), fields(device = %device.uuid))]
pub async fn rename_device(
    registry: &BackendClient,
    device: &Device,
    new_name: &str,
) -> Result<Value, CoreError> {
    let body = RegistryDeviceUpdate::rename(new_name);
    let updated = registry
        .put_json(&device_resource(&device.uuid), &body)
        .await?;
    debug!("device renamed");
    Ok(updated)
}

/// Remove a device from the registry
///
/// # Errors
/// Returns `CoreError::Backend` if the registry rejects the deletion.
#[instrument(skip_all, fields(device = %device.uuid))]
pub async fn delete_device(registry: &BackendClient, device: &Device) -> Result<(), CoreError> {
    registry
        .delete::<Value>(&device_resource(&device.uuid))
        .await?;
    debug!("device deleted");
    Ok(())
}
