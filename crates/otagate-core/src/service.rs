//! Name-addressed device operations
//!
//! Each method builds its own [`Backends`] from the configuration, resolves
//! the device by name through the registry and then composes the lower-level
//! operations. No state survives between calls.

use otagate_api::Target;
use otagate_api::responses::{DeviceDetail, UpdateApplied};
use serde_json::Value;
use tracing::instrument;

use crate::autoupdate::set_autoupdates;
use crate::backends::Backends;
use crate::config::BackendsConfig;
use crate::devices::{delete_device, device_packages, find_device, get_device, rename_device};
use crate::error::CoreError;
use crate::feed::list_updates;
use crate::pager::DevicePager;
use crate::update::apply_update;

/// Device management operations for one tenant
#[derive(Debug, Clone)]
pub struct OtaService {
    config: BackendsConfig,
}

impl OtaService {
    #[must_use]
    pub fn new(config: BackendsConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &BackendsConfig {
        &self.config
    }

    fn backends(&self) -> Result<Backends, CoreError> {
        Backends::connect(&self.config)
    }

    /// Fresh cursor over all devices, optionally filtered by a registry regex
    ///
    /// # Errors
    /// Returns `CoreError::Config` if the backends cannot be set up.
    pub fn list_devices(&self, regex: Option<String>) -> Result<DevicePager, CoreError> {
        Ok(DevicePager::new(self.backends()?, regex))
    }

    /// Enriched device detail
    ///
    /// # Errors
    /// Returns `CoreError::DeviceNotFound` or any backend failure.
    pub async fn device(&self, name: &str) -> Result<DeviceDetail, CoreError> {
        get_device(&self.backends()?, name).await
    }

    /// One page of installed packages
    ///
    /// # Errors
    /// Returns `CoreError::DeviceNotFound` or any backend failure.
    pub async fn device_packages(
        &self,
        name: &str,
        offset: u64,
        limit: u64,
    ) -> Result<Value, CoreError> {
        let backends = self.backends()?;
        let device = find_device(&backends.registry, name).await?;
        device_packages(&backends.registry, &device, offset, limit).await
    }

    /// Update feed, newest first
    ///
    /// # Errors
    /// Returns `CoreError::DeviceNotFound` or any backend failure.
    pub async fn device_updates(&self, name: &str) -> Result<Vec<Target>, CoreError> {
        let backends = self.backends()?;
        let device = find_device(&backends.registry, name).await?;
        list_updates(&backends, &device).await
    }

    /// Dispatch the target with sha256 `image_hash` to the device
    ///
    /// # Errors
    /// See [`apply_update`].
    #[instrument(skip(self))]
    pub async fn device_update(
        &self,
        name: &str,
        image_hash: &str,
    ) -> Result<UpdateApplied, CoreError> {
        let backends = self.backends()?;
        let device = find_device(&backends.registry, name).await?;
        apply_update(&backends, &device, image_hash).await
    }

    /// Turn auto-updates on or off for the device's primary ECU
    ///
    /// # Errors
    /// See [`set_autoupdates`].
    #[instrument(skip(self))]
    pub async fn device_set_autoupdates(
        &self,
        name: &str,
        enabled: bool,
    ) -> Result<Value, CoreError> {
        let backends = self.backends()?;
        let device = find_device(&backends.registry, name).await?;
        set_autoupdates(&backends, &device, enabled).await
    }

    /// Rename a device
    ///
    /// # Errors
    /// Returns `CoreError::DeviceNotFound` or any backend failure.
    #[instrument(skip(self))]
    pub async fn device_rename(&self, name: &str, new_name: &str) -> Result<Value, CoreError> {
        let backends = self.backends()?;
        let device = find_device(&backends.registry, name).await?;
        rename_device(&backends.registry, &device, new_name).await
    }

    /// Delete a device from the registry
    ///
    /// # Errors
    /// Returns `CoreError::DeviceNotFound` or any backend failure.
    #[instrument(skip(self))]
    pub async fn device_delete(&self, name: &str) -> Result<(), CoreError> {
        let backends = self.backends()?;
        let device = find_device(&backends.registry, name).await?;
        delete_device(&backends.registry, &device).await
    }
}
