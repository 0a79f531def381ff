//! Device management API endpoints

use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use otagate_api::Target;
use otagate_api::requests::{
    ApplyUpdateRequest, ListDevicesQuery, PackagesQuery, PatchDeviceRequest,
};
use otagate_api::responses::{DeviceDetail, DeviceSummary, ErrorMessage, UpdateApplied};
use serde_json::Value;

use crate::api::error::AppError;
use crate::auth::{MAX_DEVICES_HEADER, authorize};
use crate::state::AppState;

/// List all devices with their derived status and current image
///
/// # Errors
/// Returns `AppError` if the caller is not authorized or a backend fails
#[utoipa::path(
    get,
    path = "/devices/",
    tag = "devices",
    params(("regex" = Option<String>, Query, description = "Registry-side filter on device names")),
    responses(
        (status = 200, description = "All matching devices", body = Vec<DeviceSummary>),
        (status = 401, description = "Missing or unknown OTA-TOKEN", body = ErrorMessage),
    )
)]
pub async fn list_devices(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<ListDevicesQuery>,
) -> Result<Response, AppError> {
    let principal = authorize(&headers, &state.config.auth)?;
    let devices = state
        .service
        .list_devices(query.regex)?
        .collect_all()
        .await?;

    let mut response = Json(devices).into_response();
    if let Some(max) = principal.max_devices() {
        response
            .headers_mut()
            .insert(MAX_DEVICES_HEADER, HeaderValue::from(max));
    }
    Ok(response)
}

/// Get details for a specific device
///
/// # Errors
/// Returns `AppError` if the device is unknown or a backend fails
#[utoipa::path(
    get,
    path = "/devices/{name}/",
    tag = "devices",
    params(("name" = String, Path, description = "Device name")),
    responses(
        (status = 200, description = "Enriched device", body = DeviceDetail),
        (status = 404, description = "Unknown device", body = ErrorMessage),
    )
)]
pub async fn get_device(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<DeviceDetail>, AppError> {
    authorize(&headers, &state.config.auth)?;
    Ok(Json(state.service.device(&name).await?))
}

/// Installed packages, passed through from the registry
///
/// # Errors
/// Returns `AppError` if the device is unknown or the registry fails
#[utoipa::path(
    get,
    path = "/devices/{name}/packages/",
    tag = "devices",
    params(
        ("name" = String, Path, description = "Device name"),
        ("offset" = Option<u64>, Query, description = "First package, default 0"),
        ("limit" = Option<u64>, Query, description = "Page size, default 50"),
    ),
    responses(
        (status = 200, description = "Registry package page", body = Value),
        (status = 404, description = "Unknown device", body = ErrorMessage),
    )
)]
pub async fn device_packages(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    Query(query): Query<PackagesQuery>,
) -> Result<Json<Value>, AppError> {
    authorize(&headers, &state.config.auth)?;
    let page = state
        .service
        .device_packages(&name, query.offset, query.limit)
        .await?;
    Ok(Json(page))
}

/// Targets the device can install, newest first
///
/// # Errors
/// Returns `AppError` if the device is unknown or a backend fails
#[utoipa::path(
    get,
    path = "/devices/{name}/updates/",
    tag = "devices",
    params(("name" = String, Path, description = "Device name")),
    responses(
        (status = 200, description = "Update feed, installed target marked active", body = Vec<Target>),
        (status = 404, description = "Unknown device", body = ErrorMessage),
    )
)]
pub async fn device_updates(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Vec<Target>>, AppError> {
    authorize(&headers, &state.config.auth)?;
    Ok(Json(state.service.device_updates(&name).await?))
}

/// Dispatch the target with the given hash to the device
///
/// # Errors
/// Returns `AppError` for a body without `image.hash`, an unknown device or
/// hash, or a backend failure
#[utoipa::path(
    put,
    path = "/devices/{name}/",
    tag = "devices",
    params(("name" = String, Path, description = "Device name")),
    request_body = ApplyUpdateRequest,
    responses(
        (status = 200, description = "Campaign created and bound", body = UpdateApplied),
        (status = 400, description = "Missing image hash", body = ErrorMessage),
        (status = 404, description = "Unknown device or hash", body = ErrorMessage),
        (status = 412, description = "Device has no installed image", body = ErrorMessage),
    )
)]
pub async fn update_device(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UpdateApplied>, AppError> {
    authorize(&headers, &state.config.auth)?;
    let request: ApplyUpdateRequest = serde_json::from_slice(&body).unwrap_or_default();

    let image = request
        .image
        .ok_or_else(|| AppError::validation(r#"Missing required field: "image""#))?;
    let hash = image
        .hash
        .ok_or_else(|| AppError::validation(r#"Missing required field: "image[hash]""#))?;

    Ok(Json(state.service.device_update(&name, &hash).await?))
}

/// Toggle auto-updates or rename the device
///
/// # Errors
/// Returns `AppError` for a body with neither `auto-updates` nor `name`, an
/// unknown device, or a backend failure
#[utoipa::path(
    patch,
    path = "/devices/{name}/",
    tag = "devices",
    params(("name" = String, Path, description = "Device name")),
    request_body = PatchDeviceRequest,
    responses(
        (status = 200, description = "Backend response", body = Value),
        (status = 400, description = "Nothing to change", body = ErrorMessage),
        (status = 404, description = "Unknown device or no target to subscribe to", body = ErrorMessage),
    )
)]
pub async fn patch_device(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    authorize(&headers, &state.config.auth)?;
    let request: PatchDeviceRequest = serde_json::from_slice(&body).unwrap_or_default();

    let value = match request {
        PatchDeviceRequest {
            auto_updates: Some(enabled),
            ..
        } => state.service.device_set_autoupdates(&name, enabled).await?,
        PatchDeviceRequest {
            name: Some(new_name),
            ..
        } => state.service.device_rename(&name, &new_name).await?,
        _ => {
            return Err(AppError::validation(
                r#"Input must include "auto-updates" attribute"#,
            ));
        }
    };
    Ok(Json(value))
}

/// Remove the device from the registry
///
/// # Errors
/// Returns `AppError` if the device is unknown or the registry fails
#[utoipa::path(
    delete,
    path = "/devices/{name}/",
    tag = "devices",
    params(("name" = String, Path, description = "Device name")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "Unknown device", body = ErrorMessage),
    )
)]
pub async fn delete_device(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, AppError> {
    authorize(&headers, &state.config.auth)?;
    state.service.device_delete(&name).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use axum::{Router, body::Body, http::Request};
    use mockito::{Matcher, Server, ServerGuard};
    use otagate_core::{BackendsConfig, RequestConfig};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::{AuthConfig, Config};
    use crate::router::create_router;
    use crate::state::AppState;

    use super::*;

    struct Setup {
        router: Router,
        registry: ServerGuard,
        director: ServerGuard,
        repo: ServerGuard,
    }

    async fn setup() -> Setup {
        let director = Server::new_async().await;
        let registry = Server::new_async().await;
        let repo = Server::new_async().await;

        let config = Config {
            backends: BackendsConfig {
                director_url: director.url(),
                registry_url: registry.url(),
                repository_url: repo.url(),
                request: RequestConfig {
                    max_retries: 0,
                    ..RequestConfig::default()
                },
                ..BackendsConfig::default()
            },
            auth: AuthConfig {
                tokens: vec!["foo".to_string()],
                max_devices: 10,
            },
            ..Config::default()
        };

        Setup {
            router: create_router(Arc::new(AppState::new(config))),
            registry,
            director,
            repo,
        }
    }

    async fn call(
        router: &Router,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, HeaderMap, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(t) = token {
            builder = builder.header("OTA-TOKEN", t);
        }
        if body.is_some() {
            builder = builder.header("content-type", "application/json");
        }
        let body = match body {
            Some(v) => Body::from(serde_json::to_string(&v).unwrap()),
            None => Body::empty(),
        };
        let resp = router.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let bytes = axum::body::to_bytes(resp.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, headers, json)
    }

    async fn mock_lookup(registry: &mut ServerGuard, name: &str, status: &str) -> mockito::Mock {
        registry
            .mock("GET", "/api/v1/devices")
            .match_query(Matcher::UrlEncoded("deviceId".into(), name.into()))
            .with_status(200)
            .with_body(
                json!([{
                    "uuid": "u1",
                    "deviceName": name,
                    "deviceId": name,
                    "deviceStatus": status
                }])
                .to_string(),
            )
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_missing_token_rejected() {
        let s = setup().await;
        let (status, _, body) = call(&s.router, "GET", "/devices/", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Authorization required");
    }

    #[tokio::test]
    async fn test_list_sets_max_devices() {
        let mut s = setup().await;
        let _page = s
            .registry
            .mock("GET", "/api/v1/devices")
            .match_query(Matcher::UrlEncoded("offset".into(), "0".into()))
            .with_status(200)
            .with_body(
                json!({
                    "values": [{ "uuid": "u1", "deviceName": "rpi3", "deviceStatus": "NotSeen" }],
                    "total": 1
                })
                .to_string(),
            )
            .create_async()
            .await;

        let (status, headers, body) = call(&s.router, "GET", "/devices/", Some("foo"), None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[MAX_DEVICES_HEADER], "10");
        assert_eq!(body[0]["deviceName"], "rpi3");
        assert_eq!(body[0]["deviceStatus"], "NotSeen");
        assert!(body[0]["deviceImage"].is_null());
    }

    #[tokio::test]
    async fn test_update_requires_image() {
        let mut s = setup().await;
        let director = s
            .director
            .mock("POST", Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let (status, _, body) = call(&s.router, "PUT", "/devices/rpi3/", Some("foo"), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], r#"Missing required field: "image""#);

        let (status, _, body) = call(
            &s.router,
            "PUT",
            "/devices/rpi3/",
            Some("foo"),
            Some(json!({ "image": {} })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], r#"Missing required field: "image[hash]""#);

        director.assert_async().await;
    }

    #[tokio::test]
    async fn test_patch_requires_attribute() {
        let s = setup().await;
        let (status, _, body) = call(
            &s.router,
            "PATCH",
            "/devices/rpi3/",
            Some("foo"),
            Some(json!({ "color": "blue" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], r#"Input must include "auto-updates" attribute"#);
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let mut s = setup().await;
        let _lookup = s
            .registry
            .mock("GET", "/api/v1/devices")
            .match_query(Matcher::UrlEncoded("deviceId".into(), "ghost".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let (status, _, body) = call(&s.router, "GET", "/devices/ghost/", Some("foo"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Device(ghost) does not exist");
    }

    #[tokio::test]
    async fn test_backend_error_is_replayed() {
        let mut s = setup().await;
        let _lookup = mock_lookup(&mut s.registry, "rpi3", "UpToDate").await;
        let _catalog = s
            .repo
            .mock("GET", "/api/v1/user_repo/targets.json")
            .with_status(403)
            .with_body(r#"{"code": "forbidden"}"#)
            .create_async()
            .await;
        let _ecus = s
            .director
            .mock("GET", "/api/v1/admin/devices/u1")
            .with_status(200)
            .with_body(
                json!([{
                    "id": "ecu-1", "hardwareId": "hw1", "primary": true,
                    "image": { "filepath": "lmp", "size": 1, "hash": { "sha256": "h1" } }
                }])
                .to_string(),
            )
            .create_async()
            .await;

        let (status, _, body) =
            call(&s.router, "GET", "/devices/rpi3/updates/", Some("foo"), None).await;

        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["code"], "forbidden");
        assert!(
            body["ota-source"]
                .as_str()
                .unwrap()
                .ends_with("/api/v1/user_repo/targets.json")
        );
    }

    #[tokio::test]
    async fn test_disable_autoupdates() {
        let mut s = setup().await;
        let _lookup = mock_lookup(&mut s.registry, "rpi3", "UpToDate").await;
        let _ecus = s
            .director
            .mock("GET", "/api/v1/admin/devices/u1")
            .with_status(200)
            .with_body(
                json!([{
                    "id": "ecu-1", "hardwareId": "hw1", "primary": true,
                    "image": { "filepath": "lmp", "size": 1, "hash": { "sha256": "h1" } }
                }])
                .to_string(),
            )
            .create_async()
            .await;
        let unsubscribe = s
            .director
            .mock("DELETE", "/api/v1/admin/devices/u1/ecus/ecu-1/auto_update")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let (status, _, _) = call(
            &s.router,
            "PATCH",
            "/devices/rpi3/",
            Some("foo"),
            Some(json!({ "auto-updates": false })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        unsubscribe.assert_async().await;
    }

    #[tokio::test]
    async fn test_delete_device() {
        let mut s = setup().await;
        let _lookup = mock_lookup(&mut s.registry, "rpi3", "NotSeen").await;
        let delete = s
            .registry
            .mock("DELETE", "/api/v1/devices/u1")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;

        let (status, _, _) = call(&s.router, "DELETE", "/devices/rpi3/", Some("foo"), None).await;

        assert_eq!(status, StatusCode::NO_CONTENT);
        delete.assert_async().await;
    }

    #[tokio::test]
    async fn test_health_needs_no_token() {
        let s = setup().await;
        let (status, _, body) = call(&s.router, "GET", "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }
}
