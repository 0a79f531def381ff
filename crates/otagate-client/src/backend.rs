//! JSON client for one backend service (director, registry or repository)

use reqwest::{Client, Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::RequestConfig;
use crate::error::{BackendError, Result};

/// Header carrying the tenant namespace on every backend call
pub const NAMESPACE_HEADER: &str = "x-ats-namespace";

/// Key added to backend error bodies naming the resource that failed
pub const SOURCE_KEY: &str = "ota-source";

/// HTTP client bound to one backend and one tenant namespace
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    namespace: String,
    config: RequestConfig,
}

impl BackendClient {
    /// Create a new backend client
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot be built.
    ///
    /// # Example
    /// ```no_run
    /// use otagate_client::{BackendClient, RequestConfig};
    ///
    /// let director = BackendClient::new("http://director", "default", RequestConfig::default())?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn new(
        base_url: impl AsRef<str>,
        namespace: impl Into<String>,
        config: RequestConfig,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|source| BackendError::Transport {
                url: base_url.as_ref().to_string(),
                source,
            })?;
        Self::with_client(base_url, namespace, config, client)
    }

    /// Create a new backend client with custom `reqwest::Client`
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid.
    pub fn with_client(
        base_url: impl AsRef<str>,
        namespace: impl Into<String>,
        config: RequestConfig,
        client: Client,
    ) -> Result<Self> {
        let base_url = Url::parse(base_url.as_ref())?;
        Ok(Self {
            client,
            base_url: base_url.as_str().trim_end_matches('/').to_string(),
            namespace: namespace.into(),
            config,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Resources are appended to the base URL verbatim so path prefixes survive
    fn url(&self, resource: &str) -> Result<Url> {
        Ok(Url::parse(&format!("{}{resource}", self.base_url))?)
    }

    /// GET a resource, expecting `200 OK`
    ///
    /// # Errors
    /// Returns an error if the call fails or the body does not decode into `T`.
    pub async fn get<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.get_with(resource, &[]).await
    }

    /// GET a resource with query parameters, expecting `200 OK`
    ///
    /// # Errors
    /// Returns an error if the call fails or the body does not decode into `T`.
    pub async fn get_with<T: DeserializeOwned>(
        &self,
        resource: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        self.call(Method::GET, resource, query, None::<&()>).await
    }

    /// POST a JSON body, expecting `201 Created`
    ///
    /// # Errors
    /// Returns an error if the call fails or the body does not decode into `T`.
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        self.call(Method::POST, resource, &[], Some(body)).await
    }

    /// PUT without a body, expecting `200 OK`
    ///
    /// # Errors
    /// Returns an error if the call fails or the body does not decode into `T`.
    pub async fn put<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.call(Method::PUT, resource, &[], None::<&()>).await
    }

    /// PUT a JSON body, expecting `200 OK`
    ///
    /// # Errors
    /// Returns an error if the call fails or the body does not decode into `T`.
    pub async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        resource: &str,
        body: &B,
    ) -> Result<T> {
        self.call(Method::PUT, resource, &[], Some(body)).await
    }

    /// DELETE a resource, expecting `200 OK`
    ///
    /// # Errors
    /// Returns an error if the call fails or the body does not decode into `T`.
    pub async fn delete<T: DeserializeOwned>(&self, resource: &str) -> Result<T> {
        self.call(Method::DELETE, resource, &[], None::<&()>).await
    }

    #[instrument(
        level = "debug",
        skip(self, query, body),
        fields(backend = %self.base_url),
        err(level = "debug")
    )]
    async fn call<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        method: Method,
        resource: &str,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<T> {
        let url = self.url(resource)?;
        let mut attempt = 0;
        let mut backoff = self.config.initial_backoff();

        let text = loop {
            match self.send(&method, &url, query, body).await {
                Err(err) if self.should_retry(&method, &err, attempt) => {
                    attempt += 1;
                    warn!(
                        %url,
                        attempt,
                        error = %err,
                        "backend call failed, retrying in {backoff:?}"
                    );
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(self.config.max_backoff());
                }
                result => break result?,
            }
        };

        decode(&text).map_err(|source| BackendError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Campaign creation is not idempotent, so POST is never repeated
    fn should_retry(&self, method: &Method, err: &BackendError, attempt: u32) -> bool {
        *method != Method::POST && attempt < self.config.max_retries && err.is_retryable()
    }

    async fn send<B: Serialize + ?Sized>(
        &self,
        method: &Method,
        url: &Url,
        query: &[(&str, String)],
        body: Option<&B>,
    ) -> Result<String> {
        let transport = |source| BackendError::Transport {
            url: url.to_string(),
            source,
        };

        let mut request = self
            .client
            .request(method.clone(), url.clone())
            .header(NAMESPACE_HEADER, &self.namespace);
        if !query.is_empty() {
            request = request.query(query);
        }
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        let text = response.text().await.map_err(transport)?;

        if status != expected_status(method) {
            return Err(BackendError::Status {
                status: status.as_u16(),
                url: url.to_string(),
                body: error_body(&text, url.as_str()),
            });
        }

        debug!(%status, "backend call succeeded");
        Ok(text)
    }
}

/// Decode straight from the body text so ordered maps see document order;
/// an empty body decodes as `null`
fn decode<T: DeserializeOwned>(text: &str) -> serde_json::Result<T> {
    if text.trim().is_empty() {
        serde_json::from_value(Value::Null)
    } else {
        serde_json::from_str(text)
    }
}

fn expected_status(method: &Method) -> StatusCode {
    if *method == Method::POST {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

/// Keep the backend's JSON error object when there is one, otherwise wrap the raw text
fn error_body(text: &str, url: &str) -> Value {
    let mut body = match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => map,
        _ => {
            let mut map = Map::new();
            map.insert("text".to_string(), Value::String(text.to_string()));
            map
        }
    };
    body.insert(SOURCE_KEY.to_string(), Value::String(url.to_string()));
    Value::Object(body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use serde_json::json;

    fn test_config() -> RequestConfig {
        RequestConfig {
            timeout_secs: 5,
            max_retries: 2,
            initial_backoff_ms: 1,
            max_backoff_ms: 5,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = BackendClient::new("http://director", "default", test_config());
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_url() {
        let client = BackendClient::new("not a url", "default", test_config());
        assert!(client.is_err());
    }

    #[test]
    fn test_url_keeps_path_prefix() {
        let client =
            BackendClient::new("http://gateway/director/", "default", test_config()).unwrap();
        let url = client.url("/api/v1/admin/devices/u1").unwrap();
        assert_eq!(url.as_str(), "http://gateway/director/api/v1/admin/devices/u1");
    }

    #[test]
    fn test_error_body_falls_back_to_text() {
        let body = error_body("gateway exploded", "http://director/x");
        assert_eq!(
            body,
            json!({ "text": "gateway exploded", "ota-source": "http://director/x" })
        );
    }

    #[tokio::test]
    async fn test_get_sends_namespace_header() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/devices")
            .match_header(NAMESPACE_HEADER, "tenant-a")
            .match_query(Matcher::UrlEncoded("deviceId".into(), "rpi3".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"[{"uuid": "u1"}]"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "tenant-a", test_config()).unwrap();
        let devices: Value = client
            .get_with("/api/v1/devices", &[("deviceId", "rpi3".to_string())])
            .await
            .unwrap();

        assert_eq!(devices, json!([{ "uuid": "u1" }]));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_expects_created() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/multi_target_updates")
            .match_body(Matcher::PartialJson(json!({ "targets": {} })))
            .with_status(200)
            .with_body(r#""upd-1""#)
            .expect(1)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "default", test_config()).unwrap();
        let err = client
            .post::<Value, _>("/api/v1/multi_target_updates", &json!({ "targets": {} }))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(200));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_error_preserves_status_and_body() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/admin/devices/u1")
            .with_status(409)
            .with_header("content-type", "application/json")
            .with_body(r#"{"code": "conflict", "description": "busy"}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "default", test_config()).unwrap();
        let err = client
            .get::<Value>("/api/v1/admin/devices/u1")
            .await
            .unwrap_err();

        match err {
            BackendError::Status { status, body, .. } => {
                assert_eq!(status, 409);
                assert_eq!(body["code"], "conflict");
                assert_eq!(
                    body[SOURCE_KEY],
                    format!("{}/api/v1/admin/devices/u1", server.url())
                );
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_errors_are_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/user_repo/targets.json")
            .with_status(503)
            .with_body("unavailable")
            .expect(3)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "default", test_config()).unwrap();
        let err = client
            .get::<Value>("/api/v1/user_repo/targets.json")
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(503));
        assert!(err.is_retryable());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api/v1/devices/u1/system_info/network")
            .with_status(404)
            .expect(1)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "default", test_config()).unwrap();
        let err = client
            .get::<Value>("/api/v1/devices/u1/system_info/network")
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_post_is_never_retried() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/api/v1/multi_target_updates")
            .with_status(500)
            .expect(1)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "default", test_config()).unwrap();
        let err = client
            .post::<Value, _>("/api/v1/multi_target_updates", &json!({}))
            .await
            .unwrap_err();

        assert_eq!(err.status(), Some(500));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_objects_decode_in_document_order() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/v1/user_repo/targets.json")
            .with_status(200)
            .with_body(r#"{"zeta": 1, "mu": 2, "alpha": 3}"#)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "default", test_config()).unwrap();
        let targets: indexmap::IndexMap<String, u32> = client
            .get("/api/v1/user_repo/targets.json")
            .await
            .unwrap();

        let names: Vec<&str> = targets.keys().map(String::as_str).collect();
        assert_eq!(names, ["zeta", "mu", "alpha"]);
    }

    #[tokio::test]
    async fn test_empty_body_decodes_as_null() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("DELETE", "/api/v1/devices/u1")
            .with_status(200)
            .create_async()
            .await;

        let client = BackendClient::new(server.url(), "default", test_config()).unwrap();
        let value: Value = client.delete("/api/v1/devices/u1").await.unwrap();
        assert_eq!(value, Value::Null);
    }
}
