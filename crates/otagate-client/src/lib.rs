//! otagate-client: HTTP client for the OTA backends
//!
//! Every call carries the tenant namespace header and checks the status code
//! expected for its verb (`201` for POST, `200` otherwise). Unexpected
//! statuses surface as [`BackendError::Status`] with the backend's own status
//! and error body, annotated with the resource that failed.
//!
//! # Example
//!
//! ```no_run
//! use otagate_client::{BackendClient, RequestConfig};
//! use serde_json::Value;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let repo = BackendClient::new("http://tuf-reposerver", "default", RequestConfig::default())?;
//! let targets: Value = repo.get("/api/v1/user_repo/targets.json").await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod config;
pub mod error;

pub use backend::{BackendClient, NAMESPACE_HEADER, SOURCE_KEY};
pub use config::RequestConfig;
pub use error::{BackendError, Result};
