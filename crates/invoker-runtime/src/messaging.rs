//! Client of the messaging sidecar.
//!
//! Functions reach output bindings and pub/sub topics through a sidecar
//! process listening on localhost. The runtime owns one handle per process,
//! shares it with every invocation and closes it exactly once at shutdown.

use crate::error::{MessagingError, RuntimeError};
use async_trait::async_trait;
use bytes::Bytes;
use reqwest::header::CONTENT_TYPE;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, info};

/// Presence of either variable means a sidecar runs next to the function
pub const SIDECAR_GRPC_PORT_ENV: &str = "DAPR_GRPC_PORT";
pub const SIDECAR_HTTP_PORT_ENV: &str = "DAPR_HTTP_PORT";

pub const DEFAULT_SIDECAR_HTTP_PORT: u16 = 3500;

const READINESS_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Whether the process runs next to a messaging sidecar
pub fn sidecar_enabled() -> bool {
    std::env::var_os(SIDECAR_GRPC_PORT_ENV).is_some()
        || std::env::var_os(SIDECAR_HTTP_PORT_ENV).is_some()
}

/// Outbound messaging used by functions and by the runtime lifecycle
#[async_trait]
pub trait Messaging: Send + Sync + 'static {
    /// Block until the sidecar reports ready or `timeout` elapses
    async fn wait_ready(&self, timeout: Duration) -> Result<(), RuntimeError>;

    async fn publish(
        &self,
        pubsub_name: &str,
        topic: &str,
        data: Bytes,
        metadata: &HashMap<String, String>,
    ) -> Result<(), MessagingError>;

    /// Invoke an output binding and return its response body
    async fn invoke_binding(
        &self,
        binding_name: &str,
        operation: &str,
        data: Bytes,
        metadata: &HashMap<String, String>,
    ) -> Result<Bytes, MessagingError>;

    async fn close(&self);
}

#[derive(Serialize)]
struct BindingRequest<'a> {
    data: serde_json::Value,
    metadata: &'a HashMap<String, String>,
    operation: &'a str,
}

/// Sidecar client over its HTTP API
pub struct DaprClient {
    client: reqwest::Client,
    base_url: String,
    closed: AtomicBool,
}

impl DaprClient {
    /// Client for the sidecar on localhost, port from `DAPR_HTTP_PORT`
    pub fn from_env() -> Self {
        let port = std::env::var(SIDECAR_HTTP_PORT_ENV)
            .ok()
            .and_then(|port| port.trim().parse::<u16>().ok())
            .unwrap_or(DEFAULT_SIDECAR_HTTP_PORT);

        Self::with_base_url(format!("http://127.0.0.1:{}", port))
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client: reqwest::Client::new(),
            base_url,
            closed: AtomicBool::new(false),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn ensure_open(&self) -> Result<(), MessagingError> {
        if self.closed.load(Ordering::Acquire) {
            Err(MessagingError::Closed)
        } else {
            Ok(())
        }
    }

    async fn is_healthy(&self) -> bool {
        let url = format!("{}/v1.0/healthz/outbound", self.base_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                debug!("Sidecar health check failed: {}", e);
                false
            }
        }
    }

    async fn check(response: reqwest::Response) -> Result<Bytes, MessagingError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.bytes().await?);
        }

        let body = response.text().await.unwrap_or_default();
        Err(MessagingError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

// Binding payloads travel inside a JSON document: JSON data is embedded as is,
// anything else as a string.
fn binding_data(data: &[u8]) -> serde_json::Value {
    match serde_json::from_slice(data) {
        Ok(value) => value,
        Err(_) => serde_json::Value::String(String::from_utf8_lossy(data).into_owned()),
    }
}

fn metadata_query(metadata: &HashMap<String, String>) -> Vec<(String, &str)> {
    metadata
        .iter()
        .map(|(k, v)| (format!("metadata.{}", k), v.as_str()))
        .collect()
}

#[async_trait]
impl Messaging for DaprClient {
    async fn wait_ready(&self, timeout: Duration) -> Result<(), RuntimeError> {
        info!("Waiting for sidecar at {} (timeout {:?})", self.base_url, timeout);

        let poll = async {
            loop {
                if self.is_healthy().await {
                    return;
                }
                tokio::time::sleep(READINESS_POLL_INTERVAL).await;
            }
        };

        tokio::time::timeout(timeout, poll)
            .await
            .map_err(|_| RuntimeError::SidecarTimeout(timeout))?;

        info!("Sidecar is ready");
        Ok(())
    }

    async fn publish(
        &self,
        pubsub_name: &str,
        topic: &str,
        data: Bytes,
        metadata: &HashMap<String, String>,
    ) -> Result<(), MessagingError> {
        self.ensure_open()?;

        let url = format!("{}/v1.0/publish/{}/{}", self.base_url, pubsub_name, topic);
        let content_type = if serde_json::from_slice::<serde_json::Value>(&data).is_ok() {
            "application/json"
        } else {
            "application/octet-stream"
        };

        debug!("Publishing {} bytes to {}/{}", data.len(), pubsub_name, topic);
        let response = self
            .client
            .post(&url)
            .query(&metadata_query(metadata))
            .header(CONTENT_TYPE, content_type)
            .body(data)
            .send()
            .await?;

        Self::check(response).await.map(|_| ())
    }

    async fn invoke_binding(
        &self,
        binding_name: &str,
        operation: &str,
        data: Bytes,
        metadata: &HashMap<String, String>,
    ) -> Result<Bytes, MessagingError> {
        self.ensure_open()?;

        let url = format!("{}/v1.0/bindings/{}", self.base_url, binding_name);
        let request = BindingRequest {
            data: binding_data(&data),
            metadata,
            operation,
        };

        debug!("Invoking binding {} ({})", binding_name, operation);
        let response = self.client.post(&url).json(&request).send().await?;

        Self::check(response).await
    }

    async fn close(&self) {
        if !self.closed.swap(true, Ordering::AcqRel) {
            info!("Closed sidecar client");
        }
    }
}
