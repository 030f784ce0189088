//! Runtime configuration.
//!
//! The configuration is a JSON document handed to the process through the
//! `FUNC_CONTEXT` environment variable. It is parsed once at startup and
//! shared read-only by every invocation.

use crate::error::ConfigurationError;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Environment variable holding the function context document
pub const FUNC_CONTEXT_ENV: &str = "FUNC_CONTEXT";

/// Prefix of component types that belong to the binding family
pub const BINDING_COMPONENT_PREFIX: &str = "bindings";

/// Prefix of component types that belong to the pub/sub family
pub const TOPIC_COMPONENT_PREFIX: &str = "pubsub";

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_SIDECAR_TIMEOUT: Duration = Duration::from_secs(60);

/// Largest request body the HTTP runtime buffers, 2 MiB
pub const DEFAULT_MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

/// Serving mode of the runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RuntimeKind {
    /// Synchronous, HTTP triggered
    #[default]
    #[serde(rename = "Knative", alias = "knative", alias = "sync", alias = "Sync")]
    Knative,
    /// Asynchronous, driven by sidecar callbacks
    #[serde(rename = "Async", alias = "async")]
    Async,
}

/// Family of a component, derived from its type prefix
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentFamily {
    Binding,
    Topic,
}

/// An input or output source managed by the sidecar
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// Namespaced type, e.g. `bindings.kafka` or `pubsub.redis`
    pub component_type: String,
    pub component_name: String,
    /// Topic name for pub/sub components
    #[serde(default)]
    pub uri: String,
    /// Operation used when invoking an output binding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

impl Component {
    pub fn family(&self) -> Option<ComponentFamily> {
        if self.component_type.starts_with(BINDING_COMPONENT_PREFIX) {
            Some(ComponentFamily::Binding)
        } else if self.component_type.starts_with(TOPIC_COMPONENT_PREFIX) {
            Some(ComponentFamily::Topic)
        } else {
            None
        }
    }

    pub fn is_binding(&self) -> bool {
        self.family() == Some(ComponentFamily::Binding)
    }

    pub fn is_topic(&self) -> bool {
        self.family() == Some(ComponentFamily::Topic)
    }
}

/// Immutable configuration snapshot of the runtime
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeConfig {
    #[serde(rename = "name", default)]
    pub function_name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub runtime: RuntimeKind,

    #[serde(default = "default_port", deserialize_with = "deserialize_port")]
    pub port: u16,

    #[serde(default)]
    pub inputs: BTreeMap<String, Component>,

    #[serde(default)]
    pub outputs: BTreeMap<String, Component>,

    /// Upper bound of the sidecar readiness handshake
    #[serde(
        default = "default_sidecar_timeout",
        rename = "sidecarTimeoutSeconds",
        with = "duration_secs"
    )]
    pub sidecar_timeout: Duration,

    /// Requests with a larger body are answered with 413
    #[serde(default = "default_max_body_bytes", rename = "maxRequestBodyBytes")]
    pub max_body_bytes: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            function_name: String::new(),
            version: String::new(),
            runtime: RuntimeKind::default(),
            port: DEFAULT_PORT,
            inputs: BTreeMap::new(),
            outputs: BTreeMap::new(),
            sidecar_timeout: DEFAULT_SIDECAR_TIMEOUT,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl RuntimeConfig {
    /// Parse a function context document
    pub fn from_json(document: &str) -> Result<Self, ConfigurationError> {
        Ok(serde_json::from_str(document)?)
    }

    /// Load the configuration from `FUNC_CONTEXT`, falling back to defaults
    /// when the variable is not set
    pub fn from_env() -> Result<Self, ConfigurationError> {
        match std::env::var(FUNC_CONTEXT_ENV) {
            Ok(document) if !document.trim().is_empty() => Self::from_json(&document),
            _ => Ok(Self::default()),
        }
    }

    /// All binding-family inputs
    pub fn input_bindings(&self) -> impl Iterator<Item = &Component> {
        self.inputs.values().filter(|c| c.is_binding())
    }

    /// All topic-family inputs
    pub fn input_topics(&self) -> impl Iterator<Item = &Component> {
        self.inputs.values().filter(|c| c.is_topic())
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_sidecar_timeout() -> Duration {
    DEFAULT_SIDECAR_TIMEOUT
}

fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

// The port shows up both as a number and as a string in function contexts.
fn deserialize_port<'de, D>(deserializer: D) -> Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Port {
        Number(u16),
        Text(String),
    }

    match Port::deserialize(deserializer)? {
        Port::Number(port) => Ok(port),
        Port::Text(text) if text.trim().is_empty() => Ok(DEFAULT_PORT),
        Port::Text(text) => text.trim().parse().map_err(serde::de::Error::custom),
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_secs(u64::deserialize(deserializer)?))
    }
}
