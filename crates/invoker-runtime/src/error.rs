//! Error types of the invoker runtime.
//!
//! Errors fall in two groups. [`RuntimeError`] is fatal: it aborts startup and
//! prevents a runtime from serving. [`InvokeError`] is scoped to a single
//! invocation and distinguishes a function that reported a failure
//! ([`FunctionError`]) from one that broke ([`HandlerFault`]).

use std::any::Any;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// A specialized Result type for runtime setup and lifecycle operations
pub type Result<T> = std::result::Result<T, RuntimeError>;

/// Result type returned by function handlers and plugin hooks
pub type InvokeResult<T = ()> = std::result::Result<T, InvokeError>;

/// Fatal errors raised while building or starting a runtime
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// The runtime configuration or the registered functions are unusable
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// A function constructor failed or panicked
    #[error("Could not construct an instance of '{id}': {source}")]
    Construction { id: String, source: HandlerFault },

    /// The messaging sidecar did not become ready in time
    #[error("Sidecar was not ready within {0:?}")]
    SidecarTimeout(Duration),

    /// gRPC transport error
    #[error("Transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    /// I/O error, typically while binding a listener
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error from the messaging handle
    #[error("Messaging error: {0}")]
    Messaging(#[from] MessagingError),
}

/// Reasons a configuration is rejected at startup
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// A function cannot be served by the selected runtime or is unknown
    #[error("Unsupported function '{id}': {reason}")]
    UnsupportedHandler { id: String, reason: String },

    /// The same function identifier was registered twice
    #[error("Function '{0}' is registered more than once")]
    DuplicateFunction(String),

    /// The asynchronous runtime was started without input components
    #[error("No inputs defined for the function")]
    NoInputs,

    /// Two functions declare the same route
    #[error("Functions '{first}' and '{second}' both claim path '{path}'")]
    RouteConflict {
        path: String,
        first: String,
        second: String,
    },

    /// A declared route is not a valid path pattern
    #[error("Invalid route '{0}': expected '/exact', '/prefix/*' or '/*'")]
    InvalidRoute(String),

    /// The function context document could not be parsed
    #[error("Invalid function context: {0}")]
    InvalidContext(#[from] serde_json::Error),
}

/// Errors of the messaging sidecar client
#[derive(Debug, Error)]
pub enum MessagingError {
    /// No messaging handle is configured for this process
    #[error("Messaging sidecar is not available")]
    Unavailable,

    /// The requested output is not part of the configuration
    #[error("Unknown output '{0}'")]
    UnknownOutput(String),

    /// The output component belongs to no supported family
    #[error("Output '{name}' has unsupported component type '{component_type}'")]
    UnsupportedComponent {
        name: String,
        component_type: String,
    },

    /// The messaging handle was already closed
    #[error("Messaging handle is closed")]
    Closed,

    /// HTTP error while talking to the sidecar
    #[error("Sidecar request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The sidecar answered with a non-success status
    #[error("Sidecar responded with status {status}: {body}")]
    Status { status: u16, body: String },
}

/// A failure the function reported on purpose.
///
/// Recorded in the output envelope and mapped to status 500. It is an
/// expected outcome, so it is never logged as a system fault.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct FunctionError {
    message: String,
}

impl FunctionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// An unexpected failure of handler or plugin code
#[derive(Debug, Error)]
#[error(transparent)]
pub struct HandlerFault(#[from] anyhow::Error);

impl HandlerFault {
    pub fn msg<M>(message: M) -> Self
    where
        M: fmt::Display + fmt::Debug + Send + Sync + 'static,
    {
        Self(anyhow::Error::msg(message))
    }

    /// Build a fault out of a caught panic payload
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            String::from("unknown panic payload")
        };

        Self::msg(format!("panicked: {}", message))
    }
}

/// Error returned by function handlers and plugin hooks
#[derive(Debug, Error)]
pub enum InvokeError {
    /// Expected, non-exceptional failure
    #[error("Function error: {0}")]
    Functional(#[from] FunctionError),

    /// Unexpected failure
    #[error("Handler fault: {0}")]
    Fault(#[from] HandlerFault),
}

impl InvokeError {
    /// Shorthand for a functional failure
    pub fn functional(message: impl Into<String>) -> Self {
        InvokeError::Functional(FunctionError::new(message))
    }

    pub fn is_fault(&self) -> bool {
        matches!(self, InvokeError::Fault(_))
    }
}

impl From<anyhow::Error> for InvokeError {
    fn from(err: anyhow::Error) -> Self {
        InvokeError::Fault(HandlerFault(err))
    }
}

impl From<MessagingError> for InvokeError {
    fn from(err: MessagingError) -> Self {
        InvokeError::Fault(HandlerFault(err.into()))
    }
}
