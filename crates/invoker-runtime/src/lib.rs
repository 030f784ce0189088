//! Function Invoker Runtime
//!
//! This crate hosts user functions behind one of two transports. The
//! synchronous runtime serves them over plain HTTP, routing each request to a
//! function by path. The asynchronous runtime is driven by a messaging sidecar
//! that delivers input binding and pub/sub events through gRPC callbacks.
//!
//! Both runtimes run the same pipeline for every invocation: a fresh
//! [`Context`], the pre hooks of the [`PluginChain`], the function, the post
//! hooks and finally [`Output`] defaulting.
//!
//! # Example
//!
//! ```rust,no_run
//! use invoker_runtime::{async_trait, Bytes, Catalog, Context, InvokeResult, Invoker, OpenFunction, Output, PluginChain};
//!
//! #[derive(Default)]
//! struct Echo;
//!
//! #[async_trait]
//! impl OpenFunction for Echo {
//!     async fn accept(&self, _ctx: &mut Context, payload: Bytes) -> InvokeResult<Output> {
//!         Ok(Output::new().with_data(payload))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut catalog = Catalog::new();
//!     catalog.open::<Echo>("echo");
//!
//!     // FUNC_CONTEXT selects the runtime, FUNCTION_TARGET the functions
//!     Invoker::from_env(&catalog, PluginChain::empty())?.run().await?;
//!     Ok(())
//! }
//! ```

mod cloudevent;
mod config;
mod context;
mod error;
mod event;
mod function;
mod invoker;
mod messaging;
mod output;
mod plugin;
mod registry;
mod runtime;

pub use cloudevent::{EventParseError, StructuredEvent};
pub use config::{
    BINDING_COMPONENT_PREFIX, Component, ComponentFamily, DEFAULT_MAX_BODY_BYTES, DEFAULT_PORT,
    DEFAULT_SIDECAR_TIMEOUT, FUNC_CONTEXT_ENV, RuntimeConfig, RuntimeKind, TOPIC_COMPONENT_PREFIX,
};
pub use context::{Context, DEFAULT_BINDING_OPERATION};
pub use error::{
    ConfigurationError, FunctionError, HandlerFault, InvokeError, InvokeResult, MessagingError,
    Result, RuntimeError,
};
pub use event::{BindingEvent, Event, HttpExchange, HttpRequest, HttpResponse, TopicEvent};
pub use function::{CATCH_ALL_PATH, EventFunction, HttpFunction, OpenFunction, Route};
pub use invoker::{FUNCTION_TARGET_ENV, Invoker, parse_targets};
pub use messaging::{DaprClient, Messaging, sidecar_enabled};
pub use output::{DEFAULT_OUTPUT_DATA, Output};
pub use plugin::{Plugin, PluginChain};
pub use registry::{Catalog, Function, FunctionKind, FunctionRegistry, Registration};
pub use runtime::{AsyncRuntime, CallbackService, Runtime, SyncRuntime};

// Re-export commonly used types of the handler traits
pub use async_trait::async_trait;
pub use bytes::Bytes;
