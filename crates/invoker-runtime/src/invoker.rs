use crate::config::{RuntimeConfig, RuntimeKind};
use crate::error::Result;
use crate::messaging::Messaging;
use crate::plugin::PluginChain;
use crate::registry::{Catalog, FunctionRegistry};
use crate::runtime::{AsyncRuntime, Runtime, SyncRuntime};
use std::sync::Arc;
#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Environment variable listing the catalog entries to serve, comma separated
pub const FUNCTION_TARGET_ENV: &str = "FUNCTION_TARGET";

/// Split a comma separated target list, dropping empty entries
pub fn parse_targets(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|target| !target.is_empty())
        .map(String::from)
        .collect()
}

/// Entry point of a function process.
///
/// Builds the registry out of a catalog, picks the runtime selected by the
/// configuration and serves until Ctrl-C.
pub struct Invoker {
    config: Arc<RuntimeConfig>,
    runtime: Box<dyn Runtime>,
    shutdown_token: CancellationToken,
}

impl Invoker {
    pub fn new(
        config: RuntimeConfig,
        catalog: &Catalog,
        targets: &[String],
        plugins: PluginChain,
    ) -> Result<Self> {
        Self::build(config, catalog, targets, plugins, None)
    }

    /// Like [`Invoker::new`], with an explicit messaging handle
    pub fn with_messaging(
        config: RuntimeConfig,
        catalog: &Catalog,
        targets: &[String],
        plugins: PluginChain,
        messaging: Arc<dyn Messaging>,
    ) -> Result<Self> {
        Self::build(config, catalog, targets, plugins, Some(messaging))
    }

    /// Configuration from `FUNC_CONTEXT`, targets from `FUNCTION_TARGET`
    pub fn from_env(catalog: &Catalog, plugins: PluginChain) -> Result<Self> {
        let config = RuntimeConfig::from_env()?;
        let targets = std::env::var(FUNCTION_TARGET_ENV)
            .map(|value| parse_targets(&value))
            .unwrap_or_default();

        Self::new(config, catalog, &targets, plugins)
    }

    fn build(
        config: RuntimeConfig,
        catalog: &Catalog,
        targets: &[String],
        plugins: PluginChain,
        messaging: Option<Arc<dyn Messaging>>,
    ) -> Result<Self> {
        let config = Arc::new(config);
        let registry = FunctionRegistry::build(catalog, targets)?;

        info!(
            "Building {:?} runtime for function {} with {} functions and {} plugins",
            config.runtime,
            config.function_name,
            registry.len(),
            plugins.len()
        );

        let runtime: Box<dyn Runtime> = match config.runtime {
            RuntimeKind::Knative => {
                let runtime = SyncRuntime::new(config.clone(), registry, plugins)?;
                match messaging {
                    Some(messaging) => Box::new(runtime.with_messaging(messaging)),
                    None => Box::new(runtime),
                }
            }
            RuntimeKind::Async => {
                let runtime = AsyncRuntime::new(config.clone(), registry, plugins)?;
                match messaging {
                    Some(messaging) => Box::new(runtime.with_messaging(messaging)),
                    None => Box::new(runtime),
                }
            }
        };

        Ok(Self {
            config,
            runtime,
            shutdown_token: CancellationToken::new(),
        })
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    /// Token that stops the invoker when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown_token.clone()
    }

    /// Serve until Ctrl-C, SIGTERM or until the shutdown token is cancelled
    pub async fn run(self) -> Result<()> {
        info!("Starting function invoker: {}", self.config.function_name);

        self.handle_shutdown_signals()?;
        let result = self.runtime.start(self.shutdown_token.clone()).await;
        self.runtime.close().await;

        if let Err(e) = &result {
            error!("Function invoker stopped with error: {}", e);
        } else {
            info!("Function invoker stopped");
        }
        result
    }

    // Setup Ctrl-C and SIGTERM handlers. SIGTERM is registered before
    // returning so the default disposition never kills the process.
    fn handle_shutdown_signals(&self) -> Result<()> {
        let shutdown_token = self.shutdown_token.clone();

        #[cfg(unix)]
        let mut terminate = signal(SignalKind::terminate())?;

        tokio::spawn(async move {
            let ctrl_c = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to listen for Ctrl-C signal: {}", e);
                    std::future::pending::<()>().await;
                }
            };

            #[cfg(unix)]
            let terminated = async move {
                terminate.recv().await;
            };
            #[cfg(not(unix))]
            let terminated = std::future::pending::<()>();

            tokio::select! {
                _ = ctrl_c => {
                    info!("Received Ctrl-C signal, initiating graceful shutdown");
                }
                _ = terminated => {
                    info!("Received SIGTERM, initiating graceful shutdown");
                }
            }
            shutdown_token.cancel();
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Context;
    use crate::error::{ConfigurationError, InvokeResult, RuntimeError};
    use crate::event::{HttpRequest, HttpResponse};
    use crate::function::{HttpFunction, OpenFunction};
    use crate::output::Output;
    use async_trait::async_trait;
    use bytes::Bytes;

    #[derive(Default)]
    struct Page;

    #[async_trait]
    impl HttpFunction for Page {
        async fn service(&self, _req: &HttpRequest, res: &mut HttpResponse) -> InvokeResult {
            res.write("page");
            Ok(())
        }
    }

    #[derive(Default)]
    struct Echo;

    #[async_trait]
    impl OpenFunction for Echo {
        async fn accept(&self, _ctx: &mut Context, payload: Bytes) -> InvokeResult<Output> {
            Ok(Output::new().with_data(payload))
        }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::new();
        catalog.http::<Page>("page").open::<Echo>("echo");
        catalog
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(parse_targets("a, b,,c "), vec!["a", "b", "c"]);
        assert!(parse_targets(" ").is_empty());
    }

    #[test]
    fn test_async_mode_rejects_http_functions() {
        let config = RuntimeConfig {
            runtime: RuntimeKind::Async,
            ..Default::default()
        };

        let err = Invoker::new(config, &catalog(), &[], PluginChain::empty())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RuntimeError::Configuration(ConfigurationError::UnsupportedHandler { ref id, .. }) if id == "page"
        ));

        let config = RuntimeConfig {
            runtime: RuntimeKind::Async,
            ..Default::default()
        };
        assert!(Invoker::new(config, &catalog(), &["echo".to_string()], PluginChain::empty()).is_ok());
    }

    #[test]
    fn test_sync_mode_rejects_conflicting_routes() {
        // neither function declares a route, both land on the catch-all
        let err = Invoker::new(RuntimeConfig::default(), &catalog(), &[], PluginChain::empty())
            .err()
            .unwrap();
        assert!(matches!(
            err,
            RuntimeError::Configuration(ConfigurationError::RouteConflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let config = RuntimeConfig {
            port: 0,
            ..Default::default()
        };
        let invoker =
            Invoker::new(config, &catalog(), &["page".to_string()], PluginChain::empty()).unwrap();

        let token = invoker.shutdown_token();
        let handle = tokio::spawn(invoker.run());
        token.cancel();

        handle.await.unwrap().unwrap();
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_sigterm_cancels_shutdown_token() {
        let config = RuntimeConfig {
            port: 0,
            ..Default::default()
        };
        let invoker =
            Invoker::new(config, &catalog(), &["page".to_string()], PluginChain::empty()).unwrap();
        let token = invoker.shutdown_token();

        invoker.handle_shutdown_signals().unwrap();
        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        tokio::time::timeout(std::time::Duration::from_secs(5), token.cancelled())
            .await
            .unwrap();
    }
}
