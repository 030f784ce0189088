use clap::Parser;
use invoker_runtime::{
    Bytes, Catalog, Context, EventFunction, HttpFunction, HttpRequest, HttpResponse,
    InvokeError, InvokeResult, Invoker, OpenFunction, Output, Plugin, PluginChain, Route,
    RuntimeConfig, StructuredEvent, async_trait, parse_targets,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Output the greeter forwards greetings to, when configured
const GREETINGS_OUTPUT: &str = "greetings";

#[derive(Parser)]
#[command(name = "hello-function")]
#[command(about = "Serves the sample functions over HTTP or sidecar callbacks")]
struct Args {
    /// Function context document, JSON
    #[arg(long, env = "FUNC_CONTEXT")]
    func_context: Option<String>,

    /// Comma-separated functions to serve (hello, echo, greeter). All when empty.
    #[arg(long, env = "FUNCTION_TARGET", default_value = "")]
    targets: String,

    /// Override the listening port of the function context
    #[arg(long)]
    port: Option<u16>,

    /// Override the sidecar readiness timeout, e.g. `30s`
    #[arg(long, value_parser = humantime::parse_duration)]
    sidecar_timeout: Option<std::time::Duration>,

    /// Tracing log level, used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Default)]
struct Hello;

#[async_trait]
impl HttpFunction for Hello {
    async fn service(&self, request: &HttpRequest, response: &mut HttpResponse) -> InvokeResult {
        let name = request
            .query()
            .into_iter()
            .flat_map(|query| query.split('&'))
            .find_map(|pair| pair.strip_prefix("name="))
            .unwrap_or("world");

        response.set_content_type("text/plain");
        response.write(format!("Hello, {}!\n", name));
        Ok(())
    }

    fn route(&self) -> Option<Route> {
        Some(Route::new("/hello").with_methods(["GET"]))
    }
}

#[derive(Default)]
struct Echo;

#[async_trait]
impl OpenFunction for Echo {
    async fn accept(&self, _ctx: &mut Context, payload: Bytes) -> InvokeResult<Output> {
        if payload.is_empty() {
            return Err(InvokeError::functional("nothing to echo"));
        }
        Ok(Output::new().with_data(payload))
    }
}

#[derive(Default)]
struct Greeter;

#[async_trait]
impl EventFunction for Greeter {
    async fn accept(&self, ctx: &mut Context, event: StructuredEvent) -> InvokeResult {
        let name = event.text().unwrap_or("stranger").trim().to_string();
        let greeting = serde_json::json!({
            "greeting": format!("Hello, {}!", name),
            "source": event.source,
            "id": event.id,
        });
        let greeting = Bytes::from(greeting.to_string());

        if ctx.config().outputs.contains_key(GREETINGS_OUTPUT) {
            ctx.send(GREETINGS_OUTPUT, greeting.clone()).await?;
        }

        ctx.set_output(Output::new().with_data(greeting));
        Ok(())
    }

    fn route(&self) -> Option<Route> {
        Some(Route::new("/events").with_methods(["POST"]))
    }
}

/// Logs every invocation and its outcome
struct Audit;

#[async_trait]
impl Plugin for Audit {
    fn name(&self) -> &str {
        "audit"
    }

    async fn pre_hook(&self, ctx: &mut Context) -> InvokeResult {
        info!(
            "{}: {} event received",
            ctx.function_name(),
            ctx.event().kind()
        );
        Ok(())
    }

    async fn post_hook(&self, ctx: &mut Context) -> InvokeResult {
        match ctx.output().and_then(|output| output.error()) {
            Some(error) => info!("{}: failed with {}", ctx.function_name(), error.message()),
            None => info!("{}: done", ctx.function_name()),
        }
        Ok(())
    }
}

fn catalog() -> Catalog {
    let mut catalog = Catalog::new();
    catalog
        .http::<Hello>("hello")
        .open::<Echo>("echo")
        .event::<Greeter>("greeter");
    catalog
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&args.log_level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut config = match args.func_context.as_deref() {
        Some(document) if !document.trim().is_empty() => RuntimeConfig::from_json(document)?,
        _ => RuntimeConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(timeout) = args.sidecar_timeout {
        config.sidecar_timeout = timeout;
    }
    if config.function_name.is_empty() {
        config.function_name = "hello-function".to_string();
    }

    let targets = parse_targets(&args.targets);
    let plugins = PluginChain::new(vec![Arc::new(Audit) as Arc<dyn Plugin>]);

    let invoker = Invoker::new(config, &catalog(), &targets, plugins)?;
    invoker.run().await?;

    Ok(())
}
