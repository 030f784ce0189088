use super::routes::RouteTable;
use super::{Lifecycle, Runtime, absorb, guarded, invoke_open, run_post_hooks, run_pre_hooks};
use crate::cloudevent::StructuredEvent;
use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::error::{HandlerFault, Result};
use crate::event::{Event, HttpExchange, HttpRequest};
use crate::function::{EventFunction, HttpFunction};
use crate::messaging::{DaprClient, Messaging, sidecar_enabled};
use crate::output::Output;
use crate::plugin::PluginChain;
use crate::registry::{Function, FunctionRegistry, Registration};
use anyhow::Context as _;
use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::extract::{Request, State};
use axum::response::{IntoResponse, Response};
use bytes::Bytes;
use http::request::Parts;
use http::{HeaderMap, StatusCode};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Runtime serving functions over plain HTTP.
///
/// Every request is resolved to one registration by path. Functions that
/// declare no route answer on the catch-all path.
pub struct SyncRuntime {
    dispatcher: Arc<HttpDispatcher>,
    lifecycle: Arc<Lifecycle>,
    local_addr: OnceLock<SocketAddr>,
}

impl SyncRuntime {
    /// Build the runtime, rejecting registries whose routes overlap
    pub fn new(
        config: Arc<RuntimeConfig>,
        registry: FunctionRegistry,
        plugins: PluginChain,
    ) -> Result<Self> {
        let routes = RouteTable::build(&registry)?;
        let lifecycle = Arc::new(Lifecycle::new());

        Ok(Self {
            dispatcher: Arc::new(HttpDispatcher {
                config,
                routes,
                plugins,
                lifecycle: lifecycle.clone(),
            }),
            lifecycle,
            local_addr: OnceLock::new(),
        })
    }

    /// Use `messaging` instead of connecting to a sidecar
    pub fn with_messaging(self, messaging: Arc<dyn Messaging>) -> Self {
        self.lifecycle.set_messaging(messaging);
        self
    }

    /// Router dispatching every request to the registered functions
    pub fn router(&self) -> Router {
        Router::new()
            .fallback(dispatch)
            .with_state(self.dispatcher.clone())
    }

    /// Address of the listener once [`Runtime::start`] has bound it
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}

#[async_trait]
impl Runtime for SyncRuntime {
    async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        if self.lifecycle.is_closed() {
            warn!("Runtime was closed before it started");
            return Ok(());
        }

        let config = &self.dispatcher.config;

        if sidecar_enabled() || self.lifecycle.messaging().is_some() {
            let messaging = self
                .lifecycle
                .messaging_or_init(|| Arc::new(DaprClient::from_env()));
            if let Err(e) = messaging.wait_ready(config.sidecar_timeout).await {
                self.close().await;
                return Err(e);
            }
        }

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port)).await?;
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);
        info!("Serving function {} on http://{}", config.function_name, addr);

        let stop = self.lifecycle.listener().clone();
        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { stop.cancelled().await });
        let server = tokio::spawn(async move { server.await });

        super::serve_until(&self.lifecycle, shutdown, server).await
    }

    async fn close(&self) {
        self.lifecycle.close().await;
    }
}

struct HttpDispatcher {
    config: Arc<RuntimeConfig>,
    routes: RouteTable,
    plugins: PluginChain,
    lifecycle: Arc<Lifecycle>,
}

async fn dispatch(State(dispatcher): State<Arc<HttpDispatcher>>, request: Request) -> Response {
    let Some(registration) = dispatcher.routes.resolve(request.uri().path()) else {
        debug!("No function serves {}", request.uri().path());
        return StatusCode::NOT_FOUND.into_response();
    };

    if !registration.route().allows(request.method().as_str()) {
        debug!(
            "Method {} not allowed on {} (function {})",
            request.method(),
            request.uri().path(),
            registration.id()
        );
        return StatusCode::METHOD_NOT_ALLOWED.into_response();
    }

    debug!(
        "{} {} -> {}",
        request.method(),
        request.uri().path(),
        registration.id()
    );

    let (parts, body) = request.into_parts();
    let body = match axum::body::to_bytes(body, dispatcher.config.max_body_bytes).await {
        Ok(body) => body,
        Err(e) => {
            warn!(
                "Rejecting request body for {} (limit {} bytes): {}",
                parts.uri.path(),
                dispatcher.config.max_body_bytes,
                e
            );
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    match guarded(dispatcher.invoke(registration, parts, body)).await {
        Ok(response) => response,
        Err(fault) => {
            error!("Function {} failed: {}", registration.id(), fault);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

impl HttpDispatcher {
    fn context(&self, event: Event) -> Context {
        Context::new(
            self.config.clone(),
            self.lifecycle.messaging(),
            self.plugins.clone(),
            event,
        )
    }

    async fn invoke(
        &self,
        registration: &Registration,
        parts: Parts,
        body: Bytes,
    ) -> std::result::Result<Response, HandlerFault> {
        match registration.function() {
            Function::Http(function) => self.invoke_http(function.as_ref(), parts, body).await,
            Function::Event(function) => self.invoke_event(function.as_ref(), parts, body).await,
            Function::Open(function) => {
                let mut ctx = self.context(Event::Payload(body.clone()));
                invoke_open(function.as_ref(), &mut ctx, body).await?;

                let (code, data) = ctx.finish(None).into_outcome();
                Ok(respond(code, HeaderMap::new(), data))
            }
        }
    }

    async fn invoke_http(
        &self,
        function: &dyn HttpFunction,
        parts: Parts,
        body: Bytes,
    ) -> std::result::Result<Response, HandlerFault> {
        let request = HttpRequest::new(parts.method, parts.uri, parts.headers, body);
        let mut ctx = self.context(Event::Http(HttpExchange::new(request)));

        let accepted = run_pre_hooks(&mut ctx).await?;
        if accepted {
            let result = match ctx.http_exchange_mut() {
                Some(HttpExchange { request, response }) => {
                    function.service(request, response).await
                }
                None => Ok(()),
            };
            if let Err(error) = result {
                absorb(&mut ctx, error)?;
            }

            if ctx.output().is_none() {
                let mut output = Output::new();
                if let Some(status) = explicit_status(&ctx) {
                    output.set_code(status);
                }
                ctx.set_output(output);
            }

            run_post_hooks(&mut ctx).await?;
        }

        let status = explicit_status(&ctx);
        let plugin_data = ctx.output().and_then(|output| output.data().cloned());
        let (code, data) = ctx.finish(status).into_parts();

        match ctx.into_event() {
            Event::Http(exchange) if accepted => {
                let (headers, body) = exchange.response.into_parts();
                // The response body belongs to the function; envelope data
                // only fills it when a plugin provided some.
                let body = if body.is_empty() {
                    plugin_data.unwrap_or_default()
                } else {
                    body
                };
                Ok(respond(code, headers, body))
            }
            // Rejected by a pre hook, the envelope is the whole response
            _ => Ok(respond(code, HeaderMap::new(), data)),
        }
    }

    async fn invoke_event(
        &self,
        function: &dyn EventFunction,
        parts: Parts,
        body: Bytes,
    ) -> std::result::Result<Response, HandlerFault> {
        let event = StructuredEvent::from_http(&parts.headers, body)
            .context("could not read CloudEvent from request")?;
        let mut ctx = self.context(Event::Structured(event.clone()));

        if run_pre_hooks(&mut ctx).await? {
            if let Err(error) = function.accept(&mut ctx, event).await {
                absorb(&mut ctx, error)?;
            }
            run_post_hooks(&mut ctx).await?;
        }

        let (code, data) = ctx.finish(None).into_outcome();
        Ok(respond(code, HeaderMap::new(), data))
    }
}

fn explicit_status(ctx: &Context) -> Option<u16> {
    ctx.http_exchange()
        .and_then(|exchange| exchange.response.status())
        .map(|status| status.as_u16())
}

fn respond(code: u16, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    *response.headers_mut() = headers;
    response
}
