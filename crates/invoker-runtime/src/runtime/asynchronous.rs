use super::{Lifecycle, Runtime, guarded, invoke_open};
use crate::config::RuntimeConfig;
use crate::context::Context;
use crate::error::{ConfigurationError, HandlerFault, Result};
use crate::event::{BindingEvent, Event, TopicEvent};
use crate::function::OpenFunction;
use crate::messaging::{DaprClient, Messaging};
use crate::plugin::PluginChain;
use crate::registry::{Function, FunctionRegistry};
use async_trait::async_trait;
use bytes::Bytes;
use invoker_proto::v1::app_callback_server::{AppCallback, AppCallbackServer};
use invoker_proto::v1::{
    BindingEventRequest, BindingEventResponse, ListInputBindingsResponse,
    ListTopicSubscriptionsResponse, TopicEventRequest, TopicEventResponse, TopicSubscription,
};
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::{Arc, OnceLock};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tokio_util::sync::CancellationToken;
use tonic::transport::Server;
use tonic::{Request, Response, Status};
use tracing::{debug, error, info, warn};

/// Runtime driven by sidecar callbacks.
///
/// The sidecar asks which bindings and topics the function consumes, then
/// delivers each event through a streaming call. Every registered function
/// handles every event, in registration order, and produces one
/// acknowledgement.
pub struct AsyncRuntime {
    dispatcher: Arc<CallbackDispatcher>,
    lifecycle: Arc<Lifecycle>,
    local_addr: OnceLock<SocketAddr>,
}

impl AsyncRuntime {
    /// Build the runtime. Only byte-in, byte-out functions can be served.
    pub fn new(
        config: Arc<RuntimeConfig>,
        registry: FunctionRegistry,
        plugins: PluginChain,
    ) -> Result<Self> {
        let mut functions = Vec::with_capacity(registry.len());
        for registration in registry.iter() {
            match registration.function() {
                Function::Open(function) => {
                    functions.push((registration.id().to_string(), function.clone()))
                }
                other => {
                    return Err(ConfigurationError::UnsupportedHandler {
                        id: registration.id().to_string(),
                        reason: format!("{} functions cannot serve callback events", other.kind()),
                    }
                    .into());
                }
            }
        }

        let lifecycle = Arc::new(Lifecycle::new());
        Ok(Self {
            dispatcher: Arc::new(CallbackDispatcher {
                config,
                functions: functions.into(),
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

    /// The callback service, usable without a listener
    pub fn service(&self) -> CallbackService {
        CallbackService {
            dispatcher: self.dispatcher.clone(),
        }
    }

    /// Address of the callback listener once [`Runtime::start`] has bound it
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }
}

#[async_trait]
impl Runtime for AsyncRuntime {
    async fn start(&self, shutdown: CancellationToken) -> Result<()> {
        if self.lifecycle.is_closed() {
            warn!("Runtime was closed before it started");
            return Ok(());
        }

        let config = &self.dispatcher.config;
        if config.inputs.is_empty() {
            return Err(ConfigurationError::NoInputs.into());
        }

        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, config.port)).await?;
        let addr = listener.local_addr()?;
        let _ = self.local_addr.set(addr);
        info!(
            "Callback listener for function {} on {}",
            config.function_name, addr
        );

        let stop = self.lifecycle.listener().clone();
        let server = Server::builder()
            .add_service(AppCallbackServer::new(self.service()))
            .serve_with_incoming_shutdown(TcpListenerStream::new(listener), async move {
                stop.cancelled().await
            });
        let server = tokio::spawn(server);

        let messaging = self
            .lifecycle
            .messaging_or_init(|| Arc::new(DaprClient::from_env()));
        if let Err(e) = messaging.wait_ready(config.sidecar_timeout).await {
            error!("Sidecar handshake failed: {}", e);
            self.close().await;
            if let Err(join) = server.await {
                warn!("Callback listener task failed: {}", join);
            }
            return Err(e);
        }

        info!(
            "Serving {} input bindings and {} topic subscriptions",
            config.input_bindings().count(),
            config.input_topics().count()
        );

        super::serve_until(&self.lifecycle, shutdown, server).await
    }

    async fn close(&self) {
        self.lifecycle.close().await;
    }
}

struct CallbackDispatcher {
    config: Arc<RuntimeConfig>,
    functions: Arc<[(String, Arc<dyn OpenFunction>)]>,
    plugins: PluginChain,
    lifecycle: Arc<Lifecycle>,
}

impl CallbackDispatcher {
    fn context(&self, event: Event) -> Context {
        Context::new(
            self.config.clone(),
            self.lifecycle.messaging(),
            self.plugins.clone(),
            event,
        )
    }

    /// Hand the event to every function in order, acknowledging each one.
    /// The first fault fails the stream and stops the iteration.
    async fn fan_out<F, A>(self: Arc<Self>, event: F, acks: mpsc::Sender<std::result::Result<A, Status>>)
    where
        F: Fn() -> Event + Send + Sync + 'static,
        A: Default + Send + 'static,
    {
        for (id, function) in self.functions.iter() {
            let mut ctx = self.context(event());
            let payload = ctx.event().payload().cloned().unwrap_or_else(Bytes::new);
            let kind = ctx.event().kind();

            let result = guarded(async {
                invoke_open(function.as_ref(), &mut ctx, payload).await?;
                Ok::<_, HandlerFault>(ctx.finish(None))
            })
            .await;

            match result {
                Ok(output) => {
                    debug!(
                        "Function {} handled {} event with code {:?}",
                        id,
                        kind,
                        output.code()
                    );
                    if acks.send(Ok(A::default())).await.is_err() {
                        warn!("Sidecar dropped the acknowledgement stream");
                        return;
                    }
                }
                Err(fault) => {
                    error!("Function {} failed on {} event: {}", id, kind, fault);
                    let status = Status::internal(format!("function {} failed: {}", id, fault));
                    let _ = acks.send(Err(status)).await;
                    return;
                }
            }
        }
    }

    fn spawn_fan_out<F, A>(self: &Arc<Self>, event: F) -> ReceiverStream<std::result::Result<A, Status>>
    where
        F: Fn() -> Event + Send + Sync + 'static,
        A: Default + Send + 'static,
    {
        let (tx, rx) = mpsc::channel(self.functions.len().max(1));
        tokio::spawn(self.clone().fan_out(event, tx));
        ReceiverStream::new(rx)
    }
}

/// gRPC callback service exposed to the sidecar
#[derive(Clone)]
pub struct CallbackService {
    dispatcher: Arc<CallbackDispatcher>,
}

#[tonic::async_trait]
impl AppCallback for CallbackService {
    #[tracing::instrument(skip_all)]
    async fn list_input_bindings(
        &self,
        _request: Request<()>,
    ) -> std::result::Result<Response<ListInputBindingsResponse>, Status> {
        let bindings: Vec<String> = self
            .dispatcher
            .config
            .input_bindings()
            .map(|component| component.component_name.clone())
            .collect();

        debug!("Input bindings: {:?}", bindings);
        Ok(Response::new(ListInputBindingsResponse { bindings }))
    }

    type OnBindingEventStream = ReceiverStream<std::result::Result<BindingEventResponse, Status>>;

    #[tracing::instrument(skip_all, fields(binding = %request.get_ref().name))]
    async fn on_binding_event(
        &self,
        request: Request<BindingEventRequest>,
    ) -> std::result::Result<Response<Self::OnBindingEventStream>, Status> {
        let request = request.into_inner();
        let event = BindingEvent {
            binding_name: request.name,
            metadata: request.metadata,
            payload: Bytes::from(request.data),
        };

        let stream = self
            .dispatcher
            .spawn_fan_out(move || Event::Binding(event.clone()));
        Ok(Response::new(stream))
    }

    #[tracing::instrument(skip_all)]
    async fn list_topic_subscriptions(
        &self,
        _request: Request<()>,
    ) -> std::result::Result<Response<ListTopicSubscriptionsResponse>, Status> {
        let subscriptions: Vec<TopicSubscription> = self
            .dispatcher
            .config
            .input_topics()
            .map(|component| TopicSubscription {
                pubsub_name: component.component_name.clone(),
                topic: component.uri.clone(),
                metadata: component.metadata.clone(),
            })
            .collect();

        debug!("Topic subscriptions: {}", subscriptions.len());
        Ok(Response::new(ListTopicSubscriptionsResponse { subscriptions }))
    }

    type OnTopicEventStream = ReceiverStream<std::result::Result<TopicEventResponse, Status>>;

    #[tracing::instrument(skip_all, fields(topic = %request.get_ref().topic))]
    async fn on_topic_event(
        &self,
        request: Request<TopicEventRequest>,
    ) -> std::result::Result<Response<Self::OnTopicEventStream>, Status> {
        let request = request.into_inner();
        let event = TopicEvent {
            pubsub_name: request.pubsub_name,
            id: request.id,
            topic: request.topic,
            spec_version: request.spec_version,
            source: request.source,
            event_type: request.r#type,
            content_type: request.data_content_type,
            payload: Bytes::from(request.data),
        };

        let stream = self
            .dispatcher
            .spawn_fan_out(move || Event::Topic(event.clone()));
        Ok(Response::new(stream))
    }
}
