//! Tests of the sidecar callback runtime.

use invoker_proto::v1::app_callback_client::AppCallbackClient;
use invoker_proto::v1::app_callback_server::AppCallback;
use invoker_proto::v1::{BindingEventRequest, TopicEventRequest};
use invoker_runtime::{
    AsyncRuntime, Bytes, Component, ConfigurationError, Context, Function, FunctionRegistry,
    InvokeError, InvokeResult, Messaging, MessagingError, OpenFunction, Output, Plugin,
    PluginChain, Runtime, RuntimeConfig, RuntimeError, RuntimeKind, async_trait,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_stream::StreamExt;
use tokio_util::sync::CancellationToken;
use tonic::Request;

fn config() -> RuntimeConfig {
    let mut inputs = BTreeMap::new();
    inputs.insert(
        "cron".to_string(),
        Component {
            component_type: "bindings.kafka".to_string(),
            component_name: "orders".to_string(),
            ..Default::default()
        },
    );
    inputs.insert(
        "subscriber".to_string(),
        Component {
            component_type: "pubsub.redis".to_string(),
            component_name: "events".to_string(),
            uri: "user-created".to_string(),
            ..Default::default()
        },
    );

    RuntimeConfig {
        function_name: "callback-test".to_string(),
        runtime: RuntimeKind::Async,
        port: 0,
        inputs,
        ..Default::default()
    }
}

fn runtime(config: RuntimeConfig, functions: Vec<(&str, Function)>) -> AsyncRuntime {
    runtime_with_plugins(config, functions, PluginChain::empty())
}

fn runtime_with_plugins(
    config: RuntimeConfig,
    functions: Vec<(&str, Function)>,
    plugins: PluginChain,
) -> AsyncRuntime {
    let registry = FunctionRegistry::from_functions(functions).unwrap();
    AsyncRuntime::new(Arc::new(config), registry, plugins).unwrap()
}

/// Records every payload it sees and faults on `boom`
struct Journal {
    name: &'static str,
    seen: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl OpenFunction for Journal {
    async fn accept(&self, ctx: &mut Context, payload: Bytes) -> InvokeResult<Output> {
        if payload.as_ref() == b"boom" {
            return Err(anyhow::anyhow!("journal is full").into());
        }
        if payload.as_ref() == b"reject" {
            return Err(InvokeError::functional("rejected"));
        }

        self.seen.lock().unwrap().push(format!(
            "{} {} {}",
            self.name,
            ctx.event().kind(),
            String::from_utf8_lossy(&payload)
        ));
        Ok(Output::new())
    }
}

fn binding_event(data: &[u8]) -> Request<BindingEventRequest> {
    Request::new(BindingEventRequest {
        name: "orders".to_string(),
        data: data.to_vec(),
        ..Default::default()
    })
}

#[tokio::test]
async fn test_lists_inputs_from_configuration() {
    let runtime = runtime(
        config(),
        vec![("journal", Function::Open(Arc::new(Journal {
            name: "journal",
            seen: Default::default(),
        })))],
    );
    let service = runtime.service();

    let bindings = service
        .list_input_bindings(Request::new(()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(bindings.bindings, vec!["orders"]);

    let topics = service
        .list_topic_subscriptions(Request::new(()))
        .await
        .unwrap()
        .into_inner();
    assert_eq!(topics.subscriptions.len(), 1);
    assert_eq!(topics.subscriptions[0].pubsub_name, "events");
    assert_eq!(topics.subscriptions[0].topic, "user-created");
}

#[tokio::test]
async fn test_every_function_acknowledges_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let runtime = runtime(
        config(),
        vec![
            ("first", Function::Open(Arc::new(Journal { name: "first", seen: seen.clone() }))),
            ("second", Function::Open(Arc::new(Journal { name: "second", seen: seen.clone() }))),
        ],
    );

    let mut acks = runtime
        .service()
        .on_binding_event(binding_event(b"order-1"))
        .await
        .unwrap()
        .into_inner();

    assert!(acks.next().await.unwrap().is_ok());
    assert!(acks.next().await.unwrap().is_ok());
    assert!(acks.next().await.is_none());

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["first binding order-1", "second binding order-1"]
    );
}

#[tokio::test]
async fn test_topic_event_reaches_function() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let runtime = runtime(
        config(),
        vec![("journal", Function::Open(Arc::new(Journal { name: "journal", seen: seen.clone() })))],
    );

    let request = Request::new(TopicEventRequest {
        id: "evt-7".to_string(),
        pubsub_name: "events".to_string(),
        topic: "user-created".to_string(),
        r#type: "com.example.user".to_string(),
        data: b"alice".to_vec(),
        ..Default::default()
    });
    let acks: Vec<_> = runtime
        .service()
        .on_topic_event(request)
        .await
        .unwrap()
        .into_inner()
        .collect()
        .await;

    assert_eq!(acks.len(), 1);
    assert!(acks[0].is_ok());
    assert_eq!(*seen.lock().unwrap(), vec!["journal topic alice"]);
}

#[tokio::test]
async fn test_topic_event_fans_out_in_order() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let runtime = runtime(
        config(),
        vec![
            ("first", Function::Open(Arc::new(Journal { name: "first", seen: seen.clone() }))),
            ("second", Function::Open(Arc::new(Journal { name: "second", seen: seen.clone() }))),
        ],
    );

    let request = Request::new(TopicEventRequest {
        id: "evt-8".to_string(),
        pubsub_name: "events".to_string(),
        topic: "user-created".to_string(),
        data: b"bob".to_vec(),
        ..Default::default()
    });
    let mut acks = runtime
        .service()
        .on_topic_event(request)
        .await
        .unwrap()
        .into_inner();

    assert!(acks.next().await.unwrap().is_ok());
    assert!(acks.next().await.unwrap().is_ok());
    assert!(acks.next().await.is_none());
    assert_eq!(
        *seen.lock().unwrap(),
        vec!["first topic bob", "second topic bob"]
    );
}

/// Fails every post hook with a fault
struct BrokenAudit;

#[async_trait]
impl Plugin for BrokenAudit {
    fn name(&self) -> &str {
        "broken-audit"
    }

    async fn pre_hook(&self, _ctx: &mut Context) -> InvokeResult {
        Ok(())
    }

    async fn post_hook(&self, _ctx: &mut Context) -> InvokeResult {
        Err(anyhow::anyhow!("audit store unavailable").into())
    }
}

#[tokio::test]
async fn test_plugin_fault_aborts_remaining_functions() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let runtime = runtime_with_plugins(
        config(),
        vec![
            ("first", Function::Open(Arc::new(Journal { name: "first", seen: seen.clone() }))),
            ("second", Function::Open(Arc::new(Journal { name: "second", seen: seen.clone() }))),
        ],
        PluginChain::new(vec![Arc::new(BrokenAudit) as Arc<dyn Plugin>]),
    );

    let mut acks = runtime
        .service()
        .on_binding_event(binding_event(b"order-3"))
        .await
        .unwrap()
        .into_inner();

    let status = acks.next().await.unwrap().unwrap_err();
    assert_eq!(status.code(), tonic::Code::Internal);
    assert!(acks.next().await.is_none());
    assert_eq!(*seen.lock().unwrap(), vec!["first binding order-3"]);
}

#[tokio::test]
async fn test_fault_fails_the_stream_only() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let runtime = runtime(
        config(),
        vec![("journal", Function::Open(Arc::new(Journal { name: "journal", seen: seen.clone() })))],
    );
    let service = runtime.service();

    let mut acks = service
        .on_binding_event(binding_event(b"boom"))
        .await
        .unwrap()
        .into_inner();
    let status = acks.next().await.unwrap().unwrap_err();
    assert_eq!(status.code(), tonic::Code::Internal);
    assert!(acks.next().await.is_none());

    let mut acks = service
        .on_binding_event(binding_event(b"order-2"))
        .await
        .unwrap()
        .into_inner();
    assert!(acks.next().await.unwrap().is_ok());
    assert_eq!(*seen.lock().unwrap(), vec!["journal binding order-2"]);
}

#[tokio::test]
async fn test_functional_error_is_acknowledged() {
    let runtime = runtime(
        config(),
        vec![("journal", Function::Open(Arc::new(Journal { name: "journal", seen: Default::default() })))],
    );

    let mut acks = runtime
        .service()
        .on_binding_event(binding_event(b"reject"))
        .await
        .unwrap()
        .into_inner();
    assert!(acks.next().await.unwrap().is_ok());
}

#[tokio::test]
async fn test_start_requires_inputs() {
    let config = RuntimeConfig {
        inputs: BTreeMap::new(),
        ..config()
    };
    let runtime = runtime(
        config,
        vec![("journal", Function::Open(Arc::new(Journal { name: "journal", seen: Default::default() })))],
    );

    let err = runtime.start(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(
        err,
        RuntimeError::Configuration(ConfigurationError::NoInputs)
    ));
}

struct Sidecar {
    ready: bool,
    closes: AtomicUsize,
}

impl Sidecar {
    fn new(ready: bool) -> Arc<Self> {
        Arc::new(Self {
            ready,
            closes: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl Messaging for Sidecar {
    async fn wait_ready(&self, timeout: Duration) -> Result<(), RuntimeError> {
        if self.ready {
            Ok(())
        } else {
            Err(RuntimeError::SidecarTimeout(timeout))
        }
    }

    async fn publish(
        &self,
        _pubsub_name: &str,
        _topic: &str,
        _data: Bytes,
        _metadata: &HashMap<String, String>,
    ) -> Result<(), MessagingError> {
        Ok(())
    }

    async fn invoke_binding(
        &self,
        _binding_name: &str,
        _operation: &str,
        _data: Bytes,
        _metadata: &HashMap<String, String>,
    ) -> Result<Bytes, MessagingError> {
        Ok(Bytes::new())
    }

    async fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn test_sidecar_timeout_stops_startup() {
    let sidecar = Sidecar::new(false);
    let runtime = runtime(
        config(),
        vec![("journal", Function::Open(Arc::new(Journal { name: "journal", seen: Default::default() })))],
    )
    .with_messaging(sidecar.clone());

    let err = runtime.start(CancellationToken::new()).await.unwrap_err();
    assert!(matches!(err, RuntimeError::SidecarTimeout(_)));
    assert_eq!(sidecar.closes.load(Ordering::SeqCst), 1);

    runtime.close().await;
    assert_eq!(sidecar.closes.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_serves_callbacks_over_grpc() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sidecar = Sidecar::new(true);
    let runtime = Arc::new(
        runtime(
            config(),
            vec![("journal", Function::Open(Arc::new(Journal { name: "journal", seen: seen.clone() })))],
        )
        .with_messaging(sidecar.clone()),
    );

    let shutdown = CancellationToken::new();
    let server = tokio::spawn({
        let runtime = runtime.clone();
        let shutdown = shutdown.clone();
        async move { runtime.start(shutdown).await }
    });

    let addr = loop {
        if let Some(addr) = runtime.local_addr() {
            break addr;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    };

    let mut client = AppCallbackClient::connect(format!("http://127.0.0.1:{}", addr.port()))
        .await
        .unwrap();

    let bindings = client.list_input_bindings(()).await.unwrap().into_inner();
    assert_eq!(bindings.bindings, vec!["orders"]);

    let mut acks = client
        .on_binding_event(BindingEventRequest {
            name: "orders".to_string(),
            data: b"over the wire".to_vec(),
            ..Default::default()
        })
        .await
        .unwrap()
        .into_inner();
    assert!(acks.message().await.unwrap().is_some());
    assert!(acks.message().await.unwrap().is_none());
    assert_eq!(*seen.lock().unwrap(), vec!["journal binding over the wire"]);

    shutdown.cancel();
    server.await.unwrap().unwrap();
    assert_eq!(sidecar.closes.load(Ordering::SeqCst), 1);
}
