use crate::cloudevent::StructuredEvent;
use crate::config::{ComponentFamily, RuntimeConfig};
use crate::error::{InvokeResult, MessagingError};
use crate::event::{BindingEvent, Event, HttpExchange, TopicEvent};
use crate::messaging::Messaging;
use crate::output::Output;
use crate::plugin::PluginChain;
use bytes::Bytes;
use std::sync::Arc;
use tracing::debug;

/// Operation used for output bindings that do not configure one
pub const DEFAULT_BINDING_OPERATION: &str = "create";

/// State of a single invocation.
///
/// A context is created fresh for every request or callback event, handed to
/// the plugin chain and the function, and dropped once the response has been
/// produced. It is never shared between invocations.
pub struct Context {
    config: Arc<RuntimeConfig>,
    messaging: Option<Arc<dyn Messaging>>,
    plugins: PluginChain,
    event: Event,
    output: Option<Output>,
}

impl Context {
    pub fn new(
        config: Arc<RuntimeConfig>,
        messaging: Option<Arc<dyn Messaging>>,
        plugins: PluginChain,
        event: Event,
    ) -> Self {
        Self {
            config,
            messaging,
            plugins,
            event,
            output: None,
        }
    }

    /// Run every pre hook in registration order, stopping at the first error
    pub async fn execute_pre_hooks(&mut self) -> InvokeResult {
        let plugins = self.plugins.clone();
        for plugin in plugins.iter() {
            debug!("Running pre hook of plugin {}", plugin.name());
            plugin.pre_hook(self).await?;
        }
        Ok(())
    }

    /// Run every post hook in registration order, stopping at the first error
    pub async fn execute_post_hooks(&mut self) -> InvokeResult {
        let plugins = self.plugins.clone();
        for plugin in plugins.iter() {
            debug!("Running post hook of plugin {}", plugin.name());
            plugin.post_hook(self).await?;
        }
        Ok(())
    }

    pub fn config(&self) -> &RuntimeConfig {
        &self.config
    }

    pub fn function_name(&self) -> &str {
        &self.config.function_name
    }

    pub fn messaging(&self) -> Option<&Arc<dyn Messaging>> {
        self.messaging.as_ref()
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn event_mut(&mut self) -> &mut Event {
        &mut self.event
    }

    pub fn binding_event(&self) -> Option<&BindingEvent> {
        match &self.event {
            Event::Binding(event) => Some(event),
            _ => None,
        }
    }

    pub fn topic_event(&self) -> Option<&TopicEvent> {
        match &self.event {
            Event::Topic(event) => Some(event),
            _ => None,
        }
    }

    pub fn http_exchange(&self) -> Option<&HttpExchange> {
        match &self.event {
            Event::Http(exchange) => Some(exchange),
            _ => None,
        }
    }

    pub fn http_exchange_mut(&mut self) -> Option<&mut HttpExchange> {
        match &mut self.event {
            Event::Http(exchange) => Some(exchange),
            _ => None,
        }
    }

    pub fn structured_event(&self) -> Option<&StructuredEvent> {
        match &self.event {
            Event::Structured(event) => Some(event),
            _ => None,
        }
    }

    pub fn output(&self) -> Option<&Output> {
        self.output.as_ref()
    }

    pub fn output_mut(&mut self) -> Option<&mut Output> {
        self.output.as_mut()
    }

    pub fn set_output(&mut self, output: Output) {
        self.output = Some(output);
    }

    pub fn take_output(&mut self) -> Option<Output> {
        self.output.take()
    }

    /// Send `data` to the output named `output_name`.
    ///
    /// Binding outputs are invoked with their configured operation, topic
    /// outputs publish to the topic stored in the component `uri`. Returns the
    /// response body of binding invocations, empty for topics.
    pub async fn send(
        &self,
        output_name: &str,
        data: impl Into<Bytes>,
    ) -> Result<Bytes, MessagingError> {
        let messaging = self.messaging.as_ref().ok_or(MessagingError::Unavailable)?;
        let component = self
            .config
            .outputs
            .get(output_name)
            .ok_or_else(|| MessagingError::UnknownOutput(output_name.to_string()))?;

        match component.family() {
            Some(ComponentFamily::Binding) => {
                let operation = component
                    .operation
                    .as_deref()
                    .unwrap_or(DEFAULT_BINDING_OPERATION);
                messaging
                    .invoke_binding(
                        &component.component_name,
                        operation,
                        data.into(),
                        &component.metadata,
                    )
                    .await
            }
            Some(ComponentFamily::Topic) => {
                messaging
                    .publish(
                        &component.component_name,
                        &component.uri,
                        data.into(),
                        &component.metadata,
                    )
                    .await?;
                Ok(Bytes::new())
            }
            None => Err(MessagingError::UnsupportedComponent {
                name: output_name.to_string(),
                component_type: component.component_type.clone(),
            }),
        }
    }

    pub(crate) fn into_event(self) -> Event {
        self.event
    }

    /// Take the output envelope and fill in its defaults.
    ///
    /// An absent envelope is synthesized empty; `preserved_status` is the
    /// status an HTTP function set on its response, if any.
    pub(crate) fn finish(&mut self, preserved_status: Option<u16>) -> Output {
        let mut output = self.output.take().unwrap_or_default();
        output.apply_defaults(preserved_status);
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Component;
    use crate::error::{FunctionError, InvokeError};
    use crate::messaging::tests::RecordingMessaging;
    use crate::plugin::Plugin;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Tracer {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
        fail_pre: bool,
    }

    #[async_trait]
    impl Plugin for Tracer {
        fn name(&self) -> &str {
            self.name
        }

        async fn pre_hook(&self, _ctx: &mut Context) -> InvokeResult {
            self.log.lock().unwrap().push(format!("pre:{}", self.name));
            if self.fail_pre {
                return Err(InvokeError::functional("rejected"));
            }
            Ok(())
        }

        async fn post_hook(&self, ctx: &mut Context) -> InvokeResult {
            self.log.lock().unwrap().push(format!("post:{}", self.name));
            if let Some(output) = ctx.output_mut() {
                output.set_data(self.name);
            }
            Ok(())
        }
    }

    fn chain(log: &Arc<Mutex<Vec<String>>>, failing: Option<&'static str>) -> PluginChain {
        ["first", "second", "third"]
            .into_iter()
            .map(|name| {
                Arc::new(Tracer {
                    name,
                    log: log.clone(),
                    fail_pre: Some(name) == failing,
                }) as Arc<dyn Plugin>
            })
            .collect()
    }

    fn context(config: RuntimeConfig, messaging: Option<Arc<dyn Messaging>>) -> Context {
        Context::new(
            Arc::new(config),
            messaging,
            PluginChain::empty(),
            Event::Payload(Bytes::from_static(b"in")),
        )
    }

    #[tokio::test]
    async fn test_hooks_run_in_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = Context::new(
            Arc::new(RuntimeConfig::default()),
            None,
            chain(&log, None),
            Event::Payload(Bytes::new()),
        );

        ctx.execute_pre_hooks().await.unwrap();
        ctx.set_output(Output::new());
        ctx.execute_post_hooks().await.unwrap();

        assert_eq!(
            *log.lock().unwrap(),
            vec![
                "pre:first",
                "pre:second",
                "pre:third",
                "post:first",
                "post:second",
                "post:third"
            ]
        );
        // last writer wins
        assert_eq!(ctx.output().unwrap().data().unwrap().as_ref(), b"third");
    }

    #[tokio::test]
    async fn test_hook_error_stops_the_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut ctx = Context::new(
            Arc::new(RuntimeConfig::default()),
            None,
            chain(&log, Some("second")),
            Event::Payload(Bytes::new()),
        );

        let err = ctx.execute_pre_hooks().await.unwrap_err();
        assert!(matches!(err, InvokeError::Functional(e) if e == FunctionError::new("rejected")));
        assert_eq!(*log.lock().unwrap(), vec!["pre:first", "pre:second"]);
    }

    #[test]
    fn test_finish_synthesizes_output() {
        let mut ctx = context(RuntimeConfig::default(), None);
        let output = ctx.finish(None);

        assert_eq!(output.code(), Some(200));
        assert_eq!(output.data().unwrap().as_ref(), b"Success");
        assert!(ctx.output().is_none());
    }

    #[tokio::test]
    async fn test_send_routes_by_component_family() {
        let mut config = RuntimeConfig::default();
        config.outputs.insert(
            "audit".to_string(),
            Component {
                component_type: "bindings.kafka".to_string(),
                component_name: "audit-log".to_string(),
                ..Default::default()
            },
        );
        config.outputs.insert(
            "notify".to_string(),
            Component {
                component_type: "pubsub.redis".to_string(),
                component_name: "events".to_string(),
                uri: "notifications".to_string(),
                ..Default::default()
            },
        );
        config.outputs.insert(
            "state".to_string(),
            Component {
                component_type: "state.redis".to_string(),
                component_name: "store".to_string(),
                ..Default::default()
            },
        );

        let messaging = Arc::new(RecordingMessaging::default());
        let ctx = context(config, Some(messaging.clone() as Arc<dyn Messaging>));

        ctx.send("audit", "a").await.unwrap();
        ctx.send("notify", "n").await.unwrap();

        assert_eq!(
            *messaging.calls.lock().unwrap(),
            vec![
                "binding audit-log create a".to_string(),
                "publish events/notifications n".to_string()
            ]
        );

        assert!(matches!(
            ctx.send("state", "s").await,
            Err(MessagingError::UnsupportedComponent { .. })
        ));
        assert!(matches!(
            ctx.send("missing", "m").await,
            Err(MessagingError::UnknownOutput(name)) if name == "missing"
        ));
    }

    #[tokio::test]
    async fn test_send_without_messaging() {
        let ctx = context(RuntimeConfig::default(), None);
        assert!(matches!(
            ctx.send("any", "x").await,
            Err(MessagingError::Unavailable)
        ));
    }
}
