use crate::context::Context;
use crate::error::InvokeResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Hook pair run around every function invocation.
///
/// Plugins are shared by all concurrent invocations and must not keep
/// per-invocation state of their own; anything an invocation needs lives in
/// the [`Context`].
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    fn name(&self) -> &str;

    fn version(&self) -> &str {
        "v1"
    }

    async fn pre_hook(&self, ctx: &mut Context) -> InvokeResult;

    async fn post_hook(&self, ctx: &mut Context) -> InvokeResult;
}

/// Ordered, immutable list of plugins
#[derive(Clone, Default)]
pub struct PluginChain {
    plugins: Arc<[Arc<dyn Plugin>]>,
}

impl PluginChain {
    pub fn new(plugins: Vec<Arc<dyn Plugin>>) -> Self {
        Self {
            plugins: plugins.into(),
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.plugins.iter()
    }
}

impl fmt::Debug for PluginChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.plugins.iter().map(|p| format!("{}@{}", p.name(), p.version())))
            .finish()
    }
}

impl FromIterator<Arc<dyn Plugin>> for PluginChain {
    fn from_iter<T: IntoIterator<Item = Arc<dyn Plugin>>>(iter: T) -> Self {
        Self {
            plugins: iter.into_iter().collect(),
        }
    }
}
