//! Serving runtimes.
//!
//! Both runtimes drive the same invocation pipeline (pre hooks, function,
//! post hooks, output defaulting) and share one lifecycle: `start` serves
//! until the shutdown token fires, `close` releases the messaging handle and
//! then stops the listener.

mod asynchronous;
mod routes;
mod synchronous;

pub use asynchronous::{AsyncRuntime, CallbackService};
pub use synchronous::SyncRuntime;

use crate::context::Context;
use crate::error::{HandlerFault, InvokeError, Result, RuntimeError};
use crate::function::OpenFunction;
use crate::messaging::Messaging;
use crate::output::Output;
use async_trait::async_trait;
use bytes::Bytes;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Upper bound for in-flight invocations to finish once the listener stops
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

/// A serving mode of the invoker
#[async_trait]
pub trait Runtime: Send + Sync {
    /// Serve until `shutdown` is cancelled, [`Runtime::close`] is called or a
    /// fatal error occurs
    async fn start(&self, shutdown: CancellationToken) -> Result<()>;

    /// Release resources. Idempotent, and safe to call without a prior start.
    async fn close(&self);
}

/// Resources shared by a runtime and its in-flight invocations
pub(crate) struct Lifecycle {
    messaging: OnceLock<Arc<dyn Messaging>>,
    closed: AtomicBool,
    listener: CancellationToken,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self {
            messaging: OnceLock::new(),
            closed: AtomicBool::new(false),
            listener: CancellationToken::new(),
        }
    }

    /// Install a messaging handle unless one is already set
    pub(crate) fn set_messaging(&self, messaging: Arc<dyn Messaging>) {
        if self.messaging.set(messaging).is_err() {
            warn!("Messaging handle already installed, keeping the first one");
        }
    }

    pub(crate) fn messaging(&self) -> Option<Arc<dyn Messaging>> {
        self.messaging.get().cloned()
    }

    pub(crate) fn messaging_or_init<F>(&self, init: F) -> Arc<dyn Messaging>
    where
        F: FnOnce() -> Arc<dyn Messaging>,
    {
        self.messaging.get_or_init(init).clone()
    }

    /// Token cancelled when the listener must stop
    pub(crate) fn listener(&self) -> &CancellationToken {
        &self.listener
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Close the messaging handle, then stop the listener. Runs once.
    pub(crate) async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }

        if let Some(messaging) = self.messaging.get() {
            messaging.close().await;
        }
        self.listener.cancel();
        info!("Runtime closed");
    }
}

/// Wait for `shutdown`, a call to close or the end of `server`, then close
/// the lifecycle and let the server drain
pub(crate) async fn serve_until<E>(
    lifecycle: &Lifecycle,
    shutdown: CancellationToken,
    mut server: JoinHandle<std::result::Result<(), E>>,
) -> Result<()>
where
    RuntimeError: From<E>,
{
    let finished = tokio::select! {
        _ = shutdown.cancelled() => {
            info!("Shutdown requested");
            None
        }
        _ = lifecycle.listener().cancelled() => None,
        result = &mut server => Some(result),
    };

    lifecycle.close().await;

    let result = match finished {
        Some(result) => result,
        None => match tokio::time::timeout(SHUTDOWN_TIMEOUT, &mut server).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "Listener did not drain within {:?}, aborting in-flight requests",
                    SHUTDOWN_TIMEOUT
                );
                server.abort();
                return Ok(());
            }
        },
    };

    match result {
        Ok(served) => served.map_err(RuntimeError::from),
        Err(e) => Err(RuntimeError::Io(std::io::Error::other(e))),
    }
}

/// Run `invocation`, turning a panic into a fault
pub(crate) async fn guarded<T, F>(invocation: F) -> std::result::Result<T, HandlerFault>
where
    F: Future<Output = std::result::Result<T, HandlerFault>>,
{
    AssertUnwindSafe(invocation)
        .catch_unwind()
        .await
        .unwrap_or_else(|payload| Err(HandlerFault::from_panic(payload)))
}

/// Record a functional error in the output envelope and surface faults
pub(crate) fn absorb(ctx: &mut Context, error: InvokeError) -> std::result::Result<(), HandlerFault> {
    match error {
        InvokeError::Functional(error) => {
            info!("Function {} reported an error: {}", ctx.function_name(), error);
            match ctx.output_mut() {
                Some(output) if output.error().is_none() => output.set_error(Some(error)),
                Some(_) => {}
                None => ctx.set_output(Output::from_error(error)),
            }
            Ok(())
        }
        InvokeError::Fault(fault) => Err(fault),
    }
}

/// Run the pre hooks. Returns `false` when a functional error was recorded
/// and the function must be skipped.
pub(crate) async fn run_pre_hooks(ctx: &mut Context) -> std::result::Result<bool, HandlerFault> {
    match ctx.execute_pre_hooks().await {
        Ok(()) => Ok(true),
        Err(error) => absorb(ctx, error).map(|_| false),
    }
}

pub(crate) async fn run_post_hooks(ctx: &mut Context) -> std::result::Result<(), HandlerFault> {
    match ctx.execute_post_hooks().await {
        Ok(()) => Ok(()),
        Err(error) => absorb(ctx, error),
    }
}

/// Full pipeline of a byte-in, byte-out function, up to (excluding) defaulting
pub(crate) async fn invoke_open(
    function: &dyn OpenFunction,
    ctx: &mut Context,
    payload: Bytes,
) -> std::result::Result<(), HandlerFault> {
    if !run_pre_hooks(ctx).await? {
        return Ok(());
    }

    match function.accept(ctx, payload).await {
        Ok(output) => ctx.set_output(output),
        Err(error) => absorb(ctx, error)?,
    }

    run_post_hooks(ctx).await
}
