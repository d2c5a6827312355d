//! Process-wide graceful shutdown coordination.
//!
//! One signal object with set-once semantics: the first requested reason
//! wins, later requests are no-ops. Handlers request shutdown on
//! critical unrecoverable failures; the agent processor observes the
//! signal and drains.

use std::sync::Arc;
use std::sync::Mutex;

use futures::future::BoxFuture;
use tokio::sync::Notify;
use tracing::{error, info, warn};

type SyncHook = Box<dyn Fn() + Send + Sync>;
type AsyncHookFactory = Box<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

#[derive(Default)]
struct ShutdownState {
    requested: bool,
    reason: Option<String>,
    sync_hooks: Vec<SyncHook>,
    async_hooks: Vec<AsyncHookFactory>,
}

/// Coordinates one graceful shutdown across the whole process.
pub struct ShutdownManager {
    state: Mutex<ShutdownState>,
    notify: Notify,
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ShutdownManager {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ShutdownState::default()),
            notify: Notify::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Request a graceful shutdown. Idempotent; the first reason is
    /// retained. Sync hooks run inline, in registration order, on the
    /// first request only.
    pub fn request_global_shutdown(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let hooks_to_run: Vec<SyncHook>;
        {
            let mut state = self.state.lock().expect("shutdown state poisoned");
            if state.requested {
                warn!(reason = %reason, "shutdown already requested; ignoring duplicate");
                return;
            }
            state.requested = true;
            state.reason = Some(reason.clone());
            hooks_to_run = std::mem::take(&mut state.sync_hooks);
        }
        error!(reason = %reason, "GRACEFUL SHUTDOWN REQUESTED");
        for hook in &hooks_to_run {
            hook();
        }
        self.notify.notify_waiters();
    }

    pub fn is_global_shutdown_requested(&self) -> bool {
        self.state.lock().expect("shutdown state poisoned").requested
    }

    /// The reason of the first shutdown request, if any.
    pub fn shutdown_reason(&self) -> Option<String> {
        self.state
            .lock()
            .expect("shutdown state poisoned")
            .reason
            .clone()
    }

    /// Wait until a shutdown is requested.
    pub async fn wait_for_shutdown(&self) {
        loop {
            let notified = self.notify.notified();
            if self.is_global_shutdown_requested() {
                return;
            }
            notified.await;
        }
    }

    /// Register a synchronous hook, invoked inline on the first request.
    /// Registering after shutdown was requested runs the hook now.
    pub fn register_shutdown_hook(&self, hook: impl Fn() + Send + Sync + 'static) {
        let run_now = {
            let mut state = self.state.lock().expect("shutdown state poisoned");
            if state.requested {
                true
            } else {
                state.sync_hooks.push(Box::new(hook));
                return;
            }
        };
        if run_now {
            hook();
        }
    }

    /// Register an async hook, executed by [`ShutdownManager::run_async_hooks`]
    /// during the drain phase.
    pub fn register_async_shutdown_hook(
        &self,
        hook: impl Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    ) {
        self.state
            .lock()
            .expect("shutdown state poisoned")
            .async_hooks
            .push(Box::new(hook));
    }

    /// Run registered async hooks in registration order.
    pub async fn run_async_hooks(&self) {
        let hooks: Vec<AsyncHookFactory> = {
            let mut state = self.state.lock().expect("shutdown state poisoned");
            std::mem::take(&mut state.async_hooks)
        };
        info!(count = hooks.len(), "running async shutdown hooks");
        for hook in &hooks {
            hook().await;
        }
    }
}
