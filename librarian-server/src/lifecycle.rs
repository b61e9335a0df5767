//! Process lifecycle coordinator
//!
//! ```text
//! Uninitialized -> Starting -> Running -> Stopping -> Stopped
//! ```
//!
//! Components register `on_stop` hooks while starting. [`Lifecycle::stop`]
//! runs them once, in reverse registration order, however many callers
//! trigger it.
//!
//! A running server holds a [`ServingGuard`]. While it is held, `stop()`
//! only moves to `Stopping` and waits; hooks run once the server has
//! stopped accepting and released the guard.

use std::error::Error as StdError;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};

use futures::future::BoxFuture;
use futures::FutureExt;
use thiserror::Error;
use tokio::sync::{watch, OnceCell};
use tracing::{debug, error, info, warn};

pub type HookError = Box<dyn StdError + Send + Sync>;

/// Result of a shutdown hook
pub type HookResult = Result<(), HookError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Uninitialized,
    Starting,
    Running,
    Stopping,
    Stopped,
}

impl LifecycleState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Starting => "starting",
            Self::Running => "running",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    #[error("invalid lifecycle transition from {from} to {to}")]
    InvalidTransition {
        from: LifecycleState,
        to: LifecycleState,
    },
}

struct Hook {
    name: &'static str,
    run: Box<dyn FnOnce() -> BoxFuture<'static, HookResult> + Send>,
}

struct Inner {
    state: watch::Sender<LifecycleState>,
    hooks: Mutex<Vec<Hook>>,
    serving: watch::Sender<bool>,
    stopped: OnceCell<()>,
}

/// Shared lifecycle coordinator. Clones observe the same state.
#[derive(Clone)]
pub struct Lifecycle {
    inner: Arc<Inner>,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        let (state, _) = watch::channel(LifecycleState::Uninitialized);
        let (serving, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                state,
                hooks: Mutex::new(Vec::new()),
                serving,
                stopped: OnceCell::new(),
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// `Uninitialized -> Starting`
    pub fn begin_start(&self) -> Result<(), LifecycleError> {
        self.transition(&[LifecycleState::Uninitialized], LifecycleState::Starting)
    }

    /// `Starting -> Running`
    pub fn mark_running(&self) -> Result<(), LifecycleError> {
        self.transition(&[LifecycleState::Starting], LifecycleState::Running)?;
        info!("service running");
        Ok(())
    }

    /// `Running -> Stopping`. Repeated calls while stopping are no-ops.
    pub fn begin_stop(&self) -> Result<(), LifecycleError> {
        let mut result = Ok(false);
        self.inner.state.send_if_modified(|state| match *state {
            LifecycleState::Running => {
                *state = LifecycleState::Stopping;
                result = Ok(true);
                true
            }
            LifecycleState::Stopping | LifecycleState::Stopped => false,
            from => {
                result = Err(LifecycleError::InvalidTransition {
                    from,
                    to: LifecycleState::Stopping,
                });
                false
            }
        });
        if result? {
            info!("service stopping, no longer accepting requests");
        }
        Ok(())
    }

    /// Register a hook to run during [`Lifecycle::stop`].
    pub fn on_stop<F, Fut>(&self, name: &'static str, hook: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = HookResult> + Send + 'static,
    {
        debug!(hook = name, "registered shutdown hook");
        lock_hooks(&self.inner.hooks).push(Hook {
            name,
            run: Box::new(move || hook().boxed()),
        });
    }

    pub fn hook_count(&self) -> usize {
        lock_hooks(&self.inner.hooks).len()
    }

    /// Mark a server as accepting traffic until the guard is dropped.
    pub fn serving_guard(&self) -> ServingGuard {
        self.inner.serving.send_replace(true);
        ServingGuard {
            lifecycle: self.clone(),
        }
    }

    /// Run shutdown hooks and move to `Stopped`.
    ///
    /// With a [`ServingGuard`] alive this begins stopping and waits for the
    /// server to drain and drop it first. Every caller waits for the same
    /// single run. Hook failures are logged and do not stop the remaining
    /// hooks.
    pub async fn stop(&self) {
        if *self.inner.serving.borrow() {
            if let Err(err) = self.begin_stop() {
                warn!(error = %err, "unexpected lifecycle state at stop");
            }
            let mut rx = self.inner.serving.subscribe();
            // The sender lives in `self`, so the channel cannot close here.
            let _ = rx.wait_for(|serving| !serving).await;
        }

        self.inner
            .stopped
            .get_or_init(|| self.run_stop_hooks())
            .await;
    }

    /// Wait until the state is at least `target`.
    pub async fn wait_for(&self, target: LifecycleState) {
        let mut rx = self.inner.state.subscribe();
        // The sender lives in `self`, so the channel cannot close here.
        let _ = rx.wait_for(|state| *state >= target).await;
    }

    async fn run_stop_hooks(&self) {
        self.inner.state.send_if_modified(|state| {
            if *state < LifecycleState::Stopping {
                *state = LifecycleState::Stopping;
                true
            } else {
                false
            }
        });

        let hooks = std::mem::take(&mut *lock_hooks(&self.inner.hooks));
        for hook in hooks.into_iter().rev() {
            match (hook.run)().await {
                Ok(()) => debug!(hook = hook.name, "shutdown hook finished"),
                Err(err) => error!(hook = hook.name, error = %err, "shutdown hook failed"),
            }
        }

        self.inner.state.send_replace(LifecycleState::Stopped);
        info!("service stopped");
    }

    fn transition(
        &self,
        allowed_from: &[LifecycleState],
        to: LifecycleState,
    ) -> Result<(), LifecycleError> {
        let mut result = Ok(());
        self.inner.state.send_if_modified(|state| {
            if allowed_from.contains(state) {
                *state = to;
                true
            } else {
                result = Err(LifecycleError::InvalidTransition { from: *state, to });
                false
            }
        });
        result
    }
}

/// Held by a server while it accepts traffic; see [`Lifecycle::serving_guard`].
pub struct ServingGuard {
    lifecycle: Lifecycle,
}

impl Drop for ServingGuard {
    fn drop(&mut self) {
        self.lifecycle.inner.serving.send_replace(false);
    }
}

fn lock_hooks(hooks: &Mutex<Vec<Hook>>) -> std::sync::MutexGuard<'_, Vec<Hook>> {
    hooks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn walks_the_happy_path() {
        let lifecycle = Lifecycle::new();
        assert_eq!(lifecycle.state(), LifecycleState::Uninitialized);

        lifecycle.begin_start().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Starting);

        lifecycle.mark_running().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Running);

        lifecycle.begin_stop().unwrap();
        lifecycle.begin_stop().unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Stopping);
    }

    #[test]
    fn rejects_skipping_start() {
        let lifecycle = Lifecycle::new();
        assert_eq!(
            lifecycle.mark_running(),
            Err(LifecycleError::InvalidTransition {
                from: LifecycleState::Uninitialized,
                to: LifecycleState::Running,
            })
        );
        assert!(lifecycle.begin_stop().is_err());

        lifecycle.begin_start().unwrap();
        assert!(lifecycle.begin_start().is_err());
    }

    #[tokio::test]
    async fn hooks_run_in_reverse_order() {
        let lifecycle = Lifecycle::new();
        let order = Arc::new(Mutex::new(Vec::new()));

        for name in ["first", "second"] {
            let order = Arc::clone(&order);
            lifecycle.on_stop(name, move || async move {
                order.lock().unwrap().push(name);
                HookResult::Ok(())
            });
        }

        lifecycle.stop().await;
        assert_eq!(*order.lock().unwrap(), vec!["second", "first"]);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn failing_hook_does_not_block_shutdown() {
        let lifecycle = Lifecycle::new();
        let ran = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&ran);
        lifecycle.on_stop("after", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            HookResult::Ok(())
        });
        lifecycle.on_stop("broken", || async { HookResult::Err("disk on fire".into()) });

        lifecycle.stop().await;
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_stop_runs_hooks_once() {
        let lifecycle = Lifecycle::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&calls);
        lifecycle.on_stop("slow", move || async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            HookResult::Ok(())
        });

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let lifecycle = lifecycle.clone();
                tokio::spawn(async move { lifecycle.stop().await })
            })
            .collect();
        for task in tasks {
            task.await.expect("stop task panicked");
        }
        lifecycle.stop().await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn stop_waits_for_the_server_to_release() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start().unwrap();
        lifecycle.mark_running().unwrap();

        let ran = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ran);
        lifecycle.on_stop("database", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            HookResult::Ok(())
        });

        let guard = lifecycle.serving_guard();
        let stopper = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.stop().await })
        };

        lifecycle.wait_for(LifecycleState::Stopping).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ran.load(Ordering::SeqCst), 0);
        assert!(!stopper.is_finished());

        drop(guard);
        stopper.await.unwrap();
        assert_eq!(ran.load(Ordering::SeqCst), 1);
        assert_eq!(lifecycle.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn wait_for_observes_later_transitions() {
        let lifecycle = Lifecycle::new();
        lifecycle.begin_start().unwrap();
        lifecycle.mark_running().unwrap();

        let waiter = {
            let lifecycle = lifecycle.clone();
            tokio::spawn(async move { lifecycle.wait_for(LifecycleState::Stopping).await })
        };

        lifecycle.begin_stop().unwrap();
        waiter.await.unwrap();
    }
}
