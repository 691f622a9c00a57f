//! Reactive Context
//!
//! The reactive context tracks which computation is currently running.
//! This enables automatic dependency tracking: when a property is read,
//! the current computation is registered as a dependent.
//!
//! # Implementation
//!
//! Each context keeps a stack of running computations. Entering a
//! computation pushes it, and the returned [`ContextGuard`] pops it when
//! dropped, so the stack is restored on every exit path including panics.
//! The current computation is always the top of the stack, which makes
//! nested runs (a computation calling `watch`) restore the outer one.
//!
//! Contexts are owned by a [`Runtime`](super::Runtime) rather than stored in
//! a global, so independent runtimes never see each other's computations.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::Mutex;
use smallvec::SmallVec;

use super::subscriber::{Computation, SubscriberId};
use crate::config::{FailurePolicy, RuntimeConfig};
use crate::error::ComputationFailure;

/// Stack of running computations. Most chains are shallow.
type ActiveStack = SmallVec<[Computation; 4]>;

struct ContextInner {
    stack: Mutex<ActiveStack>,
    config: RuntimeConfig,
}

/// The active-computation tracker for one reactive scope.
///
/// Cloning yields another handle to the same stack.
#[derive(Clone)]
pub struct ReactiveContext {
    inner: Arc<ContextInner>,
}

impl ReactiveContext {
    /// Create an empty context governed by `config`.
    pub fn new(config: RuntimeConfig) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                stack: Mutex::new(SmallVec::new()),
                config,
            }),
        }
    }

    /// The failure and recursion settings applied by [`ReactiveContext::run`].
    pub fn config(&self) -> &RuntimeConfig {
        &self.inner.config
    }

    /// The computation currently running, if any.
    pub fn current(&self) -> Option<Computation> {
        self.inner.stack.lock().last().cloned()
    }

    /// Check if there is an active computation.
    pub fn is_active(&self) -> bool {
        !self.inner.stack.lock().is_empty()
    }

    /// Number of computations currently on the stack.
    pub fn depth(&self) -> usize {
        self.inner.stack.lock().len()
    }

    /// Whether `id` is anywhere on the stack.
    pub fn is_running(&self, id: SubscriberId) -> bool {
        self.inner.stack.lock().iter().any(|c| c.id() == id)
    }

    /// Make `computation` the current one until the guard is dropped.
    pub fn enter(&self, computation: Computation) -> ContextGuard {
        let id = computation.id();
        self.inner.stack.lock().push(computation);
        tracing::trace!(subscriber = %id, "entered reactive context");

        ContextGuard {
            context: self.clone(),
            id,
        }
    }

    /// Run `computation` once as the current computation.
    ///
    /// Reads performed during the run are attributed to it. The previous
    /// current computation is restored afterwards, whatever the outcome.
    pub fn run(&self, computation: &Computation) -> Result<(), ComputationFailure> {
        let id = computation.id();
        let config = &self.inner.config;

        if config.cycle_guard && self.is_running(id) {
            tracing::warn!(subscriber = %id, "computation triggered itself; skipping re-entry");
            return Err(ComputationFailure::Cycle { id });
        }

        let depth = self.depth();
        if depth >= config.max_depth {
            tracing::warn!(subscriber = %id, depth, "active computation depth limit reached");
            return Err(ComputationFailure::DepthExceeded { id, depth });
        }

        let _guard = self.enter(computation.clone());

        match config.failure_policy {
            FailurePolicy::Propagate => {
                computation.invoke();
                Ok(())
            }
            FailurePolicy::Isolate => panic::catch_unwind(AssertUnwindSafe(|| computation.invoke()))
                .map_err(|payload| {
                    let message = panic_message(payload.as_ref());
                    tracing::warn!(subscriber = %id, %message, "computation panicked");
                    ComputationFailure::Panicked { id, message }
                }),
        }
    }
}

impl Default for ReactiveContext {
    fn default() -> Self {
        Self::new(RuntimeConfig::default())
    }
}

impl std::fmt::Debug for ReactiveContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReactiveContext")
            .field("depth", &self.depth())
            .field("config", &self.inner.config)
            .finish()
    }
}

/// Guard that pops the context when dropped.
pub struct ContextGuard {
    context: ReactiveContext,
    id: SubscriberId,
}

impl Drop for ContextGuard {
    fn drop(&mut self) {
        let popped = self.context.inner.stack.lock().pop();
        tracing::trace!(subscriber = %self.id, "exited reactive context");

        // Guards are strictly nested, so the top must be ours.
        if let Some(entry) = popped {
            debug_assert_eq!(
                entry.id(),
                self.id,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.id,
                entry.id()
            );
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
