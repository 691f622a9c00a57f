//! Reactive Runtime
//!
//! The runtime is one reactive scope. It owns the active-computation context
//! and the dependency registry, and it is the factory for reactive objects and
//! the entry point for running computations.
//!
//! # How It Works
//!
//! 1. [`Runtime::watch`] pushes the computation onto the context and runs it
//!    once.
//!
//! 2. Every [`Reactive::get`] performed during that run resolves the property's
//!    subscriber set in the registry and subscribes the computation.
//!
//! 3. A later [`Reactive::set`] stores the value and re-runs every subscriber
//!    of that property, synchronously, before returning.
//!
//! # Thread Safety
//!
//! A runtime is `Send + Sync`. Each public operation holds the runtime's
//! re-entrant scope lock for its whole duration, so operations issued from
//! different threads run one after another while nested calls made by a
//! running computation on the same thread go straight through. A computation
//! must not block on another thread that uses the same runtime.
//!
//! Independent runtimes share nothing. The free functions [`reactive`] and
//! [`watch`] use a per-thread default runtime.
//!
//! # Ownership
//!
//! The runtime owns its subscribers, and subscribers usually own the objects
//! they read. Objects therefore only keep a [`WeakRuntime`]: dropping the last
//! `Runtime` handle frees the registry, every subscriber and every object
//! that nothing outside the scope still holds.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex, ReentrantMutexGuard};
use serde_json::Value;

use super::context::ReactiveContext;
use super::dependency::Dependency;
use super::object::{kind_of, Reactive, Target, TargetId};
use super::registry::Registry;
use super::subscriber::Computation;
use crate::config::RuntimeConfig;
use crate::error::{ReactiveError, Result};

thread_local! {
    static DEFAULT_RUNTIME: Runtime = Runtime::new();
}

struct RuntimeInner {
    scope: ReentrantMutex<()>,
    context: ReactiveContext,
    registry: Mutex<Registry>,
}

/// Handle to a reactive scope. Clones refer to the same scope.
#[derive(Clone)]
pub struct Runtime {
    inner: Arc<RuntimeInner>,
}

/// Non-owning handle to a runtime, held by the objects it created.
#[derive(Clone)]
pub(crate) struct WeakRuntime {
    inner: Weak<RuntimeInner>,
}

impl WeakRuntime {
    pub(crate) fn upgrade(&self) -> Option<Runtime> {
        self.inner.upgrade().map(|inner| Runtime { inner })
    }
}

impl Runtime {
    /// Create a runtime with the default configuration.
    pub fn new() -> Self {
        Self::build(RuntimeConfig::default())
    }

    /// Create a runtime after validating `config`.
    pub fn with_config(config: RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: RuntimeConfig) -> Self {
        tracing::debug!(?config, "creating reactive runtime");
        let context = ReactiveContext::new(config);
        Self {
            inner: Arc::new(RuntimeInner {
                scope: ReentrantMutex::new(()),
                registry: Mutex::new(Registry::new(context.clone())),
                context,
            }),
        }
    }

    /// The default runtime of the calling thread.
    pub fn thread_default() -> Self {
        DEFAULT_RUNTIME.with(Runtime::clone)
    }

    /// The configuration this runtime was built with.
    pub fn config(&self) -> &RuntimeConfig {
        self.inner.context.config()
    }

    /// Wrap a plain object so its property reads and writes are tracked.
    ///
    /// Fails with [`ReactiveError::InvalidTarget`] for anything that is not a
    /// JSON object.
    pub fn reactive(&self, value: Value) -> Result<Reactive> {
        match value {
            Value::Object(fields) => Ok(Reactive::new(Target::new(fields), self.downgrade())),
            other => Err(ReactiveError::InvalidTarget {
                found: kind_of(&other),
            }),
        }
    }

    /// Run `f` once now and again whenever a property it read is written.
    pub fn watch<F>(&self, f: F) -> Result<()>
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.watch_computation(Computation::new(f))
    }

    /// Like [`Runtime::watch`], for an existing computation.
    ///
    /// Watching the same computation twice subscribes it once per property.
    pub fn watch_computation(&self, computation: Computation) -> Result<()> {
        let _scope = self.enter_scope();
        self.inner.context.run(&computation)?;
        Ok(())
    }

    /// Whether a computation is running on this runtime right now.
    pub fn is_tracking(&self) -> bool {
        self.inner.context.is_active()
    }

    /// Forget every subscriber set of `reactive`.
    pub fn release(&self, reactive: &Reactive) -> bool {
        let released = self.inner.registry.lock().remove(reactive.id());
        if released {
            tracing::debug!(target_id = %reactive.id(), "released reactive target");
        }
        released
    }

    /// Drop registry entries of objects that no longer exist.
    pub fn purge(&self) -> usize {
        self.inner.registry.lock().purge()
    }

    /// Number of objects with at least one tracked property.
    pub fn tracked_targets(&self) -> usize {
        self.inner.registry.lock().target_count()
    }

    /// Number of tracked properties on `reactive`.
    pub fn tracked_properties(&self, reactive: &Reactive) -> usize {
        self.inner.registry.lock().property_count(reactive.id())
    }

    /// Whether both handles refer to the same runtime.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn downgrade(&self) -> WeakRuntime {
        WeakRuntime {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub(crate) fn enter_scope(&self) -> ReentrantMutexGuard<'_, ()> {
        self.inner.scope.lock()
    }

    pub(crate) fn dependency(&self, target: &Arc<Target>, key: &str) -> Dependency {
        self.inner.registry.lock().get_or_create(target, key)
    }

    pub(crate) fn existing_dependency(&self, id: TargetId, key: &str) -> Option<Dependency> {
        self.inner.registry.lock().get(id, key)
    }
}

impl Default for Runtime {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("config", self.config())
            .field("tracked_targets", &self.tracked_targets())
            .field("tracking", &self.is_tracking())
            .finish()
    }
}

/// Wrap a plain object in the calling thread's default runtime.
pub fn reactive(value: Value) -> Result<Reactive> {
    Runtime::thread_default().reactive(value)
}

/// Run `f` in the calling thread's default runtime. See [`Runtime::watch`].
pub fn watch<F>(f: F) -> Result<()>
where
    F: Fn() + Send + Sync + 'static,
{
    Runtime::thread_default().watch(f)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicI32, Ordering};

    #[test]
    fn rejects_non_object_targets() {
        let runtime = Runtime::new();

        for (value, kind) in [
            (json!(1), "number"),
            (json!("jay"), "string"),
            (json!([1, 2]), "array"),
            (json!(null), "null"),
            (json!(true), "boolean"),
        ] {
            match runtime.reactive(value) {
                Err(ReactiveError::InvalidTarget { found }) => assert_eq!(found, kind),
                other => panic!("expected InvalidTarget, got {other:?}"),
            }
        }
        assert_eq!(runtime.tracked_targets(), 0);
    }

    #[test]
    fn with_config_validates() {
        let err = Runtime::with_config(RuntimeConfig::default().with_max_depth(0)).unwrap_err();
        assert!(matches!(err, ReactiveError::InvalidConfig { .. }));

        let runtime = Runtime::with_config(RuntimeConfig::default().with_max_depth(4)).unwrap();
        assert_eq!(runtime.config().max_depth, 4);
    }

    #[test]
    fn watch_runs_immediately_and_tracks() {
        let runtime = Runtime::new();
        let obj = runtime.reactive(json!({ "name": "jay" })).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        let (reader, runs_clone) = (obj.clone(), runs.clone());
        runtime
            .watch(move || {
                reader.get("name");
                runs_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(obj.subscriber_count("name"), 1);
        assert!(!runtime.is_tracking());

        obj.set("name", "kobe").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn runtimes_are_isolated() {
        let first = Runtime::new();
        let second = Runtime::new();
        let obj = first.reactive(json!({ "name": "jay" })).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        // Reads of a first-runtime object inside a second-runtime computation
        // are not attributed to it.
        let (reader, runs_clone) = (obj.clone(), runs.clone());
        second
            .watch(move || {
                reader.get("name");
                runs_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        obj.set("name", "kobe").unwrap();

        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(obj.subscriber_count("name"), 0);
        assert_eq!(second.tracked_targets(), 0);
    }

    #[test]
    fn thread_default_is_shared_per_thread() {
        let a = Runtime::thread_default();
        let b = Runtime::thread_default();
        assert!(a.ptr_eq(&b));

        let other = std::thread::spawn(Runtime::thread_default).join().unwrap();
        assert!(!a.ptr_eq(&other));
    }

    #[test]
    fn free_functions_use_thread_default() {
        let obj = reactive(json!({ "count": 0 })).unwrap();
        let seen = Arc::new(AtomicI32::new(-1));

        let (reader, seen_clone) = (obj.clone(), seen.clone());
        watch(move || {
            let count = reader.get_as::<i32>("count").unwrap().unwrap_or(-1);
            seen_clone.store(count, Ordering::SeqCst);
        })
        .unwrap();

        obj.set("count", 7).unwrap();

        let owner = obj.runtime().unwrap();
        assert!(owner.ptr_eq(&Runtime::thread_default()));
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn release_drops_subscriptions() {
        let runtime = Runtime::new();
        let obj = runtime.reactive(json!({ "name": "jay" })).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        let (reader, runs_clone) = (obj.clone(), runs.clone());
        runtime
            .watch(move || {
                reader.get("name");
                runs_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        assert_eq!(runtime.tracked_properties(&obj), 1);

        assert!(obj.dispose());
        assert!(!runtime.release(&obj));
        assert_eq!(runtime.tracked_targets(), 0);

        obj.set("name", "kobe").unwrap();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn dropping_runtime_frees_subscribed_scope() {
        let runtime = Runtime::new();
        let scope = Arc::downgrade(&runtime.inner);
        let obj = runtime.reactive(json!({ "name": "jay" })).unwrap();

        // The subscriber owns a handle to the object it reads.
        let reader = obj.clone();
        runtime
            .watch(move || {
                reader.get("name");
            })
            .unwrap();
        assert_eq!(runtime.tracked_properties(&obj), 1);

        drop(obj);
        drop(runtime);

        assert!(scope.upgrade().is_none());
    }

    #[test]
    fn objects_outlive_their_runtime_untracked() {
        let runtime = Runtime::new();
        let obj = runtime.reactive(json!({ "name": "jay" })).unwrap();
        let runs = Arc::new(AtomicI32::new(0));

        let (reader, runs_clone) = (obj.clone(), runs.clone());
        runtime
            .watch(move || {
                reader.get("name");
                runs_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        drop(runtime);

        assert!(obj.runtime().is_none());
        obj.set("name", "kobe").unwrap();
        obj.update("age", |_| json!(30)).unwrap();

        assert_eq!(obj.get("name"), Some(json!("kobe")));
        assert_eq!(obj.get("age"), Some(json!(30)));
        assert_eq!(obj.subscriber_count("name"), 0);
        assert!(!obj.dispose());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn writes_from_other_threads_notify() {
        let runtime = Runtime::new();
        let obj = runtime.reactive(json!({ "count": 0 })).unwrap();
        let total = Arc::new(AtomicI32::new(0));

        let (reader, total_clone) = (obj.clone(), total.clone());
        runtime
            .watch(move || {
                let count = reader.get_as::<i32>("count").unwrap().unwrap_or(0);
                total_clone.fetch_add(count, Ordering::SeqCst);
            })
            .unwrap();

        let handles: Vec<_> = (1..=4)
            .map(|n| {
                let writer = obj.clone();
                std::thread::spawn(move || writer.set("count", n).unwrap())
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        // Each write re-ran the computation exactly once with its own value.
        assert_eq!(total.load(Ordering::SeqCst), 1 + 2 + 3 + 4);
    }
}
