//! Reactive Objects
//!
//! A [`Reactive`] wraps a plain key/value object so that every property read
//! and write goes through the runtime:
//!
//! - a read resolves the property's subscriber set, subscribes the current
//!   computation (if any), then returns the stored value unchanged;
//! - a write stores the new value first, then notifies the property's
//!   subscriber set, so notified computations observe the new value.
//!
//! Writes are never compared against the previous value: storing an equal
//! value still notifies every subscriber.
//!
//! An object only holds a weak handle to its runtime. Subscribers routinely
//! capture the objects they read, and the runtime owns its subscribers, so a
//! strong handle would keep the whole scope alive forever. Once the runtime
//! is gone, reads are plain reads and writes notify nobody.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

use super::runtime::{Runtime, WeakRuntime};
use crate::error::{ReactiveError, Result};

/// Identity of a wrapped object. Never reused within a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TargetId(u64);

impl TargetId {
    fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for TargetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "target#{}", self.0)
    }
}

/// The underlying plain object.
pub(crate) struct Target {
    id: TargetId,
    fields: RwLock<Map<String, Value>>,
}

impl Target {
    pub(crate) fn new(fields: Map<String, Value>) -> Self {
        Self {
            id: TargetId::new(),
            fields: RwLock::new(fields),
        }
    }

    pub(crate) fn id(&self) -> TargetId {
        self.id
    }
}

/// Name of a JSON value's kind, for error messages.
pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A tracked view of a plain object.
///
/// Created by [`Runtime::reactive`]. Clones share the same underlying object
/// and the same subscriber sets.
///
/// # Example
///
/// ```rust
/// use depwatch_core::Runtime;
/// use serde_json::json;
///
/// let runtime = Runtime::new();
/// let user = runtime.reactive(json!({ "name": "james" })).unwrap();
///
/// let reader = user.clone();
/// runtime.watch(move || {
///     println!("hello {}", reader.get("name").unwrap());
/// }).unwrap();
///
/// // Re-runs the computation above.
/// user.set("name", "eason").unwrap();
/// ```
#[derive(Clone)]
pub struct Reactive {
    target: Arc<Target>,
    runtime: WeakRuntime,
}

impl Reactive {
    pub(crate) fn new(target: Target, runtime: WeakRuntime) -> Self {
        Self {
            target: Arc::new(target),
            runtime,
        }
    }

    /// Get the object's identity.
    pub fn id(&self) -> TargetId {
        self.target.id()
    }

    /// The runtime this object reports to, unless it has been dropped.
    pub fn runtime(&self) -> Option<Runtime> {
        self.runtime.upgrade()
    }

    /// Read a property, subscribing the current computation to it.
    ///
    /// A missing property is still tracked, so a computation that reads it
    /// re-runs once it is first assigned.
    pub fn get(&self, key: &str) -> Option<Value> {
        let Some(runtime) = self.runtime.upgrade() else {
            return self.get_untracked(key);
        };
        let _scope = runtime.enter_scope();

        runtime.dependency(&self.target, key).track_if_active();

        self.target.fields.read().get(key).cloned()
    }

    /// Read a property and deserialize it into `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        self.get(key)
            .map(|value| {
                serde_json::from_value(value).map_err(|source| ReactiveError::Conversion {
                    key: key.into(),
                    source,
                })
            })
            .transpose()
    }

    /// Read a property without subscribing anything.
    pub fn get_untracked(&self, key: &str) -> Option<Value> {
        self.target.fields.read().get(key).cloned()
    }

    /// Write a property, then notify its subscribers.
    ///
    /// The value is stored even when the returned error reports failing
    /// subscribers.
    pub fn set(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        let Some(runtime) = self.runtime.upgrade() else {
            tracing::trace!(target_id = %self.id(), key, "runtime dropped; write not tracked");
            self.target.fields.write().insert(key.to_owned(), value.into());
            return Ok(());
        };
        let _scope = runtime.enter_scope();

        self.target.fields.write().insert(key.to_owned(), value.into());

        runtime.dependency(&self.target, key).notify()
    }

    /// Serialize `value` and write it with [`Reactive::set`].
    pub fn set_serialized<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let value = serde_json::to_value(value).map_err(|source| ReactiveError::Conversion {
            key: key.into(),
            source,
        })?;
        self.set(key, value)
    }

    /// Replace a property with a value computed from its current one.
    ///
    /// The current value is read untracked, so calling this from inside a
    /// computation does not subscribe it to `key`.
    pub fn update<F>(&self, key: &str, f: F) -> Result<()>
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let runtime = self.runtime.upgrade();
        let _scope = runtime.as_ref().map(Runtime::enter_scope);

        let current = self.get_untracked(key);
        self.set(key, f(current.as_ref()))
    }

    /// Whether the object has `key`. Not tracked.
    pub fn contains_key(&self, key: &str) -> bool {
        self.target.fields.read().contains_key(key)
    }

    /// Property names in storage order. Not tracked.
    pub fn keys(&self) -> Vec<String> {
        self.target.fields.read().keys().cloned().collect()
    }

    /// A copy of the whole plain object. Not tracked.
    pub fn snapshot(&self) -> Value {
        Value::Object(self.target.fields.read().clone())
    }

    /// Number of subscribers currently registered on `key`.
    pub fn subscriber_count(&self, key: &str) -> usize {
        self.runtime
            .upgrade()
            .and_then(|runtime| runtime.existing_dependency(self.id(), key))
            .map(|dependency| dependency.len())
            .unwrap_or(0)
    }

    /// Drop every subscriber set of this object from the runtime.
    ///
    /// Needed when a subscriber captures a handle to this object: the
    /// registry then keeps the object alive through its own subscribers for
    /// as long as the runtime exists. Returns `false` if nothing was tracked
    /// or the runtime is already gone.
    pub fn dispose(&self) -> bool {
        self.runtime
            .upgrade()
            .is_some_and(|runtime| runtime.release(self))
    }

    /// Whether both handles wrap the same object.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.target, &other.target)
    }
}

impl fmt::Debug for Reactive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reactive")
            .field("id", &self.id())
            .field("fields", &*self.target.fields.read())
            .finish()
    }
}
