//! Depwatch Core
//!
//! A fine-grained reactive dependency-tracking engine. Computations registered
//! with [`watch`] re-run automatically whenever a property they read from a
//! [`Reactive`] object is written.
//!
//! - Reads are intercepted to record which computation depends on which
//!   property of which object.
//! - Writes are intercepted to re-run exactly the computations that read that
//!   property, synchronously, before the write returns.
//! - The currently running computation is tracked on a stack, so nested and
//!   repeated runs are attributed correctly.
//!
//! Nothing is batched or deferred, and derived values are not cached.
//!
//! # Architecture
//!
//! - `reactive`: computations, subscriber sets, the registry, reactive objects
//!   and the runtime that ties them together
//! - `config`: per-runtime settings for failure handling and recursion guards
//! - `error`: error types
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use parking_lot::Mutex;
//! use depwatch_core::{reactive, watch};
//! use serde_json::json;
//!
//! let obj = reactive(json!({ "name": "james", "height": 1.88 })).unwrap();
//! let log = Arc::new(Mutex::new(Vec::new()));
//!
//! let (reader, sink) = (obj.clone(), log.clone());
//! watch(move || {
//!     sink.lock().push(reader.get("name").unwrap());
//! })
//! .unwrap();
//!
//! obj.set("name", "eason").unwrap();
//! obj.set("height", 1.90).unwrap();
//!
//! assert_eq!(*log.lock(), vec![json!("james"), json!("eason")]);
//! ```

pub mod config;
pub mod error;
pub mod reactive;

pub use config::{FailurePolicy, RuntimeConfig};
pub use error::{ComputationFailure, ReactiveError, Result};
pub use reactive::{
    reactive, watch, Computation, Dependency, PropertyKey, Reactive, ReactiveContext, Runtime,
    SubscriberId, TargetId,
};
