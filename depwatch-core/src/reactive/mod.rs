//! Reactive Primitives
//!
//! This module implements property-level dependency tracking for plain
//! key/value objects.
//!
//! # Concepts
//!
//! ## Reactive objects
//!
//! A [`Reactive`] wraps a plain object. Reading a property inside a running
//! computation subscribes that computation to the property; writing a property
//! re-runs its subscribers.
//!
//! ## Computations
//!
//! A [`Computation`] is a side-effecting closure. [`watch`] runs it once right
//! away, which is both how it registers its dependencies and its first render.
//!
//! ## Subscriber sets
//!
//! Each (object, property) pair owns exactly one [`Dependency`], the set of
//! computations that read it. This is what makes tracking fine-grained: a
//! computation that only reads `age` never re-runs when `name` changes.
//!
//! # Implementation Notes
//!
//! The active computation is tracked on a stack held by the [`Runtime`], not a
//! global, so nested `watch` calls restore the outer computation and separate
//! runtimes never see each other's reads. Subscriber sets live in a registry
//! keyed by object identity that holds objects weakly.

mod context;
mod dependency;
mod object;
mod registry;
mod runtime;
mod subscriber;

use std::sync::Arc;

pub use context::{ContextGuard, ReactiveContext};
pub use dependency::Dependency;
pub use object::{Reactive, TargetId};
pub use runtime::{reactive, watch, Runtime};
pub use subscriber::{Computation, SubscriberId};

/// Name of a property on a reactive object.
pub type PropertyKey = Arc<str>;
