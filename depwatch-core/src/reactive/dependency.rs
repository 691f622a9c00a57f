//! Subscriber sets.
//!
//! A [`Dependency`] holds every computation that read one property of one
//! object. Reads add the current computation through
//! [`Dependency::track_if_active`]; writes call [`Dependency::notify`].

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use super::context::ReactiveContext;
use super::subscriber::{Computation, SubscriberId};
use super::PropertyKey;
use crate::error::{ReactiveError, Result};

/// The set of computations subscribed to a single property.
///
/// Members are kept in insertion order and deduplicated by [`SubscriberId`].
/// Cloning yields another handle to the same set.
#[derive(Clone)]
pub struct Dependency {
    key: PropertyKey,
    subscribers: Arc<Mutex<IndexMap<SubscriberId, Computation>>>,
    context: ReactiveContext,
}

impl Dependency {
    /// Create an empty set for `key`, tracking against `context`.
    pub fn new(key: impl Into<PropertyKey>, context: ReactiveContext) -> Self {
        Self {
            key: key.into(),
            subscribers: Arc::new(Mutex::new(IndexMap::new())),
            context,
        }
    }

    /// The property this set belongs to.
    pub fn key(&self) -> &PropertyKey {
        &self.key
    }

    /// Add a subscriber. Returns `false` if it was already present.
    pub fn add(&self, computation: Computation) -> bool {
        let mut subscribers = self.subscribers.lock();
        if subscribers.contains_key(&computation.id()) {
            return false;
        }
        subscribers.insert(computation.id(), computation);
        true
    }

    /// Subscribe the context's current computation, if there is one.
    pub fn track_if_active(&self) -> bool {
        match self.context.current() {
            Some(computation) => {
                let id = computation.id();
                let added = self.add(computation);
                if added {
                    tracing::trace!(key = %self.key, subscriber = %id, "subscribed");
                }
                added
            }
            None => false,
        }
    }

    /// Remove a subscriber. Returns `false` if it was not present.
    pub fn remove(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().shift_remove(&id).is_some()
    }

    /// Re-run every subscriber once, in insertion order.
    ///
    /// The member list is snapshotted first: computations subscribed during
    /// the pass are not invoked until the next one. Each subscriber runs as
    /// the current computation, so it re-tracks whatever it reads.
    ///
    /// Under [`FailurePolicy::Isolate`](crate::FailurePolicy::Isolate) a
    /// failing subscriber does not stop the pass; all failures are returned
    /// together once every subscriber has been visited.
    pub fn notify(&self) -> Result<()> {
        let snapshot: Vec<Computation> = self.subscribers.lock().values().cloned().collect();
        if snapshot.is_empty() {
            return Ok(());
        }

        tracing::debug!(key = %self.key, subscribers = snapshot.len(), "notifying subscribers");

        let failures: Vec<_> = snapshot
            .iter()
            .filter_map(|computation| self.context.run(computation).err())
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(ReactiveError::Notify {
                key: self.key.clone(),
                failures,
            })
        }
    }

    /// Whether `id` is subscribed.
    pub fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    /// Subscriber IDs in notification order.
    pub fn subscribers(&self) -> Vec<SubscriberId> {
        self.subscribers.lock().keys().copied().collect()
    }

    /// Number of subscribers.
    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    /// Whether nothing is subscribed.
    pub fn is_empty(&self) -> bool {
        self.subscribers.lock().is_empty()
    }

    /// Whether both handles refer to the same set.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.subscribers, &other.subscribers)
    }
}

impl std::fmt::Debug for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dependency")
            .field("key", &self.key)
            .field("subscribers", &self.subscribers())
            .finish()
    }
}
