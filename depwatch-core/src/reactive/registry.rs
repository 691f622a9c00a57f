//! Dependency Registry
//!
//! Maps (target, property) pairs to their [`Dependency`]. Lookups are
//! two-level: first by target identity, then by property key. Both levels are
//! filled in lazily on first access.
//!
//! # Ownership
//!
//! The registry never keeps a target alive. Each entry holds a `Weak`
//! reference to its target; entries whose target has been dropped are swept
//! by [`Registry::purge`], which also runs automatically as new targets are
//! registered. A target can still be kept alive indirectly when one of its
//! own subscribers captures a handle to it, which is what
//! [`Registry::remove`] is for. Dropping the runtime drops the registry and
//! frees such targets as well, since objects never own their runtime.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use indexmap::IndexMap;

use super::context::ReactiveContext;
use super::dependency::Dependency;
use super::object::{Target, TargetId};
use super::PropertyKey;

/// Registered targets below which no automatic sweep is attempted.
const MIN_SWEEP_THRESHOLD: usize = 16;

struct TargetEntry {
    target: Weak<Target>,
    properties: IndexMap<PropertyKey, Dependency>,
}

/// The store of all subscriber sets in one runtime.
pub(crate) struct Registry {
    targets: HashMap<TargetId, TargetEntry>,
    context: ReactiveContext,
    /// Target count that triggers the next automatic sweep.
    next_sweep: usize,
}

impl Registry {
    pub(crate) fn new(context: ReactiveContext) -> Self {
        Self {
            targets: HashMap::new(),
            context,
            next_sweep: MIN_SWEEP_THRESHOLD,
        }
    }

    /// Look up the subscriber set for `key` on `target`, creating it if needed.
    ///
    /// The same (target, key) pair always yields the same set.
    pub(crate) fn get_or_create(&mut self, target: &Arc<Target>, key: &str) -> Dependency {
        let id = target.id();

        if !self.targets.contains_key(&id) && self.targets.len() >= self.next_sweep {
            self.purge();
            self.next_sweep = (self.targets.len() * 2).max(MIN_SWEEP_THRESHOLD);
        }

        let entry = self.targets.entry(id).or_insert_with(|| {
            tracing::debug!(target_id = %id, "registering reactive target");
            TargetEntry {
                target: Arc::downgrade(target),
                properties: IndexMap::new(),
            }
        });

        if let Some(dependency) = entry.properties.get(key) {
            return dependency.clone();
        }

        let key: PropertyKey = key.into();
        let dependency = Dependency::new(key.clone(), self.context.clone());
        entry.properties.insert(key, dependency.clone());
        dependency
    }

    /// Look up an existing subscriber set without creating one.
    pub(crate) fn get(&self, id: TargetId, key: &str) -> Option<Dependency> {
        self.targets.get(&id)?.properties.get(key).cloned()
    }

    /// Drop entries whose target no longer exists. Returns how many were dropped.
    pub(crate) fn purge(&mut self) -> usize {
        let before = self.targets.len();
        self.targets.retain(|_, entry| entry.target.strong_count() > 0);
        let removed = before - self.targets.len();

        if removed > 0 {
            tracing::debug!(removed, remaining = self.targets.len(), "swept reclaimed targets");
        }
        removed
    }

    /// Forget every subscriber set of `id`.
    pub(crate) fn remove(&mut self, id: TargetId) -> bool {
        self.targets.remove(&id).is_some()
    }

    pub(crate) fn target_count(&self) -> usize {
        self.targets.len()
    }

    /// Number of tracked properties on `id`.
    pub(crate) fn property_count(&self, id: TargetId) -> usize {
        self.targets
            .get(&id)
            .map(|entry| entry.properties.len())
            .unwrap_or(0)
    }
}
