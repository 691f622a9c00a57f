//! Subscriber types for the reactive system.
//!
//! A [`Computation`] is any side-effecting closure whose re-execution is driven
//! by reactive state. Its identity is a [`SubscriberId`], so clones of the same
//! computation count as one subscriber.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Unique identifier for a computation.
///
/// Subscriber sets deduplicate by this ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Generate a new unique subscriber ID.
    ///
    /// Uses an atomic counter to ensure uniqueness across threads.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A reactive computation.
///
/// Cheap to clone; every clone shares the closure and the ID.
#[derive(Clone)]
pub struct Computation {
    id: SubscriberId,
    run: Arc<dyn Fn() + Send + Sync>,
}

impl Computation {
    /// Wrap `run` under a fresh [`SubscriberId`].
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        Self {
            id: SubscriberId::new(),
            run: Arc::new(run),
        }
    }

    /// The computation's identity, shared by all clones.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Call the closure directly, outside of any tracking context.
    pub(crate) fn invoke(&self) {
        (self.run)();
    }
}

impl PartialEq for Computation {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Computation {}

impl Hash for Computation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for Computation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computation").field("id", &self.id).finish()
    }
}
