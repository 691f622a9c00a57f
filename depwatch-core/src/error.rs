//! Error types for the reactive engine.

use crate::reactive::{PropertyKey, SubscriberId};

/// Result alias used throughout the crate.
pub type Result<T, E = ReactiveError> = std::result::Result<T, E>;

/// Why a single computation failed to run.
///
/// A failure is always scoped to one computation. During a notify pass the
/// failures of individual subscribers are collected into
/// [`ReactiveError::Notify`] so the rest of the pass still runs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ComputationFailure {
    /// The computation panicked. The panic payload is rendered into `message`.
    #[error("computation {id} panicked: {message}")]
    Panicked { id: SubscriberId, message: String },

    /// The computation is already running further up the active stack, so
    /// invoking it again would recurse into itself.
    #[error("computation {id} is already running and was not re-entered")]
    Cycle { id: SubscriberId },

    /// The active stack already holds `depth` computations.
    #[error("computation {id} skipped: active depth {depth} reached the configured limit")]
    DepthExceeded { id: SubscriberId, depth: usize },
}

impl ComputationFailure {
    /// The computation this failure belongs to.
    pub fn subscriber_id(&self) -> SubscriberId {
        match self {
            Self::Panicked { id, .. } | Self::Cycle { id } | Self::DepthExceeded { id, .. } => *id,
        }
    }
}

/// Errors surfaced to the embedding runtime.
#[derive(Debug, thiserror::Error)]
pub enum ReactiveError {
    /// `reactive` was handed something other than a key/value object.
    #[error("reactive target must be an object, got {found}")]
    InvalidTarget { found: &'static str },

    /// The computation passed to `watch` failed on its first run.
    #[error(transparent)]
    Computation(#[from] ComputationFailure),

    /// One or more subscribers of `key` failed during a notify pass.
    ///
    /// The write that triggered the pass has already been applied, and every
    /// subscriber that did not fail has run.
    #[error("{} subscriber(s) of `{key}` failed during notify", failures.len())]
    Notify {
        key: PropertyKey,
        failures: Vec<ComputationFailure>,
    },

    /// A property value could not be converted to or from the requested type.
    #[error("property `{key}` could not be converted")]
    Conversion {
        key: PropertyKey,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid runtime configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("failed to parse runtime configuration")]
    ConfigParse(#[source] serde_json::Error),
}

impl ReactiveError {
    /// Failures carried by this error, if it came out of a computation run.
    pub fn failures(&self) -> &[ComputationFailure] {
        match self {
            Self::Computation(failure) => std::slice::from_ref(failure),
            Self::Notify { failures, .. } => failures,
            _ => &[],
        }
    }
}
