//! Runtime Configuration
//!
//! A [`RuntimeConfig`] decides how a [`Runtime`](crate::Runtime) reacts when a
//! computation misbehaves. Every field has a default, so an empty JSON object
//! is a valid configuration.

use serde::{Deserialize, Serialize};

use crate::error::{ReactiveError, Result};

/// What happens when a computation panics while it is being run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Catch the panic, record it, and keep running the remaining subscribers.
    #[default]
    Isolate,

    /// Let the panic unwind out of the triggering `watch` or write. Later
    /// subscribers in the same notify pass are not invoked.
    Propagate,
}

/// Settings for one reactive scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub failure_policy: FailurePolicy,

    /// Refuse to invoke a computation that is already on the active stack.
    ///
    /// With this off, a computation that writes a property it reads recurses
    /// until `max_depth` stops it.
    pub cycle_guard: bool,

    /// Maximum number of computations that may be active at once.
    pub max_depth: usize,
}

impl RuntimeConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 128;

    /// Parse a configuration from JSON and validate it.
    pub fn from_json(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source).map_err(ReactiveError::ConfigParse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the runtime cannot work with.
    ///
    /// `max_depth` must allow at least one running computation.
    pub fn validate(&self) -> Result<()> {
        if self.max_depth == 0 {
            return Err(ReactiveError::InvalidConfig {
                reason: "max_depth must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Set how subscriber panics are handled.
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Enable or disable skipping computations already on the stack.
    pub fn with_cycle_guard(mut self, enabled: bool) -> Self {
        self.cycle_guard = enabled;
        self
    }

    /// Set how many computations may be running at once.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::Isolate,
            cycle_guard: true,
            max_depth: Self::DEFAULT_MAX_DEPTH,
        }
    }
}
