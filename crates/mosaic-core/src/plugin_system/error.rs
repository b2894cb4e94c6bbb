//! Error types for the plugin system.
//!
//! [`PluginSystemError`] covers every failure the loader can surface:
//! unresolvable name references, exclusions that break remaining requirements,
//! constructor failures, lookups of plugins that were never loaded, and
//! teardown failures. Each variant carries a machine-matchable payload,
//! exposed uniformly through [`PluginSystemError::data`], alongside the
//! human-readable `Display` text.

use std::fmt;

use serde::Serialize;
use serde_json::json;

use crate::plugin_system::definition::BoxError;

/// One violated requirement edge discovered during exclusion validation: a
/// plugin that survived the exclusion still requires one that did not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExclusionViolation {
    /// The remaining plugin whose requirement is violated.
    pub plugin: String,
    /// The excluded plugin it still requires.
    pub required: String,
}

impl fmt::Display for ExclusionViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' requires excluded plugin '{}'",
            self.plugin, self.required
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PluginSystemError {
    /// A name reference could not be resolved against the catalog or the
    /// definitions already known to the collection.
    #[error("plugin not found: '{plugin}' is not available in the plugin catalog")]
    PluginNotFound { plugin: String },

    /// One or more remaining plugins still require a plugin that was excluded
    /// from loading. Every violated edge is collected; each was also logged
    /// individually before this error was returned.
    #[error("required plugin excluded: {}", .violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; "))]
    RequiredPluginExcluded { violations: Vec<ExclusionViolation> },

    /// A plugin constructor failed. The remaining pipeline was aborted;
    /// plugins constructed earlier in the same load stay registered.
    #[error("plugin '{plugin}' failed to construct")]
    PluginConstructionFailed {
        plugin: String,
        #[source]
        source: BoxError,
    },

    /// `get` was called with a key that was never registered.
    #[error("plugin not loaded: '{plugin}'")]
    PluginNotLoaded { plugin: String },

    /// A teardown hook failed during `destroy_all`. Every hook had already
    /// been invoked and run to completion before this was returned.
    #[error("plugin '{plugin}' failed to tear down")]
    PluginTeardownFailed {
        plugin: String,
        #[source]
        source: BoxError,
    },
}

impl PluginSystemError {
    /// Structured payload for programmatic handling, e.g. `{"plugin": name}`.
    pub fn data(&self) -> serde_json::Value {
        match self {
            PluginSystemError::PluginNotFound { plugin }
            | PluginSystemError::PluginConstructionFailed { plugin, .. }
            | PluginSystemError::PluginNotLoaded { plugin }
            | PluginSystemError::PluginTeardownFailed { plugin, .. } => {
                json!({ "plugin": plugin })
            }
            PluginSystemError::RequiredPluginExcluded { violations } => {
                json!({ "violations": violations })
            }
        }
    }
}
