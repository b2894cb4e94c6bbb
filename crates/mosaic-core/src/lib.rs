//! # Mosaic Core
//!
//! Core library for the Mosaic modular host. Its centerpiece is the
//! [`plugin_system`] module: a plugin loader that resolves a requested set of
//! plugin definitions into a dependency-first instantiation order, constructs
//! each plugin exactly once against a host context, and later tears all
//! instances down in parallel.
//!
//! The host context itself is opaque to this crate: every public type is
//! generic over the context the host chooses to hand its plugins.

pub mod plugin_system;

// Re-export the types a host needs to declare and load plugins.
pub use plugin_system::{
    DefaultPluginHost, Plugin, PluginCollection, PluginDefinition, PluginHost, PluginRef,
    PluginSystemError, SharedDefinition,
};
