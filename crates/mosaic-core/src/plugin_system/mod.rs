//! # Mosaic Plugin System
//!
//! Infrastructure for discovering, ordering, instantiating, and destroying the
//! plugins a host application is assembled from.
//!
//! ## Key submodules and responsibilities:
//!
//! - **[`definition`]**: The [`PluginDefinition`] record (constructor capability
//!   plus optional `name`/`requires` metadata), the [`PluginRef`] handle used to
//!   request plugins by definition or by name, and the [`Plugin`] trait that
//!   constructed instances implement.
//! - **[`collection`]**: The [`PluginCollection`] loader itself: resolves a
//!   request into a dependency-first order, instantiates each definition once,
//!   indexes instances by definition identity and by name, and drives parallel
//!   teardown.
//! - **[`manager`]**: An async facade ([`PluginHost`]) that serializes access to
//!   a shared collection for hosts that load from more than one task.
//! - **[`error`]**: [`PluginSystemError`] and the structured payloads attached
//!   to each failure.

pub mod collection;
pub mod definition;
pub mod error;
pub mod manager;
mod resolver;

pub use collection::{PluginCollection, PluginKey};
pub use definition::{
    BoxError, ConstructorResult, DefinitionId, Plugin, PluginDefinition, PluginRef,
    SharedDefinition, TeardownFuture,
};
pub use error::{ExclusionViolation, PluginSystemError};
pub use manager::{DefaultPluginHost, PluginHost};

#[cfg(test)]
mod tests;
