//! Async facade over a shared [`PluginCollection`].
//!
//! The collection itself is not designed for concurrent overlapping loads:
//! registration is only mutated during the sequential instantiation phase.
//! Hosts that touch the plugin system from more than one task go through
//! [`DefaultPluginHost`], whose mutex serializes every operation.

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::plugin_system::collection::PluginCollection;
use crate::plugin_system::definition::{Plugin, PluginRef, SharedDefinition};
use crate::plugin_system::error::PluginSystemError;

/// Host-facing plugin system interface.
#[async_trait]
pub trait PluginHost<C>: Send + Sync {
    /// Load `requested` and its transitive requirements, minus `excluded`.
    /// See [`PluginCollection::load`].
    async fn load(
        &self,
        requested: Vec<PluginRef<C>>,
        excluded: Vec<PluginRef<C>>,
    ) -> Result<Vec<Arc<dyn Plugin>>, PluginSystemError>;

    /// Look up a loaded plugin by definition reference or name.
    async fn get(&self, key: PluginRef<C>) -> Result<Arc<dyn Plugin>, PluginSystemError>;

    /// Whether a plugin is loaded under the given key.
    async fn has(&self, key: PluginRef<C>) -> bool;

    /// Number of distinct loaded instances.
    async fn plugin_count(&self) -> usize;

    /// Tear down every loaded instance. See [`PluginCollection::destroy_all`].
    async fn destroy_all(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginSystemError>;
}

/// Default implementation of [`PluginHost`].
pub struct DefaultPluginHost<C> {
    collection: Arc<Mutex<PluginCollection<C>>>,
}

impl<C> DefaultPluginHost<C> {
    /// Create a host bound to `context` with `available` as its catalog.
    pub fn new(context: C, available: impl IntoIterator<Item = SharedDefinition<C>>) -> Self {
        Self {
            collection: Arc::new(Mutex::new(PluginCollection::new(context, available))),
        }
    }

    /// The underlying shared collection, for callers that need operations the
    /// trait does not expose (iteration, typed downcasts).
    pub fn collection(&self) -> &Arc<Mutex<PluginCollection<C>>> {
        &self.collection
    }
}

impl<C> Clone for DefaultPluginHost<C> {
    fn clone(&self) -> Self {
        Self {
            collection: Arc::clone(&self.collection),
        }
    }
}

impl<C> Debug for DefaultPluginHost<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Collection state is behind the lock; don't block to render it.
        f.debug_struct("DefaultPluginHost").finish_non_exhaustive()
    }
}

#[async_trait]
impl<C: Clone + Send + Sync + 'static> PluginHost<C> for DefaultPluginHost<C> {
    async fn load(
        &self,
        requested: Vec<PluginRef<C>>,
        excluded: Vec<PluginRef<C>>,
    ) -> Result<Vec<Arc<dyn Plugin>>, PluginSystemError> {
        self.collection.lock().await.load(requested, excluded).await
    }

    async fn get(&self, key: PluginRef<C>) -> Result<Arc<dyn Plugin>, PluginSystemError> {
        self.collection.lock().await.get(key)
    }

    async fn has(&self, key: PluginRef<C>) -> bool {
        self.collection.lock().await.has(key)
    }

    async fn plugin_count(&self) -> usize {
        self.collection.lock().await.plugin_count()
    }

    async fn destroy_all(&self) -> Result<Vec<Arc<dyn Plugin>>, PluginSystemError> {
        self.collection.lock().await.destroy_all().await
    }
}
