//! The plugin loader itself.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use futures::future;

use crate::plugin_system::definition::{DefinitionId, Plugin, PluginRef, SharedDefinition};
use crate::plugin_system::error::PluginSystemError;
use crate::plugin_system::resolver::{Resolver, validate_exclusions};

/// Key under which an instance is registered, as yielded by
/// [`PluginCollection::iter`]. The same instance appears once under its
/// definition and, if named, once more under its name.
pub enum PluginKey<'a, C> {
    Definition(&'a SharedDefinition<C>),
    Name(&'a str),
}

impl<C> fmt::Debug for PluginKey<'_, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginKey::Definition(definition) => {
                f.debug_tuple("Definition").field(&definition.label()).finish()
            }
            PluginKey::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}

/// Loads plugins against a host context and keeps track of the instances.
///
/// A collection is created with the context every constructor receives and a
/// catalog of definitions resolvable by name. [`load`] expands a requested set
/// into its transitive dependency closure, instantiates each definition at
/// most once in dependency-first order, and registers every instance under its
/// definition identity and (first writer wins) under its name. [`destroy_all`]
/// later runs every instance's teardown hook concurrently.
///
/// Loads mutate the registration index and must be serialized; wrap the
/// collection in a [`DefaultPluginHost`] when several tasks share it.
///
/// [`load`]: PluginCollection::load
/// [`destroy_all`]: PluginCollection::destroy_all
/// [`DefaultPluginHost`]: crate::plugin_system::DefaultPluginHost
pub struct PluginCollection<C> {
    context: C,
    catalog: HashMap<String, SharedDefinition<C>>,
    /// Definitions this collection has seen, by name. Resolves name references
    /// absent from the catalog and identifies the first claimant of a name.
    known: HashMap<String, SharedDefinition<C>>,
    by_definition: HashMap<DefinitionId, Arc<dyn Plugin>>,
    by_name: HashMap<String, Arc<dyn Plugin>>,
    /// Definition-keyed registrations in load order; one entry per instance.
    loaded: Vec<(SharedDefinition<C>, Arc<dyn Plugin>)>,
}

impl<C> PluginCollection<C> {
    /// Create a collection bound to `context`, with `available` as the ordered
    /// catalog of definitions resolvable by name. For duplicate names in the
    /// catalog the earlier entry wins; unnamed entries are only loadable by
    /// direct reference.
    pub fn new(context: C, available: impl IntoIterator<Item = SharedDefinition<C>>) -> Self {
        let mut catalog = HashMap::new();
        for definition in available {
            if let Some(name) = definition.name() {
                catalog.entry(name.to_string()).or_insert(definition);
            }
        }
        Self {
            context,
            catalog,
            known: HashMap::new(),
            by_definition: HashMap::new(),
            by_name: HashMap::new(),
            loaded: Vec::new(),
        }
    }

    /// Look up a registered instance by definition reference or by name.
    pub fn get(&self, key: impl Into<PluginRef<C>>) -> Result<Arc<dyn Plugin>, PluginSystemError> {
        let key = key.into();
        self.find(&key)
            .cloned()
            .ok_or_else(|| PluginSystemError::PluginNotLoaded { plugin: key.label() })
    }

    /// Same lookup as [`get`](PluginCollection::get), as a boolean.
    pub fn has(&self, key: impl Into<PluginRef<C>>) -> bool {
        self.find(&key.into()).is_some()
    }

    fn find(&self, key: &PluginRef<C>) -> Option<&Arc<dyn Plugin>> {
        match key {
            PluginRef::Definition(definition) => self.by_definition.get(&definition.id()),
            PluginRef::Name(name) => self.by_name.get(name.as_str()),
        }
    }

    /// Every registration, definition-keyed entries first, then name-keyed
    /// entries. A named instance appears under both key kinds; filter to
    /// [`PluginKey::Definition`] entries (or use
    /// [`plugins`](PluginCollection::plugins)) for the distinct instance set.
    pub fn iter(&self) -> impl Iterator<Item = (PluginKey<'_, C>, &Arc<dyn Plugin>)> {
        self.loaded
            .iter()
            .map(|(definition, instance)| (PluginKey::Definition(definition), instance))
            .chain(
                self.by_name
                    .iter()
                    .map(|(name, instance)| (PluginKey::Name(name.as_str()), instance)),
            )
    }

    /// Distinct loaded instances, in load order.
    pub fn plugins(&self) -> impl Iterator<Item = &Arc<dyn Plugin>> {
        self.loaded.iter().map(|(_, instance)| instance)
    }

    /// Number of distinct loaded instances.
    pub fn plugin_count(&self) -> usize {
        self.loaded.len()
    }

    pub fn context(&self) -> &C {
        &self.context
    }

    /// Run the teardown hook of every instance that exposes one, concurrently,
    /// and return those instances once all hooks have completed.
    ///
    /// Instances without a hook are skipped silently. A hook failure does not
    /// prevent the other hooks from running to completion; the first failure
    /// is returned afterwards, the rest are logged. The collection is emptied
    /// either way: instances are dead after this call and lookups fail.
    pub async fn destroy_all(&mut self) -> Result<Vec<Arc<dyn Plugin>>, PluginSystemError> {
        let mut torn_down = Vec::new();
        let mut labels = Vec::new();
        let mut teardowns = Vec::new();
        for (definition, instance) in &self.loaded {
            if let Some(teardown) = instance.destroy() {
                torn_down.push(Arc::clone(instance));
                labels.push(definition.label());
                teardowns.push(teardown);
            }
        }

        let results = future::join_all(teardowns).await;

        self.by_definition.clear();
        self.by_name.clear();
        self.known.clear();
        self.loaded.clear();

        let mut first_failure = None;
        for (label, result) in labels.into_iter().zip(results) {
            if let Err(source) = result {
                log::error!("plugin '{label}' teardown failed: {source}");
                if first_failure.is_none() {
                    first_failure = Some(PluginSystemError::PluginTeardownFailed {
                        plugin: label,
                        source,
                    });
                }
            }
        }
        match first_failure {
            Some(err) => Err(err),
            None => Ok(torn_down),
        }
    }
}

impl<C: Clone> PluginCollection<C> {
    /// Load `requested` plus everything it transitively requires, minus
    /// `excluded`, and return the newly created instances in dependency-first
    /// order.
    ///
    /// Resolution and exclusion validation happen before any constructor runs,
    /// so those failures leave the collection untouched. Instantiation is
    /// strictly sequential in resolution order: each constructor is awaited
    /// before the next starts, and may rely on its dependencies being
    /// registered already. A constructor failure aborts the rest of the load;
    /// instances constructed earlier in the same call stay registered, and
    /// cleaning them up is the caller's decision (via
    /// [`destroy_all`](PluginCollection::destroy_all)).
    ///
    /// Definitions already instantiated by an earlier load on this collection
    /// are skipped, not rebuilt, and do not appear in the returned list.
    pub async fn load(
        &mut self,
        requested: impl IntoIterator<Item = PluginRef<C>>,
        excluded: impl IntoIterator<Item = PluginRef<C>>,
    ) -> Result<Vec<Arc<dyn Plugin>>, PluginSystemError> {
        let requested: Vec<PluginRef<C>> = requested.into_iter().collect();
        let excluded: Vec<PluginRef<C>> = excluded.into_iter().collect();

        let resolver = Resolver::new(
            &self.catalog,
            &self.known,
            self.loaded.iter().map(|(definition, _)| definition.id()),
        );
        let resolved = resolver.resolve(&requested).map_err(|err| {
            log::error!("plugin resolution failed: {err}");
            err
        })?;
        let resolved = validate_exclusions(resolved, &excluded, &self.catalog, &self.known)?;

        let mut created = Vec::with_capacity(resolved.len());
        for definition in resolved {
            let instance = match definition.construct(self.context.clone()).await {
                Ok(instance) => Arc::from(instance),
                Err(source) => {
                    let err = PluginSystemError::PluginConstructionFailed {
                        plugin: definition.label(),
                        source,
                    };
                    log::error!("plugin load failed: {err}");
                    return Err(err);
                }
            };
            self.register(definition, Arc::clone(&instance));
            created.push(instance);
        }
        Ok(created)
    }

    fn register(&mut self, definition: SharedDefinition<C>, instance: Arc<dyn Plugin>) {
        self.by_definition
            .insert(definition.id(), Arc::clone(&instance));
        if let Some(name) = definition.name() {
            match self.known.get(name) {
                // First writer wins: the earlier binding is kept, the later
                // plugin stays reachable through its definition only.
                Some(first) if first.id() != definition.id() => {
                    log::warn!(
                        "plugin name conflict: '{}' is claimed by both '{}' and '{}'; \
                         keeping the first registration",
                        name,
                        first.label(),
                        definition.label()
                    );
                }
                Some(_) => {}
                None => {
                    self.by_name.insert(name.to_string(), Arc::clone(&instance));
                    self.known.insert(name.to_string(), Arc::clone(&definition));
                }
            }
        }
        self.loaded.push((definition, instance));
    }
}
