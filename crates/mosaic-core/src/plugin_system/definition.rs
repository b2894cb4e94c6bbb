use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;

/// Boxed error returned by plugin constructors and teardown hooks.
///
/// Plugins report their own failure types; the loader attaches them as the
/// `source` of its pipeline errors without interpreting them.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result of running a plugin constructor.
pub type ConstructorResult = Result<Box<dyn Plugin>, BoxError>;

/// Future returned by an instance's teardown hook.
pub type TeardownFuture = BoxFuture<'static, Result<(), BoxError>>;

type Constructor<C> = Box<dyn Fn(C) -> BoxFuture<'static, ConstructorResult> + Send + Sync>;

/// A constructed plugin instance.
///
/// The trait is deliberately minimal: what a plugin *does* is between the
/// plugin and the host context it was constructed with. The loader only needs
/// an optional teardown hook and enough type information to hand instances
/// back to the host.
pub trait Plugin: Any + Send + Sync {
    /// Teardown hook, invoked once by [`PluginCollection::destroy_all`].
    ///
    /// Return `None` (the default) when the plugin has nothing to release;
    /// such instances are skipped silently during destruction. Hooks run
    /// concurrently with no ordering guarantee, so a hook must not depend on
    /// any other plugin still being alive.
    ///
    /// [`PluginCollection::destroy_all`]: crate::plugin_system::PluginCollection::destroy_all
    fn destroy(&self) -> Option<TeardownFuture> {
        None
    }
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<dyn Plugin>")
    }
}

impl dyn Plugin {
    /// Downcast a registered instance to its concrete type.
    pub fn downcast_ref<T: Plugin>(&self) -> Option<&T> {
        (self as &dyn Any).downcast_ref::<T>()
    }
}

/// A constructible plugin unit plus its static metadata.
///
/// Definitions are shared as [`SharedDefinition`] handles and carry their own
/// [`DefinitionId`], so two handles to the same definition always resolve to
/// the same instance. `C` is the host context type forwarded, unchanged, to
/// the constructor.
pub struct PluginDefinition<C> {
    id: DefinitionId,
    name: Option<String>,
    requires: Vec<PluginRef<C>>,
    constructor: Constructor<C>,
}

/// Shared handle to a [`PluginDefinition`].
pub type SharedDefinition<C> = Arc<PluginDefinition<C>>;

/// Identity of a definition, assigned at construction.
///
/// Two [`SharedDefinition`] handles to the same definition carry the same id;
/// two separately constructed definitions never do, even when their metadata
/// is identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DefinitionId(u64);

static NEXT_DEFINITION_ID: AtomicU64 = AtomicU64::new(1);

impl<C> PluginDefinition<C> {
    /// Create a definition from its constructor capability.
    ///
    /// The constructor receives a clone of the host context and may suspend;
    /// the loader awaits it before constructing the next plugin.
    pub fn new<F, Fut>(construct: F) -> Self
    where
        F: Fn(C) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ConstructorResult> + Send + 'static,
    {
        Self {
            id: DefinitionId(NEXT_DEFINITION_ID.fetch_add(1, Ordering::Relaxed)),
            name: None,
            requires: Vec::new(),
            constructor: Box::new(move |context| Box::pin(construct(context))),
        }
    }

    /// Give the definition a name, making it resolvable and retrievable by
    /// that name. Unnamed definitions can only be referenced directly.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Declare the plugins this one requires, in the order they should be
    /// visited during resolution.
    pub fn with_requires(mut self, requires: impl IntoIterator<Item = PluginRef<C>>) -> Self {
        self.requires = requires.into_iter().collect();
        self
    }

    /// Finish building and wrap in the shared handle the loader works with.
    pub fn shared(self) -> SharedDefinition<C> {
        Arc::new(self)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn requires(&self) -> &[PluginRef<C>] {
        &self.requires
    }

    pub fn id(&self) -> DefinitionId {
        self.id
    }

    /// Display label for logs and error payloads: the name when present, a
    /// synthesized label otherwise.
    pub fn label(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("<unnamed plugin #{}>", self.id.0),
        }
    }

    pub(crate) fn construct(&self, context: C) -> BoxFuture<'static, ConstructorResult> {
        (self.constructor)(context)
    }
}

impl<C> fmt::Debug for PluginDefinition<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDefinition")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

/// A reference to a plugin definition: either the definition itself or a name
/// to be resolved against the catalog at load time.
pub enum PluginRef<C> {
    Definition(SharedDefinition<C>),
    Name(String),
}

impl<C> PluginRef<C> {
    /// Display label matching [`PluginDefinition::label`] for definition
    /// references, or the name itself for name references.
    pub fn label(&self) -> String {
        match self {
            PluginRef::Definition(def) => def.label(),
            PluginRef::Name(name) => name.clone(),
        }
    }
}

// Manual impls: deriving would put unnecessary bounds on `C`.
impl<C> Clone for PluginRef<C> {
    fn clone(&self) -> Self {
        match self {
            PluginRef::Definition(def) => PluginRef::Definition(Arc::clone(def)),
            PluginRef::Name(name) => PluginRef::Name(name.clone()),
        }
    }
}

impl<C> fmt::Debug for PluginRef<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PluginRef::Definition(def) => f.debug_tuple("Definition").field(&def.label()).finish(),
            PluginRef::Name(name) => f.debug_tuple("Name").field(name).finish(),
        }
    }
}

impl<C> From<SharedDefinition<C>> for PluginRef<C> {
    fn from(def: SharedDefinition<C>) -> Self {
        PluginRef::Definition(def)
    }
}

impl<C> From<&SharedDefinition<C>> for PluginRef<C> {
    fn from(def: &SharedDefinition<C>) -> Self {
        PluginRef::Definition(Arc::clone(def))
    }
}

impl<C> From<&str> for PluginRef<C> {
    fn from(name: &str) -> Self {
        PluginRef::Name(name.to_string())
    }
}

impl<C> From<String> for PluginRef<C> {
    fn from(name: String) -> Self {
        PluginRef::Name(name)
    }
}
