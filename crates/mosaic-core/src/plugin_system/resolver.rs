//! Dependency resolution and exclusion validation.
//!
//! Both steps run before any plugin is constructed, so a failure here leaves
//! the collection untouched.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::plugin_system::definition::{DefinitionId, PluginRef, SharedDefinition};
use crate::plugin_system::error::{ExclusionViolation, PluginSystemError};

/// Ordered, deduplicated sequence of definitions to instantiate for one load
/// call. Every dependency precedes its dependents.
pub(crate) type ResolutionSet<C> = Vec<SharedDefinition<C>>;

/// Depth-first expansion of a requested set into its transitive closure.
///
/// Definitions are marked visited on *entry*, not on completion, which is what
/// makes cyclic `requires` declarations terminate: the definition reached
/// second in a cycle finds its counterpart already marked and simply does not
/// re-enter, so the one that triggered the cycle is emitted right after the
/// dependency that closed the loop.
pub(crate) struct Resolver<'a, C> {
    catalog: &'a HashMap<String, SharedDefinition<C>>,
    known: &'a HashMap<String, SharedDefinition<C>>,
    visited: HashSet<DefinitionId>,
    order: ResolutionSet<C>,
}

impl<'a, C> Resolver<'a, C> {
    /// `already_loaded` seeds the visited set so that definitions instantiated
    /// by an earlier load on the same collection are never re-emitted.
    pub(crate) fn new(
        catalog: &'a HashMap<String, SharedDefinition<C>>,
        known: &'a HashMap<String, SharedDefinition<C>>,
        already_loaded: impl IntoIterator<Item = DefinitionId>,
    ) -> Self {
        Self {
            catalog,
            known,
            visited: already_loaded.into_iter().collect(),
            order: Vec::new(),
        }
    }

    /// Expand `requested` left-to-right into a [`ResolutionSet`]. Deterministic
    /// for a given input.
    pub(crate) fn resolve(
        mut self,
        requested: &[PluginRef<C>],
    ) -> Result<ResolutionSet<C>, PluginSystemError> {
        for reference in requested {
            self.visit(reference)?;
        }
        Ok(self.order)
    }

    fn visit(&mut self, reference: &PluginRef<C>) -> Result<(), PluginSystemError> {
        let definition = lookup(reference, self.catalog, self.known)?;
        if !self.visited.insert(definition.id()) {
            return Ok(());
        }
        for requirement in definition.requires() {
            self.visit(requirement)?;
        }
        self.order.push(definition);
        Ok(())
    }
}

/// Resolve a reference to a concrete definition. Names are looked up in the
/// catalog first, then among definitions the collection already knows; direct
/// references are used as-is, whether or not the catalog lists them.
fn lookup<C>(
    reference: &PluginRef<C>,
    catalog: &HashMap<String, SharedDefinition<C>>,
    known: &HashMap<String, SharedDefinition<C>>,
) -> Result<SharedDefinition<C>, PluginSystemError> {
    match reference {
        PluginRef::Definition(definition) => Ok(Arc::clone(definition)),
        PluginRef::Name(name) => catalog
            .get(name)
            .or_else(|| known.get(name))
            .cloned()
            .ok_or_else(|| PluginSystemError::PluginNotFound {
                plugin: name.clone(),
            }),
    }
}

/// Remove every excluded definition from `resolved`, then fail if any
/// *remaining* definition's requirements still point at an excluded one.
///
/// Exclusions match by reference or by name; excluding something absent from
/// the resolved set is a silent no-op. Each violated requirement edge is
/// logged individually and collected into the returned error.
pub(crate) fn validate_exclusions<C>(
    resolved: ResolutionSet<C>,
    excluded: &[PluginRef<C>],
    catalog: &HashMap<String, SharedDefinition<C>>,
    known: &HashMap<String, SharedDefinition<C>>,
) -> Result<ResolutionSet<C>, PluginSystemError> {
    if excluded.is_empty() {
        return Ok(resolved);
    }

    let mut excluded_ids: HashSet<DefinitionId> = HashSet::new();
    let mut excluded_names: HashSet<&str> = HashSet::new();
    for reference in excluded {
        match reference {
            PluginRef::Definition(definition) => {
                excluded_ids.insert(definition.id());
                if let Some(name) = definition.name() {
                    excluded_names.insert(name);
                }
            }
            PluginRef::Name(name) => {
                excluded_names.insert(name);
                if let Some(definition) = catalog.get(name).or_else(|| known.get(name)) {
                    excluded_ids.insert(definition.id());
                }
            }
        }
    }

    let definition_excluded = |definition: &SharedDefinition<C>| {
        excluded_ids.contains(&definition.id())
            || definition.name().is_some_and(|n| excluded_names.contains(n))
    };
    let reference_excluded = |reference: &PluginRef<C>| match reference {
        PluginRef::Definition(definition) => definition_excluded(definition),
        PluginRef::Name(name) => {
            excluded_names.contains(name.as_str())
                || catalog
                    .get(name)
                    .or_else(|| known.get(name))
                    .is_some_and(|definition| excluded_ids.contains(&definition.id()))
        }
    };

    let remaining: ResolutionSet<C> = resolved
        .into_iter()
        .filter(|definition| !definition_excluded(definition))
        .collect();

    let mut violations = Vec::new();
    for definition in &remaining {
        for requirement in definition.requires() {
            if reference_excluded(requirement) {
                let violation = ExclusionViolation {
                    plugin: definition.label(),
                    required: requirement.label(),
                };
                log::error!(
                    "plugin '{}' requires '{}', which was excluded from loading",
                    violation.plugin,
                    violation.required
                );
                violations.push(violation);
            }
        }
    }

    if violations.is_empty() {
        Ok(remaining)
    } else {
        Err(PluginSystemError::RequiredPluginExcluded { violations })
    }
}
