use std::sync::Arc;

use super::super::definition::{Plugin, PluginRef};
use super::{TeardownPlugin, TrackedPlugin, anonymous, tracked};

#[test]
fn exposes_name_and_requirements() {
    let a = tracked("A", vec![]);
    let b = tracked("B", vec![(&a).into(), "C".into()]);

    assert_eq!(b.name(), Some("B"));
    assert_eq!(b.requires().len(), 2);
    assert_eq!(b.label(), "B");
}

#[test]
fn anonymous_definitions_get_a_synthesized_label() {
    let anon = anonymous(vec![]);

    assert_eq!(anon.name(), None);
    assert!(anon.label().starts_with("<unnamed plugin"));
}

#[test]
fn identity_follows_the_shared_allocation() {
    let a = tracked("A", vec![]);
    let also_a = Arc::clone(&a);
    let other = tracked("A", vec![]);

    assert_eq!(a.id(), also_a.id());
    // Same name, different definition: distinct identity.
    assert_ne!(a.id(), other.id());
}

#[test]
fn plugin_ref_conversions() {
    let a = tracked("A", vec![]);

    let by_definition = PluginRef::from(&a);
    assert!(matches!(by_definition, PluginRef::Definition(_)));
    assert_eq!(by_definition.label(), "A");

    let by_name: PluginRef<super::TestContext> = "B".into();
    assert!(matches!(by_name, PluginRef::Name(_)));
    assert_eq!(by_name.label(), "B");

    let by_owned_name: PluginRef<super::TestContext> = String::from("C").into();
    assert_eq!(by_owned_name.label(), "C");
}

#[test]
fn downcasts_to_the_concrete_plugin_type() {
    let instance: Arc<dyn Plugin> = Arc::new(TrackedPlugin { name: "A".into() });

    assert_eq!(instance.downcast_ref::<TrackedPlugin>().unwrap().name, "A");
    assert!(instance.downcast_ref::<TeardownPlugin>().is_none());
}
