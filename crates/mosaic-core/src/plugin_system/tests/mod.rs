mod definition_tests;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex};

use super::definition::{
    BoxError, Plugin, PluginDefinition, PluginRef, SharedDefinition, TeardownFuture,
};

/// Host context handed to every mock plugin. Records construction order so
/// tests can assert on dependency-first instantiation.
#[derive(Clone, Default)]
pub(crate) struct TestContext {
    construction_order: Arc<StdMutex<Vec<String>>>,
}

impl TestContext {
    pub(crate) fn constructed(&self) -> Vec<String> {
        self.construction_order.lock().unwrap().clone()
    }
}

pub(crate) struct TrackedPlugin {
    pub(crate) name: String,
}

impl Plugin for TrackedPlugin {}

/// Named definition whose constructor records itself in the context.
pub(crate) fn tracked(
    name: &str,
    requires: Vec<PluginRef<TestContext>>,
) -> SharedDefinition<TestContext> {
    let plugin_name = name.to_string();
    PluginDefinition::new(move |context: TestContext| {
        let name = plugin_name.clone();
        async move {
            context.construction_order.lock().unwrap().push(name.clone());
            Ok(Box::new(TrackedPlugin { name }) as Box<dyn Plugin>)
        }
    })
    .named(name)
    .with_requires(requires)
    .shared()
}

/// Definition without a name, only reachable by direct reference.
pub(crate) fn anonymous(
    requires: Vec<PluginRef<TestContext>>,
) -> SharedDefinition<TestContext> {
    PluginDefinition::new(|_context: TestContext| async {
        Ok(Box::new(TrackedPlugin { name: String::new() }) as Box<dyn Plugin>)
    })
    .with_requires(requires)
    .shared()
}

#[derive(Debug, thiserror::Error)]
#[error("some error inside a plugin")]
pub(crate) struct TestError;

/// Named definition whose constructor always fails.
pub(crate) fn failing(
    name: &str,
    requires: Vec<PluginRef<TestContext>>,
) -> SharedDefinition<TestContext> {
    PluginDefinition::new(|_context: TestContext| async {
        let err: BoxError = Box::new(TestError);
        Err(err)
    })
    .named(name)
    .with_requires(requires)
    .shared()
}

pub(crate) struct TeardownPlugin {
    torn_down: Arc<AtomicBool>,
    fail: bool,
}

impl Plugin for TeardownPlugin {
    fn destroy(&self) -> Option<TeardownFuture> {
        let torn_down = Arc::clone(&self.torn_down);
        let fail = self.fail;
        Some(Box::pin(async move {
            // Defer completion so tests exercise the wait-for-all path.
            tokio::task::yield_now().await;
            torn_down.store(true, Ordering::SeqCst);
            if fail {
                let err: BoxError = "teardown failed".into();
                Err(err)
            } else {
                Ok(())
            }
        }))
    }
}

/// Named definition producing an instance with a teardown hook that flips
/// `torn_down` when it runs.
pub(crate) fn with_teardown(
    name: &str,
    torn_down: Arc<AtomicBool>,
) -> SharedDefinition<TestContext> {
    teardown_definition(name, torn_down, false)
}

/// Like [`with_teardown`], but the hook fails after flipping the flag.
pub(crate) fn with_failing_teardown(
    name: &str,
    torn_down: Arc<AtomicBool>,
) -> SharedDefinition<TestContext> {
    teardown_definition(name, torn_down, true)
}

fn teardown_definition(
    name: &str,
    torn_down: Arc<AtomicBool>,
    fail: bool,
) -> SharedDefinition<TestContext> {
    PluginDefinition::new(move |_context: TestContext| {
        let torn_down = Arc::clone(&torn_down);
        async move {
            Ok(Box::new(TeardownPlugin { torn_down, fail }) as Box<dyn Plugin>)
        }
    })
    .named(name)
    .shared()
}
