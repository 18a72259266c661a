use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::ScriptContext;

/// Callback invoked by the runtime before each executed source line.
pub type LineHook = Arc<dyn Fn(&Arc<dyn ScriptContext>) + Send + Sync>;

/// Keyed set of per-line hooks.
///
/// The runtime calls [`LineHooks::dispatch`] before executing each line. Hooks
/// may block for a long time (the debugger's hook waits while paused), so the
/// registry lock is released before any hook runs.
#[derive(Default)]
pub struct LineHooks {
    hooks: RwLock<BTreeMap<String, LineHook>>,
}

impl LineHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `hook` under `key`, replacing any hook previously registered
    /// under the same key.
    pub fn register(&self, key: impl Into<String>, hook: LineHook) {
        self.hooks.write().insert(key.into(), hook);
    }

    pub fn remove(&self, key: &str) -> bool {
        self.hooks.write().remove(key).is_some()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.hooks.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.hooks.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.read().is_empty()
    }

    pub fn dispatch(&self, context: &Arc<dyn ScriptContext>) {
        let hooks: Vec<LineHook> = self.hooks.read().values().cloned().collect();
        for hook in hooks {
            hook(context);
        }
    }
}
