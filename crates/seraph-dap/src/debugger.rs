use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use seraph_config::DebuggerConfig;

use crate::adapter::DebugAdapter;
use crate::coordinator::ExecutionCoordinator;
use crate::error::DebugResult;
use crate::runtime::{CallTimer, LineHook, LineHooks, ScriptContext};
use crate::server::DapServer;

/// Key the debugger's hook is registered under in [`LineHooks`].
pub const LINE_HOOK_KEY: &str = "debugger";

/// Host-side handle on the debugging subsystem.
///
/// Owns the coordinator and the adapter that exposes it. Dropping the
/// debugger stops it, which also releases a script thread parked at a
/// breakpoint.
pub struct Debugger {
    coordinator: Arc<ExecutionCoordinator>,
    adapter: Arc<dyn DebugAdapter>,
    started: AtomicBool,
}

impl Debugger {
    /// Debugger served over TCP on `config.bind_address()`.
    pub fn new(config: &DebuggerConfig) -> Self {
        let coordinator = Arc::new(ExecutionCoordinator::new());
        let server = DapServer::new(config, Arc::clone(&coordinator));
        Self::with_adapter(coordinator, Arc::new(server))
    }

    pub fn with_adapter(
        coordinator: Arc<ExecutionCoordinator>,
        adapter: Arc<dyn DebugAdapter>,
    ) -> Self {
        Self {
            coordinator,
            adapter,
            started: AtomicBool::new(false),
        }
    }

    /// Start the adapter. Calling it again while started is a no-op.
    pub fn start(&self) -> DebugResult<()> {
        if self.started.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.coordinator.attach();
        if let Err(err) = self.adapter.start() {
            self.started.store(false, Ordering::Release);
            return Err(err);
        }
        Ok(())
    }

    pub fn started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }

    /// Detach from the script and stop the adapter. Safe to call at any time.
    pub fn stop(&self) {
        self.coordinator.detach();
        if self.started.swap(false, Ordering::AcqRel) {
            self.adapter.stop();
        }
    }

    /// Closure for the runtime to call before each executed line.
    pub fn line_hook(&self) -> LineHook {
        let coordinator = Arc::clone(&self.coordinator);
        let adapter = Arc::clone(&self.adapter);
        Arc::new(move |context: &Arc<dyn ScriptContext>| {
            coordinator.on_line(context, adapter.as_ref())
        })
    }

    /// Register [`Debugger::line_hook`] under [`LINE_HOOK_KEY`].
    pub fn install(&self, hooks: &LineHooks) {
        hooks.register(LINE_HOOK_KEY, self.line_hook());
    }

    pub fn uninstall(&self, hooks: &LineHooks) -> bool {
        hooks.remove(LINE_HOOK_KEY)
    }

    /// Timer of the in-flight script call, reset after every pause.
    pub fn set_call_timer(&self, timer: Option<Arc<CallTimer>>) {
        self.coordinator.set_call_timer(timer);
    }

    pub fn coordinator(&self) -> &Arc<ExecutionCoordinator> {
        &self.coordinator
    }
}

impl Drop for Debugger {
    fn drop(&mut self) {
        self.stop();
    }
}
