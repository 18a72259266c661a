//! Pause/resume state machine driven by the runtime's per-line hook.
//!
//! The script thread enters [`ExecutionCoordinator::on_line`] before every
//! executed line. When it decides to stop, it publishes an [`ExecutionPoint`],
//! notifies the adapter and parks on a condition variable. The transport
//! thread inspects the published point and eventually calls
//! [`ExecutionCoordinator::resume`], which releases exactly one pause.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Condvar, Mutex};

use crate::adapter::DebugAdapter;
use crate::breakpoints::{BreakpointStore, PathNormalizer};
use crate::runtime::{CallTimer, ScriptContext};

/// Pending single-step request, consumed by the next line that satisfies it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StepMode {
    #[default]
    None,
    /// Stop on the next line at call depth `<= depth`.
    Over { depth: u32 },
    /// Stop on the very next line.
    In,
    /// Stop on the next line at call depth `<= depth`, where `depth` is the
    /// caller's depth.
    Out { depth: u32 },
}

impl StepMode {
    /// Decide whether a line executing at `depth` should pause.
    ///
    /// Breakpoints are only consulted when no step is pending.
    pub fn should_stop(self, depth: u32, at_breakpoint: impl FnOnce() -> bool) -> bool {
        match self {
            StepMode::None => at_breakpoint(),
            StepMode::Over { depth: target } | StepMode::Out { depth: target } => depth <= target,
            StepMode::In => true,
        }
    }
}

/// Where the script thread is parked.
#[derive(Clone)]
pub struct ExecutionPoint {
    pub context: Arc<dyn ScriptContext>,
    /// Raw section name as reported by the runtime.
    pub file: String,
    pub line: u32,
    pub depth: u32,
}

impl std::fmt::Debug for ExecutionPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionPoint")
            .field("file", &self.file)
            .field("line", &self.line)
            .field("depth", &self.depth)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct Gate {
    paused: bool,
    resumed: bool,
}

#[derive(Default)]
pub struct ExecutionCoordinator {
    breakpoints: Mutex<BreakpointStore>,
    normalizer: Mutex<PathNormalizer>,
    step: Mutex<StepMode>,
    point: Mutex<Option<ExecutionPoint>>,
    gate: Mutex<Gate>,
    resume_signal: Condvar,
    timer: Mutex<Option<Arc<CallTimer>>>,
    detached: AtomicBool,
}

impl ExecutionCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Per-line hook body. Blocks the calling thread while paused.
    pub fn on_line(&self, context: &Arc<dyn ScriptContext>, adapter: &dyn DebugAdapter) {
        if self.detached.load(Ordering::Acquire) {
            return;
        }

        let depth = context.callstack_size();
        let info = context.line_info(0);
        let section = info.section.unwrap_or_default();

        let stop = {
            let mut step = self.step.lock();
            let stop = step.should_stop(depth, || {
                let mut normalizer = self.normalizer.lock();
                let file = normalizer.normalize(&section);
                self.breakpoints.lock().contains(file, info.line)
            });
            if stop {
                *step = StepMode::None;
            }
            stop
        };

        if stop {
            self.pause(
                ExecutionPoint {
                    context: Arc::clone(context),
                    file: section,
                    line: info.line,
                    depth,
                },
                adapter,
            );
        }
    }

    fn pause(&self, point: ExecutionPoint, adapter: &dyn DebugAdapter) {
        let file = point.file.clone();
        let line = point.line;
        *self.point.lock() = Some(point);

        // Mark the pause before notifying so a resume racing the stopped
        // event is never lost.
        {
            let mut gate = self.gate.lock();
            gate.paused = true;
            gate.resumed = false;
        }

        tracing::debug!(target: "seraph.dap", file = %file, line, "script thread paused");
        adapter.on_breakpoint_hit(&file, line);

        {
            let mut gate = self.gate.lock();
            while !gate.resumed && !self.detached.load(Ordering::Acquire) {
                self.resume_signal.wait(&mut gate);
            }
            gate.paused = false;
            gate.resumed = false;
        }

        // Taking this lock waits out any inspection still reading the point.
        *self.point.lock() = None;
        if let Some(timer) = self.timer.lock().as_ref() {
            timer.reset();
        }
        tracing::debug!(target: "seraph.dap", file = %file, line, "script thread resumed");
    }

    /// Release the paused script thread. Returns `false` (and does nothing)
    /// when the script is running or a resume is already pending.
    pub fn resume(&self) -> bool {
        let mut gate = self.gate.lock();
        if !gate.paused || gate.resumed {
            return false;
        }
        gate.resumed = true;
        self.resume_signal.notify_one();
        true
    }

    pub fn is_paused(&self) -> bool {
        let gate = self.gate.lock();
        gate.paused && !gate.resumed
    }

    pub fn step_over(&self) -> bool {
        self.step_with(|depth| StepMode::Over { depth })
    }

    pub fn step_in(&self) -> bool {
        self.step_with(|_| StepMode::In)
    }

    /// At the outermost frame there is no caller to return to, so the step
    /// degrades to a plain resume.
    pub fn step_out(&self) -> bool {
        self.step_with(|depth| match depth {
            0 | 1 => StepMode::None,
            depth => StepMode::Out { depth: depth - 1 },
        })
    }

    fn step_with(&self, mode: impl FnOnce(u32) -> StepMode) -> bool {
        if !self.is_paused() {
            return false;
        }
        let Some(depth) = self.point.lock().as_ref().map(|point| point.depth) else {
            return false;
        };
        *self.step.lock() = mode(depth);
        self.resume()
    }

    pub fn step_mode(&self) -> StepMode {
        *self.step.lock()
    }

    /// Run `f` against the parked execution point, if any.
    ///
    /// The script thread cannot leave the pause while `f` runs.
    pub fn with_paused_point<R>(&self, f: impl FnOnce(&ExecutionPoint) -> R) -> Option<R> {
        let point = self.point.lock();
        point.as_ref().map(f)
    }

    pub fn set_breakpoints(&self, path: &str, lines: impl IntoIterator<Item = u32>) {
        let mut breakpoints = self.breakpoints.lock();
        breakpoints.set_lines(path, lines);
        tracing::debug!(
            target: "seraph.dap",
            path,
            files = breakpoints.file_count(),
            "replaced breakpoints"
        );
    }

    pub fn has_breakpoint(&self, path: &str, line: u32) -> bool {
        self.breakpoints
            .lock()
            .lines(path)
            .is_some_and(|lines| lines.contains(&line))
    }

    pub fn clear_breakpoints(&self) {
        self.breakpoints.lock().clear();
    }

    /// Forget everything a client configured and let the script run free.
    pub fn end_session(&self) {
        self.clear_breakpoints();
        *self.step.lock() = StepMode::None;
        self.resume();
    }

    pub fn set_call_timer(&self, timer: Option<Arc<CallTimer>>) {
        *self.timer.lock() = timer;
    }

    /// Disable pausing and release a parked script thread.
    pub fn detach(&self) {
        self.detached.store(true, Ordering::Release);
        *self.step.lock() = StepMode::None;
        let _gate = self.gate.lock();
        self.resume_signal.notify_all();
    }

    pub fn attach(&self) {
        self.detached.store(false, Ordering::Release);
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }
}
