use crate::error::DebugResult;

/// Front end that exposes a paused script to a debugging client.
///
/// The [`crate::Debugger`] drives an adapter through this trait and calls
/// [`DebugAdapter::on_breakpoint_hit`] from the script thread right before it
/// blocks, so implementations must tolerate being called from any thread.
pub trait DebugAdapter: Send + Sync {
    fn start(&self) -> DebugResult<()>;

    /// Must be safe to call repeatedly and without a prior `start`.
    fn stop(&self);

    fn on_breakpoint_hit(&self, file: &str, line: u32);
}
