//! Debug Adapter Protocol server for Seraph scripts.
//!
//! The runtime calls the [`Debugger`]'s line hook before every executed
//! script line. When a breakpoint or pending step matches, the script thread
//! parks inside the hook while a [`DapServer`] thread lets an editor inspect
//! the paused call stack over TCP and resume it.

pub mod adapter;
pub mod breakpoints;
pub mod coordinator;
pub mod dap;
pub mod debugger;
mod dispatch;
pub mod error;
pub mod format;
pub mod hardening;
pub mod inspector;
pub mod object_registry;
pub mod runtime;
pub mod server;

pub use crate::adapter::DebugAdapter;
pub use crate::coordinator::{ExecutionCoordinator, ExecutionPoint, StepMode};
pub use crate::debugger::{Debugger, LINE_HOOK_KEY};
pub use crate::error::{DebugError, DebugResult};
pub use crate::object_registry::{ObjectHandle, ObjectRegistry};
pub use crate::server::DapServer;
