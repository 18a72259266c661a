pub mod codec;
pub mod messages;
pub mod types;

/// Maximum allowed size of a single DAP header line (in bytes).
///
/// Message bodies are not capped, but a header line that never terminates must
/// not grow an unbounded buffer.
pub const MAX_DAP_HEADER_LINE_BYTES: usize = 8 * 1024; // 8 KiB
