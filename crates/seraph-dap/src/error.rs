use std::net::SocketAddr;

use thiserror::Error;

pub type DebugResult<T> = Result<T, DebugError>;

#[derive(Error, Debug)]
pub enum DebugError {
    #[error("failed to bind debugger endpoint {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("debug server already listening on {0}")]
    AlreadyStarted(SocketAddr),
    #[error("failed to spawn debug server thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("invalid arguments for `{command}`: {message}")]
    InvalidArguments { command: String, message: String },
}
