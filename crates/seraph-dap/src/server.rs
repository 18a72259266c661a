use std::io::{self, BufReader, BufWriter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, Shutdown, SocketAddr, TcpListener, TcpStream};
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use seraph_config::DebuggerConfig;
use serde_json::Value;

use crate::adapter::DebugAdapter;
use crate::coordinator::ExecutionCoordinator;
use crate::dap::codec::{read_json_message, sanitize_json_error_message, write_json_message};
use crate::dap::messages::{Event, Request, Response};
use crate::dap::types::StoppedEventBody;
use crate::dispatch::{self, Flow};
use crate::error::{DebugError, DebugResult};
use crate::object_registry::ObjectRegistry;

/// The only thread a script runs on, as far as the client is concerned.
pub const MAIN_THREAD_ID: i64 = 1;

const ACCEPT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// DAP transport over TCP.
///
/// One client is served at a time. The accept loop runs on its own thread;
/// the script thread only touches the server through
/// [`DebugAdapter::on_breakpoint_hit`].
pub struct DapServer {
    bind_address: String,
    state: Arc<ServerState>,
    accept_thread: Mutex<Option<JoinHandle<()>>>,
    local_addr: Mutex<Option<SocketAddr>>,
}

pub(crate) struct ServerState {
    pub(crate) coordinator: Arc<ExecutionCoordinator>,
    pub(crate) objects: Mutex<ObjectRegistry>,
    writer: Mutex<Option<ConnectionWriter>>,
    client: Mutex<Option<TcpStream>>,
    running: AtomicBool,
}

struct ConnectionWriter {
    stream: BufWriter<TcpStream>,
    next_seq: u64,
}

impl ConnectionWriter {
    fn alloc_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

impl DapServer {
    pub fn new(config: &DebuggerConfig, coordinator: Arc<ExecutionCoordinator>) -> Self {
        Self {
            bind_address: config.bind_address(),
            state: Arc::new(ServerState {
                coordinator,
                objects: Mutex::new(ObjectRegistry::new()),
                writer: Mutex::new(None),
                client: Mutex::new(None),
                running: AtomicBool::new(false),
            }),
            accept_thread: Mutex::new(None),
            local_addr: Mutex::new(None),
        }
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.local_addr.lock()
    }

    pub fn is_running(&self) -> bool {
        self.state.running.load(Ordering::Acquire)
    }

    pub fn has_client(&self) -> bool {
        self.state.writer.lock().is_some()
    }

    /// Push an unsolicited event to the connected client. Dropped when no
    /// client is connected.
    pub fn send_event(&self, event: &str, body: Option<Value>) -> io::Result<()> {
        self.state.send_event(event, body)
    }
}

impl DebugAdapter for DapServer {
    fn start(&self) -> DebugResult<()> {
        let mut accept_thread = self.accept_thread.lock();
        if accept_thread.is_some() {
            if let Some(addr) = self.local_addr() {
                return Err(DebugError::AlreadyStarted(addr));
            }
        }

        let bind_error = |source| DebugError::Bind {
            addr: self.bind_address.clone(),
            source,
        };
        let listener = TcpListener::bind(&self.bind_address).map_err(bind_error)?;
        let addr = listener.local_addr().map_err(bind_error)?;

        self.state.running.store(true, Ordering::Release);
        let state = Arc::clone(&self.state);
        let handle = std::thread::Builder::new()
            .name("seraph-dap".to_string())
            .spawn(move || state.accept_loop(listener))
            .map_err(|err| {
                self.state.running.store(false, Ordering::Release);
                DebugError::Spawn(err)
            })?;

        *accept_thread = Some(handle);
        *self.local_addr.lock() = Some(addr);
        tracing::info!(target: "seraph.dap", %addr, "debug server listening");
        Ok(())
    }

    fn stop(&self) {
        let Some(handle) = self.accept_thread.lock().take() else {
            return;
        };

        {
            let client = self.state.client.lock();
            self.state.running.store(false, Ordering::Release);
            if let Some(stream) = client.as_ref() {
                let _ = stream.shutdown(Shutdown::Both);
            }
        }

        // Unblock a pending `accept`.
        if let Some(addr) = self.local_addr.lock().take() {
            let _ = TcpStream::connect_timeout(&wake_address(addr), Duration::from_secs(1));
        }

        if handle.join().is_err() {
            tracing::error!(target: "seraph.dap", "debug server thread panicked");
        }
        tracing::info!(target: "seraph.dap", "debug server stopped");
    }

    fn on_breakpoint_hit(&self, file: &str, line: u32) {
        self.state.objects.lock().clear();

        let body = StoppedEventBody {
            reason: "breakpoint".to_string(),
            thread_id: MAIN_THREAD_ID,
            all_threads_stopped: true,
        };
        let result = serde_json::to_value(body)
            .map_err(io::Error::from)
            .and_then(|body| self.state.send_event("stopped", Some(body)));
        if let Err(err) = result {
            tracing::warn!(
                target: "seraph.dap",
                file,
                line,
                error = %err,
                "failed to send stopped event"
            );
        }
    }
}

impl Drop for DapServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn wake_address(addr: SocketAddr) -> SocketAddr {
    let ip = match addr.ip() {
        IpAddr::V4(ip) if ip.is_unspecified() => IpAddr::V4(Ipv4Addr::LOCALHOST),
        IpAddr::V6(ip) if ip.is_unspecified() => IpAddr::V6(Ipv6Addr::LOCALHOST),
        ip => ip,
    };
    SocketAddr::new(ip, addr.port())
}

impl ServerState {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn accept_loop(&self, listener: TcpListener) {
        while self.is_running() {
            let (stream, peer) = match listener.accept() {
                Ok(accepted) => accepted,
                Err(err) => {
                    if !self.is_running() {
                        break;
                    }
                    tracing::error!(target: "seraph.dap", error = %err, "failed to accept debug client");
                    std::thread::sleep(ACCEPT_RETRY_DELAY);
                    continue;
                }
            };

            if !self.attach_client(&stream) {
                break;
            }
            tracing::info!(target: "seraph.dap", %peer, "debug client connected");

            if let Err(err) = self.serve(stream) {
                tracing::debug!(target: "seraph.dap", error = %err, "debug session ended with error");
            }
            self.finish_session();
            tracing::info!(target: "seraph.dap", %peer, "debug client disconnected");
        }
    }

    /// Record `stream` so `stop` can shut it down. Returns `false` if the
    /// server is stopping.
    fn attach_client(&self, stream: &TcpStream) -> bool {
        let mut client = self.client.lock();
        if !self.is_running() {
            return false;
        }
        match stream.try_clone() {
            Ok(clone) => {
                *client = Some(clone);
                true
            }
            Err(err) => {
                tracing::error!(target: "seraph.dap", error = %err, "failed to register debug client");
                false
            }
        }
    }

    fn serve(&self, stream: TcpStream) -> io::Result<()> {
        self.objects.lock().reset();
        *self.writer.lock() = Some(ConnectionWriter {
            stream: BufWriter::new(stream.try_clone()?),
            next_seq: 1,
        });

        let mut reader = BufReader::new(stream);
        while self.is_running() {
            let Some(request) = read_json_message::<_, Request>(&mut reader)? else {
                return Ok(());
            };
            if self.handle_request(&request)? == Flow::EndSession {
                return Ok(());
            }
        }
        Ok(())
    }

    fn handle_request(&self, request: &Request) -> io::Result<Flow> {
        match std::panic::catch_unwind(AssertUnwindSafe(|| dispatch::dispatch(self, request))) {
            Ok(Ok(Flow::Reply(body))) => {
                self.send_response(request, body)?;
                Ok(Flow::Replied)
            }
            Ok(Ok(flow)) => Ok(flow),
            Ok(Err(err)) => {
                let message = sanitize_anyhow_error_message(&err);
                tracing::warn!(
                    target: "seraph.dap",
                    command = %request.command,
                    error = %message,
                    "request failed"
                );
                self.send_error(request, message)?;
                Ok(Flow::Replied)
            }
            Err(_) => {
                tracing::error!(
                    target: "seraph.dap",
                    command = %request.command,
                    "panic in DAP request handler"
                );
                self.send_error(request, "Internal error (panic). The adapter will continue.")?;
                Ok(Flow::Replied)
            }
        }
    }

    fn finish_session(&self) {
        *self.writer.lock() = None;
        *self.client.lock() = None;
        self.coordinator.end_session();
        self.objects.lock().clear();
    }

    pub(crate) fn send_response(&self, request: &Request, body: Value) -> io::Result<()> {
        self.write_with_seq(|seq| serde_json::to_value(Response::success(seq, request, body)))
    }

    fn send_error(&self, request: &Request, message: impl Into<String>) -> io::Result<()> {
        let message = message.into();
        self.write_with_seq(|seq| serde_json::to_value(Response::error(seq, request, message)))
    }

    pub(crate) fn send_event(&self, event: &str, body: Option<Value>) -> io::Result<()> {
        self.write_with_seq(|seq| serde_json::to_value(Event::new(seq, event, body)))
    }

    /// Allocate the next sequence number and write the message under one lock
    /// so frames from the script and transport threads never interleave.
    fn write_with_seq(
        &self,
        build: impl FnOnce(u64) -> serde_json::Result<Value>,
    ) -> io::Result<()> {
        let mut writer = self.writer.lock();
        let Some(writer) = writer.as_mut() else {
            tracing::debug!(target: "seraph.dap", "no debug client connected; dropping message");
            return Ok(());
        };
        let message = build(writer.alloc_seq())?;
        write_json_message(&mut writer.stream, &message)
    }
}

fn sanitize_anyhow_error_message(err: &anyhow::Error) -> String {
    if err.chain().any(|cause| cause.is::<serde_json::Error>()) {
        sanitize_json_error_message(&err.to_string())
    } else {
        err.to_string()
    }
}
