//! Request handlers. Each maps one DAP command onto the coordinator or the
//! inspector and yields the response body.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::dap::messages::Request;
use crate::dap::types::{Breakpoint, Capabilities, Thread};
use crate::error::DebugError;
use crate::inspector;
use crate::server::{ServerState, MAIN_THREAD_ID};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Wrap the body in a success response.
    Reply(Value),
    /// The handler already wrote its response.
    Replied,
    /// The handler already wrote its response; close the connection.
    EndSession,
}

#[derive(Debug, Deserialize)]
struct SetBreakpointsArguments {
    source: SourceArgument,
    #[serde(default)]
    breakpoints: Vec<SourceBreakpoint>,
}

#[derive(Debug, Deserialize)]
struct SourceArgument {
    #[serde(default)]
    path: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SourceBreakpoint {
    line: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ScopesArguments {
    frame_id: i64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VariablesArguments {
    variables_reference: i64,
}

pub(crate) fn dispatch(state: &ServerState, request: &Request) -> anyhow::Result<Flow> {
    let body = match request.command.as_str() {
        "initialize" => return initialize(state, request),
        "disconnect" => return disconnect(state, request),
        "attach" | "configurationDone" => json!({}),
        "setBreakpoints" => set_breakpoints(state, request)?,
        "threads" => {
            let threads = vec![Thread {
                id: MAIN_THREAD_ID,
                name: "Main Thread".to_string(),
            }];
            json!({ "threads": threads })
        }
        "continue" => {
            state.coordinator.resume();
            json!({ "allThreadsContinued": true })
        }
        "next" => {
            state.coordinator.step_over();
            json!({})
        }
        "stepIn" => {
            state.coordinator.step_in();
            json!({})
        }
        "stepOut" => {
            state.coordinator.step_out();
            json!({})
        }
        "stackTrace" => {
            let frames = inspector::stack_trace(&state.coordinator);
            json!({ "totalFrames": frames.len(), "stackFrames": frames })
        }
        "scopes" => {
            let args: ScopesArguments = arguments(request)?;
            json!({ "scopes": inspector::scopes(args.frame_id) })
        }
        "variables" => {
            let args: VariablesArguments = arguments(request)?;
            let mut objects = state.objects.lock();
            let variables =
                inspector::variables(&state.coordinator, &mut objects, args.variables_reference);
            json!({ "variables": variables })
        }
        other => {
            tracing::warn!(target: "seraph.dap", command = other, "unhandled DAP command");
            json!({})
        }
    };
    Ok(Flow::Reply(body))
}

fn arguments<T: DeserializeOwned>(request: &Request) -> anyhow::Result<T> {
    request.arguments().map_err(|err| {
        anyhow::Error::new(err).context(DebugError::InvalidArguments {
            command: request.command.clone(),
            message: "malformed arguments".to_string(),
        })
    })
}

/// Capabilities go out before `initialized`; clients rely on that order.
fn initialize(state: &ServerState, request: &Request) -> anyhow::Result<Flow> {
    let body = serde_json::to_value(Capabilities::default())?;
    state
        .send_response(request, body)
        .context("failed to send initialize response")?;
    state
        .send_event("initialized", None)
        .context("failed to send initialized event")?;
    Ok(Flow::Replied)
}

fn disconnect(state: &ServerState, request: &Request) -> anyhow::Result<Flow> {
    let sent = state.send_response(request, json!({}));
    state.coordinator.end_session();
    sent.context("failed to send disconnect response")?;
    Ok(Flow::EndSession)
}

fn set_breakpoints(state: &ServerState, request: &Request) -> anyhow::Result<Value> {
    let args: SetBreakpointsArguments = arguments(request)?;
    let path = args.source.path.ok_or_else(|| DebugError::InvalidArguments {
        command: request.command.clone(),
        message: "missing source.path".to_string(),
    })?;

    let lines: Vec<u32> = args.breakpoints.iter().map(|bp| bp.line).collect();
    state.coordinator.set_breakpoints(&path, lines.iter().copied());

    let breakpoints: Vec<Breakpoint> = lines
        .into_iter()
        .map(|line| Breakpoint {
            verified: true,
            line,
        })
        .collect();
    Ok(json!({ "breakpoints": breakpoints }))
}
