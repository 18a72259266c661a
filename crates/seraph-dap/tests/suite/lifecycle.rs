use std::sync::Arc;
use std::time::Duration;

use seraph_config::DebuggerConfig;
use seraph_dap::runtime::{CallTimer, MockScriptContext};
use seraph_dap::{DapServer, DebugAdapter, DebugError, Debugger, ExecutionCoordinator};
use serde_json::json;

use crate::harness::{run_script, spawn_debugger, DapClient, Op};

#[test]
fn stopping_the_debugger_while_paused_releases_the_script() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("main.as", &[1, 2]);

    let mock = Arc::new(MockScriptContext::at("main", "main.as", 1));
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(1), Op::Line(2), Op::Line(3)]);
    client.wait_for_event("stopped");

    dbg.debugger.stop();
    script.join();
    assert!(!dbg.debugger.started());
    assert!(!dbg.server.is_running());
    assert!(client.is_closed());
}

#[test]
fn stop_without_start_does_not_hang() {
    let config = DebuggerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let debugger = Debugger::new(&config);
    debugger.stop();
    debugger.stop();
    assert!(!debugger.started());
}

#[test]
fn stop_with_an_idle_listener_returns() {
    let dbg = spawn_debugger();
    assert!(dbg.server.is_running());
    dbg.server.stop();
    assert!(!dbg.server.is_running());
    assert!(dbg.server.local_addr().is_none());
}

#[test]
fn debugger_can_be_restarted() {
    let dbg = spawn_debugger();
    dbg.debugger.stop();
    dbg.debugger.start().unwrap();
    let addr = dbg.server.local_addr().expect("restarted server address");

    let mut client = DapClient::connect(addr);
    client.initialize_handshake();
    client.set_breakpoints("main.as", &[1]);

    let mock = Arc::new(MockScriptContext::at("main", "main.as", 1));
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(1)]);
    client.wait_for_event("stopped");
    client.request("continue", json!({}));
    script.join();
}

#[test]
fn time_spent_paused_does_not_count_against_the_call() {
    let dbg = spawn_debugger();
    let timer = Arc::new(CallTimer::new(Duration::from_millis(200)));
    dbg.debugger.set_call_timer(Some(Arc::clone(&timer)));

    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("main.as", &[1]);

    let mock = Arc::new(MockScriptContext::at("main", "main.as", 1));
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(1)]);
    client.wait_for_event("stopped");
    std::thread::sleep(Duration::from_millis(300));
    assert!(timer.is_expired());

    client.request("continue", json!({}));
    script.join();
    assert!(!timer.is_expired());
}

#[test]
fn server_rejects_a_second_start() {
    let config = DebuggerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
    };
    let server = DapServer::new(&config, Arc::new(ExecutionCoordinator::new()));
    server.start().unwrap();
    assert!(server.start().is_err());
    server.stop();
}

#[test]
fn binding_an_occupied_port_fails() {
    let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let config = DebuggerConfig {
        host: "127.0.0.1".to_string(),
        port: taken.local_addr().unwrap().port(),
    };
    let debugger = Debugger::new(&config);
    let err = debugger.start().unwrap_err();
    assert!(matches!(err, DebugError::Bind { .. }), "{err}");
    assert!(!debugger.started());
}
