use std::sync::Arc;

use seraph_dap::runtime::MockScriptContext;
use serde_json::json;

use crate::harness::{run_script, spawn_debugger, Op};

#[test]
fn initialize_breakpoint_continue_disconnect() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();

    let seq = client.send("initialize", json!({ "adapterID": "seraph" }));
    let response = client.read();
    assert_eq!(response["type"], "response");
    assert_eq!(response["request_seq"], seq);
    assert_eq!(response["command"], "initialize");
    assert_eq!(
        response["body"],
        json!({
            "supportsConfigurationDoneRequest": true,
            "supportsSetVariable": false,
        })
    );
    let event = client.read();
    assert_eq!(event["type"], "event");
    assert_eq!(event["event"], "initialized");

    let response = client.set_breakpoints("main.as", &[3, 7]);
    assert_eq!(response["success"], true);
    assert_eq!(
        response["body"],
        json!({
            "breakpoints": [
                { "verified": true, "line": 3 },
                { "verified": true, "line": 7 },
            ]
        })
    );
    assert_eq!(client.request("configurationDone", json!({}))["body"], json!({}));

    let mock = Arc::new(MockScriptContext::at("main", "main.as", 5));
    let script = run_script(
        &dbg.hooks,
        &mock,
        vec![Op::Line(5), Op::Line(6), Op::Line(7), Op::Line(8)],
    );

    let stopped = client.wait_for_event("stopped");
    assert_eq!(
        stopped["body"],
        json!({ "reason": "breakpoint", "threadId": 1, "allThreadsStopped": true })
    );
    assert!(!script.is_finished());
    assert!(dbg.coordinator().is_paused());

    let response = client.request("continue", json!({ "threadId": 1 }));
    assert_eq!(response["body"], json!({ "allThreadsContinued": true }));
    script.join();

    let response = client.request("disconnect", json!({}));
    assert_eq!(response["success"], true);
    assert!(client.is_closed());
    assert!(!dbg.coordinator().has_breakpoint("main.as", 7));
}

#[test]
fn sequence_numbers_increase_and_reset_per_connection() {
    let dbg = spawn_debugger();

    for _ in 0..2 {
        let mut client = dbg.connect();
        client.send("initialize", json!({}));
        let seqs: Vec<i64> = (0..2).map(|_| client.read()["seq"].as_i64().unwrap()).collect();
        assert_eq!(seqs, vec![1, 2]);

        assert_eq!(client.request("threads", json!({}))["seq"], 3);
        assert_eq!(client.request("attach", json!({}))["seq"], 4);
        assert_eq!(client.request("disconnect", json!({}))["seq"], 5);
        assert!(client.is_closed());
    }
}

#[test]
fn breakpoints_are_replaced_per_file() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();

    client.set_breakpoints("Scripts\\Main.as", &[3, 7]);
    client.set_breakpoints("scripts/main.as", &[9]);
    client.set_breakpoints("other.as", &[1]);

    let coordinator = dbg.coordinator();
    assert!(!coordinator.has_breakpoint("scripts/main.as", 3));
    assert!(!coordinator.has_breakpoint("scripts/main.as", 7));
    assert!(coordinator.has_breakpoint("SCRIPTS/MAIN.AS", 9));
    assert!(coordinator.has_breakpoint("other.as", 1));

    let response = client.set_breakpoints("other.as", &[]);
    assert_eq!(response["body"], json!({ "breakpoints": [] }));
    assert!(!coordinator.has_breakpoint("other.as", 1));
}

#[test]
fn breakpoint_paths_match_regardless_of_case_and_separators() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("C:\\Game\\Scripts\\Main.as", &[2]);

    let mock = Arc::new(MockScriptContext::at("main", "c:/game/scripts/main.AS", 1));
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(1), Op::Line(2), Op::Line(3)]);

    client.wait_for_event("stopped");
    let frames = client.request("stackTrace", json!({ "threadId": 1 }));
    assert_eq!(frames["body"]["stackFrames"][0]["line"], 2);

    client.request("continue", json!({}));
    script.join();
}

#[test]
fn client_vanishing_while_paused_releases_the_script() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("main.as", &[1]);

    let mock = Arc::new(MockScriptContext::at("main", "main.as", 1));
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(1), Op::Line(2)]);
    client.wait_for_event("stopped");

    drop(client);
    script.join();
    assert!(!dbg.coordinator().has_breakpoint("main.as", 1));

    // The server goes back to accepting.
    let mut client = dbg.connect();
    client.initialize_handshake();
}

#[test]
fn disconnect_releases_a_paused_script() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("main.as", &[1, 2]);

    let mock = Arc::new(MockScriptContext::at("main", "main.as", 1));
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(1), Op::Line(2)]);
    client.wait_for_event("stopped");

    let response = client.request("disconnect", json!({}));
    assert_eq!(response["body"], json!({}));
    script.join();
    assert!(client.is_closed());
}
