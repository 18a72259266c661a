use std::sync::Arc;

use seraph_dap::object_registry::OBJECT_REFERENCE_BASE;
use seraph_dap::runtime::{
    LocalVar, MockFrame, MockScriptContext, ObjectRef, PropertyInfo, ScriptValue, TypeId,
    TypeInfo, TypeKind,
};
use serde_json::{json, Value};

use crate::harness::{run_script, spawn_debugger, DapClient, Op};

const PLAYER: u32 = 10;
const STRING: u32 = 11;
const PLAYER_ADDRESS: usize = 0x100;

/// `main` (scripts/main.as:3) calling `Player::update` (scripts/player.as:12).
fn player_context() -> Arc<MockScriptContext> {
    let mock = Arc::new(MockScriptContext::at("main", "scripts/main.as", 3));
    mock.insert_type(
        PLAYER,
        TypeInfo {
            name: "Player".to_string(),
            properties: vec![
                PropertyInfo {
                    name: "health".to_string(),
                    type_id: TypeId::of(TypeKind::Int32),
                    offset: 0,
                },
                PropertyInfo {
                    name: "name".to_string(),
                    type_id: TypeId::object(STRING),
                    offset: 8,
                },
            ],
        },
    );
    mock.insert_type(
        STRING,
        TypeInfo {
            name: "string".to_string(),
            properties: Vec::new(),
        },
    );
    mock.write_value(PLAYER_ADDRESS, ScriptValue::Int(100));
    mock.write_value(PLAYER_ADDRESS + 8, ScriptValue::String("hero".to_string()));
    mock.write_value(0x200, ScriptValue::Double(0.5));
    mock.write_value(0x210, ScriptValue::Int(1));
    mock.write_value(0x300, ScriptValue::Int(42));
    mock.add_global("score", TypeId::of(TypeKind::Int32), 0x300);

    let mut update = MockFrame::new("Player::update", "scripts/player.as", 12)
        .with_this(ObjectRef {
            type_id: TypeId::object(PLAYER),
            address: PLAYER_ADDRESS,
        })
        .with_local("dt", TypeId::of(TypeKind::Double), 0x200);
    update.locals.push(LocalVar {
        name: String::new(),
        type_id: TypeId::of(TypeKind::Int32),
        address: 0x210,
        in_scope: true,
    });
    update.locals.push(LocalVar {
        name: "later".to_string(),
        type_id: TypeId::of(TypeKind::Int32),
        address: 0x210,
        in_scope: false,
    });
    mock.push_frame(update);
    mock
}

fn variables(client: &mut DapClient, reference: i64) -> Vec<Value> {
    let response = client.request("variables", json!({ "variablesReference": reference }));
    assert_eq!(response["success"], true, "{response}");
    response["body"]["variables"]
        .as_array()
        .cloned()
        .unwrap_or_default()
}

fn this_reference(vars: &[Value]) -> i64 {
    assert_eq!(vars[0]["name"], "this");
    vars[0]["variablesReference"].as_i64().unwrap()
}

#[test]
fn stack_trace_scopes_and_variables_of_a_paused_method() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("scripts/player.as", &[12]);

    let mock = player_context();
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(12)]);
    client.wait_for_event("stopped");

    let threads = client.request("threads", json!({}));
    assert_eq!(
        threads["body"],
        json!({ "threads": [{ "id": 1, "name": "Main Thread" }] })
    );

    let trace = client.request("stackTrace", json!({ "threadId": 1 }));
    assert_eq!(trace["body"]["totalFrames"], 2);
    assert_eq!(
        trace["body"]["stackFrames"],
        json!([
            {
                "id": 0,
                "name": "Player::update",
                "line": 12,
                "column": 1,
                "source": { "name": "player.as", "path": "scripts/player.as" },
            },
            {
                "id": 1,
                "name": "main",
                "line": 3,
                "column": 1,
                "source": { "name": "main.as", "path": "scripts/main.as" },
            },
        ])
    );

    let scopes = client.request("scopes", json!({ "frameId": 1 }));
    assert_eq!(
        scopes["body"]["scopes"],
        json!([
            { "name": "Locals", "variablesReference": 1001, "expensive": false },
            { "name": "Globals", "variablesReference": 1002, "expensive": false },
        ])
    );

    let locals = variables(&mut client, 1);
    assert_eq!(locals.len(), 2, "unnamed and out-of-scope locals are skipped");
    let this_ref = this_reference(&locals);
    assert!(this_ref > OBJECT_REFERENCE_BASE);
    assert_eq!(locals[0]["value"], "Player");
    assert_eq!(locals[0]["type"], "Player");
    assert_eq!(
        locals[1],
        json!({ "name": "dt", "value": "0.5", "type": "double", "variablesReference": 0 })
    );

    let globals = variables(&mut client, 2);
    assert_eq!(this_reference(&globals), this_ref);
    assert_eq!(
        globals[1],
        json!({ "name": "score", "value": "42", "type": "int", "variablesReference": 0 })
    );

    let fields = variables(&mut client, this_ref);
    assert_eq!(
        fields,
        vec![
            json!({ "name": "health", "value": "100", "type": "int", "variablesReference": 0 }),
            json!({ "name": "name", "value": "\"hero\"", "type": "string", "variablesReference": 0 }),
        ]
    );

    // The outer frame has no receiver.
    let outer = variables(&mut client, 1001);
    assert!(outer.is_empty(), "{outer:?}");

    client.request("continue", json!({}));
    script.join();
}

#[test]
fn object_references_do_not_survive_a_resume() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("scripts/player.as", &[12, 13]);

    let mock = player_context();
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(12), Op::Line(13)]);

    client.wait_for_event("stopped");
    let first = this_reference(&variables(&mut client, 1));
    client.request("continue", json!({}));

    client.wait_for_event("stopped");
    assert!(variables(&mut client, first).is_empty());
    let second = this_reference(&variables(&mut client, 1));
    assert_ne!(first, second);
    assert_eq!(variables(&mut client, second).len(), 2);

    client.request("continue", json!({}));
    script.join();
}

#[test]
fn inspection_while_running_is_empty() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();

    let trace = client.request("stackTrace", json!({ "threadId": 1 }));
    assert_eq!(trace["body"], json!({ "stackFrames": [], "totalFrames": 0 }));
    assert!(variables(&mut client, 1).is_empty());
    assert!(variables(&mut client, OBJECT_REFERENCE_BASE + 1).is_empty());
}

#[test]
fn unknown_frames_and_references_yield_no_variables() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("scripts/player.as", &[12]);

    let mock = player_context();
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(12)]);
    client.wait_for_event("stopped");

    assert!(variables(&mut client, 5001).is_empty());
    assert!(variables(&mut client, 3).is_empty());
    assert!(variables(&mut client, OBJECT_REFERENCE_BASE + 999).is_empty());

    client.request("continue", json!({}));
    script.join();
}

#[test]
fn frames_beyond_the_scope_range_get_no_scopes() {
    let dbg = spawn_debugger();
    let mut client = dbg.connect();
    client.initialize_handshake();
    client.set_breakpoints("main.as", &[5]);

    let mock = Arc::new(MockScriptContext::at("main", "main.as", 1));
    mock.write_value(0x10, ScriptValue::Int(7));
    for _ in 0..1000 {
        mock.push_frame(
            MockFrame::new("recurse", "main.as", 5).with_local("n", TypeId::of(TypeKind::Int32), 0x10),
        );
    }
    let script = run_script(&dbg.hooks, &mock, vec![Op::Line(5)]);
    client.wait_for_event("stopped");

    let trace = client.request("stackTrace", json!({ "threadId": 1 }));
    assert_eq!(trace["body"]["totalFrames"], 1001);

    let scopes = client.request("scopes", json!({ "frameId": 999 }));
    assert_eq!(scopes["body"]["scopes"][0]["variablesReference"], 999_001);
    assert_eq!(
        variables(&mut client, 999_001),
        vec![json!({ "name": "n", "value": "7", "type": "int", "variablesReference": 0 })]
    );

    for frame_id in [1000, i64::MAX / 10, -1] {
        let scopes = client.request("scopes", json!({ "frameId": frame_id }));
        assert_eq!(scopes["success"], true, "{scopes}");
        assert_eq!(scopes["body"], json!({ "scopes": [] }), "frame {frame_id}");
    }

    client.request("continue", json!({}));
    script.join();
}
