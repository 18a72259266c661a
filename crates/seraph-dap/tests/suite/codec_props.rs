use std::io::Cursor;

use proptest::prelude::*;
use seraph_dap::dap::codec::{read_json_message, read_raw_message, write_json_message};
use serde_json::{Map, Value};

// Floats are left out: without serde_json's `float_roundtrip` feature the
// parser may land one ULP away from the printed value.
fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::Bool),
        any::<i64>().prop_map(Value::from),
        any::<u64>().prop_map(Value::from),
        any::<String>().prop_map(Value::String),
    ];
    leaf.prop_recursive(4, 64, 8, |inner| {
        prop_oneof![
            proptest::collection::vec(inner.clone(), 0..8).prop_map(Value::Array),
            proptest::collection::vec((any::<String>(), inner), 0..8)
                .prop_map(|entries| Value::Object(entries.into_iter().collect::<Map<_, _>>())),
        ]
    })
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        .. ProptestConfig::default()
    })]

    #[test]
    fn any_json_value_survives_framing(value in json_value()) {
        let mut buf = Vec::new();
        write_json_message(&mut buf, &value).unwrap();

        let body = serde_json::to_vec(&value).unwrap();
        let header = format!("Content-Length: {}\r\n\r\n", body.len());
        prop_assert!(buf.starts_with(header.as_bytes()));
        prop_assert_eq!(buf.len(), header.len() + body.len());

        let mut cursor = Cursor::new(buf);
        let decoded: Option<Value> = read_json_message(&mut cursor).unwrap();
        prop_assert_eq!(decoded, Some(value));
        prop_assert!(read_raw_message(&mut cursor).unwrap().is_none());
    }

    #[test]
    fn consecutive_values_decode_in_order(values in proptest::collection::vec(json_value(), 1..6)) {
        let mut buf = Vec::new();
        for value in &values {
            write_json_message(&mut buf, value).unwrap();
        }

        let mut cursor = Cursor::new(buf);
        for value in &values {
            let decoded: Option<Value> = read_json_message(&mut cursor).unwrap();
            prop_assert_eq!(decoded.as_ref(), Some(value));
        }
        prop_assert!(read_raw_message(&mut cursor).unwrap().is_none());
    }
}
