use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use http::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use wicket::encoding::{
    codec_names, get_codec, register_codec, Codec, CodecError, CodecExt, MsgPackCodec,
};
use wicket::server::{Context, ContextExt, Server, ServerOptions};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
struct Invoice {
    number: u32,
    customer: String,
    lines: Vec<Line>,
    meta: BTreeMap<String, String>,
    paid: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
struct Line {
    sku: String,
    cents: i64,
}

fn invoice() -> Invoice {
    Invoice {
        number: 1001,
        customer: "Umbrella".into(),
        lines: vec![
            Line {
                sku: "A".into(),
                cents: 1999,
            },
            Line {
                sku: "B".into(),
                cents: -250,
            },
        ],
        meta: BTreeMap::from([("region".to_string(), "eu".to_string())]),
        paid: None,
    }
}

#[test]
fn test_msgpack_from_registry_roundtrips_nested_struct() {
    let codec = get_codec("msgpack").expect("msgpack registered");
    let bytes = codec.marshal_as(&invoice()).unwrap();
    let mut decoded = Invoice::default();
    codec.unmarshal_into(&bytes, &mut decoded).unwrap();
    assert_eq!(decoded, invoice());
}

#[test]
fn test_msgpack_output_differs_from_json() {
    let msgpack = get_codec("msgpack").unwrap();
    let json_codec = get_codec("json").unwrap();
    let value = json!({"n": 1});
    assert_ne!(
        msgpack.marshal(&value).unwrap(),
        json_codec.marshal(&value).unwrap()
    );
}

#[test]
fn test_msgpack_non_string_map_keys_fail_to_encode() {
    let mut weird: HashMap<Vec<u8>, u8> = HashMap::new();
    weird.insert(vec![1, 2], 3);
    let err = MsgPackCodec.marshal_as(&weird).unwrap_err();
    assert!(matches!(err, CodecError::Encode(_)), "{err:?}");
}

#[test]
fn test_msgpack_garbage_fails_to_decode() {
    let err = MsgPackCodec.unmarshal(&[0xc1]).unwrap_err();
    assert!(matches!(err, CodecError::Decode(_)));
}

#[test]
fn test_msgpack_decodes_to_neutral_value() {
    // {"ok": true, "n": [1, -1]}
    let bytes = [
        0x82, 0xa2, b'o', b'k', 0xc3, 0xa1, b'n', 0x92, 0x01, 0xff,
    ];
    let value = MsgPackCodec.unmarshal(&bytes).unwrap();
    assert_eq!(value, json!({"ok": true, "n": [1, -1]}));
}

#[test]
fn test_lookup_is_case_insensitive() {
    assert_eq!(get_codec("MsgPack").unwrap().name(), "msgpack");
    assert!(codec_names().contains(&"msgpack".to_string()));
}

struct Csv;

impl Codec for Csv {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let row = value
            .as_array()
            .ok_or_else(|| CodecError::encode("csv rows must be arrays"))?;
        Ok(row
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
            .into_bytes())
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError> {
        let text = std::str::from_utf8(data).map_err(|e| CodecError::decode(e.to_string()))?;
        Ok(Value::Array(
            text.split(',').map(|s| Value::String(s.to_string())).collect(),
        ))
    }

    fn name(&self) -> &'static str {
        "csv"
    }

    fn content_type(&self) -> &'static str {
        "text/csv"
    }
}

#[test]
fn test_registered_codec_is_negotiated() {
    register_codec(Arc::new(Csv)).unwrap();

    let mut server = Server::new(ServerOptions::default());
    server.route("/").post("/rows", |ctx: &mut dyn Context| {
        let mut row: Vec<String> = Vec::new();
        ctx.bind(&mut row)?;
        row.reverse();
        ctx.result(200, &row)
    });
    let svc = server.into_service();

    let req = http::Request::builder()
        .method("POST")
        .uri("/rows")
        .header(CONTENT_TYPE, "text/csv")
        .header("accept", "text/csv")
        .body(b"a,b,c".to_vec())
        .unwrap();
    let res = svc.handle(req);
    assert_eq!(res.status().as_u16(), 200);
    assert_eq!(res.headers()[CONTENT_TYPE], "text/csv");
    assert_eq!(res.body(), br#""c","b","a""#);
}
