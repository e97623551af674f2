//! XML codec backed by `quick-xml`.
//!
//! Values are wrapped in a `<xml>` root element. XML has no scalar types, so
//! decoded leaves always come back as strings and empty elements as `""`.
//! Attributes keep `quick-xml`'s `@name` keys.

use serde_json::Value;

use super::{Codec, CodecError};

/// Root element written around marshalled values.
pub const ROOT_ELEMENT: &str = "xml";

/// Keys `quick-xml` uses for element text content.
const TEXT_KEYS: [&str; 2] = ["$text", "$value"];

/// Fold text-only elements into their string; empty elements become `""`.
fn collapse(value: Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        Value::Object(map) if map.is_empty() => Value::String(String::new()),
        Value::Object(mut map)
            if map.len() == 1 && TEXT_KEYS.iter().any(|k| map.contains_key(*k)) =>
        {
            let text = TEXT_KEYS
                .iter()
                .find_map(|k| map.remove(*k))
                .unwrap_or_default();
            collapse(text)
        }
        Value::Object(map) => {
            Value::Object(map.into_iter().map(|(k, v)| (k, collapse(v))).collect())
        }
        Value::Array(items) => Value::Array(items.into_iter().map(collapse).collect()),
        other => other,
    }
}

/// The root keeps its shape: an empty document decodes to an empty object.
fn collapse_root(value: Value) -> Value {
    match value {
        Value::Object(map) if map.is_empty() => Value::Object(map),
        Value::Null => Value::Object(serde_json::Map::new()),
        other => collapse(other),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl Codec for XmlCodec {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        quick_xml::se::to_string_with_root(ROOT_ELEMENT, value)
            .map(String::into_bytes)
            .map_err(|e| CodecError::encode(e.to_string()))
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError> {
        let text = std::str::from_utf8(data).map_err(|e| CodecError::decode(e.to_string()))?;
        quick_xml::de::from_str(text)
            .map(collapse_root)
            .map_err(|e| CodecError::decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "xml"
    }

    fn content_type(&self) -> &'static str {
        "application/xml"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CodecExt;
    use serde::{Deserialize, Serialize};
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Owner {
        name: String,
        city: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Pet {
        name: String,
        kind: String,
        owner: Owner,
    }

    #[test]
    fn test_xml_roundtrip_struct() {
        let pet = Pet {
            name: "Rex".into(),
            kind: "dog".into(),
            owner: Owner {
                name: "Ada".into(),
                city: "Leeds".into(),
            },
        };
        let bytes = XmlCodec.marshal_as(&pet).unwrap();
        let decoded: Pet = XmlCodec.unmarshal_as(&bytes).unwrap();
        assert_eq!(decoded, pet);
    }

    #[test]
    fn test_xml_text_leaves_are_strings() {
        let value = XmlCodec
            .unmarshal(b"<xml><id>5</id><note/><tags><tag>a</tag></tags></xml>")
            .unwrap();
        assert_eq!(value["id"], json!("5"));
        assert_eq!(value["note"], json!(""));
        assert_eq!(value["tags"]["tag"], json!("a"));
    }

    #[test]
    fn test_collapse_text_only_object() {
        assert_eq!(collapse(json!({"$text": "Rex"})), json!("Rex"));
        assert_eq!(collapse(json!({"$value": "Rex"})), json!("Rex"));
        assert_eq!(collapse(json!({})), json!(""));
        assert_eq!(
            collapse(json!({"@id": "1", "$text": "Rex"})),
            json!({"@id": "1", "$text": "Rex"})
        );
        assert_eq!(collapse_root(json!({})), json!({}));
    }

    #[test]
    fn test_xml_marshal_wraps_in_root() {
        let out = XmlCodec.marshal(&json!({"name": "Rex"})).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.starts_with("<xml>"), "{text}");
        assert!(text.contains("<name>Rex</name>"), "{text}");
    }

    #[test]
    fn test_xml_rejects_invalid_utf8() {
        let err = XmlCodec.unmarshal(&[0xff, 0xfe, 0x00]).unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
