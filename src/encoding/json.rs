use serde_json::Value;

use super::{Codec, CodecError};

/// JSON codec backed by `serde_json`; the negotiation fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        serde_json::to_vec(value).map_err(|e| CodecError::encode(e.to_string()))
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError> {
        serde_json::from_slice(data).map_err(|e| CodecError::decode(e.to_string()))
    }

    fn name(&self) -> &'static str {
        "json"
    }

    fn content_type(&self) -> &'static str {
        "application/json"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CodecExt;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_json_marshal_is_compact() {
        let out = JsonCodec.marshal(&json!({"id": 1})).unwrap();
        assert_eq!(out, br#"{"id":1}"#);
    }

    #[test]
    fn test_json_non_string_keys_fail_to_encode() {
        let mut grid: HashMap<(u8, u8), u8> = HashMap::new();
        grid.insert((0, 0), 1);
        let err = JsonCodec.marshal_as(&grid).unwrap_err();
        assert!(matches!(err, CodecError::Encode(_)));
    }

    #[test]
    fn test_json_trailing_garbage_fails_to_decode() {
        let err = JsonCodec.unmarshal(b"{} {}").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
    }
}
