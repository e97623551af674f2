//! `application/x-www-form-urlencoded` codec.
//!
//! Only flat objects can be encoded: scalar members become one pair, arrays of
//! scalars become repeated pairs and `null` members are skipped. Decoding gives
//! a string for a key seen once and an array of strings for repeated keys.

use serde_json::{Map, Value};

use super::{Codec, CodecError};
use crate::binding;

#[derive(Debug, Clone, Copy, Default)]
pub struct FormCodec;

fn scalar_to_string(key: &str, value: &Value) -> Result<Option<String>, CodecError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s.clone())),
        Value::Bool(b) => Ok(Some(b.to_string())),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::Array(_) | Value::Object(_) => Err(CodecError::encode(format!(
            "form field {key:?} must be a scalar"
        ))),
    }
}

impl Codec for FormCodec {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        let object = value
            .as_object()
            .ok_or_else(|| CodecError::encode("form codec can only encode objects"))?;
        let mut out = url::form_urlencoded::Serializer::new(String::new());
        for (key, member) in object {
            match member {
                Value::Array(items) => {
                    for item in items {
                        if let Some(s) = scalar_to_string(key, item)? {
                            out.append_pair(key, &s);
                        }
                    }
                }
                other => {
                    if let Some(s) = scalar_to_string(key, other)? {
                        out.append_pair(key, &s);
                    }
                }
            }
        }
        Ok(out.finish().into_bytes())
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError> {
        let text = std::str::from_utf8(data).map_err(|e| CodecError::decode(e.to_string()))?;
        let values =
            binding::parse_form_strict(text).map_err(|e| CodecError::decode(e.to_string()))?;
        let mut object = Map::with_capacity(values.len());
        for (key, mut items) in values.into_iter() {
            let member = if items.len() == 1 {
                Value::String(items.remove(0))
            } else {
                Value::Array(items.into_iter().map(Value::String).collect())
            };
            object.insert(key, member);
        }
        Ok(Value::Object(object))
    }

    fn name(&self) -> &'static str {
        "x-www-form-urlencoded"
    }

    fn content_type(&self) -> &'static str {
        "application/x-www-form-urlencoded"
    }
}
