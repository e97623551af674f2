//! MessagePack codec.
//!
//! Registered as `msgpack` and negotiated through `application/msgpack`.
//! Serialization is delegated to `rmp-serde`. Decoding must consume the
//! whole input; trailing bytes are a decode error. Maps are written with named
//! (string) keys so struct fields survive a trip through other codecs.
//!
//! # Lossy conversions
//!
//! Values pass through the neutral [`serde_json::Value`] model, so:
//!
//! - `f32` is widened to `f64` and comes back as a float64.
//! - Non-finite floats (`NaN`, `±inf`) are encoded as `nil`.
//! - Byte buffers (`Vec<u8>`, `&[u8]`) are encoded as arrays of integers, not
//!   as msgpack `bin`.
//! - Incoming `bin` and `ext` payloads cannot be represented and fail with
//!   [`CodecError::Decode`].
//! - Integers outside the `i64`/`u64` range are rejected on encode.
//!
//! Everything else (booleans, integers, strings, arrays, string-keyed maps,
//! `nil`) round-trips exactly.
//!
//! # Security Considerations
//!
//! msgpack can declare arbitrarily large strings and arrays. Cap request size
//! at the transport (see `ServerOptions::max_body_bytes`) before decoding
//! untrusted input.

use std::io::Cursor;

use serde::Deserialize;
use serde_json::Value;

use super::{Codec, CodecError};

/// MessagePack binary codec.
#[derive(Debug, Clone, Copy, Default)]
pub struct MsgPackCodec;

impl Codec for MsgPackCodec {
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError> {
        rmp_serde::to_vec_named(value).map_err(|e| CodecError::encode(e.to_string()))
    }

    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError> {
        let mut cursor = Cursor::new(data);
        let value = {
            let mut de = rmp_serde::Deserializer::new(&mut cursor);
            Value::deserialize(&mut de).map_err(|e| CodecError::decode(e.to_string()))?
        };
        let consumed = cursor.position() as usize;
        if consumed < data.len() {
            return Err(CodecError::decode(format!(
                "{} trailing bytes after msgpack value",
                data.len() - consumed
            )));
        }
        Ok(value)
    }

    fn name(&self) -> &'static str {
        "msgpack"
    }

    fn content_type(&self) -> &'static str {
        "application/msgpack"
    }
}
