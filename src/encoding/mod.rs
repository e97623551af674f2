//! # Encoding Module
//!
//! Pluggable content codecs selected by name during content negotiation.
//!
//! ## Overview
//!
//! A [`Codec`] turns values into bytes and back. Codecs are registered in a
//! process-wide registry keyed by their lowercase [`Codec::name`], which is
//! also the content subtype the HTTP layer negotiates on:
//!
//! | Name                    | Content type                         |
//! |-------------------------|--------------------------------------|
//! | `json`                  | `application/json`                   |
//! | `msgpack`               | `application/msgpack`                |
//! | `xml`                   | `application/xml`                    |
//! | `x-www-form-urlencoded` | `application/x-www-form-urlencoded`  |
//!
//! The built-in codecs are installed the first time the registry is touched.
//!
//! ## Value Model
//!
//! Codecs are object-safe so they can live behind `Arc<dyn Codec>` in the
//! registry. They therefore operate on the neutral [`serde_json::Value`] model,
//! the same representation request bodies use elsewhere in the crate. Typed
//! access goes through [`CodecExt`]:
//!
//! ```rust
//! use serde::{Deserialize, Serialize};
//! use wicket::encoding::{get_codec, CodecExt};
//!
//! #[derive(Serialize, Deserialize, Debug, PartialEq, Default)]
//! struct Pet {
//!     id: u64,
//!     name: String,
//! }
//!
//! let codec = get_codec("msgpack").unwrap();
//! let bytes = codec.marshal_as(&Pet { id: 7, name: "Rex".into() }).unwrap();
//!
//! let mut pet = Pet::default();
//! codec.unmarshal_into(&bytes, &mut pet).unwrap();
//! assert_eq!(pet.name, "Rex");
//! ```
//!
//! Codecs are stateless and safe to share across coroutines.

pub mod form;
pub mod json;
pub mod msgpack;
pub mod xml;

use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::Lazy;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

pub use form::FormCodec;
pub use json::JsonCodec;
pub use msgpack::MsgPackCodec;
pub use xml::XmlCodec;

/// Codec failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The value could not be represented in the target format
    #[error("encode: {0}")]
    Encode(String),
    /// The input was truncated, corrupt, or did not match the target type
    #[error("decode: {0}")]
    Decode(String),
    /// A codec was registered with an empty name
    #[error("invalid codec name: {0:?}")]
    InvalidName(String),
}

impl CodecError {
    pub fn encode(message: impl Into<String>) -> Self {
        Self::Encode(message.into())
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::Decode(message.into())
    }
}

/// A named, stateless content codec.
pub trait Codec: Send + Sync {
    /// Serialize `value` into this codec's wire format.
    fn marshal(&self, value: &Value) -> Result<Vec<u8>, CodecError>;

    /// Decode `data` into the neutral value model.
    fn unmarshal(&self, data: &[u8]) -> Result<Value, CodecError>;

    /// Registry name; doubles as the negotiated content subtype.
    fn name(&self) -> &'static str;

    /// Full media type written on responses produced by this codec.
    fn content_type(&self) -> &'static str;
}

/// Typed helpers layered over any [`Codec`].
pub trait CodecExt: Codec {
    /// Serialize any `Serialize` value.
    ///
    /// Values the neutral model cannot hold (maps with non-string keys,
    /// `Serialize` impls that fail) return [`CodecError::Encode`].
    fn marshal_as<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, CodecError> {
        let value = serde_json::to_value(value).map_err(|e| CodecError::encode(e.to_string()))?;
        self.marshal(&value)
    }

    /// Decode into a new `T`.
    fn unmarshal_as<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, CodecError> {
        let value = self.unmarshal(data)?;
        serde_json::from_value(value).map_err(|e| CodecError::decode(e.to_string()))
    }

    /// Decode into an existing target. The target is only replaced on success.
    fn unmarshal_into<T: DeserializeOwned>(
        &self,
        data: &[u8],
        target: &mut T,
    ) -> Result<(), CodecError> {
        *target = self.unmarshal_as(data)?;
        Ok(())
    }
}

impl<C: Codec + ?Sized> CodecExt for C {}

type Registry = HashMap<String, Arc<dyn Codec>>;

static REGISTRY: Lazy<RwLock<Registry>> = Lazy::new(|| {
    let mut codecs: Registry = HashMap::new();
    let builtins: [Arc<dyn Codec>; 4] = [
        Arc::new(JsonCodec),
        Arc::new(MsgPackCodec),
        Arc::new(XmlCodec),
        Arc::new(FormCodec),
    ];
    for codec in builtins {
        codecs.insert(codec.name().to_string(), codec);
    }
    RwLock::new(codecs)
});

/// Register a codec under its lowercase name, replacing any previous entry.
///
/// # Errors
///
/// Returns [`CodecError::InvalidName`] when the codec reports an empty name.
pub fn register_codec(codec: Arc<dyn Codec>) -> Result<(), CodecError> {
    let name = codec.name().trim().to_ascii_lowercase();
    if name.is_empty() {
        return Err(CodecError::InvalidName(codec.name().to_string()));
    }
    let previous = REGISTRY.write().insert(name.clone(), codec);
    if previous.is_some() {
        warn!(codec = %name, "Replaced existing codec registration");
    } else {
        debug!(codec = %name, "Codec registered");
    }
    Ok(())
}

/// Look a codec up by name (case-insensitive).
#[must_use]
pub fn get_codec(name: &str) -> Option<Arc<dyn Codec>> {
    let registry = REGISTRY.read();
    if let Some(codec) = registry.get(name) {
        return Some(Arc::clone(codec));
    }
    registry.get(&name.to_ascii_lowercase()).map(Arc::clone)
}

/// Names of every registered codec, sorted.
#[must_use]
pub fn codec_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY.read().keys().cloned().collect();
    names.sort();
    names
}

/// Extract the content subtype used as a codec name.
///
/// `application/json; charset=utf-8` yields `json`. Structured-syntax suffixes
/// win over the full subtype, so `application/problem+json` also yields `json`.
#[must_use]
pub fn content_subtype(content_type: &str) -> Option<&str> {
    let media = content_type.split(';').next()?.trim();
    let (_, subtype) = media.split_once('/')?;
    let subtype = subtype.trim();
    if subtype.is_empty() {
        return None;
    }
    match subtype.rsplit_once('+') {
        Some((_, suffix)) if !suffix.is_empty() => Some(suffix),
        _ => Some(subtype),
    }
}
