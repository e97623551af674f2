//! Default request decoder and response/error encoders.
//!
//! Requests are decoded with the codec named by their `Content-Type`;
//! responses and errors are encoded with the first registered codec listed in
//! `Accept`, falling back to `json`.

use std::io::Write;
use std::sync::Arc;

use http::header::{ACCEPT, CONTENT_TYPE};
use http::{HeaderName, StatusCode};
use serde_json::Value;
use tracing::{debug, error};

use super::{Request, ResponseWriter};
use crate::encoding::{content_subtype, get_codec, Codec};
use crate::errors::Error;

/// Turns a request body into a value; `None` for an empty body.
pub type RequestDecoder = Arc<dyn Fn(&Request) -> Result<Option<Value>, Error> + Send + Sync>;

/// Writes a handler's reply into the response.
pub type ResponseEncoder =
    Arc<dyn Fn(&mut ResponseWriter, &Request, &Value) -> Result<(), Error> + Send + Sync>;

/// Writes an error response.
pub type ErrorEncoder = Arc<dyn Fn(&mut ResponseWriter, &Request, &Error) + Send + Sync>;

/// First registered codec named by `header`.
///
/// `Accept` style lists are scanned left to right; parameters such as `q=`
/// are ignored.
#[must_use]
pub fn codec_for_request(req: &Request, header: &HeaderName) -> Option<Arc<dyn Codec>> {
    req.headers()
        .get_all(header)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(','))
        .filter_map(content_subtype)
        .find_map(get_codec)
}

fn json_codec() -> Result<Arc<dyn Codec>, Error> {
    get_codec("json").ok_or_else(|| Error::internal("CODEC", "json codec is not registered"))
}

/// Codec for replying to `req`, falling back to `json`.
///
/// # Errors
///
/// Fails only if the `json` codec has been removed from the registry.
pub fn reply_codec(req: &Request) -> Result<Arc<dyn Codec>, Error> {
    match codec_for_request(req, &ACCEPT) {
        Some(codec) => Ok(codec),
        None => json_codec(),
    }
}

/// Decode the body with the codec selected by `Content-Type`.
///
/// A request without `Content-Type` is read as JSON.
///
/// # Errors
///
/// `400 CODEC` for an unregistered content type or an undecodable body.
pub fn default_request_decoder(req: &Request) -> Result<Option<Value>, Error> {
    if req.body().is_empty() {
        return Ok(None);
    }
    let codec = match req.headers().get(CONTENT_TYPE) {
        None => json_codec()?,
        Some(_) => codec_for_request(req, &CONTENT_TYPE).ok_or_else(|| {
            let content_type = req
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("");
            Error::bad_request(
                "CODEC",
                format!("unregistered Content-Type: {content_type}"),
            )
        })?,
    };
    let value = codec.unmarshal(req.body())?;
    debug!(codec = codec.name(), "Request body decoded");
    Ok(Some(value))
}

/// Encode `value` with the negotiated codec. `Null` writes nothing.
///
/// # Errors
///
/// `500 CODEC` when the value cannot be represented by the codec.
pub fn default_response_encoder(
    w: &mut ResponseWriter,
    req: &Request,
    value: &Value,
) -> Result<(), Error> {
    if value.is_null() {
        return Ok(());
    }
    let codec = reply_codec(req)?;
    let data = codec.marshal(value)?;
    w.set_content_type(codec.content_type());
    w.write_all(&data)?;
    Ok(())
}

/// Write `err` with its status, encoded by the negotiated codec.
pub fn default_error_encoder(w: &mut ResponseWriter, req: &Request, err: &Error) {
    let encoded = reply_codec(req).and_then(|codec| {
        let value =
            serde_json::to_value(err).map_err(|e| Error::internal("CODEC", e.to_string()))?;
        let data = codec.marshal(&value)?;
        Ok((codec, data))
    });
    match encoded {
        Ok((codec, data)) => {
            w.set_content_type(codec.content_type());
            w.write_header(err.status());
            if let Err(e) = w.write_all(&data) {
                error!(error = %e, "Failed to write error body");
            }
        }
        Err(e) => {
            error!(error = %e, original = %err, "Failed to encode error response");
            w.set_content_type("text/plain");
            w.write_header(StatusCode::INTERNAL_SERVER_ERROR);
            if let Err(e) = w.write_all(err.message.as_bytes()) {
                error!(error = %e, "Failed to write error body");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoding::CodecExt;
    use serde_json::json;

    fn request(headers: &[(&str, &str)], body: &[u8]) -> Request {
        let mut builder = http::Request::builder().method("POST").uri("/");
        for (k, v) in headers {
            builder = builder.header(*k, *v);
        }
        builder.body(body.to_vec()).unwrap()
    }

    #[test]
    fn test_decoder_uses_content_type() {
        let body = get_codec("msgpack")
            .unwrap()
            .marshal_as(&json!({"name": "Rex"}))
            .unwrap();
        let req = request(&[("content-type", "application/msgpack")], &body);
        let value = default_request_decoder(&req).unwrap().unwrap();
        assert_eq!(value, json!({"name": "Rex"}));
    }

    #[test]
    fn test_decoder_rejects_unknown_content_type() {
        let req = request(&[("content-type", "application/yaml")], b"a: 1");
        let err = default_request_decoder(&req).unwrap_err();
        assert_eq!(err.code, 400);
        assert_eq!(err.reason, "CODEC");
    }

    #[test]
    fn test_decoder_empty_body_is_none() {
        let req = request(&[("content-type", "application/yaml")], b"");
        assert!(default_request_decoder(&req).unwrap().is_none());
    }

    #[test]
    fn test_decoder_bad_body_is_bad_request() {
        let req = request(&[("content-type", "application/json")], b"{oops");
        assert_eq!(default_request_decoder(&req).unwrap_err().code, 400);
    }

    #[test]
    fn test_encoder_negotiates_accept() {
        let req = request(&[("accept", "text/html, application/xml;q=0.9")], b"");
        let mut w = ResponseWriter::new();
        default_response_encoder(&mut w, &req, &json!({"id": 1})).unwrap();
        assert_eq!(w.headers()[CONTENT_TYPE], "application/xml");
        assert!(String::from_utf8_lossy(w.body()).contains("<id>1</id>"));
    }

    #[test]
    fn test_encoder_falls_back_to_json() {
        let req = request(&[("accept", "*/*")], b"");
        let mut w = ResponseWriter::new();
        default_response_encoder(&mut w, &req, &json!([1, 2])).unwrap();
        assert_eq!(w.headers()[CONTENT_TYPE], "application/json");
        assert_eq!(w.body(), b"[1,2]");
    }

    #[test]
    fn test_encoder_null_writes_nothing() {
        let req = request(&[], b"");
        let mut w = ResponseWriter::new();
        default_response_encoder(&mut w, &req, &Value::Null).unwrap();
        assert!(w.body().is_empty());
        assert!(w.headers().get(CONTENT_TYPE).is_none());
    }

    #[test]
    fn test_error_encoder_writes_status_and_body() {
        let req = request(&[("accept", "application/json")], b"");
        let mut w = ResponseWriter::new();
        default_error_encoder(&mut w, &req, &Error::not_found("PET", "no such pet"));
        assert_eq!(w.status(), StatusCode::NOT_FOUND);
        let body: Value = serde_json::from_slice(w.body()).unwrap();
        assert_eq!(body["reason"], "PET");
        assert_eq!(body["code"], 404);
    }
}
