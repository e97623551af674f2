//! # Binding Module
//!
//! Populates typed values from the unstructured parts of a request: route
//! variables, the URL query string, and form bodies (urlencoded or
//! `multipart/form-data`).
//!
//! All sources are first collected into [`Values`], an ordered multi-value map,
//! and then deserialized with `serde_urlencoded`. Scalars are parsed from their
//! string form, so `?limit=10` binds into a `u32` field.
//!
//! Duplicate keys are kept in [`Values`], but binding a repeated key into a
//! plain struct field fails with [`BindingError::Invalid`] (duplicate field).

mod multipart;
mod values;

use http::Method;
use serde::de::DeserializeOwned;
use tracing::debug;

pub use multipart::parse_multipart;
pub use values::Values;

use crate::server::Request;

/// Why a binding (or a strict form parse) failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BindingError {
    /// Urlencoded input with a bad escape or separator
    #[error("malformed form data: {0}")]
    MalformedForm(String),
    /// Multipart body that does not follow its declared boundary
    #[error("malformed multipart body: {0}")]
    MalformedMultipart(String),
    /// Input parsed but does not fit the target type
    #[error("invalid binding: {0}")]
    Invalid(String),
}

/// Deserialize `T` from a multi-value map.
///
/// # Errors
///
/// Returns [`BindingError::Invalid`] when a required field is missing, a value
/// does not parse as the field's type, or a single-valued field is repeated.
pub fn bind_values<T: DeserializeOwned>(values: &Values) -> Result<T, BindingError> {
    serde_urlencoded::from_str(&values.encode()).map_err(|e| BindingError::Invalid(e.to_string()))
}

/// Lenient query parsing: malformed escapes are decoded lossily.
#[must_use]
pub fn parse_query(query: &str) -> Values {
    url::form_urlencoded::parse(query.as_bytes())
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect()
}

fn is_hex(b: u8) -> bool {
    b.is_ascii_hexdigit()
}

fn decode_component(raw: &str) -> Result<String, BindingError> {
    let bytes = raw.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match (bytes.get(i + 1), bytes.get(i + 2)) {
                (Some(&a), Some(&b)) if is_hex(a) && is_hex(b) => i += 3,
                _ => {
                    return Err(BindingError::MalformedForm(format!(
                        "invalid escape in {raw:?}"
                    )))
                }
            }
        } else {
            i += 1;
        }
    }
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|s| s.into_owned())
        .map_err(|e| BindingError::MalformedForm(e.to_string()))
}

/// Strict urlencoded parsing.
///
/// # Errors
///
/// Returns [`BindingError::MalformedForm`] for escapes that are not `%XX`,
/// escapes that decode to invalid UTF-8, and `;` used as a pair separator.
pub fn parse_form_strict(input: &str) -> Result<Values, BindingError> {
    let mut values = Values::new();
    for pair in input.split('&') {
        if pair.is_empty() {
            continue;
        }
        if pair.contains(';') {
            return Err(BindingError::MalformedForm(
                "invalid semicolon separator".to_string(),
            ));
        }
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        values.add(decode_component(key)?, decode_component(value)?);
    }
    Ok(values)
}

/// Look up a parameter of a media type, e.g. the `boundary` of
/// `multipart/form-data; boundary="xyz"`.
#[must_use]
pub fn media_param<'a>(content_type: &'a str, name: &str) -> Option<&'a str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        if key.trim().eq_ignore_ascii_case(name) {
            Some(value.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase()
}

/// Parse the form values of a request: body values first for
/// `POST`/`PUT`/`PATCH`, then the URL query.
///
/// A missing or unrelated `Content-Type` contributes no body values.
///
/// # Errors
///
/// Propagates [`BindingError::MalformedForm`] and
/// [`BindingError::MalformedMultipart`] from the body or query.
pub fn parse_request_form(req: &Request) -> Result<Values, BindingError> {
    let mut form = Values::new();
    let has_body = matches!(*req.method(), Method::POST | Method::PUT | Method::PATCH);
    if has_body {
        let content_type = req
            .headers()
            .get(http::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        match media_type(content_type).as_str() {
            "application/x-www-form-urlencoded" => {
                let body = std::str::from_utf8(req.body())
                    .map_err(|e| BindingError::MalformedForm(e.to_string()))?;
                form.extend(parse_form_strict(body)?);
            }
            "multipart/form-data" => {
                let boundary = media_param(content_type, "boundary").ok_or_else(|| {
                    BindingError::MalformedMultipart("missing boundary".to_string())
                })?;
                form.extend(parse_multipart(req.body(), boundary)?);
            }
            other => {
                debug!(content_type = %other, "Request body is not a form");
            }
        }
    }
    if let Some(query) = req.uri().query() {
        form.extend(parse_form_strict(query)?);
    }
    Ok(form)
}
