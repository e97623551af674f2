//! Minimal `multipart/form-data` reader for text fields.
//!
//! Parts carrying a `filename` are skipped; file uploads are not bound.

use tracing::debug;

use super::{BindingError, Values};

fn find(haystack: &[u8], needle: &[u8], from: usize) -> Option<usize> {
    if needle.is_empty() || from > haystack.len() {
        return None;
    }
    haystack[from..]
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|p| p + from)
}

fn malformed(message: impl Into<String>) -> BindingError {
    BindingError::MalformedMultipart(message.into())
}

/// Disposition parameter, e.g. `name` of `form-data; name="title"`.
fn disposition_param<'a>(disposition: &'a str, param: &str) -> Option<&'a str> {
    disposition.split(';').skip(1).find_map(|p| {
        let (k, v) = p.split_once('=')?;
        if k.trim().eq_ignore_ascii_case(param) {
            Some(v.trim().trim_matches('"'))
        } else {
            None
        }
    })
}

fn parse_part(part: &[u8], values: &mut Values) -> Result<(), BindingError> {
    let split = find(part, b"\r\n\r\n", 0).ok_or_else(|| malformed("part without headers"))?;
    let head = std::str::from_utf8(&part[..split])
        .map_err(|_| malformed("part headers are not UTF-8"))?;
    let body = &part[split + 4..];

    let disposition = head
        .split("\r\n")
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-disposition"))
        .map(|(_, value)| value.trim())
        .ok_or_else(|| malformed("part without Content-Disposition"))?;

    let name =
        disposition_param(disposition, "name").ok_or_else(|| malformed("part without name"))?;
    if disposition_param(disposition, "filename").is_some() {
        debug!(field = %name, "Skipping multipart file part");
        return Ok(());
    }
    let text = std::str::from_utf8(body).map_err(|_| malformed("field value is not UTF-8"))?;
    values.add(name, text);
    Ok(())
}

/// Read the text fields of a multipart body.
///
/// # Errors
///
/// Returns [`BindingError::MalformedMultipart`] when the boundary is empty, the
/// body never opens or closes with it, or a part lacks a field name.
pub fn parse_multipart(body: &[u8], boundary: &str) -> Result<Values, BindingError> {
    if boundary.is_empty() {
        return Err(malformed("empty boundary"));
    }
    let delimiter = format!("--{boundary}");
    let delimiter = delimiter.as_bytes();
    let separator = format!("\r\n--{boundary}");
    let separator = separator.as_bytes();

    let mut values = Values::new();
    let mut cursor = find(body, delimiter, 0).ok_or_else(|| malformed("boundary not found"))?
        + delimiter.len();

    loop {
        let rest = &body[cursor..];
        if rest.starts_with(b"--") {
            return Ok(values);
        }
        if !rest.starts_with(b"\r\n") {
            return Err(malformed("expected CRLF after boundary"));
        }
        let start = cursor + 2;
        let end = find(body, separator, start).ok_or_else(|| malformed("unterminated part"))?;
        parse_part(&body[start..end], &mut values)?;
        cursor = end + separator.len();
    }
}
