//! Buffered response recorder.
//!
//! Handlers never touch the socket. They write into a [`ResponseWriter`] that
//! the service flushes once the handler returns, so headers stay mutable after
//! the status has been chosen.

use std::io;

use http::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use tracing::debug;

/// Canonical reason phrase for a status line.
#[must_use]
pub fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the status. Only the first call takes effect.
    pub fn write_header(&mut self, status: StatusCode) {
        match self.status {
            None => self.status = Some(status),
            Some(existing) if existing != status => {
                debug!(
                    existing = existing.as_u16(),
                    ignored = status.as_u16(),
                    "Superfluous write_header call"
                );
            }
            Some(_) => {}
        }
    }

    /// Status to send; `200 OK` when nothing was recorded.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status.unwrap_or(StatusCode::OK)
    }

    #[must_use]
    pub fn is_status_written(&self) -> bool {
        self.status.is_some()
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Replace a header value.
    pub fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    /// Set `Content-Type`; an invalid value is ignored with a debug event.
    pub fn set_content_type(&mut self, content_type: &str) {
        match HeaderValue::from_str(content_type) {
            Ok(value) => {
                self.headers.insert(CONTENT_TYPE, value);
            }
            Err(_) => debug!(content_type = %content_type, "Ignoring invalid content type"),
        }
    }

    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Drop status and body before an error response; headers are kept.
    pub fn discard(&mut self) {
        self.status = None;
        self.body.clear();
        self.headers.remove(CONTENT_TYPE);
    }

    #[must_use]
    pub fn into_parts(self) -> (StatusCode, HeaderMap, Vec<u8>) {
        (self.status(), self.headers, self.body)
    }
}

impl io::Write for ResponseWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.status.is_none() {
            self.status = Some(StatusCode::OK);
        }
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
