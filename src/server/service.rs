//! `may_minihttp` service: request conversion, routing, handler dispatch and
//! response flushing.
//!
//! The per-request flow is:
//!
//! 1. Convert the raw request into an `http::Request<Vec<u8>>`, reading at
//!    most `max_body_bytes + 1` body bytes
//! 2. Reject oversized bodies with 413
//! 3. Route; unknown paths get 404, known paths with the wrong method 405
//! 4. Attach [`RouteVars`] and a [`Scope`] (transport metadata, timeout)
//! 5. Run the handler on a pooled context under `catch_unwind`
//! 6. Encode any error with the configured error encoder
//! 7. Flush the recorded response

use std::io::{self, Read};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use http::header::{HeaderName, HeaderValue, ALLOW, CONTENT_LENGTH};
use http::{HeaderMap, Method};
use may_minihttp::{HttpService, Response};
use once_cell::sync::Lazy;
use tracing::{debug, error, info, warn};

use super::writer::status_reason;
use super::{ContextPool, HandlerFunc, Request, ResponseWriter, ServerOptions};
use crate::errors::Error;
use crate::ids::RequestId;
use crate::router::{Lookup, RouteVars, Router};
use crate::scope::{Scope, Transport};

/// Distinct response header lines kept for `may_minihttp`, which only
/// accepts `&'static str` headers.
pub const MAX_INTERNED_HEADERS: usize = 1024;

static HEADER_LINES: Lazy<DashMap<String, &'static str>> = Lazy::new(DashMap::new);

fn intern_header(line: String) -> Option<&'static str> {
    if let Some(found) = HEADER_LINES.get(&line) {
        return Some(*found);
    }
    if HEADER_LINES.len() >= MAX_INTERNED_HEADERS {
        return None;
    }
    let leaked: &'static str = Box::leak(line.clone().into_boxed_str());
    Some(*HEADER_LINES.entry(line).or_insert(leaked))
}

fn invalid_data(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Bytes to read from a body capped at `max_body`: one extra detects overflow.
fn body_read_limit(max_body: usize) -> u64 {
    (max_body as u64).saturating_add(1)
}

/// Convert a `may_minihttp` request, reading at most `max_body + 1` bytes of
/// body so oversized requests can be detected without buffering them whole.
fn read_request(req: may_minihttp::Request, max_body: usize) -> io::Result<Request> {
    let method = Method::from_bytes(req.method().as_bytes()).map_err(invalid_data)?;
    let uri: http::Uri = req.path().parse().map_err(invalid_data)?;

    let mut headers = HeaderMap::new();
    for h in req.headers().iter() {
        match (
            HeaderName::from_bytes(h.name.as_bytes()),
            HeaderValue::from_bytes(h.value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => debug!(header = %h.name, "Dropping malformed request header"),
        }
    }

    let mut body = Vec::new();
    req.body()
        .take(body_read_limit(max_body))
        .read_to_end(&mut body)?;

    let mut request = http::Request::new(body);
    *request.method_mut() = method;
    *request.uri_mut() = uri;
    *request.headers_mut() = headers;
    Ok(request)
}

fn write_response(writer: ResponseWriter, res: &mut Response) {
    let (status, headers, body) = writer.into_parts();
    res.status_code(status.as_u16() as usize, status_reason(status.as_u16()));
    for (name, value) in &headers {
        // may_minihttp writes its own Content-Length
        if name == CONTENT_LENGTH {
            continue;
        }
        let Ok(value) = value.to_str() else {
            debug!(header = %name, "Skipping non-ASCII response header");
            continue;
        };
        match intern_header(format!("{}: {}", name.as_str(), value)) {
            Some(line) => {
                res.header(line);
            }
            None => warn!(
                header = %name,
                limit = MAX_INTERNED_HEADERS,
                "Header intern table full, dropping response header"
            ),
        }
    }
    res.body_vec(body);
}

/// The HTTP service. Clones share the route table, options and context pool.
#[derive(Clone)]
pub struct Service {
    router: Arc<Router<HandlerFunc>>,
    options: Arc<ServerOptions>,
    pool: Arc<ContextPool>,
}

impl Service {
    pub(crate) fn new(router: Router<HandlerFunc>, options: ServerOptions) -> Self {
        let options = Arc::new(options);
        Self {
            router: Arc::new(router),
            pool: Arc::new(ContextPool::new(Arc::clone(&options))),
            options,
        }
    }

    #[must_use]
    pub fn pool(&self) -> &ContextPool {
        &self.pool
    }

    fn error_response(&self, req: &Request, err: &Error) -> ResponseWriter {
        let mut writer = ResponseWriter::new();
        (self.options.error_encoder)(&mut writer, req, err);
        writer
    }

    /// Serve one converted request and return the recorded response.
    #[must_use]
    pub fn handle(&self, mut req: Request) -> ResponseWriter {
        let start = Instant::now();
        let request_id = RequestId::from_headers(req.headers());
        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let writer = if req.body().len() > self.options.max_body_bytes {
            let err = Error::new(
                413,
                "BODY_TOO_LARGE",
                format!("request body exceeds {} bytes", self.options.max_body_bytes),
            );
            self.error_response(&req, &err)
        } else {
            match self.router.lookup(&method, &path) {
                Lookup::Found(entry, vars) => {
                    let transport = Transport {
                        kind: "http",
                        operation: entry.pattern.to_string(),
                        method: method.clone(),
                        path: path.clone(),
                        request_id,
                        request_header: req.headers().clone(),
                    };
                    let mut scope = Scope::background().with_transport(transport);
                    if let Some(timeout) = self.options.timeout {
                        scope = scope.with_timeout(timeout);
                    }
                    let (scope, cancel) = scope.with_cancel();
                    req.extensions_mut().insert(RouteVars(vars));
                    req.extensions_mut().insert(scope);

                    let writer = self.dispatch(&entry.value, req, &entry.pattern);
                    cancel.cancel();
                    writer
                }
                Lookup::MethodNotAllowed(allowed) => {
                    let err = Error::new(
                        405,
                        "METHOD_NOT_ALLOWED",
                        format!("{method} is not allowed on {path}"),
                    );
                    let mut writer = self.error_response(&req, &err);
                    let allow = allowed
                        .iter()
                        .map(Method::as_str)
                        .collect::<Vec<_>>()
                        .join(", ");
                    if let Ok(value) = HeaderValue::from_str(&allow) {
                        writer.set_header(ALLOW, value);
                    }
                    writer
                }
                Lookup::NotFound => {
                    let err = Error::not_found("NOT_FOUND", format!("no route for {method} {path}"));
                    self.error_response(&req, &err)
                }
            }
        };

        info!(
            method = %method,
            path = %path,
            status = writer.status().as_u16(),
            request_id = %request_id,
            latency_ms = start.elapsed().as_millis() as u64,
            "Request handled"
        );
        writer
    }

    fn dispatch(&self, handler: &HandlerFunc, req: Request, operation: &str) -> ResponseWriter {
        let mut ctx = self.pool.acquire(ResponseWriter::new(), req);
        let outcome = catch_unwind(AssertUnwindSafe(|| handler(&mut *ctx)));
        let Some((mut writer, req)) = ctx.detach() else {
            error!(operation = %operation, "Handler left the context detached");
            let mut writer = ResponseWriter::new();
            writer.write_header(http::StatusCode::INTERNAL_SERVER_ERROR);
            return writer;
        };
        drop(ctx);

        let result = match outcome {
            Ok(result) => result,
            Err(payload) => {
                error!(
                    operation = %operation,
                    panic = %panic_message(payload.as_ref()),
                    "Handler panicked"
                );
                Err(Error::internal("PANIC", "handler panicked"))
            }
        };
        if let Err(err) = result {
            writer.discard();
            (self.options.error_encoder)(&mut writer, &req, &err);
        }
        writer
    }
}

impl HttpService for Service {
    fn call(&mut self, req: may_minihttp::Request, res: &mut Response) -> io::Result<()> {
        match read_request(req, self.options.max_body_bytes) {
            Ok(request) => write_response(self.handle(request), res),
            Err(e) => {
                warn!(error = %e, "Rejecting unparseable request");
                res.status_code(400, "Bad Request");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_header_reuses_lines() {
        let a = intern_header("content-type: application/x-test-intern".to_string()).unwrap();
        let b = intern_header("content-type: application/x-test-intern".to_string()).unwrap();
        assert!(std::ptr::eq(a, b));
    }

    #[test]
    fn test_body_read_limit_saturates() {
        assert_eq!(body_read_limit(8), 9);
        assert_eq!(body_read_limit(usize::MAX), u64::MAX);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
