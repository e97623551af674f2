//! # Request Context
//!
//! [`Context`] is what route handlers see: read access to the request (headers,
//! route variables, query, form, body) and helpers that write the response
//! through the server's configured encoders.
//!
//! The trait is object-safe, so handlers take `&mut dyn Context` and tests can
//! substitute their own implementation. Generic conveniences (typed binding,
//! typed replies, scope values) live on [`ContextExt`], implemented for every
//! `Context`.
//!
//! [`Wrapper`] is the server's implementation. It owns one request/response
//! pair at a time and is recycled through the
//! [`ContextPool`](super::ContextPool) with [`Context::reset`].
//!
//! ## Detached wrappers
//!
//! A wrapper that was never reset, or has been detached, degrades instead of
//! panicking: no headers, no variables, no deadline, `err()` reports
//! [`ContextError::Canceled`], and response helpers fail with `500 DETACHED`.

use std::any::Any;
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Instant;

use http::{HeaderMap, StatusCode};
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::{Request, ResponseWriter, ServerOptions};
use crate::binding::{self, BindingError, Values};
use crate::encoding::{CodecError, CodecExt, XmlCodec};
use crate::errors::Error;
use crate::middleware::{chain, Handler};
use crate::router::RouteVars;
use crate::scope::{ContextError, Done, Scope};

static EMPTY_HEADERS: Lazy<HeaderMap> = Lazy::new(HeaderMap::new);

fn detached() -> Error {
    Error::internal("DETACHED", "context is not attached to a request")
}

fn status(code: u16) -> Result<StatusCode, Error> {
    StatusCode::from_u16(code)
        .map_err(|_| Error::internal("STATUS", format!("invalid status code {code}")))
}

fn encode_value<T: Serialize + ?Sized>(value: &T) -> Result<Value, Error> {
    serde_json::to_value(value).map_err(|e| CodecError::encode(e.to_string()).into())
}

/// Per-request capabilities available to route handlers.
pub trait Context {
    /// Deadline of the request scope, if any.
    fn deadline(&self) -> Option<Instant>;

    /// Wait handle closing when the request is canceled or times out.
    fn done(&self) -> Option<Done>;

    /// Why the request scope ended; `Canceled` when detached.
    fn err(&self) -> Option<ContextError>;

    /// Scope attached to the request.
    fn scope(&self) -> Option<&Scope>;

    /// Request headers; empty when detached.
    fn header(&self) -> &HeaderMap;

    /// Route variables, one value per name.
    fn vars(&self) -> Values;

    /// Query string, parsed leniently.
    fn query(&self) -> Values;

    /// Form values, body first then query. Empty on any parse failure.
    fn form(&self) -> Values;

    /// Like [`Context::form`] but reports parse failures.
    fn try_form(&self) -> Result<Values, Error>;

    fn request(&self) -> Option<&Request>;

    fn response(&mut self) -> Option<&mut ResponseWriter>;

    /// Compose the server middleware around `h`.
    fn middleware(&self, h: Handler) -> Handler;

    /// Decode the body with the server's request decoder.
    fn decode_body(&self) -> Result<Option<Value>, Error>;

    /// Encode `value` with the server's response encoder, status untouched.
    fn encode_reply(&mut self, value: &Value) -> Result<(), Error>;

    /// Write `code`, then encode `value` with the server's response encoder.
    fn result_value(&mut self, code: u16, value: &Value) -> Result<(), Error>;

    /// Write a `text/plain` body.
    fn string(&mut self, code: u16, text: &str) -> Result<(), Error>;

    /// Write raw bytes with the given content type.
    fn blob(&mut self, code: u16, content_type: &str, data: &[u8]) -> Result<(), Error>;

    /// Copy `reader` into the body until it is exhausted.
    fn stream(&mut self, code: u16, content_type: &str, reader: &mut dyn Read)
        -> Result<(), Error>;

    /// Attach a new request/response pair, dropping the previous one.
    fn reset(&mut self, res: ResponseWriter, req: Request);
}

/// Typed helpers over any [`Context`].
pub trait ContextExt: Context {
    /// Request-scoped value of type `T`.
    fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.scope().and_then(Scope::value::<T>)
    }

    /// Bind the request body. An empty body leaves `target` untouched.
    fn bind<T: DeserializeOwned>(&self, target: &mut T) -> Result<(), Error> {
        if let Some(value) = self.decode_body()? {
            *target = serde_json::from_value(value)
                .map_err(|e| BindingError::Invalid(e.to_string()))?;
        }
        Ok(())
    }

    fn bind_vars<T: DeserializeOwned>(&self, target: &mut T) -> Result<(), Error> {
        *target = binding::bind_values(&self.vars())?;
        Ok(())
    }

    fn bind_query<T: DeserializeOwned>(&self, target: &mut T) -> Result<(), Error> {
        *target = binding::bind_values(&self.query())?;
        Ok(())
    }

    fn bind_form<T: DeserializeOwned>(&self, target: &mut T) -> Result<(), Error> {
        *target = binding::bind_values(&self.try_form()?)?;
        Ok(())
    }

    /// Encode the success value of `result`; errors pass through unchanged.
    fn returns<T: Serialize>(&mut self, result: Result<T, Error>) -> Result<(), Error> {
        let value = encode_value(&result?)?;
        self.encode_reply(&value)
    }

    /// Write `code` and `value` through the server's response encoder.
    fn result<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) -> Result<(), Error> {
        let value = encode_value(value)?;
        self.result_value(code, &value)
    }

    fn json<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) -> Result<(), Error> {
        let data = serde_json::to_vec(value).map_err(|e| CodecError::encode(e.to_string()))?;
        self.blob(code, "application/json", &data)
    }

    fn xml<T: Serialize + ?Sized>(&mut self, code: u16, value: &T) -> Result<(), Error> {
        let data = XmlCodec.marshal_as(value)?;
        self.blob(code, "application/xml", &data)
    }
}

impl<C: Context + ?Sized> ContextExt for C {}

/// The server's [`Context`] implementation.
pub struct Wrapper {
    options: Arc<ServerOptions>,
    req: Option<Request>,
    res: Option<ResponseWriter>,
}

impl Wrapper {
    /// A detached wrapper.
    #[must_use]
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self {
            options,
            req: None,
            res: None,
        }
    }

    #[must_use]
    pub fn attached(options: Arc<ServerOptions>, res: ResponseWriter, req: Request) -> Self {
        Self {
            options,
            req: Some(req),
            res: Some(res),
        }
    }

    /// Hand back the attached pair, leaving the wrapper detached.
    pub fn detach(&mut self) -> Option<(ResponseWriter, Request)> {
        match (self.res.take(), self.req.take()) {
            (Some(res), Some(req)) => Some((res, req)),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_attached(&self) -> bool {
        self.req.is_some() && self.res.is_some()
    }

    #[must_use]
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    fn writer(&mut self) -> Result<&mut ResponseWriter, Error> {
        self.res.as_mut().ok_or_else(detached)
    }
}

impl std::fmt::Debug for Wrapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wrapper")
            .field("method", &self.req.as_ref().map(|r| r.method().clone()))
            .field("uri", &self.req.as_ref().map(|r| r.uri().clone()))
            .finish()
    }
}

impl Context for Wrapper {
    fn deadline(&self) -> Option<Instant> {
        self.scope().and_then(Scope::deadline)
    }

    fn done(&self) -> Option<Done> {
        self.scope().and_then(Scope::done)
    }

    fn err(&self) -> Option<ContextError> {
        if self.req.is_none() {
            return Some(ContextError::Canceled);
        }
        self.scope().and_then(Scope::err)
    }

    fn scope(&self) -> Option<&Scope> {
        self.req.as_ref()?.extensions().get::<Scope>()
    }

    fn header(&self) -> &HeaderMap {
        match &self.req {
            Some(req) => req.headers(),
            None => &EMPTY_HEADERS,
        }
    }

    fn vars(&self) -> Values {
        self.req
            .as_ref()
            .and_then(|r| r.extensions().get::<RouteVars>())
            .map(RouteVars::to_values)
            .unwrap_or_default()
    }

    fn query(&self) -> Values {
        self.req
            .as_ref()
            .and_then(|r| r.uri().query())
            .map(binding::parse_query)
            .unwrap_or_default()
    }

    fn form(&self) -> Values {
        match self.try_form() {
            Ok(values) => values,
            Err(e) => {
                debug!(error = %e, "Form parse failed, returning empty values");
                Values::new()
            }
        }
    }

    fn try_form(&self) -> Result<Values, Error> {
        match &self.req {
            Some(req) => Ok(binding::parse_request_form(req)?),
            None => Ok(Values::new()),
        }
    }

    fn request(&self) -> Option<&Request> {
        self.req.as_ref()
    }

    fn response(&mut self) -> Option<&mut ResponseWriter> {
        self.res.as_mut()
    }

    fn middleware(&self, h: Handler) -> Handler {
        chain(&self.options.middleware, h)
    }

    fn decode_body(&self) -> Result<Option<Value>, Error> {
        match &self.req {
            Some(req) => (self.options.request_decoder)(req),
            None => Ok(None),
        }
    }

    fn encode_reply(&mut self, value: &Value) -> Result<(), Error> {
        let (Some(res), Some(req)) = (self.res.as_mut(), self.req.as_ref()) else {
            return Err(detached());
        };
        (self.options.response_encoder)(res, req, value)
    }

    fn result_value(&mut self, code: u16, value: &Value) -> Result<(), Error> {
        let status = status(code)?;
        let (Some(res), Some(req)) = (self.res.as_mut(), self.req.as_ref()) else {
            return Err(detached());
        };
        res.write_header(status);
        (self.options.response_encoder)(res, req, value)
    }

    fn string(&mut self, code: u16, text: &str) -> Result<(), Error> {
        self.blob(code, "text/plain", text.as_bytes())
    }

    fn blob(&mut self, code: u16, content_type: &str, data: &[u8]) -> Result<(), Error> {
        let status = status(code)?;
        let res = self.writer()?;
        res.set_content_type(content_type);
        res.write_header(status);
        res.write_all(data)?;
        Ok(())
    }

    fn stream(
        &mut self,
        code: u16,
        content_type: &str,
        reader: &mut dyn Read,
    ) -> Result<(), Error> {
        let status = status(code)?;
        let res = self.writer()?;
        res.set_content_type(content_type);
        res.write_header(status);
        io::copy(reader, res)?;
        Ok(())
    }

    fn reset(&mut self, res: ResponseWriter, req: Request) {
        self.res = Some(res);
        self.req = Some(req);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::CONTENT_TYPE;

    fn options() -> Arc<ServerOptions> {
        Arc::new(ServerOptions::default())
    }

    fn get(uri: &str) -> Request {
        http::Request::builder().uri(uri).body(Vec::new()).unwrap()
    }

    #[test]
    fn test_detached_wrapper_degrades() {
        let mut ctx = Wrapper::new(options());
        assert_eq!(ctx.err(), Some(ContextError::Canceled));
        assert!(ctx.done().is_none());
        assert!(ctx.deadline().is_none());
        assert!(ctx.header().is_empty());
        assert!(ctx.vars().is_empty());
        assert!(ctx.value::<u32>().is_none());
        let err = ctx.string(200, "hi").unwrap_err();
        assert_eq!((err.code, err.reason.as_str()), (500, "DETACHED"));
    }

    #[test]
    fn test_attached_without_scope_is_background() {
        let ctx = Wrapper::attached(options(), ResponseWriter::new(), get("/"));
        assert!(ctx.err().is_none());
        assert!(ctx.done().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_reset_then_detach_returns_pair() {
        let mut ctx = Wrapper::new(options());
        ctx.reset(ResponseWriter::new(), get("/a?x=1"));
        assert_eq!(ctx.query().get("x"), Some("1"));
        ctx.string(201, "made").unwrap();
        let (res, req) = ctx.detach().unwrap();
        assert_eq!(req.uri().path(), "/a");
        assert_eq!(res.status(), StatusCode::CREATED);
        assert_eq!(res.headers()[CONTENT_TYPE], "text/plain");
        assert!(!ctx.is_attached());
    }

    #[test]
    fn test_invalid_status_code() {
        let mut ctx = Wrapper::attached(options(), ResponseWriter::new(), get("/"));
        assert_eq!(ctx.string(1000, "x").unwrap_err().reason, "STATUS");
    }
}
