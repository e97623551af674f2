use std::io;
use std::net::ToSocketAddrs;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tracing::info;

use super::codec::{
    default_error_encoder, default_request_decoder, default_response_encoder, ErrorEncoder,
    RequestDecoder, ResponseEncoder,
};
use super::{HandlerFunc, HttpServer, Route, ServerHandle, Service};
use crate::config::{ServerConfig, DEFAULT_MAX_BODY_BYTES};
use crate::middleware::Middleware;
use crate::router::Router;

/// Encoders, decoder, middleware and limits shared by every request.
#[derive(Clone)]
pub struct ServerOptions {
    pub request_decoder: RequestDecoder,
    pub response_encoder: ResponseEncoder,
    pub error_encoder: ErrorEncoder,
    /// Applied by `Context::middleware`, first entry outermost
    pub middleware: Vec<Arc<dyn Middleware>>,
    /// Per-request deadline
    pub timeout: Option<Duration>,
    /// Bodies larger than this are answered with 413
    pub max_body_bytes: usize,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            request_decoder: Arc::new(default_request_decoder),
            response_encoder: Arc::new(default_response_encoder),
            error_encoder: Arc::new(default_error_encoder),
            middleware: Vec::new(),
            timeout: None,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl ServerOptions {
    #[must_use]
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            timeout: config.timeout(),
            max_body_bytes: config.max_body_bytes,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_request_decoder(mut self, decoder: RequestDecoder) -> Self {
        self.request_decoder = decoder;
        self
    }

    #[must_use]
    pub fn with_response_encoder(mut self, encoder: ResponseEncoder) -> Self {
        self.response_encoder = encoder;
        self
    }

    #[must_use]
    pub fn with_error_encoder(mut self, encoder: ErrorEncoder) -> Self {
        self.error_encoder = encoder;
        self
    }

    /// Append a middleware; it runs inside those added before it.
    #[must_use]
    pub fn with_middleware(mut self, middleware: Arc<dyn Middleware>) -> Self {
        self.middleware.push(middleware);
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn with_max_body_bytes(mut self, max: usize) -> Self {
        self.max_body_bytes = max;
        self
    }
}

/// Route table plus options; turned into a [`Service`] to serve traffic.
pub struct Server {
    router: Router<HandlerFunc>,
    options: ServerOptions,
}

impl Server {
    #[must_use]
    pub fn new(options: ServerOptions) -> Self {
        Self {
            router: Router::new(),
            options,
        }
    }

    /// Route group rooted at `prefix`; `""` or `"/"` for the root.
    pub fn route(&mut self, prefix: &str) -> Route<'_> {
        Route::new(self, prefix)
    }

    pub(crate) fn add_route(&mut self, method: Method, pattern: &str, handler: HandlerFunc) {
        self.router.insert(method, pattern, handler);
    }

    /// Registered (method, pattern) pairs.
    #[must_use]
    pub fn routes(&self) -> usize {
        self.router.len()
    }

    #[must_use]
    pub fn options(&self) -> &ServerOptions {
        &self.options
    }

    #[must_use]
    pub fn into_service(self) -> Service {
        Service::new(self.router, self.options)
    }

    /// Bind `addr` and serve on the `may` runtime.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or cannot be bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let routes = self.routes();
        let handle = HttpServer(self.into_service()).start(addr)?;
        info!(addr = %handle.addr(), routes, "Server listening");
        Ok(handle)
    }
}
