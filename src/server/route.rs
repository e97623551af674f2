//! Route groups.
//!
//! ```rust
//! use wicket::server::{Context, ContextExt, Server, ServerOptions};
//!
//! let mut server = Server::new(ServerOptions::default());
//! let mut v1 = server.route("/v1");
//! v1.get("/pets/{id}", |ctx: &mut dyn Context| {
//!     let id = ctx.vars().get("id").unwrap_or_default().to_string();
//!     ctx.string(200, &id)
//! });
//! v1.group("/admin").delete("/pets/{id}", |ctx: &mut dyn Context| ctx.string(204, ""));
//! assert_eq!(server.routes(), 2);
//! ```

use std::sync::Arc;

use http::Method;

use super::{Context, Server};
use crate::errors::Error;
use crate::router::join_paths;

/// Route handler taking the request context.
pub type HandlerFunc = Arc<dyn Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync>;

/// Registers routes under a shared path prefix.
pub struct Route<'a> {
    server: &'a mut Server,
    prefix: String,
}

impl<'a> Route<'a> {
    pub(crate) fn new(server: &'a mut Server, prefix: &str) -> Self {
        Self {
            server,
            prefix: join_paths(prefix, ""),
        }
    }

    /// Prefix shared by routes of this group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Nested group; its prefix is appended to this one.
    pub fn group(&mut self, prefix: &str) -> Route<'_> {
        let prefix = join_paths(&self.prefix, prefix);
        Route {
            server: &mut *self.server,
            prefix,
        }
    }

    pub fn handle<F>(&mut self, method: Method, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        let pattern = join_paths(&self.prefix, path);
        self.server.add_route(method, &pattern, Arc::new(handler));
        self
    }

    pub fn get<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handle(Method::GET, path, handler)
    }

    pub fn post<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handle(Method::POST, path, handler)
    }

    pub fn put<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handle(Method::PUT, path, handler)
    }

    pub fn patch<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handle(Method::PATCH, path, handler)
    }

    pub fn delete<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handle(Method::DELETE, path, handler)
    }

    pub fn head<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handle(Method::HEAD, path, handler)
    }

    pub fn options<F>(&mut self, path: &str, handler: F) -> &mut Self
    where
        F: Fn(&mut dyn Context) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.handle(Method::OPTIONS, path, handler)
    }
}
