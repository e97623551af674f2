//! # Server Module
//!
//! HTTP transport on `may_minihttp`: route registration, per-request
//! [`Context`], pooled context reuse and codec-negotiating default encoders.
//!
//! ```rust,no_run
//! use wicket::server::{Context, ContextExt, Server, ServerOptions};
//!
//! # fn main() -> std::io::Result<()> {
//! let mut server = Server::new(ServerOptions::default());
//! server.route("/").get("/hello/{name}", |ctx: &mut dyn Context| {
//!     let name = ctx.vars().get("name").unwrap_or("world").to_string();
//!     ctx.result(200, &serde_json::json!({ "hello": name }))
//! });
//! let handle = server.start("127.0.0.1:8080")?;
//! handle.wait_ready()?;
//! handle.stop();
//! # Ok(())
//! # }
//! ```

pub mod codec;
mod context;
mod http_server;
mod pool;
mod route;
#[allow(clippy::module_inception)]
mod server;
mod service;
mod writer;

/// Request type seen by handlers: the body is fully buffered.
pub type Request = http::Request<Vec<u8>>;

pub use codec::{ErrorEncoder, RequestDecoder, ResponseEncoder};
pub use context::{Context, ContextExt, Wrapper};
pub use http_server::{HttpServer, ServerHandle};
pub use pool::{ContextPool, PooledContext, DEFAULT_MAX_IDLE};
pub use route::{HandlerFunc, Route};
pub use server::{Server, ServerOptions};
pub use service::{Service, MAX_INTERNED_HEADERS};
pub use writer::{status_reason, ResponseWriter};
