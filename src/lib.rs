//! # wicket
//!
//! **wicket** is a small coroutine-powered HTTP transport for Rust with
//! pluggable content codecs, built on the `may` runtime and `may_minihttp`.
//!
//! ## Overview
//!
//! Two pieces do the work:
//!
//! - A codec registry ([`encoding`]) with MessagePack, JSON, XML and
//!   urlencoded-form codecs, selected by content subtype during negotiation
//! - A per-request [`Context`](server::Context) that handlers use to read route
//!   variables, the query, forms and headers, bind bodies into typed values,
//!   and write replies through the server's configured encoders and middleware
//!
//! ## Architecture
//!
//! - **[`encoding`]** - `Codec` trait, registry, built-in codecs
//! - **[`binding`]** - Multi-value `Values`, form/multipart parsing, typed binding
//! - **[`router`]** - Radix-tree method + path routing with `{param}` segments
//! - **[`middleware`]** - Handler chain, logging and metrics middleware
//! - **[`scope`]** - Request deadline, cancellation, values and transport metadata
//! - **[`server`]** - Route groups, context pool, `may_minihttp` service
//! - **[`errors`]** - Status-carrying transport error
//! - **[`config`]**, **[`runtime_config`]**, **[`logging`]** - Process setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use serde::{Deserialize, Serialize};
//! use wicket::server::{Context, ContextExt, Server, ServerOptions};
//!
//! #[derive(Default, Deserialize, Serialize)]
//! struct Pet {
//!     name: String,
//! }
//!
//! # fn main() -> std::io::Result<()> {
//! let mut server = Server::new(ServerOptions::default());
//! server.route("/v1").post("/pets", |ctx: &mut dyn Context| {
//!     let mut pet = Pet::default();
//!     ctx.bind(&mut pet)?;
//!     ctx.result(201, &pet)
//! });
//!
//! let handle = server.start("0.0.0.0:8080")?;
//! handle.join().ok();
//! # Ok(())
//! # }
//! ```
//!
//! A client sending `Content-Type: application/msgpack` has its body decoded
//! with the msgpack codec; `Accept: application/msgpack` gets a msgpack reply.

pub mod binding;
pub mod config;
pub mod encoding;
pub mod errors;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod router;
pub mod runtime_config;
pub mod scope;
pub mod server;

pub use errors::{Error, Result};
pub use server::{Context, ContextExt, Server, ServerOptions};
