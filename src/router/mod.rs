//! # Router Module
//!
//! Method + path routing for the HTTP server.
//!
//! Patterns are `/`-separated segments where `{name}` captures one segment:
//!
//! ```rust
//! use http::Method;
//! use wicket::router::{Lookup, Router};
//!
//! let mut router = Router::new();
//! router.insert(Method::GET, "/pets/{id}", "get_pet");
//!
//! match router.lookup(&Method::GET, "/pets/42") {
//!     Lookup::Found(entry, vars) => {
//!         assert_eq!(entry.value, "get_pet");
//!         assert_eq!(vars[0].1, "42");
//!     }
//!     other => panic!("unexpected {other:?}"),
//! }
//! ```
//!
//! A path registered under other methods yields [`Lookup::MethodNotAllowed`]
//! so the server can answer 405 instead of 404.

mod core;
mod radix;
#[cfg(test)]
mod tests;

pub use core::{join_paths, Lookup, ParamVec, RouteEntry, RouteVars, Router, MAX_INLINE_PARAMS};
