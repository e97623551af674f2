//! # Middleware Module
//!
//! Onion-style composition of type-erased handlers.
//!
//! A [`Handler`] is an endpoint taking the request [`Scope`](crate::scope::Scope)
//! and a decoded request value. A [`Middleware`] wraps one handler in another;
//! [`chain`] folds a list so the first middleware runs outermost.
//!
//! Plain closures of type `Fn(Handler) -> Handler` are middleware too.

mod core;
mod logging;
mod metrics;

pub use core::{chain, handler, Handler, Middleware};
pub use logging::LoggingMiddleware;
pub use metrics::MetricsMiddleware;
