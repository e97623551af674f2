use std::sync::Arc;

use serde_json::Value;

use crate::errors::Error;
use crate::scope::Scope;

/// Type-erased endpoint: takes the request scope and a decoded request value.
pub type Handler = Arc<dyn Fn(&Scope, Value) -> Result<Value, Error> + Send + Sync>;

/// Wraps a [`Handler`] in another [`Handler`].
pub trait Middleware: Send + Sync {
    fn wrap(&self, next: Handler) -> Handler;
}

impl<F> Middleware for F
where
    F: Fn(Handler) -> Handler + Send + Sync,
{
    fn wrap(&self, next: Handler) -> Handler {
        self(next)
    }
}

/// Box a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
    F: Fn(&Scope, Value) -> Result<Value, Error> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compose `middleware` around `endpoint`. The first entry is outermost.
#[must_use]
pub fn chain(middleware: &[Arc<dyn Middleware>], endpoint: Handler) -> Handler {
    middleware
        .iter()
        .rev()
        .fold(endpoint, |next, m| m.wrap(next))
}
