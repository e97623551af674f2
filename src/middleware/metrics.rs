use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;

use super::{Handler, Middleware};
use crate::scope::Scope;

#[derive(Default)]
struct Counters {
    request_count: AtomicUsize,
    error_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    stack_size: AtomicUsize,
}

/// Middleware collecting request statistics.
///
/// All counters are atomics updated with `Ordering::Relaxed`; readings are
/// eventually consistent. Clones share the same counters, so keep one clone
/// to read from after installing another in the server options.
#[derive(Clone, Default)]
pub struct MetricsMiddleware {
    counters: Arc<Counters>,
}

impl MetricsMiddleware {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total handler invocations
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.counters.request_count.load(Ordering::Relaxed)
    }

    /// Invocations that returned an error
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.counters.error_count.load(Ordering::Relaxed)
    }

    /// Mean handler latency; zero before the first request.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count() as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.counters.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    /// Stack size of the coroutine that served the latest request.
    #[must_use]
    pub fn stack_size(&self) -> usize {
        self.counters.stack_size.load(Ordering::Relaxed)
    }
}

impl Middleware for MetricsMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        let counters = Arc::clone(&self.counters);
        Arc::new(move |scope: &Scope, req: Value| {
            counters.request_count.fetch_add(1, Ordering::Relaxed);
            let start = Instant::now();
            let result = next(scope, req);
            counters
                .total_latency_ns
                .fetch_add(start.elapsed().as_nanos() as u64, Ordering::Relaxed);
            if result.is_err() {
                counters.error_count.fetch_add(1, Ordering::Relaxed);
            }
            let size = if may::coroutine::is_coroutine() {
                may::coroutine::current().stack_size()
            } else {
                may::config().get_stack_size()
            };
            counters.stack_size.store(size, Ordering::Relaxed);
            result
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Error;
    use crate::middleware::handler;

    #[test]
    fn test_counts_requests_and_errors() {
        let metrics = MetricsMiddleware::new();
        let ok = metrics.wrap(handler(|_, v| Ok(v)));
        let fail = metrics.wrap(handler(|_, _| Err(Error::internal("BOOM", "boom"))));

        assert!(ok(&Scope::background(), Value::Null).is_ok());
        assert!(ok(&Scope::background(), Value::Null).is_ok());
        assert!(fail(&Scope::background(), Value::Null).is_err());

        assert_eq!(metrics.request_count(), 3);
        assert_eq!(metrics.error_count(), 1);
        assert!(metrics.stack_size() > 0);
    }

    #[test]
    fn test_average_latency_starts_at_zero() {
        assert_eq!(MetricsMiddleware::new().average_latency(), Duration::ZERO);
    }
}
