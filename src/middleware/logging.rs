use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{error, info, warn};

use super::{Handler, Middleware};
use crate::scope::Scope;

/// Emits one `tracing` event per invocation.
///
/// Fields: `operation` (matched route pattern), `request_id`, `code`,
/// `reason` and `latency_ms`. 4xx outcomes log at warn, 5xx at error.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn wrap(&self, next: Handler) -> Handler {
        Arc::new(move |scope: &Scope, req: Value| {
            let start = Instant::now();
            let result = next(scope, req);
            let latency_ms = start.elapsed().as_millis() as u64;

            let (operation, request_id) = scope
                .transport()
                .map(|t| (t.operation.as_str(), t.request_id.to_string()))
                .unwrap_or(("", String::new()));

            match &result {
                Ok(_) => info!(
                    operation = %operation,
                    request_id = %request_id,
                    code = 200u16,
                    latency_ms,
                    "Handler completed"
                ),
                Err(e) if e.code >= 500 => error!(
                    operation = %operation,
                    request_id = %request_id,
                    code = e.code,
                    reason = %e.reason,
                    detail = %e.message,
                    latency_ms,
                    "Handler failed"
                ),
                Err(e) => warn!(
                    operation = %operation,
                    request_id = %request_id,
                    code = e.code,
                    reason = %e.reason,
                    latency_ms,
                    "Handler rejected request"
                ),
            }
            result
        })
    }
}
