//! # Runtime Configuration Module
//!
//! Environment-driven tuning of the `may` coroutine runtime.
//!
//! ## Environment Variables
//!
//! ### `WICKET_STACK_SIZE`
//!
//! Stack size for each request coroutine. Accepts decimal (`16384`) or
//! hexadecimal (`0x4000`). Default: `0x4000` (16 KB).
//!
//! Total virtual memory is roughly stack size × concurrent requests, so
//! 800 requests on a 1 MB stack reserve 800 MB.
//!
//! ### `WICKET_WORKERS`
//!
//! Number of scheduler worker threads. Defaults to the runtime's own choice
//! (one per CPU).
//!
//! ## Usage
//!
//! ```rust
//! use wicket::runtime_config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_env();
//! println!("Stack size: {} bytes", config.stack_size);
//! ```

use std::env;

use tracing::{info, warn};

/// Default coroutine stack size (16 KB).
pub const DEFAULT_STACK_SIZE: usize = 0x4000;

/// Runtime configuration loaded from environment variables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeConfig {
    /// Stack size for coroutines in bytes
    pub stack_size: usize,
    /// Scheduler worker threads; `None` leaves the runtime default
    pub workers: Option<usize>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            stack_size: DEFAULT_STACK_SIZE,
            workers: None,
        }
    }
}

/// Parse a decimal or `0x`-prefixed hexadecimal size.
#[must_use]
pub fn parse_size(value: &str) -> Option<usize> {
    let value = value.trim();
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => usize::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

impl RuntimeConfig {
    /// Load configuration from environment variables.
    ///
    /// Unparseable values fall back to the defaults with a warning.
    #[must_use]
    pub fn from_env() -> Self {
        let stack_size = match env::var("WICKET_STACK_SIZE") {
            Ok(val) => parse_size(&val).unwrap_or_else(|| {
                warn!(value = %val, "Invalid WICKET_STACK_SIZE, using default");
                DEFAULT_STACK_SIZE
            }),
            Err(_) => DEFAULT_STACK_SIZE,
        };
        let workers = env::var("WICKET_WORKERS")
            .ok()
            .and_then(|val| match val.trim().parse::<usize>() {
                Ok(n) if n > 0 => Some(n),
                _ => {
                    warn!(value = %val, "Invalid WICKET_WORKERS, using runtime default");
                    None
                }
            });
        RuntimeConfig {
            stack_size,
            workers,
        }
    }

    /// Push the settings into the global `may` configuration.
    ///
    /// Must run before the first coroutine is spawned.
    pub fn apply(&self) {
        let config = may::config();
        config.set_stack_size(self.stack_size);
        if let Some(workers) = self.workers {
            config.set_workers(workers);
        }
        info!(
            stack_size = self.stack_size,
            workers = ?self.workers,
            "Coroutine runtime configured"
        );
    }
}
