//! Recycled request contexts.
//!
//! Each in-flight request holds one [`Wrapper`] exclusively. Returned wrappers
//! are detached and parked on a mutex-guarded free list, bounded by
//! `max_idle`.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use super::{Context, Request, ResponseWriter, ServerOptions, Wrapper};

/// Default number of idle wrappers kept for reuse.
pub const DEFAULT_MAX_IDLE: usize = 256;

pub struct ContextPool {
    options: Arc<ServerOptions>,
    free: Mutex<Vec<Wrapper>>,
    max_idle: usize,
    created: AtomicUsize,
}

impl ContextPool {
    #[must_use]
    pub fn new(options: Arc<ServerOptions>) -> Self {
        Self::with_max_idle(options, DEFAULT_MAX_IDLE)
    }

    #[must_use]
    pub fn with_max_idle(options: Arc<ServerOptions>, max_idle: usize) -> Self {
        Self {
            options,
            free: Mutex::new(Vec::new()),
            max_idle,
            created: AtomicUsize::new(0),
        }
    }

    /// Take a wrapper and attach it to `res`/`req`.
    ///
    /// The wrapper goes back to the pool when the guard drops, including while
    /// unwinding from a handler panic.
    pub fn acquire(&self, res: ResponseWriter, req: Request) -> PooledContext<'_> {
        let mut ctx = self.free.lock().pop().unwrap_or_else(|| {
            self.created.fetch_add(1, Ordering::Relaxed);
            Wrapper::new(Arc::clone(&self.options))
        });
        ctx.reset(res, req);
        PooledContext { pool: self, ctx }
    }

    fn release(&self, mut ctx: Wrapper) {
        if ctx.detach().is_some() {
            debug!("Released context still attached, dropping its request");
        }
        let mut free = self.free.lock();
        if free.len() < self.max_idle {
            free.push(ctx);
        }
    }

    /// Wrappers currently parked for reuse.
    #[must_use]
    pub fn idle(&self) -> usize {
        self.free.lock().len()
    }

    /// Wrappers allocated over the pool's lifetime.
    #[must_use]
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

/// RAII guard over a pooled [`Wrapper`].
pub struct PooledContext<'a> {
    pool: &'a ContextPool,
    ctx: Wrapper,
}

impl PooledContext<'_> {
    /// Take the request/response pair back out of the wrapper.
    pub fn detach(&mut self) -> Option<(ResponseWriter, Request)> {
        self.ctx.detach()
    }
}

impl Deref for PooledContext<'_> {
    type Target = Wrapper;

    fn deref(&self) -> &Wrapper {
        &self.ctx
    }
}

impl DerefMut for PooledContext<'_> {
    fn deref_mut(&mut self) -> &mut Wrapper {
        &mut self.ctx
    }
}

impl Drop for PooledContext<'_> {
    fn drop(&mut self) {
        let placeholder = Wrapper::new(Arc::clone(&self.pool.options));
        self.pool.release(std::mem::replace(&mut self.ctx, placeholder));
    }
}
