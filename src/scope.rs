//! # Request Scope
//!
//! A [`Scope`] travels with each request in its extensions. It carries an
//! optional deadline, an optional cancellation signal, typed request-scoped
//! values and [`Transport`] metadata describing where the request came from.
//!
//! Scopes are cheap to clone; clones share the same cancellation state.
//!
//! ```rust
//! use std::time::Duration;
//! use wicket::scope::{ContextError, Scope};
//!
//! let (scope, cancel) = Scope::background().with_cancel();
//! assert!(scope.err().is_none());
//! cancel.cancel();
//! assert_eq!(scope.err(), Some(ContextError::Canceled));
//!
//! let scope = Scope::background().with_timeout(Duration::from_secs(30));
//! assert!(scope.deadline().is_some());
//! ```

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::{Duration, Instant};

use http::{HeaderMap, Method};
use parking_lot::{Condvar, Mutex};

use crate::ids::RequestId;

/// Why a scope is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    #[error("context canceled")]
    Canceled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

#[derive(Default)]
struct CancelState {
    canceled: Mutex<bool>,
    signal: Condvar,
    parent: Option<Arc<CancelState>>,
    children: Mutex<Vec<Weak<CancelState>>>,
}

impl CancelState {
    fn child_of(parent: Option<&Arc<CancelState>>) -> Arc<Self> {
        let state = Arc::new(CancelState {
            parent: parent.map(Arc::clone),
            ..CancelState::default()
        });
        if let Some(parent) = parent {
            parent.children.lock().push(Arc::downgrade(&state));
        }
        state
    }

    fn is_canceled(&self) -> bool {
        *self.canceled.lock() || self.parent.as_ref().is_some_and(|p| p.is_canceled())
    }

    fn cancel(&self) {
        {
            let mut canceled = self.canceled.lock();
            if *canceled {
                return;
            }
            *canceled = true;
            self.signal.notify_all();
        }
        let children: Vec<_> = self.children.lock().drain(..).collect();
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

/// Cancels the scope it was created with, and every scope derived from it.
#[derive(Clone)]
pub struct CancelHandle(Arc<CancelState>);

impl CancelHandle {
    pub fn cancel(&self) {
        self.0.cancel();
    }
}

impl std::fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancelHandle")
            .field("canceled", &self.0.is_canceled())
            .finish()
    }
}

/// Wait handle that closes on cancellation or when the deadline passes.
#[derive(Clone)]
pub struct Done {
    state: Option<Arc<CancelState>>,
    deadline: Option<Instant>,
}

impl Done {
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.as_ref().is_some_and(|s| s.is_canceled())
            || self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Block until closed.
    pub fn wait(&self) {
        while !self.wait_timeout(Duration::from_millis(50)) {}
    }

    /// Block for at most `timeout`. Returns whether the handle closed.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let mut until = Instant::now() + timeout;
        if let Some(deadline) = self.deadline {
            until = until.min(deadline);
        }
        if self.is_closed() {
            return true;
        }
        if let Some(state) = &self.state {
            let mut canceled = state.canceled.lock();
            if !*canceled {
                let _timed_out = state.signal.wait_until(&mut canceled, until);
            }
        } else {
            let now = Instant::now();
            if until > now {
                std::thread::sleep(until - now);
            }
        }
        self.is_closed()
    }
}

impl std::fmt::Debug for Done {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Done")
            .field("closed", &self.is_closed())
            .field("deadline", &self.deadline)
            .finish()
    }
}

/// Where a request came from.
#[derive(Debug, Clone)]
pub struct Transport {
    /// Transport kind, always `http` here
    pub kind: &'static str,
    /// Matched route pattern, e.g. `/pets/{id}`
    pub operation: String,
    pub method: Method,
    pub path: String,
    pub request_id: RequestId,
    pub request_header: HeaderMap,
}

type ValueMap = HashMap<TypeId, Arc<dyn Any + Send + Sync>>;

/// Deadline, cancellation and values for one request.
#[derive(Clone, Default)]
pub struct Scope {
    deadline: Option<Instant>,
    cancel: Option<Arc<CancelState>>,
    values: Arc<ValueMap>,
    transport: Option<Arc<Transport>>,
}

impl Scope {
    /// A scope that never ends and carries nothing.
    #[must_use]
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a cancelable scope.
    #[must_use]
    pub fn with_cancel(&self) -> (Scope, CancelHandle) {
        let state = CancelState::child_of(self.cancel.as_ref());
        let scope = Scope {
            cancel: Some(Arc::clone(&state)),
            ..self.clone()
        };
        (scope, CancelHandle(state))
    }

    /// Derive a scope whose deadline is `timeout` from now.
    #[must_use]
    pub fn with_timeout(&self, timeout: Duration) -> Scope {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derive a scope with a deadline; an earlier parent deadline is kept.
    #[must_use]
    pub fn with_deadline(&self, deadline: Instant) -> Scope {
        let deadline = match self.deadline {
            Some(current) if current < deadline => current,
            _ => deadline,
        };
        Scope {
            deadline: Some(deadline),
            ..self.clone()
        }
    }

    /// Derive a scope carrying `value`, replacing any value of the same type.
    #[must_use]
    pub fn with_value<T: Any + Send + Sync>(&self, value: T) -> Scope {
        let mut values = (*self.values).clone();
        values.insert(TypeId::of::<T>(), Arc::new(value));
        Scope {
            values: Arc::new(values),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_transport(&self, transport: Transport) -> Scope {
        Scope {
            transport: Some(Arc::new(transport)),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Wait handle; `None` for a scope that can never end.
    #[must_use]
    pub fn done(&self) -> Option<Done> {
        if self.cancel.is_none() && self.deadline.is_none() {
            return None;
        }
        Some(Done {
            state: self.cancel.clone(),
            deadline: self.deadline,
        })
    }

    /// Why the scope ended, if it has.
    #[must_use]
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.as_ref().is_some_and(|s| s.is_canceled()) {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    #[must_use]
    pub fn value<T: Any + Send + Sync>(&self) -> Option<&T> {
        self.values
            .get(&TypeId::of::<T>())
            .and_then(|v| v.downcast_ref::<T>())
    }

    #[must_use]
    pub fn transport(&self) -> Option<&Transport> {
        self.transport.as_deref()
    }
}

impl std::fmt::Debug for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scope")
            .field("deadline", &self.deadline)
            .field("err", &self.err())
            .field("values", &self.values.len())
            .field("transport", &self.transport)
            .finish()
    }
}
