//! Router core - hot path for request routing.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]
#![deny(clippy::unnecessary_to_owned)]

use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, warn};

use super::radix::RadixTree;
use crate::binding::Values;

/// Maximum number of path parameters before heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/{id}/posts/{postId}).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated route variables for the hot path.
///
/// Names are `Arc<str>` shared with the route tree; values are per-request,
/// already percent-decoded.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// A registered route.
#[derive(Debug)]
pub struct RouteEntry<T> {
    pub method: Method,
    /// Full pattern, e.g. `/v1/pets/{id}`
    pub pattern: Arc<str>,
    pub value: T,
}

/// Path variables matched for the current request.
///
/// The server stores this in the request extensions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteVars(pub ParamVec);

impl RouteVars {
    /// Last occurrence wins when a name repeats at different depths.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_ref(), v.as_str()))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// One value per name; a repeated name keeps its last value.
    #[must_use]
    pub fn to_values(&self) -> Values {
        let mut values = Values::new();
        for (k, v) in self.iter() {
            values.set(k, v);
        }
        values
    }
}

impl<K: Into<Arc<str>>, V: Into<String>> FromIterator<(K, V)> for RouteVars {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        RouteVars(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

/// Outcome of a route lookup.
#[derive(Debug)]
pub enum Lookup<T> {
    Found(Arc<RouteEntry<T>>, ParamVec),
    /// The path exists but not for this method; carries the methods that do
    MethodNotAllowed(Vec<Method>),
    NotFound,
}

/// Method + path route table backed by a radix tree.
pub struct Router<T> {
    tree: RadixTree<T>,
}

impl<T> Default for Router<T> {
    fn default() -> Self {
        Self {
            tree: RadixTree::default(),
        }
    }
}

impl<T> Router<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `value` for `method` and `pattern`.
    ///
    /// Registering the same method and pattern again replaces the earlier entry.
    pub fn insert(&mut self, method: Method, pattern: &str, value: T) {
        let pattern: Arc<str> = Arc::from(normalize_pattern(pattern).as_str());
        let entry = Arc::new(RouteEntry {
            method: method.clone(),
            pattern: Arc::clone(&pattern),
            value,
        });
        if self.tree.insert(method.clone(), entry).is_some() {
            warn!(method = %method, pattern = %pattern, "Route registered twice, replacing earlier handler");
        } else {
            debug!(method = %method, pattern = %pattern, "Route registered");
        }
    }

    #[must_use]
    pub fn lookup(&self, method: &Method, path: &str) -> Lookup<T> {
        match self.tree.search(method, path) {
            (Some((entry, vars)), _) => Lookup::Found(entry, vars),
            (None, allowed) if !allowed.is_empty() => {
                let mut allowed = allowed;
                allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
                allowed.dedup();
                Lookup::MethodNotAllowed(allowed)
            }
            (None, _) => Lookup::NotFound,
        }
    }

    /// Number of registered (method, pattern) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Join a group prefix and a route path into one pattern.
#[must_use]
pub fn join_paths(prefix: &str, path: &str) -> String {
    normalize_pattern(&format!("{}/{}", prefix.trim_end_matches('/'), path))
}

/// Collapse repeated slashes; always starts with `/`, never ends with one.
fn normalize_pattern(pattern: &str) -> String {
    let mut out = String::with_capacity(pattern.len() + 1);
    for segment in super::radix::segments(pattern) {
        out.push('/');
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}
