//! Radix tree for HTTP route matching
//!
//! Paths are split into segments and stored one segment per node:
//! - Static segments (e.g., `users`) match exactly
//! - Parameter segments (e.g., `{id}`) match any single segment
//! - Entries are stored at terminal nodes, keyed by HTTP method
//!
//! Static children are tried before parameter children, and a failed branch
//! backtracks so `/users/me` and `/users/{id}/posts` can coexist.
//!
//! Lookup is O(k) in the number of path segments, not the number of routes.

use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::{ParamVec, RouteEntry};

/// Split a path into its non-empty segments.
pub(crate) fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn param_name(segment: &str) -> Option<&str> {
    segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .filter(|s| !s.is_empty())
}

fn decode_segment(raw: &str) -> String {
    match urlencoding::decode(raw) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => raw.to_string(),
    }
}

struct RadixNode<T> {
    /// The path segment this node represents (without leading /)
    segment: Box<str>,
    /// Entries terminating at this node, per HTTP method
    routes: HashMap<Method, Arc<RouteEntry<T>>>,
    /// Parameter name if this segment is a path parameter (`{id}` -> `id`)
    param_name: Option<Arc<str>>,
    children: Vec<RadixNode<T>>,
    /// Several names may share a position (`/users/{id}` vs `/users/{user_id}/posts`)
    param_children: Vec<RadixNode<T>>,
}

impl<T> RadixNode<T> {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.into(),
            routes: HashMap::new(),
            param_name: None,
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }

    fn new_param(name: &str) -> Self {
        Self {
            param_name: Some(Arc::from(name)),
            ..Self::new("")
        }
    }

    /// Insert an entry; returns the entry it replaced, if any.
    fn insert(
        &mut self,
        segments: &[&str],
        method: Method,
        entry: Arc<RouteEntry<T>>,
    ) -> Option<Arc<RouteEntry<T>>> {
        let Some((&segment, remaining)) = segments.split_first() else {
            return self.routes.insert(method, entry);
        };

        if let Some(name) = param_name(segment) {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(name))
            {
                return child.insert(remaining, method, entry);
            }
            let mut child = RadixNode::new_param(name);
            let replaced = child.insert(remaining, method, entry);
            self.param_children.push(child);
            return replaced;
        }

        if let Some(child) = self
            .children
            .iter_mut()
            .find(|c| c.segment.as_ref() == segment)
        {
            return child.insert(remaining, method, entry);
        }
        let mut child = RadixNode::new(segment);
        let replaced = child.insert(remaining, method, entry);
        self.children.push(child);
        replaced
    }

    /// Depth-first search. Methods of every terminal node reached on the way
    /// are collected into `allowed` so the caller can answer 405.
    fn search(
        &self,
        segments: &[&str],
        method: &Method,
        params: &mut ParamVec,
        allowed: &mut Vec<Method>,
    ) -> Option<Arc<RouteEntry<T>>> {
        let Some((&segment, remaining)) = segments.split_first() else {
            if let Some(entry) = self.routes.get(method) {
                return Some(Arc::clone(entry));
            }
            allowed.extend(self.routes.keys().cloned());
            return None;
        };

        for child in &self.children {
            if child.segment.as_ref() == segment {
                if let Some(entry) = child.search(remaining, method, params, allowed) {
                    return Some(entry);
                }
            }
        }

        for child in &self.param_children {
            if let Some(name) = &child.param_name {
                params.push((Arc::clone(name), decode_segment(segment)));
                if let Some(entry) = child.search(remaining, method, params, allowed) {
                    return Some(entry);
                }
                // Backtrack
                params.pop();
            }
        }

        None
    }

    fn count(&self) -> usize {
        self.routes.len()
            + self.children.iter().map(RadixNode::count).sum::<usize>()
            + self.param_children.iter().map(RadixNode::count).sum::<usize>()
    }
}

/// Route table keyed by method and path pattern.
pub(crate) struct RadixTree<T> {
    root: RadixNode<T>,
}

impl<T> Default for RadixTree<T> {
    fn default() -> Self {
        Self {
            root: RadixNode::new(""),
        }
    }
}

impl<T> RadixTree<T> {
    pub(crate) fn insert(
        &mut self,
        method: Method,
        entry: Arc<RouteEntry<T>>,
    ) -> Option<Arc<RouteEntry<T>>> {
        let pattern = Arc::clone(&entry.pattern);
        let segs: Vec<&str> = segments(&pattern).collect();
        self.root.insert(&segs, method, entry)
    }

    pub(crate) fn search(
        &self,
        method: &Method,
        path: &str,
    ) -> (Option<(Arc<RouteEntry<T>>, ParamVec)>, Vec<Method>) {
        let segs: Vec<&str> = segments(path).collect();
        let mut params = ParamVec::new();
        let mut allowed = Vec::new();
        let found = self
            .root
            .search(&segs, method, &mut params, &mut allowed)
            .map(|entry| (entry, params));
        (found, allowed)
    }

    pub(crate) fn len(&self) -> usize {
        self.root.count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree(routes: &[(Method, &str)]) -> RadixTree<&'static str> {
        let mut tree = RadixTree::default();
        for (method, pattern) in routes {
            let entry = Arc::new(RouteEntry {
                method: method.clone(),
                pattern: Arc::from(*pattern),
                value: "handler",
            });
            let _ = tree.insert(method.clone(), entry);
        }
        tree
    }

    #[test]
    fn test_static_beats_param() {
        let tree = tree(&[(Method::GET, "/users/{id}"), (Method::GET, "/users/me")]);
        let (found, _) = tree.search(&Method::GET, "/users/me");
        let (entry, params) = found.unwrap();
        assert_eq!(&*entry.pattern, "/users/me");
        assert!(params.is_empty());
    }

    #[test]
    fn test_backtracks_into_param_branch() {
        let tree = tree(&[
            (Method::GET, "/users/me"),
            (Method::GET, "/users/{id}/posts"),
        ]);
        let (found, _) = tree.search(&Method::GET, "/users/me/posts");
        let (entry, params) = found.unwrap();
        assert_eq!(&*entry.pattern, "/users/{id}/posts");
        assert_eq!(params[0].1, "me");
    }

    #[test]
    fn test_params_are_percent_decoded() {
        let tree = tree(&[(Method::GET, "/files/{name}")]);
        let (found, _) = tree.search(&Method::GET, "/files/a%20b");
        assert_eq!(found.unwrap().1[0].1, "a b");
    }

    #[test]
    fn test_collects_allowed_methods() {
        let tree = tree(&[(Method::GET, "/items"), (Method::POST, "/items")]);
        let (found, mut allowed) = tree.search(&Method::DELETE, "/items");
        assert!(found.is_none());
        allowed.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        assert_eq!(allowed, vec![Method::GET, Method::POST]);
    }

    #[test]
    fn test_insert_reports_replacement() {
        let mut tree = tree(&[(Method::GET, "/items")]);
        let entry = Arc::new(RouteEntry {
            method: Method::GET,
            pattern: Arc::from("/items"),
            value: "replacement",
        });
        assert!(tree.insert(Method::GET, entry).is_some());
        assert_eq!(tree.len(), 1);
    }
}
