//! Radix tree for method + path route matching.
//!
//! Paths are split into segments; each node holds one segment. Static
//! segments (`users`) match exactly, parameter segments (`{id}`) match any
//! single segment. Definitions sit on terminal nodes keyed by method.
//!
//! Lookup prefers static children over parameter children and backtracks
//! when a branch fails deeper down, so `/users/me` beats `/users/{id}` while
//! `/users/42/posts` still reaches `/users/{id}/posts`.

use http::Method;
use std::collections::HashMap;
use std::sync::Arc;

use super::core::ParamVec;
use crate::routes::ActionDefinition;

#[derive(Clone)]
struct RadixNode {
    segment: Arc<str>,
    routes: HashMap<Method, Arc<ActionDefinition>>,
    /// Parameter name if this node matches `{name}`
    param_name: Option<Arc<str>>,
    children: Vec<RadixNode>,
    /// Parameter children; several names may share a position
    /// (`/users/{id}/posts` and `/users/{user_id}/comments`).
    param_children: Vec<RadixNode>,
}

impl Default for RadixNode {
    fn default() -> Self {
        Self {
            segment: Arc::from(""),
            routes: HashMap::new(),
            param_name: None,
            children: Vec::new(),
            param_children: Vec::new(),
        }
    }
}

impl RadixNode {
    fn new(segment: &str) -> Self {
        Self {
            segment: Arc::from(segment),
            ..Self::default()
        }
    }

    fn new_param(param_name: &str) -> Self {
        Self {
            param_name: Some(Arc::from(param_name)),
            ..Self::default()
        }
    }

    /// Insert a definition; returns the one it replaced, if any.
    fn insert(
        &mut self,
        segments: &[&str],
        method: Method,
        route: Arc<ActionDefinition>,
    ) -> Option<Arc<ActionDefinition>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.routes.insert(method, route);
        };

        if let Some(param_name) = segment
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
        {
            if let Some(child) = self
                .param_children
                .iter_mut()
                .find(|c| c.param_name.as_deref() == Some(param_name))
            {
                return child.insert(remaining, method, route);
            }
            let mut child = RadixNode::new_param(param_name);
            let replaced = child.insert(remaining, method, route);
            self.param_children.push(child);
            return replaced;
        }

        if let Some(child) = self
            .children
            .iter_mut()
            .find(|c| c.segment.as_ref() == *segment)
        {
            return child.insert(remaining, method, route);
        }
        let mut child = RadixNode::new(segment);
        let replaced = child.insert(remaining, method, route);
        self.children.push(child);
        replaced
    }

    fn search(
        &self,
        segments: &[&str],
        method: &Method,
        params: &mut ParamVec,
    ) -> Option<Arc<ActionDefinition>> {
        let Some((segment, remaining)) = segments.split_first() else {
            return self.routes.get(method).map(Arc::clone);
        };

        for child in &self.children {
            if child.segment.as_ref() == *segment {
                if let Some(route) = child.search(remaining, method, params) {
                    return Some(route);
                }
            }
        }

        for param_child in &self.param_children {
            if let Some(name) = &param_child.param_name {
                params.push((Arc::clone(name), (*segment).to_string()));
                if let Some(route) = param_child.search(remaining, method, params) {
                    return Some(route);
                }
                // Backtrack
                params.pop();
            }
        }

        None
    }
}

fn split_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Radix tree over [`ActionDefinition`]s.
#[derive(Clone, Default)]
pub struct RadixRouter {
    root: RadixNode,
    len: usize,
}

impl RadixRouter {
    pub fn new(routes: impl IntoIterator<Item = Arc<ActionDefinition>>) -> Self {
        let mut router = Self::default();
        for route in routes {
            router.insert(route);
        }
        router
    }

    /// Add a definition under its full path; returns the definition it displaced.
    pub fn insert(&mut self, route: Arc<ActionDefinition>) -> Option<Arc<ActionDefinition>> {
        let full_path = route.full_path();
        let segments = split_segments(&full_path);
        let method = route.method.clone();
        let replaced = self.root.insert(&segments, method, route);
        if replaced.is_none() {
            self.len += 1;
        }
        replaced
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Match `method` and `path`, returning the definition and extracted parameters.
    pub fn route(&self, method: &Method, path: &str) -> Option<(Arc<ActionDefinition>, ParamVec)> {
        let segments = split_segments(path);
        let mut params = ParamVec::new();
        let route = self.root.search(&segments, method, &mut params)?;
        Some((route, params))
    }
}
