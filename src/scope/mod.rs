//! # Scope Module
//!
//! Uniform key-value views over the three state buckets a request can reach:
//!
//! - **request** attributes, stored on the [`HttpRequest`](crate::server::HttpRequest)
//! - **session** attributes, stored in the shared [`SessionStore`]
//! - **application** attributes, shared by every request of one dispatcher
//!
//! Each bucket implements [`AttributeStore`]. A [`ScopeMap`] wraps a store under
//! its scope name (`REQUEST_MAP`, `SESSION_MAP`, `APPLICATION_MAP`) so action
//! code reads and writes state without knowing what backs it. Writes are not
//! buffered: they land in the store immediately.
//!
//! ```rust,ignore
//! let visits = ctx.session_scope().get_as::<u64>("visits").unwrap_or(0);
//! ctx.session_scope().put("visits", visits + 1);
//! ```

mod session;
mod store;

pub use session::{
    Session, SessionAttributes, SessionCookie, SessionStore, DEFAULT_SESSION_COOKIE,
};
pub use store::{ApplicationAttributes, RequestAttributes};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Name of the request-scope map.
pub const REQUEST_MAP: &str = "REQUEST_MAP";
/// Name of the session-scope map.
pub const SESSION_MAP: &str = "SESSION_MAP";
/// Name of the application-scope map.
pub const APPLICATION_MAP: &str = "APPLICATION_MAP";

/// Lifetime bucket for key-value state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    Request,
    Session,
    Application,
}

impl Scope {
    /// All scopes, in construction order.
    pub const ALL: [Scope; 3] = [Scope::Request, Scope::Session, Scope::Application];

    #[must_use]
    pub const fn map_name(self) -> &'static str {
        match self {
            Scope::Request => REQUEST_MAP,
            Scope::Session => SESSION_MAP,
            Scope::Application => APPLICATION_MAP,
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.map_name())
    }
}

/// External mutable attribute storage backing a [`ScopeMap`].
pub trait AttributeStore: Send + Sync {
    fn get_attribute(&self, name: &str) -> Option<Value>;

    /// Store `value` under `name`, returning the previous value.
    fn set_attribute(&self, name: String, value: Value) -> Option<Value>;

    fn remove_attribute(&self, name: &str) -> Option<Value>;

    /// Names currently stored, in no particular order.
    fn attribute_names(&self) -> Vec<String>;
}

/// Named mapping view over an [`AttributeStore`].
#[derive(Clone)]
pub struct ScopeMap {
    scope: Scope,
    store: Arc<dyn AttributeStore>,
}

impl fmt::Debug for ScopeMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopeMap")
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ScopeMap {
    pub fn new(scope: Scope, store: Arc<dyn AttributeStore>) -> Self {
        Self { scope, store }
    }

    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.scope.map_name()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<Value> {
        self.store.get_attribute(key)
    }

    /// Read a value and deserialize it, returning `None` on absence or type mismatch.
    #[must_use]
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.get(key).and_then(|v| serde_json::from_value(v).ok())
    }

    /// Write through to the backing store, returning the previous value.
    pub fn put(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.store.set_attribute(key.into(), value.into())
    }

    pub fn remove(&self, key: &str) -> Option<Value> {
        self.store.remove_attribute(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Keys in ascending order; `.rev()` enumerates them backwards.
    #[must_use]
    pub fn keys(&self) -> std::vec::IntoIter<String> {
        let mut names = self.store.attribute_names();
        names.sort_unstable();
        names.into_iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.store.attribute_names().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Map<String, Value> {
        self.keys()
            .filter_map(|k| self.get(&k).map(|v| (k, v)))
            .collect()
    }
}
