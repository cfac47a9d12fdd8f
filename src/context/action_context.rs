use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::ids::{RequestId, SessionId};
use crate::router::ActionMapping;
use crate::routes::ActionDefinition;
use crate::scope::{
    ApplicationAttributes, AttributeStore, Scope, ScopeMap, SessionAttributes, SessionCookie,
    SessionStore,
};
use crate::server::{HttpRequest, ResponseHandle};

/// Shared stores the per-request scope maps are built over.
///
/// One environment belongs to one dispatcher; every request it serves sees
/// the same application attributes and session registry.
#[derive(Debug, Clone, Default)]
pub struct ScopeEnvironment {
    pub application: Arc<ApplicationAttributes>,
    pub sessions: Arc<SessionStore>,
    pub cookie: SessionCookie,
}

impl ScopeEnvironment {
    #[must_use]
    pub fn with_cookie(mut self, cookie: SessionCookie) -> Self {
        self.cookie = cookie;
        self
    }

    #[must_use]
    pub fn with_sessions(mut self, sessions: Arc<SessionStore>) -> Self {
        self.sessions = sessions;
        self
    }
}

/// State of one in-flight request.
///
/// Holds the transport request and response, the three scope maps (built on
/// first access), the route the request was mapped to, and a free-form
/// attribute bag for actions and views to exchange data.
pub struct ActionContext {
    request: Arc<HttpRequest>,
    response: ResponseHandle,
    scopes: ScopeEnvironment,
    request_scope: OnceCell<ScopeMap>,
    session_scope: OnceCell<ScopeMap>,
    application_scope: OnceCell<ScopeMap>,
    mapping: Option<ActionMapping>,
    attributes: Mutex<HashMap<String, Value>>,
    started: Instant,
}

impl fmt::Debug for ActionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActionContext")
            .field("request_id", &self.request.request_id)
            .field("method", &self.request.method)
            .field("path", &self.request.path)
            .field("action", &self.action_name())
            .field("constructed_scopes", &self.constructed_scopes())
            .finish_non_exhaustive()
    }
}

impl ActionContext {
    pub fn new(request: Arc<HttpRequest>, response: ResponseHandle, scopes: ScopeEnvironment) -> Self {
        Self {
            request,
            response,
            scopes,
            request_scope: OnceCell::new(),
            session_scope: OnceCell::new(),
            application_scope: OnceCell::new(),
            mapping: None,
            attributes: Mutex::new(HashMap::new()),
            started: Instant::now(),
        }
    }

    #[must_use]
    pub fn request(&self) -> &HttpRequest {
        &self.request
    }

    #[must_use]
    pub fn response(&self) -> &ResponseHandle {
        &self.response
    }

    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request.request_id
    }

    /// Time since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Record the route this request was mapped to.
    pub fn bind_mapping(&mut self, mapping: &ActionMapping) {
        self.mapping = Some(mapping.clone());
    }

    #[must_use]
    pub fn mapping(&self) -> Option<&ActionMapping> {
        self.mapping.as_ref()
    }

    #[must_use]
    pub fn definition(&self) -> Option<&Arc<ActionDefinition>> {
        self.mapping.as_ref().and_then(ActionMapping::definition)
    }

    #[must_use]
    pub fn action_name(&self) -> Option<&str> {
        self.mapping.as_ref().and_then(ActionMapping::action_name)
    }

    /// Path parameter extracted by the router.
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.mapping.as_ref().and_then(|m| m.path_param(name))
    }

    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.request.get_query_param(name)
    }

    /// `REQUEST_MAP`, over the request's own attributes.
    pub fn request_scope(&self) -> &ScopeMap {
        self.request_scope.get_or_init(|| {
            let store: Arc<dyn AttributeStore> = Arc::clone(self.request.attributes()) as _;
            ScopeMap::new(Scope::Request, store)
        })
    }

    /// `SESSION_MAP`, over the client's session. Reading never creates a session.
    pub fn session_scope(&self) -> &ScopeMap {
        self.session_scope.get_or_init(|| {
            let requested = self
                .request
                .get_cookie(&self.scopes.cookie.name)
                .and_then(|v| v.parse::<SessionId>().ok());
            let store = SessionAttributes::new(
                Arc::clone(&self.scopes.sessions),
                requested,
                self.scopes.cookie.clone(),
                self.response.clone(),
            );
            ScopeMap::new(Scope::Session, Arc::new(store))
        })
    }

    /// `APPLICATION_MAP`, shared by every request of the dispatcher.
    pub fn application_scope(&self) -> &ScopeMap {
        self.application_scope.get_or_init(|| {
            let store: Arc<dyn AttributeStore> = Arc::clone(&self.scopes.application) as _;
            ScopeMap::new(Scope::Application, store)
        })
    }

    pub fn scope(&self, scope: Scope) -> &ScopeMap {
        match scope {
            Scope::Request => self.request_scope(),
            Scope::Session => self.session_scope(),
            Scope::Application => self.application_scope(),
        }
    }

    /// Scopes whose maps have been built so far.
    #[must_use]
    pub fn constructed_scopes(&self) -> Vec<Scope> {
        Scope::ALL
            .into_iter()
            .filter(|scope| match scope {
                Scope::Request => self.request_scope.get().is_some(),
                Scope::Session => self.session_scope.get().is_some(),
                Scope::Application => self.application_scope.get().is_some(),
            })
            .collect()
    }

    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<Value> {
        self.attributes.lock().get(key).cloned()
    }

    pub fn set_attribute(&self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.attributes.lock().insert(key.into(), value.into())
    }

    pub fn remove_attribute(&self, key: &str) -> Option<Value> {
        self.attributes.lock().remove(key)
    }
}
