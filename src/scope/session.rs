use crate::ids::SessionId;
use crate::server::ResponseHandle;
use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{debug, info};

use super::AttributeStore;

/// Default name of the cookie carrying the session id.
pub const DEFAULT_SESSION_COOKIE: &str = "EVERGREEN_SESSION";

/// One client session.
#[derive(Debug)]
pub struct Session {
    id: SessionId,
    attributes: DashMap<String, Value>,
    created_at: SystemTime,
    last_accessed: Mutex<Instant>,
}

impl Session {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            attributes: DashMap::new(),
            created_at: SystemTime::now(),
            last_accessed: Mutex::new(Instant::now()),
        }
    }

    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    #[must_use]
    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    /// Time since the session was last touched by a request.
    #[must_use]
    pub fn idle(&self) -> Duration {
        self.last_accessed.lock().elapsed()
    }

    fn touch(&self) {
        *self.last_accessed.lock() = Instant::now();
    }
}

/// Upper bound on how often [`SessionStore::create`] sweeps idle sessions.
const SWEEP_INTERVAL: Duration = Duration::from_secs(1);

/// Shared registry of live sessions.
///
/// With a maximum idle time set, sessions untouched for longer are treated
/// as gone on lookup and swept out whenever a new session is created.
#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Arc<Session>>,
    max_idle: Option<Duration>,
    last_sweep: Mutex<Instant>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
            max_idle: None,
            last_sweep: Mutex::new(Instant::now()),
        }
    }
}

impl SessionStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire sessions idle for longer than `max_idle`.
    #[must_use]
    pub fn with_max_idle(mut self, max_idle: Duration) -> Self {
        self.max_idle = Some(max_idle);
        self
    }

    #[must_use]
    pub fn max_idle(&self) -> Option<Duration> {
        self.max_idle
    }

    /// Look up a live session and mark it accessed.
    #[must_use]
    pub fn get(&self, id: &SessionId) -> Option<Arc<Session>> {
        let session = self.sessions.get(id).map(|s| Arc::clone(s.value()))?;
        if self.max_idle.is_some_and(|max| session.idle() > max) {
            self.sessions.remove(id);
            debug!(session_id = %id, "Expired session dropped");
            return None;
        }
        session.touch();
        Some(session)
    }

    /// Create and register a new session, sweeping idle ones first.
    pub fn create(&self) -> Arc<Session> {
        self.sweep();
        let session = Arc::new(Session::new(SessionId::generate()));
        self.sessions.insert(session.id, Arc::clone(&session));
        info!(session_id = %session.id, live_sessions = self.sessions.len(), "Session created");
        session
    }

    fn sweep(&self) {
        let Some(max_idle) = self.max_idle else {
            return;
        };
        {
            let mut last = self.last_sweep.lock();
            if last.elapsed() < max_idle.min(SWEEP_INTERVAL) {
                return;
            }
            *last = Instant::now();
        }
        self.evict_idle(max_idle);
    }

    /// Drop a session, returning whether it existed.
    pub fn invalidate(&self, id: &SessionId) -> bool {
        self.sessions.remove(id).is_some()
    }

    /// Remove every session idle for longer than `max_idle`; returns how many were removed.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.idle() <= max_idle);
        let evicted = before.saturating_sub(self.sessions.len());
        if evicted > 0 {
            debug!(evicted, "Idle sessions evicted");
        }
        evicted
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

/// Settings for the cookie that carries the session id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionCookie {
    pub name: String,
    pub path: String,
}

impl Default for SessionCookie {
    fn default() -> Self {
        Self {
            name: DEFAULT_SESSION_COOKIE.to_string(),
            path: "/".to_string(),
        }
    }
}

impl SessionCookie {
    /// `Set-Cookie` value binding the client to `id`.
    #[must_use]
    pub fn header_value(&self, id: SessionId) -> String {
        format!("{}={}; Path={}; HttpOnly", self.name, id, self.path)
    }
}

/// Session-scope store for one request.
///
/// Reads against a request without a live session return nothing and create
/// nothing. The first write creates the session, registers it in the
/// [`SessionStore`] and adds the `Set-Cookie` header to the response.
pub struct SessionAttributes {
    sessions: Arc<SessionStore>,
    requested: Option<SessionId>,
    cookie: SessionCookie,
    response: ResponseHandle,
    bound: OnceCell<Arc<Session>>,
}

impl SessionAttributes {
    pub fn new(
        sessions: Arc<SessionStore>,
        requested: Option<SessionId>,
        cookie: SessionCookie,
        response: ResponseHandle,
    ) -> Self {
        Self {
            sessions,
            requested,
            cookie,
            response,
            bound: OnceCell::new(),
        }
    }

    /// The session this request is bound to, without creating one.
    #[must_use]
    pub fn session(&self) -> Option<Arc<Session>> {
        if let Some(session) = self.bound.get() {
            return Some(Arc::clone(session));
        }
        let session = self.requested.and_then(|id| self.sessions.get(&id))?;
        Some(Arc::clone(self.bound.get_or_init(|| session)))
    }

    fn session_or_create(&self) -> Arc<Session> {
        if let Some(session) = self.session() {
            return session;
        }
        let session = self.bound.get_or_init(|| {
            let created = self.sessions.create();
            self.response
                .add_header("set-cookie", self.cookie.header_value(created.id()));
            created
        });
        Arc::clone(session)
    }
}

impl AttributeStore for SessionAttributes {
    fn get_attribute(&self, name: &str) -> Option<Value> {
        self.session()?
            .attributes
            .get(name)
            .map(|v| v.value().clone())
    }

    fn set_attribute(&self, name: String, value: Value) -> Option<Value> {
        self.session_or_create().attributes.insert(name, value)
    }

    fn remove_attribute(&self, name: &str) -> Option<Value> {
        self.session()?.attributes.remove(name).map(|(_, v)| v)
    }

    fn attribute_names(&self) -> Vec<String> {
        self.session()
            .map(|s| s.attributes.iter().map(|e| e.key().clone()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn attrs(store: &Arc<SessionStore>, requested: Option<SessionId>) -> (SessionAttributes, ResponseHandle) {
        let response = ResponseHandle::new();
        let attrs = SessionAttributes::new(
            Arc::clone(store),
            requested,
            SessionCookie::default(),
            response.clone(),
        );
        (attrs, response)
    }

    #[test]
    fn test_reads_do_not_create_session() {
        let store = Arc::new(SessionStore::new());
        let (attrs, response) = attrs(&store, None);
        assert!(attrs.get_attribute("user").is_none());
        assert!(attrs.remove_attribute("user").is_none());
        assert!(attrs.attribute_names().is_empty());
        assert!(store.is_empty());
        assert!(response.header("set-cookie").is_none());
    }

    #[test]
    fn test_first_write_creates_session_and_cookie() {
        let store = Arc::new(SessionStore::new());
        let (attrs, response) = attrs(&store, None);
        attrs.set_attribute("user".into(), json!("alice"));
        attrs.set_attribute("role".into(), json!("admin"));
        assert_eq!(store.len(), 1);
        let cookie = response.header("set-cookie").unwrap();
        assert!(cookie.starts_with("EVERGREEN_SESSION="));
        assert!(cookie.ends_with("; Path=/; HttpOnly"));
        assert_eq!(response.snapshot().headers.len(), 1);
    }

    #[test]
    fn test_follow_up_request_sees_session() {
        let store = Arc::new(SessionStore::new());
        let (first, _) = attrs(&store, None);
        first.set_attribute("visits".into(), json!(1));
        let id = first.session().unwrap().id();

        let (second, response) = attrs(&store, Some(id));
        assert_eq!(second.get_attribute("visits"), Some(json!(1)));
        second.set_attribute("visits".into(), json!(2));
        assert!(response.header("set-cookie").is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_unknown_session_id_creates_fresh_on_write() {
        let store = Arc::new(SessionStore::new());
        let stale = SessionId::generate();
        let (attrs, response) = attrs(&store, Some(stale));
        assert!(attrs.get_attribute("x").is_none());
        attrs.set_attribute("x".into(), json!(true));
        assert_ne!(attrs.session().unwrap().id(), stale);
        assert!(response.header("set-cookie").is_some());
    }

    #[test]
    fn test_invalidate_and_evict() {
        let store = SessionStore::new();
        let a = store.create();
        let _b = store.create();
        assert!(store.invalidate(&a.id()));
        assert!(!store.invalidate(&a.id()));
        assert_eq!(store.evict_idle(Duration::from_secs(3600)), 0);
        assert_eq!(store.evict_idle(Duration::ZERO), 1);
        assert!(store.is_empty());
    }

    #[test]
    fn test_expired_session_not_returned() {
        let store = SessionStore::new().with_max_idle(Duration::from_millis(10));
        let id = store.create().id();
        assert!(store.get(&id).is_some());
        std::thread::sleep(Duration::from_millis(30));
        assert!(store.get(&id).is_none());
        assert!(store.is_empty());
    }

    #[test]
    fn test_create_sweeps_idle_sessions() {
        let store = SessionStore::new().with_max_idle(Duration::from_millis(10));
        for _ in 0..100 {
            store.create();
        }
        std::thread::sleep(Duration::from_millis(30));
        store.create();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_without_max_idle_sessions_persist() {
        let store = SessionStore::new();
        let id = store.create().id();
        std::thread::sleep(Duration::from_millis(20));
        store.create();
        assert!(store.get(&id).is_some());
        assert_eq!(store.len(), 2);
    }
}
