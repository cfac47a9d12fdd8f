use arc_swap::ArcSwap;
use http::Method;
use smallvec::SmallVec;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::radix::RadixRouter;
use crate::routes::ActionDefinition;
use crate::server::HttpRequest;

/// Maximum number of path parameters before heap allocation.
pub const MAX_INLINE_PARAMS: usize = 8;

/// Stack-allocated path parameters; names are shared with the route tree.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Outcome of resolving one request: a matched definition with its path
/// parameters, or no match at all.
#[derive(Debug, Clone, Default)]
pub struct ActionMapping {
    definition: Option<Arc<ActionDefinition>>,
    pub path_params: ParamVec,
}

impl ActionMapping {
    pub fn matched(definition: Arc<ActionDefinition>, path_params: ParamVec) -> Self {
        Self {
            definition: Some(definition),
            path_params,
        }
    }

    #[must_use]
    pub fn unmatched() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_matched(&self) -> bool {
        self.definition.is_some()
    }

    #[must_use]
    pub fn definition(&self) -> Option<&Arc<ActionDefinition>> {
        self.definition.as_ref()
    }

    #[must_use]
    pub fn action_name(&self) -> Option<&str> {
        self.definition.as_deref().map(|d| d.action_name.as_str())
    }

    /// Path parameter by name; the last occurrence wins on duplicates.
    #[inline]
    #[must_use]
    pub fn path_param(&self, name: &str) -> Option<&str> {
        self.path_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Resolves an inbound request to an [`ActionMapping`].
///
/// Implementations are read-only during dispatch and shared by every
/// connection, so they must be safe to call concurrently.
pub trait HandlerMapping: Send + Sync {
    fn resolve(&self, request: &HttpRequest) -> ActionMapping;
}

/// Route table backed by a radix tree.
#[derive(Clone, Default)]
pub struct Router {
    radix_router: RadixRouter,
    routes: Vec<Arc<ActionDefinition>>,
}

impl Router {
    #[must_use]
    pub fn new(routes: Vec<ActionDefinition>) -> Self {
        let mut radix_router = RadixRouter::default();
        let mut kept: Vec<Arc<ActionDefinition>> = Vec::with_capacity(routes.len());
        for route in routes {
            let route = Arc::new(route);
            if let Some(replaced) = radix_router.insert(Arc::clone(&route)) {
                warn!(
                    method = %route.method,
                    path = %route.full_path(),
                    replaced_action = %replaced.action_name,
                    action = %route.action_name,
                    "Duplicate route, later definition wins"
                );
                kept.retain(|r| !Arc::ptr_eq(r, &replaced));
            }
            kept.push(route);
        }

        // RT5: Routing table loaded
        let routes_summary: Vec<String> = kept.iter().take(10).map(|r| r.to_string()).collect();
        info!(
            routes_count = kept.len(),
            routes_summary = ?routes_summary,
            "Routing table loaded"
        );

        Self {
            radix_router,
            routes: kept,
        }
    }

    /// Registered definitions in load order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<ActionDefinition>] {
        &self.routes
    }

    /// Print every registered route to stdout.
    pub fn dump_routes(&self) {
        println!("[routes] count={}", self.routes.len());
        for route in &self.routes {
            println!("[route] {route}");
        }
    }

    /// Match `method` and `path` against the table.
    #[must_use]
    pub fn route(&self, method: &Method, path: &str) -> ActionMapping {
        // RT1: Route match attempt
        debug!(method = %method, path = %path, "Route match attempt");
        let match_start = Instant::now();
        let result = self.radix_router.route(method, path);
        let match_duration = match_start.elapsed();

        match result {
            Some((definition, params)) => {
                // RT2: Route matched
                if match_duration > Duration::from_millis(1) {
                    warn!(
                        method = %method,
                        path = %path,
                        action = %definition.action_name,
                        duration_us = match_duration.as_micros(),
                        "Slow route matching detected"
                    );
                } else {
                    debug!(
                        method = %method,
                        path = %path,
                        action = %definition.action_name,
                        route_pattern = %definition.path_pattern,
                        path_params = ?params,
                        duration_us = match_duration.as_micros(),
                        "Route matched"
                    );
                }
                ActionMapping::matched(definition, params)
            }
            None => {
                // RT3: No route found
                debug!(
                    method = %method,
                    path = %path,
                    duration_us = match_duration.as_micros(),
                    "No route matched"
                );
                ActionMapping::unmatched()
            }
        }
    }
}

impl HandlerMapping for Router {
    fn resolve(&self, request: &HttpRequest) -> ActionMapping {
        self.route(&request.method, &request.path)
    }
}

/// A [`Router`] that can be swapped atomically while requests are in flight.
///
/// Readers load the current table without locking; [`replace`](Self::replace)
/// publishes a new one for subsequent requests.
pub struct RouteTable {
    current: ArcSwap<Router>,
}

impl RouteTable {
    #[must_use]
    pub fn new(router: Router) -> Self {
        Self {
            current: ArcSwap::from_pointee(router),
        }
    }

    pub fn replace(&self, router: Router) {
        info!(routes_count = router.routes().len(), "Route table replaced");
        self.current.store(Arc::new(router));
    }

    /// The table requests are currently resolved against.
    #[must_use]
    pub fn current(&self) -> Arc<Router> {
        self.current.load_full()
    }
}

impl HandlerMapping for RouteTable {
    fn resolve(&self, request: &HttpRequest) -> ActionMapping {
        self.current.load().resolve(request)
    }
}
