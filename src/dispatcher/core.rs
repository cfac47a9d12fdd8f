use serde::Deserialize;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::context::{ActionContext, ContextSlot, ScopeEnvironment};
use crate::error::{ActionError, DispatchError};
use crate::fallback::{DefaultHandler, NotFoundHandler};
use crate::invoker::HandlerInvoker;
use crate::metrics::DispatchMetrics;
use crate::router::{ActionMapping, HandlerMapping};
use crate::server::{HttpRequest, ResponseHandle};

/// Dispatch behaviour switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Release the request context when a mapped request fails with a
    /// transport fault. When `false` the context stays bound until the next
    /// request on the same execution unit replaces it.
    pub release_context_on_transport_fault: bool,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            release_context_on_transport_fault: true,
        }
    }
}

/// How a request that completed without a fault was answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Mapped, invoked and rendered (or left to the action when it returned no view).
    Rendered,
    /// No route matched; the default handler answered.
    Passthrough,
}

/// Single entry point for every inbound request.
///
/// Per request: bind a fresh [`ActionContext`] to the caller's
/// [`ContextSlot`], resolve the route, then either pass the request through
/// to the [`DefaultHandler`] or invoke the mapped action, render its view and
/// release the context. Faults are classified as described in
/// [`crate::error`].
///
/// The dispatcher itself holds no per-request state; clones share the same
/// mapping, invoker, stores and metrics.
#[derive(Clone)]
pub struct Dispatcher {
    mapping: Arc<dyn HandlerMapping>,
    invoker: Arc<dyn HandlerInvoker>,
    fallback: Arc<dyn DefaultHandler>,
    scopes: ScopeEnvironment,
    config: DispatchConfig,
    metrics: Arc<DispatchMetrics>,
}

impl Dispatcher {
    pub fn new(mapping: Arc<dyn HandlerMapping>, invoker: Arc<dyn HandlerInvoker>) -> Self {
        Self {
            mapping,
            invoker,
            fallback: Arc::new(NotFoundHandler),
            scopes: ScopeEnvironment::default(),
            config: DispatchConfig::default(),
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    /// Responder for requests no route matches.
    #[must_use]
    pub fn with_fallback(mut self, fallback: Arc<dyn DefaultHandler>) -> Self {
        self.fallback = fallback;
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    /// Stores backing the session and application scopes.
    #[must_use]
    pub fn with_scopes(mut self, scopes: ScopeEnvironment) -> Self {
        self.scopes = scopes;
        self
    }

    #[must_use]
    pub fn metrics(&self) -> &Arc<DispatchMetrics> {
        &self.metrics
    }

    #[must_use]
    pub fn scopes(&self) -> &ScopeEnvironment {
        &self.scopes
    }

    #[must_use]
    pub fn config(&self) -> DispatchConfig {
        self.config
    }

    /// Serve one request.
    ///
    /// # Errors
    ///
    /// [`DispatchError::Transport`] for connection failures (from the action,
    /// the view or the default handler), [`DispatchError::Failed`] for
    /// application and unclassified faults. Application faults have already
    /// been answered with their status when this returns.
    pub fn on_request(
        &self,
        slot: &mut ContextSlot,
        request: Arc<HttpRequest>,
        response: &ResponseHandle,
    ) -> Result<DispatchOutcome, DispatchError> {
        let started = Instant::now();
        self.metrics.record_request();

        // D1: Context bound
        let ctx = ActionContext::new(Arc::clone(&request), response.clone(), self.scopes.clone());
        slot.begin_request(ctx);
        debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            "Request context bound"
        );

        // D2: Handler lookup
        let mapping = self.mapping.resolve(&request);
        if !mapping.is_matched() {
            return self.pass_through(&request, response);
        }
        self.metrics.record_matched();

        // D3: Invoke and render under the context guard
        let mut guard = slot.guard();
        let result = match guard.current_mut() {
            Ok(ctx) => {
                ctx.bind_mapping(&mapping);
                self.invoke_and_render(ctx, &mapping)
            }
            Err(e) => Err(e.into()),
        };
        // D4: Fault classification
        let outcome = self.classify(&request, &mapping, response, result, started.elapsed());
        if outcome.as_ref().is_err_and(DispatchError::is_transport)
            && !self.config.release_context_on_transport_fault
        {
            guard.keep_bound();
        }
        drop(guard);

        // D5: Context released
        if slot.is_active() {
            debug!(request_id = %request.request_id, "Request context kept bound after transport fault");
        } else {
            self.metrics.record_context_released();
        }
        outcome
    }

    fn pass_through(
        &self,
        request: &HttpRequest,
        response: &ResponseHandle,
    ) -> Result<DispatchOutcome, DispatchError> {
        self.metrics.record_passthrough();
        info!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            "No route matched, passing through"
        );
        self.fallback.serve(request, response).map_err(|e| {
            self.metrics.record_transport_fault();
            error!(
                request_id = %request.request_id,
                path = %request.path,
                error = %e,
                "Default handler failed"
            );
            DispatchError::Transport(e)
        })?;
        Ok(DispatchOutcome::Passthrough)
    }

    fn invoke_and_render(&self, ctx: &ActionContext, mapping: &ActionMapping) -> Result<(), ActionError> {
        let Some(view) = self.invoker.invoke(ctx, mapping)? else {
            debug!(request_id = %ctx.request_id(), action = ?mapping.action_name(), "No view to render");
            return Ok(());
        };
        // Render the view; a panicking view is an unclassified fault
        panic::catch_unwind(AssertUnwindSafe(|| view.execute(ctx))).unwrap_or_else(|_| {
            Err(ActionError::other(format!(
                "view for action `{}` panicked",
                mapping.action_name().unwrap_or_default()
            )))
        })
    }

    fn classify(
        &self,
        request: &HttpRequest,
        mapping: &ActionMapping,
        response: &ResponseHandle,
        result: Result<(), ActionError>,
        latency: Duration,
    ) -> Result<DispatchOutcome, DispatchError> {
        let action = mapping.action_name().unwrap_or_default();
        match result {
            Ok(()) => {
                self.metrics.record_rendered(latency);
                info!(
                    request_id = %request.request_id,
                    action = %action,
                    method = %request.method,
                    path = %request.path,
                    status = response.status(),
                    latency_us = latency.as_micros(),
                    "Request rendered"
                );
                Ok(DispatchOutcome::Rendered)
            }
            Err(ActionError::Status { status, message }) => {
                self.metrics.record_application_fault();
                warn!(
                    request_id = %request.request_id,
                    action = %action,
                    status = status.as_u16(),
                    message = %message,
                    "Application fault"
                );
                if let Err(e) = response.send_error(status, &message) {
                    warn!(
                        request_id = %request.request_id,
                        error = %e,
                        "Could not send error status"
                    );
                }
                Err(DispatchError::Failed {
                    message,
                    status: Some(status),
                })
            }
            Err(ActionError::Transport(e)) => {
                self.metrics.record_transport_fault();
                error!(
                    request_id = %request.request_id,
                    action = %action,
                    error = %e,
                    "Transport fault"
                );
                Err(DispatchError::Transport(e))
            }
            Err(ActionError::Other(e)) => {
                self.metrics.record_unclassified_fault();
                error!(
                    request_id = %request.request_id,
                    action = %action,
                    error = ?e,
                    "Unclassified fault"
                );
                Err(DispatchError::Failed {
                    message: e.to_string(),
                    status: None,
                })
            }
        }
    }
}
