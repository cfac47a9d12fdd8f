use http::{Method, StatusCode};
use may_minihttp::{HttpService, Request, Response};
use std::io;
use std::sync::Arc;
use tracing::{debug, error, warn};

use super::request::{parse_request, HttpRequest};
use super::response::{write_response, ResponseHandle, ResponseSnapshot};
use crate::context::ContextSlot;
use crate::dispatcher::Dispatcher;
use crate::error::DispatchError;

/// `may_minihttp` service bridging connections to a [`Dispatcher`].
///
/// `may_minihttp` clones the service for every accepted connection and
/// serves that connection's requests sequentially from one coroutine, so
/// each clone owns the [`ContextSlot`] of exactly one execution unit.
pub struct AppService {
    dispatcher: Arc<Dispatcher>,
    slot: ContextSlot,
    metrics_path: Option<String>,
}

impl Clone for AppService {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            slot: ContextSlot::new(),
            metrics_path: self.metrics_path.clone(),
        }
    }
}

impl AppService {
    pub fn new(dispatcher: Arc<Dispatcher>) -> Self {
        Self {
            dispatcher,
            slot: ContextSlot::new(),
            metrics_path: None,
        }
    }

    /// Answer `GET <path>` with the dispatch counters as JSON, ahead of routing.
    #[must_use]
    pub fn with_metrics_endpoint(mut self, path: impl Into<String>) -> Self {
        self.metrics_path = Some(path.into());
        self
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// This execution unit's context slot.
    #[must_use]
    pub fn slot(&self) -> &ContextSlot {
        &self.slot
    }

    /// Dispatch one request and return the response to send.
    ///
    /// Faulted requests whose response was not committed are answered with
    /// `500 Internal Server Error`.
    ///
    /// # Errors
    ///
    /// Transport faults are returned unchanged; the connection should be dropped.
    pub fn handle(&mut self, request: HttpRequest) -> io::Result<ResponseSnapshot> {
        let response = ResponseHandle::new();

        if request.method == Method::GET && self.metrics_path.as_deref() == Some(request.path.as_str()) {
            let snapshot = self.dispatcher.metrics().snapshot();
            response.set_content_type("application/json");
            response.set_body(serde_json::to_vec(&snapshot)?);
            response.commit();
            return Ok(response.snapshot());
        }

        let request = Arc::new(request);
        match self
            .dispatcher
            .on_request(&mut self.slot, Arc::clone(&request), &response)
        {
            Ok(outcome) => {
                debug!(request_id = %request.request_id, outcome = ?outcome, "Dispatch complete");
            }
            Err(DispatchError::Transport(e)) => {
                warn!(request_id = %request.request_id, error = %e, "Dropping connection");
                return Err(e);
            }
            Err(DispatchError::Failed { message, status }) => {
                if !response.is_committed() {
                    if let Err(e) =
                        response.send_error(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error")
                    {
                        error!(request_id = %request.request_id, error = %e, "Could not send 500");
                    }
                }
                debug!(
                    request_id = %request.request_id,
                    status = ?status,
                    message = %message,
                    "Dispatch failed"
                );
            }
        }
        Ok(response.snapshot())
    }
}

impl HttpService for AppService {
    fn call(&mut self, req: Request, res: &mut Response) -> io::Result<()> {
        let request = parse_request(req)?;
        let snapshot = self.handle(request)?;
        write_response(res, snapshot);
        Ok(())
    }
}
