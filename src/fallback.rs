//! Passthrough for requests no route matches.
//!
//! The dispatcher forwards unmatched requests to a [`DefaultHandler`]
//! untouched: no scope map is built and the request context is not released
//! (the next request on the same execution unit replaces it).

use http::StatusCode;
use std::io;
use tracing::debug;

use crate::server::{HttpRequest, ResponseHandle};

/// Responder for unmatched requests.
pub trait DefaultHandler: Send + Sync {
    /// Answer `request` directly on `response`.
    ///
    /// # Errors
    ///
    /// I/O failures are surfaced to the transport as connection faults.
    fn serve(&self, request: &HttpRequest, response: &ResponseHandle) -> io::Result<()>;
}

/// Answers every request with a JSON `404 Not Found`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotFoundHandler;

impl DefaultHandler for NotFoundHandler {
    fn serve(&self, request: &HttpRequest, response: &ResponseHandle) -> io::Result<()> {
        debug!(
            request_id = %request.request_id,
            method = %request.method,
            path = %request.path,
            "No route, answering 404"
        );
        let body = serde_json::json!({
            "error": "Not Found",
            "method": request.method.as_str(),
            "path": request.path,
        });
        response.set_status(StatusCode::NOT_FOUND.as_u16());
        response.set_content_type("application/json");
        response.set_body(serde_json::to_vec(&body)?);
        response.commit();
        Ok(())
    }
}
