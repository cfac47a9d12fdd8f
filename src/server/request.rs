use crate::ids::RequestId;
use crate::scope::RequestAttributes;
use http::Method;
use may_minihttp::Request;
use serde_json::Value;
use smallvec::SmallVec;
use std::io::{self, Read};
use std::sync::Arc;
use tracing::{debug, info};

/// Maximum number of headers stored inline before spilling to the heap.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header and cookie pairs, stack-allocated for the common case.
///
/// Names are `Arc<str>` so cloning a request's headers does not copy them.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Inbound request as seen by the dispatch core.
///
/// Built by the transport adapter from the wire request, or directly with
/// [`HttpRequest::new`] and the `with_*` builders (tests, embedding). Shared
/// through an `Arc` by the request context for the duration of one dispatch.
#[derive(Debug)]
pub struct HttpRequest {
    pub request_id: RequestId,
    pub method: Method,
    /// Path without the query string
    pub path: String,
    pub query_params: HeaderVec,
    /// Headers with lowercase names
    pub headers: HeaderVec,
    pub cookies: HeaderVec,
    /// JSON body, when one was sent and parsed
    pub body: Option<Value>,
    attributes: Arc<RequestAttributes>,
}

impl HttpRequest {
    /// Request for `uri`, which may carry a query string.
    pub fn new(method: Method, uri: &str) -> Self {
        let path = uri.split('?').next().unwrap_or("/");
        Self {
            request_id: RequestId::new(),
            method,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            query_params: parse_query_params(uri),
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            body: None,
            attributes: Arc::new(RequestAttributes::default()),
        }
    }

    /// Add a header; a `cookie` header also populates [`cookies`](Self::cookies).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        let name = name.to_ascii_lowercase();
        let value = value.into();
        if name == "cookie" {
            self.cookies.extend(parse_cookies(&value));
        }
        if name == "x-request-id" {
            self.request_id = RequestId::from_header_or_new(Some(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    #[inline]
    #[must_use]
    pub fn get_query_param(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Header value by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    #[must_use]
    pub fn get_cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Request-scoped attribute storage.
    #[must_use]
    pub fn attributes(&self) -> &Arc<RequestAttributes> {
        &self.attributes
    }
}

/// Split a `Cookie` header value into name/value pairs.
pub fn parse_cookies(header: &str) -> HeaderVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((Arc::from(name), value))
        })
        .collect()
}

/// Decoded query parameters of a URI (everything after `?`).
pub fn parse_query_params(uri: &str) -> HeaderVec {
    match uri.split_once('?') {
        Some((_, query)) => url::form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect(),
        None => HeaderVec::new(),
    }
}

/// Convert a `may_minihttp` request into an [`HttpRequest`].
///
/// # Errors
///
/// Returns an error when the method is not a valid HTTP token or the body
/// cannot be read from the connection.
pub fn parse_request(req: Request) -> io::Result<HttpRequest> {
    let method = Method::from_bytes(req.method().as_bytes())
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
    let raw_path = req.path().to_string();

    // R1: Headers extracted
    let mut request = HttpRequest::new(method, &raw_path);
    for h in req.headers().iter() {
        request = request.with_header(h.name, String::from_utf8_lossy(h.value).into_owned());
    }
    debug!(
        request_id = %request.request_id,
        header_count = request.headers.len(),
        cookie_count = request.cookies.len(),
        query_count = request.query_params.len(),
        "Headers extracted"
    );

    // R2: Body read
    let mut body = Vec::new();
    req.body().read_to_end(&mut body)?;
    if !body.is_empty() {
        match serde_json::from_slice::<Value>(&body) {
            Ok(json) => request.body = Some(json),
            Err(e) => debug!(
                request_id = %request.request_id,
                body_size_bytes = body.len(),
                error = %e,
                "Body is not JSON, ignored"
            ),
        }
    }

    info!(
        request_id = %request.request_id,
        method = %request.method,
        path = %request.path,
        "HTTP request parsed"
    );
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cookies() {
        let cookies = parse_cookies("a=b; c=d; ;empty=");
        assert_eq!(cookies.len(), 3);
        assert_eq!(cookies[0].1, "b");
        assert_eq!(cookies[1].1, "d");
        assert_eq!(cookies[2].1, "");
    }

    #[test]
    fn test_parse_query_params() {
        let q = parse_query_params("/p?x=1&y=hello%20world");
        assert_eq!(q.len(), 2);
        assert_eq!(q[1].1, "hello world");
        assert!(parse_query_params("/p").is_empty());
    }

    #[test]
    fn test_builder_splits_query_and_cookies() {
        let req = HttpRequest::new(Method::GET, "/users/42?verbose=true")
            .with_header("Cookie", "EVERGREEN_SESSION=abc; theme=dark")
            .with_header("X-Trace", "t1");
        assert_eq!(req.path, "/users/42");
        assert_eq!(req.get_query_param("verbose"), Some("true"));
        assert_eq!(req.get_cookie("theme"), Some("dark"));
        assert_eq!(req.get_header("x-trace"), Some("t1"));
        assert_eq!(req.get_header("COOKIE"), Some("EVERGREEN_SESSION=abc; theme=dark"));
    }

    #[test]
    fn test_request_id_header_is_honored() {
        let id = RequestId::new();
        let req = HttpRequest::new(Method::GET, "/").with_header("X-Request-Id", id.to_string());
        assert_eq!(req.request_id, id);
    }
}
