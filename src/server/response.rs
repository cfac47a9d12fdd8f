use super::request::HeaderVec;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use http::StatusCode;
use may_minihttp::Response;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::io;
use std::sync::Arc;
use tracing::{debug, warn};

/// Reason phrase for a status code, for the status line.
pub(crate) fn status_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .unwrap_or("Unknown")
}

#[derive(Debug)]
struct ResponseState {
    status: u16,
    headers: HeaderVec,
    body: Vec<u8>,
    committed: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Vec::new(),
            committed: false,
        }
    }
}

/// Outbound response for one request.
///
/// A cheap, cloneable handle: the transport keeps one clone to put on the
/// wire, the request context keeps another for actions and views to write
/// through. Once committed (by a view, [`send_error`](Self::send_error) or
/// [`send_redirect`](Self::send_redirect)) the status can no longer be
/// replaced by an error page.
#[derive(Debug, Clone, Default)]
pub struct ResponseHandle {
    state: Arc<Mutex<ResponseState>>,
}

impl ResponseHandle {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn status(&self) -> u16 {
        self.state.lock().status
    }

    pub fn set_status(&self, status: u16) {
        self.state.lock().status = status;
    }

    /// First value of a header (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<String> {
        self.state
            .lock()
            .headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.clone())
    }

    /// Replace every value of `name` with `value`.
    pub fn set_header(&self, name: &str, value: impl Into<String>) {
        let mut state = self.state.lock();
        state.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        state.headers.push((Arc::from(name), value.into()));
    }

    /// Append a value, keeping existing ones (e.g. `Set-Cookie`).
    pub fn add_header(&self, name: &str, value: impl Into<String>) {
        self.state
            .lock()
            .headers
            .push((Arc::from(name), value.into()));
    }

    pub fn set_content_type(&self, content_type: &str) {
        self.set_header("content-type", content_type);
    }

    /// Append bytes to the body.
    pub fn write_body(&self, bytes: &[u8]) {
        self.state.lock().body.extend_from_slice(bytes);
    }

    /// Replace the body.
    pub fn set_body(&self, bytes: impl Into<Vec<u8>>) {
        self.state.lock().body = bytes.into();
    }

    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.state.lock().committed
    }

    pub fn commit(&self) {
        self.state.lock().committed = true;
    }

    /// Replace the response with an error page and commit it.
    ///
    /// # Errors
    ///
    /// Fails when the response is already committed.
    pub fn send_error(&self, status: StatusCode, message: &str) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.committed {
            warn!(
                status = status.as_u16(),
                message = %message,
                "send_error on committed response"
            );
            return Err(io::Error::other("response already committed"));
        }
        state.status = status.as_u16();
        state
            .headers
            .retain(|(k, _)| !k.eq_ignore_ascii_case("content-type"));
        state
            .headers
            .push((Arc::from("content-type"), "application/json".to_string()));
        state.body = serde_json::json!({ "error": message, "status": status.as_u16() })
            .to_string()
            .into_bytes();
        state.committed = true;
        debug!(status = status.as_u16(), "Error response sent");
        Ok(())
    }

    /// Answer with `302 Found` pointing at `location` and commit.
    ///
    /// # Errors
    ///
    /// Fails when the response is already committed.
    pub fn send_redirect(&self, location: &str) -> io::Result<()> {
        let mut state = self.state.lock();
        if state.committed {
            return Err(io::Error::other("response already committed"));
        }
        state.status = StatusCode::FOUND.as_u16();
        state.headers.retain(|(k, _)| !k.eq_ignore_ascii_case("location"));
        state
            .headers
            .push((Arc::from("location"), location.to_string()));
        state.body.clear();
        state.committed = true;
        Ok(())
    }

    /// Copy of the current response, for the transport to put on the wire.
    #[must_use]
    pub fn snapshot(&self) -> ResponseSnapshot {
        let state = self.state.lock();
        ResponseSnapshot {
            status: state.status,
            headers: state.headers.clone(),
            body: state.body.clone(),
            committed: state.committed,
        }
    }
}

/// Materialized response produced by one dispatch.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
    pub committed: bool,
}

impl ResponseSnapshot {
    /// First value of a header (case-insensitive).
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Most distinct header lines kept for the life of the process.
pub const MAX_HEADER_LINES: usize = 65_536;

/// Longest header line that will be interned.
pub const MAX_HEADER_LINE_LEN: usize = 8 * 1024;

/// Bounded intern table for header lines.
///
/// `may_minihttp` only accepts `'static` header strings, so every line that
/// is not a compile-time constant has to live for the rest of the process.
/// Identical lines share one allocation; once `capacity` distinct lines are
/// held, new lines are refused instead of allocated.
#[derive(Debug)]
pub(crate) struct HeaderLines {
    lines: DashMap<String, &'static str>,
    capacity: usize,
}

impl HeaderLines {
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            lines: DashMap::new(),
            capacity,
        }
    }

    pub(crate) fn intern(&self, line: String) -> Option<&'static str> {
        if let Some(existing) = self.lines.get(&line) {
            return Some(*existing.value());
        }
        if line.len() > MAX_HEADER_LINE_LEN || self.lines.len() >= self.capacity {
            return None;
        }
        match self.lines.entry(line) {
            Entry::Occupied(existing) => Some(*existing.get()),
            Entry::Vacant(slot) => {
                let leaked: &'static str = Box::leak(slot.key().clone().into_boxed_str());
                slot.insert(leaked);
                Some(leaked)
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.lines.len()
    }
}

static HEADER_LINES: OnceCell<HeaderLines> = OnceCell::new();

/// Header line for `may_minihttp`; `None` when the intern table is full.
fn header_line(name: &str, value: &str) -> Option<&'static str> {
    if name.eq_ignore_ascii_case("content-type") {
        match value {
            "application/json" => return Some("Content-Type: application/json"),
            "text/plain; charset=utf-8" => return Some("Content-Type: text/plain; charset=utf-8"),
            "text/html; charset=utf-8" => return Some("Content-Type: text/html; charset=utf-8"),
            "text/html" => return Some("Content-Type: text/html"),
            "text/css" => return Some("Content-Type: text/css"),
            "application/javascript" => return Some("Content-Type: application/javascript"),
            "application/octet-stream" => return Some("Content-Type: application/octet-stream"),
            _ => {}
        }
    }
    HEADER_LINES
        .get_or_init(|| HeaderLines::with_capacity(MAX_HEADER_LINES))
        .intern(format!("{name}: {value}"))
}

/// Write a dispatch result onto the `may_minihttp` response.
pub fn write_response(res: &mut Response, snapshot: ResponseSnapshot) {
    res.status_code(snapshot.status as usize, status_reason(snapshot.status));
    for (name, value) in &snapshot.headers {
        match header_line(name, value) {
            Some(line) => {
                res.header(line);
            }
            None => warn!(
                header = %name,
                interned = HEADER_LINES.get().map_or(0, HeaderLines::len),
                "Header line table full, header dropped"
            ),
        }
    }
    res.body_vec(snapshot.body);
}
