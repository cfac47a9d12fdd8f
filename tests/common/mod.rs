#![allow(dead_code)]

use evergreen::{
    ActionDefinition, ActionRegistry, ContextSlot, DefaultHandler, Dispatcher, HttpRequest,
    NotFoundHandler, ResponseHandle, Router,
};
use http::Method;
use std::io;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub mod test_server {
    use std::sync::Once;

    /// Ensures May coroutines are configured only once
    static MAY_INIT: Once = Once::new();

    pub fn setup_may_runtime() {
        MAY_INIT.call_once(|| {
            may::config().set_stack_size(0x8000);
        });
    }
}

/// Dispatcher over `routes` and `registry` with default settings.
pub fn dispatcher(routes: Vec<ActionDefinition>, registry: ActionRegistry) -> Dispatcher {
    Dispatcher::new(Arc::new(Router::new(routes)), Arc::new(registry))
}

pub fn get(path: &str, action: &str) -> ActionDefinition {
    ActionDefinition::new(Method::GET, path, action)
}

/// Dispatch `request` on `slot` and hand back the response it produced.
pub fn dispatch(
    dispatcher: &Dispatcher,
    slot: &mut ContextSlot,
    request: HttpRequest,
) -> (
    Result<evergreen::DispatchOutcome, evergreen::DispatchError>,
    ResponseHandle,
) {
    let response = ResponseHandle::new();
    let result = dispatcher.on_request(slot, Arc::new(request), &response);
    (result, response)
}

/// Default handler that counts calls and answers 404.
#[derive(Default)]
pub struct CountingFallback {
    calls: AtomicUsize,
}

impl CountingFallback {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl DefaultHandler for CountingFallback {
    fn serve(&self, request: &HttpRequest, response: &ResponseHandle) -> io::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        NotFoundHandler.serve(request, response)
    }
}

/// Default handler whose connection always fails.
pub struct BrokenFallback;

impl DefaultHandler for BrokenFallback {
    fn serve(&self, _request: &HttpRequest, _response: &ResponseHandle) -> io::Result<()> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "client went away"))
    }
}

pub mod wire {
    use evergreen::server::ServerHandle;
    use evergreen::{AppService, HttpServer};
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener, TcpStream};
    use std::time::Duration;

    /// Start `service` on a free local port.
    pub fn start_service(service: AppService) -> (ServerHandle, SocketAddr) {
        super::test_server::setup_may_runtime();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);
        let handle = HttpServer(service).start(addr).unwrap();
        handle.wait_ready().unwrap();
        (handle, addr)
    }

    pub fn send_request(addr: &SocketAddr, req: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        stream.write_all(req.as_bytes()).unwrap();
        stream
            .set_read_timeout(Some(Duration::from_millis(500)))
            .unwrap();
        let mut buf = Vec::new();
        loop {
            let mut tmp = [0u8; 1024];
            match stream.read(&mut tmp) {
                Ok(0) => break,
                Ok(n) => buf.extend_from_slice(&tmp[..n]),
                Err(ref e)
                    if e.kind() == std::io::ErrorKind::WouldBlock
                        || e.kind() == std::io::ErrorKind::TimedOut =>
                {
                    break
                }
                Err(e) => panic!("read error: {:?}", e),
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    /// Status, headers (lowercase names) and body of a raw response.
    pub fn parse_response(resp: &str) -> (u16, Vec<(String, String)>, String) {
        let (head, body) = resp.split_once("\r\n\r\n").unwrap_or((resp, ""));
        let mut lines = head.lines();
        let status = lines
            .next()
            .and_then(|line| line.split_whitespace().nth(1))
            .and_then(|code| code.parse().ok())
            .unwrap_or(0);
        let headers = lines
            .filter_map(|line| line.split_once(':'))
            .map(|(name, value)| (name.trim().to_ascii_lowercase(), value.trim().to_string()))
            .collect();
        (status, headers, body.to_string())
    }
}
