//! Transport adapter between `may_minihttp` and the dispatch core.

pub mod http_server;
pub mod request;
pub mod response;
pub mod service;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_cookies, parse_query_params, parse_request, HeaderVec, HttpRequest, MAX_INLINE_HEADERS};
pub use response::{write_response, ResponseHandle, ResponseSnapshot};
pub use service::AppService;
