//! # evergreen
//!
//! **evergreen** is the request-dispatch core of an action-based web
//! framework, running on the `may` coroutine runtime and `may_minihttp`.
//!
//! ## Overview
//!
//! Each inbound request passes through a single front controller, the
//! [`Dispatcher`]. It binds a per-request [`ActionContext`] to the execution
//! unit serving the request, resolves the request to a named action, invokes
//! the action, renders whatever the action returned, and tears the context
//! down again on every exit path.
//!
//! ## Architecture
//!
//! - **[`routes`]** - route file loading into [`ActionDefinition`]s
//! - **[`router`]** - radix-tree matching and the hot-swappable [`RouteTable`]
//! - **[`context`]** - the per-request [`ActionContext`] and the per-unit [`ContextSlot`]
//! - **[`scope`]** - request, session and application attribute maps
//! - **[`dispatcher`]** - the front controller and fault classification
//! - **[`invoker`]** - name-keyed [`ActionRegistry`]
//! - **[`typed`]** - actions with typed parameter binding
//! - **[`view`]** - view results and plain-value normalization
//! - **[`fallback`]** / **[`static_files`]** - answers for unmatched requests
//! - **[`server`]** - the `may_minihttp` adapter ([`AppService`])
//! - **[`hot_reload`]** - route file watching
//! - **[`config`]**, **[`logging`]**, **[`runtime_config`]** - process setup
//!
//! ### Request Flow
//!
//! ```text
//! may_minihttp ─► AppService::call ─► parse_request
//!                      │
//!                      ▼
//!              Dispatcher::on_request(slot, request, response)
//!                      │  D1 bind context into slot
//!                      │  D2 HandlerMapping::resolve
//!          ┌───────────┴────────────┐
//!     unmatched                  matched
//!          │                        │  D3 HandlerInvoker::invoke
//!  DefaultHandler::serve            │     ViewResult::execute
//!  (context left bound)             │  D4 classify faults
//!                                   │  D5 release context
//!                                   ▼
//!                          write_response ─► socket
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use evergreen::{ActionDefinition, ActionRegistry, AppService, Dispatcher, HttpServer, Router};
//! use http::Method;
//! use std::sync::Arc;
//!
//! let router = Router::new(vec![ActionDefinition::new(Method::GET, "/users/{id}", "get_user")]);
//!
//! let mut actions = ActionRegistry::new();
//! actions.register_fn("get_user", |ctx| {
//!     let id = ctx.path_param("id").unwrap_or_default();
//!     Ok(serde_json::json!({ "id": id }).into())
//! });
//!
//! let dispatcher = Dispatcher::new(Arc::new(router), Arc::new(actions));
//! let handle = HttpServer(AppService::new(Arc::new(dispatcher))).start("0.0.0.0:8080")?;
//! handle.join().ok();
//! ```
//!
//! ## Faults
//!
//! Actions fail with [`ActionError`]. A status-carrying fault is answered with
//! that status, a transport fault drops the connection, and anything else
//! (including panics) becomes `500 Internal Server Error` at the transport
//! adapter. See [`error`] for the full table.
//!
//! ## Scopes
//!
//! Scope maps are built on first access. A request that never touches the
//! session scope never creates a session; the first write to it does, and the
//! response carries the session cookie.

pub mod action;
pub mod cli;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod echo;
pub mod error;
pub mod fallback;
pub mod hot_reload;
pub mod ids;
pub mod invoker;
pub mod logging;
pub mod metrics;
pub mod router;
pub mod routes;
pub mod runtime_config;
pub mod scope;
pub mod server;
pub mod static_files;
pub mod typed;
pub mod view;

pub use action::{Action, ActionResult};
pub use context::{ActionContext, ContextGuard, ContextSlot, ScopeEnvironment};
pub use dispatcher::{DispatchConfig, DispatchOutcome, Dispatcher};
pub use error::{ActionError, DispatchError};
pub use fallback::{DefaultHandler, NotFoundHandler};
pub use invoker::{ActionRegistry, HandlerInvoker};
pub use router::{ActionMapping, HandlerMapping, RouteTable, Router};
pub use routes::{load_routes, ActionDefinition};
pub use scope::{Scope, ScopeMap};
pub use server::{AppService, HttpRequest, HttpServer, ResponseHandle};
pub use typed::TypedAction;
pub use view::ViewResult;
