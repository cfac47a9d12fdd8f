//! # Dispatcher Module
//!
//! The front controller. Every request that reaches the server goes through
//! [`Dispatcher::on_request`], which owns the request-context lifecycle.
//!
//! ## Request Flow
//!
//! 1. **D1** bind a fresh [`ActionContext`](crate::context::ActionContext)
//!    into the caller's [`ContextSlot`](crate::context::ContextSlot)
//! 2. **D2** resolve the request through the [`HandlerMapping`](crate::router::HandlerMapping)
//! 3. Unmatched requests are passed to the fallback handler and the context
//!    is left for the next request to replace
//! 4. **D3** matched requests run the action and render its view under a
//!    [`ContextGuard`](crate::context::ContextGuard)
//! 5. **D4** faults are classified: application faults carry a status and are
//!    answered with it, transport faults abort the connection, anything else
//!    is reported as an unclassified failure
//! 6. **D5** the guard releases the context on every exit path
//!
//! ## Transport Faults
//!
//! Whether the context is released after a transport fault is controlled by
//! [`DispatchConfig::release_context_on_transport_fault`] (default `true`).
//! When disabled the context stays bound until the next request on the same
//! execution unit replaces it.

mod core;

pub use core::{DispatchConfig, DispatchOutcome, Dispatcher};
