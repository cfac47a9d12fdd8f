//! # Request Context
//!
//! [`ActionContext`] is the state of one in-flight request. It is bound to
//! the [`ContextSlot`] of the execution unit serving the request when the
//! dispatcher begins, handed to actions and views by reference, and released
//! when a mapped dispatch ends, whatever the outcome.
//!
//! ## Lifecycle
//!
//! ```text
//! begin_request ──► [bound] ──► guard drop / end_request ──► [released]
//!                      │
//!                      └── unmatched request: left bound, replaced by the next begin_request
//! ```
//!
//! [`ContextGuard`] ties release to scope so every mapped exit path (normal
//! return, application fault, unclassified fault) detaches the context.

mod action_context;
mod slot;

pub use action_context::{ActionContext, ScopeEnvironment};
pub use slot::{ContextGuard, ContextSlot};
