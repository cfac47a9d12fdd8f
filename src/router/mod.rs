//! # Router Module
//!
//! Resolves inbound requests to action definitions.
//!
//! The dispatcher only depends on the [`HandlerMapping`] trait. The crate
//! ships a radix-tree [`Router`] built from [`ActionDefinition`](crate::routes::ActionDefinition)s
//! and a [`RouteTable`] wrapper whose contents can be replaced atomically,
//! which is what the hot-reload watcher updates.
//!
//! ```rust,ignore
//! let router = Router::new(load_routes("routes.yaml")?);
//! let mapping = router.route(&Method::GET, "/users/42");
//! assert_eq!(mapping.path_param("id"), Some("42"));
//! ```

mod core;
mod radix;

pub use core::{ActionMapping, HandlerMapping, ParamVec, RouteTable, Router, MAX_INLINE_PARAMS};
pub use radix::RadixRouter;
