//! Route definitions and the route-table loader.
//!
//! A route table is a small YAML or JSON document naming, for each method
//! and path pattern, the action that serves it:
//!
//! ```yaml
//! base_path: /api
//! routes:
//!   - { method: GET, path: "/users/{id}", action: get_user }
//!   - { method: POST, path: "/users", action: create_user }
//! ```

mod load;
mod types;

pub use load::{load_routes, parse_routes};
pub use types::ActionDefinition;
