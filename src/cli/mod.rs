//! # CLI Module
//!
//! Command-line entry points for the `evergreen` binary.
//!
//! ## Commands
//!
//! ### `serve`
//!
//! Load a route file and serve it, answering every matched route with the
//! built-in [echo action](crate::echo):
//!
//! ```bash
//! evergreen serve --routes routes.yaml --addr 127.0.0.1:8080 --watch
//! evergreen serve --config evergreen.yaml --static-dir public
//! ```
//!
//! Flags override the matching fields of the configuration file. The server
//! stops on `SIGINT` or `SIGTERM`.
//!
//! ### `routes`
//!
//! Print the route table a file produces:
//!
//! ```bash
//! evergreen routes --routes routes.yaml
//! ```

mod commands;

#[cfg(test)]
mod tests;

pub use commands::{build_service, run, run_cli, Cli, Commands, ServeSettings};
