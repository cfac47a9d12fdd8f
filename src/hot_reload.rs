//! # Hot Reload
//!
//! Watches a route file and swaps the [`RouteTable`] when it changes.
//! In-flight requests keep the table they loaded; the next request sees the
//! new one.
//!
//! If the edited file fails to load, the error is logged and the previous
//! table stays active, so saving a half-written file never takes routes down.
//!
//! ```rust,ignore
//! let table = Arc::new(RouteTable::new(Router::new(load_routes("routes.yaml")?)));
//! let _watcher = watch_routes("routes.yaml", Arc::clone(&table), |routes| {
//!     tracing::info!(count = routes.len(), "routes reloaded");
//! })?;
//! ```

use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::router::{RouteTable, Router};
use crate::routes::{load_routes, ActionDefinition};

/// Reload the route file into `table` once.
///
/// # Errors
///
/// Returns the load error; `table` is left unchanged.
pub fn reload_routes(path: &Path, table: &RouteTable) -> anyhow::Result<Vec<ActionDefinition>> {
    let routes = load_routes(path)?;
    table.replace(Router::new(routes.clone()));
    Ok(routes)
}

/// Watch `routes_path` and replace the contents of `table` on every change.
///
/// `on_reload` receives the new definitions after each successful swap.
/// Keep the returned watcher alive for as long as reloading should continue.
///
/// # Errors
///
/// Fails when the watcher cannot be created or the path cannot be watched.
pub fn watch_routes<P, F>(
    routes_path: P,
    table: Arc<RouteTable>,
    mut on_reload: F,
) -> notify::Result<RecommendedWatcher>
where
    P: AsRef<Path>,
    F: FnMut(&[ActionDefinition]) + Send + 'static,
{
    let path: PathBuf = routes_path.as_ref().to_path_buf();
    let watch_path = path.clone();

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<notify::Event, notify::Error>| match res {
            Ok(event) => {
                if matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
                    match reload_routes(&watch_path, &table) {
                        Ok(routes) => {
                            info!(
                                routes_count = routes.len(),
                                file = %watch_path.display(),
                                "hot-reload: route table applied"
                            );
                            on_reload(&routes);
                        }
                        Err(e) => warn!(
                            file = %watch_path.display(),
                            error = %format!("{e:#}"),
                            "hot-reload: keeping previous route table"
                        ),
                    }
                }
            }
            Err(e) => error!(error = %e, "hot-reload: watch error"),
        },
        Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!(file = %path.display(), "hot-reload: watching route file");
    Ok(watcher)
}
