use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::config::AppConfig;
use crate::context::ScopeEnvironment;
use crate::dispatcher::Dispatcher;
use crate::echo::EchoInvoker;
use crate::hot_reload::watch_routes;
use crate::logging::{init_logging_with_config, LogConfig};
use crate::router::{HandlerMapping, RouteTable, Router};
use crate::routes::load_routes;
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer, ServerHandle};
use crate::static_files::StaticFiles;

/// Command-line interface for evergreen
#[derive(Debug, Parser)]
#[command(name = "evergreen", version)]
#[command(about = "Action dispatcher development server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Serve a route file, answering every route with the echo action
    Serve {
        /// YAML configuration file
        #[arg(short, long, env = "EVERGREEN_CONFIG")]
        config: Option<PathBuf>,

        /// Route file (YAML or JSON); overrides `routes_file` from the config
        #[arg(short, long)]
        routes: Option<PathBuf>,

        /// Address and port to bind; overrides `server.addr` from the config
        #[arg(long)]
        addr: Option<String>,

        /// Serve files from this directory for unmatched requests
        #[arg(long)]
        static_dir: Option<PathBuf>,

        /// Reload the route table when the route file changes
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Print the route table of a route file
    Routes {
        /// Route file (YAML or JSON)
        #[arg(short, long)]
        routes: PathBuf,
    },
}

/// Serve options after merging the config file with command-line overrides.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeSettings {
    pub config: AppConfig,
    pub routes: PathBuf,
}

impl ServeSettings {
    /// Merge `config` with the flags given on the command line.
    ///
    /// # Errors
    ///
    /// Fails when neither the flags nor the config name a route file.
    pub fn resolve(
        mut config: AppConfig,
        routes: Option<PathBuf>,
        addr: Option<String>,
        static_dir: Option<PathBuf>,
    ) -> anyhow::Result<Self> {
        if let Some(addr) = addr {
            config.server.addr = addr;
        }
        if static_dir.is_some() {
            config.static_dir = static_dir;
        }
        let Some(routes) = routes.or_else(|| config.routes_file.clone()) else {
            bail!("no route file: pass --routes or set `routes_file` in the config");
        };
        Ok(Self { config, routes })
    }
}

/// Build the dispatcher and service for `settings` around `table`.
pub fn build_service(settings: &ServeSettings, table: &Arc<RouteTable>) -> AppService {
    let config = &settings.config;
    let scopes = ScopeEnvironment::default()
        .with_cookie(config.session.cookie())
        .with_sessions(Arc::new(config.session.store()));
    let mapping: Arc<dyn HandlerMapping> = Arc::clone(table) as Arc<dyn HandlerMapping>;

    let mut dispatcher = Dispatcher::new(mapping, Arc::new(EchoInvoker))
        .with_config(config.dispatch)
        .with_scopes(scopes);
    if let Some(dir) = &config.static_dir {
        dispatcher = dispatcher.with_fallback(Arc::new(StaticFiles::new(dir)));
    }

    let service = AppService::new(Arc::new(dispatcher));
    match &config.server.metrics_path {
        Some(path) => service.with_metrics_endpoint(path.clone()),
        None => service,
    }
}

/// Parse the process arguments and run the selected command.
///
/// # Errors
///
/// Returns configuration, route-loading and bind failures.
pub fn run_cli() -> anyhow::Result<()> {
    run(Cli::parse())
}

/// Run an already parsed command line.
///
/// # Errors
///
/// Returns configuration, route-loading and bind failures.
pub fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Serve {
            config,
            routes,
            addr,
            static_dir,
            watch,
        } => {
            let app_config = match &config {
                Some(path) => AppConfig::load(path)?,
                None => AppConfig::default(),
            };
            let settings = ServeSettings::resolve(app_config, routes, addr, static_dir)?;
            serve(&settings, watch)
        }
        Commands::Routes { routes } => {
            print_routes(&routes)?;
            Ok(())
        }
    }
}

fn print_routes(path: &Path) -> anyhow::Result<()> {
    Router::new(load_routes(path)?).dump_routes();
    Ok(())
}

fn serve(settings: &ServeSettings, watch: bool) -> anyhow::Result<()> {
    let _log_guard = init_logging_with_config(&LogConfig::from_env())?;
    RuntimeConfig::from_env().apply();

    let table = Arc::new(RouteTable::new(Router::new(load_routes(&settings.routes)?)));
    table.current().dump_routes();

    let service = build_service(settings, &table);
    let _watcher = if watch {
        Some(
            watch_routes(&settings.routes, Arc::clone(&table), |routes| {
                info!(routes_count = routes.len(), "Serving reloaded routes");
            })
            .context("failed to watch route file")?,
        )
    } else {
        None
    };

    let handle = HttpServer(service)
        .start(settings.config.server.addr.as_str())
        .with_context(|| format!("failed to bind {}", settings.config.server.addr))?;
    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, addr = %handle.addr(), "Shutdown signal received");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: ServerHandle) -> anyhow::Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
