//! hostweave server binary.
//!
//! - Loads `hostweave.yaml` (or `--config`), falling back to built-in defaults
//!   when the default file is absent
//! - Registers the built-in modules in the default namespace
//! - Serves until Ctrl+C / SIGTERM

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;

use hostweave_core::error::Result;
use hostweave_server::{
    app_state::AppState,
    config::{self, AppConfig, LoggingSection},
    dispatch::ModuleCatalog,
    obs,
    server::Server,
    services::HomeModule,
    templates::BuiltinTemplates,
};

const DEFAULT_CONFIG: &str = "hostweave.yaml";

#[derive(Debug, Parser)]
#[command(name = "hostweave-server", about = "Multi-tenant HTTP application server")]
struct Cli {
    /// Path to the YAML config file.
    #[arg(long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Override `server.listen`.
    #[arg(long)]
    listen: Option<String>,
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut cfg = if cli.config == Path::new(DEFAULT_CONFIG) && !cli.config.exists() {
        AppConfig::default()
    } else {
        config::load_from_file(&cli.config)?
    };
    if let Some(listen) = &cli.listen {
        cfg.server.listen = listen.clone();
        cfg.validate()?;
    }
    Ok(cfg)
}

fn catalog(cfg: &AppConfig) -> ModuleCatalog {
    let catalog = ModuleCatalog::new();
    catalog
        .namespace(&cfg.default_tenant.namespace)
        .register_default::<HomeModule>("home");
    catalog
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(e) => {
            let _guard = obs::logging::init(&LoggingSection::default());
            tracing::error!(config = %cli.config.display(), error = %e, "config load failed");
            return ExitCode::FAILURE;
        }
    };
    let _guard = obs::logging::init(&cfg.logging);
    tracing::info!(config = %cli.config.display(), "hostweave-server starting");

    let catalog = catalog(&cfg);
    let app = match BuiltinTemplates::new()
        .and_then(|templates| AppState::new(cfg, catalog, Arc::new(templates)))
    {
        Ok(app) => app,
        Err(e) => {
            tracing::error!(error = %e, "startup failed");
            return ExitCode::FAILURE;
        }
    };

    let server = Server::new(app);
    let stopper = server.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        stopper.stop();
    });

    match server.start().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(kind = e.kind().as_str(), error = %e, "server failed");
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("signal received, stopping listener");
}
