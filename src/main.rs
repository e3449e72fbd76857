use std::{
    error::Error,
    path::{Path, PathBuf},
    process::exit,
    sync::Arc,
};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_log::LogTracer;
use tracing_subscriber::EnvFilter;

use tabledoc::{
    config::{
        context::build_metastore,
        schema::{build_default_config, load_config, TabledocConfig},
    },
    frontend::http::run_server,
};

const DEFAULT_CONFIG_PATH: &str = "tabledoc.toml";
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Parser)]
#[clap(name = "tabledoc", version, about = "A database manager storing tables as JSON documents")]
struct Args {
    #[clap(short = 'c', long = "config", default_value = DEFAULT_CONFIG_PATH)]
    config_path: PathBuf,

    #[clap(long, help = "Emit logs as JSON lines")]
    json_logs: bool,
}

fn prepare_tracing(json_logs: bool) -> Result<(), Box<dyn Error>> {
    // Route `log` records from dependencies through tracing
    LogTracer::init()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json_logs {
        tracing::subscriber::set_global_default(builder.json().finish())?;
    } else {
        tracing::subscriber::set_global_default(builder.finish())?;
    }
    Ok(())
}

fn load(config_path: &Path) -> Result<TabledocConfig, Box<dyn Error>> {
    if config_path.exists() {
        info!("Loading the configuration from {}", config_path.display());
        Ok(load_config(config_path)?)
    } else {
        info!(
            "No configuration file at {}, using the defaults",
            config_path.display()
        );
        Ok(build_default_config())
    }
}

async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let config = load(&args.config_path)?;

    #[cfg(feature = "metrics")]
    if let Some(metrics) = &config.misc.metrics {
        tabledoc::config::context::setup_metrics(metrics)?;
        info!("Exporting metrics on {}:{}", metrics.host, metrics.port);
    }

    let metastore = Arc::new(build_metastore(&config).await?);

    let http = match config.frontend.http {
        Some(http) => http,
        None => {
            warn!("No frontends configured, nothing to do");
            return Ok(());
        }
    };

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for the shutdown signal: {e}");
            return;
        }
        info!("Shutting down");
    };

    run_server(metastore, http, shutdown).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = prepare_tracing(args.json_logs) {
        eprintln!("Failed to set up logging: {e}");
        exit(1);
    }

    if let Err(e) = run(args).await {
        error!("{e}");
        exit(1);
    }
}
