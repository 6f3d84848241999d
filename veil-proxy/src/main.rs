#![forbid(unsafe_code)]

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use veil_proxy_lib::config::{load_from_path, validate, Config};
use veil_proxy_lib::telemetry::{init_metrics, init_tracing, start_observability_server};

#[derive(Parser, Debug)]
#[command(author, version, about = "Veil iframe-embedding reverse proxy")]
struct Cli {
    /// Path to configuration TOML file (built-in defaults when omitted)
    #[arg(short, long, value_name = "FILE", env = "VEIL_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overrides `listen` from the configuration
    #[arg(long, value_name = "ADDR", env = "VEIL_LISTEN")]
    listen: Option<SocketAddr>,
}

fn load_config(cli: &Cli) -> veil_proxy_lib::Result<Config> {
    let mut cfg = match &cli.config {
        Some(path) => load_from_path(path)?,
        None => Config::default(),
    };
    if let Some(listen) = cli.listen {
        cfg.listen = listen;
    }
    validate(&cfg).map_err(veil_proxy_lib::ProxyError::Config)?;
    Ok(cfg)
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let cfg = match load_config(&cli) {
        Ok(cfg) => cfg,
        Err(err) => {
            eprintln!("failed to load configuration: {err}");
            std::process::exit(1);
        }
    };

    if let Err(err) = init_tracing(&cfg.logging, &cfg.telemetry) {
        eprintln!("failed to initialise tracing: {err}");
        std::process::exit(1);
    }
    info!(?cfg.listen, public_origin = ?cfg.public_origin, "configuration loaded");

    let metrics = match cfg.telemetry.metrics_port {
        Some(port) => match init_metrics() {
            Ok((metrics, registry)) => {
                tokio::spawn(async move {
                    if let Err(err) = start_observability_server(port, registry).await {
                        error!(%err, "observability server exited with error");
                    }
                });
                Some(metrics)
            }
            Err(err) => {
                warn!(%err, "failed to initialise metrics, continuing without them");
                None
            }
        },
        None => None,
    };

    if let Err(err) = veil_proxy_lib::run(Arc::new(cfg), metrics).await {
        error!(%err, "proxy exited with error");
        std::process::exit(1);
    }
}
