//! espotad - ESP8266 OTA Server Daemon
//!
//! Answers `ESP8266httpUpdate` requests from the firmware catalog in the
//! binary store.
//!
//! Usage:
//!   espotad [OPTIONS] [config.toml]
//!
//! Options:
//!   -p, --port <port>      Override the listen port
//!   -b, --bin-dir <path>   Override the binary store directory
//!
//! If no config file is provided, built-in defaults are used.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use anyhow::Context;
use espota_api::{create_router, AppState};
use espota_core::Config;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Parsed command-line arguments
#[derive(Debug, Default, PartialEq)]
struct Args {
    /// Server config file (TOML)
    config_path: Option<String>,
    /// Listen port override
    port: Option<u16>,
    /// Binary store override
    bin_dir: Option<PathBuf>,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> anyhow::Result<Args> {
    let args: Vec<String> = args.into_iter().collect();
    let mut result = Args::default();

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing argument for --port"))?;
                result.port = Some(
                    value
                        .parse()
                        .with_context(|| format!("Invalid port: {}", value))?,
                );
                i += 2;
            }
            "--bin-dir" | "-b" => {
                let value = args
                    .get(i + 1)
                    .ok_or_else(|| anyhow::anyhow!("Missing argument for --bin-dir"))?;
                result.bin_dir = Some(PathBuf::from(value));
                i += 2;
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            arg if !arg.starts_with('-') => {
                // Positional argument = config file
                result.config_path = Some(arg.to_string());
                i += 1;
            }
            _ => {
                tracing::warn!("Unknown argument: {}", args[i]);
                i += 1;
            }
        }
    }

    Ok(result)
}

fn print_help() {
    eprintln!(
        r#"espotad - ESP8266 OTA Server Daemon

Usage: espotad [OPTIONS] [config.toml]

Options:
  -p, --port <PORT>       Listen port (overrides [server] port)
  -b, --bin-dir <PATH>    Binary store directory (overrides [store] binary_dir)
  -h, --help              Print this help message

Examples:
  # Run with defaults (./bin, port 8080)
  espotad

  # Run with config file
  espotad espota.toml

  # Serve a different store on port 80
  espotad -p 80 -b /srv/firmware espota.toml
"#
    );
}

/// Load the config file (or defaults) and apply CLI overrides
fn load_config(args: &Args) -> anyhow::Result<Config> {
    let mut config = match args.config_path {
        Some(ref path) => {
            tracing::info!("Loading config from: {}", path);
            Config::load(path)?
        }
        None => {
            tracing::info!("No config file provided, using defaults");
            Config::default()
        }
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref bin_dir) = args.bin_dir {
        config.store.binary_dir = bin_dir.clone();
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "espotad=info,espota_api=info,espota_core=info,tower_http=info".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting espotad (ESP8266 OTA Server Daemon)");

    let args = parse_args(std::env::args().skip(1))?;
    let config = load_config(&args)?;

    let catalog_path = config.catalog_path();
    if !catalog_path.is_file() {
        tracing::warn!(
            path = %catalog_path.display(),
            "Catalog not found; every update request will fail until it is published"
        );
    }

    let ip: IpAddr = config
        .server
        .host
        .parse()
        .with_context(|| format!("Invalid listen address: {}", config.server.host))?;
    let addr = SocketAddr::new(ip, config.server.port);

    tracing::info!(
        route = %config.server.route,
        binary_dir = %config.store.binary_dir.display(),
        catalog = %config.store.catalog_file,
        log_pattern = %config.log.file_pattern,
        cache_digests = config.update.cache_digests,
        "Update endpoint configured"
    );

    let app = create_router(AppState::new(config));

    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
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

    tracing::info!("Shutdown signal received");
}
