//! CENO Client - local mediation proxy for the CENO bundle network.
//!
//! Resolves requested web resources through the distributed cache instead of
//! fetching them from the origin: asks the LCS for a ready bundle, falls
//! back to asking the RS to build one, and serves interim or error pages in
//! the meantime.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use ceno_core::config::ConfigError;
use ceno_core::{ClientConfig, Messages};
use ceno_proxy::{AppState, ProxyServer};

/// CENO client - resolve web pages through the distributed bundle cache
#[derive(Parser, Debug)]
#[command(name = "ceno-client", version, about)]
struct Args {
    /// Path to the JSON configuration file
    #[arg(long, default_value = "config/client.json")]
    config: PathBuf,

    /// Override the configured listen port
    #[arg(long)]
    port: Option<u16>,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Log to stdout only, skip the rolling log file
    #[arg(long)]
    no_log_file: bool,
}

/// Get the logs directory path.
fn logs_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "ceno", "CenoClient")
        .map(|dirs| dirs.data_dir().join("logs"))
}

/// Initialize logging with daily file rotation, falling back to console-only
/// when no log directory is available.
fn init_logging(args: &Args) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "ceno_core={0},ceno_proxy={0},ceno_client={0},warn",
            args.log_level
        ))
    });

    if !args.no_log_file {
        if let Some(log_dir) = logs_dir() {
            if std::fs::create_dir_all(&log_dir).is_ok() {
                let file_appender = RollingFileAppender::builder()
                    .rotation(Rotation::DAILY)
                    .max_log_files(5)
                    .filename_prefix("ceno-client")
                    .filename_suffix("log")
                    .build(&log_dir)
                    .ok();

                if let Some(appender) = file_appender {
                    let (non_blocking, guard) = tracing_appender::non_blocking(appender);
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stdout))
                        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
                        .init();
                    tracing::info!("Logging to {:?}", log_dir);
                    return Some(guard);
                }
            }
        }
    }

    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    None
}

/// Loads the config file. A missing file is survivable (the defaults match
/// the standard local deployment); a present-but-broken file is not.
fn load_config(args: &Args) -> anyhow::Result<ClientConfig> {
    let mut config = match ClientConfig::load(&args.config) {
        Ok(config) => config,
        Err(ConfigError::Read(ref e)) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No config file at {:?}, using defaults", args.config);
            ClientConfig::default()
        }
        Err(e) => {
            return Err(e).with_context(|| format!("unusable config file {:?}", args.config))
        }
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _log_guard = init_logging(&args);

    let config = load_config(&args)?;
    let messages = Messages::from_env(&config.translations_dir);

    let state =
        AppState::new(config, messages).context("failed to build upstream HTTP client")?;
    let server = ProxyServer::new(state);
    tracing::info!("CENO client listening on {}", server.addr());

    server.run().await.context("proxy server exited")?;
    Ok(())
}
