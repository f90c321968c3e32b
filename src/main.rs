//! Login server binary.
//!
//! Serves the STNP login extension over UDP and the username lookup over HTTP.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: UDP 4660, REST 8124, store and logs under /var
//! stnp-login
//!
//! # Throwaway instance logging to stderr
//! stnp-login --db-file "" --log-file "" --log-level debug
//!
//! # Settings from a TOML file, flags override it
//! stnp-login --config /etc/stb/login.toml --udp-port 5000
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, warn};

use stnp_login::config::{LogLevel, LoginConfig};
use stnp_login::error::Result;
use stnp_login::protocol::Dispatcher;
use stnp_login::service::rest;
use stnp_login::store::CredentialStore;
use stnp_login::transport::udp;
use stnp_login::utils::{logging, metrics};

/// Authentication server for Super Tilt Bro.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// TOML configuration file, applied before the other flags
    #[arg(long)]
    config: Option<PathBuf>,

    /// Port listening for UDP requests
    #[arg(long)]
    udp_port: Option<u16>,

    /// Port listening for REST requests
    #[arg(long)]
    rest_port: Option<u16>,

    /// File storing persistent login info, empty for no file
    #[arg(long)]
    db_file: Option<String>,

    /// Logs destination, empty for stderr
    #[arg(long)]
    log_file: Option<String>,

    /// Minimal severity of logs [debug, info, warning, error, critical]
    #[arg(long)]
    log_level: Option<String>,
}

impl Cli {
    fn into_config(self) -> Result<LoginConfig> {
        let mut config = match &self.config {
            Some(path) => LoginConfig::from_file(path)?,
            None => LoginConfig::default(),
        };
        config.apply_env()?;

        if let Some(port) = self.udp_port {
            config.server.address = format!("0.0.0.0:{port}");
        }
        if let Some(port) = self.rest_port {
            config.rest.address = format!("0.0.0.0:{port}");
        }
        if let Some(path) = self.db_file {
            config.store.db_file = path;
        }
        if let Some(path) = self.log_file {
            config.logging.log_file = path;
        }
        if let Some(level) = self.log_level {
            config.logging.log_level = level.parse::<LogLevel>()?;
        }

        config.validate_strict()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logging::init_logging(&config.logging) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "Login server failed");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: LoginConfig) -> Result<()> {
    metrics::init_metrics();

    let store = Arc::new(CredentialStore::from_path(config.store.db_path())?);
    if store.path().is_none() {
        warn!("Running without a database file. All accounts will be lost on shutdown.");
    }

    let socket = udp::bind(&config.server.address).await?;
    let dispatcher = Dispatcher::new(store.clone());

    let shutdown_rx = udp::shutdown_on_ctrl_c();

    if !config.rest.enabled {
        return udp::serve_with_shutdown(socket, dispatcher, &config.server, shutdown_rx).await;
    }

    let rest_server = rest::build(&config.rest, store)?;
    let rest_handle = rest_server.handle();

    let udp_service = async {
        let result = udp::serve_with_shutdown(socket, dispatcher, &config.server, shutdown_rx).await;
        rest_handle.stop(true).await;
        result
    };

    let (udp_result, rest_result) = tokio::join!(udp_service, rest_server);
    rest_result?;
    udp_result
}
