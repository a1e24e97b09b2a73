//! Treadmill Relay - share one WalkingPad driver between realtime viewers.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use treadmill_relay::client::{ClientError, ConsoleClient};
use treadmill_relay::config::{ConfigError, ConfigLoader, RelayConfig};
use treadmill_relay::display;
use treadmill_relay::relay::{RelayError, RelayServer};
use treadmill_relay::session::Session;

#[derive(Parser)]
#[command(
    name = "treadmill-relay",
    about = "Share one WalkingPad driver between realtime viewers",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the driver and serve the realtime relay.
    Serve {
        /// Config file to load instead of the default search paths.
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Address to bind.
        #[arg(long)]
        host: Option<String>,
        /// Port to listen on.
        #[arg(short, long)]
        port: Option<u16>,
        /// Driver executable. Replaces the configured program and its arguments.
        #[arg(long)]
        driver: Option<String>,
        /// Argument for the driver executable (repeatable).
        #[arg(long = "driver-arg", allow_hyphen_values = true)]
        driver_args: Vec<String>,
    },
    /// Interactive console client for a running relay.
    Client {
        /// WebSocket URL of the relay.
        #[arg(long, default_value = "ws://127.0.0.1:3000/ws")]
        url: String,
    },
}

#[derive(Debug, thiserror::Error)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Relay(#[from] RelayError),
    #[error(transparent)]
    Client(#[from] ClientError),
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        shutdown_signal().await;
        tracing::info!("Shutdown signal received");
        cancel.cancel();
    });
}

fn apply_overrides(
    config: &mut RelayConfig,
    host: Option<String>,
    port: Option<u16>,
    driver: Option<String>,
    driver_args: Vec<String>,
) {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(program) = driver {
        config.driver.program = program;
        config.driver.args = driver_args;
    } else if !driver_args.is_empty() {
        config.driver.args = driver_args;
    }
}

async fn serve(config: RelayConfig) -> Result<(), AppError> {
    let cancel = CancellationToken::new();
    let (session, outputs) = Session::create(
        config.driver.to_command(),
        Box::new(config.session.restart_policy()),
        config.session.options(),
        cancel.clone(),
    );

    let server = RelayServer::new(Arc::clone(&session)).with_config(config.server.clone());
    let listener = server.bind().await?;

    tracing::info!(
        program = %config.driver.program,
        args = ?config.driver.args,
        "Starting treadmill relay"
    );
    let session_task = tokio::spawn(Arc::clone(&session).run(outputs));
    spawn_signal_handler(cancel.clone());

    let result = server.serve(listener).await;
    cancel.cancel();
    if let Err(e) = session_task.await {
        tracing::warn!(error = %e, "Session task failed");
    }
    result.map_err(AppError::from)
}

async fn run_client(url: String) -> Result<(), AppError> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());
    ConsoleClient::new(url).run(cancel).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            driver,
            driver_args,
        } => {
            let loader = config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
            match loader.load() {
                Ok(mut relay_config) => {
                    apply_overrides(&mut relay_config, host, port, driver, driver_args);
                    serve(relay_config).await
                }
                Err(e) => Err(e.into()),
            }
        }
        Commands::Client { url } => run_client(url).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "Treadmill relay failed");
            display::print_error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}
