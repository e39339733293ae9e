//! Kithnet Daemon -- the social-graph service process.
//!
//! Usage:
//!
//!   kithnet-daemon [OPTIONS]
//!
//! Options:
//!
//!   --host <HOST>       Bind host (default: 127.0.0.1)
//!   --port <PORT>       Bind port (default: 8080)
//!   --data-dir <PATH>   Data directory (default: platform-specific)
//!   --key-file <PATH>   Shared-secret key file (default: <data-dir>/secret.key)
//!   --config <PATH>     Load config from JSON file
//!
//! The daemon runs until interrupted with Ctrl+C (SIGINT/SIGTERM).

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use kithnet_crypto::cipher::FrameCipher;
use kithnet_directory::Directory;
use kithnet_server::{Server, ServerConfig};
use kithnet_store::AccountStore;
use tokio::sync::watch;

mod config;
mod key_io;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const STORAGE_DIR: &str = "storage";

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() {
    // Tracing / logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    print_banner();

    // Parse CLI arguments.
    let cli = config::CliArgs::parse_from_env();

    // Load or merge config file if provided.
    let daemon_config = match &cli.config_path {
        Some(path) => match config::DaemonConfig::load(path) {
            Ok(cfg) => cfg.merge_cli(&cli),
            Err(e) => {
                tracing::error!("failed to load config file: {e}");
                std::process::exit(1);
            }
        },
        None => config::DaemonConfig::from_cli(&cli),
    };

    // Run the daemon.
    if let Err(e) = run_daemon(daemon_config).await {
        tracing::error!("daemon error: {e}");
        std::process::exit(1);
    }
}

// ---------------------------------------------------------------------------
// Daemon main logic
// ---------------------------------------------------------------------------

async fn run_daemon(cfg: config::DaemonConfig) -> Result<(), String> {
    let storage_path = cfg.data_dir.join(STORAGE_DIR);
    let key_path = cfg.key_file();

    std::fs::create_dir_all(&cfg.data_dir)
        .map_err(|e| format!("failed to create data directory: {e}"))?;

    tracing::info!(data_dir = %cfg.data_dir.display(), "data directory ready");

    // -----------------------------------------------------------------------
    // 1. Frame key
    // -----------------------------------------------------------------------

    let key = key_io::load_or_generate(&key_path)?;
    let cipher = Arc::new(FrameCipher::new(key));

    // -----------------------------------------------------------------------
    // 2. Account store
    // -----------------------------------------------------------------------

    let store = AccountStore::open(&storage_path)
        .map_err(|e| format!("failed to open account store: {e}"))?;

    tracing::info!(accounts = store.len(), "account store opened");

    // -----------------------------------------------------------------------
    // 3. Directory
    // -----------------------------------------------------------------------

    let mut directory =
        Directory::new(store).map_err(|e| format!("directory creation failed: {e}"))?;
    let command_tx = directory.command_sender();
    let mut directory_handle = directory
        .start()
        .map_err(|e| format!("directory start failed: {e}"))?;

    tracing::info!("directory started");

    // -----------------------------------------------------------------------
    // 4. TCP server
    // -----------------------------------------------------------------------

    let ip: IpAddr = cfg
        .host
        .parse()
        .map_err(|e| format!("invalid bind host '{}': {e}", cfg.host))?;
    let bind_addr = SocketAddr::new(ip, cfg.port);

    let (server_shutdown_tx, server_shutdown_rx) = watch::channel(false);
    let server_config = ServerConfig {
        bind_addr,
        ..ServerConfig::default()
    };

    let (local_addr, mut server_handle) = Server::start(
        server_config,
        cipher,
        command_tx,
        server_shutdown_rx,
    )
    .await
    .map_err(|e| format!("server start failed: {e}"))?;

    // -----------------------------------------------------------------------
    // 5. Print status summary
    // -----------------------------------------------------------------------

    println!();
    println!("============================================================");
    println!("  Kithnet Daemon running");
    println!("============================================================");
    println!("  Listening:  {local_addr}");
    println!("  Key file:   {}", key_path.display());
    println!("  Data dir:   {}", cfg.data_dir.display());
    println!("============================================================");
    println!("  Press Ctrl+C to stop");
    println!("============================================================");
    println!();

    // -----------------------------------------------------------------------
    // 6. Wait for shutdown signal
    // -----------------------------------------------------------------------

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received Ctrl+C, shutting down...");
        }
        result = &mut server_handle => {
            match result {
                Ok(()) => tracing::error!("accept loop exited unexpectedly"),
                Err(e) => tracing::error!(%e, "accept loop panicked"),
            }
        }
        result = &mut directory_handle => {
            match result {
                Ok(()) => tracing::error!("directory event loop exited unexpectedly"),
                Err(e) => tracing::error!(%e, "directory event loop panicked"),
            }
        }
    }

    // -----------------------------------------------------------------------
    // 7. Graceful shutdown: stop accepting, then drain the directory
    // -----------------------------------------------------------------------

    let _ = server_shutdown_tx.send(true);
    if !server_handle.is_finished() {
        let _ = (&mut server_handle).await;
    }

    if directory.shutdown().is_ok() && !directory_handle.is_finished() {
        let _ = (&mut directory_handle).await;
    }

    tracing::info!("daemon stopped");
    Ok(())
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn print_banner() {
    println!(
        r#"
  _  ___ _   _                 _
 | |/ (_) |_| |__  _ __   ___| |_
 | ' /| | __| '_ \| '_ \ / _ \ __|
 | . \| | |_| | | | | | |  __/ |_
 |_|\_\_|\__|_| |_|_| |_|\___|\__|
                     daemon v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
