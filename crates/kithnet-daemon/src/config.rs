//! CLI argument parsing and config file support.
//!
//! The daemon can be configured via CLI flags, a JSON config file,
//! or a combination of both (CLI overrides config file).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CLI arguments (manual parsing, no clap dependency)
// ---------------------------------------------------------------------------

/// Parsed command-line arguments.
pub struct CliArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<PathBuf>,
    pub key_file: Option<PathBuf>,
    pub config_path: Option<PathBuf>,
}

impl CliArgs {
    /// Parses CLI arguments from `std::env::args`.
    pub fn parse_from_env() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let mut cli = Self {
            host: None,
            port: None,
            data_dir: None,
            key_file: None,
            config_path: None,
        };

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" => {
                    i += 1;
                    cli.host = args.get(i).cloned();
                }
                "--port" => {
                    i += 1;
                    cli.port = args.get(i).and_then(|s| s.parse().ok());
                }
                "--data-dir" => {
                    i += 1;
                    cli.data_dir = args.get(i).map(PathBuf::from);
                }
                "--key-file" => {
                    i += 1;
                    cli.key_file = args.get(i).map(PathBuf::from);
                }
                "--config" => {
                    i += 1;
                    cli.config_path = args.get(i).map(PathBuf::from);
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                other => {
                    eprintln!("unknown argument: {other}");
                    eprintln!("use --help for usage information");
                    std::process::exit(1);
                }
            }
            i += 1;
        }

        cli
    }
}

// ---------------------------------------------------------------------------
// Config file (JSON)
// ---------------------------------------------------------------------------

/// JSON config file format.
///
/// Example `daemon.json`:
/// ```json
/// {
///   "host": "0.0.0.0",
///   "port": 8080,
///   "data_dir": "/opt/kithnet/data",
///   "key_file": "/opt/kithnet/secret.key"
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DaemonConfigFile {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub data_dir: Option<String>,
    pub key_file: Option<String>,
}

// ---------------------------------------------------------------------------
// Resolved config (all defaults applied)
// ---------------------------------------------------------------------------

/// Fully resolved daemon configuration with all defaults applied.
pub struct DaemonConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    /// Explicit key file path; defaults to `<data_dir>/secret.key`
    /// when unset (see [`DaemonConfig::key_file`]).
    key_file_override: Option<PathBuf>,
}

impl DaemonConfig {
    /// Build config purely from CLI args with defaults.
    pub fn from_cli(cli: &CliArgs) -> Self {
        Self {
            host: cli.host.clone().unwrap_or_else(|| "127.0.0.1".into()),
            port: cli.port.unwrap_or(8080),
            data_dir: cli.data_dir.clone().unwrap_or_else(default_data_dir),
            key_file_override: cli.key_file.clone(),
        }
    }

    /// Load config from a JSON file.
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config file: {e}"))?;

        let file: DaemonConfigFile =
            serde_json::from_str(&text).map_err(|e| format!("invalid config JSON: {e}"))?;

        Ok(Self {
            host: file.host.unwrap_or_else(|| "127.0.0.1".into()),
            port: file.port.unwrap_or(8080),
            data_dir: file
                .data_dir
                .map(PathBuf::from)
                .unwrap_or_else(default_data_dir),
            key_file_override: file.key_file.map(PathBuf::from),
        })
    }

    /// Merge CLI overrides onto a config-file base.
    pub fn merge_cli(mut self, cli: &CliArgs) -> Self {
        if let Some(ref host) = cli.host {
            self.host = host.clone();
        }
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(ref dir) = cli.data_dir {
            self.data_dir = dir.clone();
        }
        if cli.key_file.is_some() {
            self.key_file_override = cli.key_file.clone();
        }
        self
    }

    /// The shared-secret key file: the explicit path if one was
    /// given, otherwise `<data_dir>/secret.key`.
    pub fn key_file(&self) -> PathBuf {
        self.key_file_override
            .clone()
            .unwrap_or_else(|| self.data_dir.join("secret.key"))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Platform-specific default data directory.
fn default_data_dir() -> PathBuf {
    if cfg!(target_os = "linux") {
        if let Some(home) = dirs::home_dir() {
            return home.join(".kithnet");
        }
    }
    if let Some(data) = dirs::data_dir() {
        return data.join("Kithnet");
    }
    PathBuf::from("kithnet-data")
}

fn print_help() {
    println!(
        r#"Kithnet Daemon - networked social-graph service

USAGE:
    kithnet-daemon [OPTIONS]

OPTIONS:
    --host <HOST>        Bind host (default: 127.0.0.1)
    --port <PORT>        Bind port (default: 8080)
    --data-dir <PATH>    Data directory (default: platform-specific)
    --key-file <PATH>    Shared-secret key file (default: <data-dir>/secret.key)
    --config <PATH>      Load settings from JSON config file
    -h, --help           Show this help

EXAMPLES:
    # First run: generates the key file, listens on localhost
    kithnet-daemon

    # Listen on all interfaces with an explicit key
    kithnet-daemon --host 0.0.0.0 --port 8080 --key-file /etc/kithnet/secret.key

    # Use config file
    kithnet-daemon --config /etc/kithnet/daemon.json

ENVIRONMENT:
    RUST_LOG             Log level filter (default: info)
"#
    );
}
