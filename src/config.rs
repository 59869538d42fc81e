//! Configuration resolution for oleoscan
//!
//! Data directory and port follow a 3-tier priority order:
//! 1. Command-line argument / environment variable (clap handles both)
//! 2. TOML config file (`<config-dir>/oleoscan/config.toml`)
//! 3. OS-dependent compiled default

use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Default number of rows returned by the sample-history endpoint.
pub const DEFAULT_HISTORY_LIMIT: u32 = 5;

/// Recalibration triggers when overall enhanced accuracy drops below this.
pub const DEFAULT_ACCURACY_THRESHOLD: f64 = 95.0;

const DEFAULT_PORT: u16 = 3000;

/// Command-line interface
#[derive(Parser, Debug, Default)]
#[command(name = "oleoscan", about = "Oilseed composition scan service")]
pub struct Cli {
    /// Data directory (database, uploads, model and calibration files)
    #[arg(long, env = "OLEOSCAN_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// HTTP listen port
    #[arg(long, env = "OLEOSCAN_PORT")]
    pub port: Option<u16>,

    /// Maximum rows returned by the sample-history endpoint
    #[arg(long, env = "OLEOSCAN_HISTORY_LIMIT")]
    pub history_limit: Option<u32>,
}

/// File-level settings, all optional
#[derive(Debug, Default, serde::Deserialize)]
struct TomlConfig {
    data_dir: Option<PathBuf>,
    port: Option<u16>,
    history_limit: Option<u32>,
}

/// Resolved application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub uploads_dir: PathBuf,
    pub db_path: PathBuf,
    pub model_path: PathBuf,
    pub calibration_log_path: PathBuf,
    pub history_limit: u32,
    pub accuracy_threshold: f64,
}

impl Config {
    /// Resolve configuration from CLI/env, config file, and defaults
    pub fn resolve(cli: &Cli) -> Config {
        let file = load_config_file().unwrap_or_default();

        let data_dir = cli
            .data_dir
            .clone()
            .or(file.data_dir)
            .unwrap_or_else(default_data_dir);

        let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);
        let history_limit = cli
            .history_limit
            .or(file.history_limit)
            .unwrap_or(DEFAULT_HISTORY_LIMIT);

        let mut config = Config::for_data_dir(data_dir);
        config.bind_addr = SocketAddr::from(([127, 0, 0, 1], port));
        config.history_limit = history_limit;
        config
    }

    /// Build a configuration rooted at `data_dir` with default port and limits.
    /// All derived paths live under the data directory.
    pub fn for_data_dir(data_dir: PathBuf) -> Config {
        Config {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            uploads_dir: data_dir.join("uploads"),
            db_path: data_dir.join("oleoscan.db"),
            model_path: data_dir.join("model.json"),
            calibration_log_path: data_dir.join("calibration_log.jsonl"),
            data_dir,
            history_limit: DEFAULT_HISTORY_LIMIT,
            accuracy_threshold: DEFAULT_ACCURACY_THRESHOLD,
        }
    }

    /// Create the data and uploads directories if they do not exist
    pub fn ensure_directories(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)
            .with_context(|| format!("Failed to create data dir {}", self.data_dir.display()))?;
        std::fs::create_dir_all(&self.uploads_dir)
            .with_context(|| format!("Failed to create uploads dir {}", self.uploads_dir.display()))?;
        Ok(())
    }
}

/// Parse `<config-dir>/oleoscan/config.toml` if present
fn load_config_file() -> Option<TomlConfig> {
    let path = dirs::config_dir()?.join("oleoscan").join("config.toml");
    parse_config_file(&path)
}

fn parse_config_file(path: &Path) -> Option<TomlConfig> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str::<TomlConfig>(&content) {
        Ok(config) => Some(config),
        Err(e) => {
            tracing::warn!("Ignoring malformed config file {}: {}", path.display(), e);
            None
        }
    }
}

/// OS-dependent default data directory
fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("oleoscan"))
        .unwrap_or_else(|| PathBuf::from("./oleoscan_data"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derived_paths_live_under_data_dir() {
        let config = Config::for_data_dir(PathBuf::from("/tmp/oleo"));
        assert_eq!(config.uploads_dir, PathBuf::from("/tmp/oleo/uploads"));
        assert_eq!(config.db_path, PathBuf::from("/tmp/oleo/oleoscan.db"));
        assert_eq!(config.model_path, PathBuf::from("/tmp/oleo/model.json"));
        assert_eq!(
            config.calibration_log_path,
            PathBuf::from("/tmp/oleo/calibration_log.jsonl")
        );
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn cli_overrides_win_over_defaults() {
        let cli = Cli {
            data_dir: Some(PathBuf::from("/tmp/oleo-cli")),
            port: Some(4100),
            history_limit: Some(3),
        };
        let config = Config::resolve(&cli);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/oleo-cli"));
        assert_eq!(config.bind_addr.port(), 4100);
        assert_eq!(config.history_limit, 3);
    }

    #[test]
    fn malformed_config_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "data_dir = [not toml").unwrap();
        assert!(parse_config_file(&path).is_none());
    }
}
