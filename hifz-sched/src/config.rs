//! Service configuration

use std::path::PathBuf;

use hifz_common::{config, Result};

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5730;

/// Resolved service configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_path: PathBuf,
}

impl Config {
    /// Resolve configuration: CLI argument (data dir), then environment,
    /// then the TOML config file, then compiled defaults.
    pub fn load(cli_data_dir: Option<&str>) -> Result<Self> {
        let data_dir = config::resolve_data_dir(cli_data_dir, "HIFZ_DATA_DIR")?;
        let port = config::resolve_port("HIFZ_PORT", DEFAULT_PORT);

        Ok(Config {
            port,
            db_path: data_dir.join("hifz.db"),
        })
    }
}
