use garde::Validate;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Daemon configuration, read once from `ASTFAX_`-prefixed environment variables.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AppConfig {
    /// MySQL connection string
    #[garde(length(min = 1))]
    pub database_url: String,

    /// Name of this server in `iaxfriends`; only its jobs are picked up.
    #[garde(length(min = 1, max = 80))]
    pub server_name: String,

    /// Directory watched by Asterisk for new call files
    #[serde(default = "default_spool_outgoing_dir", rename = "spool_out_dir")]
    #[garde(skip)]
    pub spool_outgoing_dir: PathBuf,

    /// Reserved for incoming faxes; only created, never read.
    #[serde(default = "default_fax_in_dir")]
    #[garde(skip)]
    pub fax_in_dir: PathBuf,

    /// Staging area for PDFs, TIFFs and call files
    #[serde(default = "default_fax_out_dir")]
    #[garde(skip)]
    pub fax_out_dir: PathBuf,

    /// Ghostscript executable
    #[serde(default = "default_gs_binary")]
    #[garde(length(min = 1))]
    pub gs_binary: String,

    /// Whitespace-separated Ghostscript flags placed before the output/input arguments
    #[serde(default = "default_gs_args")]
    #[garde(skip)]
    pub gs_args: String,

    /// Owner applied to call files before they are spooled
    #[serde(default, rename = "ast_uid")]
    #[garde(skip)]
    pub asterisk_uid: u32,

    #[serde(default, rename = "ast_gid")]
    #[garde(skip)]
    pub asterisk_gid: u32,

    #[serde(default = "default_interval_secs")]
    #[garde(range(min = 1, max = 3600))]
    pub poll_interval_secs: u64,

    #[serde(default = "default_interval_secs")]
    #[garde(range(min = 1, max = 3600))]
    pub heartbeat_interval_secs: u64,

    /// How long converted TIFFs stay in staging before the poll loop removes them.
    /// Must cover every dial attempt Asterisk makes for a call file.
    #[serde(default = "default_tiff_retention_secs")]
    #[garde(range(min = 3600))]
    pub tiff_retention_secs: u64,

    #[serde(default = "default_db_max_connections")]
    #[garde(range(min = 1, max = 32))]
    pub db_max_connections: u32,

    /// Prometheus listener address (e.g., "0.0.0.0:9100"). Disabled when unset.
    #[serde(default)]
    #[garde(skip)]
    pub metrics_addr: Option<String>,
}

fn default_spool_outgoing_dir() -> PathBuf {
    PathBuf::from("/var/spool/asterisk/outgoing/")
}

fn default_fax_in_dir() -> PathBuf {
    PathBuf::from("/var/spool/asterisk/fax/incoming/")
}

fn default_fax_out_dir() -> PathBuf {
    PathBuf::from("/var/spool/asterisk/fax/outgoing/")
}

fn default_gs_binary() -> String {
    "gs".to_string()
}

fn default_gs_args() -> String {
    "-q -dNOPAUSE -dBATCH -sDEVICE=tiffg4 -sPAPERSIZE=letter".to_string()
}

fn default_interval_secs() -> u64 {
    10
}

fn default_tiff_retention_secs() -> u64 {
    7 * 24 * 3600
}

fn default_db_max_connections() -> u32 {
    2
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: AppConfig = envy::prefixed("ASTFAX_").from_env()?;
        config.validate().map_err(ConfigError::Invalid)?;
        Ok(config)
    }

    pub fn gs_arguments(&self) -> Vec<String> {
        self.gs_args.split_whitespace().map(str::to_string).collect()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_secs(self.heartbeat_interval_secs)
    }

    pub fn tiff_retention(&self) -> Duration {
        Duration::from_secs(self.tiff_retention_secs)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(garde::Report),
}
