//! Client settings: socket directory, config file, timeout and file mode.

use std::path::PathBuf;
use std::time::Duration;

/// Default per-call timeout when the caller supplies no deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Default permission for FRR configuration files.
pub const DEFAULT_FRR_CONFIG_MODE: u32 = 0o640;

/// Default FRR run directory holding the `*.vty` sockets.
pub const DEFAULT_RUN_DIR: &str = "/var/run/frr";

/// Default integrated FRR configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/frr/frr.conf";

/// Client configuration, optionally overridden from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VtyConfig {
    /// Directory containing `bgpd.vty`, `bfdd.vty`, `mgmtd.vty`, `zebra.vty`
    pub run_dir: PathBuf,
    /// Destination of configuration dumps
    pub config_path: PathBuf,
    /// Timeout for each command when no deadline is given
    pub timeout: Duration,
    /// Permission bits for dumped configuration
    pub config_mode: u32,
}

impl Default for VtyConfig {
    fn default() -> Self {
        Self {
            run_dir: PathBuf::from(DEFAULT_RUN_DIR),
            config_path: PathBuf::from(DEFAULT_CONFIG_PATH),
            timeout: DEFAULT_TIMEOUT,
            config_mode: DEFAULT_FRR_CONFIG_MODE,
        }
    }
}

impl VtyConfig {
    /// Load configuration from environment variables.
    ///
    /// All variables are optional:
    /// - `FRR_RUN_DIR`: socket directory (supports ~ for home directory)
    /// - `FRR_CONFIG_PATH`: dump destination (supports ~)
    /// - `FRR_VTY_TIMEOUT_MS`: per-command timeout in milliseconds
    /// - `FRR_CONFIG_MODE`: octal permission bits, e.g. `640`
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`VtyConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("FRR_RUN_DIR") {
            config.run_dir = expand_tilde(&dir);
        }
        if let Some(path) = lookup("FRR_CONFIG_PATH") {
            config.config_path = expand_tilde(&path);
        }
        if let Some(ms) = lookup("FRR_VTY_TIMEOUT_MS") {
            let ms: u64 = ms
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidTimeout(ms.clone()))?;
            if ms == 0 {
                return Err(ConfigError::InvalidTimeout(ms.to_string()));
            }
            config.timeout = Duration::from_millis(ms);
        }
        if let Some(mode) = lookup("FRR_CONFIG_MODE") {
            config.config_mode = parse_mode(&mode)?;
        }

        Ok(config)
    }
}

/// Parse octal permission bits (`640`, `0640` or `0o640`).
pub fn parse_mode(s: &str) -> Result<u32, ConfigError> {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix("0o").unwrap_or(trimmed);
    match u32::from_str_radix(digits, 8) {
        Ok(mode) if mode <= 0o7777 => Ok(mode),
        _ => Err(ConfigError::InvalidMode(s.to_string())),
    }
}

/// Expand ~ or ~/ prefix to the user's home directory.
fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("FRR_VTY_TIMEOUT_MS must be a positive number of milliseconds, got {0:?}")]
    InvalidTimeout(String),

    #[error("FRR_CONFIG_MODE must be octal permission bits, got {0:?}")]
    InvalidMode(String),
}
