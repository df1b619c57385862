//! `controller.toml` handling.
//!
//! The file lives in the platform config directory unless `--config` names
//! another one:
//!
//! - Linux: `~/.config/gsc/controller.toml`
//! - macOS: `~/Library/Application Support/org.gsc.gsc/controller.toml`
//! - Windows: `%APPDATA%\gsc\gsc\config\controller.toml`
//!
//! Every section and key is optional; missing values take their defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gsc_core::client::DEFAULT_DEVICE_NAME;

const CONFIG_FILE_NAME: &str = "controller.toml";
const OUTPUT_FORMATS: [&str; 3] = ["table", "json", "quiet"];
const LOG_LEVELS: [&str; 5] = ["error", "warn", "info", "debug", "trace"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("cannot write config: {0}")]
    Write(#[from] std::io::Error),

    #[error("cannot serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub identity: IdentityConfig,
    pub client: ClientConfig,
    pub transport: TransportConfig,
    pub server: ServerConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Where `uniqueid.dat`, `client.pem` and `key.pem` live. Unset or empty
    /// means the platform data directory.
    pub key_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Shown in the host's list of paired devices
    pub device_name: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device_name: DEFAULT_DEVICE_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub timeout_seconds: u64,
    /// Used while pairing; the host answers the first round only after the
    /// PIN has been typed in.
    pub pair_timeout_seconds: u64,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 10,
            pair_timeout_seconds: 120,
        }
    }
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn pair_timeout(&self) -> Duration {
        Duration::from_secs(self.pair_timeout_seconds)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Skip the host version gate and the exact display-mode check
    pub allow_unsupported: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// One of `table`, `json`, `quiet`
    pub format: String,
    pub verbose: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: "table".to_string(),
            verbose: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` level filter
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Read and validate `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read `custom_path`, or the default file when it exists, or fall back
    /// to built-in defaults.
    pub fn load_from(custom_path: Option<&Path>) -> Result<Self, ConfigError> {
        match custom_path {
            Some(path) => Self::load(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn project_dirs() -> Option<ProjectDirs> {
        ProjectDirs::from("org", "gsc", "gsc")
    }

    pub fn default_path() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Default home of the client credentials.
    pub fn data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
    }

    /// Directory holding the client identity and certificate.
    pub fn key_dir(&self) -> Result<PathBuf, ConfigError> {
        match &self.identity.key_dir {
            Some(dir) if !dir.as_os_str().is_empty() => Ok(dir.clone()),
            _ => Self::data_dir().ok_or_else(|| {
                ConfigError::Invalid("no home directory found; set identity.key_dir".to_string())
            }),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        write_creating_parent(path, &text)
    }

    /// Write the commented sample to the default location on first run.
    /// Returns whether a file was created.
    pub fn create_default_if_missing() -> Result<bool, ConfigError> {
        match Self::default_path() {
            Some(path) if !path.exists() => {
                write_creating_parent(&path, Self::sample_toml())?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !OUTPUT_FORMATS.contains(&self.output.format.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "output.format must be one of {OUTPUT_FORMATS:?}, got '{}'",
                self.output.format
            )));
        }
        if !LOG_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {LOG_LEVELS:?}, got '{}'",
                self.logging.level
            )));
        }
        if self.transport.timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "transport.timeout_seconds must be positive".to_string(),
            ));
        }
        if self.transport.pair_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "transport.pair_timeout_seconds must be positive".to_string(),
            ));
        }
        if self.client.device_name.trim().is_empty() {
            return Err(ConfigError::Invalid("client.device_name is empty".to_string()));
        }
        Ok(())
    }

    pub fn sample_toml() -> &'static str {
        r#"# gsc-controller configuration

[identity]
# Where uniqueid.dat, client.pem and key.pem are kept.
# Leave unset to use the platform data directory.
# key_dir = "/path/to/keys"

[client]
# Shown in the host's list of paired devices
device_name = "roth"

[transport]
timeout_seconds = 10
# The host holds the first pairing request until the PIN is typed in
pair_timeout_seconds = 120

[server]
# Talk to hosts outside the supported version range and request
# display modes the host does not list
allow_unsupported = false

[output]
# table | json | quiet
format = "table"
verbose = false

[logging]
# error | warn | info | debug | trace
level = "warn"
"#
    }
}

fn write_creating_parent(path: &Path, contents: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}

/// Values given on the command line. Each `Some` replaces the file value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub output_format: Option<String>,
    pub verbose: Option<bool>,
    pub debug: Option<bool>,
    pub key_dir: Option<PathBuf>,
    pub device_name: Option<String>,
    pub timeout_seconds: Option<u64>,
    pub allow_unsupported: Option<bool>,
}

impl Config {
    pub fn with_overrides(mut self, overrides: &CliOverrides) -> Self {
        if let Some(format) = &overrides.output_format {
            self.output.format = format.clone();
        }
        if let Some(verbose) = overrides.verbose {
            self.output.verbose = verbose;
        }
        if overrides.debug == Some(true) {
            self.logging.level = "debug".to_string();
        }
        if let Some(dir) = &overrides.key_dir {
            self.identity.key_dir = Some(dir.clone());
        }
        if let Some(name) = &overrides.device_name {
            self.client.device_name = name.clone();
        }
        if let Some(timeout) = overrides.timeout_seconds {
            self.transport.timeout_seconds = timeout;
        }
        if let Some(allow) = overrides.allow_unsupported {
            self.server.allow_unsupported = allow;
        }
        self
    }
}
