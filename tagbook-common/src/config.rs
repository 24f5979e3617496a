//! Bootstrap configuration for the tagbook reader
//!
//! Everything the device needs before it can talk to the audio daemon lives in
//! a single TOML file. Missing files and missing keys never stop startup: each
//! field has a built-in default and a missing file logs a warning and falls
//! back to [`TomlConfig::default`].
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--config`, `--database`, `--daemon-host`, ...)
//! 2. Environment variables (`TAGBOOK_CONFIG` and the clap `env` bindings)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "TAGBOOK_CONFIG";

/// Bootstrap configuration loaded from TOML file
///
/// These settings cannot change during runtime. The reader must restart
/// to pick up changes to the TOML file.
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// Path to SQLite database file holding listening progress
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Root of the sysfs GPIO tree used by buttons and the status light
    #[serde(default = "default_gpio_root")]
    pub gpio_root: PathBuf,

    /// Audio daemon connection
    #[serde(default)]
    pub daemon: DaemonConfig,

    /// RFID serial reader
    #[serde(default)]
    pub rfid: RfidConfig,

    /// Hardware buttons
    #[serde(default)]
    pub buttons: ButtonsConfig,

    /// Status light output
    #[serde(default)]
    pub status_light: StatusLightConfig,

    /// Playback tuning constants
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Audio daemon (MPD) connection settings
#[derive(Debug, Clone, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_daemon_host")]
    pub host: String,

    #[serde(default = "default_daemon_port")]
    pub port: u16,

    /// Upper bound for any single request/response exchange
    #[serde(default = "default_daemon_timeout_ms")]
    pub timeout_ms: u64,

    /// Volume applied on first start, before any volume was saved
    #[serde(default = "default_initial_volume")]
    pub initial_volume: u8,
}

/// RFID reader settings
#[derive(Debug, Clone, Deserialize)]
pub struct RfidConfig {
    /// Serial device the reader is attached to
    #[serde(default = "default_rfid_device")]
    pub device: PathBuf,

    /// Line speed; the port is opened raw, 8N1
    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    /// Number of bytes in one tag frame
    #[serde(default = "default_frame_length")]
    pub frame_length: usize,

    /// How long one read waits for a frame before reporting "no tag"
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

/// Button wiring and debounce settings
#[derive(Debug, Clone, Deserialize)]
pub struct ButtonsConfig {
    /// Minimum time between two accepted presses of the same button
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Sampling period for the button input pins
    #[serde(default = "default_button_poll_ms")]
    pub poll_interval_ms: u64,

    #[serde(default = "default_button_pins")]
    pub pins: Vec<ButtonPin>,
}

/// One input pin and the action it triggers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ButtonPin {
    pub pin: u32,
    /// One of `rewind`, `toggle_pause`, `volume_up`, `volume_down`
    pub action: String,
}

/// Status light output settings
#[derive(Debug, Clone, Deserialize)]
pub struct StatusLightConfig {
    /// Output pin; when absent the light is only logged
    #[serde(default = "default_status_light_pin")]
    pub pin: Option<u32>,
}

/// Playback tuning
#[derive(Debug, Clone, Deserialize)]
pub struct PlaybackConfig {
    /// Delay between two poll-loop cycles
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How far one rewind press jumps back
    #[serde(default = "default_rewind_seconds")]
    pub rewind_seconds: f64,

    /// A stopped book whose last part has less than this left is finished
    #[serde(default = "default_finish_tolerance_seconds")]
    pub finish_tolerance_seconds: f64,

    /// Volume change per button press, in percent
    #[serde(default = "default_volume_step")]
    pub volume_step: u8,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("tagbook"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/tagbook"))
        .join("state.db")
}

fn default_gpio_root() -> PathBuf {
    PathBuf::from("/sys/class/gpio")
}

fn default_daemon_host() -> String {
    "localhost".to_string()
}

fn default_daemon_port() -> u16 {
    6600
}

fn default_daemon_timeout_ms() -> u64 {
    5000
}

fn default_initial_volume() -> u8 {
    100
}

fn default_rfid_device() -> PathBuf {
    PathBuf::from("/dev/ttyAMA0")
}

fn default_baud_rate() -> u32 {
    9600
}

fn default_frame_length() -> usize {
    14
}

fn default_read_timeout_ms() -> u64 {
    1000
}

fn default_debounce_ms() -> u64 {
    200
}

fn default_button_poll_ms() -> u64 {
    20
}

fn default_button_pins() -> Vec<ButtonPin> {
    [(9, "rewind"), (11, "toggle_pause"), (22, "volume_down"), (10, "volume_up")]
        .into_iter()
        .map(|(pin, action)| ButtonPin {
            pin,
            action: action.to_string(),
        })
        .collect()
}

fn default_status_light_pin() -> Option<u32> {
    Some(23)
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_rewind_seconds() -> f64 {
    20.0
}

fn default_finish_tolerance_seconds() -> f64 {
    20.0
}

fn default_volume_step() -> u8 {
    10
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            host: default_daemon_host(),
            port: default_daemon_port(),
            timeout_ms: default_daemon_timeout_ms(),
            initial_volume: default_initial_volume(),
        }
    }
}

impl Default for RfidConfig {
    fn default() -> Self {
        Self {
            device: default_rfid_device(),
            baud_rate: default_baud_rate(),
            frame_length: default_frame_length(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl Default for ButtonsConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_button_poll_ms(),
            pins: default_button_pins(),
        }
    }
}

impl Default for StatusLightConfig {
    fn default() -> Self {
        Self {
            pin: default_status_light_pin(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            rewind_seconds: default_rewind_seconds(),
            finish_tolerance_seconds: default_finish_tolerance_seconds(),
            volume_step: default_volume_step(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            gpio_root: default_gpio_root(),
            daemon: DaemonConfig::default(),
            rfid: RfidConfig::default(),
            buttons: ButtonsConfig::default(),
            status_light: StatusLightConfig::default(),
            playback: PlaybackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse configuration from TOML text and validate it
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read, cannot be parsed, or holds
    /// out-of-range values.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }

    /// Load configuration, degrading to built-in defaults
    ///
    /// A missing file is expected on a fresh device and only warns. A file
    /// that exists but is broken is reported as an error so a typo does not
    /// silently reset the wiring.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) if path.exists() => Self::load(path),
            Some(path) => {
                warn!(
                    "Config file {} not found, using built-in defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            None => {
                warn!("No config file found, using built-in defaults");
                Ok(Self::default())
            }
        }
    }

    /// Check value ranges that serde cannot express
    pub fn validate(&self) -> Result<()> {
        if self.daemon.initial_volume > 100 {
            return Err(Error::Config(format!(
                "daemon.initial_volume must be 0-100, got {}",
                self.daemon.initial_volume
            )));
        }
        if self.daemon.timeout_ms == 0 {
            return Err(Error::Config("daemon.timeout_ms must be positive".to_string()));
        }
        if self.rfid.baud_rate == 0 {
            return Err(Error::Config("rfid.baud_rate must be greater than 0".to_string()));
        }
        // STX + 10 data chars + 2 checksum chars
        if self.rfid.frame_length < 13 {
            return Err(Error::Config(format!(
                "rfid.frame_length must be at least 13, got {}",
                self.rfid.frame_length
            )));
        }
        if !(self.playback.rewind_seconds > 0.0) {
            return Err(Error::Config("playback.rewind_seconds must be positive".to_string()));
        }
        if self.playback.finish_tolerance_seconds < 0.0 {
            return Err(Error::Config(
                "playback.finish_tolerance_seconds must not be negative".to_string(),
            ));
        }
        if self.playback.volume_step == 0 || self.playback.volume_step > 100 {
            return Err(Error::Config(format!(
                "playback.volume_step must be 1-100, got {}",
                self.playback.volume_step
            )));
        }
        Ok(())
    }

    /// Apply command-line overrides on top of the file values
    pub fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(path) = overrides.database_path {
            self.database_path = path;
        }
        if let Some(host) = overrides.daemon_host {
            self.daemon.host = host;
        }
        if let Some(port) = overrides.daemon_port {
            self.daemon.port = port;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }
}

impl DaemonConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl RfidConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

impl ButtonsConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl PlaybackConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub database_path: Option<PathBuf>,
    pub daemon_host: Option<String>,
    pub daemon_port: Option<u16>,
    pub log_level: Option<String>,
}

/// Find the config file to load
///
/// Priority: command-line argument, `TAGBOOK_CONFIG`, then the first existing
/// of `~/.config/tagbook/config.toml` and `/etc/tagbook/config.toml`. An
/// explicit path is returned even if it does not exist so the caller can warn
/// about it.
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    let user_config = dirs::config_dir().map(|d| d.join("tagbook").join("config.toml"));
    let system_config = PathBuf::from("/etc/tagbook/config.toml");

    user_config
        .into_iter()
        .chain(std::iter::once(system_config))
        .find(|path| path.exists())
}
