//! Application configuration management

use anyhow::{Context, Result, anyhow};
use engine::{CaptureSettings, DEFAULT_FREQUENCY_SECS, EngineConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub capture: CaptureToolSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Sliding-window width and compute period, seconds
    #[serde(default = "MonitorSettings::default_frequency")]
    pub frequency_secs: f64,
    /// Default log level, overridable from the command line
    #[serde(default = "MonitorSettings::default_log_level")]
    pub log_level: String,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            frequency_secs: Self::default_frequency(),
            log_level: Self::default_log_level(),
        }
    }
}

impl MonitorSettings {
    fn default_frequency() -> f64 {
        DEFAULT_FREQUENCY_SECS
    }

    fn default_log_level() -> String {
        "info".to_string()
    }
}

/// Paths of the external capture and decode tools
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureToolSettings {
    /// Capture tool executable (USBPcapCMD)
    #[serde(default = "CaptureToolSettings::default_capture_cmd")]
    pub capture_cmd: String,
    /// Decode tool executable (tshark)
    #[serde(default = "CaptureToolSettings::default_decode_cmd")]
    pub decode_cmd: String,
}

impl Default for CaptureToolSettings {
    fn default() -> Self {
        Self {
            capture_cmd: Self::default_capture_cmd(),
            decode_cmd: Self::default_decode_cmd(),
        }
    }
}

impl CaptureToolSettings {
    fn default_capture_cmd() -> String {
        CaptureSettings::default().capture_cmd
    }

    fn default_decode_cmd() -> String {
        CaptureSettings::default().decode_cmd
    }
}

impl AppConfig {
    /// Load configuration from the specified path
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p
        } else {
            // Try standard locations in order
            let candidates = vec![
                Self::default_path(),
                PathBuf::from("/etc/usbflow/config.toml"),
            ];

            candidates
                .into_iter()
                .find(|p| p.exists())
                .ok_or_else(|| anyhow!("No configuration file found, using defaults"))?
        };

        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let config: AppConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", config_path.display()))?;

        config.validate()?;

        tracing::info!("Loaded configuration from: {}", config_path.display());
        Ok(config)
    }

    /// Load configuration or return defaults if not found
    pub fn load_or_default() -> Self {
        match Self::load(None) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}, using defaults", e);
                Self::default()
            }
        }
    }

    /// Save configuration to the specified path
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        tracing::info!("Saved configuration to: {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbflow").join("config.toml")
        } else {
            PathBuf::from(".config/usbflow/config.toml")
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if !self.monitor.frequency_secs.is_finite() || self.monitor.frequency_secs <= 0.0 {
            return Err(anyhow!(
                "Invalid frequency {} seconds, must be a positive number",
                self.monitor.frequency_secs
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.monitor.log_level.as_str()) {
            return Err(anyhow!(
                "Invalid log level '{}', must be one of: {}",
                self.monitor.log_level,
                valid_levels.join(", ")
            ));
        }

        if self.capture.capture_cmd.trim().is_empty() {
            return Err(anyhow!("capture_cmd must not be empty"));
        }
        if self.capture.decode_cmd.trim().is_empty() {
            return Err(anyhow!("decode_cmd must not be empty"));
        }

        Ok(())
    }

    /// Translate into the engine's configuration, expanding `~` in tool paths
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            capture: CaptureSettings {
                capture_cmd: shellexpand::tilde(&self.capture.capture_cmd).into_owned(),
                decode_cmd: shellexpand::tilde(&self.capture.decode_cmd).into_owned(),
            },
            frequency_secs: self.monitor.frequency_secs,
        }
    }
}
