use crate::audio::SinkParams;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default = "default_music_dir")]
    pub music_dir: PathBuf,

    #[serde(default = "default_alarm_dir")]
    pub alarm_dir: PathBuf,

    #[serde(default = "default_socket_path")]
    pub socket_path: PathBuf,

    #[serde(default)]
    pub output_device: Option<String>,

    #[serde(default = "default_period_frames")]
    pub period_frames: usize,

    #[serde(default = "default_strip_driver")]
    pub strip_driver: String,

    #[serde(default = "default_spi_device")]
    pub spi_device: PathBuf,

    #[serde(default = "default_pixel_count")]
    pub pixel_count: usize,
}

fn default_music_dir() -> PathBuf {
    PathBuf::from("./SleepMusic")
}

fn default_alarm_dir() -> PathBuf {
    PathBuf::from("./Alarm")
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("/tmp/bedside.sock")
}

fn default_period_frames() -> usize {
    SinkParams::DEFAULT_PERIOD_FRAMES
}

fn default_strip_driver() -> String {
    "spi".to_string()
}

fn default_spi_device() -> PathBuf {
    PathBuf::from("/dev/spidev0.0")
}

fn default_pixel_count() -> usize {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            music_dir: default_music_dir(),
            alarm_dir: default_alarm_dir(),
            socket_path: default_socket_path(),
            output_device: None,
            period_frames: default_period_frames(),
            strip_driver: default_strip_driver(),
            spi_device: default_spi_device(),
            pixel_count: default_pixel_count(),
        }
    }
}

impl Config {
    /// Load configuration from `path`, or from ~/.config/bedside/config.json.
    /// A missing file is created with defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(path) => path.to_path_buf(),
            None => Self::config_path()?,
        };

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save(&config_path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config: Self = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    pub fn save(&self, config_path: &Path) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("bedside").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.music_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("music_dir cannot be empty"));
        }

        if self.alarm_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("alarm_dir cannot be empty"));
        }

        if self.socket_path.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("socket_path cannot be empty"));
        }

        if !(32..=8192).contains(&self.period_frames) {
            return Err(anyhow::anyhow!("period_frames must be between 32 and 8192"));
        }

        if self.pixel_count == 0 {
            return Err(anyhow::anyhow!("pixel_count must be at least 1"));
        }

        if !["spi", "log"].contains(&self.strip_driver.as_str()) {
            return Err(anyhow::anyhow!("strip_driver must be one of: spi, log"));
        }

        if self.strip_driver == "spi" && !cfg!(target_os = "linux") {
            return Err(anyhow::anyhow!("strip_driver spi is only available on Linux"));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = Config::default();
        assert_eq!(config.period_frames, 320);
        assert_eq!(config.music_dir, PathBuf::from("./SleepMusic"));
        assert_eq!(config.alarm_dir, PathBuf::from("./Alarm"));
        if cfg!(target_os = "linux") {
            config.validate().unwrap();
        }
    }

    #[test]
    fn test_partial_json_gets_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"strip_driver": "log", "pixel_count": 8}"#).unwrap();
        assert_eq!(config.strip_driver, "log");
        assert_eq!(config.pixel_count, 8);
        assert_eq!(config.socket_path, PathBuf::from("/tmp/bedside.sock"));
        assert_eq!(config.output_device, None);
        config.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let log_driver = || Config {
            strip_driver: "log".to_string(),
            ..Config::default()
        };

        let mut config = log_driver();
        config.period_frames = 16;
        assert!(config.validate().is_err());

        let mut config = log_driver();
        config.pixel_count = 0;
        assert!(config.validate().is_err());

        let mut config = log_driver();
        config.strip_driver = "dmx".to_string();
        assert!(config.validate().is_err());

        let mut config = log_driver();
        config.music_dir = PathBuf::new();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_file_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");

        let config = Config::load(Some(&path)).unwrap();
        assert!(path.exists());
        assert_eq!(config.pixel_count, 30);

        let reloaded = Config::load(Some(&path)).unwrap();
        assert_eq!(reloaded.spi_device, config.spi_device);
    }
}
