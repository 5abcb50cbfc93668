//! Layered runtime configuration.
//!
//! Built-in defaults, then an optional TOML file, then `FASHION_LENS__*`
//! environment variables (`__` separates sections, e.g.
//! `FASHION_LENS__SERVICE__BASE_URL`).

use std::path::Path;
use std::time::Duration;

use config::{Config, Environment, File};
use fashion_lens_capture::{FacingMode, StreamConstraints};
use fashion_lens_core::MAX_UPLOAD_BYTES;
use serde::Deserialize;
use thiserror::Error;

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "fashion-lens.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "FASHION_LENS";

/// Complete application settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AppConfig {
    /// Remote service settings.
    pub service: ServiceConfig,
    /// Upload gate settings.
    pub upload: UploadConfig,
    /// Camera acquisition settings.
    pub camera: CameraConfig,
    /// Logging settings.
    pub log: LogConfig,
}

/// Remote service settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the recommendation service.
    pub base_url: String,
    /// Per-request deadline in seconds.
    pub timeout_secs: u64,
}

impl ServiceConfig {
    /// Request deadline.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Upload gate settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadConfig {
    /// Size ceiling in bytes.
    pub max_bytes: u64,
}

/// Preferred camera in config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Facing {
    /// Front camera.
    User,
    /// Rear camera.
    Environment,
}

/// Camera acquisition settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CameraConfig {
    /// Ideal frame width.
    pub ideal_width: u32,
    /// Ideal frame height.
    pub ideal_height: u32,
    /// Preferred camera.
    pub facing: Facing,
    /// JPEG quality for stills, `1..=100`.
    pub jpeg_quality: u8,
}

impl CameraConfig {
    /// Acquisition hints for the capture controller.
    pub fn constraints(&self) -> StreamConstraints {
        StreamConstraints {
            facing: match self.facing {
                Facing::User => FacingMode::User,
                Facing::Environment => FacingMode::Environment,
            },
            ideal_width: self.ideal_width,
            ideal_height: self.ideal_height,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LogConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub level: String,
}

impl AppConfig {
    /// Loads settings from defaults, `file` (or [`DEFAULT_CONFIG_FILE`] when it
    /// exists), and the environment.
    ///
    /// # Errors
    /// Returns [`SettingsError::Load`] when a source cannot be read or
    /// deserialized and [`SettingsError::Invalid`] when values are out of range.
    pub fn load(file: Option<&Path>) -> Result<Self, SettingsError> {
        let builder = Config::builder()
            .set_default("service.base_url", "http://localhost:5000")?
            .set_default("service.timeout_secs", 60_i64)?
            .set_default("upload.max_bytes", MAX_UPLOAD_BYTES as i64)?
            .set_default("camera.ideal_width", 1280_i64)?
            .set_default("camera.ideal_height", 720_i64)?
            .set_default("camera.facing", "user")?
            .set_default("camera.jpeg_quality", 95_i64)?
            .set_default("log.level", "info")?;

        let builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name(DEFAULT_CONFIG_FILE).required(false)),
        };

        let settings: Self = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    /// Returns [`SettingsError::Invalid`] for the first out-of-range value.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.service.timeout_secs == 0 {
            return Err(SettingsError::Invalid(
                "service.timeout_secs must be greater than zero".to_string(),
            ));
        }
        if self.upload.max_bytes == 0 {
            return Err(SettingsError::Invalid(
                "upload.max_bytes must be greater than zero".to_string(),
            ));
        }
        if !(1..=100).contains(&self.camera.jpeg_quality) {
            return Err(SettingsError::Invalid(
                "camera.jpeg_quality must be within 1..=100".to_string(),
            ));
        }
        if self.camera.ideal_width == 0 || self.camera.ideal_height == 0 {
            return Err(SettingsError::Invalid(
                "camera ideal dimensions must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// A source failed to load or deserialize.
    #[error("config load failure: {0}")]
    Load(#[from] config::ConfigError),
    /// A value is out of range.
    #[error("invalid config: {0}")]
    Invalid(String),
}
