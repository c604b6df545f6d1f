//! Service configuration
//!
//! Everything the overlay needs to know before it can run: where the
//! credential and log files live, the screen and overlay geometry, the
//! polling interval and the overlay opacity.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{CoreError, Result};

/// Directory name under the platform data directory
const DATA_DIR_NAME: &str = "authenticator";

/// Credential file name
const CREDENTIAL_FILE_NAME: &str = "passwords.json";

/// Log file name
const LOG_FILE_NAME: &str = "authenticator_svc.log";

/// The overlay width must be a multiple of this (tiled framebuffer layout)
pub const OVERLAY_WIDTH_ALIGNMENT: u16 = 64;

/// Authenticator configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticatorConfig {
    /// Path to the credential store
    pub credential_path: PathBuf,

    /// Path to the service log file
    pub log_path: PathBuf,

    /// Physical display width in pixels
    pub screen_width: u16,

    /// Physical display height in pixels
    pub screen_height: u16,

    /// Overlay width in pixels (multiple of 64)
    pub overlay_width: u16,

    /// Overlay height in pixels
    pub overlay_height: u16,

    /// Interval between two polling iterations (milliseconds)
    pub poll_interval_ms: u64,

    /// Opacity applied to bitmap blits (0.0 - 1.0)
    pub opacity: f32,
}

impl Default for AuthenticatorConfig {
    fn default() -> Self {
        let data_dir = Self::default_data_dir();
        Self {
            credential_path: data_dir.join(CREDENTIAL_FILE_NAME),
            log_path: data_dir.join(LOG_FILE_NAME),
            screen_width: 1920,
            screen_height: 1080,
            overlay_width: 1216,
            overlay_height: 720,
            poll_interval_ms: 50,
            opacity: 1.0,
        }
    }
}

impl AuthenticatorConfig {
    /// Default directory for the credential and log files
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(DATA_DIR_NAME)
    }

    /// Load configuration from file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration, falling back to defaults when the file is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        if !path.exists() {
            info!("No configuration at {:?}, using defaults", path);
            return Self::default();
        }

        Self::load(path).unwrap_or_else(|e| {
            warn!("Failed to load configuration {:?}: {}", path, e);
            Self::default()
        })
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Check the geometry and timing values
    pub fn validate(&self) -> Result<()> {
        if self.overlay_width == 0 || self.overlay_width % OVERLAY_WIDTH_ALIGNMENT != 0 {
            return Err(CoreError::Config(format!(
                "overlay width {} must be a non-zero multiple of {}",
                self.overlay_width, OVERLAY_WIDTH_ALIGNMENT
            )));
        }

        if self.overlay_height == 0 {
            return Err(CoreError::Config("overlay height must be non-zero".to_string()));
        }

        if self.overlay_width > self.screen_width || self.overlay_height > self.screen_height {
            return Err(CoreError::Config(format!(
                "overlay {}x{} does not fit on a {}x{} screen",
                self.overlay_width, self.overlay_height, self.screen_width, self.screen_height
            )));
        }

        if self.poll_interval_ms == 0 {
            return Err(CoreError::Config("poll interval must be non-zero".to_string()));
        }

        if !(0.0..=1.0).contains(&self.opacity) {
            return Err(CoreError::Config(format!(
                "opacity {} is outside 0.0-1.0",
                self.opacity
            )));
        }

        Ok(())
    }

    /// Create the directories holding the credential and log files
    pub fn ensure_directories(&self) -> Result<()> {
        for path in [&self.credential_path, &self.log_path] {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
        }
        Ok(())
    }

    /// Top-left position that centers the overlay on the screen
    pub fn centered(&self) -> (u16, u16) {
        (
            self.screen_width.saturating_sub(self.overlay_width) / 2,
            self.screen_height.saturating_sub(self.overlay_height) / 2,
        )
    }

    /// Polling interval as a duration
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = AuthenticatorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.overlay_width % OVERLAY_WIDTH_ALIGNMENT, 0);
        assert!(config.credential_path.ends_with("passwords.json"));
        assert_eq!(config.poll_interval(), Duration::from_millis(50));
    }

    #[test]
    fn test_centered_position() {
        let config = AuthenticatorConfig::default();
        assert_eq!(config.centered(), (352, 180));
    }

    #[rstest]
    #[case::width_not_aligned(1200, 720, 50, 1.0)]
    #[case::zero_width(0, 720, 50, 1.0)]
    #[case::zero_height(1216, 0, 50, 1.0)]
    #[case::too_wide(1984, 720, 50, 1.0)]
    #[case::zero_interval(1216, 720, 0, 1.0)]
    #[case::opacity_too_high(1216, 720, 50, 1.5)]
    fn test_invalid_config(
        #[case] overlay_width: u16,
        #[case] overlay_height: u16,
        #[case] poll_interval_ms: u64,
        #[case] opacity: f32,
    ) {
        let config = AuthenticatorConfig {
            overlay_width,
            overlay_height,
            poll_interval_ms,
            opacity,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(CoreError::Config(_))));
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("config").join("authenticator.json");

        let config = AuthenticatorConfig {
            credential_path: temp_dir.path().join("passwords.json"),
            overlay_width: 640,
            overlay_height: 360,
            ..Default::default()
        };
        config.save(&path).unwrap();

        let loaded = AuthenticatorConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("authenticator.json");
        std::fs::write(&path, r#"{ "poll_interval_ms": 100 }"#).unwrap();

        let loaded = AuthenticatorConfig::load(&path).unwrap();
        assert_eq!(loaded.poll_interval_ms, 100);
        assert_eq!(loaded.overlay_width, 1216);
    }

    #[test]
    fn test_load_or_default_on_invalid_file() {
        let temp_dir = tempdir().unwrap();
        let path = temp_dir.path().join("authenticator.json");
        std::fs::write(&path, r#"{ "overlay_width": 1000 }"#).unwrap();

        let loaded = AuthenticatorConfig::load_or_default(&path);
        assert_eq!(loaded.overlay_width, 1216);
    }
}
