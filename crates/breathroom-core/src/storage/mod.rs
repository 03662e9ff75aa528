mod config;

pub use config::{AmbientConfig, Config, HapticsConfig, SessionConfig, SoundConfig};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Returns `~/.config/breathroom[-dev]/` based on BREATHROOM_ENV.
///
/// Set BREATHROOM_ENV=dev to use development data directory.
/// BREATHROOM_CONFIG_DIR overrides the location entirely.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("BREATHROOM_CONFIG_DIR") {
        Some(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("BREATHROOM_ENV").unwrap_or_else(|_| "production".to_string());

            if env == "dev" {
                base_dir.join("breathroom-dev")
            } else {
                base_dir.join("breathroom")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
