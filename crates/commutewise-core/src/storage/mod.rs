mod config;

pub use config::{AnalysisConfig, Config, ModelSetting, ProfileConfig, ProxyConfig, WindowsConfig};

use std::path::PathBuf;

/// Returns `~/.config/commutewise[-dev]/` based on COMMUTEWISE_ENV.
///
/// Set COMMUTEWISE_ENV=dev to use development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> std::io::Result<PathBuf> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("COMMUTEWISE_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("commutewise-dev")
    } else {
        base_dir.join("commutewise")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}
