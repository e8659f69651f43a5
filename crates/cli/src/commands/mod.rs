pub mod ask;
pub mod chat;
pub mod doctor;
pub mod onboard;

use cnbchat_config::AppConfig;

/// Load the configuration, warning up front when no token is set.
pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    if !config.has_token() {
        eprintln!();
        eprintln!("  WARNING: No CNB token configured, every question will fail.");
        eprintln!("  Set $CNB_TOKEN or add `token` to {}", config_path().display());
        eprintln!();
    }

    Ok(config)
}

pub(crate) fn config_path() -> std::path::PathBuf {
    AppConfig::config_dir().join("config.toml")
}
