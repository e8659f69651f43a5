//! `cnbchat onboard`: first-time setup.

use cnbchat_config::AppConfig;

use super::config_path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_dir = AppConfig::config_dir();
    let config_path = config_path();

    println!("cnbchat: First-Time Setup");
    println!("=========================\n");

    if !config_dir.exists() {
        std::fs::create_dir_all(&config_dir)?;
        println!("✅ Created config directory: {}", config_dir.display());
    } else {
        println!("  Config directory exists: {}", config_dir.display());
    }

    if config_path.exists() {
        println!("\n⚠️  Config already exists at: {}", config_path.display());
        println!("   Edit it manually or delete and re-run onboard.\n");
        return Ok(());
    }

    std::fs::write(&config_path, AppConfig::default_toml())?;
    println!("✅ Created config.toml at: {}", config_path.display());
    println!("\n📝 Next steps:");
    println!("   1. Add `token = \"...\"` to {} (or export CNB_TOKEN)", config_path.display());
    println!("   2. Optionally change `repository` (default: cnb/docs)");
    println!("   3. Run: cnbchat chat\n");

    Ok(())
}
