//! `cnbchat doctor`: diagnose configuration problems.

use cnbchat_config::AppConfig;

use super::config_path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    println!("🩺 cnbchat Doctor: Configuration Check");
    println!("======================================\n");

    let mut issues = 0;

    let config_path = config_path();
    if config_path.exists() {
        println!("  ✅ Config file found: {}", config_path.display());
    } else {
        println!("  ⚠️  No config file, using defaults. Run `cnbchat onboard` to create one");
    }

    match AppConfig::load() {
        Ok(config) => {
            println!("  ✅ Config valid");

            if config.has_token() {
                println!("  ✅ Token configured");
            } else {
                println!("  ❌ No token: set CNB_TOKEN or add `token` to config.toml");
                issues += 1;
            }

            if config.repository.trim().is_empty() {
                println!("  ❌ No default repository: questions must name one");
                issues += 1;
            } else {
                println!("  ✅ Default repository: {}", config.repository);
            }

            println!("  ✅ API endpoint: {}", config.api_base_url);
            println!("  ✅ Model: {}", config.model);
        }
        Err(e) => {
            println!("  ❌ Config invalid: {e}");
            issues += 1;
        }
    }

    println!();
    if issues == 0 {
        println!("  🎉 All checks passed!");
    } else {
        println!("  ⚠️  {issues} issue(s) found. See above for details.");
    }

    Ok(())
}
