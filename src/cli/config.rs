//! Config command handler.

use anyhow::{Context, Result};

use querybridge::config::validate::{validate_config, DiagnosticLevel};
use querybridge::config::Config;

use super::ConfigAction;

/// Show or validate configuration.
pub(crate) async fn cmd_config(config: &Config, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let mut shown = config.clone();
            if shown.provider.api_key.is_some() {
                shown.provider.api_key = Some("<redacted>".to_string());
            }
            println!("{}", serde_json::to_string_pretty(&shown)?);
        }
        ConfigAction::Check => {
            let config_path = Config::path();
            println!("Config file: {}", config_path.display());

            if config_path.exists() {
                let content = std::fs::read_to_string(&config_path)
                    .context("Failed to read config file")?;

                let raw: serde_json::Value = match serde_json::from_str(&content) {
                    Ok(v) => v,
                    Err(e) => {
                        println!("[ERROR] Invalid JSON: {}", e);
                        return Ok(());
                    }
                };

                let diagnostics = validate_config(&raw);
                for diag in &diagnostics {
                    println!("{}", diag);
                }
                let errors = diagnostics
                    .iter()
                    .filter(|d| d.level == DiagnosticLevel::Error)
                    .count();
                let warnings = diagnostics
                    .iter()
                    .filter(|d| d.level == DiagnosticLevel::Warn)
                    .count();
                if errors > 0 || warnings > 0 {
                    println!("Found {} error(s), {} warning(s)", errors, warnings);
                }
            } else {
                println!("[OK] No config file found (using defaults)");
            }

            match config.validate() {
                Ok(()) => println!("\nConfiguration looks good!"),
                Err(e) => println!("[ERROR] {}", e),
            }
        }
        ConfigAction::Init { force } => {
            let config_path = Config::path();
            if config_path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    config_path.display()
                );
            }
            Config::default()
                .save_to_path(&config_path)
                .with_context(|| format!("Failed to write {}", config_path.display()))?;
            println!("Wrote default configuration to {}", config_path.display());
        }
    }
    Ok(())
}
