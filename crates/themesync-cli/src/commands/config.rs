//! Config command handlers

use std::path::Path;

use anyhow::{Context, Result};

use themesync_core::Config;

use crate::output::{Output, OutputFormat};

/// Show current configuration
pub fn show(config_path: Option<&Path>, output: &Output) -> Result<()> {
    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    let token = config.access_token.as_deref().map(mask_token);

    match output.format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::json!({
                    "store": config.store,
                    "access_token": token,
                    "api_version": config.api_version,
                    "workers": config.worker_count(),
                    "max_attempts": config.max_attempts,
                    "retry_base_ms": config.retry_base_ms,
                    "retry_max_ms": config.retry_max_ms,
                    "development_theme_id": config.development_theme_id,
                    "log_file": config.log_file
                })
            );
        }
        OutputFormat::Quiet => {
            println!("{}", config.store.as_deref().unwrap_or_default());
        }
        OutputFormat::Human => {
            let effective_path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Config::config_file_path);
            let unset = || "(not set)".to_string();

            println!("Configuration:");
            println!(
                "  store:                {}",
                config.store.clone().unwrap_or_else(unset)
            );
            println!("  access_token:         {}", token.unwrap_or_else(unset));
            println!("  api_version:          {}", config.api_version);
            println!("  workers:              {}", config.worker_count());
            println!("  max_attempts:         {}", config.max_attempts);
            println!("  retry_base_ms:        {}", config.retry_base_ms);
            println!("  retry_max_ms:         {}", config.retry_max_ms);
            println!(
                "  development_theme_id: {}",
                config
                    .development_theme_id
                    .map(|id| id.to_string())
                    .unwrap_or_else(unset)
            );
            println!(
                "  log_file:             {}",
                config
                    .log_file
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(unset)
            );
            println!();
            println!("Config file: {}", effective_path.display());
        }
    }

    Ok(())
}

/// Set a configuration value
pub fn set(key: String, value: String, config_path: Option<&Path>, output: &Output) -> Result<()> {
    let mut config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;

    let value = if value == "none" { String::new() } else { value };
    config.set(&key, &value)?;

    // Save to the CLI-specified path or default
    let save_path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(Config::config_file_path);
    config
        .save_to_path(&save_path)
        .context("Failed to save configuration")?;

    let shown = if key == "access_token" {
        mask_token(&value)
    } else {
        value
    };
    output.success(&format!("Set {} = {}", key, shown));

    Ok(())
}

/// Keep only the last four characters of a secret
fn mask_token(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() <= 4 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_mask_token() {
        assert_eq!(mask_token("shpat_0123456789"), "****6789");
        assert_eq!(mask_token("abc"), "****");
    }

    #[test]
    fn test_set_writes_config_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        let output = Output::new(OutputFormat::Quiet);

        set(
            "store".to_string(),
            "test.myshopify.com".to_string(),
            Some(&path),
            &output,
        )
        .unwrap();
        set("workers".to_string(), "2".to_string(), Some(&path), &output).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("test.myshopify.com"));
        assert!(content.contains("workers = 2"));

        assert!(set("bogus".to_string(), "1".to_string(), Some(&path), &output).is_err());
    }
}
