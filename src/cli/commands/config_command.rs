//! Config command feature.
//!
//! This module owns and handles the "space-cleanser config" command behavior.

use anyhow::Context;

use crate::cli::ConfigCommands;
use crate::config::Config;
use crate::output;
use crate::theme::Theme;

pub(crate) fn handle_config(action: ConfigCommands, json: bool) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => {
            let config = Config::load();
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
                return Ok(());
            }
            print_config(&config);
        }
        ConfigCommands::Path => {
            output::print_path(&Config::config_path()?);
        }
        ConfigCommands::Reset => {
            let path = Config::config_path()?;
            Config::default()
                .save_to(&path)
                .with_context(|| format!("Failed to reset {}", path.display()))?;
            println!(
                "{} Configuration reset to defaults ({}).",
                Theme::success("OK"),
                path.display()
            );
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("{}", Theme::header("Current Configuration"));
    println!("{}", Theme::divider_bold(60));
    println!();
    println!("Scan:");
    println!("  Progress every: {} files", config.scan.progress_interval);
    println!(
        "  Cancel check every: {} entries",
        config.scan.cancel_check_interval
    );
    println!("  Warning samples kept: {}", config.scan.max_warning_samples);
    println!();
    println!("Duplicates:");
    println!(
        "  Min size: {}",
        output::size_human(config.duplicates.min_size_bytes)
    );
    println!(
        "  Read buffer: {}",
        output::size_human(config.duplicates.buffer_size_bytes as u64)
    );
    println!(
        "  Prefix hash: {} ({})",
        config.duplicates.prefix_hash,
        output::size_human(config.duplicates.prefix_hash_bytes as u64)
    );
    println!();
    println!("Large files:");
    println!("  Default threshold: {}", config.large_files.default_threshold);
    println!();
    println!("Exclusions:");
    if config.exclusions.patterns.is_empty() {
        println!("  Patterns: (none)");
    } else {
        for pattern in &config.exclusions.patterns {
            println!("  Pattern: {}", pattern);
        }
    }
    println!("  System roots: {}", config.exclusions.system_roots.join(", "));
    println!();
    if let Ok(path) = Config::config_path() {
        println!("Config file: {}", path.display());
    }
}
