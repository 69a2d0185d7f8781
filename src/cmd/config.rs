//! Configuration view and validation commands — `regen config`.

use anyhow::Result;
use std::path::Path;

use super::super::{Cli, ConfigCommands};
use regen::regen_config::{CONFIG_FILE_NAME, RegenToml};

pub fn cmd_config(cli: &Cli, cwd: &Path, command: Option<ConfigCommands>) -> Result<()> {
    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(|| cwd.join(CONFIG_FILE_NAME));

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Regen Configuration");
            println!("===================");
            println!();

            let toml = if config_path.exists() {
                println!("Config file: {}", config_path.display());
                RegenToml::load(&config_path)?
            } else {
                println!("No {} found at {}", CONFIG_FILE_NAME, config_path.display());
                println!("Using default configuration.");
                RegenToml::default()
            };
            println!();

            println!("[defaults]");
            println!("  timeout_secs = {}", toml.defaults.timeout_secs);
            println!("  package_prefix = \"{}\"", toml.defaults.package_prefix);
            println!(
                "  checkpoint_file = \"{}\"",
                toml.defaults.checkpoint_file.display()
            );
            println!();

            println!("Pipeline:");
            for step in toml.pipeline_steps() {
                let timeout = step
                    .timeout_secs
                    .map(|secs| format!(" (timeout {}s)", secs))
                    .unwrap_or_default();
                println!("  {:<10} {}{}", step.name, step.command_line(), timeout);
            }
            if toml.steps.is_empty() {
                println!("  (built-in steps; set REGEN_DOTNET to change the program)");
            }
            println!();

            if !toml.skip.packages.is_empty() || toml.skip.file.is_some() {
                println!("[skip]");
                for package in &toml.skip.packages {
                    println!("  - {}", package);
                }
                if let Some(file) = &toml.skip.file {
                    println!("  file = \"{}\"", file.display());
                }
                println!();
            }

            if !config_path.exists() {
                println!("Run 'regen config init' to create a {} file.", CONFIG_FILE_NAME);
                println!();
            }
        }
        Some(ConfigCommands::Validate) => {
            println!();
            println!("Validating configuration...");
            println!();

            if !config_path.exists() {
                println!("No {} found. Using defaults (valid).", CONFIG_FILE_NAME);
                return Ok(());
            }

            let toml = RegenToml::load(&config_path)?;
            let warnings = toml.validate();

            if warnings.is_empty() {
                println!("Configuration is valid.");
            } else {
                println!("Configuration warnings:");
                for warning in warnings {
                    println!("  - {}", warning);
                }
            }
            println!();
        }
        Some(ConfigCommands::Init) => {
            if config_path.exists() {
                println!("{} already exists at {}", CONFIG_FILE_NAME, config_path.display());
                println!("Use 'regen config show' to view the current configuration.");
                return Ok(());
            }

            RegenToml::template().save(&config_path)?;
            println!("Created {}", config_path.display());
            println!();
            println!("Edit [[steps]] to change the pipeline run for each package.");
        }
    }

    Ok(())
}
