//! Configuration-related CLI commands.

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::GlobalArgs;
use crate::config::{PressConfig, CONFIG_FILE_NAME};
use crate::data::to_yaml;
use crate::utils::settings::Settings;

/// Configuration operations.
#[derive(Parser)]
pub struct ConfigCommand {
    /// Configuration subcommand to execute.
    #[command(subcommand)]
    pub command: ConfigSubcommands,
}

/// Configuration subcommands.
#[derive(Subcommand)]
pub enum ConfigSubcommands {
    /// Prints the effective configuration as YAML.
    Show,
    /// Prints where configuration and settings are read from.
    Paths,
}

impl ConfigCommand {
    /// Executes the config command.
    pub fn execute(self, global: &GlobalArgs) -> Result<()> {
        let root = global.project_root();
        match self.command {
            ConfigSubcommands::Show => {
                let config = PressConfig::load(&root, global.config.as_deref())?;
                print!("{}", to_yaml(&config)?);
            }
            ConfigSubcommands::Paths => {
                let config_path = match &global.config {
                    Some(path) => path.clone(),
                    None => root.join(CONFIG_FILE_NAME),
                };
                let exists = |found: bool| if found { "" } else { " (missing)" };
                println!(
                    "config:   {}{}",
                    config_path.display(),
                    exists(config_path.exists())
                );
                let settings = Settings::settings_path()?;
                println!("settings: {}{}", settings.display(), exists(settings.exists()));
            }
        }
        Ok(())
    }
}
