//! Engine config management command.

use std::path::Path;

use clap::{Args, Subcommand};
use spatia_config::{EngineConfig, ensure_user_config_dir, paths};

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Subcommand)]
enum ConfigCommand {
    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective config and whether it is valid
    Show,

    /// Print the config file location
    Path,
}

pub fn run(args: ConfigArgs, explicit: Option<&Path>) -> anyhow::Result<()> {
    let path = paths::resolve_config_path(explicit);

    match args.command {
        ConfigCommand::Path => {
            println!("{}", path.display());
        }

        ConfigCommand::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            if explicit.is_none() {
                ensure_user_config_dir()?;
            }
            EngineConfig::default().save(&path)?;
            println!("Wrote {}", path.display());
        }

        ConfigCommand::Show => {
            let source = if path.is_file() { "file" } else { "defaults" };
            let config = EngineConfig::load_or_default(&path)?;
            println!("# {} ({})", path.display(), source);
            print!("{}", config.to_toml()?);
            if let Err(err) = config.validate() {
                println!("# invalid: {}", err);
                return Err(err.into());
            }
            println!("# valid");
        }
    }

    Ok(())
}
