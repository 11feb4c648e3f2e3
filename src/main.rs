use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;

use profilegraph::cli::{self, Commands};
use profilegraph::config::{self, AppConfig, ConfigManager};
use profilegraph::profile;

fn main() -> Result<()> {
    env_logger::init();

    let cli = cli::Cli::parse();
    let config_manager = ConfigManager::new()?;
    let mut config = config_manager.load()?;

    match cli.command {
        Commands::Vendors => {
            let root = profiles_root(cli.root, &config)?;
            profile::handle_vendors(&root)?;
        }
        Commands::Profile(args) => {
            let root = profiles_root(cli.root, &config)?;
            profile::handle_profile(args, &root, &config)?;
        }
        Commands::Config(args) => {
            config::handle_config(args.command, &config_manager, &mut config)?;
        }
    }

    Ok(())
}

fn profiles_root(flag: Option<PathBuf>, config: &AppConfig) -> Result<PathBuf> {
    flag.map(|root| config::expand_home(&root))
        .or_else(|| config.profiles.profiles_root())
        .context("no profiles root; pass --root or set profiles.repo_path")
}
