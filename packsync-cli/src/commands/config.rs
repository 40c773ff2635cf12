//! Launcher configuration CLI commands.

use clap::Subcommand;
use packsync::config::{config_path, ConfigFile};

use crate::error::CliError;

/// Config action subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Show the current configuration
    Show,
    /// Set one configuration value
    Set {
        /// Key to set (bundle, server_url, assets_dir, java_path,
        /// java_memory_mb, java_options, player_name, workers)
        key: String,
        /// New value
        value: String,
    },
    /// Print the config file location
    Path,
}

/// Run a config subcommand.
pub fn run(action: ConfigAction) -> Result<(), CliError> {
    match action {
        ConfigAction::Show => {
            let config = ConfigFile::load();
            println!("bundle         = {}", config.bundle);
            println!("server_url     = {}", config.server_url);
            println!("assets_dir     = {}", config.assets_dir);
            println!("java_path      = {}", config.java_path);
            println!("java_memory_mb = {}", config.java_memory_mb);
            println!("java_options   = {}", config.java_options);
            println!("player_name    = {}", config.player_name);
            println!("workers        = {}", config.workers);
            Ok(())
        }
        ConfigAction::Set { key, value } => {
            let mut config = ConfigFile::load();
            apply(&mut config, &key, &value)?;
            config
                .save()
                .map_err(|e| CliError::Config(format!("could not save config: {}", e)))?;
            println!("{} = {}", key, value);
            Ok(())
        }
        ConfigAction::Path => {
            match config_path() {
                Some(path) => println!("{}", path.display()),
                None => println!("no platform config directory available"),
            }
            Ok(())
        }
    }
}

fn apply(config: &mut ConfigFile, key: &str, value: &str) -> Result<(), CliError> {
    match key {
        "bundle" => config.bundle = value.to_string(),
        "server_url" => config.server_url = value.to_string(),
        "assets_dir" => config.assets_dir = value.to_string(),
        "java_path" => config.java_path = value.to_string(),
        "java_options" => config.java_options = value.to_string(),
        "player_name" => config.player_name = value.to_string(),
        "java_memory_mb" => {
            config.java_memory_mb = value
                .parse()
                .map_err(|_| CliError::Config(format!("{} is not a memory size", value)))?;
        }
        "workers" => {
            let workers: usize = value
                .parse()
                .map_err(|_| CliError::Config(format!("{} is not a worker count", value)))?;
            if workers == 0 {
                return Err(CliError::Config("workers must be at least 1".to_string()));
            }
            config.workers = workers;
        }
        _ => {
            return Err(CliError::Config(format!("unknown config key: {}", key)));
        }
    }
    Ok(())
}
