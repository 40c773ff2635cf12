//! The `launch` command: synchronize, ensure a runtime, start the game.

use std::path::{Path, PathBuf};
use std::time::Duration;

use console::style;
use packsync::config::{self, ConfigFile};
use packsync::launch::LaunchSettings;
use packsync::runtime::{locate_runtime, RuntimeProvisioner};
use tracing::info;

use crate::error::CliError;

/// Entry point for `packsync launch`.
pub async fn run(bundle: Option<String>, server: Option<String>) -> Result<(), CliError> {
    let (mut config, manifest, _) = super::sync::synchronize(bundle, server).await?;

    let java_path = ensure_runtime(&mut config).await?;
    let settings = LaunchSettings {
        java_path,
        memory_mb: config.java_memory_mb,
        extra_options: config
            .java_options
            .split_whitespace()
            .map(str::to_string)
            .collect(),
        player_name: config.player_name.clone(),
    };

    let install_dir = config::bundle_dir(&manifest.name).ok_or_else(|| {
        CliError::Config("no platform data directory available".to_string())
    })?;
    let assets_dir = config.resolved_assets_dir().ok_or_else(|| {
        CliError::Config("no platform data directory available".to_string())
    })?;

    packsync::launch::launch(&manifest, &settings, &install_dir, &assets_dir).await?;
    println!("{} {} started", style("✓").green(), manifest.name);
    Ok(())
}

/// Use the configured runtime when it checks out, otherwise provision a
/// fresh one and persist its path.
async fn ensure_runtime(config: &mut ConfigFile) -> Result<PathBuf, CliError> {
    if !config.java_path.is_empty() {
        if let Some(install) = locate_runtime(Path::new(&config.java_path)) {
            if install.is_supported() {
                info!(path = %install.path.display(), version = %install.version, "using configured runtime");
                return Ok(install.path);
            }
            println!(
                "configured runtime is version {}, provisioning a compatible one",
                install.version
            );
        }
    }

    let data_dir = config::data_dir()
        .ok_or_else(|| CliError::Config("no platform data directory available".to_string()))?;
    println!("provisioning Java runtime...");
    let provisioner = RuntimeProvisioner::new(Duration::from_secs(
        packsync::config::DEFAULT_REQUEST_TIMEOUT_SECS,
    ));
    let java_path = provisioner.provision(&data_dir.join("runtime")).await?;

    config.java_path = java_path.to_string_lossy().into_owned();
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "could not persist runtime path");
    }
    Ok(java_path)
}
