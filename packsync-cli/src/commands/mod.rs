//! CLI subcommands.

pub mod bundles;
pub mod config;
pub mod launch;
pub mod sync;

use dialoguer::Select;
use packsync::config::{normalize_base_url, ConfigFile};
use packsync::manifest::{Manifest, ManifestStore};

use crate::error::CliError;

/// Resolve the effective launcher configuration for a command.
///
/// Flags override the persisted config file but are not written back.
pub fn effective_config(server: Option<String>) -> ConfigFile {
    let mut config = ConfigFile::load();
    if let Some(server) = server {
        config.server_url = normalize_base_url(server);
    }
    config
}

/// Resolve which bundle to operate on: the `--bundle` flag, the persisted
/// selection, or an interactive pick from the server's collection. A
/// freshly picked bundle is persisted for later runs.
pub async fn resolve_bundle(
    config: &mut ConfigFile,
    store: &ManifestStore,
    flag: Option<String>,
) -> Result<Manifest, CliError> {
    if let Some(bundle) = flag {
        return Ok(store.select(&bundle).await?);
    }
    if !config.bundle.is_empty() {
        let bundle = config.bundle.clone();
        return Ok(store.select(&bundle).await?);
    }

    let mut manifests = store.fetch_all().await?;
    let picked = match manifests.len() {
        0 => {
            return Err(CliError::Config(
                "the server publishes no bundles".to_string(),
            ))
        }
        1 => 0,
        _ => {
            let names: Vec<&str> = manifests.iter().map(|m| m.name.as_str()).collect();
            Select::new()
                .with_prompt("Select a bundle")
                .items(&names)
                .default(0)
                .interact()
                .map_err(|_| {
                    CliError::Prompt(
                        "no bundle selected; pass --bundle <name> when not at a terminal"
                            .to_string(),
                    )
                })?
        }
    };
    let manifest = manifests.swap_remove(picked);

    config.bundle = manifest.name.clone();
    if let Err(e) = config.save() {
        tracing::warn!(error = %e, "could not persist bundle selection");
    }
    Ok(manifest)
}
