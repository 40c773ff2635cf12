//! The `bundles` command: list what the server publishes.

use std::time::Duration;

use packsync::manifest::ManifestStore;

use super::effective_config;
use crate::error::CliError;

/// Entry point for `packsync bundles`.
pub async fn run(server: Option<String>) -> Result<(), CliError> {
    let config = effective_config(server);
    let store = ManifestStore::new(
        config.server_url.clone(),
        Duration::from_secs(packsync::config::DEFAULT_REQUEST_TIMEOUT_SECS),
    );

    let manifests = store.fetch_all().await?;
    if manifests.is_empty() {
        println!("the server publishes no bundles");
        return Ok(());
    }

    for manifest in &manifests {
        let marker = if manifest.name == config.bundle { "*" } else { " " };
        println!(
            "{} {}  {}  ({} objects)",
            marker,
            manifest.name,
            manifest.version,
            manifest.objects.len()
        );
    }
    Ok(())
}
