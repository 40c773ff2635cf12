//! The `sync` command: reconcile one bundle against the server.

use std::time::Duration;

use console::style;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use packsync::config::{format_size, ConfigFile};
use packsync::manifest::{Manifest, ManifestStore};
use packsync::sync::{SyncSummary, Synchronizer};

use super::{effective_config, resolve_bundle};
use crate::error::CliError;

/// Run a full synchronization; shared with the `launch` command.
///
/// Returns the effective config, the selected manifest, and the run
/// summary.
pub async fn synchronize(
    bundle: Option<String>,
    server: Option<String>,
) -> Result<(ConfigFile, Manifest, SyncSummary), CliError> {
    let mut config = effective_config(server);
    let store = ManifestStore::new(
        config.server_url.clone(),
        Duration::from_secs(packsync::config::DEFAULT_REQUEST_TIMEOUT_SECS),
    );
    let manifest = resolve_bundle(&mut config, &store, bundle).await?;

    let sync_config = config.sync_config(&manifest.name).ok_or_else(|| {
        CliError::Config("no platform data directory available".to_string())
    })?;

    let bars = MultiProgress::new();
    let scan_bar = bars.add(progress_bar("checking files"));
    let download_bar = bars.add(progress_bar("downloading"));

    let scan = scan_bar.clone();
    let download = download_bar.clone();
    let summary = Synchronizer::new(sync_config)
        .run(
            &manifest,
            Some(Box::new(move |hashed, total| {
                scan.set_length(total as u64);
                scan.set_position(hashed as u64);
            })),
            Some(Box::new(move |done, total| {
                download.set_length(total as u64);
                download.set_position(done as u64);
            })),
        )
        .await?;

    scan_bar.finish_and_clear();
    download_bar.finish_and_clear();
    Ok((config, manifest, summary))
}

/// Entry point for `packsync sync`.
pub async fn run(bundle: Option<String>, server: Option<String>) -> Result<(), CliError> {
    let (_, manifest, summary) = synchronize(bundle, server).await?;
    print_summary(&manifest, &summary);
    Ok(())
}

fn progress_bar(message: &'static str) -> ProgressBar {
    let bar = ProgressBar::new(0);
    bar.set_style(ProgressStyle::default_bar());
    bar.set_message(message);
    bar
}

fn print_summary(manifest: &Manifest, summary: &SyncSummary) {
    if summary.downloaded == 0 && summary.deleted == 0 {
        println!(
            "{} {} {} is up to date ({} objects)",
            style("✓").green(),
            manifest.name,
            manifest.version,
            summary.objects_total
        );
        return;
    }
    println!(
        "{} {} {}: downloaded {} objects ({}), removed {} stale files",
        style("✓").green(),
        manifest.name,
        manifest.version,
        summary.downloaded,
        format_size(summary.bytes_downloaded),
        summary.deleted
    );
}
