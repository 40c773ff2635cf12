//! Remote bundle manifests.
//!
//! The server publishes one manifest per bundle as a JSON array at
//! `<base>/index.json`. A manifest declares everything a run needs: the
//! include paths that participate in synchronization, the object map
//! (path key → content hash), and the launch metadata consumed by the
//! `launch` module.
//!
//! Manifests are immutable once fetched; one is selected per run by exact
//! bundle-name match.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{SyncError, SyncResult};

/// One bundle's manifest record.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Manifest {
    /// Bundle name, the unique selector.
    pub name: String,

    /// Bundle version string.
    pub version: String,

    /// Asset index name passed to the game at launch.
    #[serde(default)]
    pub asset_index: String,

    /// Java main class.
    #[serde(default)]
    pub main_class: String,

    /// Explicit classpath entries (relative to the installation root).
    /// When absent, the classpath is derived from the object map.
    #[serde(default)]
    pub classpath: Option<Vec<String>>,

    /// Rule-guarded JVM arguments.
    #[serde(default)]
    pub java_args: Vec<LaunchArgument>,

    /// Rule-guarded game arguments.
    #[serde(default)]
    pub game_args: Vec<LaunchArgument>,

    /// Paths (files or directories, relative to the installation root)
    /// that participate in synchronization.
    #[serde(default)]
    pub include: Vec<String>,

    /// Object map: path key → lowercase hex content hash.
    #[serde(default)]
    pub objects: BTreeMap<String, String>,
}

/// One launch argument with optional applicability rules.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct LaunchArgument {
    /// The argument text, single or multi-valued.
    pub value: ArgumentValue,

    /// Applicability rules; an argument without rules always applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rules: Option<Vec<ArgumentRule>>,
}

/// A single string or a list of strings.
#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ArgumentValue {
    Single(String),
    List(Vec<String>),
}

impl ArgumentValue {
    /// View the value as a slice of strings.
    pub fn as_slice(&self) -> &[String] {
        match self {
            Self::Single(s) => std::slice::from_ref(s),
            Self::List(v) => v,
        }
    }
}

/// Applicability rule for a launch argument.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ArgumentRule {
    /// Rule action; only `allow` rules can admit an argument.
    pub action: String,

    /// Operating system constraint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<OsConstraint>,

    /// Feature flags (e.g. `has_custom_resolution`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<BTreeMap<String, bool>>,
}

/// Operating system constraint within a rule.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct OsConstraint {
    /// OS name in rule vocabulary (`windows`, `osx`, `linux`).
    #[serde(default)]
    pub name: Option<String>,
}

/// Fetches the manifest collection and selects bundles from it.
pub struct ManifestStore {
    base_url: String,
    client: reqwest::Client,
}

impl ManifestStore {
    /// Create a store over the given base location.
    ///
    /// `base_url` must end with `/` (see `SyncConfig`, which normalizes it).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    /// Location of the manifest collection.
    pub fn index_url(&self) -> String {
        format!("{}index.json", self.base_url)
    }

    /// Fetch every manifest the server publishes.
    pub async fn fetch_all(&self) -> SyncResult<Vec<Manifest>> {
        let url = self.index_url();
        let response = self.client.get(&url).send().await.map_err(|e| {
            SyncError::ManifestFetchFailed {
                url: url.clone(),
                reason: e.to_string(),
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(SyncError::ManifestFetchFailed {
                url,
                reason: format!("server returned status {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SyncError::ManifestFetchFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        let manifests: Vec<Manifest> =
            serde_json::from_str(&body).map_err(|e| SyncError::ManifestParseFailed {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        debug!(count = manifests.len(), url = %url, "fetched manifest collection");
        Ok(manifests)
    }

    /// Fetch the collection and select one bundle by exact name match.
    pub async fn select(&self, bundle: &str) -> SyncResult<Manifest> {
        let manifests = self.fetch_all().await?;
        select_from(manifests, bundle)
    }
}

/// Select a bundle from an already-fetched collection.
///
/// When several manifests share a name, the first in source order wins.
pub fn select_from(manifests: Vec<Manifest>, bundle: &str) -> SyncResult<Manifest> {
    manifests
        .into_iter()
        .find(|m| m.name == bundle)
        .ok_or_else(|| SyncError::BundleNotFound {
            bundle: bundle.to_string(),
        })
}
