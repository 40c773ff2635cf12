//! Java runtime acquisition.
//!
//! The synchronized content needs a Java 8 runtime to execute. This module
//! provisions one: it asks a runtime metadata endpoint for the best archive
//! matching the host platform, downloads it, extracts it into the data
//! directory, fixes executable bits on Unix, and returns the path of the
//! runtime entry point. It can also validate an already-installed runtime
//! by parsing `java -version` output.
//!
//! Plain download-and-unpack plumbing with no diffing or concurrency. The
//! synchronization engine only depends on receiving a valid executable
//! path.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use regex::Regex;
use serde::Deserialize;
use tracing::info;

use crate::platform::{Arch, Os};
use crate::sync::{HttpObjectFetcher, ObjectFetcher};

/// Result type for runtime provisioning.
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur while provisioning a runtime.
#[derive(Debug)]
pub enum RuntimeError {
    /// The host platform is not supported by the metadata endpoint.
    UnsupportedPlatform,

    /// Failed to fetch runtime metadata.
    MetadataFetchFailed { url: String, reason: String },

    /// Failed to parse runtime metadata.
    MetadataParseFailed { url: String, reason: String },

    /// The endpoint offered no archive for this platform.
    NoPackageAvailable,

    /// Failed to download the runtime archive.
    DownloadFailed { url: String, reason: String },

    /// Failed to extract the runtime archive.
    ExtractionFailed { path: PathBuf, reason: String },

    /// Filesystem operation on the installed runtime failed.
    InstallFailed { path: PathBuf, source: io::Error },
}

impl std::fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPlatform => write!(f, "unsupported platform"),
            Self::MetadataFetchFailed { url, reason } => {
                write!(f, "failed to fetch runtime metadata from {}: {}", url, reason)
            }
            Self::MetadataParseFailed { url, reason } => {
                write!(f, "failed to parse runtime metadata from {}: {}", url, reason)
            }
            Self::NoPackageAvailable => {
                write!(f, "no runtime archive available for this platform")
            }
            Self::DownloadFailed { url, reason } => {
                write!(f, "failed to download runtime from {}: {}", url, reason)
            }
            Self::ExtractionFailed { path, reason } => {
                write!(f, "failed to extract {}: {}", path.display(), reason)
            }
            Self::InstallFailed { path, source } => {
                write!(f, "runtime install failed at {}: {}", path.display(), source)
            }
        }
    }
}

impl std::error::Error for RuntimeError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InstallFailed { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Default runtime metadata endpoint (Azul Zulu packages API).
pub const DEFAULT_METADATA_URL: &str = "https://api.azul.com/metadata/v1/zulu/packages/";

/// Java feature version the launcher targets.
const REQUIRED_JAVA_VERSION: &str = "8";

/// One downloadable runtime archive as described by the endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct RuntimePackage {
    /// Archive file name.
    pub name: String,

    /// Where to download the archive.
    pub download_url: String,

    /// Version components (e.g. `[8, 0, 392]`).
    #[serde(default)]
    pub version: Vec<u32>,

    /// Whether this is the newest matching build.
    #[serde(default)]
    pub latest: bool,
}

/// A validated local runtime installation.
#[derive(Clone, Debug, PartialEq)]
pub struct RuntimeInstall {
    /// Path of the `java` executable.
    pub path: PathBuf,

    /// Version string as reported by `java -version`.
    pub version: String,
}

impl RuntimeInstall {
    /// True when this runtime can execute the synchronized content.
    pub fn is_supported(&self) -> bool {
        self.version.starts_with("1.8.0")
    }
}

/// Query parameters selecting a runtime archive for one platform.
fn package_query(os: Os, arch: Arch) -> Vec<(&'static str, &'static str)> {
    vec![
        ("java_version", REQUIRED_JAVA_VERSION),
        ("os", os.api_name()),
        ("arch", arch.api_name()),
        ("archive_type", "zip"),
        ("java_package_type", "jre"),
        ("javafx_bundled", "false"),
        ("support_term", "lts"),
        ("latest", "true"),
        ("release_status", "ga"),
    ]
}

/// Downloads and installs a Java runtime for the host platform.
pub struct RuntimeProvisioner {
    metadata_url: String,
    client: reqwest::Client,
    fetcher: HttpObjectFetcher,
}

impl RuntimeProvisioner {
    /// Create a provisioner against the default metadata endpoint.
    pub fn new(timeout: Duration) -> Self {
        Self::with_metadata_url(DEFAULT_METADATA_URL, timeout)
    }

    /// Create a provisioner against a custom metadata endpoint.
    pub fn with_metadata_url(metadata_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("failed to create HTTP client");
        Self {
            metadata_url: metadata_url.into(),
            client,
            fetcher: HttpObjectFetcher::new(timeout),
        }
    }

    /// Ask the endpoint for archives matching the host platform and take
    /// the first offer.
    pub async fn query_package(&self) -> RuntimeResult<RuntimePackage> {
        let os = Os::current().ok_or(RuntimeError::UnsupportedPlatform)?;
        let arch = Arch::current();

        let response = self
            .client
            .get(&self.metadata_url)
            .query(&package_query(os, arch))
            .send()
            .await
            .map_err(|e| RuntimeError::MetadataFetchFailed {
                url: self.metadata_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(RuntimeError::MetadataFetchFailed {
                url: self.metadata_url.clone(),
                reason: format!("server returned status {}", status),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| RuntimeError::MetadataFetchFailed {
                url: self.metadata_url.clone(),
                reason: e.to_string(),
            })?;
        let packages: Vec<RuntimePackage> =
            serde_json::from_str(&body).map_err(|e| RuntimeError::MetadataParseFailed {
                url: self.metadata_url.clone(),
                reason: e.to_string(),
            })?;

        packages.into_iter().next().ok_or(RuntimeError::NoPackageAvailable)
    }

    /// Provision a runtime under `data_dir` and return the executable
    /// path.
    pub async fn provision(&self, data_dir: &Path) -> RuntimeResult<PathBuf> {
        let package = self.query_package().await?;
        info!(archive = %package.name, "provisioning Java runtime");

        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| RuntimeError::InstallFailed {
                path: data_dir.to_path_buf(),
                source: e,
            })?;

        let archive_name = package
            .download_url
            .rsplit('/')
            .next()
            .unwrap_or(&package.name)
            .to_string();
        let archive_path = data_dir.join(&archive_name);

        self.fetcher
            .fetch(&package.download_url, &archive_path)
            .await
            .map_err(|e| RuntimeError::DownloadFailed {
                url: package.download_url.clone(),
                reason: e.to_string(),
            })?;

        let install_dir = data_dir.join(archive_stem(&archive_name));
        {
            let archive = archive_path.clone();
            let target = data_dir.to_path_buf();
            tokio::task::spawn_blocking(move || extract_archive(&archive, &target))
                .await
                .unwrap_or_else(|e| std::panic::resume_unwind(e.into_panic()))?;
        }

        tokio::fs::remove_file(&archive_path)
            .await
            .map_err(|e| RuntimeError::InstallFailed {
                path: archive_path.clone(),
                source: e,
            })?;

        make_executable(&install_dir)?;

        let java = java_entry_point(&install_dir);
        info!(path = %java.display(), "runtime provisioned");
        Ok(java)
    }
}

/// Extract a zip archive into `target`.
fn extract_archive(archive: &Path, target: &Path) -> RuntimeResult<()> {
    let file = std::fs::File::open(archive).map_err(|e| RuntimeError::ExtractionFailed {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| RuntimeError::ExtractionFailed {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?;
    zip.extract(target).map_err(|e| RuntimeError::ExtractionFailed {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Archive file name without its `.zip` suffix.
fn archive_stem(archive_name: &str) -> &str {
    archive_name.strip_suffix(".zip").unwrap_or(archive_name)
}

/// Path of the runtime entry point inside an installed archive.
fn java_entry_point(install_dir: &Path) -> PathBuf {
    let binary = if cfg!(windows) { "javaw.exe" } else { "java" };
    install_dir.join("bin").join(binary)
}

/// Set the executable bit on the runtime's binaries (Unix only).
#[cfg(unix)]
fn make_executable(install_dir: &Path) -> RuntimeResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let chmod = |path: &Path| -> RuntimeResult<()> {
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).map_err(|e| {
            RuntimeError::InstallFailed {
                path: path.to_path_buf(),
                source: e,
            }
        })
    };

    let bin = install_dir.join("bin");
    if bin.is_dir() {
        let entries = std::fs::read_dir(&bin).map_err(|e| RuntimeError::InstallFailed {
            path: bin.clone(),
            source: e,
        })?;
        for entry in entries {
            let entry = entry.map_err(|e| RuntimeError::InstallFailed {
                path: bin.clone(),
                source: e,
            })?;
            chmod(&entry.path())?;
        }
    }

    let jexec = install_dir.join("lib").join("jexec");
    if jexec.is_file() {
        chmod(&jexec)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn make_executable(_install_dir: &Path) -> RuntimeResult<()> {
    Ok(())
}

/// Validate an existing runtime by running `<path> -version`.
///
/// Returns `None` when the binary is missing, fails to run, or produces
/// no recognizable version string.
pub fn locate_runtime(candidate: &Path) -> Option<RuntimeInstall> {
    let output = std::process::Command::new(candidate)
        .arg("-version")
        .output()
        .ok()?;

    // `java -version` prints to stderr.
    let text = format!(
        "{}{}",
        String::from_utf8_lossy(&output.stderr),
        String::from_utf8_lossy(&output.stdout)
    );
    let version = parse_version_output(&text)?;
    Some(RuntimeInstall {
        path: candidate.to_path_buf(),
        version,
    })
}

/// Extract the quoted version from `java -version` output.
fn parse_version_output(output: &str) -> Option<String> {
    let re = Regex::new(r#""([^"]*)""#).ok()?;
    re.captures(output)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
