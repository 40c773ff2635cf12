//! Launching the synchronized content.
//!
//! Builds the Java command line from manifest launch metadata (classpath,
//! rule-guarded JVM/game arguments with `${variable}` substitution) and
//! spawns the runtime in the installation directory. A child that dies
//! within the grace period is reported as a failed launch.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::info;

use crate::manifest::{LaunchArgument, Manifest};
use crate::platform::Os;

/// Result type for launch operations.
pub type LaunchResult<T> = Result<T, LaunchError>;

/// Errors that can occur while launching.
#[derive(Debug)]
pub enum LaunchError {
    /// The host platform is not supported.
    UnsupportedPlatform,

    /// Failed to prepare the installation directory.
    PrepareFailed { path: PathBuf, source: io::Error },

    /// Failed to spawn the runtime process.
    SpawnFailed { source: io::Error },

    /// The runtime process exited during the grace period.
    ExitedEarly { code: Option<i32> },
}

impl std::fmt::Display for LaunchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnsupportedPlatform => write!(f, "unsupported platform"),
            Self::PrepareFailed { path, source } => {
                write!(f, "failed to prepare {}: {}", path.display(), source)
            }
            Self::SpawnFailed { source } => write!(f, "failed to spawn runtime: {}", source),
            Self::ExitedEarly { code } => match code {
                Some(code) => write!(f, "game process exited immediately with code {}", code),
                None => write!(f, "game process exited immediately"),
            },
        }
    }
}

impl std::error::Error for LaunchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::PrepareFailed { source, .. } | Self::SpawnFailed { source } => Some(source),
            _ => None,
        }
    }
}

/// Name of the game client jar inside the installation root.
pub const CLIENT_FILENAME: &str = "client.jar";

/// Directory for unpacked native libraries.
const NATIVES_DIR: &str = "natives";

/// How long the child must survive before the launch counts as successful.
const EXIT_GRACE_PERIOD: Duration = Duration::from_secs(3);

/// Fixed G1 tuning applied to every launch.
const GC_OPTIONS: [&str; 9] = [
    "-XX:+UnlockExperimentalVMOptions",
    "-XX:+UseG1GC",
    "-XX:G1NewSizePercent=20",
    "-XX:G1ReservePercent=20",
    "-XX:MaxGCPauseMillis=50",
    "-XX:G1HeapRegionSize=32M",
    "-XX:+DisableExplicitGC",
    "-XX:+AlwaysPreTouch",
    "-XX:+ParallelRefProcEnabled",
];

/// User-controlled launch parameters, typically read from the config
/// file.
#[derive(Clone, Debug)]
pub struct LaunchSettings {
    /// Path of the Java executable.
    pub java_path: PathBuf,

    /// JVM heap limit in MiB.
    pub memory_mb: u32,

    /// Extra JVM options, already split.
    pub extra_options: Vec<String>,

    /// Offline profile name.
    pub player_name: String,
}

/// Build the full argument list (JVM options, main class, game options).
///
/// Pure: the caller passes the rule-evaluation OS so the result is
/// testable on any host.
pub fn build_command_line(
    manifest: &Manifest,
    settings: &LaunchSettings,
    install_dir: &Path,
    assets_dir: &Path,
    os: Os,
) -> Vec<String> {
    let variables = substitution_variables(manifest, settings, install_dir, assets_dir, os);

    let mut args: Vec<String> = Vec::new();
    args.extend(GC_OPTIONS.iter().map(|s| s.to_string()));
    args.push("-Xms512M".to_string());
    args.push(format!("-Xmx{}M", settings.memory_mb));
    args.push("-Duser.language=en".to_string());
    args.push("-Dfile.encoding=UTF-8".to_string());
    args.extend(settings.extra_options.iter().cloned());
    append_arguments(&mut args, &manifest.java_args, &variables, os);

    args.push(manifest.main_class.clone());
    append_arguments(&mut args, &manifest.game_args, &variables, os);
    args
}

/// Spawn the runtime process in the installation directory.
///
/// Returns the child once it has survived the grace period.
pub async fn launch(
    manifest: &Manifest,
    settings: &LaunchSettings,
    install_dir: &Path,
    assets_dir: &Path,
) -> LaunchResult<tokio::process::Child> {
    let os = Os::current().ok_or(LaunchError::UnsupportedPlatform)?;

    let natives = install_dir.join(NATIVES_DIR);
    tokio::fs::create_dir_all(&natives)
        .await
        .map_err(|e| LaunchError::PrepareFailed {
            path: natives,
            source: e,
        })?;

    let args = build_command_line(manifest, settings, install_dir, assets_dir, os);
    info!(main_class = %manifest.main_class, "launching");

    let mut child = tokio::process::Command::new(&settings.java_path)
        .args(&args)
        .current_dir(install_dir)
        .spawn()
        .map_err(|e| LaunchError::SpawnFailed { source: e })?;

    tokio::time::sleep(EXIT_GRACE_PERIOD).await;
    if let Ok(Some(status)) = child.try_wait() {
        return Err(LaunchError::ExitedEarly {
            code: status.code(),
        });
    }
    Ok(child)
}

/// Derive the classpath: the manifest's explicit list, or every object
/// under `libraries/` plus the client jar.
pub fn build_classpath(manifest: &Manifest, install_dir: &Path) -> Vec<PathBuf> {
    match &manifest.classpath {
        Some(entries) => entries.iter().map(|e| install_dir.join(e)).collect(),
        None => {
            let mut entries: Vec<PathBuf> = manifest
                .objects
                .keys()
                .filter(|key| key.split('/').next() == Some("libraries"))
                .map(|key| install_dir.join(key))
                .collect();
            entries.push(install_dir.join(CLIENT_FILENAME));
            entries
        }
    }
}

fn substitution_variables(
    manifest: &Manifest,
    settings: &LaunchSettings,
    install_dir: &Path,
    assets_dir: &Path,
    os: Os,
) -> BTreeMap<String, String> {
    let separator = classpath_separator(os);
    let classpath = build_classpath(manifest, install_dir)
        .iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(separator);

    // Offline profile: a stable UUID derived from the player name.
    let mut uuid = crate::scan::hash_bytes(settings.player_name.as_bytes());
    uuid.truncate(32);

    let mut vars = BTreeMap::new();
    let mut set = |k: &str, v: String| {
        vars.insert(k.to_string(), v);
    };
    set(
        "natives_directory",
        install_dir.join(NATIVES_DIR).to_string_lossy().into_owned(),
    );
    set(
        "client_jar",
        install_dir.join(CLIENT_FILENAME).to_string_lossy().into_owned(),
    );
    set("launcher_name", "packsync".to_string());
    set("launcher_version", env!("CARGO_PKG_VERSION").to_string());
    set("classpath", classpath);
    set("classpath_separator", separator.to_string());
    set(
        "library_directory",
        install_dir.join("libraries").to_string_lossy().into_owned(),
    );
    set("auth_player_name", settings.player_name.clone());
    set("version_name", manifest.version.clone());
    set("game_directory", install_dir.to_string_lossy().into_owned());
    set("assets_root", assets_dir.to_string_lossy().into_owned());
    set("assets_index_name", manifest.asset_index.clone());
    set("auth_uuid", uuid);
    set("auth_access_token", String::new());
    set("user_type", "mojang".to_string());
    set("version_type", "release".to_string());
    set("resolution_width", "925".to_string());
    set("resolution_height", "530".to_string());
    vars
}

fn classpath_separator(os: Os) -> &'static str {
    match os {
        Os::Windows => ";",
        _ => ":",
    }
}

/// Append every applicable argument, with variables substituted.
fn append_arguments(
    out: &mut Vec<String>,
    arguments: &[LaunchArgument],
    variables: &BTreeMap<String, String>,
    os: Os,
) {
    for arg in arguments {
        if !argument_applies(arg, os) {
            continue;
        }
        for value in arg.value.as_slice() {
            out.push(substitute(value, variables));
        }
    }
}

/// Decide whether a rule-guarded argument applies on `os`.
fn argument_applies(arg: &LaunchArgument, os: Os) -> bool {
    // Forge manifests carry a Windows-10 spoof pair that breaks other
    // hosts; it is dropped unconditionally.
    if arg.value.as_slice() == ["-Dos.name=Windows 10", "-Dos.version=10.0"] {
        return false;
    }

    let Some(rules) = &arg.rules else {
        return true;
    };
    // Only single-rule arguments appear in practice.
    let Some(rule) = rules.first() else {
        return true;
    };

    if rule.action != "allow" {
        return false;
    }
    if let Some(constraint) = &rule.os {
        return constraint
            .name
            .as_deref()
            .is_some_and(|name| os.matches_rule_name(name));
    }
    if let Some(features) = &rule.features {
        return features.get("has_custom_resolution").copied().unwrap_or(false);
    }
    false
}

/// Replace every `${name}` placeholder present in `variables`.
fn substitute(argument: &str, variables: &BTreeMap<String, String>) -> String {
    let mut result = argument.to_string();
    for (name, value) in variables {
        result = result.replace(&format!("${{{}}}", name), value);
    }
    result
}
