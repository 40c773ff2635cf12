//! CLI error type.

use packsync::error::SyncError;
use packsync::launch::LaunchError;
use packsync::runtime::RuntimeError;

/// Errors surfaced to the terminal.
#[derive(Debug)]
pub enum CliError {
    /// Synchronization engine failure.
    Sync(SyncError),

    /// Runtime provisioning failure.
    Runtime(RuntimeError),

    /// Launch failure.
    Launch(LaunchError),

    /// Configuration problem (missing value, bad key, unwritable file).
    Config(String),

    /// Interactive prompt failed (e.g. no terminal attached).
    Prompt(String),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sync(e) => write!(f, "{}", e),
            Self::Runtime(e) => write!(f, "{}", e),
            Self::Launch(e) => write!(f, "{}", e),
            Self::Config(msg) => write!(f, "configuration error: {}", msg),
            Self::Prompt(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Sync(e) => Some(e),
            Self::Runtime(e) => Some(e),
            Self::Launch(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SyncError> for CliError {
    fn from(e: SyncError) -> Self {
        Self::Sync(e)
    }
}

impl From<RuntimeError> for CliError {
    fn from(e: RuntimeError) -> Self {
        Self::Runtime(e)
    }
}

impl From<LaunchError> for CliError {
    fn from(e: LaunchError) -> Self {
        Self::Launch(e)
    }
}
