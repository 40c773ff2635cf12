//! Host platform detection for runtime provisioning and launch rules.

/// Supported operating systems.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Os {
    Windows,
    MacOs,
    Linux,
}

impl Os {
    /// Detect the host OS; `None` on unsupported platforms.
    pub fn current() -> Option<Self> {
        match std::env::consts::OS {
            "windows" => Some(Self::Windows),
            "macos" => Some(Self::MacOs),
            "linux" => Some(Self::Linux),
            _ => None,
        }
    }

    /// Name used by the runtime metadata endpoint.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::Windows => "windows",
            Self::MacOs => "macos",
            Self::Linux => "linux",
        }
    }

    /// True when `name` (launch-rule vocabulary: `windows`, `osx`,
    /// `linux`) refers to this OS.
    pub fn matches_rule_name(&self, name: &str) -> bool {
        matches!(
            (self, name),
            (Self::Windows, "windows") | (Self::MacOs, "osx") | (Self::Linux, "linux")
        )
    }
}

/// Supported CPU architectures.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arch {
    X64,
    X86,
    Aarch64,
}

impl Arch {
    /// Detect the host architecture. Unknown architectures fall back to
    /// aarch64.
    pub fn current() -> Self {
        match std::env::consts::ARCH {
            "x86_64" => Self::X64,
            "x86" => Self::X86,
            _ => Self::Aarch64,
        }
    }

    /// Name used by the runtime metadata endpoint.
    pub fn api_name(&self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::X86 => "i686",
            Self::Aarch64 => "aarch64",
        }
    }
}
