//! Host platform resolution for cloudflared release artifacts.

use std::fmt;

/// cloudflared release pinned by default.
pub const DEFAULT_CLOUDFLARED_VERSION: &str = "2025.11.1";

const RELEASES_BASE: &str = "https://github.com/cloudflare/cloudflared/releases";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Os {
    Linux,
    Darwin,
    Windows,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arch {
    Amd64,
    Arm64,
}

/// How the release asset is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// The asset is the executable itself.
    None,
    /// The asset is a gzip-compressed tarball holding the executable.
    TarGzip,
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Linux => write!(f, "linux"),
            Self::Darwin => write!(f, "darwin"),
            Self::Windows => write!(f, "windows"),
        }
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Amd64 => write!(f, "amd64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Everything needed to fetch and place cloudflared for one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformTarget {
    pub os: Os,
    pub arch: Arch,
    pub download_url: String,
    pub archive_kind: ArchiveKind,
}

impl PlatformTarget {
    /// Resolve the target from OS and architecture identifiers.
    ///
    /// Accepts both Rust (`macos`, `windows`) and Node-style (`darwin`,
    /// `win32`) OS names. An unrecognized OS resolves to the Windows amd64
    /// target regardless of architecture.
    pub fn resolve(os: &str, arch: &str, version: &str) -> Self {
        let is_arm = matches!(arch, "arm64" | "aarch64");
        let arch = if is_arm { Arch::Arm64 } else { Arch::Amd64 };

        let (os, arch) = match os {
            "macos" | "darwin" => (Os::Darwin, arch),
            "linux" => (Os::Linux, arch),
            "windows" | "win32" => (Os::Windows, arch),
            _ => (Os::Windows, Arch::Amd64),
        };

        let archive_kind = match os {
            Os::Darwin => ArchiveKind::TarGzip,
            Os::Linux | Os::Windows => ArchiveKind::None,
        };

        Self {
            os,
            arch,
            download_url: download_url(version, os, arch),
            archive_kind,
        }
    }

    /// Resolve the target for the machine this binary was built for.
    pub fn host(version: &str) -> Self {
        Self::resolve(std::env::consts::OS, std::env::consts::ARCH, version)
    }

    /// File name the installed executable ends up under.
    pub const fn binary_name(&self) -> &'static str {
        match self.os {
            Os::Windows => "cloudflared.exe",
            Os::Linux | Os::Darwin => "cloudflared",
        }
    }

    /// File name the archive is staged under before extraction, if any.
    pub const fn archive_name(&self) -> Option<&'static str> {
        match self.archive_kind {
            ArchiveKind::TarGzip => Some("cloudflared.tgz"),
            ArchiveKind::None => None,
        }
    }

    /// Whether the installed binary needs the execute bit.
    pub const fn needs_exec_bit(&self) -> bool {
        !matches!(self.os, Os::Windows)
    }
}

const fn asset_ext(os: Os) -> &'static str {
    match os {
        Os::Darwin => ".tgz",
        Os::Linux => "",
        Os::Windows => ".exe",
    }
}

/// Build the GitHub release download URL for a cloudflared asset.
pub fn download_url(version: &str, os: Os, arch: Arch) -> String {
    let asset = format!("cloudflared-{os}-{arch}{}", asset_ext(os));
    if version == "latest" {
        format!("{RELEASES_BASE}/latest/download/{asset}")
    } else {
        format!("{RELEASES_BASE}/download/{version}/{asset}")
    }
}
