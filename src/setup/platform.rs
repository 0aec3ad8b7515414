//! Host platform detection and the platform → release asset mapping

use std::fmt;
use std::str::FromStr;

use log::debug;
use once_cell::sync::OnceCell;
use serde::Deserialize;

use super::error::{SetupError, SetupResult};

/// Operating systems the Exoscale CLI publishes archives for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Linux,
    #[serde(alias = "macos")]
    Darwin,
    #[serde(alias = "win32")]
    Windows,
}

/// Archive container used by a platform's release asset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    TarGz,
    Zip,
}

/// Global cache for host detection
static HOST_PLATFORM: OnceCell<Platform> = OnceCell::new();

impl Platform {
    pub const ALL: [Platform; 3] = [Platform::Linux, Platform::Darwin, Platform::Windows];

    /// Detect the host platform (cached after first call)
    pub fn detect() -> SetupResult<Self> {
        HOST_PLATFORM
            .get_or_try_init(|| Self::from_os(std::env::consts::OS))
            .copied()
    }

    /// Map a `std::env::consts::OS` value onto a supported platform
    pub fn from_os(os: &str) -> SetupResult<Self> {
        let platform = match os {
            "linux" => Platform::Linux,
            "macos" => Platform::Darwin,
            "windows" => Platform::Windows,
            other => return Err(SetupError::UnsupportedPlatform(other.to_string())),
        };
        debug!("Detected host platform {platform} from OS {os}");
        Ok(platform)
    }

    /// Filename ending that identifies this platform's asset in a release
    pub fn asset_suffix(&self) -> &'static str {
        match self {
            Platform::Linux => "linux_amd64.tar.gz",
            Platform::Darwin => "darwin_all.tar.gz",
            Platform::Windows => "windows_amd64.zip",
        }
    }

    pub fn archive_format(&self) -> ArchiveFormat {
        match self {
            Platform::Windows => ArchiveFormat::Zip,
            Platform::Linux | Platform::Darwin => ArchiveFormat::TarGz,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Linux => "linux",
            Platform::Darwin => "darwin",
            Platform::Windows => "windows",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = SetupError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "linux" => Ok(Platform::Linux),
            "darwin" | "macos" => Ok(Platform::Darwin),
            "windows" | "win32" => Ok(Platform::Windows),
            other => Err(SetupError::UnsupportedPlatform(other.to_string())),
        }
    }
}
