//! Installation of a downloaded release asset

use std::path::{Path, PathBuf};

use log::{debug, info};

use super::download::download_asset;
use super::error::{SetupError, SetupResult};
use super::extract::extract_archive;
use super::github::ReleaseAsset;
use super::platform::Platform;

/// Name users invoke the CLI by
pub const BINARY_NAME: &str = "exo";

/// Name some macOS archives ship the binary under
pub const DARWIN_BINARY_NAME: &str = "exoscale-cli";

/// Extracted CLI, ready to be put on the execution path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalInstallation {
    pub directory: PathBuf,
}

/// Download `asset`, unpack it under `temp_dir` and apply platform fixups.
///
/// The archive itself lives in a scratch directory removed on return; the
/// extracted tree is kept in a fresh `<temp_dir>/<uuid>` directory.
pub async fn install(
    asset: &ReleaseAsset,
    platform: Platform,
    temp_dir: &Path,
) -> SetupResult<LocalInstallation> {
    let scratch = tempfile::Builder::new()
        .prefix("setup-exoscale-")
        .tempdir_in(temp_dir)
        .map_err(|source| SetupError::FileWrite {
            path: temp_dir.to_path_buf(),
            source,
        })?;

    let archive = download_asset(asset, scratch.path()).await?;

    let dest = temp_dir.join(uuid::Uuid::new_v4().to_string());
    let directory = extract_archive(&archive, platform.archive_format(), &dest).await?;

    if platform == Platform::Darwin {
        ensure_darwin_alias(&directory).await?;
    }

    info!("Installed Exoscale CLI into {}", directory.display());
    Ok(LocalInstallation { directory })
}

/// Link `exo -> exoscale-cli` when the archive only ships the long name.
///
/// A failing existence check for `exo` counts as "absent".
pub async fn ensure_darwin_alias(directory: &Path) -> SetupResult<()> {
    let link = directory.join(BINARY_NAME);
    if tokio::fs::symlink_metadata(&link).await.is_ok() {
        debug!("{} already present, no alias needed", link.display());
        return Ok(());
    }

    let target = directory.join(DARWIN_BINARY_NAME);
    info!("Linking {} -> {}", link.display(), target.display());
    let linked = symlink(&target, &link).await;
    if let Err(source) = linked {
        return Err(SetupError::Link {
            link,
            target,
            source,
        });
    }
    Ok(())
}

#[cfg(unix)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink(target, link).await
}

#[cfg(windows)]
async fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    tokio::fs::symlink_file(target, link).await
}
