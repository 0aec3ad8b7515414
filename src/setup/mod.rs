//! Exoscale CLI setup pipeline
//!
//! Resolve a release, pick the platform asset, install it and write the
//! CLI credentials, strictly in that order.
//!
//! ## Module Organization
//!
//! - `platform` - Host detection and the platform → asset suffix table
//! - `github` - GitHub API interaction for release discovery
//! - `release` - Version resolution and asset matching
//! - `download` - Streaming asset download
//! - `extract` - ZIP and tar.gz extraction
//! - `install` - Download + extract + macOS binary alias
//! - `authenticate` - Credentials file rendering and writing
//!
//! Nothing here touches process-global state; `setup` returns a
//! [`SetupOutcome`] describing the path entry and variables the caller
//! should publish.

mod authenticate;
mod download;
mod error;
mod extract;
mod github;
mod install;
mod platform;
mod release;

use std::path::PathBuf;

use log::info;

use crate::config::SetupOptions;

pub use authenticate::{
    ACCOUNT_VARIABLE, Authentication, CONFIG_FILE_NAME, CONFIG_VARIABLE, CredentialInputs,
    Credentials, authenticate, render_config, resolve_endpoint,
};
pub use download::download_asset;
pub use error::{SetupError, SetupResult};
pub use extract::{extract_archive, extract_tar, extract_zip};
pub use github::{
    DEFAULT_API_URL, GitHubClient, OWNER, REPO, Release, ReleaseAsset, ReleaseId,
    ReleaseRegistry, TOKEN_VARIABLES, token_from_env,
};
pub use install::{BINARY_NAME, DARWIN_BINARY_NAME, LocalInstallation, ensure_darwin_alias, install};
pub use platform::{ArchiveFormat, Platform};
pub use release::{LATEST, find_asset, resolve_release, select_asset};

/// Everything a run produced that must be published to later workflow steps
#[derive(Debug, Clone)]
pub struct SetupOutcome {
    pub release: Release,
    pub asset: ReleaseAsset,
    /// `None` for a dry run
    pub installation: Option<LocalInstallation>,
    pub authentication: Option<Authentication>,
}

impl SetupOutcome {
    /// Directories to add to the execution path
    pub fn path_entries(&self) -> Vec<PathBuf> {
        self.installation
            .iter()
            .map(|i| i.directory.clone())
            .collect()
    }

    /// Variables to export, in export order
    pub fn exports(&self) -> Vec<(String, String)> {
        self.authentication
            .as_ref()
            .map(Authentication::exports)
            .unwrap_or_default()
    }
}

/// Run the pipeline: resolve → match → install → authenticate.
///
/// The first failing stage aborts the run; nothing an earlier stage did is
/// rolled back.
pub async fn setup<R>(options: &SetupOptions, registry: &R) -> SetupResult<SetupOutcome>
where
    R: ReleaseRegistry + ?Sized,
{
    info!(
        "Setting up Exoscale CLI {} for {}",
        options.version, options.platform
    );

    let release = resolve_release(registry, &options.version).await?;
    let asset = find_asset(registry, &release, options.platform, &options.version).await?;

    if options.dry_run {
        info!(
            "Dry run: would install {} from {}",
            asset.name, asset.browser_download_url
        );
        return Ok(SetupOutcome {
            release,
            asset,
            installation: None,
            authentication: None,
        });
    }

    let installation = install(&asset, options.platform, &options.temp_dir).await?;

    let authentication = authenticate(
        options.credentials.as_ref(),
        &options.temp_dir,
        options.strict_auth,
    )
    .await?;

    Ok(SetupOutcome {
        release,
        asset,
        installation: Some(installation),
        authentication,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use release::tests::FakeRegistry;

    fn options(version: &str, platform: Platform) -> SetupOptions {
        SetupOptions {
            version: version.into(),
            platform,
            credentials: None,
            temp_dir: std::env::temp_dir(),
            api_url: DEFAULT_API_URL.into(),
            strict_auth: false,
            dry_run: true,
        }
    }

    #[tokio::test]
    async fn dry_run_stops_after_matching() {
        let registry = FakeRegistry::new(&[
            "exoscale-cli_1.80.0_darwin_all.tar.gz",
            "exoscale-cli_1.80.0_linux_amd64.tar.gz",
        ]);

        let outcome = setup(&options("latest", Platform::Linux), &registry)
            .await
            .unwrap();

        assert_eq!(outcome.release.id, ReleaseId(100));
        assert_eq!(outcome.asset.name, "exoscale-cli_1.80.0_linux_amd64.tar.gz");
        assert!(outcome.path_entries().is_empty());
        assert!(outcome.exports().is_empty());
    }

    #[tokio::test]
    async fn unknown_version_aborts_before_matching() {
        let registry = FakeRegistry::new(&["exoscale-cli_0.1.0_linux_amd64.tar.gz"]);
        let err = setup(&options("0.1.0", Platform::Linux), &registry)
            .await
            .unwrap_err();
        assert!(matches!(err, SetupError::VersionNotFound { .. }));
    }

    #[tokio::test]
    async fn missing_platform_asset_aborts() {
        let registry = FakeRegistry::new(&["exoscale-cli_1.2.3_linux_amd64.tar.gz"]);
        let err = setup(&options("1.2.3", Platform::Darwin), &registry)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Could not find an Exoscale CLI release for darwin for version 1.2.3."
        );
    }
}
