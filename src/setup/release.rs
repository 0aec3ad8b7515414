//! Version → release resolution and release → platform asset matching

use log::info;

use super::error::{SetupError, SetupResult};
use super::github::{Release, ReleaseAsset, ReleaseRegistry};
use super::platform::Platform;

pub const LATEST: &str = "latest";

/// Resolve a requested version (`latest` or a bare semantic version) to a release.
///
/// Specific versions are looked up by the `v<version>` tag. A 404 for a
/// specific version becomes `VersionNotFound`; every other failure is
/// returned unchanged.
pub async fn resolve_release<R>(registry: &R, version: &str) -> SetupResult<Release>
where
    R: ReleaseRegistry + ?Sized,
{
    if version == LATEST {
        let release = registry.latest_release().await?;
        info!("Latest Exoscale CLI release is {}", release.tag_name);
        return Ok(release);
    }

    let tag = format!("v{version}");
    match registry.release_by_tag(&tag).await {
        Ok(release) => {
            info!("Resolved Exoscale CLI {version} to release {}", release.id.0);
            Ok(release)
        }
        Err(e) if e.registry_status() == Some(404) => Err(SetupError::VersionNotFound {
            version: version.to_string(),
        }),
        Err(e) => Err(e),
    }
}

/// Select the first asset whose name ends with the platform suffix
pub fn select_asset(assets: Vec<ReleaseAsset>, platform: Platform) -> Option<ReleaseAsset> {
    let suffix = platform.asset_suffix();
    assets.into_iter().find(|asset| asset.name.ends_with(suffix))
}

/// List the release's assets and pick the one for `platform`
pub async fn find_asset<R>(
    registry: &R,
    release: &Release,
    platform: Platform,
    version: &str,
) -> SetupResult<ReleaseAsset>
where
    R: ReleaseRegistry + ?Sized,
{
    let assets = registry.release_assets(release.id).await?;
    let asset = select_asset(assets, platform).ok_or_else(|| SetupError::AssetNotFound {
        platform,
        version: version.to_string(),
    })?;

    info!("Selected asset {} for {platform}", asset.name);
    Ok(asset)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::setup::github::ReleaseId;
    use async_trait::async_trait;
    use std::sync::Mutex;

    /// In-memory registry recording the tags it was asked for
    pub(crate) struct FakeRegistry {
        pub latest: Release,
        pub tagged: Vec<Release>,
        pub assets: Vec<ReleaseAsset>,
        pub requested_tags: Mutex<Vec<String>>,
    }

    impl FakeRegistry {
        pub(crate) fn new(assets: &[&str]) -> Self {
            Self {
                latest: Release {
                    id: ReleaseId(100),
                    tag_name: "v1.80.0".into(),
                },
                tagged: vec![Release {
                    id: ReleaseId(42),
                    tag_name: "v1.2.3".into(),
                }],
                assets: assets
                    .iter()
                    .map(|name| ReleaseAsset {
                        name: name.to_string(),
                        browser_download_url: format!("https://example.invalid/{name}"),
                        size: 0,
                    })
                    .collect(),
                requested_tags: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReleaseRegistry for FakeRegistry {
        async fn latest_release(&self) -> SetupResult<Release> {
            Ok(self.latest.clone())
        }

        async fn release_by_tag(&self, tag: &str) -> SetupResult<Release> {
            self.requested_tags.lock().unwrap().push(tag.to_string());
            self.tagged
                .iter()
                .find(|r| r.tag_name == tag)
                .cloned()
                .ok_or_else(|| SetupError::Registry {
                    url: format!("fake://releases/tags/{tag}"),
                    status: 404,
                    message: "Not Found".into(),
                })
        }

        async fn release_assets(&self, _release: ReleaseId) -> SetupResult<Vec<ReleaseAsset>> {
            Ok(self.assets.clone())
        }
    }

    const ALL_ASSETS: [&str; 5] = [
        "checksums.txt",
        "exoscale-cli_1.2.3_darwin_all.tar.gz",
        "exoscale-cli_1.2.3_linux_amd64.tar.gz",
        "exoscale-cli_1.2.3_linux_arm64.tar.gz",
        "exoscale-cli_1.2.3_windows_amd64.zip",
    ];

    #[tokio::test]
    async fn latest_resolves_to_most_recent_release() {
        let registry = FakeRegistry::new(&[]);
        let release = resolve_release(&registry, "latest").await.unwrap();
        assert_eq!(release.id, ReleaseId(100));
        assert!(registry.requested_tags.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn specific_version_requests_v_prefixed_tag() {
        let registry = FakeRegistry::new(&[]);
        let release = resolve_release(&registry, "1.2.3").await.unwrap();
        assert_eq!(release.id, ReleaseId(42));
        assert_eq!(*registry.requested_tags.lock().unwrap(), ["v1.2.3"]);
    }

    #[tokio::test]
    async fn missing_version_is_version_not_found() {
        let registry = FakeRegistry::new(&[]);
        let err = resolve_release(&registry, "9.9.9").await.unwrap_err();
        assert!(matches!(&err, SetupError::VersionNotFound { version } if version == "9.9.9"));
        assert_eq!(
            err.to_string(),
            "Version 9.9.9 of the Exoscale CLI does not exist."
        );
    }

    #[test]
    fn each_platform_selects_its_own_suffix() {
        for platform in Platform::ALL {
            let registry = FakeRegistry::new(&ALL_ASSETS);
            let asset = select_asset(registry.assets, platform).unwrap();
            assert!(asset.name.ends_with(platform.asset_suffix()));
            for other in Platform::ALL.iter().filter(|p| **p != platform) {
                assert!(!asset.name.ends_with(other.asset_suffix()));
            }
        }
    }

    #[test]
    fn first_match_wins() {
        let registry = FakeRegistry::new(&[
            "a_linux_amd64.tar.gz",
            "b_linux_amd64.tar.gz",
        ]);
        let asset = select_asset(registry.assets, Platform::Linux).unwrap();
        assert_eq!(asset.name, "a_linux_amd64.tar.gz");
    }

    #[tokio::test]
    async fn missing_asset_names_platform_and_version() {
        let registry = FakeRegistry::new(&["exoscale-cli_1.2.3_linux_amd64.tar.gz"]);
        let release = registry.latest.clone();
        let err = find_asset(&registry, &release, Platform::Windows, "1.2.3")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            SetupError::AssetNotFound { platform: Platform::Windows, ref version } if version == "1.2.3"
        ));
    }
}
