//! Streaming asset download

use std::path::{Path, PathBuf};
use std::time::Duration;

use futures::StreamExt;
use log::{debug, info};
use tokio::io::AsyncWriteExt;
use tokio::time::timeout;

use super::error::{SetupError, SetupResult};
use super::github::ReleaseAsset;

const DOWNLOAD_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const DOWNLOAD_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(300); // 5 min no data

const USER_AGENT: &str = concat!("setup-exoscale/", env!("CARGO_PKG_VERSION"));

/// Download `asset` into `dir`, returning the path of the written archive
pub async fn download_asset(asset: &ReleaseAsset, dir: &Path) -> SetupResult<PathBuf> {
    let url = asset.browser_download_url.as_str();
    let download_error = |message: String| SetupError::Download {
        url: url.to_string(),
        message,
    };

    // Asset names come from the registry; never let one escape `dir`
    let file_name = Path::new(&asset.name)
        .file_name()
        .ok_or_else(|| download_error(format!("invalid asset name {:?}", asset.name)))?;
    let archive_path = dir.join(file_name);

    info!("Downloading {url}");
    let client = reqwest::Client::builder()
        .connect_timeout(DOWNLOAD_CONNECT_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()?;
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| download_error(e.to_string()))?;

    if !response.status().is_success() {
        return Err(download_error(format!("HTTP {}", response.status())));
    }

    let mut file = tokio::fs::File::create(&archive_path)
        .await
        .map_err(|source| SetupError::FileWrite {
            path: archive_path.clone(),
            source,
        })?;

    let mut stream = response.bytes_stream();
    let mut downloaded: u64 = 0;

    loop {
        let chunk = match timeout(DOWNLOAD_INACTIVITY_TIMEOUT, stream.next()).await {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(Some(Err(e))) => return Err(download_error(e.to_string())),
            Ok(None) => break,
            Err(_) => {
                return Err(download_error(format!(
                    "no data received for {} seconds after {downloaded} bytes",
                    DOWNLOAD_INACTIVITY_TIMEOUT.as_secs()
                )));
            }
        };

        file.write_all(&chunk)
            .await
            .map_err(|source| SetupError::FileWrite {
                path: archive_path.clone(),
                source,
            })?;
        downloaded += chunk.len() as u64;
    }

    file.flush().await.map_err(|source| SetupError::FileWrite {
        path: archive_path.clone(),
        source,
    })?;

    debug!(
        "Downloaded {downloaded} of {} bytes to {}",
        asset.size,
        archive_path.display()
    );
    Ok(archive_path)
}
