//! Error taxonomy for the setup pipeline

use std::path::PathBuf;

use thiserror::Error;

use super::platform::Platform;

/// Every failure a pipeline stage can raise.
///
/// Variants that map to something the user can fix (bad version, missing
/// platform asset, exhausted rate limit, incomplete credentials) carry a
/// message written for the workflow log. The rest wrap the underlying cause.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("Version {version} of the Exoscale CLI does not exist.")]
    VersionNotFound { version: String },

    #[error("Could not find an Exoscale CLI release for {platform} for version {version}.")]
    AssetNotFound { platform: Platform, version: String },

    #[error(
        "You have exceeded the GitHub API rate limit. \
         Please try again in {reset} seconds. \
         If you have not already done so, you can try authenticating calls to the GitHub API \
         by setting the `GITHUB_TOKEN` environment variable."
    )]
    RateLimited { reset: String },

    #[error("GitHub API request to {url} failed with HTTP {status}: {message}")]
    Registry {
        url: String,
        status: u16,
        message: String,
    },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(
        "No GitHub token is set. Set one of {0} on either `env:` or `with:`."
    )]
    MissingToken(String),

    #[error(
        "The GitHub token is specified more than once ({0}). \
         Use only one of `GITHUB_TOKEN`, `with.github_token` or `with.token`."
    )]
    AmbiguousToken(String),

    #[error("Failed to download {url}: {message}")]
    Download { url: String, message: String },

    #[error("Failed to extract {}: {message}", archive.display())]
    Extraction { archive: PathBuf, message: String },

    #[error("Failed to link {} to {}: {source}", link.display(), target.display())]
    Link {
        link: PathBuf,
        target: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(
        "Cannot authenticate the Exoscale CLI without all authentication options. \
         Missing: {}. Please provide account, zone, key and secret.",
        missing.join(", ")
    )]
    AuthInputIncomplete { missing: Vec<&'static str> },

    #[error("Unsupported platform: {0}")]
    UnsupportedPlatform(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl SetupError {
    /// Status code of a failed registry call, if that is what this is.
    pub fn registry_status(&self) -> Option<u16> {
        match self {
            SetupError::Registry { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type SetupResult<T> = Result<T, SetupError>;
