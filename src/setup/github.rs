//! GitHub release API interaction

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, LINK};
use reqwest::{Response, StatusCode};
use serde::Deserialize;
use url::Url;

use super::error::{SetupError, SetupResult};

/// Upstream project the CLI is released from
pub const OWNER: &str = "exoscale";
pub const REPO: &str = "cli";

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Environment variables that may carry a GitHub token, in lookup order
pub const TOKEN_VARIABLES: [&str; 3] = ["GITHUB_TOKEN", "INPUT_GITHUB_TOKEN", "INPUT_TOKEN"];

const USER_AGENT: &str = concat!("setup-exoscale/", env!("CARGO_PKG_VERSION"));
const API_TIMEOUT: Duration = Duration::from_secs(30);
const ASSETS_PER_PAGE: u32 = 100;

static NEXT_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<([^>]+)>\s*;\s*rel="next""#).expect("next link pattern is valid")
});

/// Identifier of a published release
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(transparent)]
pub struct ReleaseId(pub u64);

/// GitHub release metadata from API
#[derive(Deserialize, Debug, Clone)]
pub struct Release {
    pub id: ReleaseId,
    pub tag_name: String,
}

/// GitHub release asset metadata
#[derive(Deserialize, Debug, Clone)]
pub struct ReleaseAsset {
    pub name: String,
    pub browser_download_url: String,
    #[serde(default)]
    pub size: u64,
}

/// Read access to the upstream project's releases
#[async_trait]
pub trait ReleaseRegistry: Send + Sync {
    /// Most recent published release
    async fn latest_release(&self) -> SetupResult<Release>;

    /// Release carrying the exact `tag`
    async fn release_by_tag(&self, tag: &str) -> SetupResult<Release>;

    /// Every asset attached to a release, across all pages
    async fn release_assets(&self, release: ReleaseId) -> SetupResult<Vec<ReleaseAsset>>;
}

/// Pick the GitHub token from the candidate variables.
///
/// Empty values count as unset. Exactly one candidate must be populated.
pub fn token_from_env<F>(lookup: F) -> SetupResult<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut defined: Vec<(&str, String)> = TOKEN_VARIABLES
        .iter()
        .filter_map(|name| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .map(|value| (*name, value))
        })
        .collect();

    match defined.len() {
        0 => Err(SetupError::MissingToken(TOKEN_VARIABLES.join(", "))),
        1 => Ok(defined.remove(0).1),
        _ => Err(SetupError::AmbiguousToken(
            defined
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>()
                .join(", "),
        )),
    }
}

/// REST client for `GET /repos/{owner}/{repo}/releases/...`
pub struct GitHubClient {
    client: reqwest::Client,
    api_url: Url,
    token: Option<String>,
}

impl GitHubClient {
    pub fn new(api_url: &str, token: Option<String>) -> SetupResult<Self> {
        let api_url = Url::parse(api_url)
            .map_err(|e| SetupError::Config(format!("invalid GitHub API URL {api_url}: {e}")))?;

        if token.is_none() {
            warn!(
                "No GitHub token found in {}; using unauthenticated API requests with a lower rate limit",
                TOKEN_VARIABLES.join(", ")
            );
        }

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(API_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            api_url,
            token,
        })
    }

    /// `<api>/repos/{OWNER}/{REPO}/<segments..>`, each segment percent-encoded
    fn endpoint(&self, segments: &[&str]) -> SetupResult<Url> {
        let mut url = self.api_url.clone();
        url.path_segments_mut()
            .map_err(|_| SetupError::Config(format!("GitHub API URL {} cannot be a base", self.api_url)))?
            .pop_if_empty()
            .extend(["repos", OWNER, REPO])
            .extend(segments);
        Ok(url)
    }

    async fn get(&self, url: Url) -> SetupResult<Response> {
        debug!("GET {url}");
        let mut request = self
            .client
            .get(url.clone())
            .header(ACCEPT, "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28");
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {token}"));
        }

        let response = request.send().await?;
        check_response(url.as_str(), response).await
    }
}

#[async_trait]
impl ReleaseRegistry for GitHubClient {
    async fn latest_release(&self) -> SetupResult<Release> {
        let response = self.get(self.endpoint(&["releases", "latest"])?).await?;
        Ok(response.json().await?)
    }

    async fn release_by_tag(&self, tag: &str) -> SetupResult<Release> {
        let response = self.get(self.endpoint(&["releases", "tags", tag])?).await?;
        Ok(response.json().await?)
    }

    async fn release_assets(&self, release: ReleaseId) -> SetupResult<Vec<ReleaseAsset>> {
        let id = release.0.to_string();
        let mut url = self.endpoint(&["releases", &id, "assets"])?;
        url.query_pairs_mut()
            .append_pair("per_page", &ASSETS_PER_PAGE.to_string());

        let mut assets = Vec::new();
        let mut next = Some(url);
        while let Some(page_url) = next.take() {
            let response = self.get(page_url).await?;
            next = next_page(response.headers())?;
            let page: Vec<ReleaseAsset> = response.json().await?;
            debug!("Fetched {} assets for release {}", page.len(), release.0);
            assets.extend(page);
        }

        Ok(assets)
    }
}

/// Turn a non-success response into the matching `SetupError`
async fn check_response(url: &str, response: Response) -> SetupResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if matches!(status, StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS)
        && header_str(response.headers(), "x-ratelimit-remaining") == Some("0")
    {
        let reset = header_str(response.headers(), "x-ratelimit-reset")
            .unwrap_or("unknown")
            .to_string();
        return Err(SetupError::RateLimited { reset });
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ApiErrorBody>(&body)
        .map(|b| b.message)
        .unwrap_or(body);

    Err(SetupError::Registry {
        url: url.to_string(),
        status: status.as_u16(),
        message,
    })
}

#[derive(Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Extract the `rel="next"` target from a `Link` header
fn next_page(headers: &HeaderMap) -> SetupResult<Option<Url>> {
    let Some(link) = header_str(headers, LINK.as_str()) else {
        return Ok(None);
    };

    NEXT_LINK
        .captures(link)
        .map(|caps| {
            Url::parse(&caps[1])
                .map_err(|e| SetupError::Config(format!("invalid pagination link {}: {e}", &caps[1])))
        })
        .transpose()
}
