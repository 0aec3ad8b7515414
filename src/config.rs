use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::setup::{
    CredentialInputs, DEFAULT_API_URL, LATEST, Platform, SetupError, SetupResult,
};

/// Fallback scratch directory when the runner does not provide one
pub const DEFAULT_TEMP_DIR: &str = "/tmp";

/// Fully resolved options for one pipeline run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupOptions {
    pub version: String,
    pub platform: Platform,
    pub credentials: Option<CredentialInputs>,
    /// Where the archive is unpacked and the credentials file written
    pub temp_dir: PathBuf,
    pub api_url: String,
    pub strict_auth: bool,
    pub dry_run: bool,
}

/// One configuration layer; unset and empty values defer to lower layers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SetupOverrides {
    pub version: Option<String>,
    pub platform: Option<Platform>,
    pub temp_dir: Option<PathBuf>,
    pub api_url: Option<String>,
    pub strict_auth: Option<bool>,
    pub dry_run: Option<bool>,
    pub credentials: Option<CredentialInputs>,
}

impl SetupOverrides {
    /// Load a layer from a TOML file
    pub fn from_toml_file(path: &Path) -> SetupResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SetupError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| SetupError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Stack `upper` on top of `self`, field by field
    pub fn layer(self, upper: SetupOverrides) -> SetupOverrides {
        let credentials = match (self.credentials, upper.credentials) {
            (Some(lower), Some(upper)) => Some(CredentialInputs {
                account: pick(upper.account, lower.account),
                zone: pick(upper.zone, lower.zone),
                endpoint: pick(upper.endpoint, lower.endpoint),
                key: pick(upper.key, lower.key),
                secret: pick(upper.secret, lower.secret),
            }),
            (lower, upper) => upper.or(lower),
        };

        SetupOverrides {
            version: pick(upper.version, self.version),
            platform: upper.platform.or(self.platform),
            temp_dir: upper
                .temp_dir
                .filter(|p| !p.as_os_str().is_empty())
                .or(self.temp_dir),
            api_url: pick(upper.api_url, self.api_url),
            strict_auth: upper.strict_auth.or(self.strict_auth),
            dry_run: upper.dry_run.or(self.dry_run),
            credentials,
        }
    }
}

fn pick(upper: Option<String>, lower: Option<String>) -> Option<String> {
    upper
        .filter(|v| !v.is_empty())
        .or(lower.filter(|v| !v.is_empty()))
}

impl SetupOptions {
    /// Apply `overrides` to the defaults.
    ///
    /// `env` supplies `RUNNER_TEMP` and `GITHUB_API_URL` for the defaults of
    /// `temp_dir` and `api_url`; the platform defaults to the host.
    pub fn resolve<F>(overrides: SetupOverrides, env: F) -> SetupResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = SetupOverrides {
            version: Some(LATEST.to_string()),
            temp_dir: Some(PathBuf::from(
                pick(env("RUNNER_TEMP"), None).unwrap_or_else(|| DEFAULT_TEMP_DIR.to_string()),
            )),
            api_url: Some(
                pick(env("GITHUB_API_URL"), None).unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            ),
            ..SetupOverrides::default()
        };
        let merged = defaults.layer(overrides);

        let platform = match merged.platform {
            Some(platform) => platform,
            None => Platform::detect()?,
        };

        let version = merged
            .version
            .map(|v| {
                let v = v.trim();
                v.strip_prefix('v').unwrap_or(v).to_string()
            })
            .filter(|v| !v.is_empty())
            .ok_or_else(|| SetupError::Config("version must not be empty".into()))?;

        Ok(SetupOptions {
            version,
            platform,
            credentials: merged.credentials.filter(|c| !c.is_empty()),
            temp_dir: merged.temp_dir.unwrap_or_else(|| PathBuf::from(DEFAULT_TEMP_DIR)),
            api_url: merged.api_url.unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            strict_auth: merged.strict_auth.unwrap_or(false),
            dry_run: merged.dry_run.unwrap_or(false),
        })
    }

    /// Key and secret values that must never reach the log
    pub fn secrets(&self) -> Vec<&str> {
        self.credentials
            .iter()
            .flat_map(|c| [c.key.as_deref(), c.secret.as_deref()])
            .flatten()
            .filter(|v| !v.is_empty())
            .collect()
    }
}
