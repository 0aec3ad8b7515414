//! Exoscale CLI credentials file

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

use super::error::{SetupError, SetupResult};

/// File name of the rendered configuration inside the temp directory
pub const CONFIG_FILE_NAME: &str = "exoscale-config.toml";

pub const CONFIG_VARIABLE: &str = "EXOSCALE_CONFIG";
pub const ACCOUNT_VARIABLE: &str = "EXOSCALE_ACCOUNT";

/// Credential inputs as supplied; any field may be missing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CredentialInputs {
    pub account: Option<String>,
    pub zone: Option<String>,
    pub endpoint: Option<String>,
    pub key: Option<String>,
    pub secret: Option<String>,
}

/// A complete set of credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub account: String,
    pub zone: String,
    pub endpoint: Option<String>,
    pub key: String,
    pub secret: String,
}

/// Result of the authentication stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Authentication {
    pub config_path: PathBuf,
    pub account: String,
}

impl Authentication {
    /// Variables the CLI reads to locate its configuration
    pub fn exports(&self) -> Vec<(String, String)> {
        vec![
            (
                CONFIG_VARIABLE.to_string(),
                self.config_path.display().to_string(),
            ),
            (ACCOUNT_VARIABLE.to_string(), self.account.clone()),
        ]
    }
}

impl CredentialInputs {
    /// True when no field carries a value
    pub fn is_empty(&self) -> bool {
        self.missing_fields().len() == 4 && non_empty(&self.endpoint).is_none()
    }

    /// Required fields that are absent or empty
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("account", &self.account),
            ("zone", &self.zone),
            ("key", &self.key),
            ("secret", &self.secret),
        ]
        .into_iter()
        .filter(|(_, value)| non_empty(value).is_none())
        .map(|(name, _)| name)
        .collect()
    }

    /// Complete credentials, or `None` if a required field is missing
    pub fn complete(&self) -> Option<Credentials> {
        Some(Credentials {
            account: non_empty(&self.account)?.to_string(),
            zone: non_empty(&self.zone)?.to_string(),
            endpoint: non_empty(&self.endpoint).map(str::to_string),
            key: non_empty(&self.key)?.to_string(),
            secret: non_empty(&self.secret)?.to_string(),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// API endpoint for `zone` unless one was given explicitly
pub fn resolve_endpoint(zone: &str, endpoint: Option<&str>) -> String {
    match endpoint {
        Some(endpoint) if !endpoint.is_empty() => endpoint.to_string(),
        _ => format!("https://api-{zone}.exoscale.com/v2"),
    }
}

/// Render the CLI configuration document.
///
/// Values are embedded verbatim.
pub fn render_config(credentials: &Credentials) -> String {
    let Credentials {
        account,
        zone,
        key,
        secret,
        ..
    } = credentials;
    let endpoint = resolve_endpoint(zone, credentials.endpoint.as_deref());

    format!(
        "defaultaccount = '{account}'\n\
         \n\
         [[accounts]]\n\
         defaultZone = '{zone}'\n\
         key = '{key}'\n\
         name = '{account}'\n\
         secret = '{secret}'\n\
         endpoint = '{endpoint}'\n\
         environment = ''\n\
         sosendpoint = 'https://sos-{zone}.exo.io'\n"
    )
}

fn skip_reason(inputs: Option<&CredentialInputs>) -> String {
    match inputs.filter(|i| !i.is_empty()) {
        Some(inputs) => format!(
            "Not authenticating the Exoscale CLI: missing {}.",
            inputs.missing_fields().join(", ")
        ),
        None => "Not authenticating the Exoscale CLI as no authentication options were provided."
            .to_string(),
    }
}

/// Write the credentials file into `temp_dir`.
///
/// Returns `Ok(None)` when authentication is skipped: no inputs at all, or
/// incomplete inputs while `strict` is off. With `strict` on, incomplete
/// inputs fail with `AuthInputIncomplete`.
pub async fn authenticate(
    inputs: Option<&CredentialInputs>,
    temp_dir: &Path,
    strict: bool,
) -> SetupResult<Option<Authentication>> {
    let Some(credentials) = inputs.and_then(CredentialInputs::complete) else {
        if let Some(inputs) = inputs.filter(|i| strict && !i.is_empty()) {
            return Err(SetupError::AuthInputIncomplete {
                missing: inputs.missing_fields(),
            });
        }
        info!("{}", skip_reason(inputs));
        return Ok(None);
    };

    info!("Authenticating the Exoscale CLI as {}.", credentials.account);

    let config_path = temp_dir.join(CONFIG_FILE_NAME);
    tokio::fs::write(&config_path, render_config(&credentials))
        .await
        .map_err(|source| SetupError::FileWrite {
            path: config_path.clone(),
            source,
        })?;

    Ok(Some(Authentication {
        config_path,
        account: credentials.account,
    }))
}
