use std::path::PathBuf;

use clap::Parser;

use setup_exoscale::config::SetupOverrides;
use setup_exoscale::setup::{CredentialInputs, Platform, SetupError, SetupResult};

/// Command-line arguments; each falls back to the matching action input.
///
/// The runner passes action inputs as `INPUT_<NAME>` variables and sets
/// unspecified ones to the empty string, which counts as unset.
#[derive(Parser, Debug)]
#[command(
    about = "Install the Exoscale CLI and configure its credentials",
    disable_version_flag = true
)]
pub struct Args {
    /// Exoscale CLI version to install, or "latest"
    #[arg(long, env = "INPUT_VERSION")]
    pub version: Option<String>,

    /// Platform to install for (defaults to the host)
    #[arg(long, env = "INPUT_PLATFORM")]
    pub platform: Option<String>,

    /// Exoscale account name
    #[arg(long, env = "INPUT_ACCOUNT")]
    pub account: Option<String>,

    /// Default Exoscale zone
    #[arg(long, env = "INPUT_ZONE")]
    pub zone: Option<String>,

    /// API endpoint (defaults to https://api-<zone>.exoscale.com/v2)
    #[arg(long, env = "INPUT_ENDPOINT")]
    pub endpoint: Option<String>,

    /// Exoscale API key
    #[arg(long, env = "INPUT_KEY", hide_env_values = true)]
    pub key: Option<String>,

    /// Exoscale API secret
    #[arg(long, env = "INPUT_SECRET", hide_env_values = true)]
    pub secret: Option<String>,

    /// Fail instead of skipping when credentials are only partially given (true/false)
    #[arg(long, env = "INPUT_STRICT_AUTH")]
    pub strict_auth: Option<String>,

    /// Resolve the release and asset without installing anything (true/false)
    #[arg(long, env = "INPUT_DRY_RUN")]
    pub dry_run: Option<String>,

    /// Directory for the extracted CLI and the credentials file
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// GitHub API base URL
    #[arg(long)]
    pub api_url: Option<String>,

    /// TOML file with default settings, overridden by flags and inputs
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl Args {
    /// The configuration layer given on the command line
    pub fn overrides(&self) -> SetupResult<SetupOverrides> {
        let credentials = CredentialInputs {
            account: self.account.clone(),
            zone: self.zone.clone(),
            endpoint: self.endpoint.clone(),
            key: self.key.clone(),
            secret: self.secret.clone(),
        };

        Ok(SetupOverrides {
            version: self.version.clone(),
            platform: non_empty(&self.platform)
                .map(str::parse::<Platform>)
                .transpose()?,
            temp_dir: self.temp_dir.clone(),
            api_url: self.api_url.clone(),
            strict_auth: parse_bool("strict-auth", &self.strict_auth)?,
            dry_run: parse_bool("dry-run", &self.dry_run)?,
            credentials: Some(credentials),
        })
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Boolean input in the YAML 1.2 core schema spelling the runner accepts
fn parse_bool(name: &str, value: &Option<String>) -> SetupResult<Option<bool>> {
    match non_empty(value) {
        None => Ok(None),
        Some("true" | "True" | "TRUE") => Ok(Some(true)),
        Some("false" | "False" | "FALSE") => Ok(Some(false)),
        Some(other) => Err(SetupError::Config(format!(
            "input {name} must be true or false, got {other:?}"
        ))),
    }
}
