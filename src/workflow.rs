//! GitHub Actions workflow surface
//!
//! Publishes a [`SetupOutcome`] to later steps of the job through the
//! runner's `GITHUB_PATH` and `GITHUB_ENV` files, and prints workflow
//! commands (`::error::`, `::add-mask::`, ...) on stdout.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use log::{info, warn};

use crate::setup::SetupOutcome;

/// Handles to the runner's command files
#[derive(Debug, Clone, Default)]
pub struct Workflow {
    path_file: Option<PathBuf>,
    env_file: Option<PathBuf>,
}

impl Workflow {
    pub fn new(path_file: Option<PathBuf>, env_file: Option<PathBuf>) -> Self {
        Self {
            path_file,
            env_file,
        }
    }

    /// Locate the command files from `GITHUB_PATH` / `GITHUB_ENV`
    pub fn from_env() -> Self {
        let file = |name: &str| {
            std::env::var_os(name)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
        };
        Self::new(file("GITHUB_PATH"), file("GITHUB_ENV"))
    }

    /// Make `dir` part of the execution path of subsequent steps
    pub fn add_path(&self, dir: &Path) -> Result<()> {
        let Some(path_file) = &self.path_file else {
            warn!(
                "GITHUB_PATH is not set; add {} to PATH manually to use the CLI",
                dir.display()
            );
            return Ok(());
        };

        append(path_file, &format!("{}\n", dir.display()))?;
        info!("Added {} to the path", dir.display());
        Ok(())
    }

    /// Export `name=value` to subsequent steps
    pub fn export_variable(&self, name: &str, value: &str) -> Result<()> {
        let Some(env_file) = &self.env_file else {
            warn!("GITHUB_ENV is not set; export {name}={value} manually");
            return Ok(());
        };

        let delimiter = format!("ghadelimiter_{}", uuid::Uuid::new_v4());
        if name.contains(&delimiter) || value.contains(&delimiter) {
            bail!("Unexpected input: {name} contains the delimiter {delimiter}");
        }

        append(env_file, &format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))?;
        info!("Exported {name}");
        Ok(())
    }

    /// Publish every path entry and variable of `outcome`
    pub fn apply(&self, outcome: &SetupOutcome) -> Result<()> {
        for dir in outcome.path_entries() {
            self.add_path(&dir)?;
        }
        for (name, value) in outcome.exports() {
            self.export_variable(&name, &value)?;
        }
        Ok(())
    }
}

fn append(file: &Path, contents: &str) -> Result<()> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(file)
        .and_then(|mut f| f.write_all(contents.as_bytes()))
        .with_context(|| format!("Failed to append to {}", file.display()))
}

/// Escape a workflow command payload
pub fn escape_data(data: &str) -> String {
    data.replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

fn command(name: &str, message: &str) -> String {
    format!("::{name}::{}", escape_data(message))
}

/// Mark the step as failed with `message`; the caller exits non-zero
pub fn set_failed(message: &str) {
    println!("{}", command("error", message));
}

pub fn notice(message: &str) {
    println!("{}", command("notice", message));
}

/// Hide `secret` from every later log line of the job
pub fn mask(secret: &str) {
    println!("{}", command("add-mask", secret));
}

pub fn group(title: &str) {
    println!("{}", command("group", title));
}

pub fn end_group() {
    println!("::endgroup::");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::setup::{
        Authentication, LocalInstallation, Release, ReleaseAsset, ReleaseId,
    };

    fn outcome(dir: &Path, authenticated: bool) -> SetupOutcome {
        SetupOutcome {
            release: Release {
                id: ReleaseId(1),
                tag_name: "v1.0.0".into(),
            },
            asset: ReleaseAsset {
                name: "exoscale-cli_1.0.0_linux_amd64.tar.gz".into(),
                browser_download_url: "https://example.invalid/a".into(),
                size: 0,
            },
            installation: Some(LocalInstallation {
                directory: dir.join("cli"),
            }),
            authentication: authenticated.then(|| Authentication {
                config_path: dir.join("exoscale-config.toml"),
                account: "acme".into(),
            }),
        }
    }

    #[test]
    fn escapes_command_data() {
        assert_eq!(escape_data("50%\r\nnext"), "50%25%0D%0Anext");
        assert_eq!(command("error", "a\nb"), "::error::a%0Ab");
    }

    #[test]
    fn applies_path_and_exports() {
        let dir = tempfile::tempdir().unwrap();
        let path_file = dir.path().join("path");
        let env_file = dir.path().join("env");
        let workflow = Workflow::new(Some(path_file.clone()), Some(env_file.clone()));

        workflow.apply(&outcome(dir.path(), true)).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path_file).unwrap(),
            format!("{}\n", dir.path().join("cli").display())
        );

        let env = std::fs::read_to_string(&env_file).unwrap();
        let lines: Vec<&str> = env.lines().collect();
        assert_eq!(lines.len(), 6);
        let (name, delimiter) = lines[0].split_once("<<").unwrap();
        assert_eq!(name, "EXOSCALE_CONFIG");
        assert!(delimiter.starts_with("ghadelimiter_"));
        assert_eq!(
            lines[1],
            dir.path().join("exoscale-config.toml").display().to_string()
        );
        assert_eq!(lines[2], delimiter);
        assert!(lines[3].starts_with("EXOSCALE_ACCOUNT<<"));
        assert_eq!(lines[4], "acme");
    }

    #[test]
    fn unauthenticated_run_exports_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let env_file = dir.path().join("env");
        let workflow = Workflow::new(Some(dir.path().join("path")), Some(env_file.clone()));

        workflow.apply(&outcome(dir.path(), false)).unwrap();

        assert!(!env_file.exists());
    }

    #[test]
    fn missing_command_files_are_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        Workflow::default()
            .apply(&outcome(dir.path(), true))
            .unwrap();
    }
}
