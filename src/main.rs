mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};

use setup_exoscale::config::{SetupOptions, SetupOverrides};
use setup_exoscale::setup::{GitHubClient, setup, token_from_env};
use setup_exoscale::workflow::{self, Workflow};

fn main() {
    env_logger::Builder::new()
        .format(|buf, record| {
            use std::io::Write;
            writeln!(
                buf,
                "[{} {} {}:{}] {}",
                buf.timestamp_millis(),
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            workflow::set_failed(&format!("Failed to create Tokio runtime: {e}"));
            std::process::exit(1);
        }
    };

    // Single catch point: every stage error ends up here
    if let Err(e) = rt.block_on(real_main()) {
        error!("{e:#}");
        workflow::set_failed(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn real_main() -> Result<()> {
    let args = cli::Args::parse();

    let base = match &args.config {
        Some(path) => SetupOverrides::from_toml_file(path)?,
        None => SetupOverrides::default(),
    };
    let options = SetupOptions::resolve(base.layer(args.overrides()?), |name| {
        std::env::var(name).ok()
    })?;

    for secret in options.secrets() {
        workflow::mask(secret);
    }

    let token = token_from_env(|name| std::env::var(name).ok())?;
    let registry = GitHubClient::new(&options.api_url, Some(token))?;

    workflow::group("Set up Exoscale CLI");
    let outcome = setup(&options, &registry).await;
    workflow::end_group();
    let outcome = outcome?;

    Workflow::from_env()
        .apply(&outcome)
        .context("Failed to publish the installation to later steps")?;

    match &outcome.installation {
        Some(installation) => workflow::notice(&format!(
            "Exoscale CLI {} installed in {}",
            outcome.release.tag_name,
            installation.directory.display()
        )),
        None => info!(
            "Exoscale CLI {} resolved to {}",
            outcome.release.tag_name, outcome.asset.browser_download_url
        ),
    }

    Ok(())
}
