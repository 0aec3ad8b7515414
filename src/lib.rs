//! Exoscale CLI setup for GitHub Actions
//!
//! Resolves a release of `exoscale/cli`, installs the archive for the
//! requested platform and optionally writes the CLI credentials file.
//! The `workflow` module publishes the result to later job steps.

pub mod config;
pub mod setup;
pub mod workflow;
