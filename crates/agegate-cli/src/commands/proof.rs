//! `agegate proof` — Show the anonymous proof of the latest verification.

use clap::Args;

use crate::config::AgeGateConfig;

#[derive(Args, Debug)]
pub struct ProofArgs {}

/// Prints `null` when the latest attempt is missing or unverified.
pub async fn run(_args: &ProofArgs, config: &AgeGateConfig) -> anyhow::Result<()> {
    let engine = super::open_engine(config).await?;
    super::print_json(&engine.verification_proof().await)
}
