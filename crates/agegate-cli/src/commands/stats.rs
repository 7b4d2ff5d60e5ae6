//! `agegate stats` — Show success and failure counts.

use clap::Args;

use crate::config::AgeGateConfig;

#[derive(Args, Debug)]
pub struct StatsArgs {}

pub async fn run(_args: &StatsArgs, config: &AgeGateConfig) -> anyhow::Result<()> {
    let engine = super::open_engine(config).await?;
    super::print_json(&engine.verification_stats().await)
}
