//! `agegate clear` — Erase all stored verification data.

use clap::Args;

use crate::config::AgeGateConfig;

#[derive(Args, Debug)]
pub struct ClearArgs {}

pub async fn run(_args: &ClearArgs, config: &AgeGateConfig) -> anyhow::Result<()> {
    let engine = super::open_engine(config).await?;
    engine.clear_verification_data().await;
    println!("Verification data cleared for {}", engine.device_id());
    Ok(())
}
