//! `agegate status` — Show the current verification status.

use clap::Args;
use serde::Serialize;

use agegate_core::VerificationStatus;

use crate::config::AgeGateConfig;

#[derive(Args, Debug)]
pub struct StatusArgs {}

#[derive(Serialize)]
struct StatusReport {
    device_id: String,
    available: bool,
    #[serde(flatten)]
    status: VerificationStatus,
}

pub async fn run(_args: &StatusArgs, config: &AgeGateConfig) -> anyhow::Result<()> {
    let engine = super::open_engine(config).await?;
    let report = StatusReport {
        device_id: engine.device_id().to_string(),
        available: engine.is_available(),
        status: engine.verification_status().await,
    };
    super::print_json(&report)
}
