//! `agegate history` — List retained verification attempts.

use clap::Args;

use crate::config::AgeGateConfig;

#[derive(Args, Debug)]
pub struct HistoryArgs {
    /// Show only the N most recent attempts, newest first.
    #[arg(short, long)]
    pub limit: Option<usize>,
}

pub async fn run(args: &HistoryArgs, config: &AgeGateConfig) -> anyhow::Result<()> {
    let engine = super::open_engine(config).await?;
    let attempts = match args.limit {
        Some(limit) => engine.recent_history(limit).await,
        None => engine.verification_history().await,
    };
    super::print_json(&attempts)
}
