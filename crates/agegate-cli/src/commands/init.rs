//! `agegate init` — Write a default configuration with a fresh device id.

use std::path::{Path, PathBuf};

use clap::Args;

use agegate_core::DeviceId;

use crate::config::AgeGateConfig;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,

    /// Data directory for the file store.
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
}

pub fn run(args: &InitArgs, path: &Path) -> anyhow::Result<()> {
    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite",
            path.display()
        );
    }

    let mut config = AgeGateConfig::default();
    config.device.device_id = Some(DeviceId::generate().to_string());
    if let Some(dir) = &args.data_dir {
        config.storage.data_dir = dir.clone();
    }
    config.save(path)?;
    tracing::info!(path = %path.display(), "wrote default config");

    println!("Wrote {}", path.display());
    if let Some(id) = &config.device.device_id {
        println!("  Device ID:  {}", id);
    }
    println!("  Data dir:   {}", config.storage.data_dir.display());
    Ok(())
}
