//! `agegate verify` — Run one verification.

use std::path::PathBuf;

use clap::Args;

use agegate_core::DocumentType;
use agegate_engine::VerificationOptions;
use agegate_factors::{BiometricOptions, DocumentOptions, FileHandle};

use crate::config::AgeGateConfig;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// biometric, document, device_settings or multi_factor.
    #[arg(short, long, default_value = "multi_factor")]
    pub method: String,

    /// drivers_license, passport, national_id or student_id.
    #[arg(short, long, default_value = "drivers_license")]
    pub document_type: String,

    /// Read the document from this file instead of the camera.
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Minimum liveness score for a biometric frame.
    #[arg(long)]
    pub min_liveness: Option<f64>,
}

pub async fn run(args: &VerifyArgs, config: &AgeGateConfig) -> anyhow::Result<()> {
    let document_type: DocumentType = args.document_type.parse()?;
    let document = match &args.file {
        Some(path) => DocumentOptions::file(
            document_type,
            FileHandle::new(path.to_string_lossy().into_owned()),
        ),
        None => DocumentOptions::camera(document_type),
    };
    let mut biometric = BiometricOptions::default();
    if let Some(min) = args.min_liveness {
        biometric.min_liveness = min;
    }
    let options = VerificationOptions::parse(&args.method)?
        .with_document(document)
        .with_biometric(biometric);

    let engine = super::open_engine(config).await?;
    let attempt = engine.start_verification(options).await?;
    super::print_json(&attempt)
}
