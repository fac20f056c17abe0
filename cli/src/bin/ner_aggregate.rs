//! Aggregates every annotator's validated output and reports their pairwise agreement.
//!
//! **Usage:**
//! ```bash
//! ner-aggregate [--config <file>] [--output-dir <dir>] [--log-dir <dir>] [--identity <col>...] [--out <file>]
//! ```

use clap::Parser;
use ner_validator::{
    collect_annotations, compute_agreement, pivot, NerError, ValidatorConfig, ANNOTATOR_COLUMN,
};
use std::path::PathBuf;
use tracing::{error, info};

/// Annotation aggregation and agreement
#[derive(Parser, Debug)]
#[clap(name = "ner-aggregate")]
#[clap(about = "Aggregate validated IOB annotations and compute inter-annotator agreement")]
struct Args {
    /// Project configuration (TOML). Defaults are used when absent
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Directory holding the annotator outputs (overrides the configuration)
    #[clap(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Directory holding the progress logs (overrides the configuration)
    #[clap(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Identity column of a sample; repeat for several (overrides the configuration)
    #[clap(long = "identity", value_name = "COLUMN")]
    identity: Vec<String>,

    /// Write the wide table as JSON Lines to this file
    #[clap(long, value_name = "FILE")]
    out: Option<PathBuf>,
}

fn run(args: Args) -> Result<(), NerError> {
    let config = match &args.config {
        Some(path) => ValidatorConfig::from_file(path)?,
        None => ValidatorConfig::default(),
    };
    let paths = config.paths();
    let output_dir = args
        .output_dir
        .unwrap_or_else(|| paths.output_dir().to_path_buf());
    let log_dir = args
        .log_dir
        .unwrap_or_else(|| paths.log_dir().to_path_buf());
    let identity = if args.identity.is_empty() {
        config.identity_columns().to_vec()
    } else {
        args.identity
    };

    let combined = collect_annotations(&output_dir, &log_dir)?;
    let wide = pivot(&combined, &identity, ANNOTATOR_COLUMN)?;
    info!(
        "{} samples by {} annotators",
        wide.len(),
        wide.annotators().len()
    );
    if let Some(out) = &args.out {
        wide.write_json_lines(out)?;
        info!("Wide table written to {}", out.display());
    }
    print!("{}", compute_agreement(&wide));
    Ok(())
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{}", e);
        std::process::exit(1);
    }
}
