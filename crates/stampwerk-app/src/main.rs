// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stampwerk — split a sheet of online postage vouchers into one vector label
// per stamp.
//
// Entry point. Parses flags, initialises logging, runs the pipeline and turns
// any failure into a plain-language message.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use stampwerk_core::{RunConfig, StampError};
use stampwerk_core::human_errors::humanize_error;
use stampwerk_document::RunSummary;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"WORKING DIRECTORY:
  The directory given by --dir must contain:
    Briefmarke*.pdf          the voucher sheet (first match by name is used)
    label.svg, im.svg        label background and logo
    ayar.ttf                 font for date and price
    NotoMono-Regular.ttf     font for the voucher identifier

  Labels are written next to them as qr0.pdf, qr1.pdf, ...

  WARNING: every existing qr<number>.pdf in the directory is deleted before
  a run writes new labels. There is no confirmation prompt.

EXAMPLES:
  stampwerk
  stampwerk --dir ~/Downloads/porto --scale 2
  stampwerk --strict-pairing -v
"#;

/// Split a postage voucher sheet into one vector label PDF per voucher.
#[derive(Parser, Debug)]
#[command(
    name = "stampwerk",
    version,
    about = "Split a postage voucher sheet into one vector label PDF per voucher",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Working directory holding the sheet, the assets and the labels.
    #[arg(short, long, env = "STAMPWERK_DIR", default_value = ".")]
    dir: PathBuf,

    /// Output resolution: the label canvas is 130x214 points times this.
    #[arg(long, env = "STAMPWERK_SCALE", default_value_t = 4.0)]
    scale: f32,

    /// Worker threads for label composition (default: all cores).
    #[arg(short, long, env = "STAMPWERK_JOBS")]
    jobs: Option<usize>,

    /// Fail when the sheet has fewer text blocks than its vouchers need.
    #[arg(long, env = "STAMPWERK_STRICT_PAIRING")]
    strict_pairing: bool,

    /// Print the effective configuration as JSON and exit.
    #[arg(long)]
    print_config: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STAMPWERK_VERBOSE", conflicts_with = "quiet")]
    verbose: bool,

    /// Only report warnings and errors.
    #[arg(short, long, env = "STAMPWERK_QUIET")]
    quiet: bool,
}

impl Cli {
    fn config(&self) -> RunConfig {
        let defaults = RunConfig::default();
        RunConfig {
            working_dir: self.dir.clone(),
            scale: self.scale,
            jobs: self.jobs.unwrap_or(defaults.jobs),
            strict_pairing: self.strict_pairing,
            ..defaults
        }
    }

    fn log_filter(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_filter())),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = cli.config();

    if cli.print_config {
        return match print_config(&config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(err) => {
                eprintln!("error: {err:#}");
                ExitCode::FAILURE
            }
        };
    }

    tracing::info!(dir = %config.working_dir.display(), "Stampwerk starting");

    match stampwerk_document::run(&config) {
        Ok(summary) => {
            if !cli.quiet {
                print_summary(&summary);
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::debug!(error = ?err, "Run failed");
            eprint!("{}", failure_report(&err));
            ExitCode::FAILURE
        }
    }
}

/// Message and suggestion for a failed run, tagged with who has to act.
fn failure_report(err: &StampError) -> String {
    let human = humanize_error(err);
    format!(
        "{}: {}\n  {}\n",
        human.severity.prefix(),
        human.message,
        human.suggestion
    )
}

fn print_config(config: &RunConfig) -> Result<()> {
    let json = serde_json::to_string_pretty(config).context("serialising configuration")?;
    println!("{json}");
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("Source: {}", summary.source.display());
    if !summary.purged.is_empty() {
        println!("Removed {} label(s) from a previous run", summary.purged.len());
    }
    for artifact in &summary.artifacts {
        println!(
            "  {}  {:>7} bytes  sha256:{}",
            artifact.path.display(),
            artifact.bytes,
            &artifact.sha256[..12.min(artifact.sha256.len())]
        );
    }
    println!(
        "{} label(s) from {} image(s) and {} text block(s)",
        summary.artifacts.len(),
        summary.images,
        summary.text_blocks
    );
    if summary.unpaired_images > 0 {
        println!(
            "{} image(s) skipped: not enough text on the sheet",
            summary.unpaired_images
        );
    }
}
