// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Run pipeline — finds the voucher sheet, clears old labels, extracts and
// pairs vouchers, and composes one label per voucher on a worker pool.

use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use serde::Serialize;
use stampwerk_core::RunConfig;
use stampwerk_core::TextBlock;
use stampwerk_core::error::{Result, StampError};
use tracing::{debug, info, instrument, warn};

use crate::assets::LabelResources;
use crate::extract::{ImageSetExtractor, TextBlockExtractor};
use crate::image::ExtractedImage;
use crate::label::{LabelArtifact, LabelComposer, Renderer};
use crate::pairing::pair;
use crate::pdf::{PdfRenderer, PdfSource};
use crate::sampler::ModuleSampler;
use crate::source::SourceDocument;

/// What a run did.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub source: PathBuf,
    /// Stale labels deleted before writing.
    pub purged: Vec<PathBuf>,
    pub images: usize,
    pub text_blocks: usize,
    /// Images left without a complete set of text blocks.
    pub unpaired_images: usize,
    /// Finished labels, ordered by voucher index.
    pub artifacts: Vec<LabelArtifact>,
}

/// Full run: load resources from the working directory and render with printpdf.
#[instrument(skip_all, fields(dir = %config.working_dir.display()))]
pub fn run(config: &RunConfig) -> Result<RunSummary> {
    let resources = LabelResources::load(config)?;
    run_with(config, &resources, &PdfRenderer::new())
}

/// Run against already-loaded resources and an arbitrary renderer.
pub fn run_with(
    config: &RunConfig,
    resources: &LabelResources,
    renderer: &dyn Renderer,
) -> Result<RunSummary> {
    config.validate()?;

    let source_path = discover_source(&config.working_dir, &config.source_prefix)?;
    info!(source = %source_path.display(), "Voucher sheet found");
    let document = PdfSource::open(&source_path)?;
    info!(pages = document.page_count(), "Voucher sheet opened");

    let purged = purge_outputs(config)?;

    let (images, blocks) = extract_all(&document)?;
    let image_count = images.len();
    let block_count = blocks.len();

    let pairing = pair(images, blocks);
    debug!(
        blocks_used = pairing.blocks_used,
        unused = block_count - pairing.blocks_used,
        "Text blocks assigned"
    );
    if let Some(shortfall) = pairing.shortfall {
        if config.strict_pairing || !shortfall.is_recoverable() {
            return Err(shortfall);
        }
        warn!(%shortfall, "Not every voucher has its text; continuing with complete ones");
    }
    let units = pairing.units;

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(config.jobs)
        .thread_name(|i| format!("stampwerk-compose-{i}"))
        .build()
        .map_err(|err| StampError::Config(format!("cannot start worker pool: {}", err)))?;

    let composer = LabelComposer::new(resources);
    let sampler = ModuleSampler::new();
    info!(vouchers = units.len(), jobs = config.jobs, "Composing labels");

    let artifacts: Vec<LabelArtifact> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| {
                let modules = sampler.sample(&unit.image)?;
                composer.compose(unit, &modules, renderer, &config.output_path(unit.index))
            })
            .collect::<Result<_>>()
    })?;

    info!(labels = artifacts.len(), "Run complete");
    Ok(RunSummary {
        source: source_path,
        purged,
        images: image_count,
        text_blocks: block_count,
        unpaired_images: image_count - artifacts.len(),
        artifacts,
    })
}

/// Both flat sequences, fully materialised. Any decode error is fatal.
fn extract_all<D: SourceDocument + ?Sized>(
    document: &D,
) -> Result<(Vec<ExtractedImage>, Vec<TextBlock>)> {
    let images = ImageSetExtractor::new(document).collect::<Result<Vec<_>>>()?;
    let blocks = TextBlockExtractor::new(document).collect::<Result<Vec<_>>>()?;
    info!(
        images = images.len(),
        text_blocks = blocks.len(),
        "Extraction complete"
    );
    Ok((images, blocks))
}

/// The first regular file in `dir`, by sorted name, whose name starts with
/// `prefix`.
pub fn discover_source(dir: &Path, prefix: &str) -> Result<PathBuf> {
    let mut candidates: Vec<(String, PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with(prefix) && entry.file_type()?.is_file() {
            candidates.push((name, entry.path()));
        }
    }
    candidates.sort();

    match candidates.into_iter().next() {
        Some((_, path)) => {
            debug!(path = %path.display(), "Source candidate chosen");
            Ok(path)
        }
        None => Err(StampError::MissingInput {
            what: format!("source document (a file starting with \"{}\")", prefix),
            path: dir.to_path_buf(),
        }),
    }
}

/// Delete every `<output_prefix><digits>.pdf` in the working directory.
///
/// Destructive and unconfirmed: labels from an earlier run are always removed
/// before a new run writes anything.
#[instrument(skip_all)]
pub fn purge_outputs(config: &RunConfig) -> Result<Vec<PathBuf>> {
    let mut purged = Vec::new();
    for entry in fs::read_dir(&config.working_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if config.is_output_name(&name) && entry.file_type()?.is_file() {
            let path = entry.path();
            fs::remove_file(&path)?;
            debug!(path = %path.display(), "Stale label removed");
            purged.push(path);
        }
    }
    purged.sort();
    if !purged.is_empty() {
        info!(count = purged.len(), "Removed labels from a previous run");
    }
    Ok(purged)
}
