// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// stampwerk-document — Voucher sheet processing for Stampwerk.
//
// Reads the source PDF (lopdf), decodes the embedded code images (image),
// pairs them with their printed metadata, samples the 26x26 code grid and
// composes one vector label per voucher (printpdf).

pub mod assets;
pub mod extract;
pub mod image;
pub mod integrity;
pub mod label;
pub mod pairing;
pub mod pdf;
pub mod pipeline;
pub mod sampler;
pub mod source;

// Re-export the primary types so callers can use `stampwerk_document::PdfSource` etc.
pub use assets::{FontRegistry, LabelResources, SvgAsset};
pub use extract::{ImageSetExtractor, TextBlockExtractor};
pub use crate::image::ExtractedImage;
pub use label::{LabelArtifact, LabelComposer, LabelLayout, LabelPlan, Renderer};
pub use pairing::{VoucherUnit, pair};
pub use pdf::{PdfRenderer, PdfSource};
pub use pipeline::{RunSummary, run, run_with};
pub use sampler::ModuleSampler;
pub use source::SourceDocument;
