// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF module — reading the source sheet, rendering labels, and making the
// rendered bytes reproducible.

pub mod canonical;
pub mod reader;
pub(crate) mod text;
pub mod writer;

pub use canonical::canonicalize;
pub use reader::PdfSource;
pub use writer::PdfRenderer;
