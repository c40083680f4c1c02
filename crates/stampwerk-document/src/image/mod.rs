// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Image module — decoding of embedded code images into luma pixel grids.

pub mod decoder;

pub use decoder::{ExtractedImage, decode};
