// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Module sampler — reads the 26x26 code matrix off a decoded image by looking
// at one pixel per cell centre.

use image::GrayImage;
use stampwerk_core::error::{Result, StampError};
use stampwerk_core::{MODULE_GRID, ModuleMatrix};
use tracing::{debug, instrument};

use crate::image::ExtractedImage;

/// Luma value that counts as a dark module. Anything else is light.
pub const DARK_LEVEL: u8 = 0;

/// Samples code images at a fixed grid of cell centres.
#[derive(Debug, Clone, Copy)]
pub struct ModuleSampler {
    grid: usize,
}

impl Default for ModuleSampler {
    fn default() -> Self {
        Self { grid: MODULE_GRID }
    }
}

impl ModuleSampler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample `image` into a module matrix.
    ///
    /// Cell `(c, r)` is read at `x = trunc(w / 26 * (c + 0.5))`,
    /// `y = trunc(h / 26 * (r + 0.5))`. The image is never resampled.
    #[instrument(skip_all, fields(page = image.page, index = image.index))]
    pub fn sample(&self, image: &ExtractedImage) -> Result<ModuleMatrix> {
        if image.width() == 0 || image.height() == 0 {
            return Err(StampError::Decode {
                page: image.page,
                image: image.index,
                reason: format!("image has no pixels ({}x{})", image.width(), image.height()),
            });
        }

        let matrix = self.sample_pixels(&image.pixels);
        debug!(dark = matrix.dark_count(), "Code image sampled");
        Ok(matrix)
    }

    fn sample_pixels(&self, pixels: &GrayImage) -> ModuleMatrix {
        let (width, height) = pixels.dimensions();
        let mut matrix = ModuleMatrix::filled(false);
        for col in 0..self.grid {
            let x = Self::centre(width, self.grid, col);
            for row in 0..self.grid {
                let y = Self::centre(height, self.grid, row);
                matrix.set(col, row, pixels.get_pixel(x, y).0[0] == DARK_LEVEL);
            }
        }
        matrix
    }

    fn centre(extent: u32, grid: usize, cell: usize) -> u32 {
        let pos = (extent as f64 / grid as f64 * (cell as f64 + 0.5)).trunc() as u32;
        // Only reachable through float rounding at the far edge.
        pos.min(extent - 1)
    }
}
