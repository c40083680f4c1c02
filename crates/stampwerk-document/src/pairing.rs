// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Voucher pairing — zips the flat image and text-block sequences into
// per-voucher units. Every voucher on the sheet contributes one code image and
// three text blocks; the first two blocks are kept and the third is dropped.

use stampwerk_core::TextBlock;
use stampwerk_core::error::StampError;
use tracing::{debug, instrument};

use crate::image::ExtractedImage;

/// Text blocks consumed per voucher.
pub const BLOCKS_PER_VOUCHER: usize = 3;

/// One voucher ready for composition.
#[derive(Debug, Clone)]
pub struct VoucherUnit {
    /// Position in the source document; names the output artifact.
    pub index: usize,
    pub image: ExtractedImage,
    /// `[date + price, identifier]`.
    pub metadata_lines: [TextBlock; 2],
}

impl VoucherUnit {
    pub fn date_price(&self) -> &TextBlock {
        &self.metadata_lines[0]
    }

    pub fn identifier(&self) -> &TextBlock {
        &self.metadata_lines[1]
    }
}

/// Result of pairing: the complete units plus, when the text ran out early,
/// a description of the shortfall.
#[derive(Debug)]
pub struct Pairing {
    pub units: Vec<VoucherUnit>,
    /// Leading text blocks assigned to units; always `3 * units.len()`.
    pub blocks_used: usize,
    pub shortfall: Option<StampError>,
}

/// Pair images with text blocks, `BLOCKS_PER_VOUCHER` blocks per image.
///
/// Stops at the first image without a complete set of blocks. Never produces
/// more units than images, and unit `i` only ever reads blocks `3i..3i+3`.
#[instrument(skip_all, fields(images = images.len(), text_blocks = blocks.len()))]
pub fn pair(images: Vec<ExtractedImage>, blocks: Vec<TextBlock>) -> Pairing {
    let image_count = images.len();
    let block_count = blocks.len();
    let mut units = Vec::with_capacity(image_count.min(block_count / BLOCKS_PER_VOUCHER));

    for (index, image) in images.into_iter().enumerate() {
        let first = BLOCKS_PER_VOUCHER * index;
        let Some([date_price, identifier, _dropped]) =
            blocks.get(first..first + BLOCKS_PER_VOUCHER)
        else {
            break;
        };
        debug!(index, page = image.page, "Voucher paired");
        units.push(VoucherUnit {
            index,
            image,
            metadata_lines: [date_price.clone(), identifier.clone()],
        });
    }

    let blocks_used = BLOCKS_PER_VOUCHER * units.len();
    let shortfall = (units.len() < image_count).then(|| StampError::PairingShortfall {
        images: image_count,
        text_blocks: block_count,
        produced: units.len(),
    });

    Pairing {
        units,
        blocks_used,
        shortfall,
    }
}
