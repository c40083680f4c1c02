// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Source document abstraction — what the extractors need from a parsed PDF,
// without exposing lopdf types.

use stampwerk_core::TextBlock;
use stampwerk_core::error::Result;

/// Colour model of an embedded raster image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    Gray,
    Rgb,
    /// Palette image; `palette` holds `components` bytes per entry.
    Indexed { components: usize, palette: Vec<u8> },
    /// Anything we cannot turn into luma (CMYK, Lab, ICC-based with unknown N).
    Unsupported(String),
}

/// How the sample data of an embedded image is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageEncoding {
    /// Already-decompressed raw samples.
    Raw,
    /// A complete JPEG file (`/DCTDecode`).
    Jpeg,
    /// A filter chain we do not decode.
    Unsupported(String),
}

/// One embedded raster image as found in the page resources, not yet decoded.
#[derive(Debug, Clone)]
pub struct EmbeddedImage {
    /// 1-based page number.
    pub page: u32,
    /// 0-based position among the images of this page.
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    pub encoding: ImageEncoding,
    /// `/Decode [1 0]`: samples are inverted.
    pub inverted: bool,
    pub data: Vec<u8>,
}

/// Read-only access to the pages of a source document.
///
/// Page order and the order of images and text blocks within a page encode
/// voucher order, so implementations must report them exactly as stored.
pub trait SourceDocument {
    /// 1-based page numbers in document order.
    fn page_numbers(&self) -> Vec<u32>;

    /// Embedded raster images of `page`, in resource order.
    fn page_images(&self, page: u32) -> Result<Vec<EmbeddedImage>>;

    /// Text blocks of `page`, in content-stream order.
    fn page_text_blocks(&self, page: u32) -> Result<Vec<TextBlock>>;
}
