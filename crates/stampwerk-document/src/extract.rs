// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Extractors — flat, lazy, ordered sequences of code images and text blocks
// over every page of a source document.
//
// Both iterators fuse after the first error: a source that cannot be read or
// an image that cannot be decoded ends the sequence.

use std::vec;

use stampwerk_core::TextBlock;
use stampwerk_core::error::Result;
use tracing::{debug, info, warn};

use crate::image::{ExtractedImage, decode};
use crate::source::{EmbeddedImage, SourceDocument};

// -- Images ------------------------------------------------------------------

/// Yields every embedded raster image, page by page, in resource order.
pub struct ImageSetExtractor<'a, D: SourceDocument + ?Sized> {
    document: &'a D,
    pages: vec::IntoIter<u32>,
    pending: vec::IntoIter<EmbeddedImage>,
    done: bool,
}

impl<'a, D: SourceDocument + ?Sized> ImageSetExtractor<'a, D> {
    pub fn new(document: &'a D) -> Self {
        Self {
            document,
            pages: document.page_numbers().into_iter(),
            pending: Vec::new().into_iter(),
            done: false,
        }
    }
}

impl<D: SourceDocument + ?Sized> Iterator for ImageSetExtractor<'_, D> {
    type Item = Result<ExtractedImage>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(embedded) = self.pending.next() {
                let decoded = decode(&embedded);
                self.done = decoded.is_err();
                return Some(decoded);
            }

            let page = self.pages.next()?;
            match self.document.page_images(page) {
                Ok(images) if images.is_empty() => {
                    warn!(page, "No images found on page");
                }
                Ok(images) => {
                    info!(page, count = images.len(), "Found images on page");
                    self.pending = images.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}

// -- Text blocks -------------------------------------------------------------

/// Yields every text block, page by page, in content-stream order.
pub struct TextBlockExtractor<'a, D: SourceDocument + ?Sized> {
    document: &'a D,
    pages: vec::IntoIter<u32>,
    pending: vec::IntoIter<TextBlock>,
    done: bool,
}

impl<'a, D: SourceDocument + ?Sized> TextBlockExtractor<'a, D> {
    pub fn new(document: &'a D) -> Self {
        Self {
            document,
            pages: document.page_numbers().into_iter(),
            pending: Vec::new().into_iter(),
            done: false,
        }
    }
}

impl<D: SourceDocument + ?Sized> Iterator for TextBlockExtractor<'_, D> {
    type Item = Result<TextBlock>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if let Some(block) = self.pending.next() {
                return Some(Ok(block));
            }

            let page = self.pages.next()?;
            match self.document.page_text_blocks(page) {
                Ok(blocks) if blocks.is_empty() => {
                    debug!(page, "No text blocks found on page");
                }
                Ok(blocks) => {
                    info!(page, count = blocks.len(), "Found text blocks on page");
                    self.pending = blocks.into_iter();
                }
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            }
        }
    }
}
