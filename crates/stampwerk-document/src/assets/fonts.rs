// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Font registry — the two label fonts, keyed by role. Bytes are kept for
// embedding; metrics are read with ttf-parser at registration time.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use stampwerk_core::error::{Result, StampError};
use tracing::{debug, info, instrument};
use ttf_parser::{Face, name_id};

use crate::label::FontRole;

/// Vertical metrics in font units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FontMetrics {
    pub units_per_em: u16,
    pub ascender: i16,
    pub descender: i16,
    pub line_gap: i16,
}

impl FontMetrics {
    fn em(&self, value: i32, size: f32) -> f32 {
        value as f32 * size / self.units_per_em.max(1) as f32
    }

    /// Distance from the top of a line box to its baseline at `size`.
    pub fn ascent(&self, size: f32) -> f32 {
        self.em(self.ascender as i32, size)
    }

    /// Natural baseline-to-baseline distance at `size`.
    pub fn line_height(&self, size: f32) -> f32 {
        self.em(
            self.ascender as i32 - self.descender as i32 + self.line_gap as i32,
            size,
        )
    }
}

/// One registered TrueType/OpenType font.
#[derive(Debug, Clone)]
pub struct FontResource {
    pub path: PathBuf,
    /// Family name from the `name` table, or the file stem.
    pub family: String,
    pub data: Vec<u8>,
    pub metrics: FontMetrics,
}

impl FontResource {
    /// Parse `data` as a font face, rejecting anything ttf-parser cannot read.
    pub fn from_bytes(path: &Path, data: Vec<u8>) -> Result<Self> {
        let face = Face::parse(&data, 0).map_err(|err| StampError::Font {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;

        let family = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == name_id::FAMILY && name.is_unicode())
            .find_map(|name| name.to_string())
            .or_else(|| path.file_stem().map(|s| s.to_string_lossy().into_owned()))
            .unwrap_or_default();

        let metrics = FontMetrics {
            units_per_em: face.units_per_em(),
            ascender: face.ascender(),
            descender: face.descender(),
            line_gap: face.line_gap(),
        };

        Ok(Self {
            path: path.to_path_buf(),
            family,
            data,
            metrics,
        })
    }

    /// Advance width of `text` at `size`, without kerning. Characters missing
    /// from the font contribute nothing.
    pub fn text_width(&self, text: &str, size: f32) -> f32 {
        let Ok(face) = Face::parse(&self.data, 0) else {
            return 0.0;
        };
        let units: u32 = text
            .chars()
            .filter_map(|c| face.glyph_index(c))
            .filter_map(|glyph| face.glyph_hor_advance(glyph))
            .map(u32::from)
            .sum();
        units as f32 * size / self.metrics.units_per_em.max(1) as f32
    }
}

/// Fonts available to the renderer, one per role.
#[derive(Debug, Clone, Default)]
pub struct FontRegistry {
    fonts: BTreeMap<FontRole, FontResource>,
}

impl FontRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load and register the font file at `path` for `role`.
    ///
    /// Registering a role a second time is a no-op.
    #[instrument(skip(self))]
    pub fn register(&mut self, role: FontRole, path: &Path) -> Result<()> {
        if let Some(existing) = self.fonts.get(&role) {
            debug!(family = %existing.family, "Font role already registered");
            return Ok(());
        }
        if !path.is_file() {
            return Err(StampError::MissingInput {
                what: "font".into(),
                path: path.to_path_buf(),
            });
        }
        let data = fs::read(path).map_err(|err| StampError::Font {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        let font = FontResource::from_bytes(path, data)?;
        info!(family = %font.family, bytes = font.data.len(), "Font registered");
        self.fonts.insert(role, font);
        Ok(())
    }

    pub fn get(&self, role: FontRole) -> Option<&FontResource> {
        self.fonts.get(&role)
    }
}
