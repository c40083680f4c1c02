// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label geometry. Every offset is stored once, in scale units, and multiplied
// out by `LabelLayout::for_scale`.

use serde::Serialize;
use stampwerk_core::MODULE_GRID;

/// Text sizes are given at 96 dpi; canvas units are 1/72 inch.
pub const TEXT_RESOLUTION: f32 = 96.0 / 72.0;

/// Geometry of the label in scale units (multiply by `scale` for points).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutTemplate {
    pub width: f32,
    pub height: f32,
    pub logo: (f32, f32),
    /// Top of the module grid. The grid spans the full canvas width.
    pub modules_top: f32,
    /// Squares are shifted up-left by this much...
    pub module_nudge: f32,
    /// ...and grown by this much, so neighbours overlap.
    pub module_overlap: f32,
    pub date: (f32, f32),
    /// Price is right-aligned to this x.
    pub price_right: f32,
    pub price_top: f32,
    pub identifier: (f32, f32),
    pub identifier_line_spacing: f32,
    pub primary_size: f32,
    pub secondary_size: f32,
}

pub const VOUCHER_LABEL: LayoutTemplate = LayoutTemplate {
    width: 130.0,
    height: 214.0,
    logo: (1.0, 25.5),
    modules_top: 44.0,
    module_nudge: 0.0125,
    module_overlap: 0.05,
    date: (25.0, 21.0),
    price_right: 130.0,
    price_top: 21.0,
    identifier: (0.5, 177.0),
    identifier_line_spacing: 0.9,
    primary_size: 11.5,
    secondary_size: 13.5,
};

/// Concrete label geometry in canvas points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LabelLayout {
    pub scale: f32,
    pub width: f32,
    pub height: f32,
    pub logo: (f32, f32),
    pub modules_top: f32,
    pub module_cell: f32,
    pub module_nudge: f32,
    pub module_overlap: f32,
    pub date: (f32, f32),
    pub price_right: f32,
    pub price_top: f32,
    pub identifier: (f32, f32),
    pub identifier_line_spacing: f32,
    pub primary_size: f32,
    pub secondary_size: f32,
}

impl LabelLayout {
    pub fn for_scale(scale: f32) -> Self {
        Self::from_template(&VOUCHER_LABEL, scale)
    }

    pub fn from_template(t: &LayoutTemplate, scale: f32) -> Self {
        let s = |v: f32| v * scale;
        let width = s(t.width);
        Self {
            scale,
            width,
            height: s(t.height),
            logo: (s(t.logo.0), s(t.logo.1)),
            modules_top: s(t.modules_top),
            module_cell: width / MODULE_GRID as f32,
            module_nudge: s(t.module_nudge),
            module_overlap: s(t.module_overlap),
            date: (s(t.date.0), s(t.date.1)),
            price_right: s(t.price_right),
            price_top: s(t.price_top),
            identifier: (s(t.identifier.0), s(t.identifier.1)),
            identifier_line_spacing: t.identifier_line_spacing,
            primary_size: s(t.primary_size) * TEXT_RESOLUTION,
            secondary_size: s(t.secondary_size) * TEXT_RESOLUTION,
        }
    }
}

impl Default for LabelLayout {
    fn default() -> Self {
        Self::for_scale(4.0)
    }
}
