// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Draw plan — the ordered list of drawing operations for one label. The
// composer builds it, a `Renderer` turns it into bytes.
//
// Coordinates are canvas points with the origin at the top-left corner and y
// growing downwards.

use serde::Serialize;

/// Which of the two decorative assets to draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum AssetRole {
    Background,
    Logo,
}

/// Which registered font a text run uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum FontRole {
    /// Decorative font for date and price.
    Primary,
    /// Monospace font for the identifier.
    Secondary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Align {
    /// `x` is the left edge of every line.
    Left,
    /// `x` is the right edge of every line.
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn square(x: f32, y: f32, side: f32) -> Self {
        Self::new(x, y, side, side)
    }
}

/// A block of text anchored by the top of its first line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextRun {
    pub font: FontRole,
    /// Font size in canvas points.
    pub size: f32,
    /// Multiplier on the font's natural line height between lines.
    pub line_spacing: f32,
    pub align: Align,
    pub x: f32,
    pub top: f32,
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum DrawCommand {
    Asset { role: AssetRole, rect: Rect },
    /// A filled black square for one dark code module.
    Module { rect: Rect },
    Text(TextRun),
}

/// Everything needed to draw one label, in paint order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelPlan {
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub commands: Vec<DrawCommand>,
}

impl LabelPlan {
    pub fn module_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|cmd| matches!(cmd, DrawCommand::Module { .. }))
            .count()
    }

    pub fn text_runs(&self) -> impl Iterator<Item = &TextRun> {
        self.commands.iter().filter_map(|cmd| match cmd {
            DrawCommand::Text(run) => Some(run),
            _ => None,
        })
    }
}
