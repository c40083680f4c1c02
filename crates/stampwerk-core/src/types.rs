// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Core domain types shared between extraction and composition.

use serde::{Deserialize, Serialize};

/// Number of modules along each side of the voucher code.
pub const MODULE_GRID: usize = 26;

/// Axis-aligned rectangle in source page space (PDF points, y-up).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl BoundingBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// Grow to include the rectangle `other`.
    pub fn union(self, other: BoundingBox) -> Self {
        Self {
            x0: self.x0.min(other.x0),
            y0: self.y0.min(other.y0),
            x1: self.x1.max(other.x1),
            y1: self.y1.max(other.y1),
        }
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

/// One block of text as reported by the document parser.
///
/// `content` holds one or more lines, each terminated by `\n`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub bbox: BoundingBox,
    pub content: String,
}

impl TextBlock {
    pub fn new(bbox: BoundingBox, content: impl Into<String>) -> Self {
        Self {
            bbox,
            content: content.into(),
        }
    }
}

/// 26x26 dark/light grid sampled from a voucher code image. `true` is dark.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ModuleMatrix {
    cells: [[bool; MODULE_GRID]; MODULE_GRID],
}

impl ModuleMatrix {
    /// A matrix with every module set to `dark`.
    pub fn filled(dark: bool) -> Self {
        Self {
            cells: [[dark; MODULE_GRID]; MODULE_GRID],
        }
    }

    /// Module at column `col`, row `row`. Out-of-range reads are light.
    pub fn get(&self, col: usize, row: usize) -> bool {
        self.cells
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    /// Set the module at column `col`, row `row`. Out-of-range writes are ignored.
    pub fn set(&mut self, col: usize, row: usize, dark: bool) {
        if let Some(cell) = self.cells.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = dark;
        }
    }

    /// Dark modules as `(col, row)` pairs, column-major (the order the
    /// reference renderer fills them in).
    pub fn dark_cells(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        (0..MODULE_GRID).flat_map(move |col| {
            (0..MODULE_GRID).filter_map(move |row| self.cells[row][col].then_some((col, row)))
        })
    }

    pub fn dark_count(&self) -> usize {
        self.cells.iter().flatten().filter(|dark| **dark).count()
    }
}

impl std::fmt::Debug for ModuleMatrix {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "ModuleMatrix {{")?;
        for row in &self.cells {
            let line: String = row.iter().map(|dark| if *dark { '#' } else { '.' }).collect();
            writeln!(f, "  {line}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filled_matrices() {
        assert_eq!(ModuleMatrix::filled(false).dark_count(), 0);
        assert_eq!(
            ModuleMatrix::filled(true).dark_count(),
            MODULE_GRID * MODULE_GRID
        );
    }

    #[test]
    fn dark_cells_are_column_major() {
        let mut matrix = ModuleMatrix::filled(false);
        matrix.set(1, 0, true);
        matrix.set(0, 5, true);
        matrix.set(0, 2, true);
        let cells: Vec<_> = matrix.dark_cells().collect();
        assert_eq!(cells, vec![(0, 2), (0, 5), (1, 0)]);
    }

    #[test]
    fn out_of_range_access_is_harmless() {
        let mut matrix = ModuleMatrix::filled(false);
        matrix.set(MODULE_GRID, 0, true);
        assert!(!matrix.get(MODULE_GRID, 0));
        assert_eq!(matrix.dark_count(), 0);
    }

    #[test]
    fn bounding_box_union() {
        let a = BoundingBox::new(0.0, 0.0, 10.0, 5.0);
        let b = BoundingBox::new(-2.0, 3.0, 4.0, 9.0);
        let u = a.union(b);
        assert_eq!(u, BoundingBox::new(-2.0, 0.0, 10.0, 9.0));
        assert_eq!(u.width(), 12.0);
        assert_eq!(u.height(), 9.0);
    }
}
