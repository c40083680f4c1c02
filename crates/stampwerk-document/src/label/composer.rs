// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Label composer — lays out one voucher (background, logo, code modules,
// date, price, identifier) on a fixed-size canvas and finalises it.

use std::path::Path;

use stampwerk_core::ModuleMatrix;
use stampwerk_core::error::Result;
use tracing::{debug, instrument, warn};

use super::canvas::{LabelArtifact, LabelCanvas, Renderer};
use super::plan::{Align, AssetRole, DrawCommand, FontRole, LabelPlan, Rect, TextRun};
use crate::assets::LabelResources;
use crate::pairing::VoucherUnit;

/// Builds draw plans against one set of shared resources.
#[derive(Debug, Clone, Copy)]
pub struct LabelComposer<'a> {
    resources: &'a LabelResources,
}

impl<'a> LabelComposer<'a> {
    pub fn new(resources: &'a LabelResources) -> Self {
        Self { resources }
    }

    /// Lay out the label for `unit` with its sampled `modules`.
    #[instrument(skip_all, fields(index = unit.index))]
    pub fn plan(&self, unit: &VoucherUnit, modules: &ModuleMatrix) -> LabelPlan {
        let layout = &self.resources.layout;
        let background = &self.resources.background;
        let logo = &self.resources.logo;
        // Both assets share the background's px-to-canvas ratio.
        let ratio = layout.width / background.width;

        let mut commands = Vec::with_capacity(modules.dark_count() + 5);

        // -- Decorations --
        commands.push(DrawCommand::Asset {
            role: AssetRole::Background,
            rect: Rect::new(
                0.0,
                0.0,
                layout.width,
                background.height_at_width(layout.width),
            ),
        });
        commands.push(DrawCommand::Asset {
            role: AssetRole::Logo,
            rect: Rect::new(
                layout.logo.0,
                layout.logo.1,
                logo.width * ratio,
                logo.height * ratio,
            ),
        });

        // -- Code modules --
        let side = layout.module_cell + layout.module_overlap;
        for (col, row) in modules.dark_cells() {
            commands.push(DrawCommand::Module {
                rect: Rect::square(
                    col as f32 * layout.module_cell - layout.module_nudge,
                    layout.modules_top + row as f32 * layout.module_cell - layout.module_nudge,
                    side,
                ),
            });
        }

        // -- Text --
        let (date, price) = parse_date_price(&unit.date_price().content);
        commands.push(DrawCommand::Text(TextRun {
            font: FontRole::Primary,
            size: layout.primary_size,
            line_spacing: 1.0,
            align: Align::Left,
            x: layout.date.0,
            top: layout.date.1,
            lines: vec![date],
        }));
        commands.push(DrawCommand::Text(TextRun {
            font: FontRole::Primary,
            size: layout.primary_size,
            line_spacing: 1.0,
            align: Align::Right,
            x: layout.price_right,
            top: layout.price_top,
            lines: price.lines().map(str::to_owned).collect(),
        }));
        commands.push(DrawCommand::Text(TextRun {
            font: FontRole::Secondary,
            size: layout.secondary_size,
            line_spacing: layout.identifier_line_spacing,
            align: Align::Left,
            x: layout.identifier.0,
            top: layout.identifier.1,
            lines: parse_identifier(&unit.identifier().content),
        }));

        debug!(commands = commands.len(), "Label planned");
        LabelPlan {
            index: unit.index,
            width: layout.width,
            height: layout.height,
            commands,
        }
    }

    /// Plan the label and finalise it at `path`.
    pub fn compose(
        &self,
        unit: &VoucherUnit,
        modules: &ModuleMatrix,
        renderer: &dyn Renderer,
        path: &Path,
    ) -> Result<LabelArtifact> {
        let plan = self.plan(unit, modules);
        LabelCanvas::new(path, plan).finalize(renderer, self.resources)
    }
}

/// Split the date/price block: drop 3 leading and 1 trailing characters, then
/// the date is the first line and the price everything after it.
pub fn parse_date_price(content: &str) -> (String, String) {
    let trimmed = strip_chars(content, 3, 1);
    match trimmed.split_once('\n') {
        Some((date, price)) => (date.to_owned(), price.to_owned()),
        None => {
            warn!(block = %content.escape_debug(), "Date/price block has no line break; price left empty");
            (trimmed.to_owned(), String::new())
        }
    }
}

/// Identifier lines: drop 1 trailing character and split on line breaks.
pub fn parse_identifier(content: &str) -> Vec<String> {
    strip_chars(content, 0, 1)
        .split('\n')
        .map(str::to_owned)
        .collect()
}

/// Drop `lead` characters from the front and `trail` from the back. Too short
/// a string yields an empty one.
fn strip_chars(s: &str, lead: usize, trail: usize) -> &str {
    let count = s.chars().count();
    if count <= lead + trail {
        return "";
    }
    let start = s.char_indices().nth(lead).map_or(s.len(), |(i, _)| i);
    let end = s
        .char_indices()
        .nth(count - trail)
        .map_or(s.len(), |(i, _)| i);
    &s[start..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{FontRegistry, SvgAsset};
    use crate::image::ExtractedImage;
    use crate::label::LabelLayout;
    use image::GrayImage;
    use stampwerk_core::{BoundingBox, TextBlock};

    fn resources(scale: f32) -> LabelResources {
        let background = SvgAsset::parse(
            Path::new("label.svg"),
            r#"<svg width="260" height="428"/>"#.into(),
        )
        .unwrap();
        let logo =
            SvgAsset::parse(Path::new("im.svg"), r#"<svg width="40" height="20"/>"#.into()).unwrap();
        LabelResources::new(
            LabelLayout::for_scale(scale),
            background,
            logo,
            FontRegistry::default(),
        )
    }

    fn unit(date_price: &str, identifier: &str) -> VoucherUnit {
        VoucherUnit {
            index: 7,
            image: ExtractedImage::new(1, 0, GrayImage::new(26, 26)),
            metadata_lines: [
                TextBlock::new(BoundingBox::default(), date_price),
                TextBlock::new(BoundingBox::default(), identifier),
            ],
        }
    }

    #[test]
    fn date_and_price_split() {
        let (date, price) = parse_date_price("XXX2024-01-01\n12,34 EUR\n");
        assert_eq!(date, "2024-01-01");
        assert_eq!(price, "12,34 EUR");
    }

    #[test]
    fn missing_break_leaves_price_empty() {
        let (date, price) = parse_date_price("XXX2024-01-01\n");
        assert_eq!(date, "2024-01-01");
        assert_eq!(price, "");
    }

    #[test]
    fn short_blocks_become_empty() {
        assert_eq!(parse_date_price("ab\n"), (String::new(), String::new()));
        assert_eq!(parse_identifier(""), vec![String::new()]);
    }

    #[test]
    fn stripping_counts_characters_not_bytes() {
        let (date, price) = parse_date_price("Nr.01.02.2024\n0,85 €\n");
        assert_eq!(date, "01.02.2024");
        assert_eq!(price, "0,85 €");
    }

    #[test]
    fn identifier_keeps_embedded_breaks() {
        assert_eq!(
            parse_identifier("A0 01 B2\nC3 D4\n"),
            vec!["A0 01 B2".to_string(), "C3 D4".to_string()]
        );
    }

    #[test]
    fn plan_places_everything_at_scale_four() {
        let resources = resources(4.0);
        let mut modules = ModuleMatrix::filled(false);
        modules.set(0, 0, true);
        modules.set(25, 25, true);
        let plan = LabelComposer::new(&resources)
            .plan(&unit("XXX2024-01-01\n12,34 EUR\n", "A0 01\n"), &modules);

        assert_eq!(plan.index, 7);
        assert_eq!((plan.width, plan.height), (520.0, 856.0));
        assert_eq!(plan.module_count(), 2);

        match &plan.commands[0] {
            DrawCommand::Asset { role, rect } => {
                assert_eq!(*role, AssetRole::Background);
                assert_eq!(*rect, Rect::new(0.0, 0.0, 520.0, 856.0));
            }
            other => panic!("unexpected first command {other:?}"),
        }
        match &plan.commands[1] {
            DrawCommand::Asset { role, rect } => {
                assert_eq!(*role, AssetRole::Logo);
                assert_eq!(*rect, Rect::new(4.0, 102.0, 80.0, 40.0));
            }
            other => panic!("unexpected second command {other:?}"),
        }
        match &plan.commands[3] {
            DrawCommand::Module { rect } => {
                assert!((rect.x - (500.0 - 0.05)).abs() < 1e-4);
                assert!((rect.y - (176.0 + 500.0 - 0.05)).abs() < 1e-4);
                assert!((rect.width - 20.2).abs() < 1e-4);
            }
            other => panic!("unexpected module command {other:?}"),
        }

        let runs: Vec<_> = plan.text_runs().collect();
        assert_eq!(runs.len(), 3);
        assert_eq!(runs[0].lines, vec!["2024-01-01"]);
        assert_eq!((runs[0].x, runs[0].top, runs[0].align), (100.0, 84.0, Align::Left));
        assert_eq!(runs[1].lines, vec!["12,34 EUR"]);
        assert_eq!((runs[1].x, runs[1].align), (520.0, Align::Right));
        assert_eq!(runs[2].lines, vec!["A0 01"]);
        assert_eq!(runs[2].font, FontRole::Secondary);
        assert_eq!((runs[2].x, runs[2].top), (2.0, 708.0));
        assert_eq!(runs[2].line_spacing, 0.9);
    }

    #[test]
    fn plans_are_deterministic() {
        let resources = resources(2.5);
        let composer = LabelComposer::new(&resources);
        let modules = ModuleMatrix::filled(true);
        let unit = unit("XXX2024-01-01\n12,34 EUR\n", "A0 01\n");
        assert_eq!(composer.plan(&unit, &modules), composer.plan(&unit, &modules));
    }
}
