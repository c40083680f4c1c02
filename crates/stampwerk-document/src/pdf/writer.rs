// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF renderer — draws a `LabelPlan` onto a single vector page using
// `printpdf` 0.8, then canonicalises the bytes with lopdf.
//
// printpdf 0.8 uses a data-oriented API: the page is a `Vec<Op>` and the
// document is serialised by `PdfDocument::save()`. Plan coordinates are y-down
// from the top-left; PDF space is y-up from the bottom-left, so every y is
// flipped against the canvas height here.

use std::collections::BTreeMap;

use printpdf::{
    Color, ExternalXObject, FontId, LinePoint, Mm, Op, PaintMode, ParsedFont, PdfDocument,
    PdfPage, PdfSaveOptions, PdfWarnMsg, Point, Polygon, PolygonRing, Pt, Rgb, Svg, TextItem,
    WindingOrder, XObjectId, XObjectTransform,
};
use stampwerk_core::error::{Result, StampError};
use tracing::{debug, instrument};

use super::canonical;
use crate::assets::{FontResource, LabelResources, SvgAsset};
use crate::label::{Align, AssetRole, DrawCommand, FontRole, LabelPlan, Rect, Renderer, TextRun};

/// Points per millimetre.
const PT_PER_MM: f32 = 72.0 / 25.4;

/// Renders label plans to PDF with printpdf.
#[derive(Debug, Clone)]
pub struct PdfRenderer {
    /// Title metadata embedded in the PDF /Info dictionary.
    title: String,
}

impl Default for PdfRenderer {
    fn default() -> Self {
        Self {
            title: "Stampwerk Label".into(),
        }
    }
}

impl PdfRenderer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Renderer for PdfRenderer {
    #[instrument(skip_all, fields(index = plan.index, commands = plan.commands.len()))]
    fn render(&self, plan: &LabelPlan, resources: &LabelResources) -> Result<Vec<u8>> {
        let mut doc = PdfDocument::new(&self.title);
        let mut page = PageBuilder::new(plan.height);

        let mut xobjects: BTreeMap<AssetRole, (XObjectId, f32, f32)> = BTreeMap::new();
        let mut fonts: BTreeMap<FontRole, FontId> = BTreeMap::new();

        for command in &plan.commands {
            match command {
                DrawCommand::Asset { role, rect } => {
                    let asset = resources.asset(*role);
                    let (id, width, height) = match xobjects.get(role) {
                        Some(entry) => entry.clone(),
                        None => {
                            let xobject = parse_svg(asset)?;
                            let entry = (
                                doc.add_xobject(&xobject),
                                xobject.width.map_or(asset.width, |w| w.0 as f32),
                                xobject.height.map_or(asset.height, |h| h.0 as f32),
                            );
                            xobjects.insert(*role, entry.clone());
                            entry
                        }
                    };
                    page.asset(id, width, height, rect);
                }
                DrawCommand::Module { rect } => page.module(rect),
                DrawCommand::Text(run) => {
                    let font = resources.fonts.get(run.font).ok_or_else(|| {
                        StampError::Pdf(format!("no font registered for {:?}", run.font))
                    })?;
                    let id = match fonts.get(&run.font) {
                        Some(id) => id.clone(),
                        None => {
                            let id = doc.add_font(&parse_font(font)?);
                            fonts.insert(run.font, id.clone());
                            id
                        }
                    };
                    page.text(run, font, id);
                }
            }
        }

        let ops = page.finish();
        debug!(ops = ops.len(), "Page operations built");
        doc.with_pages(vec![PdfPage::new(
            Mm(plan.width / PT_PER_MM),
            Mm(plan.height / PT_PER_MM),
            ops,
        )]);

        let mut warnings: Vec<PdfWarnMsg> = Vec::new();
        let raw = doc.save(&PdfSaveOptions::default(), &mut warnings);
        if !warnings.is_empty() {
            debug!(warnings = warnings.len(), "printpdf reported warnings");
        }

        canonical::canonicalize(&raw, plan.width, plan.height)
    }
}

fn parse_svg(asset: &SvgAsset) -> Result<ExternalXObject> {
    Svg::parse(&asset.source, &mut Vec::new()).map_err(|err| StampError::Asset {
        path: asset.path.clone(),
        reason: format!("SVG could not be converted: {}", err),
    })
}

fn parse_font(font: &FontResource) -> Result<ParsedFont> {
    ParsedFont::from_bytes(&font.data, 0, &mut Vec::new()).ok_or_else(|| StampError::Font {
        path: font.path.clone(),
        reason: "font could not be embedded".into(),
    })
}

// -- Page operations ---------------------------------------------------------

/// Accumulates ops for one page, flipping plan coordinates into PDF space.
struct PageBuilder {
    height: f32,
    ops: Vec<Op>,
    fill_set: bool,
}

impl PageBuilder {
    fn new(height: f32) -> Self {
        Self {
            height,
            ops: Vec::new(),
            fill_set: false,
        }
    }

    /// PDF y of the bottom edge of a y-down box at `y` with height `h`.
    fn flip(&self, y: f32, h: f32) -> f32 {
        self.height - y - h
    }

    fn asset(&mut self, id: XObjectId, width: f32, height: f32, rect: &Rect) {
        self.ops.push(Op::UseXobject {
            id,
            transform: XObjectTransform {
                translate_x: Some(Pt(rect.x)),
                translate_y: Some(Pt(self.flip(rect.y, rect.height))),
                scale_x: Some(rect.width / width),
                scale_y: Some(rect.height / height),
                dpi: Some(72.0),
                rotate: None,
            },
        });
    }

    fn module(&mut self, rect: &Rect) {
        if !self.fill_set {
            self.ops.push(Op::SetFillColor {
                col: Color::Rgb(Rgb {
                    r: 0.0,
                    g: 0.0,
                    b: 0.0,
                    icc_profile: None,
                }),
            });
            self.fill_set = true;
        }

        let bottom = self.flip(rect.y, rect.height);
        let corners = [
            (rect.x, bottom),
            (rect.x + rect.width, bottom),
            (rect.x + rect.width, bottom + rect.height),
            (rect.x, bottom + rect.height),
        ];
        self.ops.push(Op::DrawPolygon {
            polygon: Polygon {
                rings: vec![PolygonRing {
                    points: corners
                        .iter()
                        .map(|&(x, y)| LinePoint {
                            p: Point { x: Pt(x), y: Pt(y) },
                            bezier: false,
                        })
                        .collect(),
                }],
                mode: PaintMode::Fill,
                winding_order: WindingOrder::NonZero,
            },
        });
    }

    /// One text section per line, anchored at its baseline.
    fn text(&mut self, run: &TextRun, font: &FontResource, id: FontId) {
        let ascent = font.metrics.ascent(run.size);
        let advance = font.metrics.line_height(run.size) * run.line_spacing;

        for (i, line) in run.lines.iter().enumerate() {
            if line.is_empty() {
                continue;
            }
            let x = match run.align {
                Align::Left => run.x,
                Align::Right => run.x - font.text_width(line, run.size),
            };
            let baseline = self.height - run.top - ascent - advance * i as f32;

            self.ops.push(Op::StartTextSection);
            self.ops.push(Op::SetFontSize {
                size: Pt(run.size),
                font: id.clone(),
            });
            self.ops.push(Op::SetTextCursor {
                pos: Point {
                    x: Pt(x),
                    y: Pt(baseline),
                },
            });
            self.ops.push(Op::WriteText {
                items: vec![TextItem::Text(line.clone())],
                font: id.clone(),
            });
            self.ops.push(Op::EndTextSection);
        }
    }

    fn finish(self) -> Vec<Op> {
        self.ops
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::FontRegistry;
    use crate::image::ExtractedImage;
    use crate::label::{LabelComposer, LabelLayout};
    use crate::pairing::VoucherUnit;
    use lopdf::{Document, Object};
    use lopdf::content::Content;
    use stampwerk_core::{BoundingBox, ModuleMatrix, TextBlock};
    use std::path::{Path, PathBuf};

    fn resources() -> LabelResources {
        let svg = |w, h| {
            SvgAsset::parse(Path::new("a.svg"), format!(r#"<svg width="{w}" height="{h}"/>"#))
                .unwrap()
        };
        LabelResources::new(
            LabelLayout::default(),
            svg(130, 214),
            svg(10, 10),
            FontRegistry::default(),
        )
    }

    fn module_plan() -> LabelPlan {
        LabelPlan {
            index: 0,
            width: 520.0,
            height: 856.0,
            commands: vec![
                DrawCommand::Module {
                    rect: Rect::square(-0.05, 175.95, 20.2),
                },
                DrawCommand::Module {
                    rect: Rect::square(19.95, 175.95, 20.2),
                },
            ],
        }
    }

    fn fixture_font() -> PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Tuffy.ttf")
    }

    /// Real fonts and artwork that draws something, as on an actual sheet.
    fn label_resources() -> LabelResources {
        let svg = |w: u32, h: u32| {
            SvgAsset::parse(
                Path::new("a.svg"),
                format!(
                    r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}"><rect x="1" y="1" width="{}" height="{}" fill="#c03"/></svg>"##,
                    w / 2,
                    h / 2
                ),
            )
            .unwrap()
        };
        let mut fonts = FontRegistry::new();
        fonts.register(FontRole::Primary, &fixture_font()).unwrap();
        fonts.register(FontRole::Secondary, &fixture_font()).unwrap();
        LabelResources::new(LabelLayout::default(), svg(130, 214), svg(40, 12), fonts)
    }

    fn voucher_plan(resources: &LabelResources) -> LabelPlan {
        let mut modules = ModuleMatrix::filled(false);
        modules.set(0, 0, true);
        modules.set(3, 5, true);
        let unit = VoucherUnit {
            index: 0,
            image: ExtractedImage::new(1, 0, ::image::GrayImage::new(1, 1)),
            metadata_lines: [
                TextBlock::new(BoundingBox::default(), "Nr.2024-01-01\n0,85 EUR\n"),
                TextBlock::new(BoundingBox::default(), "A0 01 B2\nC3 D4 E5\n"),
            ],
        };
        LabelComposer::new(resources).plan(&unit, &modules)
    }

    /// Operands of every `Td` in the page content, in drawing order.
    fn text_cursors(pdf: &[u8]) -> Vec<(f32, f32)> {
        let doc = Document::load_mem(pdf).unwrap();
        let page_id = *doc.get_pages().get(&1).unwrap();
        let content = Content::decode(&doc.get_page_content(page_id).unwrap()).unwrap();
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Td")
            .map(|op| {
                (
                    op.operands[0].as_float().unwrap(),
                    op.operands[1].as_float().unwrap(),
                )
            })
            .collect()
    }

    fn assert_close(actual: f32, expected: f32) {
        assert!(
            (actual - expected).abs() < 0.01,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn module_page_has_exact_media_box() {
        let bytes = PdfRenderer::new()
            .render(&module_plan(), &resources())
            .unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        let page_id = *pages.values().next().unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let media_box: Vec<f32> = page
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_float().unwrap())
            .collect();
        assert_eq!(media_box, vec![0.0, 0.0, 520.0, 856.0]);
    }

    #[test]
    fn rendering_is_byte_identical() {
        let renderer = PdfRenderer::new();
        let first = renderer.render(&module_plan(), &resources()).unwrap();
        let second = renderer.render(&module_plan(), &resources()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn labels_with_text_and_artwork_are_byte_identical() {
        let resources = label_resources();
        let plan = voucher_plan(&resources);
        let renderer = PdfRenderer::new();
        let first = renderer.render(&plan, &resources).unwrap();
        let second = renderer.render(&plan, &resources).unwrap();
        assert_eq!(first, second);

        let doc = Document::load_mem(&first).unwrap();
        let base_fonts: Vec<&[u8]> = doc
            .objects
            .values()
            .filter_map(|object| object.as_dict().ok())
            .filter_map(|dict| dict.get(b"BaseFont").and_then(Object::as_name).ok())
            .collect();
        assert!(!base_fonts.is_empty());
        for name in base_fonts {
            assert!(
                name.starts_with(b"LabelFont"),
                "font kept its generated name: {}",
                String::from_utf8_lossy(name)
            );
        }
    }

    #[test]
    fn text_lines_land_on_their_baselines() {
        let resources = label_resources();
        let layout = &resources.layout;
        let primary = resources.fonts.get(FontRole::Primary).unwrap();
        let secondary = resources.fonts.get(FontRole::Secondary).unwrap();
        let bytes = PdfRenderer::new()
            .render(&voucher_plan(&resources), &resources)
            .unwrap();

        // Date, price, then the two identifier lines.
        let cursors = text_cursors(&bytes);
        assert_eq!(cursors.len(), 4);
        let (date, price, first_id, second_id) = (cursors[0], cursors[1], cursors[2], cursors[3]);
        let primary_ascent = primary.metrics.ascent(layout.primary_size);

        assert_close(date.0, 100.0);
        assert_close(date.1, 856.0 - 84.0 - primary_ascent);

        let price_width = primary.text_width("0,85 EUR", layout.primary_size);
        assert!(price_width > 0.0);
        assert_close(price.0 + price_width, 520.0);
        assert_close(price.1, 856.0 - 84.0 - primary_ascent);

        assert_close(first_id.0, 2.0);
        assert_close(
            first_id.1,
            856.0 - 708.0 - secondary.metrics.ascent(layout.secondary_size),
        );
        assert_close(second_id.0, 2.0);
        assert_close(
            first_id.1 - second_id.1,
            0.9 * secondary.metrics.line_height(layout.secondary_size),
        );
    }

    #[test]
    fn text_without_registered_font_fails() {
        let mut plan = module_plan();
        plan.commands.push(DrawCommand::Text(TextRun {
            font: FontRole::Primary,
            size: 61.3,
            line_spacing: 1.0,
            align: Align::Left,
            x: 100.0,
            top: 84.0,
            lines: vec!["2024-01-01".into()],
        }));
        let err = PdfRenderer::new().render(&plan, &resources()).unwrap_err();
        assert!(matches!(err, StampError::Pdf(_)));
    }

    #[test]
    fn flip_maps_top_left_boxes_to_pdf_space() {
        let page = PageBuilder::new(856.0);
        assert_eq!(page.flip(0.0, 856.0), 0.0);
        assert_eq!(page.flip(176.0, 20.0), 660.0);
    }
}
