// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Text block reconstruction from a page content stream.
//
// Each `BT … ET` text object becomes one block. A new line starts whenever the
// text line origin moves vertically. Blocks are returned in stream order.

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use stampwerk_core::error::{Result, StampError};
use stampwerk_core::{BoundingBox, TextBlock};
use tracing::debug;

use crate::pdf::reader::number;

/// Vertical movement (text space units) below which two runs share a line.
const SAME_LINE_EPSILON: f32 = 0.01;

/// Negative `TJ` adjustment (thousandths of an em) read as a word space.
const TJ_SPACE_THRESHOLD: f32 = 200.0;

/// Text and line matrices of the text state, as `[a b c d e f]`.
#[derive(Debug, Clone, Copy)]
struct TextMatrix {
    tm: [f32; 6],
    tlm: [f32; 6],
    leading: f32,
}

impl Default for TextMatrix {
    fn default() -> Self {
        const IDENTITY: [f32; 6] = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
        Self {
            tm: IDENTITY,
            tlm: IDENTITY,
            leading: 0.0,
        }
    }
}

impl TextMatrix {
    fn begin(&mut self) {
        let leading = self.leading;
        *self = Self::default();
        self.leading = leading;
    }

    /// `Td`: translate the line matrix and reset the text matrix to it.
    fn translate(&mut self, tx: f32, ty: f32) {
        let [a, b, c, d, e, f] = self.tlm;
        self.tlm = [a, b, c, d, tx * a + ty * c + e, tx * b + ty * d + f];
        self.tm = self.tlm;
    }

    fn set(&mut self, m: [f32; 6]) {
        self.tm = m;
        self.tlm = m;
    }

    fn next_line(&mut self) {
        self.translate(0.0, -self.leading);
    }

    fn position(&self) -> (f32, f32) {
        (self.tm[4], self.tm[5])
    }

    fn scale(&self) -> f32 {
        (self.tm[1] * self.tm[1] + self.tm[3] * self.tm[3]).sqrt()
    }
}

/// Accumulates the lines of one text object.
#[derive(Debug, Default)]
struct BlockBuilder {
    lines: Vec<String>,
    current: String,
    line_y: Option<f32>,
    bbox: Option<BoundingBox>,
}

impl BlockBuilder {
    fn push_run(&mut self, text: &str, x: f32, y: f32, size: f32) {
        if text.is_empty() {
            return;
        }
        if let Some(line_y) = self.line_y
            && (line_y - y).abs() > SAME_LINE_EPSILON
            && !self.current.is_empty()
        {
            self.lines.push(std::mem::take(&mut self.current));
        }
        self.line_y = Some(y);
        self.current.push_str(text);

        // Glyph widths are not known here; half an em per character is the
        // usual estimate for Latin text.
        let width = text.chars().count() as f32 * size * 0.5;
        let run = BoundingBox::new(x, y - size * 0.25, x + width, y + size * 0.75);
        self.bbox = Some(self.bbox.map_or(run, |b| b.union(run)));
    }

    fn finish(mut self) -> Option<TextBlock> {
        if !self.current.is_empty() {
            self.lines.push(self.current);
        }
        if self.lines.iter().all(|l| l.trim().is_empty()) {
            return None;
        }
        let mut content = String::new();
        for line in &self.lines {
            content.push_str(line);
            content.push('\n');
        }
        Some(TextBlock::new(self.bbox.unwrap_or_default(), content))
    }
}

/// Extract the text blocks of one page in content-stream order.
pub(crate) fn extract_blocks(doc: &Document, page_id: ObjectId) -> Result<Vec<TextBlock>> {
    let fonts = doc
        .get_page_fonts(page_id)
        .map_err(|err| StampError::Pdf(format!("cannot read page fonts: {}", err)))?;
    let data = page_content(doc, page_id)?;
    let content = Content::decode(&data)
        .map_err(|err| StampError::Pdf(format!("cannot parse content stream: {}", err)))?;

    let mut blocks = Vec::new();
    let mut matrix = TextMatrix::default();
    let mut builder: Option<BlockBuilder> = None;
    let mut font_name: Vec<u8> = Vec::new();
    let mut font_size: f32 = 12.0;

    for op in &content.operations {
        let operands = &op.operands;
        match op.operator.as_str() {
            "BT" => {
                matrix.begin();
                builder = Some(BlockBuilder::default());
            }
            "ET" => {
                if let Some(block) = builder.take().and_then(BlockBuilder::finish) {
                    blocks.push(block);
                }
            }
            "Tf" => {
                if let Some(Object::Name(name)) = operands.first() {
                    font_name = name.clone();
                }
                font_size = operands.get(1).and_then(number).unwrap_or(font_size);
            }
            "TL" => {
                matrix.leading = operands.first().and_then(number).unwrap_or(0.0);
            }
            "Td" | "TD" => {
                let tx = operands.first().and_then(number).unwrap_or(0.0);
                let ty = operands.get(1).and_then(number).unwrap_or(0.0);
                if op.operator == "TD" {
                    matrix.leading = -ty;
                }
                matrix.translate(tx, ty);
            }
            "Tm" => {
                if operands.len() >= 6 {
                    let mut m = [0.0f32; 6];
                    for (slot, operand) in m.iter_mut().zip(operands) {
                        *slot = number(operand).unwrap_or(0.0);
                    }
                    matrix.set(m);
                }
            }
            "T*" => matrix.next_line(),
            "Tj" | "TJ" | "'" | "\"" => {
                if op.operator == "'" || op.operator == "\"" {
                    matrix.next_line();
                }
                let Some(builder) = builder.as_mut() else {
                    continue;
                };
                let font = fonts.get(&font_name).copied();
                let text = match op.operator.as_str() {
                    "TJ" => match operands.first() {
                        Some(Object::Array(items)) => decode_array(doc, font, items),
                        _ => String::new(),
                    },
                    "\"" => match operands.get(2) {
                        Some(Object::String(bytes, _)) => decode_string(doc, font, bytes),
                        _ => String::new(),
                    },
                    _ => match operands.first() {
                        Some(Object::String(bytes, _)) => decode_string(doc, font, bytes),
                        _ => String::new(),
                    },
                };
                let (x, y) = matrix.position();
                builder.push_run(&text, x, y, font_size * matrix.scale());
            }
            _ => {}
        }
    }

    debug!(?page_id, blocks = blocks.len(), "Text blocks reconstructed");
    Ok(blocks)
}

/// Decompressed content of all streams referenced by the page's `/Contents`.
pub(crate) fn page_content(doc: &Document, page_id: ObjectId) -> Result<Vec<u8>> {
    let page = doc
        .get_dictionary(page_id)
        .map_err(|err| StampError::Pdf(format!("cannot read page {:?}: {}", page_id, err)))?;

    let streams: Vec<ObjectId> = match page.get(b"Contents") {
        Ok(Object::Reference(id)) => vec![*id],
        Ok(Object::Array(arr)) => arr.iter().filter_map(|o| o.as_reference().ok()).collect(),
        _ => return Ok(Vec::new()),
    };

    let mut content = Vec::new();
    for id in streams {
        if let Ok(Object::Stream(stream)) = doc.get_object(id) {
            let data = if stream.dict.has(b"Filter") {
                stream.decompressed_content().map_err(|err| {
                    StampError::Pdf(format!("cannot decompress content {:?}: {}", id, err))
                })?
            } else {
                stream.content.clone()
            };
            content.extend_from_slice(&data);
            content.push(b' ');
        }
    }
    Ok(content)
}

fn decode_string(doc: &Document, font: Option<&Dictionary>, bytes: &[u8]) -> String {
    if let Some(font) = font
        && let Ok(encoding) = font.get_font_encoding(doc)
        && let Ok(text) = Document::decode_text(&encoding, bytes)
    {
        return text;
    }
    decode_text_simple(bytes)
}

fn decode_array(doc: &Document, font: Option<&Dictionary>, items: &[Object]) -> String {
    let mut combined = String::new();
    for item in items {
        match item {
            Object::String(bytes, _) => combined.push_str(&decode_string(doc, font, bytes)),
            other => {
                if let Some(adjustment) = number(other)
                    && -adjustment > TJ_SPACE_THRESHOLD
                    && !combined.is_empty()
                    && !combined.ends_with(' ')
                {
                    combined.push(' ');
                }
            }
        }
    }
    combined
}

/// Fallback decoding when the font has no usable encoding.
fn decode_text_simple(bytes: &[u8]) -> String {
    if let [0xFE, 0xFF, rest @ ..] = bytes {
        let utf16: Vec<u16> = rest
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_owned();
    }
    bytes.iter().map(|&b| b as char).collect()
}
