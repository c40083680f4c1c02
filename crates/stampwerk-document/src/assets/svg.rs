// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// SVG asset — the raw document plus its intrinsic size, read from the root
// element with quick-xml. Drawing is left to the renderer.

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use stampwerk_core::error::{Result, StampError};
use tracing::{debug, instrument};

/// CSS pixels per inch; all SVG lengths are normalised to px.
const PX_PER_INCH: f32 = 96.0;

#[derive(Debug, Clone, PartialEq)]
pub struct SvgAsset {
    pub path: PathBuf,
    pub source: String,
    /// Intrinsic width in px.
    pub width: f32,
    /// Intrinsic height in px.
    pub height: f32,
}

impl SvgAsset {
    /// Read and measure the SVG file at `path`.
    #[instrument]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(StampError::MissingInput {
                what: "decorative asset".into(),
                path: path.to_path_buf(),
            });
        }
        let source = fs::read_to_string(path).map_err(|err| StampError::Asset {
            path: path.to_path_buf(),
            reason: err.to_string(),
        })?;
        Self::parse(path, source)
    }

    /// Measure an already-loaded SVG document.
    pub fn parse(path: &Path, source: String) -> Result<Self> {
        let fail = |reason: String| StampError::Asset {
            path: path.to_path_buf(),
            reason,
        };

        let (width, height) = intrinsic_size(&source).map_err(fail)?;
        if !(width > 0.0 && height > 0.0) {
            return Err(fail(format!("degenerate size {}x{}", width, height)));
        }

        debug!(width, height, "SVG asset measured");
        Ok(Self {
            path: path.to_path_buf(),
            source,
            width,
            height,
        })
    }

    /// Height this asset gets when stretched to `width`, keeping its aspect.
    pub fn height_at_width(&self, width: f32) -> f32 {
        self.height * width / self.width
    }
}

/// Width and height of the root `<svg>`, falling back to its viewBox.
fn intrinsic_size(source: &str) -> std::result::Result<(f32, f32), String> {
    let mut reader = Reader::from_str(source);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() != b"svg" {
                    return Err("root element is not <svg>".into());
                }
                return root_size(&e);
            }
            Ok(Event::Eof) => return Err("no <svg> element".into()),
            Ok(_) => {}
            Err(err) => {
                return Err(format!(
                    "malformed XML at byte {}: {}",
                    reader.buffer_position(),
                    err
                ));
            }
        }
    }
}

fn root_size(e: &BytesStart<'_>) -> std::result::Result<(f32, f32), String> {
    let view_box = get_attribute(e, "viewBox").and_then(|v| parse_view_box(&v));
    let width = get_attribute(e, "width").and_then(|v| parse_length(&v));
    let height = get_attribute(e, "height").and_then(|v| parse_length(&v));

    match (width, height, view_box) {
        (Some(w), Some(h), _) => Ok((w, h)),
        // One explicit side: derive the other from the viewBox aspect.
        (Some(w), None, Some((vw, vh))) => Ok((w, w * vh / vw)),
        (None, Some(h), Some((vw, vh))) => Ok((h * vw / vh, h)),
        (None, None, Some(size)) => Ok(size),
        _ => Err("root <svg> has neither width/height nor a viewBox".into()),
    }
}

fn get_attribute(e: &BytesStart<'_>, name: &str) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|attr| attr.key.local_name().as_ref() == name.as_bytes())
        .and_then(|attr| attr.unescape_value().ok().map(|v| v.into_owned()))
}

/// Parse an SVG length into px. Percentages have no intrinsic meaning here.
fn parse_length(value: &str) -> Option<f32> {
    let value = value.trim();
    let (number, factor) = if let Some(v) = value.strip_suffix("px") {
        (v, 1.0)
    } else if let Some(v) = value.strip_suffix("pt") {
        (v, PX_PER_INCH / 72.0)
    } else if let Some(v) = value.strip_suffix("pc") {
        (v, PX_PER_INCH / 6.0)
    } else if let Some(v) = value.strip_suffix("mm") {
        (v, PX_PER_INCH / 25.4)
    } else if let Some(v) = value.strip_suffix("cm") {
        (v, PX_PER_INCH / 2.54)
    } else if let Some(v) = value.strip_suffix("in") {
        (v, PX_PER_INCH)
    } else if value.ends_with('%') {
        return None;
    } else {
        (value, 1.0)
    };
    number
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|n| n.is_finite() && *n > 0.0)
        .map(|n| n * factor)
}

fn parse_view_box(value: &str) -> Option<(f32, f32)> {
    let numbers: Vec<f32> = value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .map(|part| part.parse::<f32>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;
    match numbers.as_slice() {
        [_, _, w, h] if *w > 0.0 && *h > 0.0 => Some((*w, *h)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Result<SvgAsset> {
        SvgAsset::parse(Path::new("test.svg"), source.to_string())
    }

    #[test]
    fn explicit_size_in_px() {
        let svg = parse(r#"<svg xmlns="http://www.w3.org/2000/svg" width="130" height="60px"/>"#)
            .unwrap();
        assert_eq!((svg.width, svg.height), (130.0, 60.0));
    }

    #[test]
    fn physical_units_are_converted() {
        let svg = parse(r#"<svg width="25.4mm" height="72pt"></svg>"#).unwrap();
        assert!((svg.width - 96.0).abs() < 1e-3);
        assert!((svg.height - 96.0).abs() < 1e-3);
    }

    #[test]
    fn view_box_fallback() {
        let svg = parse(
            r#"<?xml version="1.0"?>
            <!-- label -->
            <svg viewBox="0 0 260 428"><rect width="1" height="1"/></svg>"#,
        )
        .unwrap();
        assert_eq!((svg.width, svg.height), (260.0, 428.0));
        assert_eq!(svg.height_at_width(520.0), 856.0);
    }

    #[test]
    fn percentage_width_uses_view_box() {
        let svg = parse(r#"<svg width="100%" height="100%" viewBox="0,0,10,20"/>"#).unwrap();
        assert_eq!((svg.width, svg.height), (10.0, 20.0));
    }

    #[test]
    fn single_side_keeps_view_box_aspect() {
        let svg = parse(r#"<svg width="50" viewBox="0 0 10 20"/>"#).unwrap();
        assert_eq!((svg.width, svg.height), (50.0, 100.0));
    }

    #[test]
    fn non_svg_root_is_rejected() {
        assert!(matches!(parse("<html/>"), Err(StampError::Asset { .. })));
    }

    #[test]
    fn missing_size_is_rejected() {
        assert!(matches!(parse("<svg/>"), Err(StampError::Asset { .. })));
    }

    #[test]
    fn missing_file_is_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = SvgAsset::load(&dir.path().join("label.svg")).unwrap_err();
        assert!(matches!(err, StampError::MissingInput { .. }));
    }
}
