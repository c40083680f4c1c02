// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDF reader — opens the stamp sheet with `lopdf` and exposes its pages,
// embedded images and text blocks through `SourceDocument`.

use std::path::Path;

use lopdf::{Dictionary, Document, Object, ObjectId};
use stampwerk_core::TextBlock;
use stampwerk_core::error::{Result, StampError};
use tracing::{debug, info, instrument, warn};

use crate::pdf::text;
use crate::source::{ColorSpace, EmbeddedImage, ImageEncoding, SourceDocument};

/// Filters whose output lopdf can hand back as plain samples.
const STREAM_FILTERS: &[&[u8]] = &[
    b"FlateDecode",
    b"LZWDecode",
    b"ASCII85Decode",
    b"ASCIIHexDecode",
    b"RunLengthDecode",
];

/// Maximum number of indirections followed when resolving a reference.
const MAX_DEREF: usize = 16;

/// Read-only view of a stamp sheet PDF.
///
/// Wraps `lopdf::Document`; never mutates it.
pub struct PdfSource {
    document: Document,
}

impl PdfSource {
    // -- Construction ---------------------------------------------------------

    /// Open a PDF from the filesystem.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_ref = path.as_ref();
        info!("Opening source PDF: {}", path_ref.display());

        let document = Document::load(path_ref).map_err(|err| {
            StampError::Pdf(format!("failed to open {}: {}", path_ref.display(), err))
        })?;

        debug!(pages = document.get_pages().len(), "PDF loaded");

        Ok(Self { document })
    }

    /// Create a source from raw PDF bytes already in memory.
    #[instrument(skip_all, fields(bytes_len = data.len()))]
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        let document = Document::load_mem(data)
            .map_err(|err| StampError::Pdf(format!("failed to load PDF from memory: {}", err)))?;

        debug!(pages = document.get_pages().len(), "PDF loaded from bytes");

        Ok(Self { document })
    }

    // -- Inspection -----------------------------------------------------------

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.document.get_pages().len()
    }

    // -- Helpers --------------------------------------------------------------

    fn page_id(&self, page: u32) -> Result<ObjectId> {
        let pages = self.document.get_pages();
        pages.get(&page).copied().ok_or_else(|| {
            StampError::Pdf(format!(
                "page {} not found (document has {} pages)",
                page,
                pages.len()
            ))
        })
    }

    fn page_resources(&self, page_id: ObjectId) -> Option<&Dictionary> {
        inherited_resources(&self.document, page_id)
    }

    fn read_image(
        &self,
        page: u32,
        index: usize,
        stream: &lopdf::Stream,
    ) -> Result<EmbeddedImage> {
        let decode_err = |reason: String| StampError::Decode {
            page,
            image: index,
            reason,
        };
        let dict = &stream.dict;

        let dimension = |key: &[u8]| -> Result<u32> {
            dict.get(key)
                .ok()
                .and_then(|obj| resolve(&self.document, obj).as_i64().ok())
                .filter(|v| *v > 0)
                .map(|v| v as u32)
                .ok_or_else(|| {
                    decode_err(format!(
                        "missing or invalid /{}",
                        String::from_utf8_lossy(key)
                    ))
                })
        };
        let width = dimension(b"Width")?;
        let height = dimension(b"Height")?;

        let is_mask = dict
            .get(b"ImageMask")
            .ok()
            .and_then(|obj| obj.as_bool().ok())
            .unwrap_or(false);

        let bits_per_component = if is_mask {
            1
        } else {
            dict.get(b"BitsPerComponent")
                .ok()
                .and_then(|obj| resolve(&self.document, obj).as_i64().ok())
                .map(|b| b as u8)
                .unwrap_or(8)
        };

        let color_space = if is_mask {
            ColorSpace::Gray
        } else {
            match dict.get(b"ColorSpace") {
                Ok(cs) => parse_color_space(&self.document, cs),
                Err(_) => ColorSpace::Gray,
            }
        };

        let inverted = dict
            .get(b"Decode")
            .ok()
            .and_then(|obj| resolve(&self.document, obj).as_array().ok())
            .and_then(|arr| Some((number(arr.first()?)?, number(arr.get(1)?)?)))
            .is_some_and(|(lo, hi)| lo > hi);

        let filters = stream_filters(&self.document, dict);
        let (encoding, data) = if filters.is_empty() {
            (ImageEncoding::Raw, stream.content.clone())
        } else if filters.len() == 1 && filters[0] == b"DCTDecode" {
            (ImageEncoding::Jpeg, stream.content.clone())
        } else if filters.iter().all(|f| STREAM_FILTERS.contains(&f.as_slice())) {
            let data = stream
                .decompressed_content()
                .map_err(|err| decode_err(format!("failed to decompress samples: {}", err)))?;
            (ImageEncoding::Raw, data)
        } else {
            let names: Vec<String> = filters
                .iter()
                .map(|f| String::from_utf8_lossy(f).into_owned())
                .collect();
            (
                ImageEncoding::Unsupported(names.join(" ")),
                stream.content.clone(),
            )
        };

        debug!(
            page,
            index,
            width,
            height,
            bits_per_component,
            ?color_space,
            ?encoding,
            "Embedded image found"
        );

        Ok(EmbeddedImage {
            page,
            index,
            width,
            height,
            bits_per_component,
            color_space,
            encoding,
            inverted,
            data,
        })
    }
}

impl SourceDocument for PdfSource {
    fn page_numbers(&self) -> Vec<u32> {
        self.document.get_pages().keys().copied().collect()
    }

    #[instrument(skip(self))]
    fn page_images(&self, page: u32) -> Result<Vec<EmbeddedImage>> {
        let page_id = self.page_id(page)?;

        let Some(xobjects) = self
            .page_resources(page_id)
            .and_then(|res| res.get(b"XObject").ok())
            .and_then(|obj| as_dict(&self.document, obj))
        else {
            return Ok(Vec::new());
        };

        let mut images = Vec::new();
        for (name, obj) in xobjects.iter() {
            let Object::Stream(stream) = resolve(&self.document, obj) else {
                warn!(
                    page,
                    name = %String::from_utf8_lossy(name),
                    "XObject is not a stream, skipping"
                );
                continue;
            };
            let is_image = stream
                .dict
                .get(b"Subtype")
                .ok()
                .and_then(|s| s.as_name().ok())
                .is_some_and(|s| s == b"Image");
            if !is_image {
                continue;
            }
            images.push(self.read_image(page, images.len(), stream)?);
        }

        Ok(images)
    }

    #[instrument(skip(self))]
    fn page_text_blocks(&self, page: u32) -> Result<Vec<TextBlock>> {
        let page_id = self.page_id(page)?;
        text::extract_blocks(&self.document, page_id)
    }
}

// -- Object helpers -----------------------------------------------------------

/// Follow references until a direct object is reached.
pub(crate) fn resolve<'a>(doc: &'a Document, mut obj: &'a Object) -> &'a Object {
    for _ in 0..MAX_DEREF {
        match obj {
            Object::Reference(id) => match doc.get_object(*id) {
                Ok(next) => obj = next,
                Err(_) => return &Object::Null,
            },
            _ => return obj,
        }
    }
    &Object::Null
}

/// The page's `/Resources`, inherited from the page tree when absent.
pub(crate) fn inherited_resources(doc: &Document, page_id: ObjectId) -> Option<&Dictionary> {
    let mut current = doc.get_dictionary(page_id).ok();
    for _ in 0..MAX_DEREF {
        let dict = current?;
        if let Ok(resources) = dict.get(b"Resources") {
            return as_dict(doc, resources);
        }
        current = dict
            .get(b"Parent")
            .ok()
            .and_then(|parent| as_dict(doc, parent));
    }
    None
}

pub(crate) fn as_dict<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Dictionary> {
    match resolve(doc, obj) {
        Object::Dictionary(dict) => Some(dict),
        Object::Stream(stream) => Some(&stream.dict),
        _ => None,
    }
}

pub(crate) fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r),
        _ => None,
    }
}

fn stream_filters(doc: &Document, dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter").map(|f| resolve(doc, f)) {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(arr)) => arr
            .iter()
            .filter_map(|f| resolve(doc, f).as_name().ok().map(|n| n.to_vec()))
            .collect(),
        _ => Vec::new(),
    }
}

fn parse_color_space(doc: &Document, obj: &Object) -> ColorSpace {
    match resolve(doc, obj) {
        Object::Name(name) => match name.as_slice() {
            b"DeviceGray" | b"CalGray" | b"G" => ColorSpace::Gray,
            b"DeviceRGB" | b"CalRGB" | b"RGB" => ColorSpace::Rgb,
            other => ColorSpace::Unsupported(String::from_utf8_lossy(other).into_owned()),
        },
        Object::Array(arr) => {
            let family = arr
                .first()
                .and_then(|f| resolve(doc, f).as_name().ok())
                .unwrap_or(b"");
            match family {
                b"CalGray" => ColorSpace::Gray,
                b"CalRGB" => ColorSpace::Rgb,
                b"ICCBased" => {
                    let components = arr
                        .get(1)
                        .and_then(|s| as_dict(doc, s))
                        .and_then(|d| d.get(b"N").ok())
                        .and_then(|n| n.as_i64().ok());
                    match components {
                        Some(1) => ColorSpace::Gray,
                        Some(3) => ColorSpace::Rgb,
                        other => ColorSpace::Unsupported(format!("ICCBased with N={other:?}")),
                    }
                }
                b"Indexed" | b"I" => parse_indexed(doc, arr),
                other => ColorSpace::Unsupported(String::from_utf8_lossy(other).into_owned()),
            }
        }
        _ => ColorSpace::Unsupported("malformed /ColorSpace".into()),
    }
}

/// `[/Indexed base hival lookup]`
fn parse_indexed(doc: &Document, arr: &[Object]) -> ColorSpace {
    let components = match arr.get(1).map(|base| parse_color_space(doc, base)) {
        Some(ColorSpace::Gray) => 1,
        Some(ColorSpace::Rgb) => 3,
        _ => return ColorSpace::Unsupported("Indexed over an unsupported base".into()),
    };
    let palette = match arr.get(3).map(|lookup| resolve(doc, lookup)) {
        Some(Object::String(bytes, _)) => bytes.clone(),
        Some(Object::Stream(stream)) => stream
            .decompressed_content()
            .unwrap_or_else(|_| stream.content.clone()),
        _ => return ColorSpace::Unsupported("Indexed without a lookup table".into()),
    };
    ColorSpace::Indexed {
        components,
        palette,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lopdf::{Stream, dictionary};

    #[test]
    fn device_color_spaces() {
        let doc = Document::with_version("1.5");
        assert_eq!(
            parse_color_space(&doc, &Object::Name(b"DeviceGray".to_vec())),
            ColorSpace::Gray
        );
        assert_eq!(
            parse_color_space(&doc, &Object::Name(b"DeviceRGB".to_vec())),
            ColorSpace::Rgb
        );
        assert!(matches!(
            parse_color_space(&doc, &Object::Name(b"DeviceCMYK".to_vec())),
            ColorSpace::Unsupported(_)
        ));
    }

    #[test]
    fn icc_based_uses_component_count() {
        let mut doc = Document::with_version("1.5");
        let icc = doc.add_object(Stream::new(dictionary! { "N" => 1 }, Vec::new()));
        let cs = Object::Array(vec![
            Object::Name(b"ICCBased".to_vec()),
            Object::Reference(icc),
        ]);
        assert_eq!(parse_color_space(&doc, &cs), ColorSpace::Gray);
    }

    #[test]
    fn indexed_reads_palette() {
        let doc = Document::with_version("1.5");
        let cs = Object::Array(vec![
            Object::Name(b"Indexed".to_vec()),
            Object::Name(b"DeviceRGB".to_vec()),
            Object::Integer(1),
            Object::String(vec![0, 0, 0, 255, 255, 255], lopdf::StringFormat::Hexadecimal),
        ]);
        assert_eq!(
            parse_color_space(&doc, &cs),
            ColorSpace::Indexed {
                components: 3,
                palette: vec![0, 0, 0, 255, 255, 255],
            }
        );
    }

    #[test]
    fn resolve_follows_references() {
        let mut doc = Document::with_version("1.5");
        let inner = doc.add_object(Object::Integer(42));
        let outer = doc.add_object(Object::Reference(inner));
        assert_eq!(
            resolve(&doc, &Object::Reference(outer)).as_i64().ok(),
            Some(42)
        );
        assert!(matches!(
            resolve(&doc, &Object::Reference((999, 0))),
            Object::Null
        ));
    }

    #[test]
    fn garbage_bytes_are_a_pdf_error() {
        let result = PdfSource::from_bytes(b"definitely not a pdf");
        assert!(matches!(result, Err(StampError::Pdf(_))));
    }
}
