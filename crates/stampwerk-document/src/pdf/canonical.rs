// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Output canonicalisation — rewrites a freshly generated PDF so that the same
// draw plan always serialises to the same bytes.
//
// printpdf names fonts and XObjects with random identifiers, stamps creation
// dates and a document ID, and tags font subsets with random prefixes. An
// embedded font's random identifier doubles as its /BaseFont and /FontName and
// is written into its ToUnicode CMap. This pass renames page resources by first
// use in the content stream, renames generated font names everywhere they
// occur, drops dates, IDs and XMP metadata, retags font subsets, and copies the
// object graph into a fresh document in traversal order with sorted keys.

use std::collections::{BTreeMap, HashMap};

use lopdf::content::{Content, Operation};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use stampwerk_core::error::{Result, StampError};
use tracing::{debug, instrument, warn};

use super::reader::inherited_resources;
use super::text::page_content;

/// Info entries that survive canonicalisation.
const KEPT_INFO_KEYS: [&[u8]; 3] = [b"Title", b"Producer", b"Creator"];

/// Length of the identifiers printpdf generates for fonts.
const GENERATED_NAME_LEN: usize = 32;

/// Stream dictionary keys that mark an embedded font program.
const FONT_PROGRAM_KEYS: [&[u8]; 3] = [b"Length1", b"Length2", b"Length3"];

/// Re-serialise `raw` deterministically with every page's MediaBox set to
/// `[0 0 width height]`.
#[instrument(skip(raw), fields(bytes = raw.len()))]
pub fn canonicalize(raw: &[u8], width: f32, height: f32) -> Result<Vec<u8>> {
    let source = Document::load_mem(raw)
        .map_err(|err| StampError::Pdf(format!("rendered PDF could not be re-read: {}", err)))?;

    let mut pages = HashMap::new();
    let mut used_fonts = Vec::new();
    for page_id in source.get_pages().into_values() {
        let rewrite = rewrite_page(&source, page_id)?;
        used_fonts.extend(font_names(&source, &rewrite.resources));
        pages.insert(page_id, rewrite);
    }

    let root = source
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .map_err(|err| StampError::Pdf(format!("rendered PDF has no catalog: {}", err)))?;

    let mut copier = GraphCopier {
        source: &source,
        target: Document::with_version(source.version.clone()),
        copied: HashMap::new(),
        pages,
        subset_tags: BTreeMap::new(),
        font_names: BTreeMap::new(),
        media_box: Object::Array(vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Real(width),
            Object::Real(height),
        ]),
    };

    for name in &used_fonts {
        copier.rename_font(name);
    }
    let new_root = copier.copy_catalog(root)?;
    copier.target.trailer.set("Root", Object::Reference(new_root));

    if let Some(info) = source
        .trailer
        .get(b"Info")
        .ok()
        .and_then(|info| super::reader::as_dict(&source, info))
    {
        let mut kept = Dictionary::new();
        for key in KEPT_INFO_KEYS {
            if let Ok(value) = info.get(key) {
                kept.set(key, copier.copy_object(value)?);
            }
        }
        let info_id = copier.target.add_object(kept);
        copier.target.trailer.set("Info", Object::Reference(info_id));
    }

    let mut target = copier.target;
    debug!(objects = target.objects.len(), "PDF canonicalised");

    let mut output = Vec::new();
    target
        .save_to(&mut output)
        .map_err(|err| StampError::Pdf(format!("failed to serialise label: {}", err)))?;
    Ok(output)
}

// -- Resource renaming -------------------------------------------------------

/// A page's content stream and resources after renaming.
struct PageRewrite {
    content: Vec<u8>,
    resources: Dictionary,
}

fn rewrite_page(doc: &Document, page_id: ObjectId) -> Result<PageRewrite> {
    let raw = page_content(doc, page_id)?;
    let mut content = Content::decode(&raw)
        .map_err(|err| StampError::Pdf(format!("cannot parse label content: {}", err)))?;

    let mut renamer = ResourceRenamer::default();
    for operation in &mut content.operations {
        renamer.rename(operation);
    }

    let empty = Dictionary::new();
    let resources = renamer.build(doc, inherited_resources(doc, page_id).unwrap_or(&empty));
    let content = content
        .encode()
        .map_err(|err| StampError::Pdf(format!("cannot encode label content: {}", err)))?;

    Ok(PageRewrite { content, resources })
}

/// Resource category an operator refers to, and which operand holds the name.
fn resource_operand(operator: &str, operands: &[Object]) -> Option<(&'static str, usize)> {
    match operator {
        "Tf" => Some(("Font", 0)),
        "Do" => Some(("XObject", 0)),
        "gs" => Some(("ExtGState", 0)),
        "sh" => Some(("Shading", 0)),
        "cs" | "CS" => Some(("ColorSpace", 0)),
        "scn" | "SCN" => match operands.last() {
            Some(Object::Name(_)) => Some(("Pattern", operands.len() - 1)),
            _ => None,
        },
        "BDC" | "DP" => match operands.get(1) {
            Some(Object::Name(_)) => Some(("Properties", 1)),
            _ => None,
        },
        _ => None,
    }
}

fn category_prefix(category: &str) -> &'static str {
    match category {
        "Font" => "F",
        "XObject" => "X",
        "ExtGState" => "GS",
        "Shading" => "SH",
        "ColorSpace" => "CS",
        "Pattern" => "P",
        _ => "MC",
    }
}

#[derive(Default)]
struct ResourceRenamer {
    /// (category, old name) -> new name. Numbers are handed out by first use.
    names: BTreeMap<(&'static str, Vec<u8>), Vec<u8>>,
    counters: BTreeMap<&'static str, usize>,
}

impl ResourceRenamer {
    fn rename(&mut self, operation: &mut Operation) {
        let Some((category, slot)) = resource_operand(&operation.operator, &operation.operands)
        else {
            return;
        };
        let Some(Object::Name(old)) = operation.operands.get(slot) else {
            return;
        };
        // Device colour spaces are not resources.
        if category == "ColorSpace" && old.starts_with(b"Device") {
            return;
        }

        let key = (category, old.clone());
        let new = match self.names.get(&key) {
            Some(new) => new.clone(),
            None => {
                let counter = self.counters.entry(category).or_insert(0);
                *counter += 1;
                let new = format!("{}{}", category_prefix(category), counter).into_bytes();
                self.names.insert(key, new.clone());
                new
            }
        };
        operation.operands[slot] = Object::Name(new);
    }

    /// Resources dictionary holding only the renamed, used entries.
    fn build(&self, doc: &Document, old: &Dictionary) -> Dictionary {
        let mut resources = Dictionary::new();
        let mut by_category: BTreeMap<&str, Dictionary> = BTreeMap::new();

        for ((category, old_name), new_name) in &self.names {
            let value = old
                .get(category.as_bytes())
                .ok()
                .and_then(|dict| super::reader::as_dict(doc, dict))
                .and_then(|dict| dict.get(old_name).ok());
            match value {
                Some(value) => {
                    by_category
                        .entry(*category)
                        .or_default()
                        .set(new_name.clone(), value.clone());
                }
                None => warn!(
                    category,
                    name = %String::from_utf8_lossy(old_name),
                    "Content refers to a missing resource"
                ),
            }
        }

        for (category, dict) in by_category {
            resources.set(category, Object::Dictionary(dict));
        }
        if let Ok(procset) = old.get(b"ProcSet") {
            resources.set("ProcSet", procset.clone());
        }
        resources
    }
}

/// Base font names of a page's fonts and their descendants, in resource name
/// order (F1, F2, ..., F10).
fn font_names(doc: &Document, resources: &Dictionary) -> Vec<Vec<u8>> {
    let Some(fonts) = resources
        .get(b"Font")
        .ok()
        .and_then(|fonts| super::reader::as_dict(doc, fonts))
    else {
        return Vec::new();
    };

    let mut entries: Vec<(&Vec<u8>, &Object)> = fonts.iter().collect();
    entries.sort_by(|a, b| (a.0.len(), a.0).cmp(&(b.0.len(), b.0)));

    let base_font = |font: &Dictionary| {
        font.get(b"BaseFont")
            .and_then(Object::as_name)
            .ok()
            .map(<[u8]>::to_vec)
    };

    let mut names = Vec::new();
    for (_, font) in entries {
        let Some(font) = super::reader::as_dict(doc, font) else {
            continue;
        };
        names.extend(base_font(font));
        if let Ok(descendants) = font
            .get(b"DescendantFonts")
            .map(|d| super::reader::resolve(doc, d))
            .and_then(Object::as_array)
        {
            for descendant in descendants {
                if let Some(descendant) = super::reader::as_dict(doc, descendant) {
                    names.extend(base_font(descendant));
                }
            }
        }
    }
    names
}

// -- Graph copy --------------------------------------------------------------

struct GraphCopier<'a> {
    source: &'a Document,
    target: Document,
    /// Source id -> target id. Entries are made before recursing, so cycles
    /// (e.g. `/Parent`) resolve to the id being built.
    copied: HashMap<ObjectId, ObjectId>,
    pages: HashMap<ObjectId, PageRewrite>,
    /// Random subset tag -> deterministic replacement.
    subset_tags: BTreeMap<Vec<u8>, Vec<u8>>,
    /// Generated font name -> `LabelFont<n>`, numbered by first use.
    font_names: BTreeMap<Vec<u8>, Vec<u8>>,
    media_box: Object,
}

impl GraphCopier<'_> {
    fn copy_catalog(&mut self, root: ObjectId) -> Result<ObjectId> {
        let catalog = self
            .source
            .get_dictionary(root)
            .map_err(|err| StampError::Pdf(format!("cannot read catalog: {}", err)))?;
        let new_id = self.target.new_object_id();
        self.copied.insert(root, new_id);

        let mut stripped = catalog.clone();
        stripped.remove(b"Metadata");
        let copy = self.copy_dict(&stripped)?;
        self.target.objects.insert(new_id, Object::Dictionary(copy));
        Ok(new_id)
    }

    fn copy_reference(&mut self, id: ObjectId) -> Result<ObjectId> {
        if let Some(&new_id) = self.copied.get(&id) {
            return Ok(new_id);
        }
        let new_id = self.target.new_object_id();
        self.copied.insert(id, new_id);

        let object = match self.pages.remove(&id) {
            Some(rewrite) => self.copy_page(id, rewrite)?,
            None => {
                let source = self.source;
                match source.get_object(id) {
                    Ok(object) => self.copy_object(object)?,
                    Err(err) => {
                        warn!(?id, %err, "Cannot resolve reference, using Null");
                        Object::Null
                    }
                }
            }
        };
        self.target.objects.insert(new_id, object);
        Ok(new_id)
    }

    fn copy_object(&mut self, object: &Object) -> Result<Object> {
        Ok(match object {
            Object::Reference(id) => Object::Reference(self.copy_reference(*id)?),
            Object::Dictionary(dict) => Object::Dictionary(self.copy_dict(dict)?),
            Object::Array(items) => Object::Array(
                items
                    .iter()
                    .map(|item| self.copy_object(item))
                    .collect::<Result<_>>()?,
            ),
            Object::Stream(stream) => Object::Stream(self.copy_stream(stream)?),
            Object::Name(name) => Object::Name(
                self.replace_font_names(name)
                    .unwrap_or_else(|| name.clone()),
            ),
            Object::String(bytes, format) => Object::String(
                self.replace_font_names(bytes)
                    .unwrap_or_else(|| bytes.clone()),
                *format,
            ),
            other => other.clone(),
        })
    }

    /// Copy a stream, rewriting generated font names inside its data. Font
    /// programs and images are copied untouched; a rewritten stream is stored
    /// unfiltered.
    fn copy_stream(&mut self, stream: &Stream) -> Result<Stream> {
        let mut dict = self.copy_dict(&stream.dict)?;

        let opaque = FONT_PROGRAM_KEYS.iter().any(|key| stream.dict.has(key))
            || stream
                .dict
                .get(b"Subtype")
                .and_then(Object::as_name)
                .is_ok_and(|subtype| subtype == b"Image");
        if !opaque && !self.font_names.is_empty() {
            let plain = stream.get_plain_content().map_err(|err| {
                StampError::Pdf(format!("cannot decode stream in label: {}", err))
            })?;
            if let Some(rewritten) = self.replace_font_names(&plain) {
                let mut copy = Stream::new(dict, Vec::new());
                copy.set_plain_content(rewritten);
                return Ok(copy);
            }
        }

        dict.set("Length", stream.content.len() as i64);
        Ok(Stream::new(dict, stream.content.clone()))
    }

    /// `bytes` with every known generated font name replaced, or `None` when
    /// none occurs.
    fn replace_font_names(&self, bytes: &[u8]) -> Option<Vec<u8>> {
        let mut current: Option<Vec<u8>> = None;
        for (generated, replacement) in &self.font_names {
            let haystack = current.as_deref().unwrap_or(bytes);
            if let Some(replaced) = replace_all(haystack, generated, replacement) {
                current = Some(replaced);
            }
        }
        current
    }

    fn copy_dict(&mut self, dict: &Dictionary) -> Result<Dictionary> {
        let mut entries: Vec<(&Vec<u8>, &Object)> = dict.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut copy = Dictionary::new();
        for (key, value) in entries {
            let value = match (key.as_slice(), value) {
                (b"BaseFont" | b"FontName", Object::Name(name)) => {
                    Object::Name(self.rename_font(name))
                }
                _ => self.copy_object(value)?,
            };
            copy.set(key.clone(), value);
        }
        Ok(copy)
    }

    fn copy_page(&mut self, page_id: ObjectId, rewrite: PageRewrite) -> Result<Object> {
        let source = self.source;
        let page = source
            .get_dictionary(page_id)
            .map_err(|err| StampError::Pdf(format!("cannot read page {:?}: {}", page_id, err)))?;

        let mut stripped = page.clone();
        for key in [&b"Contents"[..], b"Resources", b"MediaBox", b"CropBox"] {
            stripped.remove(key);
        }
        let mut copy = self.copy_dict(&stripped)?;

        copy.set("MediaBox", self.media_box.clone());
        copy.set("Resources", Object::Dictionary(self.copy_dict(&rewrite.resources)?));

        let mut stream_dict = Dictionary::new();
        stream_dict.set("Length", rewrite.content.len() as i64);
        let content_id = self
            .target
            .add_object(Stream::new(stream_dict, rewrite.content));
        copy.set("Contents", Object::Reference(content_id));

        Ok(Object::Dictionary(copy))
    }

    /// Deterministic replacement for a font name: generated names become
    /// `LabelFont1`, `LabelFont2`, ... and subset tags are retagged. Anything
    /// else is kept.
    fn rename_font(&mut self, name: &[u8]) -> Vec<u8> {
        if !is_generated_name(name) {
            return self.retag_subset(name);
        }
        let next = self.font_names.len() + 1;
        self.font_names
            .entry(name.to_vec())
            .or_insert_with(|| format!("LabelFont{next}").into_bytes())
            .clone()
    }

    /// `ABCDEF+Name` -> `AAAAAA+Name`, `AAAAAB+Name`, ... by first appearance.
    fn retag_subset(&mut self, name: &[u8]) -> Vec<u8> {
        let is_tagged = name.len() > 7
            && name[6] == b'+'
            && name[..6].iter().all(|b| b.is_ascii_uppercase());
        if !is_tagged {
            return name.to_vec();
        }

        let next = self.subset_tags.len();
        let tag = self
            .subset_tags
            .entry(name[..6].to_vec())
            .or_insert_with(|| subset_tag(next))
            .clone();
        let mut renamed = tag;
        renamed.extend_from_slice(&name[6..]);
        renamed
    }
}

/// Whether `name` has the shape of a printpdf font identifier.
fn is_generated_name(name: &[u8]) -> bool {
    name.len() == GENERATED_NAME_LEN && name.iter().all(u8::is_ascii_uppercase)
}

/// `haystack` with every occurrence of `from` replaced by `to`, or `None`
/// when there is none.
fn replace_all(haystack: &[u8], from: &[u8], to: &[u8]) -> Option<Vec<u8>> {
    if from.is_empty() || haystack.len() < from.len() {
        return None;
    }
    let mut output = Vec::with_capacity(haystack.len());
    let mut rest = haystack;
    let mut found = false;
    while let Some(pos) = rest.windows(from.len()).position(|window| window == from) {
        output.extend_from_slice(&rest[..pos]);
        output.extend_from_slice(to);
        rest = &rest[pos + from.len()..];
        found = true;
    }
    if !found {
        return None;
    }
    output.extend_from_slice(rest);
    Some(output)
}

/// The `n`-th six-letter tag: AAAAAA, AAAAAB, ...
fn subset_tag(mut n: usize) -> Vec<u8> {
    let mut tag = vec![b'A'; 6];
    for slot in tag.iter_mut().rev() {
        *slot = b'A' + (n % 26) as u8;
        n /= 26;
    }
    tag
}
