//! PDF document reader.
//!
//! Turns each page of a PDF into positioned word tokens and embedded images,
//! using lopdf to parse the file and walk content streams.

pub mod content;
pub mod images;

use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId};
use slides_core::{
    BoundingBox, DocumentReader, Error, ImageSource, Page, PageImage, PositionedToken, Result,
};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub use content::{scan_operations, PageScan, Placement, Word};

/// Page height used when no MediaBox can be found (US Letter).
const DEFAULT_PAGE_HEIGHT: f64 = 792.0;

/// Best-effort decoding of raw PDF string bytes.
///
/// Tries UTF-16BE with BOM, then UTF-8, then falls back to Latin-1.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let units: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }

    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    bytes.iter().map(|&b| b as char).collect()
}

/// Decode shown text given the font's declared encoding name.
///
/// Identity encodings carry 2-byte codes, which usually map straight to
/// UTF-16BE for the fonts we see in practice.
pub fn decode_text(encoding: Option<&str>, bytes: &[u8]) -> String {
    if let Some(enc) = encoding {
        if enc.contains("Identity") && bytes.len() >= 2 && bytes.len() % 2 == 0 {
            let units: Vec<u16> = bytes
                .chunks_exact(2)
                .map(|c| u16::from_be_bytes([c[0], c[1]]))
                .collect();
            let decoded = String::from_utf16_lossy(&units);
            if !decoded.chars().all(|c| c == '\u{FFFD}' || c == '\0') {
                return decoded;
            }
        }
    }
    decode_text_simple(bytes)
}

/// Reads PDF files into pages of tokens and images.
#[derive(Debug, Clone, Default)]
pub struct PdfReader {
    skip_images: bool,
}

impl PdfReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ignore embedded images entirely.
    pub fn with_skip_images(mut self, skip: bool) -> Self {
        self.skip_images = skip;
        self
    }

    /// Parse a PDF held in memory.
    pub fn read_bytes(&self, data: &[u8]) -> Result<Vec<Page>> {
        let doc = Document::load_mem(data)
            .map_err(|e| Error::PdfParseError(format!("Failed to parse PDF: {}", e)))?;

        if doc.is_encrypted() {
            return Err(Error::UnsupportedFormat(
                "Encrypted PDF documents are not supported".to_string(),
            ));
        }

        let page_ids = doc.get_pages();
        let mut pages = Vec::with_capacity(page_ids.len());

        for (index, (&number, &page_id)) in page_ids.iter().enumerate() {
            let page = self.read_page(&doc, index, page_id).map_err(|e| match e {
                Error::PdfParseError(msg) => {
                    Error::PdfParseError(format!("Page {}: {}", number, msg))
                }
                other => other,
            })?;
            log::debug!(
                "Page {}: {} tokens, {} images",
                number,
                page.tokens.len(),
                page.images.len()
            );
            pages.push(page);
        }

        Ok(pages)
    }

    fn read_page(&self, doc: &Document, index: usize, page_id: ObjectId) -> Result<Page> {
        let page_dict = doc
            .get_object(page_id)
            .and_then(Object::as_dict)
            .map_err(|e| Error::PdfParseError(format!("Cannot get page object: {}", e)))?;

        let data = doc
            .get_page_content(page_id)
            .map_err(|e| Error::PdfParseError(format!("Cannot get page content: {}", e)))?;
        let content = Content::decode(&data)
            .map_err(|e| Error::PdfParseError(format!("Content stream decode error: {}", e)))?;

        let encodings = font_encodings(doc, page_id);
        let decode = |font: &[u8], bytes: &[u8]| {
            decode_text(encodings.get(font).map(String::as_str), bytes)
        };
        let scan = scan_operations(&content.operations, &decode);

        let height = page_height(doc, page_dict);
        let mut page = Page::new(index);

        for word in &scan.words {
            let bbox = BoundingBox::new(
                word.x,
                height - word.y - word.font_size,
                word.x + word.width,
                height - word.y,
            );
            page.tokens
                .push(PositionedToken::with_bbox(&word.text, word.font_size, index, bbox));
        }
        page.sort_tokens_by_position();

        if !self.skip_images {
            page.images = page_images(doc, page_dict, index, height, &scan.placements);
        }

        Ok(page)
    }
}

impl DocumentReader for PdfReader {
    fn read_pages(&self, path: &Path) -> Result<Vec<Page>> {
        let data = fs::read(path)?;
        self.read_bytes(&data)
    }
}

/// Map of font resource name to declared encoding name.
fn font_encodings(doc: &Document, page_id: ObjectId) -> BTreeMap<Vec<u8>, String> {
    let fonts = match doc.get_page_fonts(page_id) {
        Ok(fonts) => fonts,
        Err(e) => {
            log::debug!("No fonts for page {:?}: {}", page_id, e);
            return BTreeMap::new();
        }
    };

    fonts
        .into_iter()
        .filter_map(|(name, dict)| match dict.get(b"Encoding").ok()? {
            Object::Name(enc) => Some((name, String::from_utf8_lossy(enc).into_owned())),
            _ => None,
        })
        .collect()
}

/// Height of the page's MediaBox, looked up through the page tree.
fn page_height(doc: &Document, page: &Dictionary) -> f64 {
    let media_box = page
        .get(b"MediaBox")
        .ok()
        .map(|o| images::resolve(doc, o))
        .and_then(|o| o.as_array().ok());

    if let Some(arr) = media_box {
        let nums: Vec<f64> = arr
            .iter()
            .filter_map(|o| content::number(images::resolve(doc, o)))
            .collect();
        if nums.len() == 4 {
            return (nums[3] - nums[1]).abs();
        }
    }

    match page
        .get(b"Parent")
        .ok()
        .map(|o| images::resolve(doc, o))
        .and_then(|o| o.as_dict().ok())
    {
        Some(parent) => page_height(doc, parent),
        None => DEFAULT_PAGE_HEIGHT,
    }
}

fn page_images(
    doc: &Document,
    page: &Dictionary,
    index: usize,
    height: f64,
    placements: &[Placement],
) -> Vec<PageImage> {
    if placements.is_empty() {
        return Vec::new();
    }
    let Some(xobjects) = images::page_xobjects(doc, page) else {
        return Vec::new();
    };

    let mut out = Vec::new();
    for placement in placements {
        let bbox = BoundingBox::new(
            placement.x0,
            height - placement.y1,
            placement.x1,
            height - placement.y0,
        );
        if !bbox.is_valid() {
            log::debug!(
                "Skipping image {} with empty placement",
                String::from_utf8_lossy(&placement.name)
            );
            continue;
        }

        match images::xobject_image(doc, xobjects, &placement.name) {
            Some((format, data)) => out.push(PageImage {
                page: index,
                bbox,
                source: ImageSource::Bytes { format, data },
            }),
            None => log::warn!(
                "Page {}: could not extract image {}",
                index + 1,
                String::from_utf8_lossy(&placement.name)
            ),
        }
    }
    out
}
