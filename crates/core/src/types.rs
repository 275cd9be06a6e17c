//! Domain types for positioned document content, outlines, and slide plans.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Axis-aligned box in page coordinates, origin at the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x0: f64,
    pub top: f64,
    pub x1: f64,
    pub bottom: f64,
}

impl BoundingBox {
    pub fn new(x0: f64, top: f64, x1: f64, bottom: f64) -> Self {
        Self {
            x0,
            top,
            x1,
            bottom,
        }
    }

    /// A box is usable when it has positive width and height.
    pub fn is_valid(&self) -> bool {
        self.x1 > self.x0 && self.bottom > self.top
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.bottom - self.top
    }
}

/// One lexical unit from the source document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionedToken {
    /// The word as it appears on the page.
    pub text: String,

    /// Rendered font size in points.
    pub font_size: f64,

    /// 0-based page index.
    pub page: usize,

    /// Where the word sits on the page, if the reader knows.
    pub bbox: Option<BoundingBox>,
}

impl PositionedToken {
    /// Create a token without position information.
    pub fn new(text: impl Into<String>, font_size: f64, page: usize) -> Self {
        Self {
            text: text.into(),
            font_size,
            page,
            bbox: None,
        }
    }

    /// Create a token with a bounding box.
    pub fn with_bbox(text: impl Into<String>, font_size: f64, page: usize, bbox: BoundingBox) -> Self {
        Self {
            text: text.into(),
            font_size,
            page,
            bbox: Some(bbox),
        }
    }
}

/// Encoded image formats we can persist and embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    Png,
    Jpeg,
}

impl ImageFormat {
    /// File extension used when persisting images of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Png => "png",
            Self::Jpeg => "jpeg",
        }
    }

    /// MIME type used in package content types.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
        }
    }

    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            _ => None,
        }
    }

    /// Detect format from file magic bytes.
    pub fn from_magic(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < 4 {
            return None;
        }

        // PNG: 89 50 4E 47
        if bytes.starts_with(&[0x89, 0x50, 0x4E, 0x47]) {
            return Some(Self::Png);
        }

        // JPEG: FF D8 FF
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }

        None
    }
}

/// Where the pixels of a page image live.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    /// Encoded bytes still held in memory.
    Bytes { format: ImageFormat, data: Vec<u8> },
    /// An image already persisted by the reader.
    Path(PathBuf),
}

/// One embedded raster region on a page.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    /// 0-based page index.
    pub page: usize,

    /// Placement of the image on the page.
    pub bbox: BoundingBox,

    pub source: ImageSource,
}

/// Tokens and images of one page, each in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// 0-based page index.
    pub index: usize,
    pub tokens: Vec<PositionedToken>,
    pub images: Vec<PageImage>,
}

impl Page {
    pub fn new(index: usize) -> Self {
        Self {
            index,
            tokens: Vec::new(),
            images: Vec::new(),
        }
    }

    /// Add a token, tagging it with this page's index.
    pub fn add_token(&mut self, text: impl Into<String>, font_size: f64) {
        self.tokens.push(PositionedToken::new(text, font_size, self.index));
    }

    /// Sort tokens top-to-bottom by baseline (to the nearest point), then
    /// left-to-right.
    ///
    /// Leaves the order alone unless every token has a bounding box.
    pub fn sort_tokens_by_position(&mut self) {
        if self.tokens.iter().any(|t| t.bbox.is_none()) {
            return;
        }

        self.tokens.sort_by(|a, b| match (a.bbox, b.bbox) {
            (Some(a), Some(b)) => a
                .bottom
                .round()
                .total_cmp(&b.bottom.round())
                .then_with(|| a.x0.total_cmp(&b.x0)),
            _ => std::cmp::Ordering::Equal,
        });
    }
}

/// Stable handle to a persisted image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(PathBuf);

impl ImageRef {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Image format guessed from the file extension.
    pub fn format(&self) -> Option<ImageFormat> {
        self.0
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ImageFormat::from_extension)
    }
}

/// A titled run of document content.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Section {
    pub title: String,

    /// Body text, words separated by single spaces.
    pub body: String,

    /// Images in encounter order.
    pub images: Vec<ImageRef>,
}

impl Section {
    /// Create an empty section.
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: String::new(),
            images: Vec::new(),
        }
    }

    /// Append a word followed by a separating space.
    pub fn append_text(&mut self, text: &str) {
        self.body.push_str(text);
        self.body.push(' ');
    }

    pub fn add_image(&mut self, image: ImageRef) {
        self.images.push(image);
    }
}

/// The finalized sequence of sections, in order of first title introduction.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Outline {
    pub sections: Vec<Section>,
}

impl Outline {
    pub fn new(sections: Vec<Section>) -> Self {
        Self { sections }
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Section titles in outline order.
    pub fn titles(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.title.as_str()).collect()
    }

    /// Look up a section by title.
    pub fn get(&self, title: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.title == title)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Section> {
        self.sections.iter()
    }
}

/// A section reduced to what the slide packer needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummarizedSection {
    pub title: String,
    pub bullets: Vec<String>,
    pub images: Vec<ImageRef>,
}

impl SummarizedSection {
    pub fn new(title: impl Into<String>, bullets: Vec<String>, images: Vec<ImageRef>) -> Self {
        Self {
            title: title.into(),
            bullets,
            images,
        }
    }
}

/// Slide template selector, chosen from a section's image count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayoutKind {
    /// Title and bullets only.
    NoImage,
    /// Bullets on the left, one picture on the right.
    OneImage,
    /// Bullets on the left, two stacked pictures on the right.
    TwoImages,
    /// A single full-size picture, nothing else.
    ImageOnly,
}

impl LayoutKind {
    /// Classify a section by how many images it carries.
    pub fn from_image_count(count: usize) -> Self {
        match count {
            0 => Self::NoImage,
            1 => Self::OneImage,
            2 => Self::TwoImages,
            _ => Self::ImageOnly,
        }
    }
}

/// One slide to be emitted by a deck writer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlidePlan {
    pub layout: LayoutKind,

    /// Set only on the first slide of a section.
    pub title: Option<String>,

    pub bullets: Vec<String>,

    pub images: Vec<ImageRef>,

    /// Font applied to every text run on the slide.
    pub font: String,
}
