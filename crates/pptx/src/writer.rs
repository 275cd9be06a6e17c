//! PPTX deck writer.
//!
//! Builds a 16:9 presentation with one master, one blank layout and a theme,
//! then lays out each slide plan with absolutely positioned text boxes and
//! pictures. The whole package is assembled in memory and written in one go,
//! so a failed run never leaves a half-written deck behind.

use crate::parts::*;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use slides_core::{DeckWriter, Error, ImageFormat, ImageRef, LayoutKind, Result, SlidePlan};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

pub const EMU_PER_INCH: f64 = 914_400.0;

/// 13.333in x 7.5in.
pub const SLIDE_WIDTH_EMU: i64 = 12_192_000;
pub const SLIDE_HEIGHT_EMU: i64 = 6_858_000;

const NOTES_WIDTH_EMU: i64 = 6_858_000;
const NOTES_HEIGHT_EMU: i64 = 9_144_000;

/// Indent of bulleted paragraphs, in EMU.
const BULLET_INDENT_EMU: i64 = 285_750;

/// Position and size of a shape, in inches.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    fn emu(&self) -> [String; 4] {
        [self.x, self.y, self.width, self.height]
            .map(|v| ((v * EMU_PER_INCH).round() as i64).to_string())
    }
}

pub const TITLE_FRAME: Frame = Frame::new(0.75, 0.4, 11.8, 1.4);
pub const TITLE_FONT_PT: u32 = 32;

/// Title box of the leading presentation title slide.
pub const PRESENTATION_TITLE_FRAME: Frame = Frame::new(0.75, 2.6, 11.8, 1.6);
pub const PRESENTATION_TITLE_FONT_PT: u32 = 44;

/// Where a layout puts its bullet text and pictures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayoutGeometry {
    /// Text box and font size in points.
    pub text: Option<(Frame, u32)>,
    pub pictures: &'static [Frame],
}

const ONE_PICTURE: [Frame; 1] = [Frame::new(8.61, 3.13, 3.0, 3.0)];
const TWO_PICTURES: [Frame; 2] = [
    Frame::new(6.5, 1.5, 3.0, 3.0),
    Frame::new(6.5, 4.5, 3.0, 3.0),
];
const FULL_PICTURE: [Frame; 1] = [Frame::new(1.0, 1.0, 8.0, 5.5)];

pub fn layout_geometry(layout: LayoutKind) -> LayoutGeometry {
    match layout {
        LayoutKind::NoImage => LayoutGeometry {
            text: Some((Frame::new(0.75, 2.34, 12.0, 5.0), 19)),
            pictures: &[],
        },
        LayoutKind::OneImage => LayoutGeometry {
            text: Some((Frame::new(0.75, 2.34, 6.66, 3.99), 19)),
            pictures: &ONE_PICTURE,
        },
        LayoutKind::TwoImages => LayoutGeometry {
            text: Some((Frame::new(0.75, 1.5, 5.5, 5.5), 20)),
            pictures: &TWO_PICTURES,
        },
        LayoutKind::ImageOnly => LayoutGeometry {
            text: None,
            pictures: &FULL_PICTURE,
        },
    }
}

fn xml_error(e: quick_xml::Error) -> Error {
    Error::XmlError(format!("Failed to write XML: {}", e))
}

fn zip_error(e: zip::result::ZipError) -> Error {
    Error::ZipError(format!("Failed to write package: {}", e))
}

fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r') || !(c < '\u{20}' || c == '\u{FFFE}' || c == '\u{FFFF}')
}

/// Drop characters that XML 1.0 does not allow, such as C0 controls left
/// over from custom PDF font encodings.
fn xml_chars(text: &str) -> Cow<'_, str> {
    if text.chars().all(is_xml_char) {
        Cow::Borrowed(text)
    } else {
        Cow::Owned(text.chars().filter(|&c| is_xml_char(c)).collect())
    }
}

/// Thin event writer over an in-memory buffer.
struct Xml {
    writer: Writer<Vec<u8>>,
}

impl Xml {
    fn new() -> Result<Self> {
        let mut writer = Writer::new(Vec::new());
        writer
            .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))
            .map_err(xml_error)?;
        Ok(Self { writer })
    }

    fn start(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Start(elem)).map_err(xml_error)
    }

    fn empty(&mut self, name: &str, attrs: &[(&str, &str)]) -> Result<()> {
        let elem = BytesStart::new(name).with_attributes(attrs.iter().copied());
        self.writer.write_event(Event::Empty(elem)).map_err(xml_error)
    }

    fn end(&mut self, name: &str) -> Result<()> {
        self.writer
            .write_event(Event::End(BytesEnd::new(name)))
            .map_err(xml_error)
    }

    fn text(&mut self, text: &str) -> Result<()> {
        self.writer
            .write_event(Event::Text(BytesText::new(&xml_chars(text))))
            .map_err(xml_error)
    }

    fn finish(self) -> Vec<u8> {
        self.writer.into_inner()
    }
}

/// Images embedded in the package, deduplicated by source path.
#[derive(Default)]
struct Media {
    by_path: HashMap<PathBuf, usize>,
    files: Vec<(String, Vec<u8>)>,
}

impl Media {
    /// Load an image and return its part name relative to `ppt/`.
    fn add(&mut self, image: &ImageRef) -> Result<String> {
        if let Some(&idx) = self.by_path.get(image.path()) {
            return Ok(self.files[idx].0.clone());
        }

        let data = fs::read(image.path()).map_err(|e| {
            Error::InvalidImageReference(format!("{}: {}", image.path().display(), e))
        })?;
        let format = ImageFormat::from_magic(&data)
            .or_else(|| image.format())
            .ok_or_else(|| {
                Error::InvalidImageReference(format!(
                    "{}: unsupported image format",
                    image.path().display()
                ))
            })?;

        let name = format!("media/image{}.{}", self.files.len() + 1, format.extension());
        self.by_path.insert(image.path().to_path_buf(), self.files.len());
        self.files.push((name.clone(), data));
        Ok(name)
    }
}

/// Writes slide plans as a .pptx file.
#[derive(Debug, Clone, Default)]
pub struct PptxDeckWriter {
    theme: Option<String>,
    title: Option<String>,
}

impl PptxDeckWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reuse the theme of an existing .pptx file.
    pub fn with_template(mut self, path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::TemplateMissing(path.display().to_string()));
        }

        let file = File::open(path)?;
        let mut archive = ZipArchive::new(file)
            .map_err(|e| Error::ZipError(format!("Failed to open template: {}", e)))?;

        let theme_name = archive
            .file_names()
            .filter(|n| n.starts_with("ppt/theme/theme") && n.ends_with(".xml"))
            .min()
            .map(str::to_string)
            .ok_or_else(|| {
                Error::TemplateMissing(format!("{} has no theme part", path.display()))
            })?;

        let mut theme = String::new();
        archive
            .by_name(&theme_name)
            .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", theme_name, e)))?
            .read_to_string(&mut theme)?;

        log::debug!("Using theme {} from {}", theme_name, path.display());
        self.theme = Some(theme);
        Ok(self)
    }

    /// Open the deck with a title slide showing `title`.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        let title = title.into();
        self.title = (!title.trim().is_empty()).then(|| title.trim().to_string());
        self
    }

    /// Build the package bytes for `plans`.
    pub fn render(&self, plans: &[SlidePlan], font: &str) -> Result<Vec<u8>> {
        let mut media = Media::default();
        let mut slides = Vec::with_capacity(plans.len() + 1);

        if let Some(title) = &self.title {
            slides.push((title_slide_xml(title, font)?, slide_rels_xml(&[])?));
        }
        for plan in plans {
            let font = if plan.font.is_empty() { font } else { &plan.font };
            let targets = plan
                .images
                .iter()
                .take(layout_geometry(plan.layout).pictures.len())
                .map(|image| media.add(image))
                .collect::<Result<Vec<_>>>()?;
            slides.push((slide_xml(plan, font, &targets)?, slide_rels_xml(&targets)?));
        }

        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let xml = FileOptions::default().compression_method(CompressionMethod::Deflated);
        let stored = FileOptions::default().compression_method(CompressionMethod::Stored);

        let mut put = |name: &str, data: &[u8], options: FileOptions| -> Result<()> {
            zip.start_file(name, options).map_err(zip_error)?;
            zip.write_all(data)?;
            Ok(())
        };

        put("[Content_Types].xml", &content_types_xml(slides.len())?, xml)?;
        put("_rels/.rels", &root_rels_xml()?, xml)?;
        put(PRESENTATION_PATH, &presentation_xml(slides.len())?, xml)?;
        put(PRESENTATION_RELS_PATH, &presentation_rels_xml(slides.len())?, xml)?;
        put(MASTER_PATH, SLIDE_MASTER_XML.as_bytes(), xml)?;
        put(MASTER_RELS_PATH, SLIDE_MASTER_RELS_XML.as_bytes(), xml)?;
        put(LAYOUT_PATH, SLIDE_LAYOUT_XML.as_bytes(), xml)?;
        put(LAYOUT_RELS_PATH, SLIDE_LAYOUT_RELS_XML.as_bytes(), xml)?;
        put(
            THEME_PATH,
            self.theme.as_deref().unwrap_or(DEFAULT_THEME_XML).as_bytes(),
            xml,
        )?;

        for (idx, (slide, rels)) in slides.iter().enumerate() {
            put(&format!("ppt/slides/slide{}.xml", idx + 1), slide, xml)?;
            put(&format!("ppt/slides/_rels/slide{}.xml.rels", idx + 1), rels, xml)?;
        }
        for (name, data) in &media.files {
            put(&format!("ppt/{}", name), data, stored)?;
        }

        let cursor = zip.finish().map_err(zip_error)?;
        Ok(cursor.into_inner())
    }
}

impl DeckWriter for PptxDeckWriter {
    fn write_deck(&self, plans: &[SlidePlan], font: &str, output: &Path) -> Result<()> {
        let bytes = self.render(plans, font)?;

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(output, bytes)?;

        log::info!(
            "Wrote {} slides to {}",
            plans.len() + usize::from(self.title.is_some()),
            output.display()
        );
        Ok(())
    }
}

fn content_types_xml(slide_count: usize) -> Result<Vec<u8>> {
    let mut x = Xml::new()?;
    x.start("Types", &[("xmlns", NS_CONTENT_TYPES)])?;
    x.empty("Default", &[("Extension", "rels"), ("ContentType", CT_RELS)])?;
    x.empty("Default", &[("Extension", "xml"), ("ContentType", "application/xml")])?;
    for format in [ImageFormat::Png, ImageFormat::Jpeg] {
        x.empty(
            "Default",
            &[("Extension", format.extension()), ("ContentType", format.content_type())],
        )?;
    }
    // Some tools write .jpg; harmless to declare both.
    x.empty("Default", &[("Extension", "jpg"), ("ContentType", "image/jpeg")])?;

    let overrides = [
        (PRESENTATION_PATH, CT_PRESENTATION),
        (MASTER_PATH, CT_SLIDE_MASTER),
        (LAYOUT_PATH, CT_SLIDE_LAYOUT),
        (THEME_PATH, CT_THEME),
    ];
    for (part, ct) in overrides {
        x.empty("Override", &[("PartName", format!("/{}", part).as_str()), ("ContentType", ct)])?;
    }
    for n in 1..=slide_count {
        x.empty(
            "Override",
            &[
                ("PartName", format!("/ppt/slides/slide{}.xml", n).as_str()),
                ("ContentType", CT_SLIDE),
            ],
        )?;
    }
    x.end("Types")?;
    Ok(x.finish())
}

fn relationships(rels: &[(String, String, String)]) -> Result<Vec<u8>> {
    let mut x = Xml::new()?;
    x.start("Relationships", &[("xmlns", NS_RELS)])?;
    for (id, kind, target) in rels {
        x.empty(
            "Relationship",
            &[
                ("Id", id.as_str()),
                ("Type", rel_type(kind).as_str()),
                ("Target", target.as_str()),
            ],
        )?;
    }
    x.end("Relationships")?;
    Ok(x.finish())
}

fn root_rels_xml() -> Result<Vec<u8>> {
    relationships(&[(
        "rId1".to_string(),
        "officeDocument".to_string(),
        PRESENTATION_PATH.to_string(),
    )])
}

/// Master is rId1, slides follow from rId2, theme comes last.
fn presentation_rels_xml(slide_count: usize) -> Result<Vec<u8>> {
    let mut rels = vec![(
        "rId1".to_string(),
        "slideMaster".to_string(),
        "slideMasters/slideMaster1.xml".to_string(),
    )];
    for n in 1..=slide_count {
        rels.push((
            format!("rId{}", n + 1),
            "slide".to_string(),
            format!("slides/slide{}.xml", n),
        ));
    }
    rels.push((
        format!("rId{}", slide_count + 2),
        "theme".to_string(),
        "theme/theme1.xml".to_string(),
    ));
    relationships(&rels)
}

fn presentation_xml(slide_count: usize) -> Result<Vec<u8>> {
    let mut x = Xml::new()?;
    x.start(
        "p:presentation",
        &[
            ("xmlns:a", NS_A),
            ("xmlns:r", NS_R),
            ("xmlns:p", NS_P),
            ("saveSubsetFonts", "1"),
        ],
    )?;

    x.start("p:sldMasterIdLst", &[])?;
    x.empty("p:sldMasterId", &[("id", "2147483648"), ("r:id", "rId1")])?;
    x.end("p:sldMasterIdLst")?;

    if slide_count > 0 {
        x.start("p:sldIdLst", &[])?;
        for n in 1..=slide_count {
            let id = (255 + n).to_string();
            let rid = format!("rId{}", n + 1);
            x.empty("p:sldId", &[("id", id.as_str()), ("r:id", rid.as_str())])?;
        }
        x.end("p:sldIdLst")?;
    }

    x.empty(
        "p:sldSz",
        &[
            ("cx", SLIDE_WIDTH_EMU.to_string().as_str()),
            ("cy", SLIDE_HEIGHT_EMU.to_string().as_str()),
        ],
    )?;
    x.empty(
        "p:notesSz",
        &[
            ("cx", NOTES_WIDTH_EMU.to_string().as_str()),
            ("cy", NOTES_HEIGHT_EMU.to_string().as_str()),
        ],
    )?;
    x.end("p:presentation")?;
    Ok(x.finish())
}

/// Layout is rId1, pictures follow from rId2.
fn slide_rels_xml(media: &[String]) -> Result<Vec<u8>> {
    let mut rels = vec![(
        "rId1".to_string(),
        "slideLayout".to_string(),
        "../slideLayouts/slideLayout1.xml".to_string(),
    )];
    for (idx, name) in media.iter().enumerate() {
        rels.push((
            format!("rId{}", idx + 2),
            "image".to_string(),
            format!("../{}", name),
        ));
    }
    relationships(&rels)
}

fn write_xfrm(x: &mut Xml, frame: &Frame) -> Result<()> {
    let [off_x, off_y, cx, cy] = frame.emu();
    x.start("a:xfrm", &[])?;
    x.empty("a:off", &[("x", off_x.as_str()), ("y", off_y.as_str())])?;
    x.empty("a:ext", &[("cx", cx.as_str()), ("cy", cy.as_str())])?;
    x.end("a:xfrm")?;
    x.start("a:prstGeom", &[("prst", "rect")])?;
    x.empty("a:avLst", &[])?;
    x.end("a:prstGeom")
}

struct TextBox<'a> {
    id: usize,
    name: &'a str,
    frame: Frame,
    size_pt: u32,
    bold: bool,
    bulleted: bool,
}

fn write_text_box(x: &mut Xml, b: &TextBox, font: &str, paragraphs: &[String]) -> Result<()> {
    let id = b.id.to_string();
    let size = (b.size_pt * 100).to_string();
    let indent = BULLET_INDENT_EMU.to_string();
    let hanging = (-BULLET_INDENT_EMU).to_string();

    x.start("p:sp", &[])?;
    x.start("p:nvSpPr", &[])?;
    x.empty("p:cNvPr", &[("id", id.as_str()), ("name", b.name)])?;
    x.empty("p:cNvSpPr", &[("txBox", "1")])?;
    x.empty("p:nvPr", &[])?;
    x.end("p:nvSpPr")?;

    x.start("p:spPr", &[])?;
    write_xfrm(x, &b.frame)?;
    x.empty("a:noFill", &[])?;
    x.end("p:spPr")?;

    x.start("p:txBody", &[])?;
    x.start("a:bodyPr", &[("wrap", "square"), ("rtlCol", "0")])?;
    x.empty("a:normAutofit", &[])?;
    x.end("a:bodyPr")?;
    x.empty("a:lstStyle", &[])?;

    for text in paragraphs {
        x.start("a:p", &[])?;
        if b.bulleted {
            x.start("a:pPr", &[("marL", indent.as_str()), ("indent", hanging.as_str())])?;
            x.empty("a:buFont", &[("typeface", "Arial")])?;
            x.empty("a:buChar", &[("char", "\u{2022}")])?;
            x.end("a:pPr")?;
        }
        x.start("a:r", &[])?;
        let mut rpr = vec![("lang", "en-US"), ("sz", size.as_str()), ("dirty", "0")];
        if b.bold {
            rpr.push(("b", "1"));
        }
        x.start("a:rPr", &rpr)?;
        x.empty("a:latin", &[("typeface", font)])?;
        x.empty("a:cs", &[("typeface", font)])?;
        x.end("a:rPr")?;
        x.start("a:t", &[])?;
        x.text(text)?;
        x.end("a:t")?;
        x.end("a:r")?;
        x.end("a:p")?;
    }

    x.end("p:txBody")?;
    x.end("p:sp")
}

fn write_picture(x: &mut Xml, id: usize, rid: &str, descr: &str, frame: &Frame) -> Result<()> {
    let id_str = id.to_string();
    let name = format!("Picture {}", id);

    x.start("p:pic", &[])?;
    x.start("p:nvPicPr", &[])?;
    x.empty("p:cNvPr", &[("id", id_str.as_str()), ("name", name.as_str()), ("descr", descr)])?;
    x.start("p:cNvPicPr", &[])?;
    x.empty("a:picLocks", &[("noChangeAspect", "1")])?;
    x.end("p:cNvPicPr")?;
    x.empty("p:nvPr", &[])?;
    x.end("p:nvPicPr")?;

    x.start("p:blipFill", &[])?;
    x.empty("a:blip", &[("r:embed", rid)])?;
    x.start("a:stretch", &[])?;
    x.empty("a:fillRect", &[])?;
    x.end("a:stretch")?;
    x.end("p:blipFill")?;

    x.start("p:spPr", &[])?;
    write_xfrm(x, frame)?;
    x.end("p:spPr")?;
    x.end("p:pic")
}

/// Start a slide part up to the shapes of its shape tree.
fn open_slide() -> Result<Xml> {
    let mut x = Xml::new()?;
    x.start("p:sld", &[("xmlns:a", NS_A), ("xmlns:r", NS_R), ("xmlns:p", NS_P)])?;
    x.start("p:cSld", &[])?;
    x.start("p:spTree", &[])?;

    x.start("p:nvGrpSpPr", &[])?;
    x.empty("p:cNvPr", &[("id", "1"), ("name", "")])?;
    x.empty("p:cNvGrpSpPr", &[])?;
    x.empty("p:nvPr", &[])?;
    x.end("p:nvGrpSpPr")?;
    x.start("p:grpSpPr", &[])?;
    x.start("a:xfrm", &[])?;
    for el in ["a:off", "a:chOff"] {
        x.empty(el, &[("x", "0"), ("y", "0")])?;
    }
    for el in ["a:ext", "a:chExt"] {
        x.empty(el, &[("cx", "0"), ("cy", "0")])?;
    }
    x.end("a:xfrm")?;
    x.end("p:grpSpPr")?;
    Ok(x)
}

fn close_slide(mut x: Xml) -> Result<Vec<u8>> {
    x.end("p:spTree")?;
    x.end("p:cSld")?;
    x.start("p:clrMapOvr", &[])?;
    x.empty("a:masterClrMapping", &[])?;
    x.end("p:clrMapOvr")?;
    x.end("p:sld")?;
    Ok(x.finish())
}

fn title_slide_xml(title: &str, font: &str) -> Result<Vec<u8>> {
    let mut x = open_slide()?;
    let title_box = TextBox {
        id: 2,
        name: "Title",
        frame: PRESENTATION_TITLE_FRAME,
        size_pt: PRESENTATION_TITLE_FONT_PT,
        bold: true,
        bulleted: false,
    };
    write_text_box(&mut x, &title_box, font, &[title.to_string()])?;
    close_slide(x)
}

fn slide_xml(plan: &SlidePlan, font: &str, media: &[String]) -> Result<Vec<u8>> {
    let geometry = layout_geometry(plan.layout);
    let mut next_id = 2;

    let mut x = open_slide()?;

    if let Some(title) = &plan.title {
        let title_box = TextBox {
            id: next_id,
            name: "Title",
            frame: TITLE_FRAME,
            size_pt: TITLE_FONT_PT,
            bold: true,
            bulleted: false,
        };
        write_text_box(&mut x, &title_box, font, std::slice::from_ref(title))?;
        next_id += 1;
    }

    if let Some((frame, size_pt)) = geometry.text {
        if !plan.bullets.is_empty() {
            let body = TextBox {
                id: next_id,
                name: "Content",
                frame,
                size_pt,
                bold: false,
                bulleted: true,
            };
            write_text_box(&mut x, &body, font, &plan.bullets)?;
            next_id += 1;
        }
    }

    for (idx, (frame, image)) in geometry.pictures.iter().zip(&plan.images).enumerate() {
        let rid = format!("rId{}", idx + 2);
        let descr = image
            .path()
            .file_name()
            .map(|n| xml_chars(&n.to_string_lossy()).into_owned())
            .unwrap_or_default();
        if idx < media.len() {
            write_picture(&mut x, next_id, &rid, &descr, frame)?;
            next_id += 1;
        }
    }

    close_slide(x)
}
