//! PPTX deck reader, used to inspect generated decks.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use slides_core::{Error, Result};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;
use zip::ZipArchive;

/// Text and picture summary of one slide.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeckSlide {
    /// 1-based slide number.
    pub number: usize,

    /// One entry per paragraph, top-to-bottom then left-to-right by shape.
    pub lines: Vec<String>,

    /// Number of pictures on the slide.
    pub pictures: usize,

    /// Typefaces named by text runs.
    pub fonts: BTreeSet<String>,
}

/// Slides of a deck, in presentation order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Deck {
    pub slides: Vec<DeckSlide>,
}

impl Deck {
    pub fn len(&self) -> usize {
        self.slides.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slides.is_empty()
    }
}

/// Reader for PPTX (Office Open XML) files.
pub struct DeckReader;

impl DeckReader {
    pub fn new() -> Self {
        Self
    }

    /// Read a deck from disk.
    pub fn read(&self, path: &Path) -> Result<Deck> {
        let file = File::open(path)?;
        self.parse(BufReader::new(file))
    }

    /// Parse a deck from any seekable reader.
    pub fn parse<R: Read + Seek>(&self, reader: R) -> Result<Deck> {
        let mut archive = ZipArchive::new(reader)
            .map_err(|e| Error::ZipError(format!("Failed to open ZIP: {}", e)))?;

        let slide_order = self.get_slide_order(&mut archive)?;

        let mut deck = Deck::default();
        for (idx, slide_path) in slide_order.iter().enumerate() {
            let content = read_file_from_archive(&mut archive, slide_path)?;
            let mut slide = parse_slide_xml(&content)?;
            slide.number = idx + 1;
            deck.slides.push(slide);
        }

        Ok(deck)
    }

    /// Ordered slide part paths from the presentation relationships.
    fn get_slide_order<R: Read + Seek>(&self, archive: &mut ZipArchive<R>) -> Result<Vec<String>> {
        let rels_content = read_file_from_archive(archive, "ppt/_rels/presentation.xml.rels")?;
        let mut slides: Vec<(String, Option<usize>)> = Vec::new();

        let mut reader = Reader::from_str(&rels_content);
        reader.trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Empty(ref e)) | Ok(Event::Start(ref e))
                    if local_name(e.name().as_ref()) == b"Relationship" =>
                {
                    let rel_type = attr(e, b"Type").unwrap_or_default();
                    let target = attr(e, b"Target").unwrap_or_default();

                    if rel_type.ends_with("/slide") {
                        let order = extract_slide_number(&target);
                        let full_path = match target.strip_prefix('/') {
                            Some(abs) => abs.to_string(),
                            None => format!("ppt/{}", target),
                        };
                        slides.push((full_path, order));
                    }
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlError(format!(
                        "Error parsing relationships: {}",
                        e
                    )));
                }
                _ => {}
            }
        }

        slides.sort_by(|a, b| match (a.1, b.1) {
            (Some(na), Some(nb)) => na.cmp(&nb),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => a.0.cmp(&b.0),
        });

        Ok(slides.into_iter().map(|(path, _)| path).collect())
    }
}

impl Default for DeckReader {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Default)]
struct ShapeText {
    paragraphs: Vec<String>,
    x: i64,
    y: i64,
}

/// Parse one slide part.
fn parse_slide_xml(xml_content: &str) -> Result<DeckSlide> {
    let mut slide = DeckSlide::default();
    let mut shapes: Vec<ShapeText> = Vec::new();

    let mut reader = Reader::from_str(xml_content);
    reader.trim_text(true);

    let mut current: Option<ShapeText> = None;
    let mut paragraph: Option<String> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => match local_name(e.name().as_ref()) {
                b"sp" => current = Some(ShapeText::default()),
                b"pic" => slide.pictures += 1,
                b"p" if current.is_some() => paragraph = Some(String::new()),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name(e.name().as_ref()) {
                b"off" => {
                    if let Some(shape) = current.as_mut() {
                        shape.x = attr(e, b"x").and_then(|v| v.parse().ok()).unwrap_or(0);
                        shape.y = attr(e, b"y").and_then(|v| v.parse().ok()).unwrap_or(0);
                    }
                }
                b"latin" => {
                    if let Some(face) = attr(e, b"typeface").filter(|f| !f.is_empty()) {
                        slide.fonts.insert(face);
                    }
                }
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let Some(p) = paragraph.as_mut() {
                    p.push_str(&e.unescape().unwrap_or_default());
                }
            }
            Ok(Event::End(ref e)) => match local_name(e.name().as_ref()) {
                b"p" => {
                    if let (Some(p), Some(shape)) = (paragraph.take(), current.as_mut()) {
                        let p = p.trim();
                        if !p.is_empty() {
                            shape.paragraphs.push(p.to_string());
                        }
                    }
                }
                b"sp" => {
                    if let Some(shape) = current.take() {
                        if !shape.paragraphs.is_empty() {
                            shapes.push(shape);
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::XmlError(format!("Error parsing slide: {}", e)));
            }
            _ => {}
        }
    }

    shapes.sort_by_key(|s| (s.y, s.x));
    slide.lines = shapes.into_iter().flat_map(|s| s.paragraphs).collect();
    Ok(slide)
}

fn read_file_from_archive<R: Read + Seek>(archive: &mut ZipArchive<R>, path: &str) -> Result<String> {
    let mut file = archive
        .by_name(path)
        .map_err(|e| Error::ZipError(format!("File not found in archive '{}': {}", path, e)))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| Error::ZipError(format!("Failed to read '{}': {}", path, e)))?;

    Ok(content)
}

fn attr(e: &BytesStart, key: &[u8]) -> Option<String> {
    e.attributes()
        .flatten()
        .find(|a| a.key.as_ref() == key)
        .and_then(|a| a.unescape_value().ok().map(|v| v.into_owned()))
}

/// Extract the local name from a potentially namespaced XML element name.
fn local_name(name: &[u8]) -> &[u8] {
    match name.iter().position(|&b| b == b':') {
        Some(pos) => &name[pos + 1..],
        None => name,
    }
}

/// Extract a slide number from a string like "slides/slide3.xml".
fn extract_slide_number(s: &str) -> Option<usize> {
    let s = s.trim_end_matches(".xml");
    let stem = s.trim_end_matches(|c: char| c.is_ascii_digit());
    s[stem.len()..].parse().ok()
}
