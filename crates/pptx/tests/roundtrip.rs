//! Writes decks to disk and inspects them with the reader.

use slides_core::{DeckWriter, ImageRef, LayoutKind, SlidePlan};
use slides_pptx::{DeckReader, PptxDeckWriter};
use std::fs;
use std::path::Path;

const PNG_STUB: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

fn plan(layout: LayoutKind, title: Option<&str>, bullets: &[&str], images: &[ImageRef]) -> SlidePlan {
    SlidePlan {
        layout,
        title: title.map(str::to_string),
        bullets: bullets.iter().map(|b| b.to_string()).collect(),
        images: images.to_vec(),
        font: "Georgia".into(),
    }
}

fn image(dir: &Path, name: &str) -> ImageRef {
    let path = dir.join(name);
    fs::write(&path, PNG_STUB).unwrap();
    ImageRef::new(path)
}

#[test]
fn test_written_deck_reads_back() {
    let dir = tempfile::tempdir().unwrap();
    let a = image(dir.path(), "page_1_image_1.png");
    let b = image(dir.path(), "page_1_image_2.png");

    let plans = vec![
        plan(LayoutKind::NoImage, Some("Introduction"), &["One", "Two"], &[]),
        plan(LayoutKind::NoImage, None, &["Three"], &[]),
        plan(LayoutKind::OneImage, Some("Figure"), &["Caption"], &[a.clone()]),
        plan(LayoutKind::TwoImages, Some("Pair"), &["Left"], &[a.clone(), b.clone()]),
        plan(LayoutKind::ImageOnly, None, &[], &[b]),
    ];

    let output = dir.path().join("out").join("deck.pptx");
    PptxDeckWriter::new()
        .write_deck(&plans, "Georgia", &output)
        .unwrap();

    let deck = DeckReader::new().read(&output).unwrap();
    assert_eq!(deck.len(), 5);

    assert_eq!(deck.slides[0].lines, vec!["Introduction", "One", "Two"]);
    assert_eq!(deck.slides[1].lines, vec!["Three"]);
    assert_eq!(deck.slides[2].lines, vec!["Figure", "Caption"]);

    let pictures: Vec<_> = deck.slides.iter().map(|s| s.pictures).collect();
    assert_eq!(pictures, vec![0, 0, 1, 2, 1]);

    assert!(deck.slides[4].lines.is_empty());
    for slide in deck.slides.iter().filter(|s| !s.lines.is_empty()) {
        assert_eq!(slide.fonts.iter().collect::<Vec<_>>(), vec!["Georgia"]);
    }
}

#[test]
fn test_repeated_images_are_embedded_once() {
    let dir = tempfile::tempdir().unwrap();
    let a = image(dir.path(), "a.png");

    let plans = vec![
        plan(LayoutKind::OneImage, Some("S"), &["x"], &[a.clone()]),
        plan(LayoutKind::OneImage, None, &["y"], &[a]),
    ];
    let bytes = PptxDeckWriter::new().render(&plans, "Arial").unwrap();

    let archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();
    let media: Vec<_> = archive
        .file_names()
        .filter(|n| n.starts_with("ppt/media/"))
        .collect();
    assert_eq!(media, vec!["ppt/media/image1.png"]);
}

#[test]
fn test_empty_plan_list_gives_valid_empty_deck() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("empty.pptx");

    PptxDeckWriter::new().write_deck(&[], "Arial", &output).unwrap();
    assert!(DeckReader::new().read(&output).unwrap().is_empty());
}

#[test]
fn test_template_theme_is_reused() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.pptx");
    PptxDeckWriter::new().write_deck(&[], "Arial", &template).unwrap();

    let writer = PptxDeckWriter::new().with_template(&template).unwrap();
    let output = dir.path().join("themed.pptx");
    writer
        .write_deck(&[plan(LayoutKind::NoImage, Some("T"), &["b"], &[])], "Arial", &output)
        .unwrap();

    assert_eq!(DeckReader::new().read(&output).unwrap().len(), 1);
}

#[test]
fn test_template_without_theme_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("bare.zip");
    {
        let file = fs::File::create(&template).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        zip.start_file("readme.txt", zip::write::FileOptions::default())
            .unwrap();
        zip.finish().unwrap();
    }

    let err = PptxDeckWriter::new().with_template(&template).unwrap_err();
    assert!(matches!(err, slides_core::Error::TemplateMissing(_)));
}

#[test]
fn test_presentation_title_opens_the_deck() {
    let dir = tempfile::tempdir().unwrap();
    let template = dir.path().join("template.pptx");
    PptxDeckWriter::new().write_deck(&[], "Arial", &template).unwrap();

    let writer = PptxDeckWriter::new()
        .with_template(&template)
        .unwrap()
        .with_title("Neural Networks 101");
    let output = dir.path().join("Neural Networks 101.pptx");
    writer
        .write_deck(
            &[plan(LayoutKind::NoImage, Some("Neurons"), &["They fire"], &[])],
            "Verdana",
            &output,
        )
        .unwrap();

    let deck = DeckReader::new().read(&output).unwrap();
    assert_eq!(deck.len(), 2);
    assert_eq!(deck.slides[0].lines, vec!["Neural Networks 101"]);
    assert_eq!(deck.slides[0].pictures, 0);
    assert!(deck.slides[0].fonts.contains("Verdana"));
    assert_eq!(deck.slides[1].lines, vec!["Neurons", "They fire"]);
}

#[test]
fn test_control_characters_survive_as_readable_text() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("deck.pptx");

    PptxDeckWriter::new()
        .with_title("Report\u{7}")
        .write_deck(
            &[plan(LayoutKind::NoImage, Some("Neural\u{3}Networks"), &["point\u{0}one"], &[])],
            "Arial",
            &output,
        )
        .unwrap();

    let deck = DeckReader::new().read(&output).unwrap();
    assert_eq!(deck.slides[0].lines, vec!["Report"]);
    assert_eq!(deck.slides[1].lines, vec!["NeuralNetworks", "pointone"]);
}
