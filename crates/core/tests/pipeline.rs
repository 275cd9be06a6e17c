//! Pipeline runs against in-memory collaborators.

use slides_core::{
    DeckWriter, DocumentReader, Error, ImageSource, LayoutKind, Page, PageImage,
    PassThroughStore, Pipeline, Result, SlidePlan, Summarizer, ThresholdPolicy,
    BoundingBox, Outline, Section, NO_SUMMARY_BULLET,
};
use std::cell::RefCell;
use std::path::{Path, PathBuf};

struct FakeReader(Vec<Page>);

impl DocumentReader for FakeReader {
    fn read_pages(&self, _path: &Path) -> Result<Vec<Page>> {
        Ok(self.0.clone())
    }
}

struct MissingReader;

impl DocumentReader for MissingReader {
    fn read_pages(&self, path: &Path) -> Result<Vec<Page>> {
        Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        )))
    }
}

/// Answers in the Topic/Summary convention, echoing the first word.
struct EchoSummarizer;

impl Summarizer for EchoSummarizer {
    fn summarize(&self, text: &str) -> Result<String> {
        let first = text.split_whitespace().next().unwrap_or_default();
        Ok(format!("Topic: {}\nSummary: first point\nsecond point", first))
    }
}

struct DownSummarizer;

impl Summarizer for DownSummarizer {
    fn summarize(&self, _text: &str) -> Result<String> {
        Err(Error::SummarizerUnavailable("connection refused".into()))
    }
}

/// Fails with an I/O error.
struct BrokenSummarizer;

impl Summarizer for BrokenSummarizer {
    fn summarize(&self, _text: &str) -> Result<String> {
        Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "model file unreadable",
        )))
    }
}

struct BlankSummarizer;

impl Summarizer for BlankSummarizer {
    fn summarize(&self, _text: &str) -> Result<String> {
        Ok("\n\nSummary:\n".into())
    }
}

#[derive(Default)]
struct RecordingWriter {
    written: RefCell<Option<(Vec<SlidePlan>, String, PathBuf)>>,
}

impl DeckWriter for RecordingWriter {
    fn write_deck(&self, plans: &[SlidePlan], font: &str, output: &Path) -> Result<()> {
        *self.written.borrow_mut() = Some((plans.to_vec(), font.to_string(), output.into()));
        Ok(())
    }
}

fn document() -> Vec<Page> {
    let mut p0 = Page::new(0);
    for (word, size) in [
        ("Preface", 10.0),
        ("words", 10.0),
        ("Neural", 36.0),
        ("Networks", 36.0),
        ("Neurons", 10.0),
        ("connect", 10.0),
        ("in", 10.0),
        ("layers", 10.0),
    ] {
        p0.add_token(word, size);
    }
    p0.images.push(PageImage {
        page: 0,
        bbox: BoundingBox::new(72.0, 300.0, 300.0, 500.0),
        source: ImageSource::Path("images/page_1_image_1.png".into()),
    });

    let mut p1 = Page::new(1);
    for (word, size) in [("Training", 36.0), ("Gradients", 10.0), ("flow", 10.0)] {
        p1.add_token(word, size);
    }
    for i in 0..3 {
        p1.images.push(PageImage {
            page: 1,
            bbox: BoundingBox::new(72.0, 100.0 * i as f64, 200.0, 100.0 * i as f64 + 90.0),
            source: ImageSource::Path(format!("images/page_2_image_{}.png", i + 1).into()),
        });
    }

    vec![p0, p1]
}

#[test]
fn test_run_produces_plans_in_outline_order() {
    let writer = RecordingWriter::default();
    let report = Pipeline::new("Georgia")
        .run(
            Path::new("in.pdf"),
            &FakeReader(document()),
            &EchoSummarizer,
            &mut PassThroughStore,
            &writer,
            Path::new("out.pptx"),
        )
        .unwrap();

    assert_eq!(report.sections, 3);
    assert_eq!(report.summary_failures, 0);

    let (plans, font, output) = writer.written.borrow().clone().unwrap();
    assert_eq!(font, "Georgia");
    assert_eq!(output, PathBuf::from("out.pptx"));
    assert_eq!(plans, report.plans);

    let summary: Vec<_> = plans
        .iter()
        .map(|p| (p.layout, p.title.as_deref()))
        .collect();
    assert_eq!(
        summary,
        vec![
            (LayoutKind::NoImage, Some("Introduction")),
            (LayoutKind::OneImage, Some("Neural Networks")),
            (LayoutKind::ImageOnly, None),
            (LayoutKind::ImageOnly, None),
            (LayoutKind::ImageOnly, None),
        ]
    );
    assert_eq!(
        plans[1].bullets,
        vec!["Neurons", "first point", "second point"]
    );
}

#[test]
fn test_summarizer_failure_degrades_to_placeholder() {
    let report = Pipeline::new("Arial")
        .plan(&document(), &DownSummarizer, &mut PassThroughStore)
        .unwrap();

    assert_eq!(report.summary_failures, 3);
    assert_eq!(report.plans[0].bullets, vec![NO_SUMMARY_BULLET]);
    assert_eq!(report.plans[1].bullets, vec![NO_SUMMARY_BULLET]);
}

#[test]
fn test_blank_summary_gives_title_only_slide() {
    let report = Pipeline::new("Arial")
        .plan(&document(), &BlankSummarizer, &mut PassThroughStore)
        .unwrap();

    assert_eq!(report.summary_failures, 0);
    assert_eq!(report.plans[0].title.as_deref(), Some("Introduction"));
    assert!(report.plans[0].bullets.is_empty());
}

#[test]
fn test_reader_failure_aborts() {
    let writer = RecordingWriter::default();
    let result = Pipeline::new("Arial").run(
        Path::new("missing.pdf"),
        &MissingReader,
        &EchoSummarizer,
        &mut PassThroughStore,
        &writer,
        Path::new("out.pptx"),
    );

    let err = result.unwrap_err();
    assert!(err.is_fatal());
    assert!(writer.written.borrow().is_none());
}

#[test]
fn test_per_page_policy_is_threaded_through() {
    // With a per-page threshold the 36pt words on page 2 are still headings,
    // so the outline is unchanged for this document.
    let report = Pipeline::new("Arial")
        .with_policy(ThresholdPolicy::PerPage)
        .plan(&document(), &EchoSummarizer, &mut PassThroughStore)
        .unwrap();
    assert_eq!(report.sections, 3);
}

#[test]
fn test_fatal_summarizer_error_aborts() {
    let writer = RecordingWriter::default();
    let result = Pipeline::new("Arial").run(
        Path::new("in.pdf"),
        &FakeReader(document()),
        &BrokenSummarizer,
        &mut PassThroughStore,
        &writer,
        Path::new("out.pptx"),
    );

    assert!(matches!(result, Err(Error::IoError(_))));
    assert!(writer.written.borrow().is_none());
}

#[test]
fn test_empty_body_is_not_a_summary_failure() {
    let mut filled = Section::new("Filled");
    filled.append_text("Some body text");
    let outline = Outline::new(vec![Section::new("Empty"), filled]);

    let (sections, failures) = Pipeline::new("Arial")
        .summarize_outline(&outline, &DownSummarizer)
        .unwrap();

    assert_eq!(failures, 1);
    assert_eq!(sections[0].bullets, vec![NO_SUMMARY_BULLET]);
    assert_eq!(sections[1].bullets, vec![NO_SUMMARY_BULLET]);
}
