//! Section segmentation.
//!
//! Rebuilds a flat outline from the token/image stream of a document. Tokens
//! whose font size meets the threshold are buffered as heading words; the
//! first body token after a run of heading words turns the buffer into the
//! current section title. Images attach to whichever section is current when
//! they are encountered.

use crate::store::ImageStore;
use crate::threshold::{FontThreshold, ThresholdPolicy};
use crate::{ImageRef, Outline, Page, PositionedToken, Result, Section};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Title of the section that collects content seen before the first heading.
pub const DEFAULT_SECTION_TITLE: &str = "Introduction";

/// Regex to collapse any whitespace run into one space.
static WHITESPACE_COLLAPSE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// Collapse whitespace runs to a single space and trim.
pub fn clean_heading(text: &str) -> String {
    WHITESPACE_COLLAPSE_REGEX
        .replace_all(text, " ")
        .trim()
        .to_string()
}

/// Sequential fold over a document's tokens and images.
///
/// Feed pages in document order: [`Segmenter::begin_page`] with the page's
/// tokens, then every token through [`Segmenter::push_token`], then every
/// image reference through [`Segmenter::push_image`]. Call
/// [`Segmenter::finish`] once the stream is exhausted.
#[derive(Debug, Clone)]
pub struct Segmenter {
    policy: ThresholdPolicy,
    threshold: Option<FontThreshold>,
    current_title: String,
    title_buffer: Vec<String>,
    sections: Vec<Section>,
    /// Title -> position in `sections`.
    index: HashMap<String, usize>,
}

impl Default for Segmenter {
    fn default() -> Self {
        Self {
            policy: ThresholdPolicy::default(),
            threshold: None,
            current_title: DEFAULT_SECTION_TITLE.to_string(),
            title_buffer: Vec::new(),
            sections: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl Segmenter {
    /// Create a segmenter with the first-page threshold policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set when the font threshold is recomputed.
    pub fn with_policy(mut self, policy: ThresholdPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The threshold currently in force, if any page has had text.
    pub fn threshold(&self) -> Option<FontThreshold> {
        self.threshold
    }

    /// Title that new body text and images currently go to.
    pub fn current_title(&self) -> &str {
        &self.current_title
    }

    /// Heading words seen but not yet turned into a title.
    pub fn pending_title_words(&self) -> &[String] {
        &self.title_buffer
    }

    /// Announce a new page and its tokens.
    ///
    /// Computes the threshold from this page's tokens if the policy calls
    /// for it. The title buffer is not flushed here, so a heading that runs
    /// past the end of a page continues on the next one.
    pub fn begin_page(&mut self, tokens: &[PositionedToken]) {
        let recompute = match self.policy {
            ThresholdPolicy::FirstPage => self.threshold.is_none(),
            ThresholdPolicy::PerPage => true,
        };
        if !recompute {
            return;
        }

        match FontThreshold::from_tokens(tokens) {
            Ok(threshold) => {
                log::debug!(
                    "Font threshold set to {:.2} from {} tokens",
                    threshold.value(),
                    tokens.len()
                );
                self.threshold = Some(threshold);
            }
            Err(e) => {
                log::debug!("Keeping previous threshold: {}", e);
            }
        }
    }

    /// Consume one token.
    pub fn push_token(&mut self, token: &PositionedToken) {
        let is_heading = self
            .threshold
            .is_some_and(|t| t.is_heading(token.font_size));

        if is_heading {
            let cleaned = clean_heading(&token.text);
            if !cleaned.is_empty() {
                self.title_buffer.push(cleaned);
            }
            return;
        }

        self.flush_title();
        self.current_section_mut().append_text(&token.text);
    }

    /// Attach an image to the current section.
    pub fn push_image(&mut self, image: ImageRef) {
        self.current_section_mut().add_image(image);
    }

    /// Finalize the outline. Body text is trimmed.
    ///
    /// Heading words still in the buffer are dropped: a title only becomes a
    /// section once body text follows it.
    pub fn finish(self) -> Outline {
        if !self.title_buffer.is_empty() {
            log::warn!(
                "Dropping trailing heading with no body text: '{}'",
                self.title_buffer.join(" ")
            );
        }

        let sections = self
            .sections
            .into_iter()
            .map(|mut section| {
                let trimmed = section.body.trim_end().len();
                section.body.truncate(trimmed);
                section
            })
            .collect();

        Outline::new(sections)
    }

    /// Turn buffered heading words into the current title.
    fn flush_title(&mut self) {
        if self.title_buffer.is_empty() {
            return;
        }

        let title = self.title_buffer.join(" ").trim().to_string();
        self.title_buffer.clear();
        log::debug!("New section: '{}'", title);
        self.current_title = title;
        self.section_index(&self.current_title.clone());
    }

    fn current_section_mut(&mut self) -> &mut Section {
        let idx = self.section_index(&self.current_title.clone());
        &mut self.sections[idx]
    }

    /// Index of the section named `title`, creating it if new.
    ///
    /// Re-encountering a title returns the existing section, so its body
    /// and images keep accumulating.
    fn section_index(&mut self, title: &str) -> usize {
        if let Some(&idx) = self.index.get(title) {
            return idx;
        }
        let idx = self.sections.len();
        self.sections.push(Section::new(title));
        self.index.insert(title.to_string(), idx);
        idx
    }
}

/// Segment a whole document.
///
/// Each page contributes its tokens first and its images second. Images are
/// persisted through `store` and attached by encounter order.
pub fn segment_pages(
    pages: &[Page],
    policy: ThresholdPolicy,
    store: &mut dyn ImageStore,
) -> Result<Outline> {
    let mut segmenter = Segmenter::new().with_policy(policy);

    for page in pages {
        log::debug!(
            "Segmenting page {} ({} tokens, {} images)",
            page.index + 1,
            page.tokens.len(),
            page.images.len()
        );

        segmenter.begin_page(&page.tokens);
        for token in &page.tokens {
            segmenter.push_token(token);
        }

        for (ordinal, image) in page.images.iter().enumerate() {
            let image_ref = store.store(image, ordinal)?;
            segmenter.push_image(image_ref);
        }
    }

    Ok(segmenter.finish())
}
