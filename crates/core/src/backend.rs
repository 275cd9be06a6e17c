//! Interfaces to the collaborators around the core: something that reads a
//! document, something that summarizes text, and something that writes a deck.
//!
//! These traits exist so the pipeline can be driven by real backends
//! (`slides-pdf`, `slides-ollama`, `slides-pptx`) or by in-memory fakes.

use crate::{Page, Result, SlidePlan};
use std::path::Path;

/// Produces the positioned token and image stream of a document.
pub trait DocumentReader {
    /// Read every page in document order.
    fn read_pages(&self, path: &Path) -> Result<Vec<Page>>;
}

/// Maps section body text to a shorter text, ideally in the
/// `Topic:` / `Summary:` bullet convention.
pub trait Summarizer {
    /// Summarize `text`. Failures should be reported as
    /// [`crate::Error::SummarizerUnavailable`].
    fn summarize(&self, text: &str) -> Result<String>;
}

/// Persists slide plans as a presentation file.
pub trait DeckWriter {
    /// Write `plans` in order to `output`, using `font` for all text.
    fn write_deck(&self, plans: &[SlidePlan], font: &str, output: &Path) -> Result<()>;
}
