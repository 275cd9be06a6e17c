//! PPTX (Office Open XML) backend.
//!
//! Writes slide plans as a .pptx package and reads decks back for
//! inspection. A .pptx file is a ZIP archive of XML parts.

pub mod parts;
pub mod reader;
pub mod writer;

pub use reader::{Deck, DeckReader, DeckSlide};
pub use writer::PptxDeckWriter;
