//! Core of PDF-to-slides conversion: font-threshold heading detection,
//! section segmentation, bullet formatting, and slide layout packing.

pub mod backend;
pub mod bullets;
pub mod error;
pub mod packer;
pub mod pipeline;
pub mod segment;
pub mod store;
pub mod summarize;
pub mod threshold;
pub mod types;

pub use backend::{DeckWriter, DocumentReader, Summarizer};
pub use bullets::BulletFormatter;
pub use error::{Error, Result};
pub use packer::{SlidePacker, MAX_BULLETS_PER_SLIDE};
pub use pipeline::{Pipeline, RunReport, NO_SUMMARY_BULLET};
pub use segment::{Segmenter, DEFAULT_SECTION_TITLE};
pub use store::{DirImageStore, ImageStore, PassThroughStore};
pub use summarize::SentenceSummarizer;
pub use threshold::{FontThreshold, ThresholdPolicy};
pub use types::{
    BoundingBox, ImageFormat, ImageRef, ImageSource, LayoutKind, Outline, Page, PageImage,
    PositionedToken, Section, SlidePlan, SummarizedSection,
};
