//! Error types for PDF-to-slides conversion.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while turning a document into a slide deck.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to open, read, or write a file.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The font threshold was requested for a batch with no tokens.
    #[error("Font threshold undefined: no tokens to measure")]
    ThresholdUndefined,

    /// The summarizer could not produce a summary.
    #[error("Summarizer unavailable: {0}")]
    SummarizerUnavailable(String),

    /// The summarizer answered, but no usable bullet lines were found.
    #[error("Summary contained no usable bullet lines")]
    MalformedSummaryFormat,

    /// The presentation template could not be found or read.
    #[error("Template missing: {0}")]
    TemplateMissing(String),

    /// An image reference does not point at a readable image.
    #[error("Invalid image reference: {0}")]
    InvalidImageReference(String),

    /// Failed to parse the PDF document structure.
    #[error("PDF parsing error: {0}")]
    PdfParseError(String),

    /// The input is not a format we can read.
    #[error("Unsupported or unrecognized file format: {0}")]
    UnsupportedFormat(String),

    /// ZIP archive error (for PPTX).
    #[error("ZIP error: {0}")]
    ZipError(String),

    /// XML error (for PPTX).
    #[error("XML error: {0}")]
    XmlError(String),
}

impl Error {
    /// Whether this error must abort the pipeline.
    ///
    /// Core anomalies degrade to placeholder content; only failures to
    /// acquire or produce a resource are fatal.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            Error::ThresholdUndefined
                | Error::SummarizerUnavailable(_)
                | Error::MalformedSummaryFormat
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_anomalies_are_not_fatal() {
        assert!(!Error::ThresholdUndefined.is_fatal());
        assert!(!Error::SummarizerUnavailable("down".into()).is_fatal());
        assert!(!Error::MalformedSummaryFormat.is_fatal());
    }

    #[test]
    fn test_resource_failures_are_fatal() {
        assert!(Error::TemplateMissing("a.pptx".into()).is_fatal());
        assert!(Error::InvalidImageReference("x.png".into()).is_fatal());
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(Error::from(io).is_fatal());
    }
}
