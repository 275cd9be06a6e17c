//! End-to-end orchestration: read → segment → summarize → format → pack → write.

use crate::backend::{DeckWriter, DocumentReader, Summarizer};
use crate::bullets::BulletFormatter;
use crate::packer::SlidePacker;
use crate::segment::segment_pages;
use crate::store::ImageStore;
use crate::threshold::ThresholdPolicy;
use crate::{Outline, Page, Result, Section, SlidePlan, SummarizedSection};
use std::path::Path;

/// Bullet used when a section has no summary.
pub const NO_SUMMARY_BULLET: &str = "No bullet points available";

/// Outcome of a pipeline run.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// Number of sections in the outline.
    pub sections: usize,

    /// Sections whose summarizer call failed and fell back to the
    /// placeholder bullet.
    pub summary_failures: usize,

    /// The plans handed to the deck writer, in order.
    pub plans: Vec<SlidePlan>,
}

/// Sequences the core stages between the external collaborators.
#[derive(Debug, Clone)]
pub struct Pipeline {
    policy: ThresholdPolicy,
    formatter: BulletFormatter,
    packer: SlidePacker,
}

impl Pipeline {
    /// Create a pipeline rendering all text in `font`.
    pub fn new(font: impl Into<String>) -> Self {
        Self {
            policy: ThresholdPolicy::default(),
            formatter: BulletFormatter::new(),
            packer: SlidePacker::new(font),
        }
    }

    pub fn with_policy(mut self, policy: ThresholdPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_formatter(mut self, formatter: BulletFormatter) -> Self {
        self.formatter = formatter;
        self
    }

    pub fn with_packer(mut self, packer: SlidePacker) -> Self {
        self.packer = packer;
        self
    }

    pub fn font(&self) -> &str {
        self.packer.font()
    }

    /// Bullets for one section. A missing or unusable summary degrades to
    /// placeholder content; only fatal summarizer errors are returned.
    ///
    /// Returns the bullets and whether the summarizer failed.
    pub fn section_bullets(
        &self,
        section: &Section,
        summarizer: &dyn Summarizer,
    ) -> Result<(Vec<String>, bool)> {
        if section.body.trim().is_empty() {
            log::debug!("Section '{}' has no body text", section.title);
            return Ok((vec![NO_SUMMARY_BULLET.to_string()], false));
        }

        let summary = match summarizer.summarize(&section.body) {
            Ok(summary) => summary,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                log::warn!("No summary for section '{}': {}", section.title, e);
                return Ok((vec![NO_SUMMARY_BULLET.to_string()], true));
            }
        };

        match self.formatter.try_format(&summary) {
            Ok(bullets) => {
                log::debug!(
                    "Section '{}': {} bullets",
                    section.title,
                    bullets.len()
                );
                Ok((bullets, false))
            }
            Err(e) => {
                log::warn!("Section '{}': {}", section.title, e);
                Ok((Vec::new(), false))
            }
        }
    }

    /// Summarize every section, keeping outline order.
    ///
    /// Returns the summarized sections and the number of summarizer failures.
    pub fn summarize_outline(
        &self,
        outline: &Outline,
        summarizer: &dyn Summarizer,
    ) -> Result<(Vec<SummarizedSection>, usize)> {
        let mut failures = 0;
        let mut sections = Vec::with_capacity(outline.len());
        for section in outline.iter() {
            let (bullets, failed) = self.section_bullets(section, summarizer)?;
            if failed {
                failures += 1;
            }
            sections.push(SummarizedSection::new(
                &section.title,
                bullets,
                section.images.clone(),
            ));
        }
        Ok((sections, failures))
    }

    /// Segment pages and produce slide plans without writing anything.
    pub fn plan(
        &self,
        pages: &[Page],
        summarizer: &dyn Summarizer,
        store: &mut dyn ImageStore,
    ) -> Result<RunReport> {
        let outline = segment_pages(pages, self.policy, store)?;
        log::debug!("Outline: {:?}", outline.titles());

        let (sections, summary_failures) = self.summarize_outline(&outline, summarizer)?;
        let plans = self.packer.pack(&sections);

        Ok(RunReport {
            sections: outline.len(),
            summary_failures,
            plans,
        })
    }

    /// Run the whole pipeline from `input` to `output`.
    ///
    /// Reader, store and writer failures abort the run, as does any
    /// summarizer error for which [`Error::is_fatal`](crate::Error::is_fatal) holds.
    pub fn run(
        &self,
        input: &Path,
        reader: &dyn DocumentReader,
        summarizer: &dyn Summarizer,
        store: &mut dyn ImageStore,
        writer: &dyn DeckWriter,
        output: &Path,
    ) -> Result<RunReport> {
        let pages = reader.read_pages(input)?;
        log::debug!("Read {} pages from {}", pages.len(), input.display());

        let report = self.plan(&pages, summarizer, store)?;
        if report.plans.is_empty() {
            log::warn!("No content found in {}", input.display());
        }

        writer.write_deck(&report.plans, self.font(), output)?;
        log::debug!("Wrote {} slides to {}", report.plans.len(), output.display());

        Ok(report)
    }
}
