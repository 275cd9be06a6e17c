//! Bullet extraction from free-text summaries.
//!
//! Summaries loosely follow a `Topic: ...` / `Summary: ...` convention. The
//! markers are removed as plain substrings; no further structure is assumed.

use crate::{Error, Result};

/// Marker substrings stripped from every summary line.
pub const DEFAULT_MARKERS: &[&str] = &["Topic:", "Summary:"];

/// Splits a raw summary into display-ordered bullet strings.
#[derive(Debug, Clone)]
pub struct BulletFormatter {
    markers: Vec<String>,
}

impl Default for BulletFormatter {
    fn default() -> Self {
        Self {
            markers: DEFAULT_MARKERS.iter().map(|m| m.to_string()).collect(),
        }
    }
}

impl BulletFormatter {
    /// Create a formatter stripping `Topic:` and `Summary:`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the marker substrings. Matching is exact and case-sensitive.
    pub fn with_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Clean a single line: strip markers, trim.
    pub fn clean_line(&self, line: &str) -> String {
        let mut cleaned = line.to_string();
        for marker in &self.markers {
            if !marker.is_empty() {
                cleaned = cleaned.replace(marker.as_str(), "");
            }
        }
        cleaned.trim().to_string()
    }

    /// Extract bullets. A missing summary yields no bullets.
    ///
    /// Duplicates are kept; blank lines are dropped.
    pub fn format(&self, raw: Option<&str>) -> Vec<String> {
        let Some(raw) = raw else {
            return Vec::new();
        };

        raw.replace("\r\n", "\n")
            .replace('\r', "\n")
            .lines()
            .map(|line| self.clean_line(line))
            .filter(|line| !line.is_empty())
            .collect()
    }

    /// Like [`BulletFormatter::format`], but reports a summary with no usable
    /// lines as [`Error::MalformedSummaryFormat`].
    pub fn try_format(&self, raw: &str) -> Result<Vec<String>> {
        let bullets = self.format(Some(raw));
        if bullets.is_empty() {
            return Err(Error::MalformedSummaryFormat);
        }
        Ok(bullets)
    }
}
