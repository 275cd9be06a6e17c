//! Font-size cutoff separating heading text from body text.

use crate::{Error, PositionedToken, Result};
use std::fmt;
use std::str::FromStr;

/// Multiplier applied to the mean font size.
pub const HEADING_FACTOR: f64 = 1.5;

/// Tokens at or above this size are headings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FontThreshold(f64);

impl FontThreshold {
    /// Mean of `sizes` times [`HEADING_FACTOR`].
    ///
    /// Fails with [`Error::ThresholdUndefined`] when `sizes` is empty.
    pub fn estimate<I>(sizes: I) -> Result<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let (sum, count) = sizes
            .into_iter()
            .fold((0.0, 0usize), |(sum, count), size| (sum + size, count + 1));

        if count == 0 {
            return Err(Error::ThresholdUndefined);
        }

        Ok(Self(sum / count as f64 * HEADING_FACTOR))
    }

    /// Estimate from a batch of tokens.
    pub fn from_tokens(tokens: &[PositionedToken]) -> Result<Self> {
        Self::estimate(tokens.iter().map(|t| t.font_size))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn is_heading(&self, font_size: f64) -> bool {
        font_size >= self.0
    }
}

/// When the segmenter (re)computes its threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThresholdPolicy {
    /// Compute once from the first page that has text, then hold it.
    #[default]
    FirstPage,
    /// Recompute from every page that has text.
    PerPage,
}

impl FromStr for ThresholdPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first-page" | "first" => Ok(Self::FirstPage),
            "per-page" | "page" => Ok(Self::PerPage),
            other => Err(format!(
                "unknown threshold policy '{}' (expected first-page or per-page)",
                other
            )),
        }
    }
}

impl fmt::Display for ThresholdPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FirstPage => write!(f, "first-page"),
            Self::PerPage => write!(f, "per-page"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_is_one_and_a_half_times_mean() {
        let threshold = FontThreshold::estimate([10.0, 10.0, 12.0, 30.0]).unwrap();
        assert_eq!(threshold.value(), 23.25);
        assert!(threshold.is_heading(30.0));
        assert!(!threshold.is_heading(12.0));
    }

    #[test]
    fn test_threshold_boundary_counts_as_heading() {
        let threshold = FontThreshold::estimate([10.0]).unwrap();
        assert!(threshold.is_heading(15.0));
        assert!(!threshold.is_heading(14.99));
    }

    #[test]
    fn test_empty_batch_is_undefined() {
        let result = FontThreshold::estimate(std::iter::empty());
        assert!(matches!(result, Err(Error::ThresholdUndefined)));
        assert!(matches!(
            FontThreshold::from_tokens(&[]),
            Err(Error::ThresholdUndefined)
        ));
    }

    #[test]
    fn test_from_tokens_uses_font_sizes() {
        let tokens = vec![
            PositionedToken::new("a", 8.0, 0),
            PositionedToken::new("b", 12.0, 0),
        ];
        assert_eq!(FontThreshold::from_tokens(&tokens).unwrap().value(), 15.0);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!(
            "first-page".parse::<ThresholdPolicy>(),
            Ok(ThresholdPolicy::FirstPage)
        );
        assert_eq!(
            "Per-Page".parse::<ThresholdPolicy>(),
            Ok(ThresholdPolicy::PerPage)
        );
        assert!("sometimes".parse::<ThresholdPolicy>().is_err());
        assert_eq!(ThresholdPolicy::PerPage.to_string(), "per-page");
    }
}
