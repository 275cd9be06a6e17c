//! Slide layout packing.
//!
//! Decides how many slides each section needs and which layout each uses.
//! Bullets are chunked to a fixed capacity; the layout follows from the
//! section's image count.

use crate::{ImageRef, LayoutKind, SlidePlan, SummarizedSection};

/// Maximum number of bullets on one slide.
pub const MAX_BULLETS_PER_SLIDE: usize = 6;

/// Split bullets into consecutive chunks of at most `max` entries.
///
/// An empty list yields one empty chunk so the section still gets a slide.
pub fn chunk_bullets(bullets: &[String], max: usize) -> Vec<Vec<String>> {
    if bullets.is_empty() {
        return vec![Vec::new()];
    }

    bullets
        .chunks(max.max(1))
        .map(|chunk| chunk.to_vec())
        .collect()
}

/// Packs summarized sections into slide plans.
#[derive(Debug, Clone)]
pub struct SlidePacker {
    /// Bullets per slide.
    max_bullets: usize,
    font: String,
}

impl SlidePacker {
    /// Create a packer that stamps `font` on every plan.
    pub fn new(font: impl Into<String>) -> Self {
        Self {
            max_bullets: MAX_BULLETS_PER_SLIDE,
            font: font.into(),
        }
    }

    /// Use a custom bullet capacity.
    pub fn with_max_bullets(mut self, max: usize) -> Self {
        self.max_bullets = max.max(1); // At least 1 bullet per slide
        self
    }

    pub fn font(&self) -> &str {
        &self.font
    }

    /// Plans for one section.
    ///
    /// Sections with three or more images become one image-only slide per
    /// image and their bullets are not shown.
    pub fn pack_section(
        &self,
        title: &str,
        bullets: &[String],
        images: &[ImageRef],
    ) -> Vec<SlidePlan> {
        let layout = LayoutKind::from_image_count(images.len());

        if layout == LayoutKind::ImageOnly {
            if !bullets.is_empty() {
                log::debug!(
                    "Section '{}' has {} images; its {} bullets are not shown",
                    title,
                    images.len(),
                    bullets.len()
                );
            }
            return images
                .iter()
                .map(|image| SlidePlan {
                    layout,
                    title: None,
                    bullets: Vec::new(),
                    images: vec![image.clone()],
                    font: self.font.clone(),
                })
                .collect();
        }

        chunk_bullets(bullets, self.max_bullets)
            .into_iter()
            .enumerate()
            .map(|(idx, chunk)| SlidePlan {
                layout,
                title: (idx == 0).then(|| title.to_string()),
                bullets: chunk,
                images: images.to_vec(),
                font: self.font.clone(),
            })
            .collect()
    }

    /// Plans for a whole document, in outline order.
    pub fn pack(&self, sections: &[SummarizedSection]) -> Vec<SlidePlan> {
        sections
            .iter()
            .flat_map(|s| self.pack_section(&s.title, &s.bullets, &s.images))
            .collect()
    }
}
