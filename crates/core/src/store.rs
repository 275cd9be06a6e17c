//! Persistence of page images into stable references.

use crate::{Error, ImageRef, ImageSource, PageImage, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Turns a page image into an [`ImageRef`] a deck writer can load later.
pub trait ImageStore {
    /// Persist `image`, the `ordinal`-th image (0-based) on its page.
    fn store(&mut self, image: &PageImage, ordinal: usize) -> Result<ImageRef>;
}

/// Writes image bytes into a directory as `page_{n}_image_{m}.{ext}`.
#[derive(Debug, Clone)]
pub struct DirImageStore {
    dir: PathBuf,
}

impl DirImageStore {
    /// Store images under `dir`. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl ImageStore for DirImageStore {
    fn store(&mut self, image: &PageImage, ordinal: usize) -> Result<ImageRef> {
        match &image.source {
            ImageSource::Bytes { format, data } => {
                fs::create_dir_all(&self.dir)?;
                let filename = format!(
                    "page_{}_image_{}.{}",
                    image.page + 1,
                    ordinal + 1,
                    format.extension()
                );
                let path = self.dir.join(filename);
                fs::write(&path, data)?;
                log::debug!("Saved image {}", path.display());
                Ok(ImageRef::new(path))
            }
            ImageSource::Path(path) => PassThroughStore.store_path(path),
        }
    }
}

/// Accepts only images the reader already persisted.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassThroughStore;

impl PassThroughStore {
    fn store_path(&self, path: &Path) -> Result<ImageRef> {
        if path.as_os_str().is_empty() {
            return Err(Error::InvalidImageReference("empty image path".to_string()));
        }
        Ok(ImageRef::new(path))
    }
}

impl ImageStore for PassThroughStore {
    fn store(&mut self, image: &PageImage, _ordinal: usize) -> Result<ImageRef> {
        match &image.source {
            ImageSource::Path(path) => self.store_path(path),
            ImageSource::Bytes { .. } => Err(Error::InvalidImageReference(format!(
                "image on page {} was never persisted",
                image.page + 1
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoundingBox, ImageFormat};

    fn bytes_image(page: usize) -> PageImage {
        PageImage {
            page,
            bbox: BoundingBox::new(10.0, 10.0, 110.0, 60.0),
            source: ImageSource::Bytes {
                format: ImageFormat::Png,
                data: vec![0x89, 0x50, 0x4E, 0x47, 1, 2, 3],
            },
        }
    }

    #[test]
    fn test_dir_store_names_files_by_page_and_ordinal() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirImageStore::new(tmp.path().join("extracted_images"));

        let image_ref = store.store(&bytes_image(2), 1).unwrap();

        assert_eq!(
            image_ref.path(),
            tmp.path().join("extracted_images").join("page_3_image_2.png")
        );
        let written = fs::read(image_ref.path()).unwrap();
        assert_eq!(written, vec![0x89, 0x50, 0x4E, 0x47, 1, 2, 3]);
    }

    #[test]
    fn test_dir_store_passes_paths_through() {
        let tmp = tempfile::tempdir().unwrap();
        let mut store = DirImageStore::new(tmp.path());
        let image = PageImage {
            page: 0,
            bbox: BoundingBox::new(0.0, 0.0, 1.0, 1.0),
            source: ImageSource::Path("already/there.jpeg".into()),
        };

        let image_ref = store.store(&image, 0).unwrap();
        assert_eq!(image_ref, ImageRef::new("already/there.jpeg"));
    }

    #[test]
    fn test_pass_through_rejects_unpersisted_bytes() {
        let result = PassThroughStore.store(&bytes_image(0), 0);
        assert!(matches!(result, Err(Error::InvalidImageReference(_))));
    }
}
