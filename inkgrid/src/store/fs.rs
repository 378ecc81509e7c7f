//! Filesystem-backed image store.

use super::{DecodedImage, ImageRef, StoreError};
use image::{ImageError, ImageReader};
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::trace;

/// Read-only access to stored images.
///
/// Implementations resolve a normalized [`ImageRef`] to a readable location
/// and decode it. They never mutate storage.
pub trait ImageStore: Send + Sync + 'static {
    /// Resolves a reference to an existing file.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when nothing exists at the resolved location,
    /// [`StoreError::Io`] for other faults.
    fn resolve(&self, reference: &ImageRef) -> Result<PathBuf, StoreError>;

    /// Reads only the image header and returns `(width, height)`.
    ///
    /// # Errors
    ///
    /// Same as [`ImageStore::open`].
    fn dimensions(&self, reference: &ImageRef) -> Result<(u32, u32), StoreError>;

    /// Resolves and fully decodes an image into RGBA pixels.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`], [`StoreError::Decode`] or [`StoreError::Io`].
    fn open(&self, reference: &ImageRef) -> Result<DecodedImage, StoreError>;
}

/// Image store rooted at a single uploads directory.
///
/// References are joined onto the root; there is no fallback search.
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    /// Creates a store resolving references under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The storage root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn reader(&self, reference: &ImageRef) -> Result<ImageReader<BufReader<File>>, StoreError> {
        let path = self.resolve(reference)?;
        ImageReader::open(&path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|source| io_error(reference, path, source))
    }
}

impl ImageStore for FsImageStore {
    fn resolve(&self, reference: &ImageRef) -> Result<PathBuf, StoreError> {
        let path = reference.to_path(&self.root);
        match std::fs::metadata(&path) {
            Ok(meta) if meta.is_file() => {
                trace!(reference = %reference, path = %path.display(), "Resolved image");
                Ok(path)
            }
            Ok(_) => Err(StoreError::NotFound {
                reference: reference.to_string(),
                path,
            }),
            Err(source) => Err(io_error(reference, path, source)),
        }
    }

    fn dimensions(&self, reference: &ImageRef) -> Result<(u32, u32), StoreError> {
        self.reader(reference)?
            .into_dimensions()
            .map_err(|e| image_error(reference, &self.root, e))
    }

    fn open(&self, reference: &ImageRef) -> Result<DecodedImage, StoreError> {
        let pixels = self
            .reader(reference)?
            .decode()
            .map_err(|e| image_error(reference, &self.root, e))?
            .to_rgba8();
        Ok(DecodedImage::new(reference.clone(), pixels))
    }
}

fn io_error(reference: &ImageRef, path: PathBuf, source: io::Error) -> StoreError {
    if source.kind() == io::ErrorKind::NotFound {
        StoreError::NotFound {
            reference: reference.to_string(),
            path,
        }
    } else {
        StoreError::Io { path, source }
    }
}

fn image_error(reference: &ImageRef, root: &Path, error: ImageError) -> StoreError {
    match error {
        ImageError::IoError(source) => io_error(reference, reference.to_path(root), source),
        source => StoreError::Decode {
            reference: reference.to_string(),
            source,
        },
    }
}
