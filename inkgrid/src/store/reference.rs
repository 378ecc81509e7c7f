//! Root-relative image references.
//!
//! Stored image paths historically arrived in several shapes: with a leading
//! separator, without one, or already carrying the `uploads/` root prefix.
//! [`ImageRef::normalize`] folds all of them into a single form
//! (`segment/segment/file.ext`) so that resolution against the storage root
//! is a plain join. Every reference the pipeline writes goes through the same
//! function.

use super::StoreError;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Leading segment that older writers prepended to stored paths.
pub const UPLOADS_PREFIX: &str = "uploads";

/// A normalized, root-relative reference to a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageRef(String);

impl ImageRef {
    /// Normalizes a raw stored path into a root-relative reference.
    ///
    /// - `\` is treated as a separator
    /// - leading separators, empty and `.` segments are dropped
    /// - a leading `uploads` segment is stripped
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::InvalidReference`] for empty input or any `..`
    /// segment.
    pub fn normalize(raw: &str) -> Result<Self, StoreError> {
        let unified = raw.trim().replace('\\', "/");
        let mut segments: Vec<&str> = Vec::new();

        for segment in unified.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    return Err(StoreError::InvalidReference {
                        reference: raw.to_string(),
                        reason: "parent directory segments are not allowed",
                    });
                }
                other => segments.push(other),
            }
        }

        if segments.first() == Some(&UPLOADS_PREFIX) {
            segments.remove(0);
        }

        if segments.is_empty() {
            return Err(StoreError::InvalidReference {
                reference: raw.to_string(),
                reason: "reference does not name a file",
            });
        }

        Ok(Self(segments.join("/")))
    }

    /// Returns the normalized reference string.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the final path segment.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// Resolves this reference against a storage root.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        self.0
            .split('/')
            .fold(root.to_path_buf(), |path, segment| path.join(segment))
    }

    /// Returns a reference to `name` inside this reference's directory.
    ///
    /// # Errors
    ///
    /// Fails when `name` itself is not a valid reference.
    pub fn child(&self, name: &str) -> Result<Self, StoreError> {
        Self::normalize(&format!("{}/{}", self.0, name))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ImageRef {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::normalize(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_plain_relative() {
        let r = ImageRef::normalize("user_1/project_2/main.jpg").unwrap();
        assert_eq!(r.as_str(), "user_1/project_2/main.jpg");
    }

    #[test]
    fn test_normalize_leading_separator() {
        let r = ImageRef::normalize("/user_1/main.jpg").unwrap();
        assert_eq!(r.as_str(), "user_1/main.jpg");
    }

    #[test]
    fn test_normalize_strips_uploads_prefix() {
        assert_eq!(
            ImageRef::normalize("/uploads/user_1/main.jpg").unwrap().as_str(),
            "user_1/main.jpg"
        );
        assert_eq!(
            ImageRef::normalize("uploads/user_1/main.jpg").unwrap().as_str(),
            "user_1/main.jpg"
        );
    }

    #[test]
    fn test_normalize_only_strips_leading_uploads() {
        let r = ImageRef::normalize("user_1/uploads/main.jpg").unwrap();
        assert_eq!(r.as_str(), "user_1/uploads/main.jpg");
    }

    #[test]
    fn test_normalize_backslashes_and_dots() {
        let r = ImageRef::normalize(".\\user_1\\.\\tiles\\\\a.png").unwrap();
        assert_eq!(r.as_str(), "user_1/tiles/a.png");
    }

    #[test]
    fn test_normalize_rejects_parent_segments() {
        let err = ImageRef::normalize("user_1/../../etc/passwd").unwrap_err();
        assert!(matches!(err, StoreError::InvalidReference { .. }));
    }

    #[test]
    fn test_normalize_rejects_empty() {
        assert!(ImageRef::normalize("").is_err());
        assert!(ImageRef::normalize("///").is_err());
        assert!(ImageRef::normalize("/uploads/").is_err());
    }

    #[test]
    fn test_file_name() {
        let r = ImageRef::normalize("a/b/c.png").unwrap();
        assert_eq!(r.file_name(), "c.png");
        let r = ImageRef::normalize("c.png").unwrap();
        assert_eq!(r.file_name(), "c.png");
    }

    #[test]
    fn test_to_path_joins_segments() {
        let r = ImageRef::normalize("/uploads/user_1/a.png").unwrap();
        let path = r.to_path(Path::new("/srv/uploads"));
        assert_eq!(path, PathBuf::from("/srv/uploads/user_1/a.png"));
    }

    #[test]
    fn test_child() {
        let dir = ImageRef::normalize("user_1/target_2/mosaics").unwrap();
        let child = dir.child("mosaic_sd_1.jpg").unwrap();
        assert_eq!(child.as_str(), "user_1/target_2/mosaics/mosaic_sd_1.jpg");
    }

    #[test]
    fn test_from_str_and_display_agree() {
        let r: ImageRef = "/uploads/x/y.png".parse().unwrap();
        assert_eq!(r.to_string(), "x/y.png");
    }
}
