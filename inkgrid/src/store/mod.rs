//! Image store adapter.
//!
//! Resolves logical image references to files under the uploads root and
//! decodes them into RGBA rasters. This is a read-only boundary: the pipeline
//! never writes through it.
//!
//! # Key Components
//!
//! - [`ImageRef`] - Normalized root-relative reference
//! - [`ImageStore`] - Resolve/decode trait used by the pipeline
//! - [`FsImageStore`] - Filesystem implementation
//! - [`DecodedImage`] - Decoded pixels plus origin reference

mod decoded;
mod error;
mod fs;
mod reference;

pub use decoded::DecodedImage;
pub use error::StoreError;
pub use fs::{FsImageStore, ImageStore};
pub use reference::{ImageRef, UPLOADS_PREFIX};
