pub mod source;

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rand::Rng;
use serde::Serialize;
use thiserror::Error;

pub use source::{DirectoryImageSource, ImageSource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Width,
    Height,
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dimension::Width => write!(f, "width"),
            Dimension::Height => write!(f, "height"),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    #[error("Invalid '{parameter}' parameter. It must be a number greater than 0 and at most {max}.")]
    InvalidDimension { parameter: Dimension, max: u32 },

    #[error("No images available: {0}")]
    NoImagesAvailable(String),
}

/// Source of raw image indices. Values may be negative or larger than the
/// image set; the resolver reduces them.
pub trait IndexProvider: Send + Sync {
    fn next_index(&self) -> i64;
}

pub struct RandomIndex;

impl IndexProvider for RandomIndex {
    fn next_index(&self) -> i64 {
        rand::thread_rng().gen_range(0..i64::MAX)
    }
}

/// Always yields the same raw index.
pub struct FixedIndex(pub i64);

impl IndexProvider for FixedIndex {
    fn next_index(&self) -> i64 {
        self.0
    }
}

/// Location of one resized artifact in the cache tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub filename: String,
}

impl CacheKey {
    /// `{root}/{index}/{width}/{height}`
    pub fn dir(&self, root: &Path) -> PathBuf {
        root.join(self.index.to_string())
            .join(self.width.to_string())
            .join(self.height.to_string())
    }

    /// `{root}/{index}/{width}/{height}/{filename}`
    pub fn path(&self, root: &Path) -> PathBuf {
        self.dir(root).join(&self.filename)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}/{}", self.index, self.width, self.height, self.filename)
    }
}

/// Wraps a raw index into `0..len`. Negative values wrap from the end.
pub fn reduce_index(raw: i64, len: usize) -> usize {
    debug_assert!(len > 0);
    raw.rem_euclid(len as i64) as usize
}

/// Checks `0 < value <= max`.
pub fn validate_dimension(parameter: Dimension, value: i64, max: u32) -> Result<u32, ResolveError> {
    if value <= 0 || value > i64::from(max) {
        return Err(ResolveError::InvalidDimension { parameter, max });
    }
    Ok(value as u32)
}

/// Parses a path segment as a dimension. Anything that is not a decimal
/// integer in range is rejected the same way as an out-of-bounds value.
pub fn parse_dimension(parameter: Dimension, raw: &str, max: u32) -> Result<u32, ResolveError> {
    let value = raw
        .trim()
        .parse::<i64>()
        .map_err(|_| ResolveError::InvalidDimension { parameter, max })?;
    validate_dimension(parameter, value, max)
}

pub struct Resolver {
    source: Arc<dyn ImageSource>,
    indices: Arc<dyn IndexProvider>,
    max_dimension: u32,
}

impl Resolver {
    pub fn new(source: Arc<dyn ImageSource>, indices: Arc<dyn IndexProvider>, max_dimension: u32) -> Self {
        Self {
            source,
            indices,
            max_dimension,
        }
    }

    /// Validates the dimensions and picks an image with the injected index provider.
    pub fn resolve(&self, width: i64, height: i64) -> Result<CacheKey, ResolveError> {
        self.resolve_with_index(width, height, self.indices.next_index())
    }

    /// Same as [`Resolver::resolve`] with path segments as received from the request.
    pub fn resolve_raw(&self, width: &str, height: &str) -> Result<CacheKey, ResolveError> {
        let width = parse_dimension(Dimension::Width, width, self.max_dimension)?;
        let height = parse_dimension(Dimension::Height, height, self.max_dimension)?;
        self.resolve(i64::from(width), i64::from(height))
    }

    pub fn resolve_with_index(&self, width: i64, height: i64, raw_index: i64) -> Result<CacheKey, ResolveError> {
        let width = validate_dimension(Dimension::Width, width, self.max_dimension)?;
        let height = validate_dimension(Dimension::Height, height, self.max_dimension)?;

        let mut images = self
            .source
            .list_images()
            .map_err(|e| ResolveError::NoImagesAvailable(format!("failed to list source images: {}", e)))?;

        if images.is_empty() {
            return Err(ResolveError::NoImagesAvailable(
                "no images found in the images directory".to_string(),
            ));
        }

        let index = reduce_index(raw_index, images.len());
        let filename = images.swap_remove(index);

        log::debug!(
            "Selected image {} ({}) from {} available images",
            index,
            filename,
            images.len() + 1
        );

        Ok(CacheKey {
            index,
            width,
            height,
            filename,
        })
    }
}
