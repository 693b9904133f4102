//! Image files on disk
//!
//! Images live under `<root>/<YYYY>/<MM>/<sha256(link)>.<ext>`, so a record's
//! image path is derived from its own identity and re-downloads overwrite in
//! place.

use crate::storage::ImageRef;
use chrono::{Datelike, NaiveDate};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::warn;

const KNOWN_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "svg", "webp", "tiff"];

/// Hex SHA-256 of an article link
pub fn hash_link(link: &str) -> String {
    hex::encode(Sha256::digest(link.as_bytes()))
}

/// Writes downloaded images below a root directory
#[derive(Debug, Clone)]
pub struct ImageStore {
    root: PathBuf,
}

impl ImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Target path for the image of `link`, published on `date`
    ///
    /// The extension is taken from the image URL when it is a known image
    /// type and defaults to `jpg`.
    pub fn image_path(&self, date: NaiveDate, link: &str, image_url: &str) -> PathBuf {
        let extension = image_extension(image_url).unwrap_or("jpg");
        self.root
            .join(format!("{:04}", date.year()))
            .join(format!("{:02}", date.month()))
            .join(format!("{}.{}", hash_link(link), extension))
    }

    /// Persists image bytes at `path`
    ///
    /// Never fails: if the file cannot be written the bytes are handed back
    /// inline so the record keeps its image.
    pub fn save_image(&self, path: &Path, bytes: Vec<u8>) -> ImageRef {
        let written = path
            .parent()
            .map(std::fs::create_dir_all)
            .transpose()
            .and_then(|_| std::fs::write(path, &bytes));

        match written {
            Ok(()) => ImageRef::Stored(path.to_path_buf()),
            Err(e) => {
                warn!("Could not write image {}: {}; keeping it inline", path.display(), e);
                ImageRef::Inline(bytes)
            }
        }
    }
}

fn image_extension(url: &str) -> Option<&'static str> {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let (_, ext) = path.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    KNOWN_EXTENSIONS.iter().copied().find(|known| *known == ext)
}
