//! Image artifacts written by the agent into the run's figures directory.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use tracing::warn;
use walkdir::WalkDir;

/// Raster formats surfaced to the transcript, matched case-insensitively.
pub const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Media type used when an artifact's extension is not a known raster format.
pub const FALLBACK_MEDIA_TYPE: &str = "application/octet-stream";

/// Lists every image file currently under `directory`, recursively.
///
/// The directory is re-read on every call. A directory that does not exist yet is
/// treated as empty; entries that cannot be read are skipped.
#[must_use]
pub fn scan(directory: &Path) -> BTreeSet<PathBuf> {
    let mut found = BTreeSet::new();
    if !directory.exists() {
        return found;
    }

    for entry in WalkDir::new(directory).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                warn!(directory = %directory.display(), %error, "skipping unreadable entry");
                continue;
            }
        };

        if entry.file_type().is_file() && media_type_for(entry.path()).is_some() {
            found.insert(entry.into_path());
        }
    }

    found
}

/// Maps an image path to its MIME type by extension.
#[must_use]
pub fn media_type_for(path: &Path) -> Option<&'static str> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "bmp" => Some("image/bmp"),
        "tiff" => Some("image/tiff"),
        _ => None,
    }
}

/// Paths already surfaced during one run.
///
/// A path is emitted at most once even if the file is rewritten in place.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    emitted: HashSet<PathBuf>,
}

impl ArtifactSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `path` as emitted. Returns `false` if it already was.
    pub fn mark_emitted(&mut self, path: impl Into<PathBuf>) -> bool {
        self.emitted.insert(path.into())
    }

    /// Filters `scanned` down to unseen paths, marking each one emitted.
    pub fn take_new(&mut self, scanned: impl IntoIterator<Item = PathBuf>) -> Vec<PathBuf> {
        scanned
            .into_iter()
            .filter(|path| self.emitted.insert(path.clone()))
            .collect()
    }

    #[must_use]
    pub fn contains(&self, path: &Path) -> bool {
        self.emitted.contains(path)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.emitted.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.emitted.is_empty()
    }
}
