//! # Upload Staging
//!
//! Helpers for turning multipart file parts into files on disk: name
//! sanitization, the extension allow-list, and the per-request scratch
//! directory the batch reads from.

use regex::Regex;
use std::{
    io,
    path::{Path, PathBuf},
    sync::LazyLock,
};
use tempfile::TempDir;
use tracing::{debug, warn};
use unicode_normalization::UnicodeNormalization;

static UNSAFE_CHARS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_.\-]").expect("valid filename regex"));

/// Reduces a client-supplied file name to a safe, flat file name.
///
/// The name is NFKD-folded to ASCII, path separators and whitespace runs
/// become `_`, anything outside `[A-Za-z0-9_.-]` is dropped, and leading or
/// trailing `.`/`_` are trimmed. Returns `None` when nothing usable is left.
pub fn secure_filename(raw: &str) -> Option<String> {
    let folded: String = raw.nfkd().filter(char::is_ascii).collect();
    let spaced = folded.replace(['/', '\\'], " ");
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let cleaned = UNSAFE_CHARS.replace_all(&joined, "");
    let trimmed = cleaned.trim_matches(|c: char| c == '.' || c == '_');

    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Whether `file_name` has an extension in `allowed` (lowercase, no dot).
pub fn is_allowed(file_name: &str, allowed: &[String]) -> bool {
    match file_name.rsplit_once('.') {
        Some((_, extension)) => {
            let extension = extension.to_ascii_lowercase();
            allowed.iter().any(|candidate| *candidate == extension)
        }
        None => false,
    }
}

/// A scratch directory holding one request's uploads.
///
/// The directory and everything in it are removed by `cleanup`, or on drop
/// if the request is abandoned.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Creates a fresh directory under `parent`, creating `parent` if needed.
    pub fn create(parent: &Path) -> io::Result<Self> {
        std::fs::create_dir_all(parent)?;
        let dir = tempfile::Builder::new().prefix("batch-").tempdir_in(parent)?;
        debug!(path = %dir.path().display(), "Created scratch directory.");
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Writes the `index`-th upload into its own subdirectory, returning its full path.
    ///
    /// Uploads sharing a name never overwrite each other, and the returned
    /// path still ends in `file_name`.
    pub async fn write(&self, index: usize, file_name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let slot = self.dir.path().join(index.to_string());
        tokio::fs::create_dir(&slot).await?;
        let path = slot.join(file_name);
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }

    /// Removes the directory, logging rather than failing if that does not work.
    pub fn cleanup(self) {
        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            warn!("Failed to remove scratch directory {}: {e}", path.display());
        }
    }
}
