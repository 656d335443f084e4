use crate::position::{FileId, SourcePosition};
use serde::Serialize;
use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use xxhash_rust::xxh3::xxh3_64;

/// The fundamental edit primitive: insert text at one position.
///
/// Every rule compiles down to this. Nothing is ever deleted or replaced, so
/// edits at distinct positions always compose.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[must_use = "Edit does nothing until it is recorded in a RewriteBuffer"]
pub struct Edit {
    /// Where the text goes
    pub position: SourcePosition,
    /// Text to insert
    pub text: String,
    /// How the text is ordered relative to other insertions at the same offset
    pub mode: InsertMode,
}

/// Ordering of an insertion relative to other insertions at the same offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum InsertMode {
    /// In front of the token at the position (and of earlier insertions there)
    BeforeToken,
    /// Behind the token ending at the position (and behind earlier insertions)
    AfterToken,
}

impl Edit {
    pub fn insert_before(position: SourcePosition, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            mode: InsertMode::BeforeToken,
        }
    }

    pub fn insert_after(position: SourcePosition, text: impl Into<String>) -> Self {
        Self {
            position,
            text: text.into(),
            mode: InsertMode::AfterToken,
        }
    }
}

impl fmt::Display for Edit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.mode {
            InsertMode::BeforeToken => "before",
            InsertMode::AfterToken => "after",
        };
        write!(f, "insert {:?} {} {}", self.text, mode, self.position)
    }
}

/// Verification strategy for the text a buffer was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EditVerification {
    /// Exact text match required
    ExactMatch(String),
    /// xxh3 hash of expected text (faster for large files)
    Hash(u64),
}

impl EditVerification {
    /// Check if the provided text matches the verification criteria.
    pub fn matches(&self, text: &str) -> bool {
        match self {
            EditVerification::ExactMatch(expected) => text == expected,
            EditVerification::Hash(expected_hash) => xxh3_64(text.as_bytes()) == *expected_hash,
        }
    }

    /// Create verification from text, using hash for text over 1KB.
    pub fn from_text(text: &str) -> Self {
        if text.len() > 1024 {
            EditVerification::Hash(xxh3_64(text.as_bytes()))
        } else {
            EditVerification::ExactMatch(text.to_string())
        }
    }

    /// Get hash value regardless of variant.
    pub fn hash(&self) -> u64 {
        match self {
            EditVerification::Hash(h) => *h,
            EditVerification::ExactMatch(text) => xxh3_64(text.as_bytes()),
        }
    }
}

#[derive(Error, Debug)]
pub enum EditError {
    #[error("edit targets {found:?} but buffer holds {expected:?}")]
    ForeignFile { expected: FileId, found: FileId },

    #[error("invalid offset {offset} in buffer of length {len}")]
    InvalidOffset { offset: usize, len: usize },

    #[error("offset {offset} is not on a UTF-8 character boundary")]
    NotCharBoundary { offset: usize },

    #[error("{} changed on disk since it was analyzed", path.display())]
    SourceChanged { path: PathBuf },

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("UTF-8 validation error: {0}")]
    Utf8(#[from] std::str::Utf8Error),
}

/// Result of committing a buffer to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
#[must_use = "CommitResult should be checked for written/unchanged"]
pub enum CommitResult {
    /// New contents were written
    Written { file: PathBuf, insertions: usize },
    /// Nothing to write: the buffer holds no insertions
    Unchanged { file: PathBuf },
}

/// Atomic file write: tempfile + fsync + rename, then bump mtime.
///
/// Either the full write succeeds or nothing changes.
pub(crate) fn atomic_write(path: &Path, content: &[u8]) -> Result<(), EditError> {
    // Create tempfile in same directory to ensure same filesystem
    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        Some(_) => Path::new("."),
        None => {
            return Err(EditError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Path has no parent directory",
            )))
        }
    };

    let mut temp = tempfile::NamedTempFile::new_in(parent)?;
    temp.write_all(content)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|e| e.error)?;

    // Invalidate incremental builds that key on mtime
    filetime::set_file_mtime(path, filetime::FileTime::now())?;

    Ok(())
}
