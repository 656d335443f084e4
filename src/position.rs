//! Source position model.
//!
//! A [`SourcePosition`] is a `(file, byte offset)` pair. Positions compare and
//! hash exactly on both fields, which makes them usable as the dedup key of the
//! [`Ledger`](crate::ledger::Ledger) and as edit anchors.
//!
//! Whether a position may be edited is decided by the [`SourceManager`], which
//! knows where every file of a translation unit came from.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Identifier of one file loaded into a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct FileId(pub u32);

/// Where the text of a file came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum FileKind {
    /// The file under direct analysis.
    Primary,
    /// A header pulled in with `#include "..."`.
    UserHeader,
    /// A header pulled in with `#include <...>` from a system path.
    SystemHeader,
    /// Text produced by expanding a macro. The tree-sitter front-end does
    /// not preprocess and never registers one; other capabilities may.
    MacroExpansion,
}

impl FileKind {
    pub fn is_system(self) -> bool {
        matches!(self, FileKind::SystemHeader)
    }
}

/// A point in the original text of a translation unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct SourcePosition {
    pub file: FileId,
    pub offset: usize,
}

impl SourcePosition {
    pub fn new(file: FileId, offset: usize) -> Self {
        Self { file, offset }
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}@{}", self.file.0, self.offset)
    }
}

/// 1-based line and column of a position, for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineColumn {
    pub line: usize,
    pub column: usize,
}

/// One file of a translation unit.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub id: FileId,
    pub path: PathBuf,
    pub kind: FileKind,
    pub text: String,
}

/// Owns the text of every file in a translation unit and classifies positions.
#[derive(Debug, Clone, Default)]
pub struct SourceManager {
    files: Vec<SourceFile>,
}

impl SourceManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file and return its id. Ids are dense and assigned in order.
    pub fn add_file(
        &mut self,
        path: impl Into<PathBuf>,
        kind: FileKind,
        text: impl Into<String>,
    ) -> FileId {
        let id = FileId(self.files.len() as u32);
        self.files.push(SourceFile {
            id,
            path: path.into(),
            kind,
            text: text.into(),
        });
        id
    }

    pub fn file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0 as usize)
    }

    pub fn files(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    /// The first file registered with [`FileKind::Primary`].
    pub fn primary(&self) -> Option<&SourceFile> {
        self.files.iter().find(|f| f.kind == FileKind::Primary)
    }

    pub fn find_by_path(&self, path: &Path) -> Option<FileId> {
        self.files.iter().find(|f| f.path == path).map(|f| f.id)
    }

    pub fn kind_of(&self, pos: SourcePosition) -> Option<FileKind> {
        self.file(pos.file).map(|f| f.kind)
    }

    /// True if `pos` lies inside the text of the primary file.
    ///
    /// Positions in headers, macro expansions, unknown files or past the end of
    /// the primary text are not eligible for edits.
    pub fn is_in_primary(&self, pos: SourcePosition) -> bool {
        match self.file(pos.file) {
            Some(file) => file.kind == FileKind::Primary && pos.offset <= file.text.len(),
            None => false,
        }
    }

    pub fn line_column(&self, pos: SourcePosition) -> Option<LineColumn> {
        let text = &self.file(pos.file)?.text;
        if pos.offset > text.len() || !text.is_char_boundary(pos.offset) {
            return None;
        }
        let before = &text[..pos.offset];
        let line = before.matches('\n').count() + 1;
        let line_start = before.rfind('\n').map(|i| i + 1).unwrap_or(0);
        let column = before[line_start..].chars().count() + 1;
        Some(LineColumn { line, column })
    }

    pub fn path_of(&self, pos: SourcePosition) -> Option<&Path> {
        self.file(pos.file).map(|f| f.path.as_path())
    }
}
