//! Rewrite buffer for one translation unit.
//!
//! Insertions are keyed by byte offset into the original text and never
//! shift each other, so they can be recorded in any order. Rendering walks the
//! offsets once.

use crate::edit::{atomic_write, CommitResult, Edit, EditError, EditVerification, InsertMode};
use crate::position::{FileId, SourcePosition};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, Default, Clone)]
struct Slot {
    /// Most recent first
    before: Vec<String>,
    /// Oldest first
    after: Vec<String>,
}

/// Accumulates insertions against the original text of one file.
#[derive(Debug, Clone)]
pub struct RewriteBuffer {
    file: FileId,
    original: String,
    verification: EditVerification,
    slots: BTreeMap<usize, Slot>,
    insertions: usize,
}

impl RewriteBuffer {
    pub fn new(file: FileId, original: impl Into<String>) -> Self {
        let original = original.into();
        let verification = EditVerification::from_text(&original);
        Self {
            file,
            original,
            verification,
            slots: BTreeMap::new(),
            insertions: 0,
        }
    }

    pub fn file(&self) -> FileId {
        self.file
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Insert `text` in front of whatever is at `pos`, including text inserted
    /// there earlier.
    pub fn insert_before(&mut self, pos: SourcePosition, text: &str) -> Result<(), EditError> {
        let offset = self.check(pos)?;
        self.slots
            .entry(offset)
            .or_default()
            .before
            .insert(0, text.to_string());
        self.insertions += 1;
        Ok(())
    }

    /// Insert `text` at `pos`, behind anything inserted there earlier.
    pub fn insert_after(&mut self, pos: SourcePosition, text: &str) -> Result<(), EditError> {
        let offset = self.check(pos)?;
        self.slots
            .entry(offset)
            .or_default()
            .after
            .push(text.to_string());
        self.insertions += 1;
        Ok(())
    }

    /// Record an [`Edit`] according to its insertion mode.
    pub fn apply(&mut self, edit: &Edit) -> Result<(), EditError> {
        match edit.mode {
            InsertMode::BeforeToken => self.insert_before(edit.position, &edit.text),
            InsertMode::AfterToken => self.insert_after(edit.position, &edit.text),
        }
    }

    pub fn is_modified(&self) -> bool {
        self.insertions > 0
    }

    pub fn insertion_count(&self) -> usize {
        self.insertions
    }

    /// Produce the edited text.
    pub fn render(&self) -> String {
        let extra: usize = self
            .slots
            .values()
            .flat_map(|s| s.before.iter().chain(s.after.iter()))
            .map(String::len)
            .sum();
        let mut out = String::with_capacity(self.original.len() + extra);
        let mut cursor = 0;

        for (&offset, slot) in &self.slots {
            out.push_str(&self.original[cursor..offset]);
            for text in slot.before.iter().chain(slot.after.iter()) {
                out.push_str(text);
            }
            cursor = offset;
        }
        out.push_str(&self.original[cursor..]);
        out
    }

    /// Write the edited text to `path`.
    ///
    /// Fails with [`EditError::SourceChanged`] if the file no longer holds the
    /// text this buffer was built from.
    pub fn commit(&self, path: &Path) -> Result<CommitResult, EditError> {
        if !self.is_modified() {
            return Ok(CommitResult::Unchanged {
                file: path.to_path_buf(),
            });
        }

        let current = fs::read(path)?;
        let current = std::str::from_utf8(&current)?;
        if !self.verification.matches(current) {
            return Err(EditError::SourceChanged {
                path: path.to_path_buf(),
            });
        }

        atomic_write(path, self.render().as_bytes())?;

        Ok(CommitResult::Written {
            file: path.to_path_buf(),
            insertions: self.insertions,
        })
    }

    fn check(&self, pos: SourcePosition) -> Result<usize, EditError> {
        if pos.file != self.file {
            return Err(EditError::ForeignFile {
                expected: self.file,
                found: pos.file,
            });
        }
        if pos.offset > self.original.len() {
            return Err(EditError::InvalidOffset {
                offset: pos.offset,
                len: self.original.len(),
            });
        }
        if !self.original.is_char_boundary(pos.offset) {
            return Err(EditError::NotCharBoundary { offset: pos.offset });
        }
        Ok(pos.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(offset: usize) -> SourcePosition {
        SourcePosition::new(FileId(0), offset)
    }

    #[test]
    fn renders_untouched_text() {
        let buf = RewriteBuffer::new(FileId(0), "int main() {}");
        assert!(!buf.is_modified());
        assert_eq!(buf.render(), "int main() {}");
    }

    #[test]
    fn insertions_at_distinct_offsets_compose() {
        let mut buf = RewriteBuffer::new(FileId(0), "~A(){} void f(){}");
        buf.insert_after(at(15), " override").unwrap();
        buf.insert_before(at(0), "virtual ").unwrap();

        assert_eq!(buf.render(), "virtual ~A(){} void f() override{}");
        assert_eq!(buf.insertion_count(), 2);
    }

    #[test]
    fn same_offset_ordering_follows_insert_mode() {
        let mut buf = RewriteBuffer::new(FileId(0), "X");
        buf.insert_before(at(0), "b").unwrap();
        buf.insert_before(at(0), "a").unwrap();
        buf.insert_after(at(0), "c").unwrap();
        buf.insert_after(at(0), "d").unwrap();

        assert_eq!(buf.render(), "abcdX");
    }

    #[test]
    fn insertion_at_end_of_text() {
        let mut buf = RewriteBuffer::new(FileId(0), "abc");
        buf.apply(&Edit::insert_after(at(3), "!")).unwrap();
        assert_eq!(buf.render(), "abc!");
    }

    #[test]
    fn rejects_out_of_range_offsets() {
        let mut buf = RewriteBuffer::new(FileId(0), "abc");
        let err = buf.insert_before(at(4), "x").unwrap_err();
        assert!(matches!(err, EditError::InvalidOffset { offset: 4, len: 3 }));
        assert!(!buf.is_modified());
    }

    #[test]
    fn rejects_foreign_files() {
        let mut buf = RewriteBuffer::new(FileId(0), "abc");
        let err = buf
            .insert_before(SourcePosition::new(FileId(1), 0), "x")
            .unwrap_err();
        assert!(matches!(err, EditError::ForeignFile { .. }));
    }

    #[test]
    fn rejects_offsets_inside_multibyte_chars() {
        let mut buf = RewriteBuffer::new(FileId(0), "é");
        let err = buf.insert_before(at(1), "x").unwrap_err();
        assert!(matches!(err, EditError::NotCharBoundary { offset: 1 }));
    }

    #[test]
    fn commit_writes_rendered_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cpp");
        fs::write(&path, "~A(){}").unwrap();

        let mut buf = RewriteBuffer::new(FileId(0), "~A(){}");
        buf.insert_before(at(0), "virtual ").unwrap();
        let result = buf.commit(&path).unwrap();

        assert!(matches!(result, CommitResult::Written { insertions: 1, .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "virtual ~A(){}");
    }

    #[test]
    fn commit_refuses_changed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.cpp");
        fs::write(&path, "something else").unwrap();

        let mut buf = RewriteBuffer::new(FileId(0), "~A(){}");
        buf.insert_before(at(0), "virtual ").unwrap();

        assert!(matches!(
            buf.commit(&path),
            Err(EditError::SourceChanged { .. })
        ));
        assert_eq!(fs::read_to_string(&path).unwrap(), "something else");
    }

    #[test]
    fn commit_without_insertions_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.cpp");
        let buf = RewriteBuffer::new(FileId(0), "x");

        assert!(matches!(
            buf.commit(&path),
            Ok(CommitResult::Unchanged { .. })
        ));
        assert!(!path.exists());
    }
}
