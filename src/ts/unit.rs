//! Loading a translation unit: the primary file plus the headers it includes.
//!
//! No preprocessing happens. `#include` directives are followed so that base
//! classes and types declared in headers are visible to the model; every
//! file is parsed on its own, once.

use crate::pool::with_parser;
use crate::position::{FileId, FileKind, SourceFile, SourceManager};
use crate::query::SourceTree;
use crate::ts::query::{queries, QueryEngine};
use crate::ts::TreeSitterError;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tree_sitter::{Node, Tree};

/// How `#include` directives are followed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IncludeOptions {
    pub follow: bool,
    /// Searched for quoted and angle includes, as user headers
    pub search_paths: Vec<PathBuf>,
    /// Searched last; files found here are system headers
    pub system_paths: Vec<PathBuf>,
    /// Include nesting below the primary file that is still followed
    pub max_depth: usize,
}

impl Default for IncludeOptions {
    fn default() -> Self {
        Self {
            follow: true,
            search_paths: Vec::new(),
            system_paths: Vec::new(),
            max_depth: 8,
        }
    }
}

/// A loaded translation unit with one tree per file.
pub struct ParsedUnit {
    sources: SourceManager,
    trees: Vec<Tree>,
}

impl ParsedUnit {
    /// Every file with its tree, primary first.
    pub fn files(&self) -> impl Iterator<Item = (&SourceFile, &Tree)> {
        self.sources.files().zip(self.trees.iter())
    }

    pub fn tree(&self, id: FileId) -> Option<&Tree> {
        self.trees.get(id.0 as usize)
    }

    pub fn primary_path(&self) -> Option<&Path> {
        self.sources.primary().map(|f| f.path.as_path())
    }
}

impl SourceTree for ParsedUnit {
    fn sources(&self) -> &SourceManager {
        &self.sources
    }
}

/// Builds [`ParsedUnit`]s from disk, or from in-memory files registered with
/// [`UnitBuilder::with_virtual_file`].
#[derive(Debug, Clone, Default)]
pub struct UnitBuilder {
    options: IncludeOptions,
    virtual_files: HashMap<PathBuf, String>,
}

struct Pending {
    id: FileId,
    depth: usize,
}

impl UnitBuilder {
    pub fn new(options: IncludeOptions) -> Self {
        Self {
            options,
            virtual_files: HashMap::new(),
        }
    }

    /// Serve `path` from memory instead of the file system.
    pub fn with_virtual_file(mut self, path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        self.virtual_files.insert(path.into(), text.into());
        self
    }

    pub fn options(&self) -> &IncludeOptions {
        &self.options
    }

    /// Load `path` as the primary file.
    pub fn load(&self, path: &Path) -> Result<ParsedUnit, TreeSitterError> {
        let text = self.read(path)?;
        self.from_source(path, text)
    }

    /// Use `text` as the contents of primary file `path`.
    pub fn from_source(
        &self,
        path: &Path,
        text: impl Into<String>,
    ) -> Result<ParsedUnit, TreeSitterError> {
        let mut unit = ParsedUnit {
            sources: SourceManager::new(),
            trees: Vec::new(),
        };
        let primary = self.add(&mut unit, path.to_path_buf(), FileKind::Primary, text.into())?;

        let mut pending = vec![Pending {
            id: primary,
            depth: 0,
        }];
        while let Some(next) = pending.pop() {
            if !self.options.follow || next.depth >= self.options.max_depth {
                continue;
            }
            for (path, kind) in self.includes_of(&unit, next.id)? {
                if unit.sources.find_by_path(&path).is_some() {
                    continue;
                }
                let Some(text) = self.read_header(&path) else {
                    continue;
                };
                let id = self.add(&mut unit, path, kind, text)?;
                pending.push(Pending {
                    id,
                    depth: next.depth + 1,
                });
            }
        }
        Ok(unit)
    }

    fn add(
        &self,
        unit: &mut ParsedUnit,
        path: PathBuf,
        kind: FileKind,
        text: String,
    ) -> Result<FileId, TreeSitterError> {
        let tree = with_parser(|parser| parser.parse(&text, &path))??;
        let id = unit.sources.add_file(path, kind, text);
        unit.trees.push(tree);
        Ok(id)
    }

    /// Resolved includes of file `id` that exist, with the kind they get.
    fn includes_of(
        &self,
        unit: &ParsedUnit,
        id: FileId,
    ) -> Result<Vec<(PathBuf, FileKind)>, TreeSitterError> {
        let (Some(file), Some(tree)) = (unit.sources.file(id), unit.tree(id)) else {
            return Ok(Vec::new());
        };
        let engine = QueryEngine::new(queries::INCLUDES)?;
        let including_dir = file.path.parent().unwrap_or(Path::new(""));

        let resolved = engine
            .captures(tree.root_node(), &file.text, "path")
            .into_iter()
            .filter_map(|node| {
                let spelled = IncludePath::parse(node, &file.text)?;
                self.resolve(&spelled, including_dir)
                    .map(|(path, kind)| (path, inherit_system(file.kind, kind)))
            })
            .collect();
        Ok(resolved)
    }

    fn resolve(&self, include: &IncludePath, including_dir: &Path) -> Option<(PathBuf, FileKind)> {
        let (name, quoted) = match include {
            IncludePath::Quoted(name) => (name, true),
            IncludePath::Angle(name) => (name, false),
        };
        let local = quoted.then(|| including_dir.join(name));
        let user = self.options.search_paths.iter().map(|dir| dir.join(name));
        let system = self.options.system_paths.iter().map(|dir| dir.join(name));

        local
            .into_iter()
            .chain(user)
            .map(|p| (p, FileKind::UserHeader))
            .chain(system.map(|p| (p, FileKind::SystemHeader)))
            .find(|(p, _)| self.exists(p))
    }

    fn exists(&self, path: &Path) -> bool {
        self.virtual_files.contains_key(path) || path.is_file()
    }

    /// Header text, decoded leniently since headers are never rewritten. An
    /// unreadable header is skipped like an unresolved include.
    fn read_header(&self, path: &Path) -> Option<String> {
        if let Some(text) = self.virtual_files.get(path) {
            return Some(text.clone());
        }
        fs::read(path)
            .ok()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    fn read(&self, path: &Path) -> Result<String, TreeSitterError> {
        if let Some(text) = self.virtual_files.get(path) {
            return Ok(text.clone());
        }
        fs::read_to_string(path).map_err(|source| TreeSitterError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

enum IncludePath {
    Quoted(String),
    Angle(String),
}

impl IncludePath {
    fn parse(node: Node<'_>, source: &str) -> Option<Self> {
        let spelled = source.get(node.byte_range())?.trim();
        if let Some(inner) = spelled.strip_prefix('"').and_then(|s| s.strip_suffix('"')) {
            Some(Self::Quoted(inner.to_string()))
        } else {
            spelled
                .strip_prefix('<')
                .and_then(|s| s.strip_suffix('>'))
                .map(|inner| Self::Angle(inner.to_string()))
        }
    }
}

/// Anything reached from a system header is a system header too.
fn inherit_system(parent: FileKind, found: FileKind) -> FileKind {
    if parent.is_system() {
        FileKind::SystemHeader
    } else {
        found
    }
}
