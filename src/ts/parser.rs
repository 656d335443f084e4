use crate::ts::errors::TreeSitterError;
use ast_grep_language::{LanguageExt, SupportLang};
use std::path::Path;
use tree_sitter::{Language, Parser, Tree};

/// The C++ grammar as shipped by ast-grep.
pub fn cpp_language() -> Language {
    SupportLang::Cpp.get_ts_language()
}

/// Tree-sitter parser wrapper for C++ source code.
pub struct CppParser {
    parser: Parser,
}

impl CppParser {
    pub fn new() -> Result<Self, TreeSitterError> {
        let mut parser = Parser::new();
        parser
            .set_language(&cpp_language())
            .map_err(|_| TreeSitterError::LanguageSet)?;

        Ok(Self { parser })
    }

    /// Parse source code into a tree-sitter Tree. `path` only labels errors.
    pub fn parse(&mut self, source: &str, path: &Path) -> Result<Tree, TreeSitterError> {
        self.parser
            .parse(source, None)
            .ok_or_else(|| TreeSitterError::ParseFailed {
                path: path.to_path_buf(),
            })
    }

    /// Parse source code and return the tree along with the source.
    pub fn parse_with_source<'a>(
        &mut self,
        source: &'a str,
    ) -> Result<ParsedSource<'a>, TreeSitterError> {
        let tree = self.parse(source, Path::new("<memory>"))?;
        Ok(ParsedSource { source, tree })
    }
}

/// A parsed source file with its tree-sitter tree.
pub struct ParsedSource<'a> {
    pub source: &'a str,
    pub tree: Tree,
}

impl<'a> ParsedSource<'a> {
    pub fn root_node(&self) -> tree_sitter::Node<'_> {
        self.tree.root_node()
    }

    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    /// Get all ERROR and MISSING nodes in the tree.
    pub fn error_nodes(&self) -> Vec<ErrorNode> {
        let mut errors = Vec::new();
        collect_error_nodes(self.tree.root_node(), &mut errors);
        errors
    }

    pub fn node_text(&self, node: tree_sitter::Node<'_>) -> &'a str {
        &self.source[node.byte_range()]
    }
}

/// Information about an ERROR node in the parse tree.
#[derive(Debug, Clone)]
pub struct ErrorNode {
    pub byte_start: usize,
    pub byte_end: usize,
    pub start_point: tree_sitter::Point,
}

fn collect_error_nodes(node: tree_sitter::Node<'_>, errors: &mut Vec<ErrorNode>) {
    if node.is_error() || node.is_missing() {
        errors.push(ErrorNode {
            byte_start: node.start_byte(),
            byte_end: node.end_byte(),
            start_point: node.start_position(),
        });
    }
    if !node.has_error() {
        return;
    }

    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_error_nodes(child, errors);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_cpp() {
        let mut parser = CppParser::new().unwrap();
        let source = "class Base { public: virtual ~Base() {} };";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(!parsed.has_errors());
        assert_eq!(parsed.root_node().kind(), "translation_unit");
    }

    #[test]
    fn parse_invalid_cpp() {
        let mut parser = CppParser::new().unwrap();
        let source = "class Base { void f( };";
        let parsed = parser.parse_with_source(source).unwrap();

        assert!(parsed.has_errors());
        assert!(!parsed.error_nodes().is_empty());
    }
}
