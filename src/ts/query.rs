use crate::cache::get_or_compile_query;
use crate::ts::errors::TreeSitterError;
use std::rc::Rc;
use tree_sitter::{Node, Query, QueryCursor, StreamingIterator};

/// Runs one compiled tree-sitter query over C++ trees.
pub struct QueryEngine {
    query: Rc<Query>,
}

impl QueryEngine {
    /// Compile `query_str` against the C++ grammar (cached per thread).
    ///
    /// Queries use tree-sitter's S-expression syntax:
    /// ```text
    /// (class_specifier
    ///   name: (type_identifier) @name
    ///   body: (field_declaration_list)) @record
    /// ```
    pub fn new(query_str: &str) -> Result<Self, TreeSitterError> {
        Ok(Self {
            query: get_or_compile_query(query_str)?,
        })
    }

    /// Every node bound to `capture`, in document order.
    pub fn captures<'t>(&self, root: Node<'t>, source: &str, capture: &str) -> Vec<Node<'t>> {
        let Some(index) = self.query.capture_index_for_name(capture) else {
            return Vec::new();
        };

        let mut cursor = QueryCursor::new();
        let mut matches = cursor.matches(&self.query, root, source.as_bytes());
        let mut nodes = Vec::new();

        // tree-sitter 0.25+ uses StreamingIterator
        while let Some(m) = matches.next() {
            nodes.extend(m.captures.iter().filter(|c| c.index == index).map(|c| c.node));
        }

        nodes.sort_by_key(|n| (n.start_byte(), n.end_byte()));
        nodes.dedup_by_key(|n| n.id());
        nodes
    }

    pub fn capture_names(&self) -> &[&str] {
        self.query.capture_names()
    }
}

/// The queries the front-end runs over every file of a unit.
pub mod queries {
    /// Class, struct and union definitions.
    pub const RECORD_DEFINITIONS: &str = r#"[
        (class_specifier body: (field_declaration_list)) @record
        (struct_specifier body: (field_declaration_list)) @record
        (union_specifier body: (field_declaration_list)) @record
    ]"#;

    /// Any named class-key specifier, including forward declarations.
    pub const RECORD_NAMES: &str = r#"[
        (class_specifier name: (_) @name)
        (struct_specifier name: (_) @name)
        (union_specifier name: (_) @name)
    ]"#;

    pub const ENUM_NAMES: &str = r#"(enum_specifier name: (_) @name)"#;

    pub const TYPEDEFS: &str = r#"(type_definition) @typedef"#;

    pub const ALIASES: &str = r#"(alias_declaration) @alias"#;

    pub const RANGE_LOOPS: &str = r#"(for_range_loop) @loop"#;

    pub const INCLUDES: &str = r#"(preproc_include path: (_) @path)"#;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::parser::CppParser;

    #[test]
    fn finds_record_definitions_only() {
        let mut parser = CppParser::new().unwrap();
        let source = r#"
struct Fwd;
class Base { public: virtual ~Base() {} };
struct Derived : Base { int x; };
"#;
        let parsed = parser.parse_with_source(source).unwrap();
        let engine = QueryEngine::new(queries::RECORD_DEFINITIONS).unwrap();

        let records = engine.captures(parsed.root_node(), source, "record");
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].kind(), "class_specifier");
        assert_eq!(records[1].kind(), "struct_specifier");
    }

    #[test]
    fn finds_include_paths() {
        let mut parser = CppParser::new().unwrap();
        let source = "#include \"base.h\"\n#include <vector>\nint x;\n";
        let parsed = parser.parse_with_source(source).unwrap();
        let engine = QueryEngine::new(queries::INCLUDES).unwrap();

        let paths: Vec<&str> = engine
            .captures(parsed.root_node(), source, "path")
            .into_iter()
            .map(|n| parsed.node_text(n))
            .collect();
        assert_eq!(paths, vec!["\"base.h\"", "<vector>"]);
    }

    #[test]
    fn unknown_capture_yields_nothing() {
        let mut parser = CppParser::new().unwrap();
        let source = "for (int i : v) {}";
        let parsed = parser.parse_with_source(source).unwrap();
        let engine = QueryEngine::new(queries::RANGE_LOOPS).unwrap();

        assert!(engine.captures(parsed.root_node(), source, "nope").is_empty());
        assert_eq!(engine.capture_names(), &["loop"]);
    }
}
