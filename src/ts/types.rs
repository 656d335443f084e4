//! Just enough of the C++ type system to classify loop variables.
//!
//! Types are described structurally from the syntax ([`TypeDesc`]) and
//! resolved against a per-unit [`TypeTable`] built from every file the unit
//! loaded. Anything the table cannot resolve stays [`TypeClass::Unknown`],
//! which never satisfies a predicate.

use crate::query::TypeClass;
use crate::ts::syntax::{self, inner_declarator, last_component, named_children, normalize, text};
use std::collections::HashMap;
use tree_sitter::Node;

/// Alias chains longer than this are treated as unresolvable.
const MAX_RESOLVE_DEPTH: usize = 16;

/// Class templates of the standard library whose elements are the first
/// template argument.
const STD_SEQUENCES: &[&str] = &[
    "vector",
    "list",
    "deque",
    "set",
    "multiset",
    "unordered_set",
    "unordered_multiset",
    "array",
    "forward_list",
    "span",
    "initializer_list",
    "valarray",
    "queue",
    "stack",
    "priority_queue",
];

/// Standard associative containers; their elements are `std::pair`.
const STD_MAPS: &[&str] = &["map", "multimap", "unordered_map", "unordered_multimap"];

/// Non-template standard library class types.
const STD_RECORDS: &[&str] = &[
    "string",
    "wstring",
    "u8string",
    "u16string",
    "u32string",
    "string_view",
    "wstring_view",
    "any",
    "mutex",
    "thread",
    "path",
    "regex",
    "error_code",
    "exception",
    "runtime_error",
    "logic_error",
    "bitset",
    "pair",
    "tuple",
    "optional",
    "variant",
    "function",
];

/// Standard library typedefs of fundamental types.
const STD_SCALARS: &[&str] = &[
    "size_t",
    "ptrdiff_t",
    "intptr_t",
    "uintptr_t",
    "intmax_t",
    "uintmax_t",
    "int8_t",
    "int16_t",
    "int32_t",
    "int64_t",
    "uint8_t",
    "uint16_t",
    "uint32_t",
    "uint64_t",
    "nullptr_t",
    "byte",
    "ssize_t",
    "off_t",
    "time_t",
    "char8_t",
    "char16_t",
    "char32_t",
];

/// A type as spelled in a declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeDesc {
    /// fundamental type or enumeration
    Scalar,
    /// plain or qualified name: `Foo`, `std::string`
    Named(String),
    /// template specialization: `std::vector<Foo>`
    Template { name: String, args: Vec<TypeDesc> },
    Pointer(Box<TypeDesc>),
    Reference(Box<TypeDesc>),
    Array(Box<TypeDesc>),
    /// `auto` or `decltype(auto)`
    Auto,
    Unknown,
}

impl TypeDesc {
    /// Describe the type of a declaration with specifier `ty` and `declarator`.
    pub fn of_declaration(ty: Node<'_>, declarator: Option<Node<'_>>, source: &str) -> Self {
        let base = Self::of_type_node(ty, source);
        match declarator {
            Some(d) => Self::wrap(base, d),
            None => base,
        }
    }

    /// Describe a `type_descriptor` (template argument, `using` target, cast).
    pub fn of_descriptor(node: Node<'_>, source: &str) -> Self {
        match node.child_by_field_name("type") {
            Some(ty) => Self::of_declaration(ty, node.child_by_field_name("declarator"), source),
            None => Self::Unknown,
        }
    }

    /// Describe a type specifier node.
    pub fn of_type_node(node: Node<'_>, source: &str) -> Self {
        match node.kind() {
            "primitive_type" | "sized_type_specifier" | "enum_specifier" => Self::Scalar,
            "auto" | "placeholder_type_specifier" => Self::Auto,
            "type_identifier" => Self::Named(normalize(text(node, source))),
            "template_type" => Self::template(node, String::new(), source),
            "qualified_identifier" | "qualified_type_identifier" => {
                Self::qualified(node, String::new(), source)
            }
            "class_specifier" | "struct_specifier" | "union_specifier" => {
                match node.child_by_field_name("name") {
                    Some(name) => Self::Named(normalize(text(name, source))),
                    None => Self::Unknown,
                }
            }
            _ => Self::Unknown,
        }
    }

    fn qualified(node: Node<'_>, prefix: String, source: &str) -> Self {
        let scope = node
            .child_by_field_name("scope")
            .map(|s| normalize(text(s, source)))
            .unwrap_or_default();
        let prefix = format!("{prefix}{scope}::");
        match node.child_by_field_name("name") {
            Some(name) if name.kind() == "template_type" => Self::template(name, prefix, source),
            Some(name)
                if matches!(name.kind(), "qualified_identifier" | "qualified_type_identifier") =>
            {
                Self::qualified(name, prefix, source)
            }
            Some(name) => Self::Named(normalize(&format!("{prefix}{}", text(name, source)))),
            None => Self::Unknown,
        }
    }

    fn template(node: Node<'_>, prefix: String, source: &str) -> Self {
        let Some(name) = node.child_by_field_name("name") else {
            return Self::Unknown;
        };
        let args = node
            .child_by_field_name("arguments")
            .map(|list| {
                named_children(list)
                    .into_iter()
                    .map(|arg| match arg.kind() {
                        "type_descriptor" => Self::of_descriptor(arg, source),
                        _ => Self::Unknown,
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self::Template {
            name: normalize(&format!("{prefix}{}", text(name, source))),
            args,
        }
    }

    /// Apply the shape of a (possibly abstract) declarator to `base`.
    fn wrap(base: Self, declarator: Node<'_>) -> Self {
        let inner = |d: Node<'_>, base: Self| match inner_declarator(d) {
            Some(next) => Self::wrap(base, next),
            None => base,
        };
        match declarator.kind() {
            "pointer_declarator" | "abstract_pointer_declarator" => {
                Self::Pointer(Box::new(inner(declarator, base)))
            }
            "reference_declarator" | "abstract_reference_declarator" => {
                Self::Reference(Box::new(inner(declarator, base)))
            }
            "array_declarator" | "abstract_array_declarator" => {
                Self::Array(Box::new(inner(declarator, base)))
            }
            "init_declarator" | "attributed_declarator" => inner(declarator, base),
            "parenthesized_declarator" => match named_children(declarator).into_iter().next() {
                Some(d) => Self::wrap(base, d),
                None => base,
            },
            _ => base,
        }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

/// What a type name in the unit refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeEntry {
    Record,
    Enum,
    Alias(TypeDesc),
    /// `template <...> using X = ...;` (not resolved)
    AliasTemplate,
}

/// Data members and bases of one record, for scope lookup.
#[derive(Debug, Clone, Default)]
pub struct RecordShape {
    pub fields: Vec<(String, TypeDesc)>,
    pub bases: Vec<String>,
}

/// Every type name declared in the files of one unit, keyed by its last
/// name component.
#[derive(Debug, Clone, Default)]
pub struct TypeTable {
    entries: HashMap<String, TypeEntry>,
    records: HashMap<String, RecordShape>,
    globals: HashMap<String, TypeDesc>,
}

impl TypeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record and enum names win over aliases declared later with the same
    /// name.
    pub fn declare(&mut self, name: &str, entry: TypeEntry) {
        let key = last_component(name).to_string();
        match (self.entries.get(&key), &entry) {
            (Some(TypeEntry::Record | TypeEntry::Enum), TypeEntry::Alias(_)) => {}
            _ => {
                self.entries.insert(key, entry);
            }
        }
    }

    pub fn entry(&self, name: &str) -> Option<&TypeEntry> {
        self.entries.get(last_component(name))
    }

    pub fn add_record_shape(&mut self, name: &str, shape: RecordShape) {
        let slot = self.records.entry(name.to_string()).or_default();
        slot.fields.extend(shape.fields);
        slot.bases.extend(shape.bases);
    }

    pub fn add_global(&mut self, name: &str, ty: TypeDesc) {
        self.globals.insert(name.to_string(), ty);
    }

    pub fn global(&self, name: &str) -> Option<&TypeDesc> {
        self.globals.get(name)
    }

    /// Type of data member `field` of `record`, searching bases too.
    pub fn field_of(&self, record: &str, field: &str) -> Option<&TypeDesc> {
        let mut pending = vec![last_component(record).to_string()];
        let mut seen = Vec::new();
        while let Some(name) = pending.pop() {
            if seen.contains(&name) {
                continue;
            }
            if let Some(shape) = self.records.get(&name) {
                if let Some((_, ty)) = shape.fields.iter().find(|(n, _)| n == field) {
                    return Some(ty);
                }
                pending.extend(shape.bases.iter().cloned());
            }
            seen.push(name);
        }
        None
    }

    /// Coarse class of `ty`.
    pub fn classify(&self, ty: &TypeDesc) -> TypeClass {
        self.classify_at(ty, 0)
    }

    fn classify_at(&self, ty: &TypeDesc, depth: usize) -> TypeClass {
        if depth > MAX_RESOLVE_DEPTH {
            return TypeClass::Unknown;
        }
        match ty {
            TypeDesc::Scalar => TypeClass::Scalar,
            TypeDesc::Pointer(_) => TypeClass::Pointer,
            TypeDesc::Array(_) => TypeClass::Array,
            TypeDesc::Reference(inner) => self.classify_at(inner, depth + 1),
            TypeDesc::Auto | TypeDesc::Unknown => TypeClass::Unknown,
            TypeDesc::Named(name) => self.classify_name(name, depth),
            TypeDesc::Template { name, .. } => match self.entry(name) {
                Some(TypeEntry::AliasTemplate) => TypeClass::Unknown,
                Some(TypeEntry::Alias(_) | TypeEntry::Enum) => TypeClass::Unknown,
                Some(TypeEntry::Record) => TypeClass::Record,
                // std::decay_t<...> and friends name arbitrary types
                None if name.ends_with("_t") => TypeClass::Unknown,
                None => TypeClass::Record,
            },
        }
    }

    fn classify_name(&self, name: &str, depth: usize) -> TypeClass {
        match self.entry(name) {
            Some(TypeEntry::Record) => return TypeClass::Record,
            Some(TypeEntry::Enum) => return TypeClass::Scalar,
            Some(TypeEntry::Alias(target)) => return self.classify_at(target, depth + 1),
            Some(TypeEntry::AliasTemplate) => return TypeClass::Unknown,
            None => {}
        }
        let short = last_component(name);
        let std_or_bare = name == short || name.starts_with("std::");
        if std_or_bare && STD_SCALARS.contains(&short) {
            TypeClass::Scalar
        } else if std_or_bare && STD_RECORDS.contains(&short) {
            TypeClass::Record
        } else {
            TypeClass::Unknown
        }
    }

    /// Element type produced by iterating over a value of type `ty`.
    pub fn element_of(&self, ty: &TypeDesc) -> Option<TypeDesc> {
        self.element_at(ty, 0)
    }

    fn element_at(&self, ty: &TypeDesc, depth: usize) -> Option<TypeDesc> {
        if depth > MAX_RESOLVE_DEPTH {
            return None;
        }
        match ty {
            TypeDesc::Array(inner) => Some((**inner).clone()),
            TypeDesc::Reference(inner) => self.element_at(inner, depth + 1),
            TypeDesc::Template { name, args } => {
                let short = last_component(name);
                let user_defined =
                    !name.starts_with("std::") && matches!(self.entry(name), Some(TypeEntry::Record));
                if user_defined {
                    None
                } else if STD_SEQUENCES.contains(&short) {
                    args.first().cloned()
                } else if STD_MAPS.contains(&short) {
                    Some(TypeDesc::Named("std::pair".to_string()))
                } else {
                    None
                }
            }
            TypeDesc::Named(name) => match self.entry(name) {
                Some(TypeEntry::Alias(target)) => self.element_at(target, depth + 1),
                Some(_) => None,
                None if matches!(last_component(name), "string" | "string_view" | "wstring") => {
                    Some(TypeDesc::Scalar)
                }
                None => None,
            },
            _ => None,
        }
    }
}

/// Whether `node` is the declaration of a `template_declaration`.
pub fn is_templated(node: Node<'_>) -> bool {
    node.parent()
        .is_some_and(|p| p.kind() == "template_declaration")
}

/// Name and type of every declarator of a `declaration` / `field_declaration`.
pub fn declared_variables(decl: Node<'_>, source: &str) -> Vec<(String, TypeDesc)> {
    let Some(ty) = decl.child_by_field_name("type") else {
        return Vec::new();
    };
    syntax::field_children(decl, "declarator")
        .into_iter()
        .filter(|d| syntax::function_declarator(*d).is_none())
        .filter_map(|d| {
            let name = syntax::declared_name(d)?;
            Some((
                text(name, source).to_string(),
                TypeDesc::of_declaration(ty, Some(d), source),
            ))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ts::parser::CppParser;

    fn first_declaration(source: &str) -> (String, TypeDesc) {
        let mut parser = CppParser::new().unwrap();
        let parsed = parser.parse_with_source(source).unwrap();
        let decl = named_children(parsed.root_node())
            .into_iter()
            .find(|n| n.kind() == "declaration")
            .unwrap();
        declared_variables(decl, source).remove(0)
    }

    #[test]
    fn describes_declarations() {
        assert_eq!(first_declaration("int x;").1, TypeDesc::Scalar);
        assert_eq!(
            first_declaration("Foo* p;").1,
            TypeDesc::Pointer(Box::new(TypeDesc::Named("Foo".into())))
        );
        assert_eq!(
            first_declaration("Foo items[4];").1,
            TypeDesc::Array(Box::new(TypeDesc::Named("Foo".into())))
        );
        assert_eq!(
            first_declaration("std::vector<Foo> items;").1,
            TypeDesc::Template {
                name: "std::vector".into(),
                args: vec![TypeDesc::Named("Foo".into())]
            }
        );
        assert_eq!(first_declaration("const std::string& s = x;").0, "s");
    }

    #[test]
    fn classification_follows_the_table() {
        let mut table = TypeTable::new();
        table.declare("Foo", TypeEntry::Record);
        table.declare("Color", TypeEntry::Enum);
        table.declare("FooAlias", TypeEntry::Alias(TypeDesc::Named("Foo".into())));
        table.declare("Index", TypeEntry::Alias(TypeDesc::Named("size_t".into())));

        let named = |n: &str| TypeDesc::Named(n.into());
        assert_eq!(table.classify(&named("Foo")), TypeClass::Record);
        assert_eq!(table.classify(&named("ns::Foo")), TypeClass::Record);
        assert_eq!(table.classify(&named("Color")), TypeClass::Scalar);
        assert_eq!(table.classify(&named("FooAlias")), TypeClass::Record);
        assert_eq!(table.classify(&named("Index")), TypeClass::Scalar);
        assert_eq!(table.classify(&named("std::string")), TypeClass::Record);
        assert_eq!(table.classify(&named("T")), TypeClass::Unknown);
        assert_eq!(table.classify(&TypeDesc::Auto), TypeClass::Unknown);
    }

    #[test]
    fn alias_cycles_do_not_hang() {
        let mut table = TypeTable::new();
        table.declare("A", TypeEntry::Alias(TypeDesc::Named("B".into())));
        table.declare("B", TypeEntry::Alias(TypeDesc::Named("A".into())));

        assert_eq!(
            table.classify(&TypeDesc::Named("A".into())),
            TypeClass::Unknown
        );
    }

    #[test]
    fn container_elements() {
        let table = TypeTable::new();
        let vector_of = |arg: TypeDesc| TypeDesc::Template {
            name: "std::vector".into(),
            args: vec![arg],
        };

        assert_eq!(
            table.element_of(&vector_of(TypeDesc::Named("Foo".into()))),
            Some(TypeDesc::Named("Foo".into()))
        );
        assert_eq!(
            table.element_of(&TypeDesc::Template {
                name: "std::map".into(),
                args: vec![TypeDesc::Scalar, TypeDesc::Scalar]
            })
            .map(|t| table.classify(&t)),
            Some(TypeClass::Record)
        );
        assert_eq!(
            table.element_of(&TypeDesc::Named("std::string".into())),
            Some(TypeDesc::Scalar)
        );
        assert_eq!(table.element_of(&TypeDesc::Scalar), None);
    }

    #[test]
    fn field_lookup_walks_bases() {
        let mut table = TypeTable::new();
        table.add_record_shape(
            "Base",
            RecordShape {
                fields: vec![("items".into(), TypeDesc::Named("Foo".into()))],
                bases: Vec::new(),
            },
        );
        table.add_record_shape(
            "Derived",
            RecordShape {
                fields: Vec::new(),
                bases: vec!["Base".into()],
            },
        );

        assert_eq!(
            table.field_of("Derived", "items"),
            Some(&TypeDesc::Named("Foo".into()))
        );
        assert_eq!(table.field_of("Derived", "other"), None);
    }
}
