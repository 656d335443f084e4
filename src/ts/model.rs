//! Class hierarchy model of one translation unit.
//!
//! Built once per query run from every record definition in every file of
//! the unit. A base is looked up the way C++ does for a base clause: from the
//! derived class's enclosing scope outward, or below the named qualifier for
//! `ns::Base`. Template arguments of a base specialization are substituted
//! into the base's member signatures before they are compared.

use crate::position::{FileId, SourcePosition};
use crate::ts::query::{queries, QueryEngine};
use crate::ts::syntax::{self, named_children, normalize, text};
use crate::ts::types::{declared_variables, is_templated, RecordShape, TypeDesc, TypeEntry, TypeTable};
use crate::ts::TreeSitterError;
use std::collections::{HashMap, HashSet, VecDeque};
use std::iter;
use tree_sitter::Node;

/// Parameter types and trailing qualifiers: what makes two member functions
/// with the same name override each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    pub params: Vec<String>,
    /// `const`, `volatile`, `&`, `&&`, sorted
    pub qualifiers: Vec<String>,
}

impl Signature {
    /// The signature with template parameters replaced by `bindings`.
    fn substituted(&self, bindings: &Bindings) -> Signature {
        if bindings.is_empty() {
            return self.clone();
        }
        Signature {
            params: self.params.iter().map(|p| substitute(p, bindings)).collect(),
            qualifiers: self.qualifiers.clone(),
        }
    }
}

/// Template parameter name to the argument it stands for.
type Bindings = HashMap<String, String>;

/// A class named in a base clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseName {
    /// Spelled with a leading `::`
    pub global: bool,
    pub qualifier: Vec<String>,
    pub name: String,
    /// Template arguments, normalized
    pub args: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub signature: Signature,
    pub declared_virtual: bool,
    pub has_override: bool,
    pub has_final: bool,
    pub begin: SourcePosition,
    pub location: SourcePosition,
    /// Start of the declarator's last token
    pub last_token: Option<SourcePosition>,
}

impl MethodDecl {
    /// Virtual by its own declaration.
    fn virtual_by_declaration(&self) -> bool {
        self.declared_virtual || self.has_override || self.has_final
    }

    pub fn has_marker(&self, final_is_override: bool) -> bool {
        self.has_override || (final_is_override && self.has_final)
    }
}

#[derive(Debug, Clone)]
pub struct DestructorDecl {
    pub name: String,
    pub declared_virtual: bool,
    pub has_override: bool,
    pub has_final: bool,
    pub begin: SourcePosition,
    pub location: SourcePosition,
    pub last_token: Option<SourcePosition>,
}

impl DestructorDecl {
    fn virtual_by_declaration(&self) -> bool {
        self.declared_virtual || self.has_override || self.has_final
    }

    pub fn has_marker(&self, final_is_override: bool) -> bool {
        self.has_override || (final_is_override && self.has_final)
    }
}

#[derive(Debug, Clone)]
pub struct Record {
    pub name: String,
    /// Enclosing namespaces and classes, outermost first
    pub scope: Vec<String>,
    /// Names of the template parameters, empty for a non-template
    pub template_params: Vec<String>,
    pub file: FileId,
    pub system: bool,
    pub bases: Vec<BaseName>,
    pub destructor: Option<DestructorDecl>,
    pub methods: Vec<MethodDecl>,
    pub fields: Vec<(String, TypeDesc)>,
}

/// One file's text and tree, as seen by the model builder.
pub struct FileSyntax<'u> {
    pub file: FileId,
    pub system: bool,
    pub source: &'u str,
    pub root: Node<'u>,
}

/// Records and types of one unit.
#[derive(Debug, Default)]
pub struct UnitModel {
    records: Vec<Record>,
    by_name: HashMap<String, Vec<usize>>,
    types: TypeTable,
}

impl UnitModel {
    pub fn build(files: &[FileSyntax<'_>]) -> Result<Self, TreeSitterError> {
        let definitions = QueryEngine::new(queries::RECORD_DEFINITIONS)?;
        let record_names = QueryEngine::new(queries::RECORD_NAMES)?;
        let enum_names = QueryEngine::new(queries::ENUM_NAMES)?;
        let typedefs = QueryEngine::new(queries::TYPEDEFS)?;
        let aliases = QueryEngine::new(queries::ALIASES)?;

        let mut model = UnitModel::default();
        for f in files {
            for node in record_names.captures(f.root, f.source, "name") {
                model
                    .types
                    .declare(&syntax::simple_type_name(node, f.source), TypeEntry::Record);
            }
            for node in enum_names.captures(f.root, f.source, "name") {
                model.types.declare(text(node, f.source), TypeEntry::Enum);
            }
            for node in typedefs.captures(f.root, f.source, "typedef") {
                declare_typedef(&mut model.types, node, f.source);
            }
            for node in aliases.captures(f.root, f.source, "alias") {
                declare_alias(&mut model.types, node, f.source);
            }
            declare_globals(&mut model.types, f.root, f.source);
            for node in definitions.captures(f.root, f.source, "record") {
                if let Some(record) = extract_record(node, f) {
                    model.add(record);
                }
            }
        }
        Ok(model)
    }

    fn add(&mut self, record: Record) {
        self.types.add_record_shape(
            &record.name,
            RecordShape {
                fields: record.fields.clone(),
                bases: record.bases.iter().map(|b| b.name.clone()).collect(),
            },
        );
        self.by_name
            .entry(record.name.clone())
            .or_default()
            .push(self.records.len());
        self.records.push(record);
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record(&self, index: usize) -> &Record {
        &self.records[index]
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    /// Direct bases of record `index` that are defined in the unit.
    pub fn direct_bases(&self, index: usize) -> Vec<usize> {
        let mut bases: Vec<usize> = self
            .base_edges(index, &Bindings::new())
            .into_iter()
            .map(|(b, _)| b)
            .collect();
        bases.dedup();
        bases
    }

    /// Direct bases of record `index` together with the bindings of their
    /// template parameters. `bindings` are those of `index` itself.
    fn base_edges(&self, index: usize, bindings: &Bindings) -> Vec<(usize, Bindings)> {
        let mut edges = Vec::new();
        for base in &self.records[index].bases {
            for found in self.resolve(index, base) {
                let next: Bindings = self.records[found]
                    .template_params
                    .iter()
                    .zip(&base.args)
                    .filter(|(param, _)| !param.is_empty())
                    .map(|(param, arg)| (param.clone(), substitute(arg, bindings)))
                    .collect();
                edges.push((found, next));
            }
        }
        edges
    }

    /// Records `base` names when spelled in the base clause of record
    /// `index`. A name found in no modelled scope (say, through a
    /// using-directive) falls back to its only definition with a matching
    /// qualifier, if that is unique.
    fn resolve(&self, index: usize, base: &BaseName) -> Vec<usize> {
        let candidates: Vec<usize> = self
            .by_name
            .get(&base.name)
            .map(|found| found.iter().copied().filter(|&i| i != index).collect())
            .unwrap_or_default();
        if candidates.is_empty() {
            return candidates;
        }

        let from = &self.records[index].scope;
        let depths: Vec<usize> = if base.global {
            vec![0]
        } else {
            (0..=from.len()).rev().collect()
        };
        for depth in depths {
            let found: Vec<usize> = candidates
                .iter()
                .copied()
                .filter(|&i| {
                    let scope = &self.records[i].scope;
                    scope.len() == depth + base.qualifier.len()
                        && scope[..depth] == from[..depth]
                        && scope[depth..] == base.qualifier[..]
                })
                .collect();
            if !found.is_empty() {
                return found;
            }
        }

        let tail: Vec<usize> = candidates
            .into_iter()
            .filter(|&i| self.records[i].scope.ends_with(&base.qualifier))
            .collect();
        if tail.len() == 1 {
            tail
        } else {
            Vec::new()
        }
    }

    /// Transitive bases of record `index`, nearest first.
    pub fn ancestors(&self, index: usize) -> Vec<usize> {
        let mut seen = HashSet::from([index]);
        let mut order = Vec::new();
        let mut queue: VecDeque<usize> = self.direct_bases(index).into();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next);
            queue.extend(self.direct_bases(next));
        }
        order
    }

    /// Whether another record of the unit derives from record `index`.
    pub fn is_base(&self, index: usize) -> bool {
        (0..self.records.len()).any(|i| i != index && self.ancestors(i).contains(&index))
    }

    /// Whether the destructor of record `index` is virtual, by declaration or
    /// through a base with a virtual destructor.
    pub fn destructor_is_virtual(&self, index: usize) -> bool {
        let declared = self.records[index]
            .destructor
            .as_ref()
            .is_some_and(DestructorDecl::virtual_by_declaration);
        declared
            || self.ancestors(index).into_iter().any(|a| {
                self.records[a]
                    .destructor
                    .as_ref()
                    .is_some_and(DestructorDecl::virtual_by_declaration)
            })
    }

    /// Whether record `index` has a virtual member function `name` with
    /// `signature`, declared there or inherited as virtual. Signatures of
    /// `index` are read through `bindings`.
    fn has_virtual(
        &self,
        index: usize,
        name: &str,
        signature: &Signature,
        bindings: &Bindings,
        seen: &mut HashSet<usize>,
    ) -> bool {
        if !seen.insert(index) {
            return false;
        }
        let declared = self.records[index].methods.iter().any(|m| {
            m.name == name
                && m.virtual_by_declaration()
                && &m.signature.substituted(bindings) == signature
        });
        declared
            || self
                .base_edges(index, bindings)
                .into_iter()
                .any(|(b, next)| self.has_virtual(b, name, signature, &next, seen))
    }

    /// Whether `method` of record `index` overrides a virtual function of one
    /// of its bases.
    pub fn overrides(&self, index: usize, method: &MethodDecl) -> bool {
        let mut seen = HashSet::from([index]);
        self.base_edges(index, &Bindings::new())
            .into_iter()
            .any(|(b, bindings)| {
                self.has_virtual(b, &method.name, &method.signature, &bindings, &mut seen)
            })
    }

    /// Whether the destructor of record `index` overrides a virtual one.
    pub fn destructor_overrides(&self, index: usize) -> bool {
        self.direct_bases(index)
            .into_iter()
            .any(|b| self.destructor_is_virtual(b))
    }
}

fn declare_typedef(types: &mut TypeTable, node: Node<'_>, source: &str) {
    let Some(ty) = node.child_by_field_name("type") else {
        return;
    };
    for declarator in syntax::field_children(node, "declarator") {
        if let Some(name) = type_identifier_in(declarator) {
            let target = TypeDesc::of_declaration(ty, Some(declarator), source);
            types.declare(text(name, source), TypeEntry::Alias(target));
        }
    }
}

/// The `type_identifier` a typedef declarator introduces.
fn type_identifier_in(declarator: Node<'_>) -> Option<Node<'_>> {
    let mut current = declarator;
    loop {
        if current.kind() == "type_identifier" {
            return Some(current);
        }
        current = syntax::inner_declarator(current)?;
    }
}

fn declare_alias(types: &mut TypeTable, node: Node<'_>, source: &str) {
    let Some(name) = node.child_by_field_name("name") else {
        return;
    };
    let entry = if is_templated(node) {
        TypeEntry::AliasTemplate
    } else {
        match node.child_by_field_name("type") {
            Some(target) => TypeEntry::Alias(TypeDesc::of_descriptor(target, source)),
            None => return,
        }
    };
    types.declare(text(name, source), entry);
}

/// Variables declared at namespace scope.
fn declare_globals(types: &mut TypeTable, scope: Node<'_>, source: &str) {
    for child in named_children(scope) {
        match child.kind() {
            "declaration" => {
                for (name, ty) in declared_variables(child, source) {
                    types.add_global(&name, ty);
                }
            }
            "namespace_definition" | "linkage_specification" => {
                if let Some(body) = child.child_by_field_name("body") {
                    declare_globals(types, body, source);
                }
            }
            _ => {}
        }
    }
}

fn extract_record(node: Node<'_>, f: &FileSyntax<'_>) -> Option<Record> {
    let name_node = node.child_by_field_name("name")?;
    let name = syntax::simple_type_name(name_node, f.source);
    let body = node.child_by_field_name("body")?;

    // `struct ns::X { ... }` defines X inside ns
    let mut scope = enclosing_scope(node, f.source);
    let mut spelled = scope_components(text(name_node, f.source));
    spelled.pop();
    scope.extend(spelled);

    let mut record = Record {
        bases: base_names(node, f.source),
        template_params: template_params(node, f.source),
        scope,
        name,
        file: f.file,
        system: f.system,
        destructor: None,
        methods: Vec::new(),
        fields: Vec::new(),
    };

    for member in named_children(body) {
        if matches!(
            member.kind(),
            "field_declaration" | "function_definition" | "declaration"
        ) {
            extract_member(&mut record, member, f);
        }
    }
    Some(record)
}

/// Names of the namespaces and classes around `node`, outermost first.
/// Anonymous namespaces are transparent.
fn enclosing_scope(node: Node<'_>, source: &str) -> Vec<String> {
    let mut scope = Vec::new();
    let mut current = node.parent();
    while let Some(n) = current {
        let name = match n.kind() {
            "namespace_definition" | "class_specifier" | "struct_specifier"
            | "union_specifier" => n.child_by_field_name("name"),
            _ => None,
        };
        if let Some(name) = name {
            let mut parts = scope_components(text(name, source));
            parts.reverse();
            scope.extend(parts);
        }
        current = n.parent();
    }
    scope.reverse();
    scope
}

/// `a::B<int>::C` as `["a", "B", "C"]`.
fn scope_components(spelled: &str) -> Vec<String> {
    let mut stripped = String::with_capacity(spelled.len());
    let mut depth = 0usize;
    for c in spelled.chars() {
        match c {
            '<' => depth += 1,
            '>' => depth = depth.saturating_sub(1),
            _ if depth == 0 => stripped.push(c),
            _ => {}
        }
    }
    stripped
        .split("::")
        .map(normalize)
        .filter(|part| !part.is_empty())
        .collect()
}

fn template_params(record: Node<'_>, source: &str) -> Vec<String> {
    let Some(list) = record
        .parent()
        .filter(|p| p.kind() == "template_declaration")
        .and_then(|p| p.child_by_field_name("parameters"))
    else {
        return Vec::new();
    };
    named_children(list)
        .into_iter()
        .map(|param| {
            let name = match param.kind() {
                "type_parameter_declaration" => named_children(param)
                    .into_iter()
                    .rfind(|c| c.kind() == "type_identifier"),
                "optional_type_parameter_declaration" => param.child_by_field_name("name"),
                "parameter_declaration" | "optional_parameter_declaration" => param
                    .child_by_field_name("declarator")
                    .and_then(syntax::declared_name),
                _ => None,
            };
            name.map(|n| text(n, source).to_string()).unwrap_or_default()
        })
        .collect()
}

fn base_names(record: Node<'_>, source: &str) -> Vec<BaseName> {
    let mut names = Vec::new();
    for child in syntax::children(record) {
        if child.kind() == "base_class_clause" {
            collect_bases(child, source, &mut names);
        }
    }
    names
}

fn collect_bases(clause: Node<'_>, source: &str, names: &mut Vec<BaseName>) {
    for child in named_children(clause) {
        match child.kind() {
            "base_class_specifier" => collect_bases(child, source, names),
            "type_identifier" | "qualified_type_identifier" | "qualified_identifier"
            | "template_type" => names.extend(base_name(child, source)),
            _ => {}
        }
    }
}

fn base_name(node: Node<'_>, source: &str) -> Option<BaseName> {
    let spelled = text(node, source).trim();
    let mut qualifier = scope_components(spelled);
    let name = qualifier.pop()?;
    Some(BaseName {
        global: spelled.starts_with("::"),
        qualifier,
        name,
        args: template_arguments(node, source),
    })
}

/// Arguments of the last component's template argument list.
fn template_arguments(node: Node<'_>, source: &str) -> Vec<String> {
    let mut current = node;
    loop {
        match current.kind() {
            "template_type" => {
                return current
                    .child_by_field_name("arguments")
                    .map(|list| {
                        named_children(list)
                            .into_iter()
                            .map(|arg| normalize(text(arg, source)))
                            .collect()
                    })
                    .unwrap_or_default()
            }
            "qualified_type_identifier" | "qualified_identifier" => {
                match current.child_by_field_name("name") {
                    Some(name) => current = name,
                    None => return Vec::new(),
                }
            }
            _ => return Vec::new(),
        }
    }
}

/// Replace whole identifiers of `spelling` that are bound.
fn substitute(spelling: &str, bindings: &Bindings) -> String {
    if bindings.is_empty() {
        return spelling.to_string();
    }
    let mut out = String::with_capacity(spelling.len());
    let mut word = String::new();
    for c in spelling.chars().map(Some).chain(iter::once(None)) {
        match c {
            Some(c) if c == '_' || c.is_alphanumeric() => word.push(c),
            _ => {
                match bindings.get(&word) {
                    Some(arg) => out.push_str(arg),
                    None => out.push_str(&word),
                }
                word.clear();
                out.extend(c);
            }
        }
    }
    normalize(&out)
}

fn is_static(member: Node<'_>, source: &str) -> bool {
    syntax::children(member)
        .into_iter()
        .any(|c| c.kind() == "storage_class_specifier" && text(c, source) == "static")
}

fn extract_member(record: &mut Record, member: Node<'_>, f: &FileSyntax<'_>) {
    let declarators = syntax::field_children(member, "declarator");
    let function = declarators
        .iter()
        .find_map(|d| syntax::function_declarator(*d));

    let Some(function) = function else {
        if member.kind() == "field_declaration" && !is_static(member, f.source) {
            record.fields.extend(declared_variables(member, f.source));
        }
        return;
    };
    let Some(name_node) = function.child_by_field_name("declarator") else {
        return;
    };
    if is_static(member, f.source) {
        return;
    }

    let at = |offset: usize| SourcePosition::new(f.file, offset);
    let specifiers = syntax::virt_specifiers(member, function, f.source);
    let has_override = specifiers.iter().any(|s| s == "override");
    let has_final = specifiers.iter().any(|s| s == "final");
    let begin = at(syntax::first_non_attribute(member).start_byte());
    let location = at(name_node.start_byte());
    let last_token = declarator_last_token(function).map(|n| at(n.start_byte()));
    let declared_virtual = syntax::has_virtual_keyword(member);
    let name = normalize(text(name_node, f.source));

    match name_node.kind() {
        "destructor_name" => {
            record.destructor = Some(DestructorDecl {
                name,
                declared_virtual,
                has_override,
                has_final,
                begin,
                location,
                last_token,
            });
        }
        "field_identifier" | "identifier" | "operator_name" => {
            // constructors cannot be virtual
            if name == record.name {
                return;
            }
            record.methods.push(MethodDecl {
                signature: signature(function, f.source),
                name,
                declared_virtual,
                has_override,
                has_final,
                begin,
                location,
                last_token,
            });
        }
        _ => {}
    }
}

/// Last token of the function type: parameters, cv and ref qualifiers,
/// exception specification and trailing return type, but not virt-specifiers.
fn declarator_last_token(function: Node<'_>) -> Option<Node<'_>> {
    syntax::children(function)
        .into_iter()
        .filter(|c| !matches!(c.kind(), "virtual_specifier" | "requires_clause"))
        .last()
        .map(syntax::last_leaf)
}

fn signature(function: Node<'_>, source: &str) -> Signature {
    let mut params: Vec<String> = function
        .child_by_field_name("parameters")
        .map(|list| {
            named_children(list)
                .into_iter()
                .filter_map(|p| parameter_type(p, source))
                .collect()
        })
        .unwrap_or_default();
    if params.len() == 1 && params[0] == "void" {
        params.clear();
    }

    let mut qualifiers: Vec<String> = syntax::children(function)
        .into_iter()
        .filter(|c| matches!(c.kind(), "type_qualifier" | "ref_qualifier"))
        .map(|c| text(c, source).trim().to_string())
        .collect();
    qualifiers.sort();

    Signature { params, qualifiers }
}

/// Parameter type with the parameter name and default value removed.
/// Top-level `const` on a by-value parameter does not affect the signature.
fn parameter_type(param: Node<'_>, source: &str) -> Option<String> {
    match param.kind() {
        "parameter_declaration" | "optional_parameter_declaration" => {}
        "variadic_parameter_declaration" => return Some("...".to_string()),
        _ if text(param, source).trim() == "..." => return Some("...".to_string()),
        _ => return None,
    }

    let ty = param.child_by_field_name("type")?;
    let mut spelled = String::new();
    let mut shape = String::new();
    if let Some(declarator) = param.child_by_field_name("declarator") {
        declarator_shape(declarator, source, &mut shape);
    }
    let by_value = shape.is_empty();

    for child in syntax::children(param) {
        if child.kind() == "type_qualifier" && !(by_value && text(child, source) == "const") {
            spelled.push_str(text(child, source));
            spelled.push(' ');
        }
    }
    spelled.push_str(text(ty, source));
    Some(normalize(&format!("{spelled}{shape}")))
}

fn declarator_shape(node: Node<'_>, source: &str, out: &mut String) {
    match node.kind() {
        "pointer_declarator" | "abstract_pointer_declarator" => out.push('*'),
        "reference_declarator" | "abstract_reference_declarator" => {
            out.push_str(if text(node, source).trim_start().starts_with("&&") {
                "&&"
            } else {
                "&"
            })
        }
        "array_declarator" | "abstract_array_declarator" => out.push_str("[]"),
        "function_declarator" | "abstract_function_declarator" => out.push_str("()"),
        _ => {}
    }
    for child in syntax::children(node) {
        if child.kind() == "type_qualifier" {
            out.push_str(text(child, source));
        }
    }
    if let Some(inner) = syntax::inner_declarator(node) {
        declarator_shape(inner, source, out);
    }
}
