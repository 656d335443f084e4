//! Range-based `for` loop variables.
//!
//! The declared type of a loop variable is read from the loop itself. When it
//! is `auto`, the type of the range expression is looked up through the
//! enclosing scopes and its element type taken.

use crate::query::TypeClass;
use crate::ts::syntax::{self, named_children, text};
use crate::ts::types::{declared_variables, TypeDesc, TypeTable};
use tree_sitter::Node;

/// Enclosing `auto` loops are followed at most this deep.
const MAX_LOOP_NESTING: usize = 8;

/// What a front-end needs to know about one loop variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopVariable {
    pub name: String,
    /// Start of the name token
    pub name_offset: usize,
    pub const_qualified: bool,
    pub reference: bool,
    pub type_class: TypeClass,
}

/// Describe the variable of `for_range_loop` node `node`.
///
/// Structured bindings (`for (const auto [k, v] : m)`) yield `None`.
pub fn loop_variable(node: Node<'_>, source: &str, table: &TypeTable) -> Option<LoopVariable> {
    let declarator = node.child_by_field_name("declarator")?;
    let name = syntax::declared_name(declarator)?;
    let ty = node.child_by_field_name("type")?;
    let declared = TypeDesc::of_declaration(ty, Some(declarator), source);

    let const_qualified = syntax::children(node)
        .into_iter()
        .take_while(|c| c.id() != declarator.id())
        .any(|c| c.kind() == "type_qualifier" && text(c, source) == "const");

    let resolved = resolve_auto(&declared, node, source, table, 0);
    let reference = resolved.is_reference() || is_alias_of_reference(&resolved, table);
    let type_class = table.classify(&resolved);

    Some(LoopVariable {
        name: text(name, source).to_string(),
        name_offset: name.start_byte(),
        const_qualified,
        reference,
        type_class,
    })
}

fn is_alias_of_reference(ty: &TypeDesc, table: &TypeTable) -> bool {
    match ty {
        TypeDesc::Named(name) => matches!(
            table.entry(name),
            Some(crate::ts::types::TypeEntry::Alias(TypeDesc::Reference(_)))
        ),
        _ => false,
    }
}

/// Replace a top-level `auto` with the element type of the loop's range.
fn resolve_auto(
    declared: &TypeDesc,
    for_loop: Node<'_>,
    source: &str,
    table: &TypeTable,
    depth: usize,
) -> TypeDesc {
    match declared {
        TypeDesc::Auto => element_type(for_loop, source, table, depth).unwrap_or(TypeDesc::Unknown),
        _ => declared.clone(),
    }
}

fn element_type(
    for_loop: Node<'_>,
    source: &str,
    table: &TypeTable,
    depth: usize,
) -> Option<TypeDesc> {
    if depth > MAX_LOOP_NESTING {
        return None;
    }
    let range = for_loop.child_by_field_name("right")?;
    let range_type = expression_type(range, source, table, depth)?;
    table.element_of(&range_type)
}

/// Type of a range expression, for the handful of shapes that can be
/// resolved without semantic analysis.
fn expression_type(
    expr: Node<'_>,
    source: &str,
    table: &TypeTable,
    depth: usize,
) -> Option<TypeDesc> {
    match expr.kind() {
        "identifier" => lookup(text(expr, source), expr, source, table, depth),
        "parenthesized_expression" => {
            let inner = named_children(expr).into_iter().next()?;
            expression_type(inner, source, table, depth)
        }
        "field_expression" => {
            let field = expr.child_by_field_name("field")?;
            let field = text(field, source);
            let object = expr.child_by_field_name("argument")?;
            let record = if object.kind() == "this" {
                enclosing_class(expr, source)?
            } else {
                match strip_indirection(expression_type(object, source, table, depth)?) {
                    TypeDesc::Named(name) => name,
                    TypeDesc::Template { name, .. } => name,
                    _ => return None,
                }
            };
            table.field_of(&record, field).cloned()
        }
        _ => None,
    }
}

fn strip_indirection(ty: TypeDesc) -> TypeDesc {
    match ty {
        TypeDesc::Pointer(inner) | TypeDesc::Reference(inner) => *inner,
        other => other,
    }
}

/// Type of variable `name` as visible at `at`: the closest declaration in an
/// enclosing block, loop, parameter list or class, then namespace scope.
fn lookup(
    name: &str,
    at: Node<'_>,
    source: &str,
    table: &TypeTable,
    depth: usize,
) -> Option<TypeDesc> {
    let mut child = at;
    while let Some(scope) = child.parent() {
        if let Some(found) = lookup_in(scope, child, name, source, table, depth) {
            return Some(found);
        }
        child = scope;
    }
    table.global(name).cloned()
}

fn lookup_in(
    scope: Node<'_>,
    child: Node<'_>,
    name: &str,
    source: &str,
    table: &TypeTable,
    depth: usize,
) -> Option<TypeDesc> {
    match scope.kind() {
        "compound_statement" => named_children(scope)
            .into_iter()
            .take_while(|n| n.start_byte() < child.start_byte())
            .filter(|n| n.kind() == "declaration")
            .flat_map(|n| declared_variables(n, source))
            .filter(|(n, _)| n == name)
            .last()
            .map(|(_, ty)| ty),
        "for_range_loop" => {
            // the range expression cannot see the loop's own variable
            let body = scope.child_by_field_name("body")?;
            if body.id() != child.id() {
                return None;
            }
            let declarator = scope.child_by_field_name("declarator")?;
            let declared = syntax::declared_name(declarator)?;
            if text(declared, source) != name {
                return None;
            }
            let ty = scope.child_by_field_name("type")?;
            let desc = TypeDesc::of_declaration(ty, Some(declarator), source);
            Some(resolve_auto(&desc, scope, source, table, depth + 1))
        }
        "for_statement" => {
            let init = scope.child_by_field_name("initializer")?;
            if init.kind() != "declaration" {
                return None;
            }
            declared_variables(init, source)
                .into_iter()
                .find(|(n, _)| n == name)
                .map(|(_, ty)| ty)
        }
        "function_definition" | "lambda_expression" => {
            let declarator = scope.child_by_field_name("declarator")?;
            if let Some(found) = parameter(declarator, name, source) {
                return Some(found);
            }
            // members of the class an out-of-line definition belongs to
            let function = syntax::function_declarator(declarator)?;
            let qualified = function.child_by_field_name("declarator")?;
            if qualified.kind() != "qualified_identifier" {
                return None;
            }
            let class = qualified.child_by_field_name("scope")?;
            table
                .field_of(&syntax::simple_type_name(class, source), name)
                .cloned()
        }
        "field_declaration_list" => {
            let class = scope.parent()?.child_by_field_name("name")?;
            table
                .field_of(&syntax::simple_type_name(class, source), name)
                .cloned()
        }
        _ => None,
    }
}

fn parameter(declarator: Node<'_>, name: &str, source: &str) -> Option<TypeDesc> {
    let function = match declarator.kind() {
        "abstract_function_declarator" => declarator,
        _ => syntax::function_declarator(declarator)?,
    };
    let params = function.child_by_field_name("parameters")?;
    named_children(params).into_iter().find_map(|p| {
        let ty = p.child_by_field_name("type")?;
        let d = p.child_by_field_name("declarator")?;
        let declared = syntax::declared_name(d)?;
        (text(declared, source) == name).then(|| TypeDesc::of_declaration(ty, Some(d), source))
    })
}

/// Name of the class whose member function contains `node`.
fn enclosing_class(node: Node<'_>, source: &str) -> Option<String> {
    let mut current = node;
    while let Some(parent) = current.parent() {
        match parent.kind() {
            "field_declaration_list" => {
                let name = parent.parent()?.child_by_field_name("name")?;
                return Some(syntax::simple_type_name(name, source));
            }
            "function_definition" => {
                let function = parent
                    .child_by_field_name("declarator")
                    .and_then(syntax::function_declarator);
                let qualified = function.and_then(|f| f.child_by_field_name("declarator"));
                if let Some(q) = qualified.filter(|q| q.kind() == "qualified_identifier") {
                    let scope = q.child_by_field_name("scope")?;
                    return Some(syntax::simple_type_name(scope, source));
                }
            }
            _ => {}
        }
        current = parent;
    }
    None
}
