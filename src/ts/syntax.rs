//! Small helpers over tree-sitter-cpp nodes.

use tree_sitter::Node;

pub fn text<'s>(node: Node<'_>, source: &'s str) -> &'s str {
    source.get(node.byte_range()).unwrap_or("")
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

/// All children stored under field `name` (a declaration may list several
/// declarators).
pub fn field_children<'t>(node: Node<'t>, name: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(name, &mut cursor).collect()
}

/// Collapse whitespace runs and drop a leading global `::`.
pub fn normalize(spelling: &str) -> String {
    let mut out = String::with_capacity(spelling.len());
    let mut pending_space = false;
    for c in spelling.chars() {
        if c.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            let prev_word = out.chars().last().is_some_and(is_word_char);
            if prev_word && is_word_char(c) {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(c);
    }
    out.trim_start_matches("::").to_string()
}

fn is_word_char(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

/// Last component of a possibly qualified, possibly templated type name:
/// `ns::Base<int>` is `Base`.
pub fn simple_type_name(node: Node<'_>, source: &str) -> String {
    match node.kind() {
        "template_type" | "template_function" | "template_method" | "qualified_type_identifier"
        | "qualified_identifier" => match node.child_by_field_name("name") {
            Some(name) => simple_type_name(name, source),
            None => text(node, source).to_string(),
        },
        _ => text(node, source).trim().to_string(),
    }
}

/// Last component of a spelled name: `std::vector` is `vector`.
pub fn last_component(name: &str) -> &str {
    name.rsplit("::").next().unwrap_or(name)
}

/// The declarator nested inside a pointer, reference, array or init
/// declarator. `reference_declarator` has no `declarator` field; its operand
/// is the last named child.
pub fn inner_declarator(node: Node<'_>) -> Option<Node<'_>> {
    match node.kind() {
        "reference_declarator" | "abstract_reference_declarator" => {
            named_children(node).into_iter().last()
        }
        _ => node.child_by_field_name("declarator"),
    }
}

/// Walk through wrapping declarators to the `function_declarator`, if any.
pub fn function_declarator(node: Node<'_>) -> Option<Node<'_>> {
    let mut current = node;
    loop {
        match current.kind() {
            "function_declarator" => return Some(current),
            "pointer_declarator" | "reference_declarator" | "init_declarator"
            | "attributed_declarator" | "parenthesized_declarator" => {
                current = inner_declarator(current)
                    .or_else(|| named_children(current).into_iter().last())?;
            }
            _ => return None,
        }
    }
}

/// The identifier a declarator ultimately declares.
pub fn declared_name<'t>(node: Node<'t>) -> Option<Node<'t>> {
    let mut current = node;
    loop {
        match current.kind() {
            "identifier" | "field_identifier" | "destructor_name" | "operator_name" => {
                return Some(current)
            }
            "qualified_identifier" => current = current.child_by_field_name("name")?,
            "pointer_declarator" | "reference_declarator" | "array_declarator"
            | "init_declarator" | "function_declarator" | "attributed_declarator" => {
                current = inner_declarator(current)?
            }
            "parenthesized_declarator" => current = named_children(current).into_iter().next()?,
            _ => return None,
        }
    }
}

/// Deepest last token below `node`.
pub fn last_leaf(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while current.child_count() > 0 {
        match current.child(current.child_count() - 1) {
            Some(child) => current = child,
            None => break,
        }
    }
    current
}

/// First child that is not an attribute, i.e. where the declaration's own
/// tokens start.
pub fn first_non_attribute(node: Node<'_>) -> Node<'_> {
    children(node)
        .into_iter()
        .find(|c| {
            !matches!(
                c.kind(),
                "attribute_declaration" | "attribute_specifier" | "ms_declspec_modifier"
            )
        })
        .unwrap_or(node)
}

/// Whether one of `node`'s direct children is the keyword `virtual`.
pub fn has_virtual_keyword(node: Node<'_>) -> bool {
    children(node)
        .into_iter()
        .any(|c| matches!(c.kind(), "virtual" | "virtual_function_specifier"))
}

/// `override` / `final` specifiers, wherever the grammar attached them.
pub fn virt_specifiers(decl: Node<'_>, function: Node<'_>, source: &str) -> Vec<String> {
    let mut found = Vec::new();
    for owner in [decl, function] {
        for child in named_children(owner) {
            if child.kind() == "virtual_specifier" {
                found.push(text(child, source).trim().to_string());
            }
        }
    }
    found
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_keeps_needed_spaces_only() {
        assert_eq!(normalize("unsigned   long"), "unsigned long");
        assert_eq!(normalize("std :: vector < int >"), "std::vector<int>");
        assert_eq!(normalize("::Foo"), "Foo");
        assert_eq!(normalize("const Foo &"), "const Foo&");
    }

    #[test]
    fn last_component_strips_scopes() {
        assert_eq!(last_component("std::vector"), "vector");
        assert_eq!(last_component("Foo"), "Foo");
    }
}
