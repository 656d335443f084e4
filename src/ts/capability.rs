//! [`QueryCapability`] over tree-sitter-cpp.

use crate::position::SourcePosition;
use crate::query::{
    Captures, CapturedNode, DestructorPredicate, LoopVariablePredicate, Match, MethodPredicate,
    NodeKind, Predicate, QueryCapability, Subscription, Target,
};
use crate::ts::loops::loop_variable;
use crate::ts::model::{FileSyntax, UnitModel};
use crate::ts::query::{queries, QueryEngine};
use crate::ts::unit::ParsedUnit;
use crate::ts::TreeSitterError;

/// Evaluates registered predicates against a [`ParsedUnit`].
#[derive(Debug, Default)]
pub struct TreeSitterFrontend {
    predicates: Vec<Predicate>,
}

fn satisfies(wanted: Option<bool>, actual: bool) -> bool {
    wanted.map_or(true, |w| w == actual)
}

impl TreeSitterFrontend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Every match of every registered predicate, grouped by subscription.
    pub fn evaluate(&self, unit: &ParsedUnit) -> Result<Vec<Match>, TreeSitterError> {
        let files: Vec<FileSyntax<'_>> = unit
            .files()
            .map(|(file, tree)| FileSyntax {
                file: file.id,
                system: file.kind.is_system(),
                source: file.text.as_str(),
                root: tree.root_node(),
            })
            .collect();
        let model = UnitModel::build(&files)?;

        let mut matches = Vec::new();
        for (index, predicate) in self.predicates.iter().enumerate() {
            let subscription = Subscription(index as u32);
            let nodes = match &predicate.target {
                Target::Destructor(p) => destructors(&model, p, predicate.exclude_system_headers),
                Target::Method(p) => methods(&model, p, predicate.exclude_system_headers),
                Target::LoopVariable(p) => {
                    loop_variables(&files, &model, p, predicate.exclude_system_headers)?
                }
            };
            matches.extend(nodes.into_iter().map(|node| Match {
                subscription,
                captures: Captures::single(predicate.bind.clone(), node),
            }));
        }
        Ok(matches)
    }
}

impl QueryCapability for TreeSitterFrontend {
    type Tree = ParsedUnit;

    fn register_predicate(&mut self, predicate: Predicate) -> Subscription {
        self.predicates.push(predicate);
        Subscription(self.predicates.len() as u32 - 1)
    }

    /// Query failures cannot happen for the built-in queries; a unit that
    /// somehow fails yields no matches and therefore no edits.
    fn run_queries(&self, tree: &ParsedUnit) -> Vec<Match> {
        self.evaluate(tree).unwrap_or_default()
    }
}

/// Explicit destructors of records. With `owner_is_base: Some(true)` one
/// node is produced per (derived, base) pair, so a base with several derived
/// classes is reported several times.
fn destructors(model: &UnitModel, p: &DestructorPredicate, skip_system: bool) -> Vec<CapturedNode> {
    let candidate = |index: usize| -> Option<CapturedNode> {
        let record = model.record(index);
        let dtor = record.destructor.as_ref()?;
        if skip_system && record.system {
            return None;
        }
        if !satisfies(p.is_virtual, model.destructor_is_virtual(index)) {
            return None;
        }
        Some(CapturedNode {
            kind: NodeKind::Destructor,
            name: dtor.name.clone(),
            owner: Some(record.name.clone()),
            begin: dtor.begin,
            location: dtor.location,
            type_end: dtor.last_token,
        })
    };

    let count = model.records().len();
    match p.owner_is_base {
        Some(true) => (0..count)
            .flat_map(|derived| model.ancestors(derived))
            .filter_map(candidate)
            .collect(),
        wanted => (0..count)
            .filter(|&i| satisfies(wanted, model.is_base(i)))
            .filter_map(candidate)
            .collect(),
    }
}

fn methods(model: &UnitModel, p: &MethodPredicate, skip_system: bool) -> Vec<CapturedNode> {
    let mut nodes = Vec::new();
    for (index, record) in model.records().iter().enumerate() {
        if skip_system && record.system {
            continue;
        }
        for method in &record.methods {
            if satisfies(p.overrides, model.overrides(index, method))
                && satisfies(p.has_override_marker, method.has_marker(p.final_is_override))
            {
                nodes.push(CapturedNode {
                    kind: NodeKind::Method,
                    name: method.name.clone(),
                    owner: Some(record.name.clone()),
                    begin: method.begin,
                    location: method.location,
                    type_end: method.last_token,
                });
            }
        }
        if !p.include_destructors {
            continue;
        }
        if let Some(dtor) = &record.destructor {
            if satisfies(p.overrides, model.destructor_overrides(index))
                && satisfies(p.has_override_marker, dtor.has_marker(p.final_is_override))
            {
                nodes.push(CapturedNode {
                    kind: NodeKind::Destructor,
                    name: dtor.name.clone(),
                    owner: Some(record.name.clone()),
                    begin: dtor.begin,
                    location: dtor.location,
                    type_end: dtor.last_token,
                });
            }
        }
    }
    nodes
}

fn loop_variables(
    files: &[FileSyntax<'_>],
    model: &UnitModel,
    p: &LoopVariablePredicate,
    skip_system: bool,
) -> Result<Vec<CapturedNode>, TreeSitterError> {
    let engine = QueryEngine::new(queries::RANGE_LOOPS)?;
    let mut nodes = Vec::new();
    for f in files {
        if skip_system && f.system {
            continue;
        }
        for node in engine.captures(f.root, f.source, "loop") {
            let Some(var) = loop_variable(node, f.source, model.types()) else {
                continue;
            };
            let wanted_class = p.type_class.map_or(true, |c| c == var.type_class);
            if satisfies(p.const_qualified, var.const_qualified)
                && satisfies(p.reference, var.reference)
                && wanted_class
            {
                let at = SourcePosition::new(f.file, var.name_offset);
                nodes.push(CapturedNode {
                    kind: NodeKind::Variable,
                    name: var.name,
                    owner: None,
                    begin: at,
                    location: at,
                    type_end: None,
                });
            }
        }
    }
    Ok(nodes)
}
