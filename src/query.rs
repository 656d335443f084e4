//! The AST query capability the engine consumes.
//!
//! A front-end parses source into some tree, accepts declarative
//! [`Predicate`]s, and reports every [`Match`] with named, data-only
//! captures. Nothing front-end specific crosses this boundary: captures
//! carry positions, names and a node kind, never parser node types.

use crate::position::{SourceManager, SourcePosition};
use std::collections::BTreeMap;

/// Handle returned when a predicate is registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Subscription(pub u32);

/// Kind of the captured node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Destructor,
    Method,
    Variable,
}

/// Coarse classification of a C++ type, as far as the rules need it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    /// class, struct or union (including class template specializations)
    Record,
    /// fundamental types and enumerations
    Scalar,
    Pointer,
    Array,
    /// could not be determined from the unit
    Unknown,
}

/// Structural condition over record definitions and their explicit destructor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DestructorPredicate {
    /// Some(true): the owning record is a base of another record in the unit
    pub owner_is_base: Option<bool>,
    /// Some(false): neither declared nor implicitly virtual
    pub is_virtual: Option<bool>,
}

/// Structural condition over member functions declared in a class body.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodPredicate {
    /// Some(true): overrides a virtual function of a base
    pub overrides: Option<bool>,
    /// Some(false): carries no explicit override intent
    pub has_override_marker: Option<bool>,
    /// Also yield destructors
    pub include_destructors: bool,
    /// `final` alone counts as override intent
    pub final_is_override: bool,
}

/// Structural condition over range-based `for` loop variables.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopVariablePredicate {
    pub const_qualified: Option<bool>,
    pub reference: Option<bool>,
    pub type_class: Option<TypeClass>,
}

/// What a predicate is evaluated over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Destructor(DestructorPredicate),
    Method(MethodPredicate),
    LoopVariable(LoopVariablePredicate),
}

/// A declarative structural predicate with the name its node is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub target: Target,
    pub bind: String,
    /// Drop matches whose node lives in a system header
    pub exclude_system_headers: bool,
}

impl Predicate {
    pub fn new(target: Target, bind: impl Into<String>) -> Self {
        Self {
            target,
            bind: bind.into(),
            exclude_system_headers: true,
        }
    }
}

/// A node bound by a successful predicate match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedNode {
    pub kind: NodeKind,
    /// Spelled name (`~Base`, `func`, `x`)
    pub name: String,
    /// Name of the record the node belongs to, if any
    pub owner: Option<String>,
    /// First token of the declaration, after leading attributes
    pub begin: SourcePosition,
    /// The name token
    pub location: SourcePosition,
    /// Start of the last token of the declarator's type (functions only)
    pub type_end: Option<SourcePosition>,
}

/// Named captures of one match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captures(BTreeMap<String, CapturedNode>);

impl Captures {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(name: impl Into<String>, node: CapturedNode) -> Self {
        let mut captures = Self::new();
        captures.insert(name, node);
        captures
    }

    pub fn insert(&mut self, name: impl Into<String>, node: CapturedNode) {
        self.0.insert(name.into(), node);
    }

    pub fn get(&self, name: &str) -> Option<&CapturedNode> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// One successful predicate match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub subscription: Subscription,
    pub captures: Captures,
}

/// Anything the engine can run queries over.
pub trait SourceTree {
    fn sources(&self) -> &SourceManager;
}

/// A front-end able to evaluate structural predicates over its trees.
pub trait QueryCapability {
    type Tree: SourceTree;

    fn register_predicate(&mut self, predicate: Predicate) -> Subscription;

    /// Evaluate every registered predicate over `tree`.
    fn run_queries(&self, tree: &Self::Tree) -> Vec<Match>;
}
