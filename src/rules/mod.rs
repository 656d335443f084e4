//! Refactoring rules.
//!
//! A rule is a stateless structural predicate plus the fix-up handler that
//! runs on each of its matches. Handlers never edit directly; they go through
//! [`FixContext`], which enforces scope and the one-edit-per-position ledger.

mod missing_override;
mod range_loop_ref;
mod virtual_dtor;

pub use missing_override::MissingOverride;
pub use range_loop_ref::RangeLoopReference;
pub use virtual_dtor::VirtualDestructor;

use crate::diagnostics::{DiagnosticSink, Remark};
use crate::edit::Edit;
use crate::ledger::Ledger;
use crate::position::{SourceManager, SourcePosition};
use crate::query::{CapturedNode, Predicate};
use crate::rewrite::RewriteBuffer;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a rule, used in config files and remarks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RuleId {
    VirtualDestructor,
    MissingOverride,
    RangeLoopReference,
}

impl RuleId {
    pub const ALL: [RuleId; 3] = [
        RuleId::VirtualDestructor,
        RuleId::MissingOverride,
        RuleId::RangeLoopReference,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RuleId::VirtualDestructor => "virtual-destructor",
            RuleId::MissingOverride => "missing-override",
            RuleId::RangeLoopReference => "range-loop-reference",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            RuleId::VirtualDestructor => {
                "add 'virtual' to non-virtual destructors of classes used as bases"
            }
            RuleId::MissingOverride => "add 'override' to methods overriding a virtual function",
            RuleId::RangeLoopReference => {
                "bind const by-value range-for variables of record type by reference"
            }
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RuleId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RuleId::ALL
            .into_iter()
            .find(|id| id.as_str() == s)
            .ok_or_else(|| format!("unknown rule '{s}'"))
    }
}

/// Which handler a subscription routes to, fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatchKind {
    Destructor,
    Override,
    LoopVariable,
}

/// What happened to one match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FixOutcome {
    Applied,
    /// Position outside the primary unit
    OutOfScope,
    /// Position already edited in this run
    Duplicate,
    /// Insertion point could not be resolved
    Unresolvable,
    /// Structural guard rejected the node
    NotApplicable,
}

/// A refactoring rule.
pub trait Rule: Send + Sync {
    fn id(&self) -> RuleId;

    fn kind(&self) -> MatchKind;

    /// Name the predicate binds its node to.
    fn capture(&self) -> &'static str;

    fn predicate(&self) -> Predicate;

    fn fix(&self, node: &CapturedNode, ctx: &mut FixContext<'_>) -> FixOutcome;
}

/// Per-run state handed to fix-up handlers.
pub struct FixContext<'a> {
    sources: &'a SourceManager,
    ledger: &'a mut Ledger,
    buffer: &'a mut RewriteBuffer,
    sink: &'a mut dyn DiagnosticSink,
    edits: &'a mut Vec<Edit>,
}

impl<'a> FixContext<'a> {
    pub fn new(
        sources: &'a SourceManager,
        ledger: &'a mut Ledger,
        buffer: &'a mut RewriteBuffer,
        sink: &'a mut dyn DiagnosticSink,
        edits: &'a mut Vec<Edit>,
    ) -> Self {
        Self {
            sources,
            ledger,
            buffer,
            sink,
            edits,
        }
    }

    pub fn sources(&self) -> &SourceManager {
        self.sources
    }

    /// Check that `key` may be edited: it must be in the primary unit and not
    /// yet in the ledger.
    pub fn admit(&self, key: SourcePosition) -> Result<(), FixOutcome> {
        if !self.sources.is_in_primary(key) {
            return Err(FixOutcome::OutOfScope);
        }
        if self.ledger.contains(key) {
            return Err(FixOutcome::Duplicate);
        }
        Ok(())
    }

    /// Text of the file `pos` belongs to.
    pub fn text_of(&self, pos: SourcePosition) -> Option<&str> {
        self.sources.file(pos.file).map(|f| f.text.as_str())
    }

    /// Apply `edit` under ledger key `key` and report it.
    ///
    /// The edit lands in the buffer, the key in the ledger and the remark in
    /// the sink, or none of them does.
    pub fn apply(
        &mut self,
        rule: RuleId,
        key: SourcePosition,
        edit: Edit,
        entity: &str,
        message: String,
    ) -> FixOutcome {
        if let Err(outcome) = self.admit(key) {
            return outcome;
        }
        if !self.sources.is_in_primary(edit.position) {
            return FixOutcome::OutOfScope;
        }
        if self.buffer.apply(&edit).is_err() {
            return FixOutcome::Unresolvable;
        }
        self.ledger.record(key);

        let remark = Remark {
            rule,
            position: key,
            path: self.sources.path_of(key).map(|p| p.to_path_buf()),
            location: self.sources.line_column(key),
            entity: entity.to_string(),
            message,
        };
        self.edits.push(edit);
        self.sink.report(&remark);

        FixOutcome::Applied
    }
}

/// The rules an engine runs.
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// All rules with default options.
    pub fn all() -> Self {
        Self::empty()
            .with(VirtualDestructor)
            .with(MissingOverride::default())
            .with(RangeLoopReference)
    }

    pub fn with(mut self, rule: impl Rule + 'static) -> Self {
        self.rules.push(Box::new(rule));
        self
    }

    pub fn ids(&self) -> Vec<RuleId> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub(crate) fn into_rules(self) -> Vec<Box<dyn Rule>> {
        self.rules
    }
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::diagnostics::CollectingSink;
    use crate::position::{FileId, FileKind};
    use crate::query::NodeKind;

    /// A primary file plus everything a handler needs.
    pub struct Harness {
        pub sources: SourceManager,
        pub ledger: Ledger,
        pub buffer: RewriteBuffer,
        pub sink: CollectingSink,
        pub edits: Vec<Edit>,
    }

    impl Harness {
        pub fn new(text: &str) -> Self {
            let mut sources = SourceManager::new();
            let id = sources.add_file("test.cpp", FileKind::Primary, text);
            sources.add_file("base.h", FileKind::UserHeader, text);
            Self {
                sources,
                ledger: Ledger::new(),
                buffer: RewriteBuffer::new(id, text),
                sink: CollectingSink::new(),
                edits: Vec::new(),
            }
        }

        pub fn fix(&mut self, rule: &dyn Rule, node: &CapturedNode) -> FixOutcome {
            let mut ctx = FixContext::new(
                &self.sources,
                &mut self.ledger,
                &mut self.buffer,
                &mut self.sink,
                &mut self.edits,
            );
            rule.fix(node, &mut ctx)
        }

        pub fn render(&self) -> String {
            self.buffer.render()
        }
    }

    pub fn pos(offset: usize) -> SourcePosition {
        SourcePosition::new(FileId(0), offset)
    }

    pub fn header_pos(offset: usize) -> SourcePosition {
        SourcePosition::new(FileId(1), offset)
    }

    /// Node whose positions are found by searching `needle` in `text`.
    pub fn node(kind: NodeKind, name: &str, text: &str, needle: &str) -> CapturedNode {
        let begin = text.find(needle).expect("needle in text");
        CapturedNode {
            kind,
            name: name.to_string(),
            owner: None,
            begin: pos(begin),
            location: pos(begin),
            type_end: None,
        }
    }
}
