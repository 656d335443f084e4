use super::{FixContext, FixOutcome, MatchKind, Rule, RuleId};
use crate::edit::Edit;
use crate::query::{CapturedNode, LoopVariablePredicate, NodeKind, Predicate, Target, TypeClass};

/// `for (const T x : range)` copies every element when `T` is a class type.
///
/// Binds the variable by const reference instead. The `&` goes directly in
/// front of the variable name, which works for both spelled-out types and
/// `const auto`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RangeLoopReference;

impl Rule for RangeLoopReference {
    fn id(&self) -> RuleId {
        RuleId::RangeLoopReference
    }

    fn kind(&self) -> MatchKind {
        MatchKind::LoopVariable
    }

    fn capture(&self) -> &'static str {
        "loopVar"
    }

    fn predicate(&self) -> Predicate {
        Predicate::new(
            Target::LoopVariable(LoopVariablePredicate {
                const_qualified: Some(true),
                reference: Some(false),
                type_class: Some(TypeClass::Record),
            }),
            self.capture(),
        )
    }

    fn fix(&self, var: &CapturedNode, ctx: &mut FixContext<'_>) -> FixOutcome {
        if var.kind != NodeKind::Variable {
            return FixOutcome::NotApplicable;
        }
        if let Err(skip) = ctx.admit(var.location) {
            return skip;
        }

        ctx.apply(
            self.id(),
            var.location,
            Edit::insert_before(var.location, "& "),
            &var.name,
            format!(
                "added reference ('&') to loop variable '{}' to avoid an unnecessary copy",
                var.name
            ),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::test_support::{header_pos, node, Harness};

    const AUTO_LOOP: &str = "void f() {\n    for (const auto item : items) {}\n}\n";

    fn loop_var(text: &str) -> CapturedNode {
        node(NodeKind::Variable, "item", text, "item :")
    }

    #[test]
    fn binds_auto_variable_by_reference() {
        let mut h = Harness::new(AUTO_LOOP);

        assert_eq!(h.fix(&RangeLoopReference, &loop_var(AUTO_LOOP)), FixOutcome::Applied);
        assert_eq!(
            h.render(),
            "void f() {\n    for (const auto & item : items) {}\n}\n"
        );
        assert_eq!(
            h.sink.remarks[0].message,
            "added reference ('&') to loop variable 'item' to avoid an unnecessary copy"
        );
    }

    #[test]
    fn binds_spelled_type_by_reference() {
        let src = "for (const MyStruct item : items) {}";
        let mut h = Harness::new(src);

        h.fix(&RangeLoopReference, &loop_var(src));

        assert_eq!(h.render(), "for (const MyStruct & item : items) {}");
    }

    #[test]
    fn ledger_key_is_the_variable_name() {
        let mut h = Harness::new(AUTO_LOOP);
        let var = loop_var(AUTO_LOOP);
        h.fix(&RangeLoopReference, &var);

        assert!(h.ledger.contains(var.location));
        assert_eq!(h.fix(&RangeLoopReference, &var), FixOutcome::Duplicate);
        assert_eq!(h.edits.len(), 1);
    }

    #[test]
    fn header_loops_are_left_alone() {
        let mut h = Harness::new(AUTO_LOOP);
        let mut var = loop_var(AUTO_LOOP);
        var.location = header_pos(var.location.offset);

        assert_eq!(h.fix(&RangeLoopReference, &var), FixOutcome::OutOfScope);
        assert!(h.edits.is_empty());
    }
}
