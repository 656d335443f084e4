use super::{FixContext, FixOutcome, MatchKind, Rule, RuleId};
use crate::edit::Edit;
use crate::query::{CapturedNode, DestructorPredicate, NodeKind, Predicate, Target};

/// Base classes must have virtual destructors.
///
/// Matches the explicit, non-virtual destructor of any class some other class
/// in the unit derives from. Each level of a hierarchy is matched on its own;
/// a base with several derived classes yields several matches for the same
/// destructor and the ledger keeps only the first.
#[derive(Debug, Default, Clone, Copy)]
pub struct VirtualDestructor;

impl Rule for VirtualDestructor {
    fn id(&self) -> RuleId {
        RuleId::VirtualDestructor
    }

    fn kind(&self) -> MatchKind {
        MatchKind::Destructor
    }

    fn capture(&self) -> &'static str {
        "nonVirtualDtor"
    }

    fn predicate(&self) -> Predicate {
        Predicate::new(
            Target::Destructor(DestructorPredicate {
                owner_is_base: Some(true),
                is_virtual: Some(false),
            }),
            self.capture(),
        )
    }

    fn fix(&self, dtor: &CapturedNode, ctx: &mut FixContext<'_>) -> FixOutcome {
        if dtor.kind != NodeKind::Destructor {
            return FixOutcome::NotApplicable;
        }
        if let Err(skip) = ctx.admit(dtor.begin) {
            return skip;
        }

        let owner = dtor
            .owner
            .clone()
            .unwrap_or_else(|| dtor.name.trim_start_matches('~').to_string());
        ctx.apply(
            self.id(),
            dtor.begin,
            Edit::insert_before(dtor.begin, "virtual "),
            &owner,
            format!("added 'virtual' to destructor of '{owner}'"),
        )
    }
}
