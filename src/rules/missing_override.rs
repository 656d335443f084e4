use super::{FixContext, FixOutcome, MatchKind, Rule, RuleId};
use crate::edit::Edit;
use crate::lexer;
use crate::position::SourcePosition;
use crate::query::{CapturedNode, MethodPredicate, NodeKind, Predicate, Target};

/// Overriding member functions must say so.
#[derive(Debug, Clone, Copy)]
pub struct MissingOverride {
    /// Treat `final` as explicit override intent
    pub final_is_override: bool,
}

impl Default for MissingOverride {
    fn default() -> Self {
        Self {
            final_is_override: true,
        }
    }
}

impl Rule for MissingOverride {
    fn id(&self) -> RuleId {
        RuleId::MissingOverride
    }

    fn kind(&self) -> MatchKind {
        MatchKind::Override
    }

    fn capture(&self) -> &'static str {
        "missingOverride"
    }

    fn predicate(&self) -> Predicate {
        Predicate::new(
            Target::Method(MethodPredicate {
                overrides: Some(true),
                has_override_marker: Some(false),
                include_destructors: false,
                final_is_override: self.final_is_override,
            }),
            self.capture(),
        )
    }

    fn fix(&self, method: &CapturedNode, ctx: &mut FixContext<'_>) -> FixOutcome {
        // Destructors override too, but never get the marker
        if method.kind != NodeKind::Method {
            return FixOutcome::NotApplicable;
        }
        if let Err(skip) = ctx.admit(method.begin) {
            return skip;
        }

        let Some(insertion) = self.insertion_point(method, ctx) else {
            return FixOutcome::Unresolvable;
        };

        ctx.apply(
            self.id(),
            method.begin,
            Edit::insert_after(insertion, " override"),
            &method.name,
            format!("added 'override' to method '{}'", method.name),
        )
    }
}

impl MissingOverride {
    /// Position just past the final token of the declarator, so qualifiers
    /// such as `const` or `noexcept` stay in front of the marker.
    fn insertion_point(
        &self,
        method: &CapturedNode,
        ctx: &FixContext<'_>,
    ) -> Option<SourcePosition> {
        let last_token = method.type_end?;
        let text = ctx.text_of(last_token)?;
        let end = lexer::end_of_token(text, last_token.offset)?;
        Some(SourcePosition::new(last_token.file, end))
    }
}
