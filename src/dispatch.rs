//! Routes matches to the handler of the rule that subscribed to them.

use crate::query::{Match, QueryCapability, Subscription};
use crate::rules::{FixContext, FixOutcome, MatchKind, Rule, RuleId, RuleSet};

struct Registration {
    subscription: Subscription,
    kind: MatchKind,
    rule: Box<dyn Rule>,
}

/// Subscription table built once, before any match is produced.
#[derive(Default)]
pub struct Dispatcher {
    registrations: Vec<Registration>,
}

/// Why a match reached no handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unrouted {
    /// Subscription was never registered here
    UnknownSubscription(Subscription),
    /// The match lacks the node the rule binds
    MissingCapture { rule: RuleId, capture: &'static str },
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every rule's predicate with `capability`.
    pub fn register<Q: QueryCapability>(&mut self, capability: &mut Q, rules: RuleSet) {
        for rule in rules.into_rules() {
            let subscription = capability.register_predicate(rule.predicate());
            self.registrations.push(Registration {
                subscription,
                kind: rule.kind(),
                rule,
            });
        }
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }

    pub fn kind_of(&self, subscription: Subscription) -> Option<MatchKind> {
        self.lookup(subscription).map(|r| r.kind)
    }

    pub fn rule_of(&self, subscription: Subscription) -> Option<RuleId> {
        self.lookup(subscription).map(|r| r.rule.id())
    }

    /// Hand `m` to its handler.
    pub fn dispatch(
        &self,
        m: &Match,
        ctx: &mut FixContext<'_>,
    ) -> Result<(RuleId, FixOutcome), Unrouted> {
        let registration = self
            .lookup(m.subscription)
            .ok_or(Unrouted::UnknownSubscription(m.subscription))?;
        let rule = registration.rule.as_ref();
        let node = m
            .captures
            .get(rule.capture())
            .ok_or(Unrouted::MissingCapture {
                rule: rule.id(),
                capture: rule.capture(),
            })?;

        Ok((rule.id(), rule.fix(node, ctx)))
    }

    fn lookup(&self, subscription: Subscription) -> Option<&Registration> {
        self.registrations
            .iter()
            .find(|r| r.subscription == subscription)
    }
}
