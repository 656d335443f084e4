//! One linear pass over one translation unit.
//!
//! `RefactorEngine::run` queries the tree, routes every match to its handler
//! and returns the edited buffer. All mutable state (ledger, buffer, edit
//! list) is created inside `run`, so one engine can serve any number of
//! units, concurrently if the capability allows it.

use crate::diagnostics::DiagnosticSink;
use crate::dispatch::{Dispatcher, Unrouted};
use crate::edit::Edit;
use crate::ledger::Ledger;
use crate::query::{QueryCapability, SourceTree};
use crate::rewrite::RewriteBuffer;
use crate::rules::{FixContext, FixOutcome, RuleId, RuleSet};
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("translation unit has no primary file")]
    NoPrimaryFile,
}

/// Per-run counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunReport {
    pub matches: usize,
    pub applied: usize,
    pub out_of_scope: usize,
    pub duplicates: usize,
    pub unresolvable: usize,
    pub not_applicable: usize,
    pub unrouted: usize,
    /// Applied edits per rule
    pub by_rule: BTreeMap<RuleId, usize>,
}

impl RunReport {
    fn record(&mut self, rule: RuleId, outcome: FixOutcome) {
        match outcome {
            FixOutcome::Applied => {
                self.applied += 1;
                *self.by_rule.entry(rule).or_default() += 1;
            }
            FixOutcome::OutOfScope => self.out_of_scope += 1,
            FixOutcome::Duplicate => self.duplicates += 1,
            FixOutcome::Unresolvable => self.unresolvable += 1,
            FixOutcome::NotApplicable => self.not_applicable += 1,
        }
    }

    /// Matches that did not produce an edit.
    pub fn skipped(&self) -> usize {
        self.matches - self.applied
    }
}

/// Result of one run.
#[derive(Debug)]
pub struct RunOutcome {
    /// Edits in the order they were applied
    pub edits: Vec<Edit>,
    /// The primary file with every edit applied
    pub buffer: RewriteBuffer,
    pub report: RunReport,
}

impl RunOutcome {
    pub fn is_modified(&self) -> bool {
        self.buffer.is_modified()
    }

    pub fn render(&self) -> String {
        self.buffer.render()
    }
}

/// Rules bound to a query capability.
pub struct RefactorEngine<Q: QueryCapability> {
    capability: Q,
    dispatcher: Dispatcher,
}

impl<Q: QueryCapability> RefactorEngine<Q> {
    /// Register `rules` with `capability`. Subscriptions are fixed from here on.
    pub fn new(mut capability: Q, rules: RuleSet) -> Self {
        let mut dispatcher = Dispatcher::new();
        dispatcher.register(&mut capability, rules);
        Self {
            capability,
            dispatcher,
        }
    }

    pub fn capability(&self) -> &Q {
        &self.capability
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Run every rule over `tree` and apply the fixes to its primary file.
    pub fn run(
        &self,
        tree: &Q::Tree,
        sink: &mut dyn DiagnosticSink,
    ) -> Result<RunOutcome, EngineError> {
        let sources = tree.sources();
        let primary = sources.primary().ok_or(EngineError::NoPrimaryFile)?;

        let mut ledger = Ledger::new();
        let mut buffer = RewriteBuffer::new(primary.id, primary.text.as_str());
        let mut edits = Vec::new();
        let mut report = RunReport::default();

        let matches = self.capability.run_queries(tree);
        report.matches = matches.len();

        let mut ctx = FixContext::new(sources, &mut ledger, &mut buffer, sink, &mut edits);
        for m in &matches {
            match self.dispatcher.dispatch(m, &mut ctx) {
                Ok((rule, outcome)) => report.record(rule, outcome),
                Err(Unrouted::UnknownSubscription(_) | Unrouted::MissingCapture { .. }) => {
                    report.unrouted += 1
                }
            }
        }

        Ok(RunOutcome {
            edits,
            buffer,
            report,
        })
    }
}
