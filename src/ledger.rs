use crate::position::SourcePosition;
use std::collections::HashSet;

/// Positions already edited during one run.
///
/// Append-only. A new ledger is created for every translation unit, so
/// concurrent runs never share one.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    edited: HashSet<SourcePosition>,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, pos: SourcePosition) -> bool {
        self.edited.contains(&pos)
    }

    /// Record `pos`. Returns false if it was already recorded.
    pub fn record(&mut self, pos: SourcePosition) -> bool {
        self.edited.insert(pos)
    }

    pub fn len(&self) -> usize {
        self.edited.len()
    }

    pub fn is_empty(&self) -> bool {
        self.edited.is_empty()
    }
}
