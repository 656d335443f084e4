//! cpp-refactor: rule-based C++ refactoring with insert-only fixes
//!
//! Rules match structural patterns in a parsed translation unit and fix them
//! by inserting text: `virtual` on destructors of base classes, `override`
//! on methods that override a virtual function, and `&` on const by-value
//! range-for variables of record type.
//!
//! # Architecture
//!
//! All fixes compile down to a single primitive: [`Edit`], an insertion at a
//! [`SourcePosition`]. Intelligence lives in the query capability (the
//! tree-sitter front-end in [`ts`]) and the per-rule handlers, not in the
//! application logic.
//!
//! # Guarantees
//!
//! - At most one edit per position per run ([`Ledger`])
//! - Only the primary file of a unit is edited, never its headers
//! - Running the engine on its own output produces no further edits
//! - Atomic file writes (tempfile + fsync + rename) that refuse to clobber a
//!   file changed since analysis
//!
//! # Example
//!
//! ```no_run
//! use cpp_refactor::{CollectingSink, RefactorEngine, RuleSet, TreeSitterFrontend, UnitBuilder};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = RefactorEngine::new(TreeSitterFrontend::new(), RuleSet::all());
//! let unit = UnitBuilder::default().load(Path::new("src/shapes.cpp"))?;
//!
//! let mut sink = CollectingSink::new();
//! let outcome = engine.run(&unit, &mut sink)?;
//! println!("{}", outcome.render());
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod dispatch;
pub mod edit;
pub mod engine;
pub mod ledger;
pub mod lexer;
pub mod pool;
pub mod position;
pub mod query;
pub mod rewrite;
pub mod rules;
pub mod ts;

// Re-exports
pub use config::{load_from_path, load_from_str, ConfigError, RefactorConfig};
pub use diagnostics::{CollectingSink, DiagnosticSink, JsonLinesSink, NullSink, Remark, StderrSink};
pub use dispatch::Dispatcher;
pub use edit::{CommitResult, Edit, EditError, EditVerification, InsertMode};
pub use engine::{EngineError, RefactorEngine, RunOutcome, RunReport};
pub use ledger::Ledger;
pub use position::{FileId, FileKind, SourceManager, SourcePosition};
pub use query::{CapturedNode, Captures, Match, Predicate, QueryCapability, SourceTree, Subscription};
pub use rewrite::RewriteBuffer;
pub use rules::{FixOutcome, MatchKind, Rule, RuleId, RuleSet};
pub use ts::{IncludeOptions, ParsedUnit, TreeSitterError, TreeSitterFrontend, UnitBuilder};
