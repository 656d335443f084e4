//! Tree-sitter C++ front-end.
//!
//! Implements the query capability over the C++ grammar shipped with
//! ast-grep: loads a translation unit, builds a class hierarchy and type
//! model from the syntax trees, and evaluates the engine's predicates
//! against it.

pub mod capability;
pub mod errors;
pub mod loops;
pub mod model;
pub mod parser;
pub mod query;
pub mod syntax;
pub mod types;
pub mod unit;
pub mod validator;

pub use capability::TreeSitterFrontend;
pub use errors::TreeSitterError;
pub use parser::{CppParser, ParsedSource};
pub use query::QueryEngine;
pub use unit::{IncludeOptions, ParsedUnit, UnitBuilder};
pub use validator::{validate_rewrite, validate_syntax};
