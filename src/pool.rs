//! Thread-local parser pooling.
//!
//! Each thread creates its C++ parser on first use and reuses it for every
//! later file, so a driver processing units on several threads never shares
//! a parser.

use crate::ts::{CppParser, TreeSitterError};
use std::cell::RefCell;

thread_local! {
    static CPP_PARSER: RefCell<Option<CppParser>> = const { RefCell::new(None) };
}

/// Execute function with pooled parser instance.
///
/// ```no_run
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// use cpp_refactor::pool::with_parser;
///
/// let has_errors = with_parser(|parser| {
///     parser.parse_with_source("struct A {};").map(|p| p.has_errors())
/// })??;
/// # Ok(())
/// # }
/// ```
pub fn with_parser<F, R>(f: F) -> Result<R, TreeSitterError>
where
    F: FnOnce(&mut CppParser) -> R,
{
    CPP_PARSER.with(|cell| {
        let mut slot = cell.borrow_mut();
        if slot.is_none() {
            *slot = Some(CppParser::new()?);
        }
        match slot.as_mut() {
            Some(parser) => Ok(f(parser)),
            None => Err(TreeSitterError::LanguageSet),
        }
    })
}
