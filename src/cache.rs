//! Thread-local cache of compiled tree-sitter queries.
//!
//! Compiling a query against the C++ grammar is far more expensive than
//! running it, and the front-end runs the same handful of queries over every
//! file. `tree_sitter::Query` is not `Clone`, so entries are shared as `Rc`.
//! Cache is capped at 64 entries; it is cleared when full.

use crate::ts::parser::cpp_language;
use crate::ts::TreeSitterError;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;
use tree_sitter::Query;

const MAX_CACHE_ENTRIES: usize = 64;

thread_local! {
    static QUERY_CACHE: RefCell<HashMap<String, Rc<Query>>> =
        RefCell::new(HashMap::new());
}

/// Get a compiled query from cache, or compile and cache it.
pub fn get_or_compile_query(source: &str) -> Result<Rc<Query>, TreeSitterError> {
    QUERY_CACHE.with(|cache| {
        let mut cache = cache.borrow_mut();

        if let Some(q) = cache.get(source) {
            return Ok(Rc::clone(q));
        }

        if cache.len() >= MAX_CACHE_ENTRIES {
            cache.clear();
        }

        let compiled = Query::new(&cpp_language(), source).map_err(|e| {
            TreeSitterError::InvalidQuery {
                message: e.to_string(),
            }
        })?;
        let compiled = Rc::new(compiled);
        cache.insert(source.to_string(), Rc::clone(&compiled));
        Ok(compiled)
    })
}

/// Clear the query cache (mainly for testing).
pub fn clear_cache() {
    QUERY_CACHE.with(|cache| cache.borrow_mut().clear());
}

pub fn cache_size() -> usize {
    QUERY_CACHE.with(|cache| cache.borrow().len())
}
