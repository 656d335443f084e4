use crate::pool::with_parser;
use crate::ts::errors::TreeSitterError;
use crate::ts::parser::ErrorNode;

/// Validate that C++ source code has no syntax errors.
///
/// Returns Ok(()) if the code parses without ERROR nodes.
pub fn validate_syntax(source: &str) -> Result<(), TreeSitterError> {
    let errors = error_nodes(source)?;
    match errors.len() {
        0 => Ok(()),
        1 => Err(TreeSitterError::SyntaxError {
            byte_start: errors[0].byte_start,
            byte_end: errors[0].byte_end,
        }),
        n => Err(TreeSitterError::MultipleSyntaxErrors { count: n }),
    }
}

/// Validate that a rewrite doesn't introduce syntax errors.
///
/// Insertions shift every later offset, so errors are compared by count:
/// a file that was already broken may stay broken, but not get worse.
pub fn validate_rewrite(original: &str, rewritten: &str) -> Result<(), TreeSitterError> {
    let before = error_nodes(original)?.len();
    let after = error_nodes(rewritten)?;

    match after.len().saturating_sub(before) {
        0 => Ok(()),
        1 => {
            let first = after.first().map(|e| (e.byte_start, e.byte_end)).unwrap_or_default();
            Err(TreeSitterError::SyntaxError {
                byte_start: first.0,
                byte_end: first.1,
            })
        }
        n => Err(TreeSitterError::MultipleSyntaxErrors { count: n }),
    }
}

fn error_nodes(source: &str) -> Result<Vec<ErrorNode>, TreeSitterError> {
    with_parser(|parser| parser.parse_with_source(source).map(|p| p.error_nodes()))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_valid_syntax() {
        let source = r#"
class Base {
public:
    virtual ~Base() {}
};
"#;
        assert!(validate_syntax(source).is_ok());
    }

    #[test]
    fn validate_invalid_syntax() {
        assert!(validate_syntax("class Base { void f( };").is_err());
    }

    #[test]
    fn rewrite_that_introduces_error() {
        let original = "struct D : B { void f() {} };";
        let rewritten = "struct D : B { void f() override override( {} };";
        assert!(validate_rewrite(original, rewritten).is_err());
    }

    #[test]
    fn rewrite_without_new_errors() {
        let original = "struct D : B { void f() {} };";
        let rewritten = "struct D : B { void f() override {} };";
        assert!(validate_rewrite(original, rewritten).is_ok());
    }

    #[test]
    fn rewrite_of_already_broken_code() {
        let original = "struct D : B { void f( {} };";
        let rewritten = "struct D : B { virtual void f( {} };";
        assert!(validate_rewrite(original, rewritten).is_ok());
    }
}
