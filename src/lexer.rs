//! Minimal C++ token scanner.
//!
//! Only answers one question: given the offset where a token starts, where
//! does it end? Used to place insertions right after a declarator's final
//! token.

/// Multi-character punctuators, longest first.
const PUNCTUATORS: &[&str] = &[
    "<=>", "->*", "<<=", ">>=", "...", "::", "->", ".*", "++", "--", "<<", ">>", "<=", ">=",
    "==", "!=", "&&", "||", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "##",
];

/// Offset just past the token starting at `offset`.
///
/// Returns `None` if `offset` is out of range, not on a character boundary,
/// or points at whitespace, a comment or an unterminated literal.
pub fn end_of_token(text: &str, offset: usize) -> Option<usize> {
    if offset >= text.len() || !text.is_char_boundary(offset) {
        return None;
    }
    let rest = &text[offset..];
    let first = rest.chars().next()?;

    if first.is_whitespace() || rest.starts_with("//") || rest.starts_with("/*") {
        return None;
    }

    let len = if is_ident_start(first) {
        match literal_prefix_len(rest) {
            Some(prefix) => quoted_len(&rest[prefix..]).map(|n| prefix + n)?,
            None => rest
                .char_indices()
                .find(|&(_, c)| !is_ident_continue(c))
                .map(|(i, _)| i)
                .unwrap_or(rest.len()),
        }
    } else if first.is_ascii_digit() || (first == '.' && second_is_digit(rest)) {
        number_len(rest)
    } else if first == '"' || first == '\'' {
        quoted_len(rest)?
    } else {
        PUNCTUATORS
            .iter()
            .find(|p| rest.starts_with(*p))
            .map(|p| p.len())
            .unwrap_or(first.len_utf8())
    };

    Some(offset + len)
}

fn is_ident_start(c: char) -> bool {
    c == '_' || c.is_alphabetic()
}

fn is_ident_continue(c: char) -> bool {
    c == '_' || c.is_alphanumeric()
}

fn second_is_digit(rest: &str) -> bool {
    rest.chars().nth(1).is_some_and(|c| c.is_ascii_digit())
}

/// Length of an encoding prefix (`u8`, `L`, `R`, ...) directly followed by a
/// quote, if any.
fn literal_prefix_len(rest: &str) -> Option<usize> {
    ["u8R", "uR", "UR", "LR", "u8", "R", "u", "U", "L"]
        .iter()
        .find(|p| {
            rest.starts_with(*p)
                && matches!(rest[p.len()..].chars().next(), Some('"') | Some('\''))
        })
        .map(|p| p.len())
}

fn number_len(rest: &str) -> usize {
    let bytes = rest.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let exponent_sign = (b == b'+' || b == b'-')
            && i > 0
            && matches!(bytes[i - 1], b'e' | b'E' | b'p' | b'P');
        if b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'\'' || exponent_sign {
            i += 1;
        } else {
            break;
        }
    }
    i
}

fn quoted_len(rest: &str) -> Option<usize> {
    let quote = rest.chars().next()?;
    let mut escaped = false;
    for (i, c) in rest.char_indices().skip(1) {
        if c == '\n' {
            return None;
        }
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == quote {
            return Some(i + c.len_utf8());
        }
    }
    None
}
