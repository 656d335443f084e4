use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TreeSitterError {
    #[error("failed to set language for parser")]
    LanguageSet,

    #[error("failed to parse {}", path.display())]
    ParseFailed { path: PathBuf },

    #[error("invalid tree-sitter query: {message}")]
    InvalidQuery { message: String },

    #[error("syntax error detected at byte {byte_start}..{byte_end}")]
    SyntaxError { byte_start: usize, byte_end: usize },

    #[error("multiple syntax errors detected: {count} ERROR nodes")]
    MultipleSyntaxErrors { count: usize },

    #[error("I/O error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
