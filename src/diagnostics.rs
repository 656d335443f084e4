//! Diagnostic reporting.
//!
//! Every applied edit produces exactly one [`Remark`]. Sinks are infallible
//! from the engine's point of view: a sink that cannot write drops the remark
//! and the edit stands.

use crate::position::{LineColumn, SourcePosition};
use crate::rules::RuleId;
use colored::Colorize;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// An informational record about one applied edit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Remark {
    pub rule: RuleId,
    pub position: SourcePosition,
    /// File path and line/column, when the position resolves
    pub path: Option<PathBuf>,
    pub location: Option<LineColumn>,
    /// Name of the edited entity (type, method or variable)
    pub entity: String,
    pub message: String,
}

/// Receiver of remarks.
pub trait DiagnosticSink {
    fn report(&mut self, remark: &Remark);
}

/// Keeps every remark in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub remarks: Vec<Remark>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DiagnosticSink for CollectingSink {
    fn report(&mut self, remark: &Remark) {
        self.remarks.push(remark.clone());
    }
}

/// Drops every remark.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn report(&mut self, _remark: &Remark) {}
}

/// Compiler-style colored lines on stderr: `file:line:col: remark: message`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StderrSink;

impl DiagnosticSink for StderrSink {
    fn report(&mut self, remark: &Remark) {
        let _ = writeln!(std::io::stderr(), "{}", format_remark(remark));
    }
}

/// One JSON object per line on stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLinesSink;

impl DiagnosticSink for JsonLinesSink {
    fn report(&mut self, remark: &Remark) {
        if let Ok(line) = serde_json::to_string(remark) {
            let _ = writeln!(std::io::stdout(), "{line}");
        }
    }
}

pub fn format_remark(remark: &Remark) -> String {
    let place = match (&remark.path, remark.location) {
        (Some(path), Some(lc)) => format!("{}:{}:{}", path.display(), lc.line, lc.column),
        (Some(path), None) => path.display().to_string(),
        _ => remark.position.to_string(),
    };
    format!(
        "{}: {} {} {}",
        place.bold(),
        "remark:".cyan().bold(),
        remark.message,
        format!("[{}]", remark.rule).dimmed()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::FileId;

    fn remark() -> Remark {
        Remark {
            rule: RuleId::VirtualDestructor,
            position: SourcePosition::new(FileId(0), 20),
            path: Some(PathBuf::from("test.cpp")),
            location: Some(LineColumn { line: 3, column: 5 }),
            entity: "Base".to_string(),
            message: "added 'virtual' to destructor of 'Base'".to_string(),
        }
    }

    #[test]
    fn collecting_sink_keeps_order() {
        let mut sink = CollectingSink::new();
        sink.report(&remark());
        let mut second = remark();
        second.entity = "Other".to_string();
        sink.report(&second);

        assert_eq!(sink.remarks.len(), 2);
        assert_eq!(sink.remarks[1].entity, "Other");
    }

    #[test]
    fn formatted_remark_carries_location_and_rule() {
        colored::control::set_override(false);
        let line = format_remark(&remark());
        assert_eq!(
            line,
            "test.cpp:3:5: remark: added 'virtual' to destructor of 'Base' [virtual-destructor]"
        );
    }

    #[test]
    fn remark_serializes_to_json() {
        let json = serde_json::to_value(remark()).unwrap();
        assert_eq!(json["rule"], "virtual-destructor");
        assert_eq!(json["entity"], "Base");
        assert_eq!(json["location"]["line"], 3);
    }
}
