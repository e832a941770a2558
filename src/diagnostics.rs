//! Structured diagnostics, replacing the source's varargs logging and
//! mutable global debug-flag bitset (see SPEC_FULL.md Design Notes §9).
//!
//! Diagnostics are advisory: unlike [`crate::Error`] they never abort the
//! operation that emitted them. The HRD verifier uses this to report, e.g.,
//! the documented `pic_num_X` mismatch (Open Question a) without failing
//! the whole conformance pass.

use alloc::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
}

/// A single structured log record.
///
/// `rule_id` names the exact Annex/clause a timing diagnostic pertains to
/// (e.g. `"A.3.1.a"`), mirroring the source's practice of logging the rule
/// number alongside the values that were compared. `operands` carries up to
/// four numeric values, matching the source's two-to-four-operand varargs
/// calls.
#[derive(Debug, Clone)]
pub struct DiagnosticEvent {
    pub level: DiagnosticLevel,
    pub component: &'static str,
    pub rule_id: Option<&'static str>,
    pub message: Cow<'static, str>,
    pub operands: [Option<i64>; 4],
}

impl DiagnosticEvent {
    pub fn new(level: DiagnosticLevel, component: &'static str, message: &'static str) -> Self {
        DiagnosticEvent {
            level,
            component,
            rule_id: None,
            message: Cow::Borrowed(message),
            operands: [None; 4],
        }
    }

    pub fn with_rule(mut self, rule_id: &'static str) -> Self {
        self.rule_id = Some(rule_id);
        self
    }

    pub fn with_operands(mut self, operands: [Option<i64>; 4]) -> Self {
        self.operands = operands;
        self
    }
}

/// The logging sink interface named by Design Note §9: "the logging sink is
/// an interface with one `emit(level, message)` method."
pub trait DiagnosticSink {
    fn emit(&mut self, event: DiagnosticEvent);
}

/// A sink that discards everything; the default for production callers who
/// do not want diagnostics.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn emit(&mut self, _event: DiagnosticEvent) {}
}

/// A sink that records every event, for tests that assert on diagnostics
/// (e.g. the Open Question (a) `pic_num_X` mismatch notice).
#[derive(Debug, Default)]
pub struct VecSink {
    pub events: alloc::vec::Vec<DiagnosticEvent>,
}

impl DiagnosticSink for VecSink {
    fn emit(&mut self, event: DiagnosticEvent) {
        self.events.push(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vec_sink_collects_events() {
        let mut sink = VecSink::default();
        sink.emit(
            DiagnosticEvent::new(DiagnosticLevel::Warning, "hrd", "pic_num_X mismatch")
                .with_rule("8.2.5.4.1")
                .with_operands([Some(3), Some(5), None, None]),
        );
        assert_eq!(sink.events.len(), 1);
        assert_eq!(sink.events[0].rule_id, Some("8.2.5.4.1"));
        assert_eq!(sink.events[0].operands[1], Some(5));
    }

    #[test]
    fn null_sink_discards() {
        let mut sink = NullSink;
        sink.emit(DiagnosticEvent::new(DiagnosticLevel::Info, "x", "y"));
    }
}
