use tracing::warn;

use crate::errors::{Diagnostic, DiagnosticSink, RecoveryState, Severity};

/// Caps on how many diagnostics of each severity are recorded before the
/// rest are silently dropped.
#[derive(Clone, Debug)]
pub struct DiagnosticLimits {
    pub max_errors: usize,
    pub max_warnings: usize,
    /// `None` means unlimited.
    pub max_notes: Option<usize>,
    pub stop_on_fatal: bool,
    /// Consecutive errors tolerated before recovery escalates to a halt.
    pub cascading_limit: u32,
}

impl Default for DiagnosticLimits {
    fn default() -> Self {
        Self {
            max_errors: 100,
            max_warnings: 1000,
            max_notes: None,
            stop_on_fatal: true,
            cascading_limit: 10,
        }
    }
}

/// The collecting sink owned by the preprocessor: diagnostics, per-severity
/// counters, and the recovery bookkeeping that policy code consults.
#[derive(Debug, Default)]
pub struct Diagnostics {
    pub limits: DiagnosticLimits,
    pub recovery: RecoveryState,
    diagnostics: Vec<Diagnostic>,
    fatal_count: usize,
    error_count: usize,
    warning_count: usize,
    note_count: usize,
}

impl Diagnostics {
    pub fn new(limits: DiagnosticLimits) -> Self {
        Self {
            limits,
            ..Default::default()
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn fatal_count(&self) -> usize {
        self.fatal_count
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    pub fn note_count(&self) -> usize {
        self.note_count
    }

    pub fn had_fatal(&self) -> bool {
        self.fatal_count > 0
    }

    /// Whether the pipeline should keep processing input at all.
    pub fn should_continue(&self) -> bool {
        !(self.had_fatal() && self.limits.stop_on_fatal)
            && self.error_count < self.limits.max_errors
    }

    fn at_limit(&self, severity: Severity) -> bool {
        match severity {
            Severity::Fatal => false,
            Severity::Error => self.error_count >= self.limits.max_errors,
            Severity::Warning => self.warning_count >= self.limits.max_warnings,
            Severity::Note => self
                .limits
                .max_notes
                .is_some_and(|max| self.note_count >= max),
        }
    }

    /// Generates the legacy single-string report: a counting header followed
    /// by the first ten messages, then a `... و R أخرى` trailer if any were
    /// elided.
    pub fn summary(&self) -> String {
        let mut header = String::from("تم العثور على ");
        if self.fatal_count > 0 {
            header.push_str(&format!("{} خطأ فادح، ", self.fatal_count));
        }
        header.push_str(&format!(
            "{} خطأ، {} تحذير:",
            self.error_count, self.warning_count
        ));

        let mut out = header;
        for diagnostic in self.diagnostics.iter().take(10) {
            out.push('\n');
            out.push_str(&diagnostic.message);
        }
        if self.diagnostics.len() > 10 {
            out.push_str(&format!("\n... و {} أخرى", self.diagnostics.len() - 10));
        }
        out
    }
}

impl DiagnosticSink for Diagnostics {
    fn emit(&mut self, diagnostic: Diagnostic) {
        if self.at_limit(diagnostic.severity) {
            warn!(code = diagnostic.code, "diagnostic dropped: limit reached");
            return;
        }
        match diagnostic.severity {
            Severity::Fatal => self.fatal_count += 1,
            Severity::Error => {
                self.error_count += 1;
                self.recovery.note_error(diagnostic.category);
            }
            Severity::Warning => self.warning_count += 1,
            Severity::Note => self.note_count += 1,
        }
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errors::Category, span::SourceLocation};

    fn error_at_line(line: u32) -> Diagnostic {
        Diagnostic::error(
            2000,
            Category::Directive,
            "اختبار.ب",
            SourceLocation {
                line,
                column: 1,
                offset: 0,
            },
            "توجيه غير معروف.",
        )
    }

    #[test]
    fn counts_by_severity() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.emit(error_at_line(1));
        diagnostics.emit(error_at_line(2));
        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.warning_count(), 0);
        assert!(diagnostics.should_continue());
    }

    #[test]
    fn error_limit_drops_excess() {
        let mut diagnostics = Diagnostics::new(DiagnosticLimits {
            max_errors: 2,
            ..Default::default()
        });
        for line in 1..=5 {
            diagnostics.emit(error_at_line(line));
        }
        assert_eq!(diagnostics.error_count(), 2);
        assert_eq!(diagnostics.len(), 2);
        assert!(!diagnostics.should_continue());
    }

    #[test]
    fn fatal_stops_processing() {
        let mut diagnostics = Diagnostics::default();
        diagnostics.emit(Diagnostic::fatal(
            9001,
            Category::Memory,
            "اختبار.ب",
            SourceLocation::START,
            "فشل في تخصيص الذاكرة.",
        ));
        assert!(diagnostics.had_fatal());
        assert!(!diagnostics.should_continue());
    }

    #[test]
    fn summary_elides_past_ten() {
        let mut diagnostics = Diagnostics::default();
        for line in 1..=12 {
            diagnostics.emit(error_at_line(line));
        }
        let summary = diagnostics.summary();
        assert!(summary.starts_with("تم العثور على 12 خطأ، 0 تحذير:"));
        assert!(summary.ends_with("... و 2 أخرى"));
    }
}
