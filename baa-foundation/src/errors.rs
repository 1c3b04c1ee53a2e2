//! Types for diagnostic reporting.
//!
//! All user-facing text is Arabic. A [`Diagnostic`] carries its message
//! fully formatted, `file:line:column: label: text`, so that callers can
//! print it or join several into the legacy single-string summary without
//! further formatting.

mod collector;
mod recovery;
mod sink;

use std::fmt;

use crate::span::SourceLocation;

pub use collector::*;
pub use recovery::*;
pub use sink::*;

/// Diagnostic severity, loosest to strictest.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub enum Severity {
    /// A note attached to some other problem.
    Note,
    /// A warning; processing continues.
    Warning,
    /// An error; processing continues until a limit is hit.
    Error,
    /// A fatal error; processing stops (subject to `stop_on_fatal`).
    Fatal,
}

impl Severity {
    /// The Arabic label used in formatted messages.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Note => "ملاحظة",
            Severity::Warning => "تحذير",
            Severity::Error => "خطأ",
            Severity::Fatal => "خطأ فادح",
        }
    }
}

/// The part of the pipeline a diagnostic originated from. The short tag is
/// what recovery policy dispatches on.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Category {
    Encoding,
    File,
    Directive,
    Macro,
    Expression,
    Conditional,
    Lexical,
    Syntax,
    Number,
    Escape,
    String,
    Character,
    Comment,
    Memory,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Encoding => "encoding",
            Category::File => "file",
            Category::Directive => "directive",
            Category::Macro => "macro",
            Category::Expression => "expression",
            Category::Conditional => "conditional",
            Category::Lexical => "lexical",
            Category::Syntax => "syntax",
            Category::Number => "number",
            Category::Escape => "escape",
            Category::String => "string",
            Category::Character => "character",
            Category::Comment => "comment",
            Category::Memory => "memory",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single diagnostic describing a problem in the source.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Numeric code; stable across releases so tools can match on it.
    pub code: u32,
    pub category: Category,
    pub location: SourceLocation,
    /// The fully formatted message, `file:line:column: label: text`.
    pub message: String,
    /// An optional Arabic repair suggestion.
    pub suggestion: Option<String>,
}

impl Diagnostic {
    /// Creates a diagnostic, formatting the message prefix from the given
    /// file name and location.
    pub fn new(
        severity: Severity,
        code: u32,
        category: Category,
        file: &str,
        location: SourceLocation,
        text: impl AsRef<str>,
    ) -> Self {
        Self {
            severity,
            code,
            category,
            location,
            message: format!(
                "{}:{}:{}: {}: {}",
                file,
                location.line,
                location.column,
                severity.label(),
                text.as_ref()
            ),
            suggestion: None,
        }
    }

    pub fn error(
        code: u32,
        category: Category,
        file: &str,
        location: SourceLocation,
        text: impl AsRef<str>,
    ) -> Self {
        Self::new(Severity::Error, code, category, file, location, text)
    }

    pub fn warning(
        code: u32,
        category: Category,
        file: &str,
        location: SourceLocation,
        text: impl AsRef<str>,
    ) -> Self {
        Self::new(Severity::Warning, code, category, file, location, text)
    }

    pub fn note(
        code: u32,
        category: Category,
        file: &str,
        location: SourceLocation,
        text: impl AsRef<str>,
    ) -> Self {
        Self::new(Severity::Note, code, category, file, location, text)
    }

    pub fn fatal(
        code: u32,
        category: Category,
        file: &str,
        location: SourceLocation,
        text: impl AsRef<str>,
    ) -> Self {
        Self::new(Severity::Fatal, code, category, file, location, text)
    }

    /// Attaches a repair suggestion.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::SourceLocation;

    #[test]
    fn message_carries_location_prefix() {
        let diagnostic = Diagnostic::error(
            2001,
            Category::Directive,
            "مثال.ب",
            SourceLocation {
                line: 3,
                column: 7,
                offset: 44,
            },
            "توجيه معالج مسبق غير معروف يبدأ بـ '#'.",
        );
        assert!(diagnostic.message.starts_with("مثال.ب:3:7: خطأ: "));
        assert_eq!(diagnostic.category.as_str(), "directive");
    }

    #[test]
    fn severities_order_by_strictness() {
        assert!(Severity::Note < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
    }
}
