use crate::errors::{Category, DiagnosticLimits, Severity};

/// What the error-handling code should do after reporting a diagnostic.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RecoveryAction {
    /// Keep going from the current position.
    Continue,
    /// Skip the rest of the current line.
    SkipLine,
    /// Skip forward to the next line that starts a directive.
    SkipDirective,
    /// Re-synchronise the conditional stacks.
    SyncConditional,
    /// Stop processing the translation unit.
    Halt,
}

/// Mutable bookkeeping used to pick recovery actions and to detect error
/// cascades.
#[derive(Clone, Debug)]
pub struct RecoveryState {
    pub consecutive_errors: u32,
    pub errors_this_line: u32,
    pub directive_errors: u32,
    pub expression_errors: u32,
    pub in_recovery: bool,
    /// A short label naming what was being processed when the last error
    /// occurred; shows up in trace logs only.
    pub context: &'static str,
}

impl Default for RecoveryState {
    fn default() -> Self {
        Self {
            consecutive_errors: 0,
            errors_this_line: 0,
            directive_errors: 0,
            expression_errors: 0,
            in_recovery: false,
            context: "initialization",
        }
    }
}

impl RecoveryState {
    pub fn reset(&mut self, context: &'static str) {
        self.consecutive_errors = 0;
        self.errors_this_line = 0;
        self.in_recovery = false;
        self.context = context;
    }

    pub fn note_error(&mut self, category: Category) {
        self.consecutive_errors += 1;
        self.errors_this_line += 1;
        match category {
            Category::Directive => self.directive_errors += 1,
            Category::Expression => self.expression_errors += 1,
            _ => (),
        }
    }

    /// A successfully processed line breaks any cascade.
    pub fn note_line_ok(&mut self) {
        self.consecutive_errors = 0;
        self.errors_this_line = 0;
        self.in_recovery = false;
    }
}

/// Picks the recovery action for a freshly reported diagnostic.
///
/// Fatal severity and error cascades past the configured limit halt
/// processing outright; otherwise the action depends on the category.
pub fn determine_recovery_action(
    limits: &DiagnosticLimits,
    state: &RecoveryState,
    severity: Severity,
    category: Category,
) -> RecoveryAction {
    if severity == Severity::Fatal || category == Category::Memory {
        return RecoveryAction::Halt;
    }
    if state.consecutive_errors > limits.cascading_limit {
        return RecoveryAction::Halt;
    }
    match category {
        Category::Directive => RecoveryAction::SkipDirective,
        Category::Expression | Category::Macro => RecoveryAction::Continue,
        Category::File => RecoveryAction::SkipLine,
        Category::Conditional => RecoveryAction::SyncConditional,
        _ => RecoveryAction::Continue,
    }
}
