//! The Baa preprocessor: an Arabic-directive macro processor producing a
//! single processed translation unit from a source file or in-memory
//! string.
//!
//! Processing is line-oriented. Conditional directives always execute;
//! everything else is subject to the skipping state. Consumed directives
//! and skipped regions leave blank lines behind so that downstream line
//! numbers keep lining up with the original source.

mod conditionals;
mod directives;
mod expansion;
pub mod expr;
pub mod input;
pub mod macros;

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
};

pub use baa_foundation::errors::Category;
use baa_foundation::{
    errors::{
        determine_recovery_action, Diagnostic, DiagnosticLimits, DiagnosticSink, Diagnostics,
        RecoveryAction, Severity,
    },
    span::SourceLocation,
};
use tracing::debug;

use crate::{
    conditionals::ConditionalStack, directives::DirectiveOutcome, input::DecodeError,
    macros::MacroTable,
};

/// Stable diagnostic codes for the preprocessor family.
pub(crate) mod codes {
    pub const UNKNOWN_DIRECTIVE: u32 = 2001;
    pub const BAD_DIRECTIVE: u32 = 2002;
    pub const USER_ERROR: u32 = 2003;
    pub const USER_WARNING: u32 = 2004;
    pub const STRAY_CONDITIONAL: u32 = 2005;
    pub const MISSING_ENDIF: u32 = 2006;
    pub const BAD_PRAGMA_OPERATOR: u32 = 2007;
    pub const INCLUDE_NOT_FOUND: u32 = 2101;
    pub const CIRCULAR_INCLUDE: u32 = 2102;
    pub const FILE_DECODE: u32 = 2103;
    pub const MACRO_REDEFINITION: u32 = 2201;
    pub const MACRO_SELF_RECURSION: u32 = 2202;
    pub const MACRO_ARGUMENTS: u32 = 2203;
    pub const MACRO_SUBSTITUTION: u32 = 2204;
    pub const RESCAN_LIMIT: u32 = 2205;
    pub const BAD_EXPRESSION: u32 = 2301;
}

/// Tunable caps. The defaults are the ones the implementation was tuned
/// with; all of them are configuration, not contract.
#[derive(Debug, Clone)]
pub struct PreprocessorConfig {
    pub limits: DiagnosticLimits,
    /// Rescan passes per macro expansion before giving up.
    pub max_rescan_passes: u32,
    /// Lines scanned forward when recovering to the next directive.
    pub max_directive_sync_lines: u32,
    /// Characters scanned when recovering inside a broken expression.
    pub max_expression_sync_chars: usize,
    /// Depth the conditional stack is capped to during recovery.
    pub max_conditional_depth: usize,
}

impl Default for PreprocessorConfig {
    fn default() -> Self {
        Self {
            limits: DiagnosticLimits::default(),
            max_rescan_passes: 256,
            max_directive_sync_lines: 100,
            max_expression_sync_chars: 10_000,
            max_conditional_depth: 256,
        }
    }
}

/// What to preprocess: a file on disk, or an in-memory text with a
/// synthetic name for diagnostics.
#[derive(Debug, Clone)]
pub enum SourceInput {
    File(PathBuf),
    String { name: String, text: String },
}

/// Saved per-file position state, restored when an include returns.
#[derive(Debug, Clone)]
struct FileContext {
    display: String,
    physical: Option<PathBuf>,
    line: u32,
    column: u32,
    line_adjust: i64,
    file_override: Option<String>,
}

pub struct Preprocessor {
    pub(crate) config: PreprocessorConfig,
    pub(crate) include_dirs: Vec<PathBuf>,

    open_files: Vec<PathBuf>,
    pub(crate) macros: MacroTable,
    pub(crate) conditionals: ConditionalStack,
    pub(crate) expanding: Vec<String>,
    pub(crate) self_recursion_reported: HashSet<String>,
    pub(crate) rescan_cap_reported: bool,
    pub(crate) pragma_once: HashSet<PathBuf>,
    location_stack: Vec<FileContext>,

    file_display: String,
    pub(crate) file_physical: Option<PathBuf>,
    pub(crate) physical_line: u32,
    pub(crate) column: u32,
    pub(crate) line_adjust: i64,
    pub(crate) reported_file_override: Option<String>,

    pub diagnostics: Diagnostics,
    halted: bool,
}

impl Preprocessor {
    pub fn new(include_dirs: Vec<PathBuf>, config: PreprocessorConfig) -> Self {
        let limits = config.limits.clone();
        let mut macros = MacroTable::default();
        macros::install_predefined(&mut macros);
        Self {
            config,
            include_dirs,
            open_files: vec![],
            macros,
            conditionals: ConditionalStack::default(),
            expanding: vec![],
            self_recursion_reported: HashSet::new(),
            rescan_cap_reported: false,
            pragma_once: HashSet::new(),
            location_stack: vec![],
            file_display: String::new(),
            file_physical: None,
            physical_line: 1,
            column: 1,
            line_adjust: 0,
            reported_file_override: None,
            diagnostics: Diagnostics::new(limits),
            halted: false,
        }
    }

    /// The macro table, exposed for tests and tools.
    pub fn macros(&self) -> &MacroTable {
        &self.macros
    }

    /// Runs the whole translation unit, returning the processed text. The
    /// text may be partial when diagnostics were fatal; consult
    /// [`Preprocessor::diagnostics`].
    pub fn run(&mut self, input: SourceInput) -> String {
        let mut out = String::new();
        match input {
            SourceInput::File(path) => {
                self.file_display = path.display().to_string();
                let _ = self.process_file(&path, &mut out);
            }
            SourceInput::String { name, text } => {
                self.file_display = name;
                self.file_physical = None;
                self.process_text(&text, &mut out);
            }
        }
        if !self.conditionals.is_empty() && !self.halted {
            self.report(
                Severity::Error,
                codes::MISSING_ENDIF,
                Category::Conditional,
                "كتلة شرطية غير منتهية في نهاية المعالجة (مفقود #نهاية_إذا).",
            );
        }
        out
    }

    /// The file name diagnostics should carry, honouring `#سطر` overrides.
    pub(crate) fn reported_file(&self) -> &str {
        self.reported_file_override
            .as_deref()
            .unwrap_or(&self.file_display)
    }

    /// The line number diagnostics should carry, honouring `#سطر`.
    pub(crate) fn reported_line(&self) -> u32 {
        (self.physical_line as i64 + self.line_adjust).max(0) as u32
    }

    pub(crate) fn report(
        &mut self,
        severity: Severity,
        code: u32,
        category: Category,
        text: impl AsRef<str>,
    ) -> RecoveryAction {
        self.report_at_column(severity, code, category, 0, text)
    }

    pub(crate) fn report_at_column(
        &mut self,
        severity: Severity,
        code: u32,
        category: Category,
        column_offset: u32,
        text: impl AsRef<str>,
    ) -> RecoveryAction {
        let location = SourceLocation {
            line: self.reported_line(),
            column: self.column + column_offset,
            offset: 0,
        };
        let file = self.reported_file().to_owned();
        self.diagnostics
            .emit(Diagnostic::new(severity, code, category, &file, location, text));
        let action = determine_recovery_action(
            &self.diagnostics.limits,
            &self.diagnostics.recovery,
            severity,
            category,
        );
        if action != RecoveryAction::Continue {
            self.diagnostics.recovery.in_recovery = true;
        }
        if action == RecoveryAction::Halt || !self.diagnostics.should_continue() {
            self.halted = true;
        }
        action
    }

    /// Processes one file: canonicalise, pragma-once and circular-include
    /// checks, decode, then the line loop. Appends output to `out`. All
    /// failures are reported before returning.
    pub(crate) fn process_file(
        &mut self,
        path: &Path,
        out: &mut String,
    ) -> Result<(), RecoveryAction> {
        let absolute = match std::fs::canonicalize(path) {
            Ok(absolute) => absolute,
            Err(_) => {
                return Err(self.report(
                    Severity::Error,
                    codes::INCLUDE_NOT_FOUND,
                    Category::File,
                    format!(
                        "فشل في الحصول على المسار المطلق لملف التضمين '{}'.",
                        path.display()
                    ),
                ));
            }
        };

        if self.pragma_once.contains(&absolute) {
            debug!(?absolute, "skipped by pragma once");
            return Ok(());
        }
        if self.open_files.contains(&absolute) {
            return Err(self.report(
                Severity::Error,
                codes::CIRCULAR_INCLUDE,
                Category::File,
                format!(
                    "تم اكتشاف تضمين دائري: الملف '{}' مضمن بالفعل.",
                    absolute.display()
                ),
            ));
        }

        let text = match input::read_source_file(&absolute) {
            Ok(text) => text,
            Err(error) => {
                let category = match error {
                    DecodeError::Io(_) => Category::File,
                    _ => Category::Encoding,
                };
                return Err(self.report(
                    Severity::Error,
                    codes::FILE_DECODE,
                    category,
                    format!("{error} ('{}')", absolute.display()),
                ));
            }
        };

        self.open_files.push(absolute.clone());
        self.location_stack.push(FileContext {
            display: std::mem::take(&mut self.file_display),
            physical: self.file_physical.take(),
            line: self.physical_line,
            column: self.column,
            line_adjust: self.line_adjust,
            file_override: self.reported_file_override.take(),
        });
        self.file_display = absolute.display().to_string();
        self.file_physical = Some(absolute);
        self.physical_line = 1;
        self.column = 1;
        self.line_adjust = 0;

        self.process_text(&text, out);

        let saved = self
            .location_stack
            .pop()
            .expect("location stack must balance");
        self.file_display = saved.display;
        self.file_physical = saved.physical;
        self.physical_line = saved.line;
        self.column = saved.column;
        self.line_adjust = saved.line_adjust;
        self.reported_file_override = saved.file_override;
        self.open_files.pop();
        Ok(())
    }

    /// The line loop shared by file and string processing.
    fn process_text(&mut self, text: &str, out: &mut String) {
        if text.is_empty() {
            return;
        }
        let mut lines: Vec<&str> = text.split('\n').collect();
        if text.ends_with('\n') {
            lines.pop();
        }

        let mut index = 0;
        while index < lines.len() {
            if self.halted || !self.diagnostics.should_continue() {
                self.halted = true;
                break;
            }

            let raw = lines[index].strip_suffix('\r').unwrap_or(lines[index]);
            self.physical_line = index as u32 + 1;
            let trimmed = raw.trim_start();
            self.column = (raw.chars().count() - trimmed.chars().count() + 1) as u32;

            if trimmed.starts_with("//") {
                // Comment-only lines vanish; keep the line position.
                out.push('\n');
                index += 1;
                continue;
            }

            if let Some(after_hash) = trimmed.strip_prefix('#') {
                match self.handle_directive(after_hash, out) {
                    DirectiveOutcome::IncludedContent => (),
                    DirectiveOutcome::Plain(action) => {
                        out.push('\n');
                        match action {
                            RecoveryAction::Continue | RecoveryAction::SkipLine => (),
                            RecoveryAction::SkipDirective => {
                                let mut scanned = 0;
                                while index + 1 < lines.len()
                                    && scanned < self.config.max_directive_sync_lines
                                {
                                    let next = lines[index + 1]
                                        .strip_suffix('\r')
                                        .unwrap_or(lines[index + 1]);
                                    if next.trim_start().starts_with('#') {
                                        break;
                                    }
                                    out.push('\n');
                                    index += 1;
                                    scanned += 1;
                                }
                                self.diagnostics.recovery.note_line_ok();
                            }
                            RecoveryAction::SyncConditional => {
                                self.conditionals.recover(self.config.max_conditional_depth);
                            }
                            RecoveryAction::Halt => {
                                self.halted = true;
                            }
                        }
                    }
                }
            } else if self.conditionals.skipping() {
                out.push('\n');
            } else {
                let errors_before = self.diagnostics.error_count();
                let expanded = self.expand_line(raw);
                out.push_str(&expanded);
                out.push('\n');
                if self.diagnostics.error_count() == errors_before {
                    self.diagnostics.recovery.note_line_ok();
                }
            }

            index += 1;
        }
    }
}

/// Preprocesses a translation unit. On success the processed text is
/// returned; if any error was diagnosed the caller receives the summary
/// string and no text.
pub fn preprocess(input: SourceInput, include_dirs: Vec<PathBuf>) -> Result<String, String> {
    let mut preprocessor = Preprocessor::new(include_dirs, PreprocessorConfig::default());
    let output = preprocessor.run(input);
    if preprocessor.diagnostics.had_fatal() || preprocessor.diagnostics.error_count() > 0 {
        Err(preprocessor.diagnostics.summary())
    } else {
        Ok(output)
    }
}

/// Convenience wrapper for in-memory sources.
pub fn preprocess_string(name: &str, text: &str) -> Result<String, String> {
    preprocess(
        SourceInput::String {
            name: name.to_owned(),
            text: text.to_owned(),
        },
        vec![],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn run(text: &str) -> (String, Preprocessor) {
        let mut preprocessor = Preprocessor::new(vec![], PreprocessorConfig::default());
        let output = preprocessor.run(SourceInput::String {
            name: "<اختبار>".into(),
            text: text.into(),
        });
        (output, preprocessor)
    }

    fn run_ok(text: &str) -> String {
        let (output, preprocessor) = run(text);
        assert_eq!(
            preprocessor.diagnostics.error_count(),
            0,
            "unexpected diagnostics: {}",
            preprocessor.diagnostics.summary()
        );
        output
    }

    #[test]
    fn empty_input_empty_output() {
        let (output, preprocessor) = run("");
        assert_eq!(output, "");
        assert!(preprocessor.diagnostics.is_empty());
    }

    #[test]
    fn plain_text_is_unchanged_modulo_trailing_newline() {
        let output = run_ok("س ص\nج د");
        assert_eq!(output, "س ص\nج د\n");
    }

    #[test]
    fn object_macro_expands_in_place() {
        let output = run_ok("#تعريف أقصى 100\nأقصى");
        assert_eq!(output, "\n100\n");
    }

    #[test]
    fn macro_table_state_after_define() {
        let (_, preprocessor) = run("#تعريف أقصى 100\nأقصى");
        let entry = preprocessor.macros().get("أقصى").unwrap();
        assert_eq!(entry.body, "100");
        assert!(!entry.is_function_like);
    }

    #[test]
    fn define_then_undefine_round_trips() {
        let (_, preprocessor) = run("#تعريف س ص\n#الغاء_تعريف س\n");
        assert!(!preprocessor.macros().contains("س"));
        assert_eq!(preprocessor.diagnostics.len(), 0);
    }

    #[test]
    fn identical_redefinition_is_silent() {
        let (_, preprocessor) = run("#تعريف س 1 + 2\n#تعريف س 1  +  2\n");
        assert!(preprocessor.diagnostics.is_empty());
    }

    #[test]
    fn incompatible_redefinition_warns_and_replaces() {
        let (_, preprocessor) = run("#تعريف س 1\n#تعريف س 2\nس");
        assert_eq!(preprocessor.diagnostics.warning_count(), 1);
        assert_eq!(preprocessor.macros().get("س").unwrap().body, "2");
    }

    #[test]
    fn predefined_redefinition_is_an_error() {
        let (_, preprocessor) = run("#تعريف __إصدار_المعيار_باء__ 9\n");
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
    }

    #[test]
    fn function_macro_with_arguments() {
        let output = run_ok(indoc! {"
            #تعريف مربع(x) ((x) * (x))
            مربع(5)
        "});
        assert_eq!(output, "\n((5) * (5))\n");
    }

    #[test]
    fn function_macro_without_parens_stays_verbatim() {
        let output = run_ok("#تعريف مربع(x) ((x) * (x))\nمربع\n");
        assert_eq!(output, "\nمربع\n");
    }

    #[test]
    fn stringify_does_not_pre_expand_arguments() {
        let output = run_ok(indoc! {"
            #تعريف CONCAT(a,b) a##b
            #تعريف STR(x) #x
            STR(CONCAT(foo, 42))
        "});
        assert_eq!(output.lines().nth(2).unwrap(), "\"CONCAT(foo, 42)\"");
    }

    #[test]
    fn paste_joins_into_one_token() {
        let output = run_ok(indoc! {"
            #تعريف دمج(a,b) a##b
            دمج(عدد, ٥)
        "});
        assert_eq!(output.lines().nth(1).unwrap(), "عدد٥");
    }

    #[test]
    fn variadic_macro_binds_trailing_arguments() {
        let output = run_ok(indoc! {"
            #تعريف سجل(fmt, وسائط_إضافية) printf(fmt, __وسائط_متغيرة__)
            سجل(\"%d %d\", 1, 2)
        "});
        assert_eq!(output.lines().nth(1).unwrap(), "printf(\"%d %d\", 1, 2)");
    }

    #[test]
    fn nested_expansion_rescans() {
        let output = run_ok(indoc! {"
            #تعريف أ ب
            #تعريف ب 42
            أ
        "});
        assert_eq!(output.lines().nth(2).unwrap(), "42");
    }

    #[test]
    fn self_referential_macro_emits_verbatim_once_warned() {
        let (output, preprocessor) = run("#تعريف س س + 1\nس");
        assert_eq!(output.lines().nth(1).unwrap(), "س + 1");
        assert_eq!(preprocessor.diagnostics.warning_count(), 1);
        assert_eq!(preprocessor.diagnostics.error_count(), 0);
    }

    #[test]
    fn macros_do_not_expand_inside_string_literals() {
        let output = run_ok("#تعريف أقصى 100\n\"أقصى\" أقصى\n");
        assert_eq!(output.lines().nth(1).unwrap(), "\"أقصى\" 100");
    }

    #[test]
    fn conditional_takes_true_branch() {
        let output = run_ok(indoc! {"
            #إذا 1+1==2
            A
            #إلا
            B
            #نهاية_إذا
        "});
        assert!(output.contains('A'));
        assert!(!output.contains('B'));
    }

    #[test]
    fn conditional_preserves_line_count() {
        let output = run_ok(indoc! {"
            #إذا 0
            مخفي
            #نهاية_إذا
            ظاهر
        "});
        assert_eq!(output, "\n\n\nظاهر\n");
    }

    #[test]
    fn elif_chains_take_first_met_branch() {
        let output = run_ok(indoc! {"
            #إذا 0
            A
            #وإلا_إذا 1
            B
            #وإلا_إذا 1
            C
            #إلا
            D
            #نهاية_إذا
        "});
        assert!(output.contains('B'));
        assert!(!output.contains('A'));
        assert!(!output.contains('C'));
        assert!(!output.contains('D'));
    }

    #[test]
    fn ifdef_and_ifndef() {
        let output = run_ok(indoc! {"
            #تعريف موجود 1
            #إذا_عرف موجود
            A
            #نهاية_إذا
            #إذا_لم_يعرف موجود
            B
            #نهاية_إذا
        "});
        assert!(output.contains('A'));
        assert!(!output.contains('B'));
    }

    #[test]
    fn defined_operator_is_protected_from_expansion() {
        let output = run_ok(indoc! {"
            #تعريف موجود 1
            #إذا معرف(موجود) && موجود
            A
            #نهاية_إذا
        "});
        assert!(output.contains('A'));
    }

    #[test]
    fn missing_endif_is_reported() {
        let (_, preprocessor) = run("#إذا 1\nA\n");
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
        assert!(preprocessor.diagnostics.summary().contains("نهاية_إذا"));
    }

    #[test]
    fn stray_endif_is_reported() {
        let (_, preprocessor) = run("#نهاية_إذا\n");
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
    }

    #[test]
    fn conditional_stacks_stay_parallel_through_errors() {
        let (_, preprocessor) = run(indoc! {"
            #إذا 1
            #إلا
            #نهاية_إذا
            #نهاية_إذا
        "});
        assert!(preprocessor.conditionals.is_empty());
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
    }

    #[test]
    fn error_directive_is_fatal() {
        let (_, preprocessor) = run("#خطأ هذا خطأ مقصود\nبقية\n");
        assert!(preprocessor.diagnostics.had_fatal());
    }

    #[test]
    fn warning_directive_continues() {
        let (output, preprocessor) = run("#تحذير انتبه\nس\n");
        assert_eq!(preprocessor.diagnostics.warning_count(), 1);
        assert!(output.contains('س'));
    }

    #[test]
    fn unknown_directive_syncs_to_next_directive() {
        let (output, preprocessor) = run("#غير_معروف\nمهمل\n#تعريف س 1\nس\n");
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
        assert!(!output.contains("مهمل"));
        assert_eq!(output, "\n\n\n1\n");
    }

    #[test]
    fn rescan_cap_yields_a_single_macro_diagnostic() {
        let mut source = String::new();
        for i in 0..8 {
            source.push_str(&format!("#تعريف م{} م{}\n", i, i + 1));
        }
        source.push_str("#تعريف م8 42\n");
        source.push_str("م0\n");

        let mut preprocessor = Preprocessor::new(
            vec![],
            PreprocessorConfig {
                max_rescan_passes: 4,
                ..Default::default()
            },
        );
        preprocessor.run(SourceInput::String {
            name: "<اختبار>".into(),
            text: source,
        });
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
        let diagnostic = preprocessor.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.category, Category::Macro);
    }

    #[test]
    fn division_by_zero_in_condition() {
        let (_, preprocessor) = run("#إذا 1/0\n#نهاية_إذا\n");
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
        assert!(preprocessor.diagnostics.summary().contains("قسمة على صفر"));
    }

    #[test]
    fn overflow_in_condition_is_reported() {
        let (_, preprocessor) = run("#إذا 9223372036854775807 + 1\n#نهاية_إذا\n");
        assert_eq!(preprocessor.diagnostics.error_count(), 1);
        assert!(preprocessor.diagnostics.summary().contains("تجاوز"));
    }

    #[test]
    fn line_directive_renumbers_diagnostics() {
        let (_, preprocessor) = run("#سطر 100\n#غير_معروف\n");
        let diagnostic = preprocessor.diagnostics.iter().next().unwrap();
        assert_eq!(diagnostic.location.line, 101);
    }

    #[test]
    fn line_directive_overrides_file_name() {
        let (_, preprocessor) = run("#سطر 7 \"آخر.ب\"\n#غير_معروف\n");
        let diagnostic = preprocessor.diagnostics.iter().next().unwrap();
        assert!(diagnostic.message.starts_with("آخر.ب:8:"));
    }

    #[test]
    fn line_macro_reports_overridden_line() {
        let output = run_ok("#سطر 50\n__السطر__\n");
        assert_eq!(output.lines().nth(1).unwrap(), "\"51\"");
    }

    #[test]
    fn file_macro_quotes_the_name() {
        let output = run_ok("__الملف__\n");
        assert_eq!(output.lines().next().unwrap(), "\"<اختبار>\"");
    }

    #[test]
    fn standard_version_macro() {
        let output = run_ok("__إصدار_المعيار_باء__\n");
        assert_eq!(output.lines().next().unwrap(), "10150L");
    }

    #[test]
    fn pragma_operator_is_consumed() {
        let (output, preprocessor) = run("أمر_براغما(\"تلميح\") س\n");
        assert!(preprocessor.diagnostics.is_empty());
        assert_eq!(output.lines().next().unwrap(), " س");
    }

    #[test]
    fn comment_only_lines_become_blank() {
        let output = run_ok("// تعليق\nس\n");
        assert_eq!(output, "\nس\n");
    }

    #[test]
    fn directive_arguments_ignore_trailing_comments() {
        let output = run_ok("#تعريف س 5 // قيمة\nس\n");
        assert_eq!(output.lines().nth(1).unwrap(), "5");
    }
}
