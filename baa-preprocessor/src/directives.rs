//! Recognition and handling of `#`-directives.

use std::path::PathBuf;

use baa_foundation::{
    arabic,
    errors::{RecoveryAction, Severity},
};
use tracing::debug;

use crate::{
    codes,
    macros::{is_predefined, DefineOutcome, Macro, VARIADIC_MARKER},
    Category, Preprocessor,
};

/// What the core line loop should do after a directive was handled.
pub(crate) enum DirectiveOutcome {
    /// Core emits the placeholder blank line and applies the action.
    Plain(RecoveryAction),
    /// `#تضمين` already appended the included content to the output.
    IncludedContent,
}

/// Strips a trailing `//` comment and surrounding whitespace from a
/// directive's argument text.
fn directive_argument(text: &str) -> &str {
    match text.find("//") {
        Some(comment) => text[..comment].trim(),
        None => text.trim(),
    }
}

/// Splits the leading identifier off a directive's tail.
fn split_identifier(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    let end = text
        .char_indices()
        .find(|&(index, c)| {
            if index == 0 {
                !arabic::is_ident_start(c)
            } else {
                !arabic::is_ident_continue(c)
            }
        })
        .map(|(index, _)| index)
        .unwrap_or(text.len());
    (&text[..end], &text[end..])
}

impl Preprocessor {
    /// Handles one directive line. `after_hash` is everything following the
    /// `#`, with the leading whitespace of the line already removed.
    pub(crate) fn handle_directive(
        &mut self,
        after_hash: &str,
        out: &mut String,
    ) -> DirectiveOutcome {
        let (name, tail) = split_identifier(after_hash);
        debug!(directive = %name, skipping = self.conditionals.skipping(), "directive");
        self.diagnostics.recovery.context = "directive";

        // Conditional directives always run, regardless of the skipping
        // state; everything else only runs in active regions.
        match name {
            "إذا" => return DirectiveOutcome::Plain(self.directive_if(tail)),
            "إذا_عرف" => return DirectiveOutcome::Plain(self.directive_ifdef(tail, false)),
            "إذا_لم_يعرف" => return DirectiveOutcome::Plain(self.directive_ifdef(tail, true)),
            "وإلا_إذا" => return DirectiveOutcome::Plain(self.directive_elif(tail)),
            "إلا" => return DirectiveOutcome::Plain(self.directive_else()),
            "نهاية_إذا" => return DirectiveOutcome::Plain(self.directive_endif()),
            _ => (),
        }

        if self.conditionals.skipping() {
            return DirectiveOutcome::Plain(RecoveryAction::Continue);
        }

        match name {
            "تضمين" => self.directive_include(tail, out),
            "تعريف" => DirectiveOutcome::Plain(self.directive_define(tail)),
            "الغاء_تعريف" => DirectiveOutcome::Plain(self.directive_undef(tail)),
            "خطأ" => DirectiveOutcome::Plain(self.report(
                Severity::Fatal,
                codes::USER_ERROR,
                Category::Directive,
                directive_argument(tail),
            )),
            "تحذير" => DirectiveOutcome::Plain(self.report(
                Severity::Warning,
                codes::USER_WARNING,
                Category::Directive,
                directive_argument(tail),
            )),
            "سطر" => DirectiveOutcome::Plain(self.directive_line(tail)),
            "براغما" => {
                self.handle_pragma(directive_argument(tail));
                DirectiveOutcome::Plain(RecoveryAction::Continue)
            }
            _ => DirectiveOutcome::Plain(self.report(
                Severity::Error,
                codes::UNKNOWN_DIRECTIVE,
                Category::Directive,
                "توجيه معالج مسبق غير معروف يبدأ بـ '#'.",
            )),
        }
    }

    /// Evaluates a conditional expression; `None` means evaluation failed
    /// and was reported.
    fn evaluate_condition(&mut self, text: &str) -> Option<bool> {
        self.diagnostics.recovery.context = "expression";
        let expanded = self.expand_conditional_text(text);
        let mut evaluator = crate::expr::ExprEvaluator::new(&expanded, &self.macros);
        match evaluator.evaluate() {
            Ok(value) => Some(value != 0),
            Err(error) => {
                let resume = crate::expr::sync_expression(
                    &expanded,
                    error.offset,
                    self.config.max_expression_sync_chars,
                );
                debug!(offset = error.offset, resume, "expression evaluation failed");
                self.report_at_column(
                    Severity::Error,
                    codes::BAD_EXPRESSION,
                    Category::Expression,
                    error.offset as u32,
                    error.message,
                );
                None
            }
        }
    }

    fn directive_if(&mut self, tail: &str) -> RecoveryAction {
        let expression = directive_argument(tail);
        if expression.is_empty() {
            let action = self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #إذا غير صالح: التعبير مفقود.",
            );
            self.conditionals.push(false);
            return action;
        }
        let met = self.evaluate_condition(expression).unwrap_or(false);
        self.conditionals.push(met);
        RecoveryAction::Continue
    }

    fn directive_ifdef(&mut self, tail: &str, negated: bool) -> RecoveryAction {
        let (name, _) = split_identifier(tail);
        if name.is_empty() {
            let action = self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                if negated {
                    "تنسيق #إذا_لم_يعرف غير صالح: اسم الماكرو مفقود."
                } else {
                    "تنسيق #إذا_عرف غير صالح: اسم الماكرو مفقود."
                },
            );
            self.conditionals.push(false);
            return action;
        }
        let defined = self.macros.contains(name);
        self.conditionals.push(defined != negated);
        RecoveryAction::Continue
    }

    fn directive_elif(&mut self, tail: &str) -> RecoveryAction {
        if self.conditionals.is_empty() {
            return self.report(
                Severity::Error,
                codes::STRAY_CONDITIONAL,
                Category::Conditional,
                "#وإلا_إذا بدون #إذا/#إذا_عرف/#إذا_لم_يعرف مطابق.",
            );
        }
        if self.conditionals.branch_already_taken() == Some(true) {
            self.conditionals.reject_branch();
            return RecoveryAction::Continue;
        }
        let expression = directive_argument(tail);
        if expression.is_empty() {
            let action = self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #وإلا_إذا غير صالح: التعبير مفقود.",
            );
            self.conditionals.reject_branch();
            return action;
        }
        if self.evaluate_condition(expression).unwrap_or(false) {
            self.conditionals.take_branch();
        } else {
            self.conditionals.reject_branch();
        }
        RecoveryAction::Continue
    }

    fn directive_else(&mut self) -> RecoveryAction {
        if self.conditionals.is_empty() {
            return self.report(
                Severity::Error,
                codes::STRAY_CONDITIONAL,
                Category::Conditional,
                "#إلا بدون #إذا/#إذا_عرف/#إذا_لم_يعرف مطابق.",
            );
        }
        if self.conditionals.branch_already_taken() == Some(true) {
            self.conditionals.reject_branch();
        } else {
            self.conditionals.take_branch();
        }
        RecoveryAction::Continue
    }

    fn directive_endif(&mut self) -> RecoveryAction {
        if !self.conditionals.pop() {
            return self.report(
                Severity::Error,
                codes::STRAY_CONDITIONAL,
                Category::Conditional,
                "#نهاية_إذا بدون #إذا/#إذا_عرف/#إذا_لم_يعرف مطابق.",
            );
        }
        RecoveryAction::Continue
    }

    fn directive_define(&mut self, tail: &str) -> RecoveryAction {
        let (name, after_name) = split_identifier(tail);
        if name.is_empty() {
            return self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #تعريف غير صالح: اسم الماكرو مفقود.",
            );
        }

        let mut is_function_like = false;
        let mut is_variadic = false;
        let mut params: Vec<String> = vec![];
        let mut body_text = after_name;

        // A parameter list only when `(` follows the name immediately.
        if after_name.starts_with('(') {
            is_function_like = true;
            let mut rest = after_name[1..].trim_start();
            loop {
                if let Some(stripped) = rest.strip_prefix(')') {
                    rest = stripped;
                    break;
                }
                if !params.is_empty() || is_variadic {
                    if is_variadic {
                        return self.report(
                            Severity::Error,
                            codes::BAD_DIRECTIVE,
                            Category::Directive,
                            format!(
                                "تنسيق #تعريف غير صالح: لا يمكن أن يتبع '{VARIADIC_MARKER}' معاملات أخرى."
                            ),
                        );
                    }
                    match rest.strip_prefix(',') {
                        Some(stripped) => rest = stripped.trim_start(),
                        None => {
                            return self.report(
                                Severity::Error,
                                codes::BAD_DIRECTIVE,
                                Category::Directive,
                                "تنسيق #تعريف غير صالح: متوقع ',' أو ')' بين معاملات الماكرو الوظيفي.",
                            )
                        }
                    }
                }
                let (param, after_param) = split_identifier(rest);
                if param.is_empty() {
                    return self.report(
                        Severity::Error,
                        codes::BAD_DIRECTIVE,
                        Category::Directive,
                        format!(
                            "تنسيق #تعريف غير صالح: متوقع اسم معامل أو ')' أو '{VARIADIC_MARKER}' بعد '('."
                        ),
                    );
                }
                if param == VARIADIC_MARKER {
                    is_variadic = true;
                } else {
                    params.push(param.to_owned());
                }
                rest = after_param.trim_start();
            }
            body_text = rest;
        }

        let body = directive_argument(body_text);
        let outcome = self.macros.define(Macro {
            name: name.to_owned(),
            body: body.to_owned(),
            is_function_like,
            is_variadic,
            params,
        });
        match outcome {
            DefineOutcome::Added | DefineOutcome::Identical => RecoveryAction::Continue,
            DefineOutcome::Replaced => self.report(
                Severity::Warning,
                codes::MACRO_REDEFINITION,
                Category::Macro,
                format!("إعادة تعريف الماكرو '{name}' بتعريف مختلف، سيتم استبدال التعريف السابق."),
            ),
            DefineOutcome::RejectedPredefined => self.report(
                Severity::Error,
                codes::MACRO_REDEFINITION,
                Category::Macro,
                format!("إعادة تعريف الماكرو المدمج '{name}' غير مسموحة."),
            ),
        }
    }

    fn directive_undef(&mut self, tail: &str) -> RecoveryAction {
        let (name, _) = split_identifier(tail);
        if name.is_empty() {
            return self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #الغاء_تعريف غير صالح: اسم الماكرو مفقود.",
            );
        }
        if is_predefined(name) {
            return self.report(
                Severity::Error,
                codes::MACRO_REDEFINITION,
                Category::Macro,
                format!("إلغاء تعريف الماكرو المدمج '{name}' غير مسموح."),
            );
        }
        self.macros.undefine(name);
        RecoveryAction::Continue
    }

    fn directive_include(&mut self, tail: &str, out: &mut String) -> DirectiveOutcome {
        let path_spec = directive_argument(tail);
        let (use_search_list, open, close) = match path_spec.chars().next() {
            Some('"') => (false, '"', '"'),
            Some('<') => (true, '<', '>'),
            _ => {
                return DirectiveOutcome::Plain(self.report(
                    Severity::Error,
                    codes::BAD_DIRECTIVE,
                    Category::Directive,
                    "تنسيق #تضمين غير صالح: يجب أن يتبع اسم الملف بـ \" أو <.",
                ))
            }
        };
        let inner = &path_spec[open.len_utf8()..];
        let Some(end) = inner.find(close) else {
            return DirectiveOutcome::Plain(self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #تضمين غير صالح: علامة الاقتباس أو القوس الختامي مفقود.",
            ));
        };
        let path = &inner[..end];
        if path.is_empty() {
            return DirectiveOutcome::Plain(self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #تضمين غير صالح: مسار الملف فارغ.",
            ));
        }

        let Some(resolved) = self.resolve_include(path, use_search_list) else {
            let message = if use_search_list {
                format!("تعذر العثور على ملف التضمين '<{path}>' في مسارات التضمين.")
            } else {
                format!("تعذر العثور على ملف التضمين '\"{path}\"'.")
            };
            return DirectiveOutcome::Plain(self.report(
                Severity::Error,
                codes::INCLUDE_NOT_FOUND,
                Category::File,
                message,
            ));
        };

        match self.process_file(&resolved, out) {
            Ok(()) => DirectiveOutcome::IncludedContent,
            // The failure was already reported at the failing site.
            Err(action) => DirectiveOutcome::Plain(action),
        }
    }

    /// Quoted includes search the directory of the current file first and
    /// fall back to the search list; angle includes search the list only.
    fn resolve_include(&self, path: &str, use_search_list_only: bool) -> Option<PathBuf> {
        if !use_search_list_only {
            if let Some(dir) = self
                .file_physical
                .as_ref()
                .and_then(|file| file.parent().map(|p| p.to_path_buf()))
            {
                let candidate = dir.join(path);
                if candidate.exists() {
                    return Some(candidate);
                }
            }
        }
        self.include_dirs
            .iter()
            .map(|dir| dir.join(path))
            .find(|candidate| candidate.exists())
    }

    fn directive_line(&mut self, tail: &str) -> RecoveryAction {
        // `#سطر` arguments are macro-expanded before parsing.
        let expanded = self.expand_line(directive_argument(tail));
        let expanded = expanded.trim();
        if expanded.is_empty() {
            return self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #سطر غير صالح: رقم السطر مفقود.",
            );
        }

        let digits_end = expanded
            .char_indices()
            .find(|&(_, c)| !arabic::is_baa_digit(c))
            .map(|(index, _)| index)
            .unwrap_or(expanded.len());
        if digits_end == 0 {
            return self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #سطر غير صالح: متوقع رقم سطر.",
            );
        }
        let mut line: i64 = 0;
        for c in expanded[..digits_end].chars() {
            line = line * 10 + arabic::baa_digit_value(c).unwrap_or(0) as i64;
        }

        let rest = expanded[digits_end..].trim();
        let file_override = if rest.is_empty() {
            None
        } else if rest.len() >= 2 && rest.starts_with('"') && rest.ends_with('"') {
            Some(rest[1..rest.len() - 1].to_owned())
        } else {
            return self.report(
                Severity::Error,
                codes::BAD_DIRECTIVE,
                Category::Directive,
                "تنسيق #سطر غير صالح: اسم الملف يجب أن يكون بين علامتي اقتباس.",
            );
        };

        // The directive's own line reports as N; the next physical line as
        // N+1.
        self.line_adjust = line - self.physical_line as i64;
        if let Some(file) = file_override {
            self.reported_file_override = Some(file);
        }
        RecoveryAction::Continue
    }

    /// Shared by `#براغما` and the `أمر_براغما` operator. Unknown pragmas
    /// are silently ignored.
    pub(crate) fn handle_pragma(&mut self, payload: &str) {
        let (name, _) = split_identifier(payload);
        if name == "مرة_واحدة" {
            if let Some(path) = self.file_physical.clone() {
                debug!(?path, "pragma once");
                self.pragma_once.insert(path);
            }
        } else {
            debug!(pragma = %name, "unknown pragma ignored");
        }
    }
}
