//! Macro expansion: invocation scanning, argument collection, body
//! substitution with stringify/paste, and rescanning of the produced text.

use baa_foundation::{arabic, errors::Severity};

use crate::{
    codes,
    expr::DEFINED_OPERATOR,
    macros::{Macro, VA_ARGS_NAME},
    Category, Preprocessor,
};

/// The pragma operator spellings recognised inside ordinary text.
const PRAGMA_OPERATOR: &str = "أمر_براغما";
const PRAGMA_OPERATOR_SHORT: &str = "براغما";

impl Preprocessor {
    /// Expands macros in one code line (normal mode).
    pub(crate) fn expand_line(&mut self, line: &str) -> String {
        self.diagnostics.recovery.context = "expansion";
        self.expand_text(line, 0, false)
    }

    /// Expands macros in a conditional expression: `معرف X` and `معرف(X)`
    /// operands are protected from expansion.
    pub(crate) fn expand_conditional_text(&mut self, text: &str) -> String {
        self.expand_text(text, 0, true)
    }

    fn expand_text(&mut self, text: &str, depth: u32, protect_defined: bool) -> String {
        if depth > self.config.max_rescan_passes {
            if !self.rescan_cap_reported {
                self.rescan_cap_reported = true;
                self.report(
                    Severity::Error,
                    codes::RESCAN_LIMIT,
                    Category::Macro,
                    format!(
                        "تم تجاوز الحد الأقصى لمرات إعادة فحص الماكرو ({}).",
                        self.config.max_rescan_passes
                    ),
                );
            }
            return text.to_owned();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut out = String::with_capacity(text.len());
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];

            if arabic::is_ident_start(c) {
                let start = i;
                while i < chars.len() && arabic::is_ident_continue(chars[i]) {
                    i += 1;
                }
                let ident: String = chars[start..i].iter().collect();
                i = self.expand_identifier(&chars, i, ident, depth, protect_defined, &mut out);
                continue;
            }

            match c {
                // Macro names inside string and char literals are not
                // invocations.
                '"' | '\'' => {
                    i = copy_literal(&chars, i, &mut out);
                }
                '/' if chars.get(i + 1) == Some(&'/') => {
                    // The rest of the line is a comment; copy it untouched.
                    out.extend(&chars[i..]);
                    i = chars.len();
                }
                _ => {
                    out.push(c);
                    i += 1;
                }
            }
        }

        out
    }

    /// Handles one scanned identifier; returns the index expansion resumed
    /// from.
    fn expand_identifier(
        &mut self,
        chars: &[char],
        mut i: usize,
        ident: String,
        depth: u32,
        protect_defined: bool,
        out: &mut String,
    ) -> usize {
        if protect_defined && ident == DEFINED_OPERATOR {
            out.push_str(&ident);
            return copy_defined_operand(chars, i, out);
        }

        if !protect_defined && (ident == PRAGMA_OPERATOR || ident == PRAGMA_OPERATOR_SHORT) {
            if let Some(consumed) = self.try_pragma_operator(chars, i) {
                return consumed;
            }
            if ident == PRAGMA_OPERATOR {
                self.report(
                    Severity::Error,
                    codes::BAD_PRAGMA_OPERATOR,
                    Category::Directive,
                    "تنسيق أمر_براغما غير صالح: متوقع سلسلة نصية بين قوسين.",
                );
                return i;
            }
            // `براغما` without the operator shape is an ordinary identifier.
        }

        // The two dynamic predefined macros.
        if ident == "__الملف__" {
            let mut escaped = String::new();
            for c in self.reported_file().chars() {
                if c == '\\' {
                    escaped.push('\\');
                }
                escaped.push(c);
            }
            out.push('"');
            out.push_str(&escaped);
            out.push('"');
            return i;
        }
        if ident == "__السطر__" {
            out.push_str(&format!("\"{}\"", self.reported_line()));
            return i;
        }

        let Some(found) = self.macros.get(&ident) else {
            out.push_str(&ident);
            return i;
        };
        let found = found.clone();

        if self.expanding.contains(&ident) {
            // Self-reference: reported once, then the name passes through
            // verbatim.
            if self.self_recursion_reported.insert(ident.clone()) {
                self.report(
                    Severity::Warning,
                    codes::MACRO_SELF_RECURSION,
                    Category::Macro,
                    format!("تم اكتشاف استدعاء ذاتي للماكرو '{ident}'، سيتم إصدار الاسم كما هو."),
                );
            }
            out.push_str(&ident);
            return i;
        }

        let substituted = if found.is_function_like {
            let mut j = i;
            while j < chars.len() && chars[j].is_whitespace() {
                j += 1;
            }
            if chars.get(j) != Some(&'(') {
                // Function-like macro without an argument list stays as is.
                out.push_str(&ident);
                return i;
            }
            match parse_macro_arguments(chars, j + 1, &found) {
                Ok((arguments, end)) => {
                    i = end;
                    match substitute_macro_body(&found, &arguments) {
                        Ok(text) => text,
                        Err(message) => {
                            self.report(
                                Severity::Error,
                                codes::MACRO_SUBSTITUTION,
                                Category::Macro,
                                message,
                            );
                            out.push_str(&ident);
                            return i;
                        }
                    }
                }
                Err(message) => {
                    self.report(
                        Severity::Error,
                        codes::MACRO_ARGUMENTS,
                        Category::Macro,
                        message,
                    );
                    out.push_str(&ident);
                    return i;
                }
            }
        } else {
            found.body.clone()
        };

        self.expanding.push(ident);
        let rescanned = self.expand_text(&substituted, depth + 1, protect_defined);
        self.expanding.pop();
        out.push_str(&rescanned);
        i
    }

    /// `أمر_براغما("…")` (or `براغما("…")`) in running text acts as an
    /// inline `#براغما` whose payload is the unescaped literal. Returns the
    /// index past the closing parenthesis when the shape matches.
    fn try_pragma_operator(&mut self, chars: &[char], start: usize) -> Option<usize> {
        let mut i = start;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if chars.get(i) != Some(&'(') {
            return None;
        }
        i += 1;
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if chars.get(i) != Some(&'"') {
            return None;
        }
        i += 1;
        let mut payload = String::new();
        loop {
            match chars.get(i) {
                None => return None,
                Some('"') => {
                    i += 1;
                    break;
                }
                Some('\\') => {
                    // Only the quote and backslash escapes matter here.
                    match chars.get(i + 1) {
                        Some('"') => {
                            payload.push('"');
                            i += 2;
                        }
                        Some('\\') => {
                            payload.push('\\');
                            i += 2;
                        }
                        _ => {
                            payload.push('\\');
                            i += 1;
                        }
                    }
                }
                Some(&c) => {
                    payload.push(c);
                    i += 1;
                }
            }
        }
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        if chars.get(i) != Some(&')') {
            return None;
        }
        self.handle_pragma(&payload);
        Some(i + 1)
    }
}

/// Copies a string or char literal verbatim, backslash-aware. `i` points at
/// the opening quote.
fn copy_literal(chars: &[char], mut i: usize, out: &mut String) -> usize {
    let quote = chars[i];
    out.push(quote);
    i += 1;
    while i < chars.len() {
        let c = chars[i];
        out.push(c);
        i += 1;
        if c == '\\' {
            if let Some(&escaped) = chars.get(i) {
                out.push(escaped);
                i += 1;
            }
        } else if c == quote {
            break;
        }
    }
    i
}

/// Copies the operand of `معرف` without expanding it: either a bare name or
/// a parenthesised one.
fn copy_defined_operand(chars: &[char], mut i: usize, out: &mut String) -> usize {
    while i < chars.len() && chars[i].is_whitespace() {
        out.push(chars[i]);
        i += 1;
    }
    if chars.get(i) == Some(&'(') {
        while i < chars.len() {
            let c = chars[i];
            out.push(c);
            i += 1;
            if c == ')' {
                break;
            }
        }
    } else if i < chars.len() && arabic::is_ident_start(chars[i]) {
        while i < chars.len() && arabic::is_ident_continue(chars[i]) {
            out.push(chars[i]);
            i += 1;
        }
    }
    i
}

/// Parses a function-like macro's argument list. `start` indexes the first
/// character after `(`. Returns the collected arguments and the index just
/// past the closing `)`.
///
/// Nested parentheses and string/char literals are respected; top-level
/// commas separate arguments. For variadic macros the trailing argument
/// consumes everything up to the matching `)`, embedded commas included.
pub(crate) fn parse_macro_arguments(
    chars: &[char],
    start: usize,
    definition: &Macro,
) -> Result<(Vec<String>, usize), String> {
    let named_count = definition.params.len();
    let mut arguments: Vec<String> = vec![];
    let mut i = start;

    'slots: loop {
        while i < chars.len() && chars[i].is_whitespace() {
            i += 1;
        }
        match chars.get(i) {
            None => {
                return Err("قوس إغلاق ')' مفقود في استدعاء الماكرو.".into());
            }
            Some(')') => {
                i += 1;
                break 'slots;
            }
            _ => (),
        }

        if !arguments.is_empty() {
            if chars.get(i) == Some(&',') {
                i += 1;
                while i < chars.len() && chars[i].is_whitespace() {
                    i += 1;
                }
            } else if !(definition.is_variadic && arguments.len() == named_count) {
                return Err(
                    "تنسيق استدعاء الماكرو غير صالح: متوقع ',' أو ')' بين الوسيطات.".into(),
                );
            }
        }

        let variadic_tail = definition.is_variadic && arguments.len() >= named_count;
        let argument_start = i;
        let mut paren_level = 0i32;
        let mut in_string = false;
        let mut in_char = false;
        let mut previous_backslash = false;

        while i < chars.len() {
            let c = chars[i];
            if in_string {
                if c == '"' && !previous_backslash {
                    in_string = false;
                }
            } else if in_char {
                if c == '\'' && !previous_backslash {
                    in_char = false;
                }
            } else {
                match c {
                    '(' => paren_level += 1,
                    ')' => {
                        if paren_level == 0 {
                            break;
                        }
                        paren_level -= 1;
                    }
                    ',' if paren_level == 0 && !variadic_tail => break,
                    '"' => in_string = true,
                    '\'' => in_char = true,
                    _ => (),
                }
            }
            previous_backslash = c == '\\' && !previous_backslash;
            i += 1;
        }

        if in_string || in_char {
            return Err("علامة اقتباس غير منتهية في وسيطات الماكرو.".into());
        }
        if i >= chars.len() {
            return Err("قوس إغلاق ')' مفقود في استدعاء الماكرو.".into());
        }

        let argument: String = chars[argument_start..i].iter().collect();
        arguments.push(if variadic_tail {
            argument
        } else {
            argument.trim().to_owned()
        });
    }

    if definition.is_variadic && arguments.len() == named_count {
        // The variadic tail may be entirely absent.
        arguments.push(String::new());
    }

    let expected_valid = if definition.is_variadic {
        arguments.len() == named_count + 1
    } else {
        arguments.len() == named_count
    };
    if !expected_valid {
        return Err(format!(
            "عدد وسيطات غير صحيح للماكرو '{}' (متوقع {}، تم الحصول على {}).",
            definition.name,
            named_count,
            arguments.len()
        ));
    }

    Ok((arguments, i))
}

fn argument_for<'m>(definition: &'m Macro, arguments: &'m [String], name: &str) -> Option<&'m str> {
    if definition.is_variadic && name == VA_ARGS_NAME {
        return Some(arguments.get(definition.params.len()).map_or("", |s| s));
    }
    definition
        .params
        .iter()
        .position(|param| param == name)
        .map(|index| arguments[index].as_str())
}

/// Substitutes parameters, `#` stringification, and `##` pasting into a
/// macro body. The produced text is not yet rescanned.
pub(crate) fn substitute_macro_body(
    definition: &Macro,
    arguments: &[String],
) -> Result<String, String> {
    let body: Vec<char> = definition.body.chars().collect();
    let mut out = String::with_capacity(definition.body.len());
    // The most recent token is held back so `##` can paste onto it.
    let mut pending = String::new();
    let mut pending_active = false;
    let mut i = 0;

    while i < body.len() {
        let c = body[i];

        if c.is_whitespace() {
            // Whitespace around `##` is removed rather than flushed, so that
            // `a ## b` pastes.
            let mut j = i;
            while j < body.len() && body[j].is_whitespace() {
                j += 1;
            }
            if body.get(j) == Some(&'#') && body.get(j + 1) == Some(&'#') {
                i = j;
                continue;
            }
            if pending_active {
                out.push_str(&pending);
                pending.clear();
                pending_active = false;
            }
            out.push(c);
            i += 1;
            continue;
        }

        if c == '#' && body.get(i + 1) == Some(&'#') {
            if !pending_active {
                return Err(format!("## في موقع غير صالح في '{}'.", definition.name));
            }
            i += 2;
            while i < body.len() && body[i].is_whitespace() {
                i += 1;
            }

            let rhs_start = i;
            let rhs_value: String = if body.get(i).is_some_and(|&c| arabic::is_ident_start(c)) {
                while i < body.len() && arabic::is_ident_continue(body[i]) {
                    i += 1;
                }
                let rhs_token: String = body[rhs_start..i].iter().collect();
                match argument_for(definition, arguments, &rhs_token) {
                    Some(value) => value.to_owned(),
                    None => rhs_token,
                }
            } else if body.get(i).is_some_and(|&c| arabic::is_baa_digit(c)) {
                while i < body.len() && arabic::is_baa_digit(body[i]) {
                    i += 1;
                }
                body[rhs_start..i].iter().collect()
            } else {
                return Err(format!(
                    "## يجب أن يتبعه معرف أو رقم أو {} في '{}'.",
                    VA_ARGS_NAME, definition.name
                ));
            };

            // Empty operands paste to the other side unchanged.
            if pending.is_empty() {
                pending = rhs_value;
            } else if !rhs_value.is_empty() {
                pending.push_str(&rhs_value);
            }
            pending_active = true;
            continue;
        }

        if pending_active {
            out.push_str(&pending);
            pending.clear();
            pending_active = false;
        }

        if c == '#' {
            i += 1;
            if body.get(i).is_some_and(|&c| arabic::is_ident_start(c)) {
                let ident_start = i;
                let mut j = i;
                while j < body.len() && arabic::is_ident_continue(body[j]) {
                    j += 1;
                }
                let ident: String = body[ident_start..j].iter().collect();
                if let Some(value) = argument_for(definition, arguments, &ident) {
                    stringify_into(&mut out, value);
                    i = j;
                } else {
                    // `#` before a non-parameter passes through; the
                    // identifier is reprocessed normally.
                    out.push('#');
                }
            } else {
                out.push('#');
            }
            continue;
        }

        if arabic::is_ident_start(c) {
            let ident_start = i;
            while i < body.len() && arabic::is_ident_continue(body[i]) {
                i += 1;
            }
            let ident: String = body[ident_start..i].iter().collect();
            match argument_for(definition, arguments, &ident) {
                Some(value) => pending.push_str(value),
                None => pending.push_str(&ident),
            }
            pending_active = true;
            continue;
        }

        pending.push(c);
        pending_active = true;
        i += 1;
    }

    if pending_active {
        out.push_str(&pending);
    }
    Ok(out)
}

/// Stringification: wrap in quotes, escaping embedded `\` and `"`.
fn stringify_into(out: &mut String, argument: &str) {
    out.push('"');
    for c in argument.chars() {
        if c == '\\' || c == '"' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
}
