//! Scanners for the multi-character token kinds: identifiers, numeric
//! literals with Arabic digits and suffixes, and the string/char literal
//! family with Arabic escape sequences.

use baa_foundation::{arabic, errors::Category};

use crate::{
    keywords,
    lexer::{Cursor, Lexer},
    token::{Token, TokenKind},
};

/// The integer suffixes: غ marks unsigned, ط long (doubled for long long).
const SUFFIX_UNSIGNED: char = 'غ';
const SUFFIX_LONG: char = 'ط';
/// The float suffix, valid only on decimal literals and only last.
const SUFFIX_FLOAT: char = 'ح';

enum UnderscoreFault {
    AfterPrefix,
    Doubled,
    Trailing,
}

impl<'a> Lexer<'a> {
    pub(crate) fn scan_identifier(&mut self, start: Cursor) -> Token {
        while self.current_char().is_some_and(arabic::is_ident_continue) {
            self.advance_char();
        }
        let text = &self.input[start.byte..self.position];
        let kind = keywords::lookup(text).unwrap_or(TokenKind::Ident);
        self.token_from_source(kind, &start)
    }

    fn invalid_number(&mut self, start: &Cursor, message: String, suggestion: &str) -> Token {
        let token = self.error_token(
            TokenKind::InvalidNumber,
            1005,
            Category::Number,
            start,
            message,
            Some(suggestion),
        );
        self.synchronize();
        token
    }

    fn invalid_suffix(&mut self, start: &Cursor, message: String, suggestion: &str) -> Token {
        let token = self.error_token(
            TokenKind::InvalidSuffix,
            1006,
            Category::Number,
            start,
            message,
            Some(suggestion),
        );
        self.synchronize();
        token
    }

    /// Consumes a run of digits in which single underscores may separate
    /// digits. `saw_digit` is true when at least one digit preceded this
    /// run (after a base prefix the prefix does not count).
    fn digit_run(
        &mut self,
        mut saw_digit: bool,
        is_digit: impl Fn(char) -> bool,
    ) -> Result<bool, UnderscoreFault> {
        let mut previous_was_underscore = false;
        while let Some(c) = self.current_char() {
            if is_digit(c) {
                saw_digit = true;
                previous_was_underscore = false;
                self.advance_char();
            } else if c == '_' {
                if !saw_digit {
                    return Err(UnderscoreFault::AfterPrefix);
                }
                if previous_was_underscore {
                    return Err(UnderscoreFault::Doubled);
                }
                previous_was_underscore = true;
                self.advance_char();
            } else {
                break;
            }
        }
        if previous_was_underscore {
            return Err(UnderscoreFault::Trailing);
        }
        Ok(saw_digit)
    }

    fn underscore_fault_token(&mut self, start: &Cursor, fault: UnderscoreFault) -> Token {
        let (message, suggestion) = match fault {
            UnderscoreFault::AfterPrefix => (
                format!(
                    "شرطة سفلية غير صالحة في العدد: لا يمكن أن تلي البادئة أو الفاصلة مباشرة (السطر {}، العمود {}).",
                    self.line, self.column
                ),
                "استخدم الشرطة السفلية لفصل الأرقام فقط",
            ),
            UnderscoreFault::Doubled => (
                format!(
                    "شرطة سفلية غير صالحة في العدد: لا يمكن أن تكون متتالية (السطر {}، العمود {}).",
                    self.line, self.column
                ),
                "استخدم شرطة سفلية واحدة فقط لفصل الأرقام",
            ),
            UnderscoreFault::Trailing => (
                format!(
                    "شرطة سفلية غير صالحة في العدد: لا يمكن أن تكون في النهاية (السطر {}، العمود {}).",
                    self.line, self.column
                ),
                "احذف الشرطة السفلية من نهاية الرقم",
            ),
        };
        self.invalid_number(start, message, suggestion)
    }

    pub(crate) fn scan_number(&mut self, start: Cursor) -> Token {
        let mut is_float = false;

        let leading_separator = matches!(
            self.current_char(),
            Some('.') | Some(arabic::ARABIC_DECIMAL_SEPARATOR)
        );
        let mut base_is_hex = false;
        let mut base_is_binary = false;

        if leading_separator {
            is_float = true;
            self.advance_char();
            match self.digit_run(false, arabic::is_baa_digit) {
                Ok(_) => (),
                Err(fault) => return self.underscore_fault_token(&start, fault),
            }
        } else {
            if self.current_char() == Some('0') {
                match self.peek_next() {
                    Some('x' | 'X') => {
                        base_is_hex = true;
                        self.advance_char();
                        self.advance_char();
                        if !self.current_char().is_some_and(arabic::is_baa_hex_digit) {
                            return self.invalid_number(
                                &start,
                                format!(
                                    "عدد سداسي عشري غير صالح: يجب أن يتبع البادئة 0x رقم سداسي عشري (السطر {}، العمود {}).",
                                    self.line, self.column
                                ),
                                "أضف رقمًا سداسيًا عشريًا صالحًا بعد 0x",
                            );
                        }
                    }
                    Some('b' | 'B') => {
                        base_is_binary = true;
                        self.advance_char();
                        self.advance_char();
                        if !self.current_char().is_some_and(arabic::is_baa_bin_digit) {
                            return self.invalid_number(
                                &start,
                                format!(
                                    "عدد ثنائي غير صالح: يجب أن يتبع البادئة 0b رقم ثنائي واحد على الأقل (السطر {}، العمود {}).",
                                    self.line, self.column
                                ),
                                "أضف رقمًا ثنائيًا صالحًا (0 أو 1) بعد 0b",
                            );
                        }
                    }
                    _ => (),
                }
            }

            let digit_class: fn(char) -> bool = if base_is_hex {
                arabic::is_baa_hex_digit
            } else if base_is_binary {
                arabic::is_baa_bin_digit
            } else {
                arabic::is_baa_digit
            };
            match self.digit_run(!base_is_hex && !base_is_binary, digit_class) {
                Ok(_) => (),
                Err(fault) => return self.underscore_fault_token(&start, fault),
            }

            // Fractional part; permitted after decimal and hex integer parts.
            if !base_is_binary
                && matches!(
                    self.current_char(),
                    Some('.') | Some(arabic::ARABIC_DECIMAL_SEPARATOR)
                )
                && self.peek_next().is_some_and(&digit_class)
            {
                is_float = true;
                self.advance_char();
                match self.digit_run(false, digit_class) {
                    Ok(_) => (),
                    Err(fault) => return self.underscore_fault_token(&start, fault),
                }
            }
        }

        // Exponent, decimal literals only: أ with an optional sign.
        if !base_is_hex
            && !base_is_binary
            && self.current_char() == Some(arabic::ARABIC_EXPONENT_MARKER)
        {
            let after_marker = self.peek_next();
            let exponent_follows = match after_marker {
                Some(c) if arabic::is_baa_digit(c) => true,
                Some('+' | '-') => true,
                _ => false,
            };
            if exponent_follows {
                is_float = true;
                self.advance_char(); // أ
                if let Some('+' | '-') = self.current_char() {
                    self.advance_char();
                }
                if !self.current_char().is_some_and(arabic::is_baa_digit) {
                    return self.invalid_number(
                        &start,
                        format!(
                            "تنسيق أس غير صالح بعد 'أ' (السطر {}، العمود {}).",
                            self.line, self.column
                        ),
                        "أضف رقمًا صالحًا بعد علامة الأس 'أ'",
                    );
                }
                match self.digit_run(false, arabic::is_baa_digit) {
                    Ok(_) => (),
                    Err(fault) => return self.underscore_fault_token(&start, fault),
                }
            }
        }

        self.scan_number_suffixes(start, is_float)
    }

    fn scan_number_suffixes(&mut self, start: Cursor, is_float: bool) -> Token {
        if !is_float {
            let mut seen_unsigned = false;
            let mut long_count = 0u8;
            loop {
                match self.current_char() {
                    Some(SUFFIX_UNSIGNED) => {
                        if seen_unsigned {
                            return self.invalid_suffix(
                                &start,
                                format!(
                                    "لاحقة رقم غير صالحة: لا يمكن استخدام 'غ' أكثر من مرة (السطر {}، العمود {}).",
                                    self.line, self.column
                                ),
                                "استخدم لاحقة غ واحدة فقط للأعداد غير المُوقعة",
                            );
                        }
                        seen_unsigned = true;
                        self.advance_char();
                    }
                    Some(SUFFIX_LONG) => {
                        if long_count == 2 {
                            return self.invalid_suffix(
                                &start,
                                format!(
                                    "لاحقة رقم غير صالحة: لا يمكن استخدام أكثر من 'طط' (السطر {}، العمود {}).",
                                    self.line, self.column
                                ),
                                "استخدم لاحقات صالحة: ط أو طط",
                            );
                        }
                        long_count += 1;
                        self.advance_char();
                    }
                    Some(SUFFIX_FLOAT) => {
                        return self.invalid_suffix(
                            &start,
                            format!(
                                "لاحقة رقم غير صالحة: لا يمكن استخدام 'ح' مع الأعداد الصحيحة (السطر {}، العمود {}).",
                                self.line, self.column
                            ),
                            "لاحقة 'ح' مخصصة للأعداد العشرية فقط",
                        );
                    }
                    _ => break,
                }
            }
            self.token_from_source(TokenKind::IntLit, &start)
        } else {
            if self.current_char() == Some(SUFFIX_FLOAT) {
                self.advance_char();
                if let Some(SUFFIX_UNSIGNED | SUFFIX_LONG | SUFFIX_FLOAT) = self.current_char() {
                    return self.invalid_suffix(
                        &start,
                        format!(
                            "لاحقة رقم غير صالحة: لا يمكن إضافة لاحقات بعد 'ح' (السطر {}، العمود {}).",
                            self.line, self.column
                        ),
                        "لاحقة 'ح' يجب أن تكون الأخيرة في الأعداد العشرية",
                    );
                }
            } else if let Some(SUFFIX_UNSIGNED | SUFFIX_LONG) = self.current_char() {
                return self.invalid_suffix(
                    &start,
                    format!(
                        "لاحقة رقم غير صالحة: لاحقات الأعداد الصحيحة غير مدعومة للأعداد العشرية (السطر {}، العمود {}).",
                        self.line, self.column
                    ),
                    "استخدم لاحقة 'ح' للأعداد العشرية",
                );
            }
            self.token_from_source(TokenKind::FloatLit, &start)
        }
    }

    /// Decodes one escape sequence. Called with the cursor just past the
    /// backslash. On failure returns a ready error token.
    fn scan_escape(&mut self, literal_start: &Cursor, inside: &str) -> Result<char, Token> {
        let Some(key) = self.advance_char() else {
            return Err(self.invalid_escape_token(
                literal_start,
                format!(
                    "تسلسل هروب مقطوع في نهاية الملف داخل {} (بدأ في السطر {}، العمود {}).",
                    inside, literal_start.location.line, literal_start.location.column
                ),
            ));
        };
        match key {
            'س' => Ok('\n'),
            'م' => Ok('\t'),
            'ر' => Ok('\r'),
            'ص' => Ok('\0'),
            '\\' => Ok('\\'),
            '"' => Ok('"'),
            '\'' => Ok('\''),
            'ي' => {
                let mut value = 0u32;
                for _ in 0..4 {
                    let digit = self.current_char().and_then(arabic::baa_hex_digit_value);
                    match digit {
                        Some(digit) => {
                            value = value * 16 + digit;
                            self.advance_char();
                        }
                        None => {
                            return Err(self.invalid_escape_token(
                                literal_start,
                                format!(
                                    "تسلسل هروب يونيكود غير صالح (\\يXXXX) داخل {} (بدأ في السطر {}، العمود {}).",
                                    inside,
                                    literal_start.location.line,
                                    literal_start.location.column
                                ),
                            ))
                        }
                    }
                }
                char::from_u32(value).ok_or_else(|| {
                    self.invalid_escape_token(
                        literal_start,
                        format!(
                            "تسلسل هروب يونيكود يشير إلى قيمة غير صالحة داخل {} (بدأ في السطر {}، العمود {}).",
                            inside, literal_start.location.line, literal_start.location.column
                        ),
                    )
                })
            }
            'ه' => {
                if self.current_char() != Some(arabic::TATWEEL) {
                    return Err(self.invalid_escape_token(
                        literal_start,
                        format!(
                            "تسلسل هروب غير صالح: '\\ه' يجب أن يتبعها 'ـ' داخل {} (بدأ في السطر {}، العمود {}).",
                            inside, literal_start.location.line, literal_start.location.column
                        ),
                    ));
                }
                self.advance_char(); // ـ
                let mut value = 0u32;
                for _ in 0..2 {
                    let digit = self.current_char().and_then(arabic::baa_hex_digit_value);
                    match digit {
                        Some(digit) => {
                            value = value * 16 + digit;
                            self.advance_char();
                        }
                        None => {
                            return Err(self.invalid_escape_token(
                                literal_start,
                                format!(
                                    "تسلسل هروب سداسي عشري '\\هـHH' غير صالح داخل {} (بدأ في السطر {}، العمود {}).",
                                    inside,
                                    literal_start.location.line,
                                    literal_start.location.column
                                ),
                            ))
                        }
                    }
                }
                Ok(char::from_u32(value).expect("byte escapes are always valid scalars"))
            }
            other => Err(self.invalid_escape_token(
                literal_start,
                format!(
                    "تسلسل هروب غير صالح '\\{}' داخل {} (بدأ في السطر {}، العمود {}).",
                    other, inside, literal_start.location.line, literal_start.location.column
                ),
            )),
        }
    }

    fn invalid_escape_token(&mut self, start: &Cursor, message: String) -> Token {
        let token = self.error_token(
            TokenKind::InvalidEscape,
            1002,
            Category::Escape,
            start,
            message,
            Some("استخدم تسلسل هروب صالح مثل \\س أو \\م أو \\يXXXX"),
        );
        self.synchronize();
        token
    }

    fn unterminated_string_token(&mut self, start: &Cursor) -> Token {
        self.error_token(
            TokenKind::UnterminatedString,
            1001,
            Category::String,
            start,
            format!(
                "سلسلة نصية غير منتهية (بدأت في السطر {}، العمود {}).",
                start.location.line, start.location.column
            ),
            Some("أغلق السلسلة بعلامة اقتباس \""),
        )
    }

    pub(crate) fn scan_string(&mut self, start: Cursor) -> Token {
        self.advance_char(); // "
        let mut value = String::new();
        loop {
            match self.current_char() {
                // Plain strings do not span lines; leave the newline for the
                // next token.
                None | Some('\n') => return self.unterminated_string_token(&start),
                Some('"') => {
                    self.advance_char();
                    return self.token_with_lexeme(TokenKind::StringLit, &start, value);
                }
                Some('\\') => {
                    self.advance_char();
                    match self.scan_escape(&start, "سلسلة نصية") {
                        Ok(c) => value.push(c),
                        Err(token) => return token,
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance_char();
                }
            }
        }
    }

    pub(crate) fn scan_multiline_string(&mut self, start: Cursor) -> Token {
        for _ in 0..3 {
            self.advance_char();
        }
        let mut value = String::new();
        loop {
            if self.rest().starts_with("\"\"\"") {
                for _ in 0..3 {
                    self.advance_char();
                }
                return self.token_with_lexeme(TokenKind::StringLit, &start, value);
            }
            match self.current_char() {
                None => return self.unterminated_string_token(&start),
                Some('\\') => {
                    self.advance_char();
                    match self.scan_escape(&start, "سلسلة نصية متعددة الأسطر") {
                        Ok(c) => value.push(c),
                        Err(token) => return token,
                    }
                }
                Some(c) => {
                    value.push(c);
                    self.advance_char();
                }
            }
        }
    }

    /// Raw strings open with خ and process no escapes: `خ"…"` on one line,
    /// `خ"""…"""` across lines.
    pub(crate) fn scan_raw_string(&mut self, start: Cursor) -> Token {
        self.advance_char(); // خ
        let multiline = self.rest().starts_with("\"\"\"");
        let quotes = if multiline { 3 } else { 1 };
        for _ in 0..quotes {
            self.advance_char();
        }
        let mut value = String::new();
        loop {
            if multiline {
                if self.rest().starts_with("\"\"\"") {
                    for _ in 0..3 {
                        self.advance_char();
                    }
                    return self.token_with_lexeme(TokenKind::StringLit, &start, value);
                }
            } else if self.current_char() == Some('"') {
                self.advance_char();
                return self.token_with_lexeme(TokenKind::StringLit, &start, value);
            }
            match self.current_char() {
                None => return self.unterminated_string_token(&start),
                Some('\n') if !multiline => return self.unterminated_string_token(&start),
                Some(c) => {
                    value.push(c);
                    self.advance_char();
                }
            }
        }
    }

    pub(crate) fn scan_char_literal(&mut self, start: Cursor) -> Token {
        self.advance_char(); // '
        let value = match self.current_char() {
            None | Some('\n') => {
                return self.error_token(
                    TokenKind::UnterminatedChar,
                    1003,
                    Category::Character,
                    &start,
                    format!(
                        "قيمة حرفية غير منتهية (بدأت في السطر {}، العمود {}).",
                        start.location.line, start.location.column
                    ),
                    Some("أغلق القيمة الحرفية بعلامة اقتباس مفردة '"),
                );
            }
            Some('\'') => {
                self.advance_char();
                let token = self.error_token(
                    TokenKind::InvalidCharacter,
                    1004,
                    Category::Character,
                    &start,
                    format!(
                        "قيمة حرفية فارغة (السطر {}، العمود {}).",
                        start.location.line, start.location.column
                    ),
                    Some("ضع حرفًا واحدًا بين علامتي الاقتباس"),
                );
                self.synchronize();
                return token;
            }
            Some('\\') => {
                self.advance_char();
                match self.scan_escape(&start, "قيمة حرفية") {
                    Ok(c) => c,
                    Err(token) => return token,
                }
            }
            Some(c) => {
                self.advance_char();
                c
            }
        };
        match self.current_char() {
            Some('\'') => {
                self.advance_char();
                self.token_with_lexeme(TokenKind::CharLit, &start, value.to_string())
            }
            None | Some('\n') => self.error_token(
                TokenKind::UnterminatedChar,
                1003,
                Category::Character,
                &start,
                format!(
                    "قيمة حرفية غير منتهية (بدأت في السطر {}، العمود {}).",
                    start.location.line, start.location.column
                ),
                Some("أغلق القيمة الحرفية بعلامة اقتباس مفردة '"),
            ),
            Some(_) => {
                let token = self.error_token(
                    TokenKind::InvalidCharacter,
                    1004,
                    Category::Character,
                    &start,
                    format!(
                        "قيمة حرفية تحتوي على أكثر من حرف واحد (بدأت في السطر {}، العمود {}).",
                        start.location.line, start.location.column
                    ),
                    Some("القيم الحرفية تحتوي على حرف واحد فقط"),
                );
                self.synchronize();
                token
            }
        }
    }
}
