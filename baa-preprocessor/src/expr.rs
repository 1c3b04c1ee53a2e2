//! The constant-expression evaluator behind `#إذا` and `#وإلا_إذا`.
//!
//! Operates on the already macro-expanded expression text. Values are
//! signed 64-bit integers; the result is truthy iff non-zero.

use baa_foundation::arabic;

use crate::macros::MacroTable;

/// The Arabic `defined` operator.
pub const DEFINED_OPERATOR: &str = "معرف";

/// An evaluation failure: an Arabic message plus the character offset into
/// the expression text it points at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExprError {
    pub message: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ExprToken {
    Int(i64),
    Ident(String),
    Defined,
    LParen,
    RParen,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    EqEq,
    BangEq,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    AndAnd,
    OrOr,
    Bang,
    Amp,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,
    ShiftRight,
    Question,
    Colon,
    Eof,
}

pub struct ExprEvaluator<'a> {
    chars: Vec<char>,
    position: usize,
    token_start: usize,
    macros: &'a MacroTable,
}

impl<'a> ExprEvaluator<'a> {
    pub fn new(expression: &str, macros: &'a MacroTable) -> Self {
        Self {
            chars: expression.chars().collect(),
            position: 0,
            token_start: 0,
            macros,
        }
    }

    /// Evaluates the whole expression, requiring all input to be consumed.
    pub fn evaluate(&mut self) -> Result<i64, ExprError> {
        let value = self.parse_ternary()?;
        match self.next_token()? {
            ExprToken::Eof => Ok(value),
            _ => Err(self.error_here("رموز زائدة في نهاية التعبير الشرطي.")),
        }
    }

    fn error_here(&self, message: impl Into<String>) -> ExprError {
        ExprError {
            message: message.into(),
            offset: self.token_start,
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn lookahead(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.current();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while self.current().is_some_and(char::is_whitespace) {
            self.position += 1;
        }
    }

    fn next_token(&mut self) -> Result<ExprToken, ExprError> {
        self.skip_whitespace();
        self.token_start = self.position;
        let Some(c) = self.current() else {
            return Ok(ExprToken::Eof);
        };
        let token = match c {
            '(' => {
                self.bump();
                ExprToken::LParen
            }
            ')' => {
                self.bump();
                ExprToken::RParen
            }
            '+' => {
                self.bump();
                ExprToken::Plus
            }
            '-' => {
                self.bump();
                ExprToken::Minus
            }
            '*' => {
                self.bump();
                ExprToken::Star
            }
            '/' => {
                self.bump();
                ExprToken::Slash
            }
            '%' => {
                self.bump();
                ExprToken::Percent
            }
            '~' => {
                self.bump();
                ExprToken::Tilde
            }
            '^' => {
                self.bump();
                ExprToken::Caret
            }
            '?' => {
                self.bump();
                ExprToken::Question
            }
            ':' => {
                self.bump();
                ExprToken::Colon
            }
            '!' => {
                self.bump();
                if self.current() == Some('=') {
                    self.bump();
                    ExprToken::BangEq
                } else {
                    ExprToken::Bang
                }
            }
            '=' => {
                if self.lookahead() == Some('=') {
                    self.bump();
                    self.bump();
                    ExprToken::EqEq
                } else {
                    return Err(self.error_here("المعامل '=' غير صالح في التعبير الشرطي."));
                }
            }
            '<' => {
                self.bump();
                match self.current() {
                    Some('=') => {
                        self.bump();
                        ExprToken::LessEq
                    }
                    Some('<') => {
                        self.bump();
                        ExprToken::ShiftLeft
                    }
                    _ => ExprToken::Less,
                }
            }
            '>' => {
                self.bump();
                match self.current() {
                    Some('=') => {
                        self.bump();
                        ExprToken::GreaterEq
                    }
                    Some('>') => {
                        self.bump();
                        ExprToken::ShiftRight
                    }
                    _ => ExprToken::Greater,
                }
            }
            '&' => {
                self.bump();
                if self.current() == Some('&') {
                    self.bump();
                    ExprToken::AndAnd
                } else {
                    ExprToken::Amp
                }
            }
            '|' => {
                self.bump();
                if self.current() == Some('|') {
                    self.bump();
                    ExprToken::OrOr
                } else {
                    ExprToken::Pipe
                }
            }
            c if arabic::is_baa_digit(c) => return self.scan_integer(),
            c if arabic::is_ident_start(c) => {
                let mut ident = String::new();
                while let Some(c) = self.current() {
                    if arabic::is_ident_continue(c) {
                        ident.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                if ident == DEFINED_OPERATOR {
                    ExprToken::Defined
                } else {
                    ExprToken::Ident(ident)
                }
            }
            _ => return Err(self.error_here("رمز غير متوقع في التعبير الشرطي.")),
        };
        Ok(token)
    }

    /// Integer literals: decimal, `0x` hex, `0b` binary, and leading-zero
    /// octal; Arabic-Indic digits are accepted throughout.
    fn scan_integer(&mut self) -> Result<ExprToken, ExprError> {
        let mut value: i64 = 0;
        let first = self.current().unwrap_or('0');
        let mut base: i64 = 10;

        if arabic::baa_digit_value(first) == Some(0) {
            match self.lookahead() {
                Some('x' | 'X') => {
                    self.bump();
                    self.bump();
                    base = 16;
                    if !self.current().is_some_and(arabic::is_baa_hex_digit) {
                        return Err(
                            self.error_here("رقم سداسي عشري غير صالح بعد '0x' في التعبير الشرطي.")
                        );
                    }
                }
                Some('b' | 'B') => {
                    self.bump();
                    self.bump();
                    base = 2;
                    if !self.current().is_some_and(arabic::is_baa_bin_digit) {
                        return Err(
                            self.error_here("رقم ثنائي غير صالح بعد '0b' في التعبير الشرطي.")
                        );
                    }
                }
                Some(c) if arabic::is_baa_digit(c) => {
                    base = 8;
                }
                _ => (),
            }
        }

        let mut any = false;
        while let Some(c) = self.current() {
            let digit = match base {
                16 => arabic::baa_hex_digit_value(c),
                _ => arabic::baa_digit_value(c),
            };
            let Some(digit) = digit else { break };
            if digit as i64 >= base {
                return Err(self.error_here("رقم غير صالح في التعبير الشرطي."));
            }
            value = value.wrapping_mul(base).wrapping_add(digit as i64);
            any = true;
            self.bump();
        }
        if !any {
            return Err(self.error_here("رقم غير صالح في التعبير الشرطي."));
        }
        Ok(ExprToken::Int(value))
    }

    fn peek_token(&mut self) -> Result<(ExprToken, usize), ExprError> {
        let saved = self.position;
        let token = self.next_token()?;
        let start = self.token_start;
        self.position = saved;
        Ok((token, start))
    }

    /// `?:` sits below every binary level and associates to the right.
    fn parse_ternary(&mut self) -> Result<i64, ExprError> {
        let condition = self.parse_binary(0)?;
        let (token, _) = self.peek_token()?;
        if token != ExprToken::Question {
            return Ok(condition);
        }
        self.next_token()?; // ?
        let when_true = self.parse_ternary()?;
        match self.next_token()? {
            ExprToken::Colon => (),
            _ => return Err(self.error_here("':' مفقودة في التعبير الشرطي الثلاثي.")),
        }
        let when_false = self.parse_ternary()?;
        Ok(if condition != 0 { when_true } else { when_false })
    }

    fn parse_unary(&mut self) -> Result<i64, ExprError> {
        let saved = self.position;
        match self.next_token()? {
            ExprToken::Plus => self.parse_unary(),
            ExprToken::Minus => {
                let operator_offset = self.token_start;
                let value = self.parse_unary()?;
                value.checked_neg().ok_or_else(|| ExprError {
                    message: OVERFLOW_MESSAGE.into(),
                    offset: operator_offset,
                })
            }
            ExprToken::Bang => Ok((self.parse_unary()? == 0) as i64),
            ExprToken::Tilde => Ok(!self.parse_unary()?),
            _ => {
                self.position = saved;
                self.parse_primary()
            }
        }
    }

    fn parse_primary(&mut self) -> Result<i64, ExprError> {
        match self.next_token()? {
            ExprToken::Int(value) => Ok(value),
            ExprToken::Defined => self.parse_defined(),
            ExprToken::LParen => {
                let value = self.parse_ternary()?;
                match self.next_token()? {
                    ExprToken::RParen => Ok(value),
                    _ => Err(self.error_here("قوس الإغلاق ')' مفقود بعد التعبير.")),
                }
            }
            // Surviving identifiers are not object-like macros; they
            // evaluate to 0, consistent with the C preprocessor.
            ExprToken::Ident(_) => Ok(0),
            _ => Err(self.error_here("رمز غير متوقع في بداية التعبير الأولي.")),
        }
    }

    /// `معرف NAME` or `معرف(NAME)`: 1 if NAME is in the macro table.
    fn parse_defined(&mut self) -> Result<i64, ExprError> {
        let mut parenthesised = false;
        let mut token = self.next_token()?;
        if token == ExprToken::LParen {
            parenthesised = true;
            token = self.next_token()?;
        }
        let name = match token {
            ExprToken::Ident(name) => name,
            // `معرف معرف` asks whether a macro named معرف exists.
            ExprToken::Defined => DEFINED_OPERATOR.to_owned(),
            _ => return Err(self.error_here("تنسيق معرف() غير صالح: متوقع معرف.")),
        };
        let value = self.macros.contains(&name) as i64;
        if parenthesised {
            match self.next_token()? {
                ExprToken::RParen => (),
                _ => {
                    return Err(self.error_here("تنسيق معرف() غير صالح: قوس الإغلاق ')' مفقود."))
                }
            }
        }
        Ok(value)
    }

    fn binary_precedence(token: &ExprToken) -> Option<i32> {
        Some(match token {
            ExprToken::OrOr => 10,
            ExprToken::AndAnd => 20,
            ExprToken::Pipe => 30,
            ExprToken::Caret => 40,
            ExprToken::Amp => 50,
            ExprToken::EqEq | ExprToken::BangEq => 60,
            ExprToken::Less | ExprToken::Greater | ExprToken::LessEq | ExprToken::GreaterEq => 70,
            ExprToken::ShiftLeft | ExprToken::ShiftRight => 80,
            ExprToken::Plus | ExprToken::Minus => 90,
            ExprToken::Star | ExprToken::Slash | ExprToken::Percent => 100,
            _ => return None,
        })
    }

    /// Precedence climbing over the binary operators.
    fn parse_binary(&mut self, min_precedence: i32) -> Result<i64, ExprError> {
        let lhs = self.parse_unary()?;
        self.parse_binary_rhs(lhs, min_precedence)
    }

    fn parse_binary_rhs(&mut self, lhs: i64, min_precedence: i32) -> Result<i64, ExprError> {
        let mut lhs = lhs;
        loop {
            let (token, operator_offset) = self.peek_token()?;
            let Some(precedence) = Self::binary_precedence(&token) else {
                return Ok(lhs);
            };
            if precedence < min_precedence {
                return Ok(lhs);
            }
            self.next_token()?;
            let mut rhs = self.parse_unary()?;
            loop {
                let (next, _) = self.peek_token()?;
                match Self::binary_precedence(&next) {
                    Some(next_precedence) if next_precedence > precedence => {
                        rhs = self.parse_binary_rhs(rhs, next_precedence)?;
                    }
                    _ => break,
                }
            }
            lhs = apply_binary(&token, lhs, rhs).map_err(|message| ExprError {
                message,
                offset: operator_offset,
            })?;
        }
    }
}

const OVERFLOW_MESSAGE: &str = "تجاوز سعة العدد الصحيح في التعبير الشرطي.";

/// Valid shift amounts are `0..64`; anything else is the overflow
/// condition.
fn shift_amount(rhs: i64) -> Result<u32, String> {
    if (0..64).contains(&rhs) {
        Ok(rhs as u32)
    } else {
        Err("مقدار الإزاحة خارج النطاق في التعبير الشرطي.".into())
    }
}

fn apply_binary(operator: &ExprToken, lhs: i64, rhs: i64) -> Result<i64, String> {
    let overflow = || String::from(OVERFLOW_MESSAGE);
    Ok(match operator {
        ExprToken::Plus => lhs.checked_add(rhs).ok_or_else(overflow)?,
        ExprToken::Minus => lhs.checked_sub(rhs).ok_or_else(overflow)?,
        ExprToken::Star => lhs.checked_mul(rhs).ok_or_else(overflow)?,
        ExprToken::Slash => {
            if rhs == 0 {
                return Err("قسمة على صفر في التعبير الشرطي.".into());
            }
            // `i64::MIN / -1` is the one division that overflows.
            lhs.checked_div(rhs).ok_or_else(overflow)?
        }
        ExprToken::Percent => {
            if rhs == 0 {
                return Err("قسمة على صفر (معامل الباقي) في التعبير الشرطي.".into());
            }
            lhs.checked_rem(rhs).ok_or_else(overflow)?
        }
        ExprToken::EqEq => (lhs == rhs) as i64,
        ExprToken::BangEq => (lhs != rhs) as i64,
        ExprToken::Less => (lhs < rhs) as i64,
        ExprToken::Greater => (lhs > rhs) as i64,
        ExprToken::LessEq => (lhs <= rhs) as i64,
        ExprToken::GreaterEq => (lhs >= rhs) as i64,
        ExprToken::AndAnd => (lhs != 0 && rhs != 0) as i64,
        ExprToken::OrOr => (lhs != 0 || rhs != 0) as i64,
        ExprToken::Amp => lhs & rhs,
        ExprToken::Pipe => lhs | rhs,
        ExprToken::Caret => lhs ^ rhs,
        ExprToken::ShiftLeft => lhs << shift_amount(rhs)?,
        ExprToken::ShiftRight => lhs >> shift_amount(rhs)?,
        _ => unreachable!("not a binary operator"),
    })
}

/// Advances past a broken expression to a plausible resume point: an
/// unmatched closing bracket, a top-level comma or semicolon, or a newline.
/// Tracks `()`/`[]`/`{}` nesting and gives up after `max_chars` scanned
/// characters. Returns the character offset scanning stopped at.
pub(crate) fn sync_expression(text: &str, from: usize, max_chars: usize) -> usize {
    let chars: Vec<char> = text.chars().collect();
    let mut paren = 0i32;
    let mut bracket = 0i32;
    let mut brace = 0i32;
    let mut i = from;
    let mut scanned = 0usize;
    while i < chars.len() && scanned < max_chars {
        match chars[i] {
            '(' => paren += 1,
            ')' => {
                if paren == 0 {
                    return i;
                }
                paren -= 1;
            }
            '[' => bracket += 1,
            ']' => {
                if bracket == 0 {
                    return i;
                }
                bracket -= 1;
            }
            '{' => brace += 1,
            '}' => {
                if brace == 0 {
                    return i;
                }
                brace -= 1;
            }
            ',' | ';' if paren == 0 && bracket == 0 && brace == 0 => return i,
            '\n' => return i,
            _ => (),
        }
        i += 1;
        scanned += 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::macros::{Macro, MacroTable};

    fn eval(expression: &str) -> Result<i64, ExprError> {
        let macros = MacroTable::default();
        ExprEvaluator::new(expression, &macros).evaluate()
    }

    #[test]
    fn arithmetic_and_precedence() {
        assert_eq!(eval("1 + 2 * 3").unwrap(), 7);
        assert_eq!(eval("(1 + 2) * 3").unwrap(), 9);
        assert_eq!(eval("10 % 4 + 6 / 2").unwrap(), 5);
        assert_eq!(eval("1 + 1 == 2").unwrap(), 1);
    }

    #[test]
    fn unary_operators() {
        assert_eq!(eval("-3 + 5").unwrap(), 2);
        assert_eq!(eval("!0").unwrap(), 1);
        assert_eq!(eval("!7").unwrap(), 0);
        assert_eq!(eval("~0").unwrap(), -1);
        assert_eq!(eval("+4").unwrap(), 4);
    }

    #[test]
    fn logic_and_bitwise_levels() {
        assert_eq!(eval("1 || 0 && 0").unwrap(), 1);
        assert_eq!(eval("1 | 2 & 2").unwrap(), 3);
        assert_eq!(eval("1 ^ 3").unwrap(), 2);
        assert_eq!(eval("1 << 4").unwrap(), 16);
        assert_eq!(eval("32 >> 2").unwrap(), 8);
        assert_eq!(eval("3 < 5 == 1").unwrap(), 1);
    }

    #[test]
    fn ternary_is_right_associative() {
        assert_eq!(eval("1 ? 2 : 3").unwrap(), 2);
        assert_eq!(eval("0 ? 2 : 3").unwrap(), 3);
        assert_eq!(eval("0 ? 1 : 0 ? 2 : 3").unwrap(), 3);
        assert_eq!(eval("1 ? 0 ? 4 : 5 : 6").unwrap(), 5);
    }

    #[test]
    fn integer_bases() {
        assert_eq!(eval("0x10").unwrap(), 16);
        assert_eq!(eval("0b101").unwrap(), 5);
        assert_eq!(eval("010").unwrap(), 8);
        assert_eq!(eval("٥ + ٣").unwrap(), 8);
        assert!(eval("0x").is_err());
        assert!(eval("08").is_err());
    }

    #[test]
    fn division_by_zero_reports_offset() {
        let error = eval("10 / 0").unwrap_err();
        assert!(error.message.contains("قسمة على صفر"));
        assert_eq!(error.offset, 3);
        assert!(eval("1 % 0").is_err());
    }

    #[test]
    fn overflow_is_reported_at_the_operator() {
        let max = i64::MAX;
        let error = eval(&format!("{max} + 1")).unwrap_err();
        assert!(error.message.contains("تجاوز"));
        assert_eq!(error.offset, 20);
        assert!(eval(&format!("{max} * 2")).is_err());
        assert!(eval(&format!("-{max} - 2")).is_err());
        // Shift amounts outside 0..64 are the overflow condition too.
        assert!(eval("1 << 64").is_err());
        assert!(eval("1 >> -1").is_err());
        // Well inside the range nothing triggers.
        assert_eq!(eval("1000000 * 1000000").unwrap(), 1_000_000_000_000);
    }

    #[test]
    fn defined_operator() {
        let mut macros = MacroTable::default();
        macros.define(Macro::object_like("موجود", "1"));
        assert_eq!(
            ExprEvaluator::new("معرف(موجود)", &macros).evaluate().unwrap(),
            1
        );
        assert_eq!(
            ExprEvaluator::new("معرف موجود", &macros).evaluate().unwrap(),
            1
        );
        assert_eq!(
            ExprEvaluator::new("معرف(غائب)", &macros).evaluate().unwrap(),
            0
        );
        assert_eq!(
            ExprEvaluator::new("!معرف(غائب)", &macros).evaluate().unwrap(),
            1
        );
    }

    #[test]
    fn unknown_identifiers_evaluate_to_zero() {
        assert_eq!(eval("مجهول + 1").unwrap(), 1);
    }

    #[test]
    fn stray_tokens_are_errors() {
        assert!(eval("1 2").is_err());
        assert!(eval("1 = 1").is_err());
        assert!(eval("(1").is_err());
    }

    #[test]
    fn expression_sync_stops_at_safe_points() {
        // An unmatched closer is a resume point.
        assert_eq!(sync_expression("1 $$ 2)", 0, 1000), 6);
        // Nested groups are skipped whole; the top-level comma stops us.
        assert_eq!(sync_expression("f(a, b), c", 0, 1000), 7);
        // Newlines always stop the scan.
        assert_eq!(sync_expression("غير صالح\nبعده", 0, 1000), 8);
        // The cap bounds the work on pathological input.
        assert_eq!(sync_expression(&"x".repeat(500), 0, 100), 100);
    }
}
