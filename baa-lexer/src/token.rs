use std::fmt;

use baa_foundation::{
    errors::Category,
    span::{Span, Spanned},
};

/// Passes all the token kinds as a sequence of `Kind = "name",` into the
/// provided macro. The names are what parser diagnostics call the token.
#[macro_export]
macro_rules! expand_tokens {
    ($x:path) => {
        $x! {
            Whitespace = "مسافة",
            Newline    = "سطر جديد",

            LineComment  = "تعليق",
            BlockComment = "تعليق متعدد الأسطر",
            DocComment   = "تعليق توثيقي",

            Ident     = "معرف",
            IntLit    = "عدد صحيح",
            FloatLit  = "عدد عشري",
            CharLit   = "حرف",
            StringLit = "سلسلة نصية",
            BoolLit   = "قيمة منطقية",

            Const    = "`ثابت`",
            Inline   = "`مضمن`",
            Restrict = "`مقيد`",
            If       = "`إذا`",
            Else     = "`وإلا`",
            While    = "`طالما`",
            For      = "`لكل`",
            Do       = "`افعل`",
            Case     = "`حالة`",
            Switch   = "`اختر`",
            Return   = "`إرجع`",
            Break    = "`توقف`",
            Continue = "`أكمل`",

            TypeInt   = "`عدد_صحيح`",
            TypeFloat = "`عدد_حقيقي`",
            TypeChar  = "`حرف`",
            TypeVoid  = "`فراغ`",
            TypeBool  = "`منطقي`",

            Plus         = "`+`",
            Minus        = "`-`",
            Star         = "`*`",
            Slash        = "`/`",
            Percent      = "`%`",
            Assign       = "`=`",
            EqualEqual   = "`==`",
            Bang         = "`!`",
            BangEqual    = "`!=`",
            Less         = "`<`",
            LessEqual    = "`<=`",
            Greater      = "`>`",
            GreaterEqual = "`>=`",
            AndAnd       = "`&&`",
            OrOr         = "`||`",

            PlusAssign    = "`+=`",
            MinusAssign   = "`-=`",
            StarAssign    = "`*=`",
            SlashAssign   = "`/=`",
            PercentAssign = "`%=`",
            Increment     = "`++`",
            Decrement     = "`--`",

            LParen   = "`(`",
            RParen   = "`)`",
            LBrace   = "`{`",
            RBrace   = "`}`",
            LBracket = "`[`",
            RBracket = "`]`",
            Comma    = "`,`",
            Dot      = "`.`",
            Semi     = "`;`",
            Colon    = "`:`",

            // The error family. Produced by the lexer on scanning failures;
            // each carries a `LexError` payload on its token.
            UnterminatedString  = "سلسلة نصية غير منتهية",
            UnterminatedChar    = "حرف غير منته",
            UnterminatedComment = "تعليق غير منته",
            InvalidEscape       = "تسلسل هروب غير صالح",
            InvalidNumber       = "عدد غير صالح",
            InvalidSuffix       = "لاحقة غير صالحة",
            InvalidCharacter    = "حرف غير متوقع",
            Error               = "خطأ معجمي",

            Eof = "نهاية الملف",
        }
    };
}

macro_rules! token_kind_enum {
    ($($name:tt = $pretty_name:tt),* $(,)?) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum TokenKind {
            $($name),*
        }

        impl TokenKind {
            /// The name used for this kind in diagnostics.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$name => $pretty_name),*
                }
            }
        }
    }
}

expand_tokens!(token_kind_enum);

impl TokenKind {
    /// Whitespace, newlines, and comments; skipped by the parser, kept in
    /// the stream for tools that want them.
    pub fn is_trivia(&self) -> bool {
        matches!(
            self,
            TokenKind::Whitespace
                | TokenKind::Newline
                | TokenKind::LineComment
                | TokenKind::BlockComment
                | TokenKind::DocComment
        )
    }

    pub fn is_keyword(&self) -> bool {
        *self >= TokenKind::Const && *self <= TokenKind::TypeBool
    }

    pub fn is_type_keyword(&self) -> bool {
        *self >= TokenKind::TypeInt && *self <= TokenKind::TypeBool
    }

    /// A modifier that may precede a declaration.
    pub fn is_modifier_keyword(&self) -> bool {
        matches!(
            self,
            TokenKind::Const | TokenKind::Inline | TokenKind::Restrict
        )
    }

    pub fn is_error(&self) -> bool {
        *self >= TokenKind::UnterminatedString && *self <= TokenKind::Error
    }
}

/// Extra payload attached to error tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    /// Stable numeric code (1001 string, 1002 escape, 1003/1004 character,
    /// 1005 number, 1006 suffix, 1007 comment, 1009 stray character,
    /// 9001 memory).
    pub code: u32,
    pub category: Category,
    /// Arabic repair suggestion, when one exists.
    pub suggestion: Option<String>,
    /// Up to 30 characters of source immediately before the error point.
    pub before: String,
    /// Up to 30 characters of source immediately after the error point.
    pub after: String,
}

/// A single lexed token. Owns its lexeme; for literal kinds the lexeme is
/// the processed content (escapes decoded, quotes stripped), for everything
/// else the raw source slice.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub lexeme: String,
    pub span: Span,
    pub error: Option<Box<LexError>>,
}

impl Token {
    pub fn error_info(&self) -> Option<&LexError> {
        self.error.as_deref()
    }
}

impl Spanned for Token {
    fn span(&self) -> Span {
        self.span
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} '{}'", self.kind.name(), self.lexeme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_ranges() {
        assert!(TokenKind::Const.is_keyword());
        assert!(TokenKind::TypeBool.is_keyword());
        assert!(!TokenKind::Ident.is_keyword());
        assert!(TokenKind::TypeFloat.is_type_keyword());
        assert!(!TokenKind::Const.is_type_keyword());
        assert!(TokenKind::InvalidSuffix.is_error());
        assert!(!TokenKind::Eof.is_error());
        assert!(TokenKind::DocComment.is_trivia());
    }
}
