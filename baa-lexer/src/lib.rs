//! The Baa lexer: converts preprocessed wide-character source into a
//! stream of Arabic-aware tokens with spans, rich error tokens, and
//! post-error resynchronisation.

pub mod keywords;
mod lexer;
mod scanners;
pub mod token;

pub use lexer::Lexer;
pub use token::{LexError, Token, TokenKind};
