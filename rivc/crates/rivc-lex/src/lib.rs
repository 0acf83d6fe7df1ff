//! rivc-lex - Lexer for the Riv language.
//!
//! Turns source text into a flat [`Token`] stream with precise [`Span`]s.
//! The lexer is fail-fast: the first malformed construct aborts with a
//! [`LexError`] carrying the offending span. A well-formed stream always
//! ends with a single [`TokenKind::Eof`] token.
//!
//! # Examples
//!
//! ```
//! use rivc_lex::{lex, TokenKind};
//! use rivc_util::FileId;
//!
//! let tokens = lex("let x = 42;", FileId::DUMMY).unwrap();
//! assert!(matches!(tokens[0].kind, TokenKind::KwLet));
//! assert!(matches!(tokens[3].kind, TokenKind::Int { value: 42, .. }));
//! ```

mod cursor;
mod lexer;

pub use lexer::lex;

use rivc_util::{Span, Symbol};
use thiserror::Error;

/// A single lexed token.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

/// Token kinds of the Riv surface language.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Literals and names
    Ident(Symbol),
    Int { value: u128, suffix: Option<Symbol> },
    Str(Symbol),
    Char(char),
    Underscore,

    // Keywords
    KwFn,
    KwLet,
    KwMut,
    KwConst,
    KwStruct,
    KwEnum,
    KwTrait,
    KwImpl,
    KwFor,
    KwIf,
    KwElse,
    KwLoop,
    KwWhile,
    KwBreak,
    KwContinue,
    KwReturn,
    KwAs,
    KwRef,
    KwTrue,
    KwFalse,
    KwSelfValue,
    KwSelfType,

    // Delimiters
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Comma,
    Semi,
    Colon,
    ColonColon,
    Arrow,
    Dot,

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Shl,
    Shr,
    Bang,
    Eq,
    EqEq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,

    Eof,
}

impl TokenKind {
    /// Human-readable name used in parse error messages.
    pub fn describe(&self) -> String {
        match self {
            TokenKind::Ident(sym) => format!("identifier `{sym}`"),
            TokenKind::Int { value, .. } => format!("integer literal `{value}`"),
            TokenKind::Str(_) => "string literal".to_string(),
            TokenKind::Char(c) => format!("character literal `{c:?}`"),
            TokenKind::Underscore => "`_`".to_string(),
            TokenKind::KwFn => "`fn`".to_string(),
            TokenKind::KwLet => "`let`".to_string(),
            TokenKind::KwMut => "`mut`".to_string(),
            TokenKind::KwConst => "`const`".to_string(),
            TokenKind::KwStruct => "`struct`".to_string(),
            TokenKind::KwEnum => "`enum`".to_string(),
            TokenKind::KwTrait => "`trait`".to_string(),
            TokenKind::KwImpl => "`impl`".to_string(),
            TokenKind::KwFor => "`for`".to_string(),
            TokenKind::KwIf => "`if`".to_string(),
            TokenKind::KwElse => "`else`".to_string(),
            TokenKind::KwLoop => "`loop`".to_string(),
            TokenKind::KwWhile => "`while`".to_string(),
            TokenKind::KwBreak => "`break`".to_string(),
            TokenKind::KwContinue => "`continue`".to_string(),
            TokenKind::KwReturn => "`return`".to_string(),
            TokenKind::KwAs => "`as`".to_string(),
            TokenKind::KwRef => "`ref`".to_string(),
            TokenKind::KwTrue => "`true`".to_string(),
            TokenKind::KwFalse => "`false`".to_string(),
            TokenKind::KwSelfValue => "`self`".to_string(),
            TokenKind::KwSelfType => "`Self`".to_string(),
            TokenKind::LParen => "`(`".to_string(),
            TokenKind::RParen => "`)`".to_string(),
            TokenKind::LBrace => "`{`".to_string(),
            TokenKind::RBrace => "`}`".to_string(),
            TokenKind::LBracket => "`[`".to_string(),
            TokenKind::RBracket => "`]`".to_string(),
            TokenKind::Comma => "`,`".to_string(),
            TokenKind::Semi => "`;`".to_string(),
            TokenKind::Colon => "`:`".to_string(),
            TokenKind::ColonColon => "`::`".to_string(),
            TokenKind::Arrow => "`->`".to_string(),
            TokenKind::Dot => "`.`".to_string(),
            TokenKind::Plus => "`+`".to_string(),
            TokenKind::Minus => "`-`".to_string(),
            TokenKind::Star => "`*`".to_string(),
            TokenKind::Slash => "`/`".to_string(),
            TokenKind::Percent => "`%`".to_string(),
            TokenKind::Caret => "`^`".to_string(),
            TokenKind::Amp => "`&`".to_string(),
            TokenKind::AmpAmp => "`&&`".to_string(),
            TokenKind::Pipe => "`|`".to_string(),
            TokenKind::PipePipe => "`||`".to_string(),
            TokenKind::Shl => "`<<`".to_string(),
            TokenKind::Shr => "`>>`".to_string(),
            TokenKind::Bang => "`!`".to_string(),
            TokenKind::Eq => "`=`".to_string(),
            TokenKind::EqEq => "`==`".to_string(),
            TokenKind::Ne => "`!=`".to_string(),
            TokenKind::Lt => "`<`".to_string(),
            TokenKind::Gt => "`>`".to_string(),
            TokenKind::Le => "`<=`".to_string(),
            TokenKind::Ge => "`>=`".to_string(),
            TokenKind::Eof => "end of input".to_string(),
        }
    }
}

/// A fatal lexing error with its source location.
#[derive(Debug, Error)]
#[error("{kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub span: Span,
}

#[derive(Debug, Error)]
pub enum LexErrorKind {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),

    #[error("unterminated string literal")]
    UnterminatedString,

    #[error("unterminated character literal")]
    UnterminatedChar,

    #[error("unterminated block comment")]
    UnterminatedBlockComment,

    #[error("empty character literal")]
    EmptyChar,

    #[error("character literal may only contain one character")]
    OverlongChar,

    #[error("unknown escape sequence `\\{0}`")]
    UnknownEscape(char),

    #[error("integer literal `{0}` is too large")]
    IntegerOverflow(String),

    #[error("integer literal has no digits")]
    EmptyInteger,

    #[error("invalid integer suffix `{0}`")]
    InvalidSuffix(String),
}
