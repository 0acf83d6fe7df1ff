//! The scanner: longest-match tokenization over a [`Cursor`].

use rivc_util::{FileId, Span, Symbol};

use crate::cursor::{Cursor, EOF_CHAR};
use crate::{LexError, LexErrorKind, Token, TokenKind};

/// Lex a whole source file into tokens, ending with [`TokenKind::Eof`].
pub fn lex(source: &str, file_id: FileId) -> Result<Vec<Token>, LexError> {
    let mut lexer = Lexer::new(source, file_id);
    lexer.run()?;
    Ok(lexer.tokens)
}

struct Lexer<'a> {
    cursor: Cursor<'a>,
    file_id: FileId,
    tokens: Vec<Token>,
    // Start position of the token being scanned.
    start_offset: usize,
    start_line: u32,
    start_column: u32,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str, file_id: FileId) -> Self {
        Self {
            cursor: Cursor::new(source),
            file_id,
            tokens: Vec::new(),
            start_offset: 0,
            start_line: 1,
            start_column: 1,
        }
    }

    fn run(&mut self) -> Result<(), LexError> {
        loop {
            self.skip_trivia()?;
            self.mark_start();
            if self.cursor.is_eof() {
                self.push(TokenKind::Eof);
                return Ok(());
            }
            let kind = self.next_kind()?;
            self.push(kind);
        }
    }

    fn mark_start(&mut self) {
        self.start_offset = self.cursor.offset();
        self.start_line = self.cursor.line();
        self.start_column = self.cursor.column();
    }

    fn span(&self) -> Span {
        Span::with_file(
            self.start_offset,
            self.cursor.offset(),
            self.file_id,
            self.start_line,
            self.start_column,
        )
    }

    fn push(&mut self, kind: TokenKind) {
        let span = self.span();
        self.tokens.push(Token { kind, span });
    }

    fn err(&self, kind: LexErrorKind) -> LexError {
        LexError {
            kind,
            span: self.span(),
        }
    }

    /// Skip whitespace, line comments and (nesting) block comments.
    fn skip_trivia(&mut self) -> Result<(), LexError> {
        loop {
            let ch = self.cursor.peek();
            if ch.is_whitespace() {
                self.cursor.bump();
            } else if ch == '/' && self.cursor.peek_second() == '/' {
                self.cursor.bump_while(|c| c != '\n');
            } else if ch == '/' && self.cursor.peek_second() == '*' {
                self.mark_start();
                self.cursor.bump();
                self.cursor.bump();
                let mut depth = 1u32;
                while depth > 0 {
                    match (self.cursor.peek(), self.cursor.peek_second()) {
                        (EOF_CHAR, _) if self.cursor.is_eof() => {
                            return Err(self.err(LexErrorKind::UnterminatedBlockComment));
                        }
                        ('/', '*') => {
                            self.cursor.bump();
                            self.cursor.bump();
                            depth += 1;
                        }
                        ('*', '/') => {
                            self.cursor.bump();
                            self.cursor.bump();
                            depth -= 1;
                        }
                        _ => {
                            self.cursor.bump();
                        }
                    }
                }
            } else {
                return Ok(());
            }
        }
    }

    fn next_kind(&mut self) -> Result<TokenKind, LexError> {
        let ch = self.cursor.peek();

        if is_ident_start(ch) {
            return Ok(self.ident_or_keyword());
        }
        if ch.is_ascii_digit() {
            return self.number();
        }
        if ch == '"' {
            return self.string_literal();
        }
        if ch == '\'' {
            return self.char_literal();
        }

        self.cursor.bump();
        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semi,
            '.' => TokenKind::Dot,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            ':' => self.either(':', TokenKind::ColonColon, TokenKind::Colon),
            '-' => self.either('>', TokenKind::Arrow, TokenKind::Minus),
            '&' => self.either('&', TokenKind::AmpAmp, TokenKind::Amp),
            '|' => self.either('|', TokenKind::PipePipe, TokenKind::Pipe),
            '!' => self.either('=', TokenKind::Ne, TokenKind::Bang),
            '=' => self.either('=', TokenKind::EqEq, TokenKind::Eq),
            '<' => {
                if self.cursor.peek() == '<' {
                    self.cursor.bump();
                    TokenKind::Shl
                } else {
                    self.either('=', TokenKind::Le, TokenKind::Lt)
                }
            }
            '>' => {
                if self.cursor.peek() == '>' {
                    self.cursor.bump();
                    TokenKind::Shr
                } else {
                    self.either('=', TokenKind::Ge, TokenKind::Gt)
                }
            }
            other => return Err(self.err(LexErrorKind::UnexpectedChar(other))),
        };
        Ok(kind)
    }

    /// Consume `next` and return `matched` if it follows, else `single`.
    fn either(&mut self, next: char, matched: TokenKind, single: TokenKind) -> TokenKind {
        if self.cursor.peek() == next {
            self.cursor.bump();
            matched
        } else {
            single
        }
    }

    fn ident_or_keyword(&mut self) -> TokenKind {
        let start = self.cursor.offset();
        let mut text = String::new();
        while is_ident_continue(self.cursor.peek()) {
            text.push(self.cursor.bump().unwrap());
        }
        debug_assert!(self.cursor.offset() > start);

        match text.as_str() {
            "_" => TokenKind::Underscore,
            "fn" => TokenKind::KwFn,
            "let" => TokenKind::KwLet,
            "mut" => TokenKind::KwMut,
            "const" => TokenKind::KwConst,
            "struct" => TokenKind::KwStruct,
            "enum" => TokenKind::KwEnum,
            "trait" => TokenKind::KwTrait,
            "impl" => TokenKind::KwImpl,
            "for" => TokenKind::KwFor,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "loop" => TokenKind::KwLoop,
            "while" => TokenKind::KwWhile,
            "break" => TokenKind::KwBreak,
            "continue" => TokenKind::KwContinue,
            "return" => TokenKind::KwReturn,
            "as" => TokenKind::KwAs,
            "ref" => TokenKind::KwRef,
            "true" => TokenKind::KwTrue,
            "false" => TokenKind::KwFalse,
            "self" => TokenKind::KwSelfValue,
            "Self" => TokenKind::KwSelfType,
            _ => TokenKind::Ident(Symbol::intern(&text)),
        }
    }

    fn number(&mut self) -> Result<TokenKind, LexError> {
        let radix = if self.cursor.peek() == '0' {
            match self.cursor.peek_second() {
                'x' | 'X' => {
                    self.cursor.bump();
                    self.cursor.bump();
                    16
                }
                'o' | 'O' => {
                    self.cursor.bump();
                    self.cursor.bump();
                    8
                }
                'b' | 'B' => {
                    self.cursor.bump();
                    self.cursor.bump();
                    2
                }
                _ => 10,
            }
        } else {
            10
        };

        let mut digits = String::new();
        while self.cursor.peek().is_digit(radix) || self.cursor.peek() == '_' {
            let ch = self.cursor.bump().unwrap();
            if ch != '_' {
                digits.push(ch);
            }
        }
        if digits.is_empty() {
            return Err(self.err(LexErrorKind::EmptyInteger));
        }

        // An identifier glued onto the digits is a type suffix.
        let mut suffix = String::new();
        while is_ident_continue(self.cursor.peek()) {
            suffix.push(self.cursor.bump().unwrap());
        }
        let suffix = match suffix.as_str() {
            "" => None,
            "i32" | "u32" | "isize" | "usize" => Some(Symbol::intern(&suffix)),
            other => return Err(self.err(LexErrorKind::InvalidSuffix(other.to_string()))),
        };

        let value = u128::from_str_radix(&digits, radix)
            .map_err(|_| self.err(LexErrorKind::IntegerOverflow(digits.clone())))?;

        Ok(TokenKind::Int { value, suffix })
    }

    fn string_literal(&mut self) -> Result<TokenKind, LexError> {
        self.cursor.bump(); // opening quote
        let mut text = String::new();
        loop {
            if self.cursor.is_eof() {
                return Err(self.err(LexErrorKind::UnterminatedString));
            }
            match self.cursor.bump().unwrap() {
                '"' => break,
                '\\' => text.push(self.escape()?),
                ch => text.push(ch),
            }
        }
        Ok(TokenKind::Str(Symbol::intern(&text)))
    }

    fn char_literal(&mut self) -> Result<TokenKind, LexError> {
        self.cursor.bump(); // opening quote
        if self.cursor.peek() == '\'' {
            self.cursor.bump();
            return Err(self.err(LexErrorKind::EmptyChar));
        }
        if self.cursor.is_eof() {
            return Err(self.err(LexErrorKind::UnterminatedChar));
        }
        let ch = match self.cursor.bump().unwrap() {
            '\\' => self.escape()?,
            ch => ch,
        };
        match self.cursor.peek() {
            '\'' => {
                self.cursor.bump();
                Ok(TokenKind::Char(ch))
            }
            EOF_CHAR if self.cursor.is_eof() => Err(self.err(LexErrorKind::UnterminatedChar)),
            _ => {
                // Consume up to the closing quote so the span covers the
                // whole malformed literal.
                self.cursor.bump_while(|c| c != '\'' && c != '\n');
                if self.cursor.peek() == '\'' {
                    self.cursor.bump();
                    Err(self.err(LexErrorKind::OverlongChar))
                } else {
                    Err(self.err(LexErrorKind::UnterminatedChar))
                }
            }
        }
    }

    fn escape(&mut self) -> Result<char, LexError> {
        if self.cursor.is_eof() {
            return Err(self.err(LexErrorKind::UnterminatedString));
        }
        match self.cursor.bump().unwrap() {
            'n' => Ok('\n'),
            'r' => Ok('\r'),
            't' => Ok('\t'),
            '\\' => Ok('\\'),
            '\'' => Ok('\''),
            '"' => Ok('"'),
            '0' => Ok('\0'),
            other => Err(self.err(LexErrorKind::UnknownEscape(other))),
        }
    }
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphabetic()
}

fn is_ident_continue(ch: char) -> bool {
    ch == '_' || ch.is_ascii_alphanumeric()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        lex(src, FileId::DUMMY)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(kinds(""), vec![TokenKind::Eof]);
        assert_eq!(kinds("   \n\t "), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("fn main"),
            vec![
                TokenKind::KwFn,
                TokenKind::Ident(Symbol::intern("main")),
                TokenKind::Eof
            ]
        );
        assert_eq!(kinds("_")[0], TokenKind::Underscore);
        assert_eq!(kinds("self Self")[..2], [TokenKind::KwSelfValue, TokenKind::KwSelfType]);
    }

    #[test]
    fn test_integer_literals() {
        assert_eq!(kinds("42")[0], TokenKind::Int { value: 42, suffix: None });
        assert_eq!(
            kinds("42u32")[0],
            TokenKind::Int { value: 42, suffix: Some(Symbol::intern("u32")) }
        );
        assert_eq!(kinds("0xff")[0], TokenKind::Int { value: 255, suffix: None });
        assert_eq!(kinds("0b1010")[0], TokenKind::Int { value: 10, suffix: None });
        assert_eq!(kinds("1_000_000")[0], TokenKind::Int { value: 1_000_000, suffix: None });
    }

    #[test]
    fn test_invalid_suffix_rejected() {
        let err = lex("1i64", FileId::DUMMY).unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::InvalidSuffix(_)));
    }

    #[test]
    fn test_string_and_char_literals() {
        assert_eq!(
            kinds("\"a\\nb\"")[0],
            TokenKind::Str(Symbol::intern("a\nb"))
        );
        assert_eq!(kinds("'x'")[0], TokenKind::Char('x'));
        assert_eq!(kinds("'\\''")[0], TokenKind::Char('\''));
    }

    #[test]
    fn test_unterminated_string() {
        let err = lex("\"abc", FileId::DUMMY).unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::UnterminatedString));
    }

    #[test]
    fn test_operators_longest_match() {
        assert_eq!(
            kinds("== = != ! <= < >> >"),
            vec![
                TokenKind::EqEq,
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Bang,
                TokenKind::Le,
                TokenKind::Lt,
                TokenKind::Shr,
                TokenKind::Gt,
                TokenKind::Eof
            ]
        );
        assert_eq!(
            kinds(":: : -> - && &"),
            vec![
                TokenKind::ColonColon,
                TokenKind::Colon,
                TokenKind::Arrow,
                TokenKind::Minus,
                TokenKind::AmpAmp,
                TokenKind::Amp,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(kinds("// all gone\n1"), vec![TokenKind::Int { value: 1, suffix: None }, TokenKind::Eof]);
        assert_eq!(kinds("/* a /* nested */ b */2"), vec![TokenKind::Int { value: 2, suffix: None }, TokenKind::Eof]);
        let err = lex("/* never closed", FileId::DUMMY).unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::UnterminatedBlockComment));
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = lex("let\nx", FileId::DUMMY).unwrap();
        assert_eq!(tokens[0].span.line, 1);
        assert_eq!(tokens[1].span.line, 2);
        assert_eq!(tokens[1].span.column, 1);
    }

    #[test]
    fn test_unexpected_char() {
        let err = lex("let @", FileId::DUMMY).unwrap_err();
        assert!(matches!(err.kind, LexErrorKind::UnexpectedChar('@')));
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        const KEYWORDS: &[&str] = &[
            "fn", "let", "mut", "const", "struct", "enum", "trait", "impl", "for", "if", "else",
            "loop", "while", "break", "continue", "return", "as", "ref", "true", "false", "self",
            "Self", "_",
        ];

        proptest! {
            #[test]
            fn any_identifier_lexes_to_one_token(
                name in "[a-z][a-z0-9_]{0,12}".prop_filter("not a keyword", |s| !KEYWORDS.contains(&s.as_str()))
            ) {
                let tokens = lex(&name, FileId::DUMMY).unwrap();
                prop_assert_eq!(tokens.len(), 2);
                prop_assert_eq!(tokens[0].kind, TokenKind::Ident(Symbol::intern(&name)));
                prop_assert_eq!(tokens[1].kind, TokenKind::Eof);
            }

            #[test]
            fn any_decimal_literal_round_trips(value in 0u64..u64::MAX) {
                let src = value.to_string();
                let tokens = lex(&src, FileId::DUMMY).unwrap();
                prop_assert_eq!(tokens[0].kind, TokenKind::Int { value: value as u128, suffix: None });
            }
        }
    }
}
