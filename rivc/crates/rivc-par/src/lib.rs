//! rivc-par - Parser for the Riv language.
//!
//! A hand-written recursive-descent parser over the token stream produced by
//! [`rivc_lex`], with Pratt-style binding powers for expressions. Parsing is
//! fail-fast: the first syntax error aborts with a [`ParseError`] so the
//! semantic core never sees an ambiguous tree.
//!
//! # Examples
//!
//! ```
//! use rivc_util::FileId;
//!
//! let tokens = rivc_lex::lex("fn main() { let x: i32 = 1; }", FileId::DUMMY).unwrap();
//! let ast = rivc_par::parse(tokens).unwrap();
//! assert_eq!(ast.len(), 1);
//! ```

pub mod ast;
mod expr;
mod items;

use rivc_lex::{Token, TokenKind};
use rivc_util::{Span, Symbol};
use thiserror::Error;

use ast::{Ast, Block, Expr, ExprKind, LetStmt, Stmt, StmtKind};

/// A fatal parse error with its source location.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct ParseError {
    pub message: String,
    pub span: Span,
}

pub type PResult<T> = Result<T, ParseError>;

/// Parse a token stream (ending in `Eof`) into an AST.
pub fn parse(tokens: Vec<Token>) -> PResult<Ast> {
    let mut parser = Parser::new(tokens);
    let mut items = Vec::new();
    while !parser.at(TokenKind::Eof) {
        items.push(parser.parse_item(true)?);
    }
    Ok(items)
}

pub(crate) struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    /// Struct literals are suppressed while parsing `if`/`while` conditions;
    /// any bracketing construct restores them.
    pub(crate) no_struct_literal: bool,
}

impl Parser {
    fn new(tokens: Vec<Token>) -> Self {
        debug_assert!(matches!(
            tokens.last().map(|t| t.kind),
            Some(TokenKind::Eof)
        ));
        Self {
            tokens,
            pos: 0,
            no_struct_literal: false,
        }
    }

    pub(crate) fn peek(&self) -> Token {
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self) -> TokenKind {
        self.peek().kind
    }

    pub(crate) fn nth_kind(&self, n: usize) -> TokenKind {
        self.tokens[(self.pos + n).min(self.tokens.len() - 1)].kind
    }

    pub(crate) fn bump(&mut self) -> Token {
        let token = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        token
    }

    /// Check the next token; only meaningful for payload-free kinds.
    pub(crate) fn at(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    pub(crate) fn eat(&mut self, kind: TokenKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        if self.at(kind) {
            Ok(self.bump())
        } else {
            Err(self.error_here(format!(
                "expected {}, found {}",
                kind.describe(),
                self.peek_kind().describe()
            )))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> PResult<(Symbol, Span)> {
        match self.peek_kind() {
            TokenKind::Ident(sym) => {
                let span = self.bump().span;
                Ok((sym, span))
            }
            other => Err(self.error_here(format!(
                "expected identifier, found {}",
                other.describe()
            ))),
        }
    }

    pub(crate) fn error_here(&self, message: String) -> ParseError {
        ParseError {
            message,
            span: self.peek().span,
        }
    }

    pub(crate) fn error_at(&self, span: Span, message: String) -> ParseError {
        ParseError { message, span }
    }

    /// Run `f` with struct literals enabled/disabled, restoring the previous
    /// setting afterwards.
    pub(crate) fn with_struct_literals<T>(
        &mut self,
        allowed: bool,
        f: impl FnOnce(&mut Self) -> PResult<T>,
    ) -> PResult<T> {
        let saved = self.no_struct_literal;
        self.no_struct_literal = !allowed;
        let result = f(self);
        self.no_struct_literal = saved;
        result
    }

    pub(crate) fn at_item_start(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::KwFn
                | TokenKind::KwStruct
                | TokenKind::KwEnum
                | TokenKind::KwTrait
                | TokenKind::KwImpl
                | TokenKind::KwConst
        )
    }

    /// Parse `{ stmt* tail? }`.
    pub(crate) fn parse_block(&mut self) -> PResult<Block> {
        let open = self.expect(TokenKind::LBrace)?;
        self.with_struct_literals(true, |p| p.parse_block_body(open.span))
    }

    fn parse_block_body(&mut self, open_span: Span) -> PResult<Block> {
        let mut stmts = Vec::new();
        let mut tail = None;

        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(self.error_at(open_span, "unclosed block".to_string()));
            }

            // Stray semicolons are empty statements.
            if self.eat(TokenKind::Semi) {
                continue;
            }

            if self.at_item_start() {
                let item = self.parse_item(false)?;
                let span = item.span;
                stmts.push(Stmt {
                    kind: StmtKind::Item(item),
                    span,
                });
                continue;
            }

            if self.at(TokenKind::KwLet) {
                let stmt = self.parse_let()?;
                stmts.push(stmt);
                continue;
            }

            let expr = self.parse_expr()?;
            let span = expr.span;
            if self.eat(TokenKind::Semi) {
                stmts.push(Stmt {
                    kind: StmtKind::Expr(expr),
                    span,
                });
            } else if self.at(TokenKind::RBrace) {
                tail = Some(Box::new(expr));
            } else if is_block_like(&expr) {
                // Block-like expressions terminate a statement on their own.
                stmts.push(Stmt {
                    kind: StmtKind::Expr(expr),
                    span,
                });
            } else {
                return Err(self.error_here(format!(
                    "expected `;`, found {}",
                    self.peek_kind().describe()
                )));
            }
        }

        let close = self.bump();
        Ok(Block {
            stmts,
            tail,
            span: open_span.merge(close.span),
        })
    }

    fn parse_let(&mut self) -> PResult<Stmt> {
        let let_kw = self.expect(TokenKind::KwLet)?;
        let pat = self.parse_pattern()?;
        let ty = if self.eat(TokenKind::Colon) {
            Some(self.parse_type()?)
        } else {
            None
        };
        self.expect(TokenKind::Eq)?;
        let init = self.parse_expr()?;
        let semi = self.expect(TokenKind::Semi)?;
        Ok(Stmt {
            span: let_kw.span.merge(semi.span),
            kind: StmtKind::Let(LetStmt { pat, ty, init }),
        })
    }
}

fn is_block_like(expr: &Expr) -> bool {
    matches!(
        expr.kind,
        ExprKind::Block(_) | ExprKind::If(_) | ExprKind::While { .. } | ExprKind::Loop { .. }
    )
}
