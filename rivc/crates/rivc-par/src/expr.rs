//! Expression parsing: Pratt binding powers over the unary/postfix core.

use rivc_lex::TokenKind;
use rivc_util::Span;

use crate::ast::*;
use crate::{PResult, Parser};

/// Binding power of a binary operator; higher binds tighter.
fn binary_bp(kind: TokenKind) -> Option<(BinOp, u8)> {
    let pair = match kind {
        TokenKind::PipePipe => (BinOp::Or, 1),
        TokenKind::AmpAmp => (BinOp::And, 2),
        TokenKind::EqEq => (BinOp::Eq, 3),
        TokenKind::Ne => (BinOp::Ne, 3),
        TokenKind::Lt => (BinOp::Lt, 3),
        TokenKind::Gt => (BinOp::Gt, 3),
        TokenKind::Le => (BinOp::Le, 3),
        TokenKind::Ge => (BinOp::Ge, 3),
        TokenKind::Pipe => (BinOp::BitOr, 4),
        TokenKind::Caret => (BinOp::BitXor, 5),
        TokenKind::Amp => (BinOp::BitAnd, 6),
        TokenKind::Shl => (BinOp::Shl, 7),
        TokenKind::Shr => (BinOp::Shr, 7),
        TokenKind::Plus => (BinOp::Add, 8),
        TokenKind::Minus => (BinOp::Sub, 8),
        TokenKind::Star => (BinOp::Mul, 9),
        TokenKind::Slash => (BinOp::Div, 9),
        TokenKind::Percent => (BinOp::Rem, 9),
        _ => return None,
    };
    Some(pair)
}

/// Binding power of an `as` cast; tighter than any binary operator.
const CAST_BP: u8 = 10;

impl Parser {
    pub(crate) fn parse_expr(&mut self) -> PResult<Expr> {
        let lhs = self.parse_binary(1)?;
        if self.at(TokenKind::Eq) {
            self.bump();
            let value = self.parse_expr()?;
            let span = lhs.span.merge(value.span);
            return Ok(Expr {
                kind: ExprKind::Assign {
                    place: Box::new(lhs),
                    value: Box::new(value),
                },
                span,
            });
        }
        Ok(lhs)
    }

    fn parse_binary(&mut self, min_bp: u8) -> PResult<Expr> {
        let mut lhs = self.parse_unary()?;
        loop {
            if self.at(TokenKind::KwAs) {
                if CAST_BP < min_bp {
                    break;
                }
                self.bump();
                let ty = self.parse_type()?;
                let span = lhs.span.merge(ty.span);
                lhs = Expr {
                    kind: ExprKind::Cast {
                        operand: Box::new(lhs),
                        ty,
                    },
                    span,
                };
                continue;
            }

            let Some((op, bp)) = binary_bp(self.peek_kind()) else {
                break;
            };
            if bp < min_bp {
                break;
            }
            self.bump();
            let rhs = self.parse_binary(bp + 1)?;
            let span = lhs.span.merge(rhs.span);
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let start = self.peek().span;
        let op = match self.peek_kind() {
            TokenKind::Minus => Some(UnOp::Neg),
            TokenKind::Bang => Some(UnOp::Not),
            TokenKind::Star => Some(UnOp::Deref),
            TokenKind::Amp => {
                self.bump();
                let mutable = self.eat(TokenKind::KwMut);
                let operand = self.parse_unary()?;
                let span = start.merge(operand.span);
                return Ok(Expr {
                    kind: ExprKind::Unary {
                        op: UnOp::Ref { mutable },
                        operand: Box::new(operand),
                    },
                    span,
                });
            }
            TokenKind::AmpAmp => {
                // `&&x` is two reference operators glued by the lexer.
                self.bump();
                let mutable = self.eat(TokenKind::KwMut);
                let operand = self.parse_unary()?;
                let inner_span = start.merge(operand.span);
                let inner = Expr {
                    kind: ExprKind::Unary {
                        op: UnOp::Ref { mutable },
                        operand: Box::new(operand),
                    },
                    span: inner_span,
                };
                return Ok(Expr {
                    kind: ExprKind::Unary {
                        op: UnOp::Ref { mutable: false },
                        operand: Box::new(inner),
                    },
                    span: inner_span,
                });
            }
            _ => None,
        };

        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            let span = start.merge(operand.span);
            return Ok(Expr {
                kind: ExprKind::Unary {
                    op,
                    operand: Box::new(operand),
                },
                span,
            });
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            match self.peek_kind() {
                TokenKind::Dot => {
                    self.bump();
                    let (name, name_span) = self.expect_ident()?;
                    if self.at(TokenKind::LParen) {
                        let (args, end) = self.parse_call_args()?;
                        let span = expr.span.merge(end);
                        expr = Expr {
                            kind: ExprKind::MethodCall {
                                receiver: Box::new(expr),
                                method: name,
                                method_span: name_span,
                                args,
                            },
                            span,
                        };
                    } else {
                        let span = expr.span.merge(name_span);
                        expr = Expr {
                            kind: ExprKind::FieldAccess {
                                base: Box::new(expr),
                                field: name,
                                field_span: name_span,
                            },
                            span,
                        };
                    }
                }
                TokenKind::LParen => {
                    let (args, end) = self.parse_call_args()?;
                    let span = expr.span.merge(end);
                    expr = Expr {
                        kind: ExprKind::Call {
                            callee: Box::new(expr),
                            args,
                        },
                        span,
                    };
                }
                TokenKind::LBracket => {
                    self.bump();
                    let index = self.with_struct_literals(true, |p| p.parse_expr())?;
                    let end = self.expect(TokenKind::RBracket)?.span;
                    let span = expr.span.merge(end);
                    expr = Expr {
                        kind: ExprKind::Index {
                            base: Box::new(expr),
                            index: Box::new(index),
                        },
                        span,
                    };
                }
                _ => break,
            }
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> PResult<(Vec<Expr>, Span)> {
        self.expect(TokenKind::LParen)?;
        let mut args = Vec::new();
        self.with_struct_literals(true, |p| {
            while !p.at(TokenKind::RParen) {
                args.push(p.parse_expr()?);
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        let end = self.expect(TokenKind::RParen)?.span;
        Ok((args, end))
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Int { value, suffix } => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Int { value, suffix },
                    span: start,
                })
            }
            TokenKind::Str(sym) => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Str(sym),
                    span: start,
                })
            }
            TokenKind::Char(c) => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Char(c),
                    span: start,
                })
            }
            TokenKind::KwTrue => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Bool(true),
                    span: start,
                })
            }
            TokenKind::KwFalse => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Bool(false),
                    span: start,
                })
            }
            TokenKind::Underscore => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Underscore,
                    span: start,
                })
            }
            TokenKind::KwSelfValue => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::SelfValue,
                    span: start,
                })
            }
            TokenKind::KwSelfType => {
                self.bump();
                self.expect(TokenKind::ColonColon)?;
                let (name, end) = self.expect_ident()?;
                Ok(Expr {
                    kind: ExprKind::Path {
                        qualifier: PathQualifier::SelfType,
                        qualifier_span: start,
                        name,
                    },
                    span: start.merge(end),
                })
            }
            TokenKind::Ident(sym) => {
                self.bump();
                if self.at(TokenKind::ColonColon) {
                    self.bump();
                    let (name, end) = self.expect_ident()?;
                    return Ok(Expr {
                        kind: ExprKind::Path {
                            qualifier: PathQualifier::Named(sym),
                            qualifier_span: start,
                            name,
                        },
                        span: start.merge(end),
                    });
                }
                if self.at(TokenKind::LBrace) && !self.no_struct_literal {
                    return self.parse_struct_literal(sym, start);
                }
                Ok(Expr {
                    kind: ExprKind::Name(sym),
                    span: start,
                })
            }
            TokenKind::LParen => {
                self.bump();
                if self.at(TokenKind::RParen) {
                    let end = self.bump().span;
                    return Ok(Expr {
                        kind: ExprKind::Unit,
                        span: start.merge(end),
                    });
                }
                let inner = self.with_struct_literals(true, |p| p.parse_expr())?;
                let end = self.expect(TokenKind::RParen)?.span;
                Ok(Expr {
                    kind: inner.kind,
                    span: start.merge(end),
                })
            }
            TokenKind::LBracket => self.parse_array(start),
            TokenKind::LBrace => {
                let block = self.parse_block()?;
                let span = block.span;
                Ok(Expr {
                    kind: ExprKind::Block(block),
                    span,
                })
            }
            TokenKind::KwIf => self.parse_if(start),
            TokenKind::KwWhile => {
                self.bump();
                let cond = self.with_struct_literals(false, |p| p.parse_expr())?;
                let body = self.parse_block()?;
                let span = start.merge(body.span);
                Ok(Expr {
                    kind: ExprKind::While {
                        cond: Box::new(cond),
                        body,
                    },
                    span,
                })
            }
            TokenKind::KwLoop => {
                self.bump();
                let body = self.parse_block()?;
                let span = start.merge(body.span);
                Ok(Expr {
                    kind: ExprKind::Loop { body },
                    span,
                })
            }
            TokenKind::KwBreak => {
                self.bump();
                let value = if self.can_begin_expr() {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                let span = match &value {
                    Some(v) => start.merge(v.span),
                    None => start,
                };
                Ok(Expr {
                    kind: ExprKind::Break(value),
                    span,
                })
            }
            TokenKind::KwContinue => {
                self.bump();
                Ok(Expr {
                    kind: ExprKind::Continue,
                    span: start,
                })
            }
            TokenKind::KwReturn => {
                self.bump();
                let value = if self.can_begin_expr() {
                    Some(Box::new(self.parse_expr()?))
                } else {
                    None
                };
                let span = match &value {
                    Some(v) => start.merge(v.span),
                    None => start,
                };
                Ok(Expr {
                    kind: ExprKind::Return(value),
                    span,
                })
            }
            other => {
                Err(self.error_here(format!("expected expression, found {}", other.describe())))
            }
        }
    }

    fn parse_if(&mut self, start: Span) -> PResult<Expr> {
        self.expect(TokenKind::KwIf)?;
        let cond = self.with_struct_literals(false, |p| p.parse_expr())?;
        let then_block = self.parse_block()?;
        let mut span = start.merge(then_block.span);

        let else_branch = if self.eat(TokenKind::KwElse) {
            let branch = if self.at(TokenKind::KwIf) {
                let else_start = self.peek().span;
                self.parse_if(else_start)?
            } else {
                let block = self.parse_block()?;
                let block_span = block.span;
                Expr {
                    kind: ExprKind::Block(block),
                    span: block_span,
                }
            };
            span = span.merge(branch.span);
            Some(Box::new(branch))
        } else {
            None
        };

        Ok(Expr {
            kind: ExprKind::If(IfExpr {
                cond: Box::new(cond),
                then_block,
                else_branch,
            }),
            span,
        })
    }

    /// `[a, b, c]` or `[elem; count]`.
    fn parse_array(&mut self, start: Span) -> PResult<Expr> {
        self.expect(TokenKind::LBracket)?;
        self.with_struct_literals(true, |p| {
            if p.at(TokenKind::RBracket) {
                let end = p.bump().span;
                return Ok(Expr {
                    kind: ExprKind::Array(Vec::new()),
                    span: start.merge(end),
                });
            }

            let first = p.parse_expr()?;
            if p.eat(TokenKind::Semi) {
                let count = p.parse_expr()?;
                let end = p.expect(TokenKind::RBracket)?.span;
                return Ok(Expr {
                    kind: ExprKind::Repeat {
                        elem: Box::new(first),
                        count: Box::new(count),
                    },
                    span: start.merge(end),
                });
            }

            let mut elems = vec![first];
            while p.eat(TokenKind::Comma) {
                if p.at(TokenKind::RBracket) {
                    break;
                }
                elems.push(p.parse_expr()?);
            }
            let end = p.expect(TokenKind::RBracket)?.span;
            Ok(Expr {
                kind: ExprKind::Array(elems),
                span: start.merge(end),
            })
        })
    }

    fn parse_struct_literal(&mut self, name: rivc_util::Symbol, name_span: Span) -> PResult<Expr> {
        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        self.with_struct_literals(true, |p| {
            while !p.at(TokenKind::RBrace) {
                let (field_name, field_span) = p.expect_ident()?;
                let expr = if p.eat(TokenKind::Colon) {
                    p.parse_expr()?
                } else {
                    // Field init shorthand: `P { x }`.
                    Expr {
                        kind: ExprKind::Name(field_name),
                        span: field_span,
                    }
                };
                fields.push(FieldInit {
                    name: field_name,
                    expr,
                    span: field_span,
                });
                if !p.eat(TokenKind::Comma) {
                    break;
                }
            }
            Ok(())
        })?;
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Expr {
            kind: ExprKind::StructLit {
                name,
                name_span,
                fields,
            },
            span: name_span.merge(end),
        })
    }

    /// Can the next token begin an expression? Used for optional
    /// `break`/`return` values.
    fn can_begin_expr(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Ident(_)
                | TokenKind::Int { .. }
                | TokenKind::Str(_)
                | TokenKind::Char(_)
                | TokenKind::Underscore
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::KwSelfValue
                | TokenKind::KwSelfType
                | TokenKind::Minus
                | TokenKind::Bang
                | TokenKind::Star
                | TokenKind::Amp
                | TokenKind::AmpAmp
                | TokenKind::LParen
                | TokenKind::LBracket
                | TokenKind::LBrace
                | TokenKind::KwIf
                | TokenKind::KwWhile
                | TokenKind::KwLoop
                | TokenKind::KwBreak
                | TokenKind::KwContinue
                | TokenKind::KwReturn
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivc_util::FileId;

    fn parse_one_expr(src: &str) -> Expr {
        let wrapped = format!("fn t() {{ {src} }}");
        let tokens = rivc_lex::lex(&wrapped, FileId::DUMMY).unwrap();
        let ast = crate::parse(tokens).unwrap();
        let ItemKind::Fn(f) = ast.into_iter().next().unwrap().kind else {
            panic!("expected fn")
        };
        *f.body.tail.expect("expected tail expression")
    }

    #[test]
    fn test_precedence_mul_over_add() {
        let e = parse_one_expr("1 + 2 * 3");
        let ExprKind::Binary { op: BinOp::Add, rhs, .. } = e.kind else {
            panic!("expected +")
        };
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Mul, .. }));
    }

    #[test]
    fn test_precedence_cmp_over_logic() {
        let e = parse_one_expr("a < b && c < d");
        let ExprKind::Binary { op: BinOp::And, lhs, rhs } = e.kind else {
            panic!("expected &&")
        };
        assert!(matches!(lhs.kind, ExprKind::Binary { op: BinOp::Lt, .. }));
        assert!(matches!(rhs.kind, ExprKind::Binary { op: BinOp::Lt, .. }));
    }

    #[test]
    fn test_cast_binds_tighter_than_add() {
        let e = parse_one_expr("a + b as i32");
        let ExprKind::Binary { op: BinOp::Add, rhs, .. } = e.kind else {
            panic!("expected +")
        };
        assert!(matches!(rhs.kind, ExprKind::Cast { .. }));
    }

    #[test]
    fn test_assignment_is_right_assoc_and_loose() {
        let e = parse_one_expr("a = b + 1");
        let ExprKind::Assign { value, .. } = e.kind else {
            panic!("expected =")
        };
        assert!(matches!(value.kind, ExprKind::Binary { op: BinOp::Add, .. }));
    }

    #[test]
    fn test_postfix_chain() {
        let e = parse_one_expr("a.b.c(1)[2]");
        let ExprKind::Index { base, .. } = e.kind else {
            panic!("expected index")
        };
        let ExprKind::MethodCall { receiver, method, args, .. } = base.kind else {
            panic!("expected method call")
        };
        assert_eq!(method.as_str(), "c");
        assert_eq!(args.len(), 1);
        assert!(matches!(receiver.kind, ExprKind::FieldAccess { .. }));
    }

    #[test]
    fn test_unary_chain() {
        let e = parse_one_expr("-*x");
        let ExprKind::Unary { op: UnOp::Neg, operand } = e.kind else {
            panic!("expected -")
        };
        assert!(matches!(operand.kind, ExprKind::Unary { op: UnOp::Deref, .. }));
    }

    #[test]
    fn test_double_ref() {
        let e = parse_one_expr("&&x");
        let ExprKind::Unary { op: UnOp::Ref { mutable: false }, operand } = e.kind else {
            panic!("expected &")
        };
        assert!(matches!(
            operand.kind,
            ExprKind::Unary { op: UnOp::Ref { mutable: false }, .. }
        ));
    }

    #[test]
    fn test_paths() {
        let e = parse_one_expr("Point::ORIGIN");
        assert!(matches!(
            e.kind,
            ExprKind::Path { qualifier: PathQualifier::Named(_), .. }
        ));
        let e = parse_one_expr("Self::make()");
        let ExprKind::Call { callee, .. } = e.kind else {
            panic!("expected call")
        };
        assert!(matches!(
            callee.kind,
            ExprKind::Path { qualifier: PathQualifier::SelfType, .. }
        ));
    }

    #[test]
    fn test_if_else_chain() {
        let e = parse_one_expr("if a { 1 } else if b { 2 } else { 3 }");
        let ExprKind::If(if_expr) = e.kind else {
            panic!("expected if")
        };
        let else_branch = if_expr.else_branch.unwrap();
        assert!(matches!(else_branch.kind, ExprKind::If(_)));
    }

    #[test]
    fn test_break_with_value() {
        let e = parse_one_expr("loop { break 42; }");
        let ExprKind::Loop { body } = e.kind else {
            panic!("expected loop")
        };
        let StmtKind::Expr(inner) = &body.stmts[0].kind else {
            panic!("expected expr stmt")
        };
        assert!(matches!(&inner.kind, ExprKind::Break(Some(_))));
    }

    #[test]
    fn test_struct_literal_shorthand() {
        let e = parse_one_expr("Point { x, y: 2 }");
        let ExprKind::StructLit { fields, .. } = e.kind else {
            panic!("expected struct literal")
        };
        assert_eq!(fields.len(), 2);
        assert!(matches!(fields[0].expr.kind, ExprKind::Name(_)));
    }

    #[test]
    fn test_array_repeat() {
        let e = parse_one_expr("[0; 4]");
        assert!(matches!(e.kind, ExprKind::Repeat { .. }));
        let e = parse_one_expr("[1, 2, 3]");
        assert!(matches!(e.kind, ExprKind::Array(v) if v.len() == 3));
    }

    #[test]
    fn test_unit_literal() {
        let e = parse_one_expr("()");
        assert!(matches!(e.kind, ExprKind::Unit));
    }
}
