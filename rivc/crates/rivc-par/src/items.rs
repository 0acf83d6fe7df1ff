//! Item, type and pattern parsing.

use rivc_lex::TokenKind;
use rivc_util::Span;

use crate::ast::*;
use crate::{PResult, Parser};

impl Parser {
    /// Parse one item. `top_level` gates `trait` and `impl`, which may not
    /// appear inside blocks.
    pub(crate) fn parse_item(&mut self, top_level: bool) -> PResult<Item> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::KwFn => {
                let f = self.parse_fn_item()?;
                Ok(Item {
                    span: start.merge(f.body.span),
                    kind: ItemKind::Fn(f),
                })
            }
            TokenKind::KwStruct => self.parse_struct(start),
            TokenKind::KwEnum => self.parse_enum(start),
            TokenKind::KwConst => {
                let (c, span) = self.parse_const(start)?;
                Ok(Item {
                    kind: ItemKind::Const(c),
                    span,
                })
            }
            TokenKind::KwTrait if top_level => self.parse_trait(start),
            TokenKind::KwImpl if top_level => self.parse_impl(start),
            TokenKind::KwTrait | TokenKind::KwImpl => Err(self.error_at(
                start,
                "`trait` and `impl` items are only allowed at the top level".to_string(),
            )),
            other => Err(self.error_here(format!("expected item, found {}", other.describe()))),
        }
    }

    fn parse_fn_item(&mut self) -> PResult<FnItem> {
        let (name, self_param, params, ret, _) = self.parse_fn_header()?;
        let body = self.parse_block()?;
        Ok(FnItem {
            name,
            self_param,
            params,
            ret,
            body,
        })
    }

    /// Parse `fn name(params) [-> Type]`, stopping before the body or `;`.
    fn parse_fn_header(
        &mut self,
    ) -> PResult<(
        rivc_util::Symbol,
        Option<SelfParam>,
        Vec<Param>,
        Option<Type>,
        Span,
    )> {
        let kw = self.expect(TokenKind::KwFn)?;
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LParen)?;

        let self_param = self.parse_self_param();
        let mut params = Vec::new();
        if self_param.is_some() && !self.at(TokenKind::RParen) {
            self.expect(TokenKind::Comma)?;
        }
        while !self.at(TokenKind::RParen) {
            let pat = self.parse_pattern()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            params.push(Param { pat, ty });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let ret = if self.eat(TokenKind::Arrow) {
            Some(self.parse_type()?)
        } else {
            None
        };
        let header_span = kw.span.merge(self.peek().span);
        Ok((name, self_param, params, ret, header_span))
    }

    /// Accept `self`, `&self` or `&mut self` at the front of a parameter
    /// list, if present.
    fn parse_self_param(&mut self) -> Option<SelfParam> {
        match (self.peek_kind(), self.nth_kind(1), self.nth_kind(2)) {
            (TokenKind::KwSelfValue, _, _) => {
                let span = self.bump().span;
                Some(SelfParam {
                    is_ref: false,
                    is_mut: false,
                    span,
                })
            }
            (TokenKind::Amp, TokenKind::KwSelfValue, _) => {
                let amp = self.bump();
                let end = self.bump().span;
                Some(SelfParam {
                    is_ref: true,
                    is_mut: false,
                    span: amp.span.merge(end),
                })
            }
            (TokenKind::Amp, TokenKind::KwMut, TokenKind::KwSelfValue) => {
                let amp = self.bump();
                self.bump();
                let end = self.bump().span;
                Some(SelfParam {
                    is_ref: true,
                    is_mut: true,
                    span: amp.span.merge(end),
                })
            }
            _ => None,
        }
    }

    fn parse_struct(&mut self, start: Span) -> PResult<Item> {
        self.expect(TokenKind::KwStruct)?;
        let (name, _) = self.expect_ident()?;

        if self.at(TokenKind::Semi) {
            let end = self.bump().span;
            return Ok(Item {
                kind: ItemKind::Struct(StructItem {
                    name,
                    fields: Vec::new(),
                }),
                span: start.merge(end),
            });
        }

        self.expect(TokenKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let (field_name, field_span) = self.expect_ident()?;
            self.expect(TokenKind::Colon)?;
            let ty = self.parse_type()?;
            fields.push(Field {
                name: field_name,
                ty,
                span: field_span,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Item {
            kind: ItemKind::Struct(StructItem { name, fields }),
            span: start.merge(end),
        })
    }

    fn parse_enum(&mut self, start: Span) -> PResult<Item> {
        self.expect(TokenKind::KwEnum)?;
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;
        let mut variants = Vec::new();
        while !self.at(TokenKind::RBrace) {
            let (variant_name, span) = self.expect_ident()?;
            variants.push(Variant {
                name: variant_name,
                span,
            });
            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Item {
            kind: ItemKind::Enum(EnumItem { name, variants }),
            span: start.merge(end),
        })
    }

    fn parse_const(&mut self, start: Span) -> PResult<(ConstItem, Span)> {
        self.expect(TokenKind::KwConst)?;
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::Colon)?;
        let ty = self.parse_type()?;
        self.expect(TokenKind::Eq)?;
        let value = self.parse_expr()?;
        let end = self.expect(TokenKind::Semi)?.span;
        Ok((ConstItem { name, ty, value }, start.merge(end)))
    }

    fn parse_trait(&mut self, start: Span) -> PResult<Item> {
        self.expect(TokenKind::KwTrait)?;
        let (name, _) = self.expect_ident()?;
        self.expect(TokenKind::LBrace)?;

        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            match self.peek_kind() {
                TokenKind::KwFn => {
                    let sig_start = self.peek().span;
                    let (fn_name, self_param, params, ret, _) = self.parse_fn_header()?;
                    let end = self.expect(TokenKind::Semi)?.span;
                    items.push(TraitMember::Method(FnSig {
                        name: fn_name,
                        self_param,
                        params,
                        ret,
                        span: sig_start.merge(end),
                    }));
                }
                TokenKind::KwConst => {
                    let const_start = self.expect(TokenKind::KwConst)?.span;
                    let (const_name, _) = self.expect_ident()?;
                    self.expect(TokenKind::Colon)?;
                    let ty = self.parse_type()?;
                    let end = self.expect(TokenKind::Semi)?.span;
                    items.push(TraitMember::Const {
                        name: const_name,
                        ty,
                        span: const_start.merge(end),
                    });
                }
                other => {
                    return Err(self.error_here(format!(
                        "expected trait item, found {}",
                        other.describe()
                    )))
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Item {
            kind: ItemKind::Trait(TraitItem { name, items }),
            span: start.merge(end),
        })
    }

    fn parse_impl(&mut self, start: Span) -> PResult<Item> {
        self.expect(TokenKind::KwImpl)?;
        let (first, first_span) = self.expect_ident()?;

        let (trait_name, trait_span, target) = if self.eat(TokenKind::KwFor) {
            let target = self.parse_type()?;
            (Some(first), first_span, target)
        } else {
            let target = Type {
                kind: TypeKind::Named(first),
                span: first_span,
            };
            (None, first_span, target)
        };

        self.expect(TokenKind::LBrace)?;
        let mut items = Vec::new();
        while !self.at(TokenKind::RBrace) {
            match self.peek_kind() {
                TokenKind::KwFn => {
                    let item_start = self.peek().span;
                    let f = self.parse_fn_item()?;
                    let span = item_start.merge(f.body.span);
                    items.push(ImplMember::Fn(f, span));
                }
                TokenKind::KwConst => {
                    let item_start = self.peek().span;
                    let (c, span) = self.parse_const(item_start)?;
                    items.push(ImplMember::Const(c, span));
                }
                other => {
                    return Err(self.error_here(format!(
                        "expected associated item, found {}",
                        other.describe()
                    )))
                }
            }
        }
        let end = self.expect(TokenKind::RBrace)?.span;
        Ok(Item {
            kind: ItemKind::Impl(ImplItem {
                trait_name,
                trait_span,
                target,
                items,
            }),
            span: start.merge(end),
        })
    }

    pub(crate) fn parse_type(&mut self) -> PResult<Type> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::LParen => {
                self.bump();
                let end = self.expect(TokenKind::RParen)?.span;
                Ok(Type {
                    kind: TypeKind::Unit,
                    span: start.merge(end),
                })
            }
            TokenKind::Amp => {
                self.bump();
                let mutable = self.eat(TokenKind::KwMut);
                let inner = self.parse_type()?;
                let span = start.merge(inner.span);
                Ok(Type {
                    kind: TypeKind::Ref {
                        inner: Box::new(inner),
                        mutable,
                    },
                    span,
                })
            }
            TokenKind::LBracket => {
                self.bump();
                let elem = self.with_struct_literals(true, |p| p.parse_type())?;
                self.expect(TokenKind::Semi)?;
                let len = self.with_struct_literals(true, |p| p.parse_expr())?;
                let end = self.expect(TokenKind::RBracket)?.span;
                Ok(Type {
                    kind: TypeKind::Array {
                        elem: Box::new(elem),
                        len: Box::new(len),
                    },
                    span: start.merge(end),
                })
            }
            TokenKind::Underscore => {
                self.bump();
                Ok(Type {
                    kind: TypeKind::Infer,
                    span: start,
                })
            }
            TokenKind::KwSelfType => {
                self.bump();
                Ok(Type {
                    kind: TypeKind::SelfType,
                    span: start,
                })
            }
            TokenKind::Ident(name) => {
                self.bump();
                Ok(Type {
                    kind: TypeKind::Named(name),
                    span: start,
                })
            }
            other => Err(self.error_here(format!("expected type, found {}", other.describe()))),
        }
    }

    pub(crate) fn parse_pattern(&mut self) -> PResult<Pattern> {
        let start = self.peek().span;
        match self.peek_kind() {
            TokenKind::Underscore => {
                self.bump();
                Ok(Pattern {
                    kind: PatternKind::Wildcard,
                    span: start,
                })
            }
            TokenKind::KwMut => {
                self.bump();
                let (name, end) = self.expect_ident()?;
                Ok(Pattern {
                    kind: PatternKind::Ident {
                        name,
                        mutable: true,
                        by_ref: false,
                    },
                    span: start.merge(end),
                })
            }
            TokenKind::KwRef => {
                self.bump();
                let (name, end) = self.expect_ident()?;
                Ok(Pattern {
                    kind: PatternKind::Ident {
                        name,
                        mutable: false,
                        by_ref: true,
                    },
                    span: start.merge(end),
                })
            }
            TokenKind::Amp => {
                self.bump();
                let mutable = self.eat(TokenKind::KwMut);
                let inner = self.parse_pattern()?;
                let span = start.merge(inner.span);
                Ok(Pattern {
                    kind: PatternKind::Ref {
                        inner: Box::new(inner),
                        mutable,
                    },
                    span,
                })
            }
            TokenKind::Ident(name) => {
                self.bump();
                Ok(Pattern {
                    kind: PatternKind::Ident {
                        name,
                        mutable: false,
                        by_ref: false,
                    },
                    span: start,
                })
            }
            other => Err(self.error_here(format!("expected pattern, found {}", other.describe()))),
        }
    }
}
