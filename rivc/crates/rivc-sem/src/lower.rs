//! AST to HIR conversion.
//!
//! A mechanical descent: every AST node maps to exactly one HIR node, every
//! cross-reference becomes an `Unresolved` variant, every type annotation is
//! wrapped as [`TypeAnnotation::Syntactic`]. Nothing here can fail; all
//! semantic judgement is left to the later passes.
//!
//! The converter is also where arena identities are born: items (including
//! block-level ones) are pushed into the program arenas, and each
//! `loop`/`while` receives its [`LoopId`].

use rivc_par::ast;

use crate::hir::*;
use crate::ty::PrimKind;

/// Convert a parsed program into its initial HIR form.
pub fn lower_program(items: ast::Ast) -> Program {
    let mut lowerer = Lowerer {
        program: Program::default(),
    };
    let mut top = Vec::new();
    for item in items {
        top.push(lowerer.lower_item(item));
    }
    lowerer.program.items = top;
    lowerer.program
}

struct Lowerer {
    program: Program,
}

impl Lowerer {
    fn next_loop_id(&mut self) -> LoopId {
        let id = LoopId(self.program.loop_count);
        self.program.loop_count += 1;
        id
    }

    fn lower_item(&mut self, item: ast::Item) -> ItemRef {
        let span = item.span;
        match item.kind {
            ast::ItemKind::Fn(f) => ItemRef::Func(self.lower_fn(f, span)),
            ast::ItemKind::Const(c) => ItemRef::Const(self.lower_const(c, span)),
            ast::ItemKind::Struct(s) => {
                let def = StructDef {
                    name: s.name,
                    fields: s
                        .fields
                        .into_iter()
                        .map(|f| FieldDef {
                            name: f.name,
                            span: f.span,
                            ann: TypeAnnotation::Syntactic(self.lower_type(f.ty)),
                        })
                        .collect(),
                    struct_id: None,
                    span,
                };
                ItemRef::Struct(self.program.struct_defs.push(def))
            }
            ast::ItemKind::Enum(e) => {
                let def = EnumDef {
                    name: e.name,
                    variants: e
                        .variants
                        .into_iter()
                        .map(|v| VariantDef {
                            name: v.name,
                            span: v.span,
                        })
                        .collect(),
                    enum_id: None,
                    span,
                };
                ItemRef::Enum(self.program.enum_defs.push(def))
            }
            ast::ItemKind::Trait(t) => {
                let mut methods = Vec::new();
                let mut consts = Vec::new();
                for member in t.items {
                    match member {
                        ast::TraitMember::Method(sig) => methods.push(TraitMethodSig {
                            name: sig.name,
                            self_param: sig.self_param.map(|sp| self.lower_self_param(sp)),
                            param_anns: sig
                                .params
                                .into_iter()
                                .map(|p| TypeAnnotation::Syntactic(self.lower_type(p.ty)))
                                .collect(),
                            ret_ann: sig
                                .ret
                                .map(|ty| TypeAnnotation::Syntactic(self.lower_type(ty))),
                            span: sig.span,
                        }),
                        ast::TraitMember::Const { name, ty, span } => {
                            consts.push(TraitConstSig {
                                name,
                                ann: TypeAnnotation::Syntactic(self.lower_type(ty)),
                                span,
                            })
                        }
                    }
                }
                let def = TraitDef {
                    name: t.name,
                    methods,
                    consts,
                    span,
                };
                ItemRef::Trait(self.program.traits.push(def))
            }
            ast::ItemKind::Impl(im) => {
                let mut funcs = Vec::new();
                let mut consts = Vec::new();
                for member in im.items {
                    match member {
                        ast::ImplMember::Fn(f, fn_span) => funcs.push(self.lower_fn(f, fn_span)),
                        ast::ImplMember::Const(c, const_span) => {
                            consts.push(self.lower_const(c, const_span))
                        }
                    }
                }
                let block = ImplBlock {
                    trait_name: im.trait_name,
                    trait_span: im.trait_span,
                    trait_ref: None,
                    target_ann: TypeAnnotation::Syntactic(self.lower_type(im.target)),
                    target: None,
                    funcs,
                    consts,
                    span,
                };
                ItemRef::Impl(self.program.impls.push(block))
            }
        }
    }

    fn lower_fn(&mut self, f: ast::FnItem, span: rivc_util::Span) -> FuncId {
        let mut params = Vec::new();
        let mut param_anns = Vec::new();
        for p in f.params {
            params.push(self.lower_pattern(p.pat));
            param_anns.push(TypeAnnotation::Syntactic(self.lower_type(p.ty)));
        }
        debug_assert_eq!(params.len(), param_anns.len());

        let body_span = f.body.span;
        let body = self.lower_block(f.body);
        let func = Function {
            name: f.name,
            self_param: f.self_param.map(|sp| self.lower_self_param(sp)),
            params,
            param_anns,
            ret_ann: f
                .ret
                .map(|ty| TypeAnnotation::Syntactic(self.lower_type(ty))),
            body: Some(Expr::new(ExprKind::Block(body), body_span)),
            locals: rivc_util::IndexVec::new(),
            builtin: None,
            span,
        };
        self.program.funcs.push(func)
    }

    fn lower_self_param(&mut self, sp: ast::SelfParam) -> SelfParam {
        SelfParam {
            is_ref: sp.is_ref,
            is_mut: sp.is_mut,
            local: None,
            span: sp.span,
        }
    }

    fn lower_const(&mut self, c: ast::ConstItem, span: rivc_util::Span) -> ConstId {
        let def = ConstDef {
            name: c.name,
            ann: TypeAnnotation::Syntactic(self.lower_type(c.ty)),
            init: self.lower_expr(c.value),
            value: None,
            span,
        };
        self.program.consts.push(def)
    }

    fn lower_block(&mut self, block: ast::Block) -> Block {
        let mut items = Vec::new();
        let mut stmts = Vec::new();
        for stmt in block.stmts {
            match stmt.kind {
                ast::StmtKind::Item(item) => items.push(self.lower_item(item)),
                ast::StmtKind::Let(l) => stmts.push(Stmt::Let(LetStmt {
                    pat: self.lower_pattern(l.pat),
                    ann: l
                        .ty
                        .map(|ty| TypeAnnotation::Syntactic(self.lower_type(ty))),
                    init: self.lower_expr(l.init),
                    span: stmt.span,
                })),
                ast::StmtKind::Expr(e) => stmts.push(Stmt::Expr(self.lower_expr(e))),
            }
        }
        Block {
            items,
            stmts,
            tail: block.tail.map(|e| Box::new(self.lower_expr(*e))),
            span: block.span,
        }
    }

    fn lower_expr(&mut self, expr: ast::Expr) -> Expr {
        let span = expr.span;
        let kind = match expr.kind {
            ast::ExprKind::Int { value, suffix } => ExprKind::Literal(Lit::Int {
                value,
                suffix: suffix.and_then(|s| PrimKind::from_suffix(s.as_str())),
                negative: false,
            }),
            ast::ExprKind::Bool(b) => ExprKind::Literal(Lit::Bool(b)),
            ast::ExprKind::Char(c) => ExprKind::Literal(Lit::Char(c)),
            ast::ExprKind::Str(s) => ExprKind::Literal(Lit::Str(s)),
            ast::ExprKind::Unit => ExprKind::Literal(Lit::Unit),
            ast::ExprKind::Name(name) => ExprKind::Unresolved(name),
            ast::ExprKind::SelfValue => ExprKind::SelfValue,
            ast::ExprKind::Path {
                qualifier,
                qualifier_span,
                name,
            } => ExprKind::UnresolvedPath {
                qualifier: match qualifier {
                    ast::PathQualifier::Named(sym) => PathQual::Named(sym),
                    ast::PathQualifier::SelfType => PathQual::SelfType,
                },
                qualifier_span,
                name,
            },
            ast::ExprKind::Underscore => ExprKind::Underscore,
            ast::ExprKind::Unary { op, operand } => ExprKind::Unary {
                op: lower_unop(op),
                operand: Box::new(self.lower_expr(*operand)),
            },
            ast::ExprKind::Binary { op, lhs, rhs } => ExprKind::Binary {
                op: lower_binop(op),
                lhs: Box::new(self.lower_expr(*lhs)),
                rhs: Box::new(self.lower_expr(*rhs)),
            },
            ast::ExprKind::Assign { place, value } => ExprKind::Assign {
                place: Box::new(self.lower_expr(*place)),
                value: Box::new(self.lower_expr(*value)),
            },
            ast::ExprKind::Cast { operand, ty } => ExprKind::Cast {
                operand: Box::new(self.lower_expr(*operand)),
                ann: TypeAnnotation::Syntactic(self.lower_type(ty)),
            },
            ast::ExprKind::Call { callee, args } => ExprKind::Call {
                callee: Box::new(self.lower_expr(*callee)),
                args: args.into_iter().map(|a| self.lower_expr(a)).collect(),
            },
            ast::ExprKind::MethodCall {
                receiver,
                method,
                method_span,
                args,
            } => ExprKind::MethodCall {
                receiver: Box::new(self.lower_expr(*receiver)),
                method,
                method_span,
                resolved: None,
                args: args.into_iter().map(|a| self.lower_expr(a)).collect(),
            },
            ast::ExprKind::FieldAccess {
                base,
                field,
                field_span,
            } => ExprKind::FieldAccess {
                base: Box::new(self.lower_expr(*base)),
                field,
                field_span,
                index: None,
            },
            ast::ExprKind::Index { base, index } => ExprKind::Index {
                base: Box::new(self.lower_expr(*base)),
                index: Box::new(self.lower_expr(*index)),
            },
            ast::ExprKind::Array(elems) => ExprKind::ArrayLiteral(
                elems.into_iter().map(|e| self.lower_expr(e)).collect(),
            ),
            ast::ExprKind::Repeat { elem, count } => ExprKind::ArrayRepeat {
                elem: Box::new(self.lower_expr(*elem)),
                count: ArrayCount::Unevaluated(Box::new(self.lower_expr(*count))),
            },
            ast::ExprKind::StructLit {
                name,
                name_span,
                fields,
            } => ExprKind::StructLiteral {
                name,
                name_span,
                struct_id: None,
                fields: StructLitFields::Syntactic(
                    fields
                        .into_iter()
                        .map(|f| FieldInit {
                            name: f.name,
                            span: f.span,
                            expr: self.lower_expr(f.expr),
                        })
                        .collect(),
                ),
            },
            ast::ExprKind::Block(block) => ExprKind::Block(self.lower_block(block)),
            ast::ExprKind::If(if_expr) => {
                let then_span = if_expr.then_block.span;
                let then_block = self.lower_block(if_expr.then_block);
                ExprKind::If {
                    cond: Box::new(self.lower_expr(*if_expr.cond)),
                    then_branch: Box::new(Expr::new(ExprKind::Block(then_block), then_span)),
                    else_branch: if_expr
                        .else_branch
                        .map(|e| Box::new(self.lower_expr(*e))),
                }
            }
            ast::ExprKind::While { cond, body } => {
                let id = self.next_loop_id();
                let body_span = body.span;
                let body = self.lower_block(body);
                ExprKind::While {
                    id,
                    cond: Box::new(self.lower_expr(*cond)),
                    body: Box::new(Expr::new(ExprKind::Block(body), body_span)),
                }
            }
            ast::ExprKind::Loop { body } => {
                let id = self.next_loop_id();
                let body_span = body.span;
                let body = self.lower_block(body);
                ExprKind::Loop {
                    id,
                    body: Box::new(Expr::new(ExprKind::Block(body), body_span)),
                }
            }
            ast::ExprKind::Break(value) => ExprKind::Break {
                value: value.map(|e| Box::new(self.lower_expr(*e))),
                target: None,
            },
            ast::ExprKind::Continue => ExprKind::Continue { target: None },
            ast::ExprKind::Return(value) => ExprKind::Return {
                value: value.map(|e| Box::new(self.lower_expr(*e))),
                target: None,
            },
        };
        Expr::new(kind, span)
    }

    fn lower_pattern(&mut self, pat: ast::Pattern) -> Pattern {
        let span = pat.span;
        let kind = match pat.kind {
            ast::PatternKind::Wildcard => PatternKind::Wildcard,
            ast::PatternKind::Ident {
                name,
                mutable,
                by_ref,
            } => PatternKind::Binding(BindingDef::Unresolved {
                name,
                is_mut: mutable,
                is_ref: by_ref,
            }),
            ast::PatternKind::Ref { inner, mutable } => PatternKind::Ref {
                inner: Box::new(self.lower_pattern(*inner)),
                mutable,
            },
        };
        Pattern { kind, span }
    }

    fn lower_type(&mut self, ty: ast::Type) -> TypeNode {
        let span = ty.span;
        let kind = match ty.kind {
            ast::TypeKind::Unit => TypeNodeKind::Unit,
            ast::TypeKind::Named(name) => match PrimKind::from_name(name.as_str()) {
                Some(prim) => TypeNodeKind::Prim(prim),
                None => TypeNodeKind::Named { name, target: None },
            },
            ast::TypeKind::SelfType => TypeNodeKind::SelfType { target: None },
            ast::TypeKind::Ref { inner, mutable } => TypeNodeKind::Ref {
                pointee: Box::new(self.lower_type(*inner)),
                mutable,
            },
            ast::TypeKind::Array { elem, len } => TypeNodeKind::Array {
                elem: Box::new(self.lower_type(*elem)),
                len: Box::new(self.lower_expr(*len)),
            },
            ast::TypeKind::Infer => TypeNodeKind::Infer,
        };
        TypeNode { kind, span }
    }
}

fn lower_unop(op: ast::UnOp) -> UnOp {
    match op {
        ast::UnOp::Neg => UnOp::Neg,
        ast::UnOp::Not => UnOp::Not,
        ast::UnOp::Deref => UnOp::Deref,
        ast::UnOp::Ref { mutable } => UnOp::Ref { mutable },
    }
}

fn lower_binop(op: ast::BinOp) -> BinOp {
    match op {
        ast::BinOp::Add => BinOp::Add,
        ast::BinOp::Sub => BinOp::Sub,
        ast::BinOp::Mul => BinOp::Mul,
        ast::BinOp::Div => BinOp::Div,
        ast::BinOp::Rem => BinOp::Rem,
        ast::BinOp::BitAnd => BinOp::BitAnd,
        ast::BinOp::BitOr => BinOp::BitOr,
        ast::BinOp::BitXor => BinOp::BitXor,
        ast::BinOp::Shl => BinOp::Shl,
        ast::BinOp::Shr => BinOp::Shr,
        ast::BinOp::Eq => BinOp::Eq,
        ast::BinOp::Ne => BinOp::Ne,
        ast::BinOp::Lt => BinOp::Lt,
        ast::BinOp::Gt => BinOp::Gt,
        ast::BinOp::Le => BinOp::Le,
        ast::BinOp::Ge => BinOp::Ge,
        ast::BinOp::And => BinOp::And,
        ast::BinOp::Or => BinOp::Or,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivc_util::FileId;

    fn lower_src(src: &str) -> Program {
        let tokens = rivc_lex::lex(src, FileId::DUMMY).unwrap();
        let ast = rivc_par::parse(tokens).unwrap();
        lower_program(ast)
    }

    #[test]
    fn test_empty_program() {
        let program = lower_src("");
        assert!(program.items.is_empty());
        assert!(program.funcs.is_empty());
    }

    #[test]
    fn test_identifiers_left_unresolved() {
        let program = lower_src("fn f(x: i32) -> i32 { x }");
        let ItemRef::Func(id) = program.items[0] else {
            panic!("expected fn")
        };
        let func = &program.funcs[id];
        let Some(body) = &func.body else {
            panic!("expected body")
        };
        let ExprKind::Block(block) = &body.kind else {
            panic!("expected block")
        };
        let tail = block.tail.as_ref().unwrap();
        assert!(matches!(tail.kind, ExprKind::Unresolved(_)));
        assert!(matches!(func.param_anns[0], TypeAnnotation::Syntactic(_)));
        assert!(matches!(
            func.params[0].kind,
            PatternKind::Binding(BindingDef::Unresolved { .. })
        ));
    }

    #[test]
    fn test_loops_get_distinct_ids() {
        let program = lower_src("fn f() { loop { } while true { } }");
        assert_eq!(program.loop_count, 2);
    }

    #[test]
    fn test_block_items_are_hoisted() {
        let program = lower_src("fn f() { fn g() { } const N: i32 = 1; }");
        assert_eq!(program.funcs.len(), 2);
        assert_eq!(program.consts.len(), 1);
        let ItemRef::Func(f_id) = program.items[0] else {
            panic!("expected fn")
        };
        let Some(body) = &program.funcs[f_id].body else {
            panic!("expected body")
        };
        let ExprKind::Block(block) = &body.kind else {
            panic!("expected block")
        };
        assert_eq!(block.items.len(), 2);
    }

    #[test]
    fn test_struct_literal_stays_syntactic() {
        let program = lower_src("struct P { x: i32 } fn f() { let p = P { x: 1 }; }");
        let ItemRef::Func(f_id) = program.items[1] else {
            panic!("expected fn")
        };
        let Some(body) = &program.funcs[f_id].body else {
            panic!("expected body")
        };
        let ExprKind::Block(block) = &body.kind else {
            panic!("expected block")
        };
        let Stmt::Let(l) = &block.stmts[0] else {
            panic!("expected let")
        };
        let ExprKind::StructLiteral { fields, struct_id, .. } = &l.init.kind else {
            panic!("expected struct literal")
        };
        assert!(struct_id.is_none());
        assert!(matches!(fields, StructLitFields::Syntactic(f) if f.len() == 1));
    }

    #[test]
    fn test_prim_names_become_prim_nodes() {
        let program = lower_src("fn f(a: i32, s: String, p: Point) { }");
        let ItemRef::Func(id) = program.items[0] else {
            panic!("expected fn")
        };
        let anns = &program.funcs[id].param_anns;
        let TypeAnnotation::Syntactic(node) = &anns[0] else {
            panic!()
        };
        assert!(matches!(node.kind, TypeNodeKind::Prim(PrimKind::I32)));
        let TypeAnnotation::Syntactic(node) = &anns[1] else {
            panic!()
        };
        assert!(matches!(node.kind, TypeNodeKind::Prim(PrimKind::Str)));
        let TypeAnnotation::Syntactic(node) = &anns[2] else {
            panic!()
        };
        assert!(matches!(node.kind, TypeNodeKind::Named { target: None, .. }));
    }
}
