//! Control-flow linking.
//!
//! Attaches every `return` to its enclosing function and every
//! `break`/`continue` to the innermost enclosing `loop`/`while`. After this
//! pass the checker can treat jump targets as always present.
//!
//! The walk maintains one loop stack per function body; block-level
//! functions live in their own arena slots, so a jump can never leak across
//! a function boundary. A `while` condition is *outside* the loop it
//! belongs to: a `break` there targets the next loop out, or fails.

use tracing::debug;

use crate::error::{SemError, SemResult};
use crate::hir::*;

/// Run the linker over every function body and constant initializer.
pub fn link(program: &mut Program) -> SemResult<()> {
    debug!(funcs = program.funcs.len(), "control-flow linking");

    for fid in program.funcs.indices() {
        let mut body = program.funcs[fid].body.take();
        if let Some(body) = &mut body {
            let mut linker = Linker {
                current_fn: fid,
                loop_stack: Vec::new(),
            };
            linker.walk_expr(body)?;
        }
        program.funcs[fid].body = body;
    }

    // Constant initializers have no enclosing function or loop; any jump in
    // one is fatal here.
    for cid in program.consts.indices() {
        let mut init = std::mem::replace(
            &mut program.consts[cid].init,
            Expr::new(ExprKind::Literal(Lit::Unit), rivc_util::Span::DUMMY),
        );
        let mut linker = ConstLinker;
        linker.walk_expr(&mut init)?;
        program.consts[cid].init = init;
    }

    Ok(())
}

struct Linker {
    current_fn: FuncId,
    loop_stack: Vec<LoopId>,
}

impl Linker {
    fn walk_expr(&mut self, expr: &mut Expr) -> SemResult<()> {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Return { value, target } => {
                *target = Some(self.current_fn);
                if let Some(v) = value {
                    self.walk_expr(v)?;
                }
            }
            ExprKind::Break { value, target } => {
                let Some(&innermost) = self.loop_stack.last() else {
                    return Err(SemError::control_flow(span, "`break` outside of a loop"));
                };
                *target = Some(innermost);
                if let Some(v) = value {
                    self.walk_expr(v)?;
                }
            }
            ExprKind::Continue { target } => {
                let Some(&innermost) = self.loop_stack.last() else {
                    return Err(SemError::control_flow(span, "`continue` outside of a loop"));
                };
                *target = Some(innermost);
            }
            ExprKind::Loop { id, body } => {
                self.loop_stack.push(*id);
                self.walk_expr(body)?;
                self.loop_stack.pop();
            }
            ExprKind::While { id, cond, body } => {
                // The condition runs outside the loop body.
                self.walk_expr(cond)?;
                self.loop_stack.push(*id);
                self.walk_expr(body)?;
                self.loop_stack.pop();
            }
            _ => walk_children(expr, &mut |e| self.walk_expr(e))?,
        }
        Ok(())
    }
}

/// Linker for constant initializers: every jump is an error.
struct ConstLinker;

impl ConstLinker {
    fn walk_expr(&mut self, expr: &mut Expr) -> SemResult<()> {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Return { .. } => Err(SemError::control_flow(
                span,
                "`return` outside of a function",
            )),
            ExprKind::Break { .. } => Err(SemError::control_flow(span, "`break` outside of a loop")),
            ExprKind::Continue { .. } => {
                Err(SemError::control_flow(span, "`continue` outside of a loop"))
            }
            _ => walk_children(expr, &mut |e| self.walk_expr(e)),
        }
    }
}

/// Apply `f` to each direct child expression (not descending into nested
/// item bodies, which live in their own arena slots).
pub(crate) fn walk_children(
    expr: &mut Expr,
    f: &mut impl FnMut(&mut Expr) -> SemResult<()>,
) -> SemResult<()> {
    match &mut expr.kind {
        ExprKind::Literal(_)
        | ExprKind::Unresolved(_)
        | ExprKind::UnresolvedPath { .. }
        | ExprKind::SelfValue
        | ExprKind::Variable(_)
        | ExprKind::ConstUse(_)
        | ExprKind::FuncUse(_)
        | ExprKind::AssocConst { .. }
        | ExprKind::EnumVariant { .. }
        | ExprKind::Underscore
        | ExprKind::Continue { .. } => Ok(()),

        ExprKind::FieldAccess { base, .. } => f(base),
        ExprKind::StructLiteral { fields, .. } => {
            match fields {
                StructLitFields::Syntactic(inits) => {
                    for init in inits {
                        f(&mut init.expr)?;
                    }
                }
                StructLitFields::Canonical(exprs) => {
                    for e in exprs {
                        f(e)?;
                    }
                }
            }
            Ok(())
        }
        ExprKind::ArrayLiteral(elems) => {
            for e in elems {
                f(e)?;
            }
            Ok(())
        }
        ExprKind::ArrayRepeat { elem, count } => {
            f(elem)?;
            if let ArrayCount::Unevaluated(c) = count {
                f(c)?;
            }
            Ok(())
        }
        ExprKind::Index { base, index } => {
            f(base)?;
            f(index)
        }
        ExprKind::Assign { place, value } => {
            f(place)?;
            f(value)
        }
        ExprKind::Unary { operand, .. } => f(operand),
        ExprKind::Binary { lhs, rhs, .. } => {
            f(lhs)?;
            f(rhs)
        }
        ExprKind::Cast { operand, .. } => f(operand),
        ExprKind::Call { callee, args } => {
            f(callee)?;
            for a in args {
                f(a)?;
            }
            Ok(())
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            f(receiver)?;
            for a in args {
                f(a)?;
            }
            Ok(())
        }
        ExprKind::Block(block) => {
            for stmt in &mut block.stmts {
                match stmt {
                    Stmt::Let(l) => {
                        if let Some(TypeAnnotation::Syntactic(node)) = &mut l.ann {
                            walk_type_node_exprs(node, f)?;
                        }
                        f(&mut l.init)?;
                    }
                    Stmt::Expr(e) => f(e)?,
                }
            }
            if let Some(tail) = &mut block.tail {
                f(tail)?;
            }
            Ok(())
        }
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            f(cond)?;
            f(then_branch)?;
            if let Some(e) = else_branch {
                f(e)?;
            }
            Ok(())
        }
        ExprKind::Loop { body, .. } => f(body),
        ExprKind::While { cond, body, .. } => {
            f(cond)?;
            f(body)
        }
        ExprKind::Break { value, .. } | ExprKind::Return { value, .. } => {
            if let Some(v) = value {
                f(v)?;
            }
            Ok(())
        }
    }
}

/// Array lengths inside annotations are expressions too.
fn walk_type_node_exprs(
    node: &mut TypeNode,
    f: &mut impl FnMut(&mut Expr) -> SemResult<()>,
) -> SemResult<()> {
    match &mut node.kind {
        TypeNodeKind::Ref { pointee, .. } => walk_type_node_exprs(pointee, f),
        TypeNodeKind::Array { elem, len } => {
            walk_type_node_exprs(elem, f)?;
            f(len)
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::TyCtxt;
    use rivc_util::FileId;

    fn link_src(src: &str) -> SemResult<Program> {
        let tokens = rivc_lex::lex(src, FileId::DUMMY).unwrap();
        let ast = rivc_par::parse(tokens).unwrap();
        let mut program = crate::lower::lower_program(ast);
        let mut ctxt = TyCtxt::new();
        crate::resolve::resolve(&mut program, &mut ctxt)?;
        link(&mut program)?;
        Ok(program)
    }

    fn main_body(program: &Program) -> &Expr {
        let fid = program.main_func().unwrap();
        program.funcs[fid].body.as_ref().unwrap()
    }

    #[test]
    fn test_return_linked_to_function() {
        let program = link_src("fn main() { return; }").unwrap();
        let fid = program.main_func().unwrap();
        let ExprKind::Block(block) = &main_body(&program).kind else {
            panic!()
        };
        let Stmt::Expr(e) = &block.stmts[0] else {
            panic!()
        };
        let ExprKind::Return { target, .. } = &e.kind else {
            panic!()
        };
        assert_eq!(*target, Some(fid));
    }

    #[test]
    fn test_break_targets_innermost_loop() {
        let program = link_src("fn main() { loop { while true { break; } break; } }").unwrap();
        let ExprKind::Block(block) = &main_body(&program).kind else {
            panic!()
        };
        let Stmt::Expr(outer_loop) = &block.stmts[0] else {
            panic!()
        };
        let ExprKind::Loop { id: outer_id, body } = &outer_loop.kind else {
            panic!()
        };
        let ExprKind::Block(loop_block) = &body.kind else {
            panic!()
        };
        let Stmt::Expr(while_expr) = &loop_block.stmts[0] else {
            panic!()
        };
        let ExprKind::While { id: inner_id, body: while_body, .. } = &while_expr.kind else {
            panic!()
        };
        let ExprKind::Block(while_block) = &while_body.kind else {
            panic!()
        };
        let Stmt::Expr(inner_break) = &while_block.stmts[0] else {
            panic!()
        };
        let ExprKind::Break { target, .. } = &inner_break.kind else {
            panic!()
        };
        assert_eq!(*target, Some(*inner_id));

        let Stmt::Expr(outer_break) = &loop_block.stmts[1] else {
            panic!()
        };
        let ExprKind::Break { target, .. } = &outer_break.kind else {
            panic!()
        };
        assert_eq!(*target, Some(*outer_id));
    }

    #[test]
    fn test_jumps_outside_loop_are_fatal() {
        for src in [
            "fn main() { break; }",
            "fn main() { continue; }",
            "fn main() { if true { break; } }",
        ] {
            let err = link_src(src).unwrap_err();
            assert_eq!(err.kind, crate::error::ErrorKind::ControlFlow, "{src}");
        }
    }

    #[test]
    fn test_break_in_while_condition_is_outside() {
        let err = link_src("fn main() { while { break; true } { } }").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ControlFlow);
    }

    #[test]
    fn test_jump_in_const_init_is_fatal() {
        let err = link_src("const N: i32 = return;").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ControlFlow);
    }

    #[test]
    fn test_nested_fn_does_not_inherit_loop() {
        let err = link_src("fn main() { loop { fn inner() { break; } } }").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::ControlFlow);
    }
}
