//! Exit placement check.
//!
//! The built-in `exit()` may appear exactly once, as the final statement
//! (or trailing expression) of the top-level `main` function body. Any
//! other occurrence (another function, a method, a nested function, a
//! non-final position, or a bare mention without a call) is fatal.

use tracing::debug;

use crate::error::{SemError, SemResult};
use crate::hir::*;

/// Walk the whole program and enforce the placement rule for `exit_fn`.
pub fn check_exit(program: &Program, exit_fn: FuncId) -> SemResult<()> {
    debug!("exit placement check");
    let main = program.main_func();

    for fid in program.funcs.indices() {
        let Some(body) = &program.funcs[fid].body else {
            continue;
        };
        if Some(fid) == main {
            walk_main_body(body, exit_fn)?;
        } else {
            walk_forbidden(body, exit_fn)?;
        }
    }
    for konst in program.consts.iter() {
        walk_forbidden(&konst.init, exit_fn)?;
    }
    Ok(())
}

/// Main's body: everything is forbidden except the one final slot.
fn walk_main_body(body: &Expr, exit_fn: FuncId) -> SemResult<()> {
    let ExprKind::Block(block) = &body.kind else {
        return Err(SemError::invariant(body.span, "function body is not a block"));
    };

    match &block.tail {
        Some(tail) => {
            for stmt in &block.stmts {
                walk_stmt_forbidden(stmt, exit_fn)?;
            }
            walk_final_position(tail, exit_fn)
        }
        None => {
            let Some((last, init)) = block.stmts.split_last() else {
                return Ok(());
            };
            for stmt in init {
                walk_stmt_forbidden(stmt, exit_fn)?;
            }
            match last {
                Stmt::Expr(e) => walk_final_position(e, exit_fn),
                Stmt::Let(_) => walk_stmt_forbidden(last, exit_fn),
            }
        }
    }
}

/// The one permitted slot: a direct `exit(...)` call is fine (its
/// arguments are not), anything else falls back to the forbidden walk.
fn walk_final_position(expr: &Expr, exit_fn: FuncId) -> SemResult<()> {
    if let ExprKind::Call { callee, args } = &expr.kind {
        if matches!(callee.kind, ExprKind::FuncUse(fid) if fid == exit_fn) {
            for arg in args {
                walk_forbidden(arg, exit_fn)?;
            }
            return Ok(());
        }
    }
    walk_forbidden(expr, exit_fn)
}

fn walk_stmt_forbidden(stmt: &Stmt, exit_fn: FuncId) -> SemResult<()> {
    match stmt {
        Stmt::Let(l) => walk_forbidden(&l.init, exit_fn),
        Stmt::Expr(e) => walk_forbidden(e, exit_fn),
    }
}

fn walk_forbidden(expr: &Expr, exit_fn: FuncId) -> SemResult<()> {
    if let ExprKind::FuncUse(fid) = expr.kind {
        if fid == exit_fn {
            return Err(SemError::control_flow(
                expr.span,
                "`exit` may only appear as the final statement of `main`",
            ));
        }
    }
    for_each_child(expr, &mut |child| walk_forbidden(child, exit_fn))
}

/// Immutable traversal over direct child expressions.
fn for_each_child(expr: &Expr, f: &mut impl FnMut(&Expr) -> SemResult<()>) -> SemResult<()> {
    match &expr.kind {
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
                        f(&init.expr)?;
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
            for stmt in &block.stmts {
                match stmt {
                    Stmt::Let(l) => f(&l.init)?,
                    Stmt::Expr(e) => f(e)?,
                }
            }
            if let Some(tail) = &block.tail {
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
