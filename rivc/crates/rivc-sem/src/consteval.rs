//! Compile-time constant evaluation.
//!
//! The evaluator folds the const-expression subset: literals, unary and
//! binary operators, and references to other constants. Results are
//! memoized per constant in a [`ConstCache`]; an in-progress set detects
//! cycles (`const N: usize = N;`). Anything outside the subset is a
//! "non-const expression" error, and arithmetic that leaves the range of
//! its integer kind is a fatal overflow, not a wrap.
//!
//! Integer literals without a suffix stay *unconstrained* while folding and
//! are committed to a kind by the expectation at the use site (the declared
//! type of a constant, `usize` for an array length). `isize`/`usize` are
//! 64-bit, matching the compilation target.

use rivc_util::{FxHashMap, FxHashSet, IndexVec, Span, Symbol};

use crate::error::{SemError, SemResult};
use crate::hir::{ArrayCount, BinOp, ConstDef, ConstId, Expr, ExprKind, Lit, TypeAnnotation,
    TypeNodeKind, UnOp};
use crate::ty::{PrimKind, TyCtxt};

/// A computed constant value.
#[derive(Clone, Debug, PartialEq)]
pub enum ConstValue {
    Int { kind: PrimKind, value: i128 },
    Bool(bool),
    Char(char),
    Str(Symbol),
}

impl ConstValue {
    /// Integer payload, if this is an integer.
    pub fn as_int(&self) -> Option<i128> {
        match self {
            ConstValue::Int { value, .. } => Some(*value),
            _ => None,
        }
    }
}

/// Memoization table shared by one pipeline run.
#[derive(Debug, Default)]
pub struct ConstCache {
    values: FxHashMap<ConstId, ConstValue>,
    in_progress: FxHashSet<ConstId>,
}

impl ConstCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: ConstId) -> Option<&ConstValue> {
        self.values.get(&id)
    }
}

/// Evaluate a constant definition, memoized.
pub fn eval_const(
    cache: &mut ConstCache,
    consts: &IndexVec<ConstId, ConstDef>,
    ctxt: &TyCtxt,
    id: ConstId,
) -> SemResult<ConstValue> {
    if let Some(value) = cache.values.get(&id) {
        return Ok(value.clone());
    }
    let def = &consts[id];
    if !cache.in_progress.insert(id) {
        return Err(SemError::konst(
            def.span,
            format!("cycle detected while evaluating constant `{}`", def.name),
        ));
    }
    let expected = ann_int_kind(&def.ann, ctxt);
    let result = eval_expr(cache, consts, ctxt, &def.init, expected);
    cache.in_progress.remove(&id);
    let value = result?;
    cache.values.insert(id, value.clone());
    Ok(value)
}

/// Evaluate an arbitrary const expression under an integer-kind
/// expectation.
pub fn eval_expr(
    cache: &mut ConstCache,
    consts: &IndexVec<ConstId, ConstDef>,
    ctxt: &TyCtxt,
    expr: &Expr,
    expected: Option<PrimKind>,
) -> SemResult<ConstValue> {
    let pending = eval(cache, consts, ctxt, expr, expected)?;
    commit(pending, expected, expr.span)
}

/// Evaluate an array-length expression: expected `usize`, non-negative.
pub fn eval_array_len(
    cache: &mut ConstCache,
    consts: &IndexVec<ConstId, ConstDef>,
    ctxt: &TyCtxt,
    expr: &Expr,
) -> SemResult<usize> {
    let value = eval_expr(cache, consts, ctxt, expr, Some(PrimKind::Usize))?;
    match value {
        ConstValue::Int {
            kind: PrimKind::Usize,
            value,
        } if value >= 0 => Ok(value as usize),
        ConstValue::Int { kind, .. } => Err(SemError::konst(
            expr.span,
            format!("array length must be `usize`, found `{}`", kind.name()),
        )),
        _ => Err(SemError::konst(expr.span, "array length must be `usize`")),
    }
}

/// Working value: integers may still lack a kind.
enum Pending {
    Int { kind: Option<PrimKind>, value: i128 },
    Bool(bool),
    Char(char),
    Str(Symbol),
}

fn commit(pending: Pending, expected: Option<PrimKind>, span: Span) -> SemResult<ConstValue> {
    match pending {
        Pending::Int { kind, value } => {
            let kind = match (kind, expected) {
                (Some(k), Some(e)) if k != e => {
                    return Err(SemError::konst(
                        span,
                        format!("expected `{}`, found `{}`", e.name(), k.name()),
                    ))
                }
                (Some(k), _) => k,
                (None, Some(e)) if e.is_integer() => e,
                (None, Some(e)) => {
                    return Err(SemError::konst(
                        span,
                        format!("expected `{}`, found an integer", e.name()),
                    ))
                }
                (None, None) => {
                    return Err(SemError::konst(
                        span,
                        "cannot infer integer type of constant expression",
                    ))
                }
            };
            check_range(kind, value, span)?;
            Ok(ConstValue::Int { kind, value })
        }
        Pending::Bool(b) => match expected {
            Some(e) if e != PrimKind::Bool => Err(SemError::konst(
                span,
                format!("expected `{}`, found `bool`", e.name()),
            )),
            _ => Ok(ConstValue::Bool(b)),
        },
        Pending::Char(c) => match expected {
            Some(e) if e != PrimKind::Char => Err(SemError::konst(
                span,
                format!("expected `{}`, found `char`", e.name()),
            )),
            _ => Ok(ConstValue::Char(c)),
        },
        Pending::Str(s) => match expected {
            Some(e) if e != PrimKind::Str => Err(SemError::konst(
                span,
                format!("expected `{}`, found `String`", e.name()),
            )),
            _ => Ok(ConstValue::Str(s)),
        },
    }
}

fn eval(
    cache: &mut ConstCache,
    consts: &IndexVec<ConstId, ConstDef>,
    ctxt: &TyCtxt,
    expr: &Expr,
    expected: Option<PrimKind>,
) -> SemResult<Pending> {
    let span = expr.span;
    match &expr.kind {
        ExprKind::Literal(lit) => eval_literal(*lit, span),

        ExprKind::ConstUse(id) => Ok(from_value(eval_const(cache, consts, ctxt, *id)?)),
        ExprKind::AssocConst { konst, .. } => {
            Ok(from_value(eval_const(cache, consts, ctxt, *konst)?))
        }

        ExprKind::Unary { op, operand } => {
            let operand_val = eval(cache, consts, ctxt, operand, expected)?;
            apply_unary(*op, operand_val, span)
        }

        ExprKind::Binary { op, lhs, rhs } => {
            eval_binary(cache, consts, ctxt, *op, lhs, rhs, expected, span)
        }

        ExprKind::Cast { operand, ann } => {
            let target = ann_int_kind(ann, ctxt).ok_or_else(|| {
                SemError::konst(span, "only integer casts are allowed in constant expressions")
            })?;
            let value = eval(cache, consts, ctxt, operand, None)?;
            match value {
                Pending::Int { value, .. } => Ok(Pending::Int {
                    kind: Some(target),
                    value: wrap_to(target, value),
                }),
                _ => Err(SemError::konst(span, "invalid cast in constant expression")),
            }
        }

        _ => Err(SemError::konst(
            span,
            "non-const expression in const context",
        )),
    }
}

fn eval_literal(lit: Lit, span: Span) -> SemResult<Pending> {
    match lit {
        Lit::Int {
            value,
            suffix,
            negative,
        } => {
            if value > i128::MAX as u128 {
                return Err(SemError::konst(span, "integer literal is too large"));
            }
            let mut value = value as i128;
            if negative {
                value = -value;
            }
            Ok(Pending::Int {
                kind: suffix,
                value,
            })
        }
        Lit::Bool(b) => Ok(Pending::Bool(b)),
        Lit::Char(c) => Ok(Pending::Char(c)),
        Lit::Str(s) => Ok(Pending::Str(s)),
        Lit::Unit => Err(SemError::konst(span, "non-const expression in const context")),
    }
}

fn from_value(value: ConstValue) -> Pending {
    match value {
        ConstValue::Int { kind, value } => Pending::Int {
            kind: Some(kind),
            value,
        },
        ConstValue::Bool(b) => Pending::Bool(b),
        ConstValue::Char(c) => Pending::Char(c),
        ConstValue::Str(s) => Pending::Str(s),
    }
}

fn apply_unary(op: UnOp, operand: Pending, span: Span) -> SemResult<Pending> {
    match (op, operand) {
        (UnOp::Not, Pending::Bool(b)) => Ok(Pending::Bool(!b)),
        (UnOp::Not, Pending::Int { kind, value }) => {
            let value = match kind {
                Some(k) if !k.is_signed_integer() => wrap_to(k, !value),
                _ => !value,
            };
            Ok(Pending::Int { kind, value })
        }
        (UnOp::Neg, Pending::Int { kind, value }) => {
            if let Some(k) = kind {
                if !k.is_signed_integer() {
                    return Err(SemError::konst(
                        span,
                        format!("cannot negate a value of type `{}`", k.name()),
                    ));
                }
            }
            let value = value
                .checked_neg()
                .ok_or_else(|| SemError::konst(span, "overflow in constant expression"))?;
            Ok(Pending::Int { kind, value })
        }
        _ => Err(SemError::konst(
            span,
            "invalid operand in constant expression",
        )),
    }
}

#[allow(clippy::too_many_arguments)]
fn eval_binary(
    cache: &mut ConstCache,
    consts: &IndexVec<ConstId, ConstDef>,
    ctxt: &TyCtxt,
    op: BinOp,
    lhs: &Expr,
    rhs: &Expr,
    expected: Option<PrimKind>,
    span: Span,
) -> SemResult<Pending> {
    // Logical operators short-circuit even at compile time.
    if op.is_logical() {
        let l = match eval(cache, consts, ctxt, lhs, None)? {
            Pending::Bool(b) => b,
            _ => {
                return Err(SemError::konst(
                    lhs.span,
                    "logical operator requires `bool` operands",
                ))
            }
        };
        let short = match op {
            BinOp::And => !l,
            BinOp::Or => l,
            _ => unreachable!("checked is_logical"),
        };
        if short {
            return Ok(Pending::Bool(l));
        }
        let r = match eval(cache, consts, ctxt, rhs, None)? {
            Pending::Bool(b) => b,
            _ => {
                return Err(SemError::konst(
                    rhs.span,
                    "logical operator requires `bool` operands",
                ))
            }
        };
        return Ok(Pending::Bool(r));
    }

    let operand_expect = if op.is_arithmetic() { expected } else { None };
    let l = eval(cache, consts, ctxt, lhs, operand_expect)?;
    let r = eval(cache, consts, ctxt, rhs, operand_expect)?;

    if op.is_comparison() {
        return compare(op, l, r, span);
    }

    let (Pending::Int { kind: lk, value: lv }, Pending::Int { kind: rk, value: rv }) = (l, r)
    else {
        return Err(SemError::konst(
            span,
            format!("operator `{}` requires integer operands", op.describe()),
        ));
    };
    let kind = unify_kinds(lk, rk, span)?;

    let value = match op {
        BinOp::Add => lv.checked_add(rv),
        BinOp::Sub => lv.checked_sub(rv),
        BinOp::Mul => lv.checked_mul(rv),
        BinOp::Div => {
            if rv == 0 {
                return Err(SemError::konst(span, "division by zero in constant expression"));
            }
            lv.checked_div(rv)
        }
        BinOp::Rem => {
            if rv == 0 {
                return Err(SemError::konst(span, "division by zero in constant expression"));
            }
            lv.checked_rem(rv)
        }
        BinOp::BitAnd => Some(lv & rv),
        BinOp::BitOr => Some(lv | rv),
        BinOp::BitXor => Some(lv ^ rv),
        BinOp::Shl | BinOp::Shr => {
            if !(0..128).contains(&rv) {
                return Err(SemError::konst(span, "shift amount out of range"));
            }
            match op {
                BinOp::Shl => lv.checked_shl(rv as u32),
                _ => lv.checked_shr(rv as u32),
            }
        }
        _ => unreachable!("comparison and logical handled above"),
    }
    .ok_or_else(|| SemError::konst(span, "overflow in constant expression"))?;

    if let Some(k) = kind {
        check_range(k, value, span)?;
    }
    Ok(Pending::Int { kind, value })
}

fn compare(op: BinOp, l: Pending, r: Pending, span: Span) -> SemResult<Pending> {
    let ordering_allowed = !op.is_equality();
    let result = match (l, r) {
        (
            Pending::Int { kind: lk, value: lv },
            Pending::Int { kind: rk, value: rv },
        ) => {
            unify_kinds(lk, rk, span)?;
            apply_cmp(op, lv.cmp(&rv))
        }
        (Pending::Bool(a), Pending::Bool(b)) if !ordering_allowed => apply_cmp(op, a.cmp(&b)),
        (Pending::Char(a), Pending::Char(b)) => apply_cmp(op, a.cmp(&b)),
        (Pending::Str(a), Pending::Str(b)) if !ordering_allowed => {
            apply_cmp(op, a.as_str().cmp(b.as_str()))
        }
        _ => {
            return Err(SemError::konst(
                span,
                format!("operands of `{}` have incompatible types", op.describe()),
            ))
        }
    };
    Ok(Pending::Bool(result))
}

fn apply_cmp(op: BinOp, ord: std::cmp::Ordering) -> bool {
    match op {
        BinOp::Eq => ord.is_eq(),
        BinOp::Ne => !ord.is_eq(),
        BinOp::Lt => ord.is_lt(),
        BinOp::Gt => ord.is_gt(),
        BinOp::Le => ord.is_le(),
        BinOp::Ge => ord.is_ge(),
        _ => unreachable!("not a comparison"),
    }
}

fn unify_kinds(
    l: Option<PrimKind>,
    r: Option<PrimKind>,
    span: Span,
) -> SemResult<Option<PrimKind>> {
    match (l, r) {
        (Some(a), Some(b)) if a != b => Err(SemError::konst(
            span,
            format!("mismatched integer types `{}` and `{}`", a.name(), b.name()),
        )),
        (Some(a), _) => Ok(Some(a)),
        (_, Some(b)) => Ok(Some(b)),
        (None, None) => Ok(None),
    }
}

/// Integer kind expectation carried by an annotation, if it names an
/// integer-ish primitive.
fn ann_int_kind(ann: &TypeAnnotation, ctxt: &TyCtxt) -> Option<PrimKind> {
    match ann {
        TypeAnnotation::Resolved(id) => ctxt.prim_kind(*id),
        TypeAnnotation::Syntactic(node) => match node.kind {
            TypeNodeKind::Prim(kind) => Some(kind),
            _ => None,
        },
    }
}

fn int_range(kind: PrimKind) -> (i128, i128) {
    match kind {
        PrimKind::I32 => (i32::MIN as i128, i32::MAX as i128),
        PrimKind::U32 => (0, u32::MAX as i128),
        PrimKind::Isize => (i64::MIN as i128, i64::MAX as i128),
        PrimKind::Usize => (0, u64::MAX as i128),
        _ => (0, 0),
    }
}

fn check_range(kind: PrimKind, value: i128, span: Span) -> SemResult<()> {
    if !kind.is_integer() {
        return Err(SemError::konst(span, "integer value of non-integer kind"));
    }
    let (min, max) = int_range(kind);
    if value < min || value > max {
        return Err(SemError::konst(
            span,
            format!("value `{value}` out of range for `{}`", kind.name()),
        ));
    }
    Ok(())
}

/// Two's-complement wrap into the target kind, for `as` casts.
fn wrap_to(kind: PrimKind, value: i128) -> i128 {
    match kind {
        PrimKind::I32 => value as i32 as i128,
        PrimKind::U32 => value as u32 as i128,
        PrimKind::Isize => value as i64 as i128,
        PrimKind::Usize => value as u64 as i128,
        _ => value,
    }
}

/// Convenience used by the finalizer for `[expr; count]` counts.
pub fn eval_count(
    cache: &mut ConstCache,
    consts: &IndexVec<ConstId, ConstDef>,
    ctxt: &TyCtxt,
    count: &ArrayCount,
) -> SemResult<usize> {
    match count {
        ArrayCount::Resolved(n) => Ok(*n),
        ArrayCount::Unevaluated(expr) => eval_array_len(cache, consts, ctxt, expr),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivc_util::FileId;

    /// Build a resolved program and evaluate its first const repeatedly.
    fn setup(src: &str) -> (crate::hir::Program, TyCtxt) {
        let tokens = rivc_lex::lex(src, FileId::DUMMY).unwrap();
        let ast = rivc_par::parse(tokens).unwrap();
        let mut program = crate::lower::lower_program(ast);
        let mut ctxt = TyCtxt::new();
        crate::resolve::resolve(&mut program, &mut ctxt).unwrap();
        (program, ctxt)
    }

    fn eval_first(src: &str) -> SemResult<ConstValue> {
        let (program, ctxt) = setup(src);
        let mut cache = ConstCache::new();
        eval_const(&mut cache, &program.consts, &ctxt, ConstId(0))
    }

    #[test]
    fn test_simple_arithmetic() {
        let v = eval_first("const N: usize = 1 + 2 * 3;").unwrap();
        assert_eq!(v, ConstValue::Int { kind: PrimKind::Usize, value: 7 });
    }

    #[test]
    fn test_const_references_const() {
        let src = "const A: i32 = 2; const B: i32 = A * 10;";
        let (program, ctxt) = setup(src);
        let mut cache = ConstCache::new();
        let b = eval_const(&mut cache, &program.consts, &ctxt, ConstId(1)).unwrap();
        assert_eq!(b, ConstValue::Int { kind: PrimKind::I32, value: 20 });
        // A was memoized on the way.
        assert!(cache.get(ConstId(0)).is_some());
    }

    #[test]
    fn test_memoization_is_consistent() {
        let (program, ctxt) = setup("const N: usize = 40 + 2;");
        let mut cache = ConstCache::new();
        let first = eval_const(&mut cache, &program.consts, &ctxt, ConstId(0)).unwrap();
        let second = eval_const(&mut cache, &program.consts, &ctxt, ConstId(0)).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_self_cycle() {
        let err = eval_first("const N: usize = N;").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Const);
        assert!(err.message.contains("cycle"));
    }

    #[test]
    fn test_mutual_cycle() {
        let src = "const A: i32 = B; const B: i32 = A;";
        let (program, ctxt) = setup(src);
        let mut cache = ConstCache::new();
        let err = eval_const(&mut cache, &program.consts, &ctxt, ConstId(0)).unwrap_err();
        assert!(err.message.contains("cycle"));
    }

    #[test]
    fn test_overflow_is_fatal() {
        let err = eval_first("const N: u32 = 4294967295 + 1;").unwrap_err();
        assert!(err.message.contains("out of range") || err.message.contains("overflow"));
    }

    #[test]
    fn test_division_by_zero() {
        let err = eval_first("const N: i32 = 1 / 0;").unwrap_err();
        assert!(err.message.contains("division by zero"));
    }

    #[test]
    fn test_negative_into_unsigned_rejected() {
        let err = eval_first("const N: usize = 0 - 1;").unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Const);
    }

    #[test]
    fn test_unary_ops() {
        assert_eq!(
            eval_first("const N: i32 = -5;").unwrap(),
            ConstValue::Int { kind: PrimKind::I32, value: -5 }
        );
        assert_eq!(
            eval_first("const B: bool = !true;").unwrap(),
            ConstValue::Bool(false)
        );
        assert_eq!(
            eval_first("const N: u32 = !0u32;").unwrap(),
            ConstValue::Int { kind: PrimKind::U32, value: u32::MAX as i128 }
        );
    }

    #[test]
    fn test_suffix_mismatch_with_declared_type() {
        let err = eval_first("const N: usize = 3i32;").unwrap_err();
        assert!(err.message.contains("expected `usize`"));
    }

    #[test]
    fn test_comparison_and_logic() {
        assert_eq!(
            eval_first("const B: bool = 1 < 2 && true;").unwrap(),
            ConstValue::Bool(true)
        );
        assert_eq!(
            eval_first("const B: bool = false && 1 / 0 == 0;").unwrap(),
            ConstValue::Bool(false)
        );
    }

    #[test]
    fn test_cast_wraps() {
        let v = eval_first("const N: u32 = -1i32 as u32;").unwrap();
        assert_eq!(v, ConstValue::Int { kind: PrimKind::U32, value: u32::MAX as i128 });
        let v = eval_first("const N: i32 = 4294967295u32 as i32;").unwrap();
        assert_eq!(v, ConstValue::Int { kind: PrimKind::I32, value: -1 });
    }

    #[test]
    fn test_non_const_expression_rejected() {
        let err = eval_first("const N: i32 = getInt();").unwrap_err();
        assert!(err.message.contains("non-const"));
    }

    #[test]
    fn test_string_and_char_consts() {
        assert_eq!(
            eval_first("const S: String = \"hi\";").unwrap(),
            ConstValue::Str(Symbol::intern("hi"))
        );
        assert_eq!(
            eval_first("const C: char = 'x';").unwrap(),
            ConstValue::Char('x')
        );
    }
}
