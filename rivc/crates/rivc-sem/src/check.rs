//! The bidirectional expression checker.
//!
//! Populates an [`ExprInfo`] on every expression: its interned type,
//! place-ness, mutability, and control-flow endpoint set. Expectations
//! propagate down ([`Expectation`]), resolved types propagate up, and an
//! integer literal without a suffix resolves against the nearest
//! expectation, or surfaces "cannot infer integer type" at the nearest
//! constraint site.
//!
//! The two-phase probe drives inference for operators and array literals:
//! check without an expectation, and if exactly one side resolves to a
//! concrete numeric type, re-check the other against it. Re-checking a
//! subtree simply overwrites its stamped info; the walk is idempotent.
//!
//! Method lookup goes through the impl table with auto-reference and
//! auto-dereference; every inserted adjustment is recorded in the tree as
//! an explicit `Unary` reference or dereference node so lowering sees the
//! operations it must emit.

use tracing::debug;

use rivc_util::{FxHashMap, IndexVec, Span, Symbol};

use crate::error::{SemError, SemResult};
use crate::hir::*;
use crate::impl_table::ImplTable;
use crate::ty::{PrimKind, Ty, TyCtxt, TypeId};

/// Type expectation threaded into every recursive check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Expectation {
    /// No expectation; unsuffixed integer literals stay unresolved.
    None,
    /// The result must be assignable to this type.
    Exact(TypeId),
    /// As `Exact`, and the subtree must be const-evaluable.
    ExactConst(TypeId),
}

impl Expectation {
    fn ty(self) -> Option<TypeId> {
        match self {
            Expectation::None => None,
            Expectation::Exact(t) | Expectation::ExactConst(t) => Some(t),
        }
    }
}

/// Snapshot of a function signature, taken after finalization so bodies can
/// be checked while other arena entries stay borrowed.
struct FnSig {
    name: Symbol,
    self_shape: Option<(bool, bool)>,
    params: Vec<TypeId>,
    ret: TypeId,
}

/// Run the checker over every function body and constant initializer.
pub fn check(program: &mut Program, ctxt: &mut TyCtxt, impls: &ImplTable) -> SemResult<()> {
    debug!(funcs = program.funcs.len(), "semantic check");

    let mut sigs: IndexVec<FuncId, FnSig> = IndexVec::with_capacity(program.funcs.len());
    for func in program.funcs.iter() {
        sigs.push(FnSig {
            name: func.name,
            self_shape: func.self_param.map(|sp| (sp.is_ref, sp.is_mut)),
            params: func.param_anns.iter().map(|ann| ann.ty()).collect(),
            ret: func.ret_ann.as_ref().map(|ann| ann.ty()).unwrap_or(TypeId::INVALID),
        });
    }
    let mut const_tys: IndexVec<ConstId, TypeId> = IndexVec::with_capacity(program.consts.len());
    for konst in program.consts.iter() {
        const_tys.push(konst.ann.ty());
    }

    for fid in program.funcs.indices() {
        let Some(mut body) = program.funcs[fid].body.take() else {
            continue; // built-ins
        };
        let mut locals = std::mem::take(&mut program.funcs[fid].locals);
        let ret = sigs[fid].ret;
        {
            let mut checker = Checker {
                ctxt,
                impls,
                sigs: &sigs,
                const_tys: &const_tys,
                locals: &mut locals,
                loop_info: FxHashMap::default(),
                in_const: false,
            };
            checker.check_expr(&mut body, Expectation::Exact(ret))?;
        }
        program.funcs[fid].locals = locals;
        program.funcs[fid].body = Some(body);
    }

    // Constant initializers get infos too; their values were computed by
    // the finalizer, here we enforce the const subset and stamp types.
    for cid in program.consts.indices() {
        let mut init = std::mem::replace(
            &mut program.consts[cid].init,
            Expr::new(ExprKind::Literal(Lit::Unit), Span::DUMMY),
        );
        let declared = const_tys[cid];
        let mut locals = IndexVec::new();
        {
            let mut checker = Checker {
                ctxt,
                impls,
                sigs: &sigs,
                const_tys: &const_tys,
                locals: &mut locals,
                loop_info: FxHashMap::default(),
                in_const: true,
            };
            checker.check_expr(&mut init, Expectation::ExactConst(declared))?;
        }
        program.consts[cid].init = init;
    }

    Ok(())
}

struct LoopCheckInfo {
    /// Break type elected by the first `break` carrying a value (or unit
    /// for a value-less one).
    elected: Option<TypeId>,
}

struct Checker<'a> {
    ctxt: &'a mut TyCtxt,
    impls: &'a ImplTable,
    sigs: &'a IndexVec<FuncId, FnSig>,
    const_tys: &'a IndexVec<ConstId, TypeId>,
    locals: &'a mut IndexVec<LocalId, Local>,
    loop_info: FxHashMap<LoopId, LoopCheckInfo>,
    in_const: bool,
}

impl<'a> Checker<'a> {
    /// Check one expression under an expectation, stamping its info and
    /// returning its type.
    fn check_expr(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        if self.in_const && !is_const_kind(&expr.kind) {
            return Err(SemError::konst(
                expr.span,
                "non-const expression in const context",
            ));
        }

        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Literal(lit) => {
                let lit = *lit;
                self.check_literal(expr, lit, expect)
            }

            ExprKind::Variable(lid) => {
                let lid = *lid;
                let local = self.locals[lid];
                if local.ty.is_invalid() {
                    return Err(SemError::invariant(
                        span,
                        format!("local `{}` has no type", local.name),
                    ));
                }
                self.finish(expr, local.ty, true, local.is_mut, EndpointSet::normal(), expect)
            }

            ExprKind::ConstUse(cid) => {
                let ty = self.const_tys[*cid];
                self.finish(expr, ty, false, false, EndpointSet::normal(), expect)
            }
            ExprKind::AssocConst { konst, .. } => {
                let ty = self.const_tys[*konst];
                self.finish(expr, ty, false, false, EndpointSet::normal(), expect)
            }

            ExprKind::FuncUse(fid) => {
                let name = self.sigs[*fid].name;
                Err(SemError::ty(
                    span,
                    format!("function `{name}` must be called; functions are not first-class values"),
                ))
            }

            ExprKind::EnumVariant { enum_id, .. } => {
                let ty = self.ctxt.intern(Ty::Enum(*enum_id));
                self.finish(expr, ty, false, false, EndpointSet::normal(), expect)
            }

            ExprKind::Underscore => Err(SemError::ty(
                span,
                "`_` is only allowed on the left-hand side of an assignment",
            )),

            ExprKind::FieldAccess { .. } => self.check_field_access(expr, expect),
            ExprKind::StructLiteral { .. } => self.check_struct_literal(expr, expect),
            ExprKind::ArrayLiteral(_) => self.check_array_literal(expr, expect),
            ExprKind::ArrayRepeat { .. } => self.check_array_repeat(expr, expect),
            ExprKind::Index { .. } => self.check_index(expr, expect),
            ExprKind::Assign { .. } => self.check_assign(expr, expect),
            ExprKind::Unary { .. } => self.check_unary(expr, expect),
            ExprKind::Binary { .. } => self.check_binary(expr, expect),
            ExprKind::Cast { .. } => self.check_cast(expr, expect),
            ExprKind::Call { .. } => self.check_call(expr, expect),
            ExprKind::MethodCall { .. } => self.check_method_call(expr, expect),
            ExprKind::Block(_) => self.check_block_expr(expr, expect),
            ExprKind::If { .. } => self.check_if(expr, expect),
            ExprKind::Loop { .. } => self.check_loop(expr, expect),
            ExprKind::While { .. } => self.check_while(expr, expect),
            ExprKind::Break { .. } => self.check_break(expr, expect),
            ExprKind::Continue { target } => {
                let target = target.ok_or_else(|| {
                    SemError::invariant(span, "`continue` was never linked to a loop")
                })?;
                let never = self.ctxt.never();
                self.finish(expr, never, false, false, EndpointSet::continuing(target), expect)
            }
            ExprKind::Return { .. } => self.check_return(expr, expect),

            ExprKind::Unresolved(_) | ExprKind::UnresolvedPath { .. } | ExprKind::SelfValue => {
                Err(SemError::invariant(
                    span,
                    "unresolved name survived name resolution",
                ))
            }
        }
    }

    /// Stamp the info record, applying divergence coercion and the
    /// expectation conformance check.
    fn finish(
        &mut self,
        expr: &mut Expr,
        ty: TypeId,
        is_place: bool,
        is_mut: bool,
        endpoints: EndpointSet,
        expect: Expectation,
    ) -> SemResult<TypeId> {
        // An expression that cannot fall through has no value: its type is
        // `!` regardless of what the operands suggested.
        let ty = if endpoints.diverges() {
            self.ctxt.never()
        } else {
            ty
        };

        if let Some(want) = expect.ty() {
            if self.ctxt.is_hole(ty) {
                // An exact expectation never lets a hole through: integer
                // expectations were adopted at the leaves, so this integer
                // genuinely cannot resolve.
                if self.ctxt.is_integer(want) {
                    return Err(SemError::ty(expr.span, "cannot infer integer type"));
                }
                return Err(SemError::ty(
                    expr.span,
                    format!(
                        "mismatched types: expected `{}`, found an integer",
                        self.ctxt.display(want)
                    ),
                ));
            }
            if !self.is_assignable(want, ty) {
                return Err(SemError::ty(
                    expr.span,
                    format!(
                        "mismatched types: expected `{}`, found `{}`",
                        self.ctxt.display(want),
                        self.ctxt.display(ty)
                    ),
                ));
            }
        }

        debug_assert!(
            endpoints.normal || self.ctxt.is_never(ty),
            "divergent expression must have type `!`"
        );

        expr.info = Some(ExprInfo {
            ty,
            is_place,
            is_mut,
            endpoints,
        });
        Ok(ty)
    }

    /// `is_assignable(to, from)`: exact type identity, or `from` is `!`.
    fn is_assignable(&self, to: TypeId, from: TypeId) -> bool {
        to == from || self.ctxt.is_never(from)
    }

    fn check_literal(
        &mut self,
        expr: &mut Expr,
        lit: Lit,
        expect: Expectation,
    ) -> SemResult<TypeId> {
        let span = expr.span;
        let ty = match lit {
            Lit::Int {
                value,
                suffix,
                negative,
            } => {
                let kind = match suffix {
                    Some(kind) => Some(kind),
                    None => match expect.ty() {
                        Some(t) if self.ctxt.is_integer(t) => self.ctxt.prim_kind(t),
                        Some(t) => {
                            return Err(SemError::ty(
                                span,
                                format!(
                                    "mismatched types: expected `{}`, found an integer",
                                    self.ctxt.display(t)
                                ),
                            ))
                        }
                        None => None,
                    },
                };
                match kind {
                    Some(kind) => {
                        check_literal_range(kind, value, negative, span)?;
                        self.ctxt.prim(kind)
                    }
                    // Unresolved; the nearest constraint site reports it.
                    None => self.ctxt.hole(),
                }
            }
            Lit::Bool(_) => self.ctxt.prim(PrimKind::Bool),
            Lit::Char(_) => self.ctxt.prim(PrimKind::Char),
            Lit::Str(_) => self.ctxt.prim(PrimKind::Str),
            Lit::Unit => self.ctxt.unit(),
        };
        // String literals are static data and therefore (immutable) places,
        // so `&"text"` can feed `&String` parameters.
        let is_place = matches!(lit, Lit::Str(_));
        self.finish(expr, ty, is_place, false, EndpointSet::normal(), expect)
    }

    fn check_field_access(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::FieldAccess {
            base,
            field,
            field_span,
            index,
        } = &mut expr.kind
        else {
            unreachable!()
        };
        let field = *field;
        let field_span = *field_span;

        let base_ty = self.check_expr(base, Expectation::None)?;
        let base_info = base.info.clone().expect("base checked");

        // Auto-deref through references; mutability survives only if every
        // stripped layer is mutable.
        let (struct_ty, is_place, is_mut) = self.strip_refs(base_ty, &base_info);

        let Ty::Struct(sid) = *self.ctxt.kind(struct_ty) else {
            return Err(SemError::ty(
                span,
                format!(
                    "field access on non-struct type `{}`",
                    self.ctxt.display(base_ty)
                ),
            ));
        };
        let info = self.ctxt.struct_info(sid);
        let Some(idx) = info.field_index(field) else {
            return Err(SemError::ty(
                field_span,
                format!("struct `{}` has no field `{field}`", info.name),
            ));
        };
        let field_ty = info.fields[idx].ty;
        *index = Some(idx);

        let endpoints = base_info.endpoints;
        self.finish(expr, field_ty, is_place, is_mut, endpoints, expect)
    }

    /// Strip reference layers for auto-deref, returning the underlying
    /// type and the place/mutability of the innermost access.
    fn strip_refs(&self, mut ty: TypeId, info: &ExprInfo) -> (TypeId, bool, bool) {
        let mut is_place = info.is_place;
        let mut is_mut = info.is_mut;
        let mut derefed = false;
        let mut all_mut = true;
        while let Ty::Ref { pointee, mutable } = *self.ctxt.kind(ty) {
            derefed = true;
            all_mut &= mutable;
            ty = pointee;
        }
        if derefed {
            is_place = true;
            is_mut = all_mut;
        }
        (ty, is_place, is_mut)
    }

    fn check_struct_literal(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::StructLiteral {
            struct_id, fields, ..
        } = &mut expr.kind
        else {
            unreachable!()
        };
        let sid = struct_id
            .ok_or_else(|| SemError::invariant(span, "struct literal was never resolved"))?;
        let StructLitFields::Canonical(inits) = fields else {
            return Err(SemError::invariant(
                span,
                "struct literal was never canonicalized",
            ));
        };

        let field_tys: Vec<TypeId> = self
            .ctxt
            .struct_info(sid)
            .fields
            .iter()
            .map(|f| f.ty)
            .collect();
        debug_assert_eq!(field_tys.len(), inits.len(), "canonical literal shape");

        let mut endpoints = EndpointSet::normal();
        // Borrow dance: pull the initializers out so `self` stays free.
        let mut taken = std::mem::take(inits);
        let mut result = Ok(());
        for (init, want) in taken.iter_mut().zip(&field_tys) {
            if let Err(e) = self
                .check_expr(init, Expectation::Exact(*want))
                .map(|_| ())
            {
                result = Err(e);
                break;
            }
            endpoints = endpoints.then(&init.info.as_ref().expect("checked").endpoints);
        }
        let ExprKind::StructLiteral { fields, .. } = &mut expr.kind else {
            unreachable!()
        };
        *fields = StructLitFields::Canonical(taken);
        result?;

        let ty = self.ctxt.intern(Ty::Struct(sid));
        self.finish(expr, ty, false, false, endpoints, expect)
    }

    fn check_array_literal(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let expected_elem = expect.ty().and_then(|t| match *self.ctxt.kind(t) {
            Ty::Array { elem, .. } => Some(elem),
            _ => None,
        });

        let ExprKind::ArrayLiteral(elems) = &mut expr.kind else {
            unreachable!()
        };
        let mut taken = std::mem::take(elems);
        let outcome = self.check_array_elems(&mut taken, expected_elem, span);
        let ExprKind::ArrayLiteral(elems) = &mut expr.kind else {
            unreachable!()
        };
        *elems = taken;
        let (elem_ty, endpoints, len) = outcome?;

        let ty = self.ctxt.mk_array(elem_ty, len);
        self.finish(expr, ty, false, false, endpoints, expect)
    }

    fn check_array_elems(
        &mut self,
        elems: &mut [Expr],
        expected_elem: Option<TypeId>,
        span: Span,
    ) -> SemResult<(TypeId, EndpointSet, usize)> {
        // Probe pass: find the first concrete element type.
        let mut elected = expected_elem;
        for elem in elems.iter_mut() {
            let ty = self.check_expr(elem, Expectation::None)?;
            if elected.is_none() && !self.ctxt.is_hole(ty) && !self.ctxt.is_never(ty) {
                elected = Some(ty);
            }
        }
        let Some(elem_ty) = elected else {
            return Err(SemError::ty(
                span,
                if elems.is_empty() {
                    "cannot infer the element type of an empty array".to_string()
                } else {
                    "cannot infer integer type".to_string()
                },
            ));
        };

        // Commit pass: everything must agree with the elected type.
        let mut endpoints = EndpointSet::normal();
        for elem in elems.iter_mut() {
            self.check_expr(elem, Expectation::Exact(elem_ty))?;
            endpoints = endpoints.then(&elem.info.as_ref().expect("checked").endpoints);
        }
        Ok((elem_ty, endpoints, elems.len()))
    }

    fn check_array_repeat(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let expected_elem = expect.ty().and_then(|t| match *self.ctxt.kind(t) {
            Ty::Array { elem, .. } => Some(elem),
            _ => None,
        });
        let ExprKind::ArrayRepeat { elem, count } = &mut expr.kind else {
            unreachable!()
        };
        let ArrayCount::Resolved(n) = *count else {
            return Err(SemError::invariant(span, "repeat count was never evaluated"));
        };

        let elem_expect = match expected_elem {
            Some(t) => Expectation::Exact(t),
            None => Expectation::None,
        };
        let mut elem_taken = std::mem::replace(
            elem,
            Box::new(Expr::new(ExprKind::Literal(Lit::Unit), span)),
        );
        let elem_ty = self.check_expr(&mut elem_taken, elem_expect)?;
        let endpoints = elem_taken.info.as_ref().expect("checked").endpoints.clone();
        let ExprKind::ArrayRepeat { elem, .. } = &mut expr.kind else {
            unreachable!()
        };
        *elem = elem_taken;

        if self.ctxt.is_hole(elem_ty) {
            return Err(SemError::ty(span, "cannot infer integer type"));
        }
        let ty = self.ctxt.mk_array(elem_ty, n);
        self.finish(expr, ty, false, false, endpoints, expect)
    }

    fn check_index(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let usize_ty = self.ctxt.prim(PrimKind::Usize);
        let ExprKind::Index { base, index } = &mut expr.kind else {
            unreachable!()
        };

        let base_ty = self.check_expr(base, Expectation::None)?;
        let base_info = base.info.clone().expect("base checked");
        let (stripped, is_place, is_mut) = self.strip_refs(base_ty, &base_info);

        let Ty::Array { elem, .. } = *self.ctxt.kind(stripped) else {
            return Err(SemError::ty(
                span,
                format!("cannot index into `{}`", self.ctxt.display(base_ty)),
            ));
        };

        self.check_expr(index, Expectation::Exact(usize_ty))?;
        let endpoints = base_info
            .endpoints
            .then(&index.info.as_ref().expect("checked").endpoints);
        self.finish(expr, elem, is_place, is_mut, endpoints, expect)
    }

    fn check_assign(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let ExprKind::Assign { place, value } = &mut expr.kind else {
            unreachable!()
        };

        // `_ = value` discards the value; the hole adopts its type.
        if matches!(place.kind, ExprKind::Underscore) {
            let value_ty = self.check_expr(value, Expectation::None)?;
            if self.ctxt.is_hole(value_ty) {
                return Err(SemError::ty(value.span, "cannot infer integer type"));
            }
            let endpoints = value.info.as_ref().expect("checked").endpoints.clone();
            place.info = Some(ExprInfo {
                ty: value_ty,
                is_place: true,
                is_mut: true,
                endpoints: EndpointSet::normal(),
            });
            let unit = self.ctxt.unit();
            return self.finish(expr, unit, false, false, endpoints, expect);
        }

        let place_ty = self.check_expr(place, Expectation::None)?;
        let place_info = place.info.clone().expect("place checked");
        if !place_info.is_place {
            return Err(SemError::mutability(
                place.span,
                "cannot assign to this expression; it is not a place",
            ));
        }
        if !place_info.is_mut {
            return Err(SemError::mutability(
                place.span,
                "cannot assign to an immutable place",
            ));
        }

        self.check_expr(value, Expectation::Exact(place_ty))?;
        let endpoints = place_info
            .endpoints
            .then(&value.info.as_ref().expect("checked").endpoints);
        let unit = self.ctxt.unit();
        self.finish(expr, unit, false, false, endpoints, expect)
    }

    fn check_unary(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;

        // Fold `-literal` into a negative literal so range checking sees
        // the sign (`-2147483648` is a valid `i32`).
        if let ExprKind::Unary {
            op: UnOp::Neg,
            operand,
        } = &expr.kind
        {
            if let ExprKind::Literal(Lit::Int {
                value,
                suffix,
                negative: false,
            }) = operand.kind
            {
                expr.kind = ExprKind::Literal(Lit::Int {
                    value,
                    suffix,
                    negative: true,
                });
                let lit = match &expr.kind {
                    ExprKind::Literal(lit) => *lit,
                    _ => unreachable!(),
                };
                return self.check_literal(expr, lit, expect);
            }
        }

        let ExprKind::Unary { op, operand } = &mut expr.kind else {
            unreachable!()
        };
        let op = *op;

        match op {
            UnOp::Not => {
                let ty = self.check_expr(operand, expect_through_not(expect, self.ctxt))?;
                let info = operand.info.clone().expect("checked");
                if !self.ctxt.is_hole(ty)
                    && !self.ctxt.is_never(ty)
                    && !self.ctxt.is_integer(ty)
                    && self.ctxt.prim_kind(ty) != Some(PrimKind::Bool)
                {
                    return Err(SemError::ty(
                        span,
                        format!("cannot apply `!` to `{}`", self.ctxt.display(ty)),
                    ));
                }
                self.finish(expr, ty, false, false, info.endpoints, expect)
            }
            UnOp::Neg => {
                let ty = self.check_expr(operand, expect_through_not(expect, self.ctxt))?;
                let info = operand.info.clone().expect("checked");
                if !self.ctxt.is_hole(ty)
                    && !self.ctxt.is_never(ty)
                    && !self.ctxt.is_signed_integer(ty)
                {
                    return Err(SemError::ty(
                        span,
                        format!(
                            "cannot negate a value of type `{}`",
                            self.ctxt.display(ty)
                        ),
                    ));
                }
                self.finish(expr, ty, false, false, info.endpoints, expect)
            }
            UnOp::Deref => {
                let ty = self.check_expr(operand, Expectation::None)?;
                let info = operand.info.clone().expect("checked");
                if self.ctxt.is_never(ty) {
                    return self.finish(expr, ty, false, false, info.endpoints, expect);
                }
                let Ty::Ref { pointee, mutable } = *self.ctxt.kind(ty) else {
                    return Err(SemError::ty(
                        span,
                        format!(
                            "cannot dereference non-reference type `{}`",
                            self.ctxt.display(ty)
                        ),
                    ));
                };
                self.finish(expr, pointee, true, mutable, info.endpoints, expect)
            }
            UnOp::Ref { mutable } => {
                let ty = self.check_expr(operand, Expectation::None)?;
                let info = operand.info.clone().expect("checked");
                if self.ctxt.is_hole(ty) {
                    return Err(SemError::ty(operand.span, "cannot infer integer type"));
                }
                if !info.is_place {
                    return Err(SemError::mutability(
                        operand.span,
                        "cannot take a reference to a value that is not a place",
                    ));
                }
                if mutable && !info.is_mut {
                    return Err(SemError::mutability(
                        operand.span,
                        "cannot take a mutable reference to an immutable place",
                    ));
                }
                let ref_ty = self.ctxt.mk_ref(ty, mutable);
                self.finish(expr, ref_ty, false, false, info.endpoints, expect)
            }
        }
    }

    fn check_binary(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::Binary { op, lhs, rhs } = &mut expr.kind else {
            unreachable!()
        };
        let op = *op;

        if op.is_logical() {
            let bool_ty = self.ctxt.prim(PrimKind::Bool);
            self.check_expr(lhs, Expectation::Exact(bool_ty))?;
            self.check_expr(rhs, Expectation::Exact(bool_ty))?;
            let le = lhs.info.as_ref().expect("checked").endpoints.clone();
            let re = rhs.info.as_ref().expect("checked").endpoints.clone();
            // The right operand may be skipped, so its jumps are only
            // possible, never mandatory.
            let mut endpoints = le.then(&re);
            endpoints.normal |= le.normal;
            return self.finish(expr, bool_ty, false, false, endpoints, expect);
        }

        // Probe both sides without expectations.
        let mut lt = self.check_expr(lhs, Expectation::None)?;
        let mut rt = self.check_expr(rhs, Expectation::None)?;

        // If exactly one side resolved to a concrete numeric, re-check the
        // other against it.
        if self.ctxt.is_hole(lt) && self.ctxt.is_integer(rt) {
            lt = self.check_expr(lhs, Expectation::Exact(rt))?;
        } else if self.ctxt.is_hole(rt) && self.ctxt.is_integer(lt) {
            rt = self.check_expr(rhs, Expectation::Exact(lt))?;
        } else if self.ctxt.is_hole(lt) && self.ctxt.is_hole(rt) {
            // Neither side knows; propagate the outer expectation.
            if let Some(want) = expect.ty().filter(|t| self.ctxt.is_integer(*t)) {
                lt = self.check_expr(lhs, Expectation::Exact(want))?;
                rt = self.check_expr(rhs, Expectation::Exact(want))?;
            }
        }

        let le = lhs.info.as_ref().expect("checked").endpoints.clone();
        let re = rhs.info.as_ref().expect("checked").endpoints.clone();
        let endpoints = le.then(&re);

        if op.is_arithmetic() {
            let ty = self.merge_operands(lt, rt, op, span)?;
            if !self.ctxt.is_hole(ty) && !self.ctxt.is_never(ty) && !self.ctxt.is_integer(ty) {
                return Err(SemError::ty(
                    span,
                    format!(
                        "operator `{}` requires integer operands, found `{}`",
                        op.describe(),
                        self.ctxt.display(ty)
                    ),
                ));
            }
            return self.finish(expr, ty, false, false, endpoints, expect);
        }

        debug_assert!(op.is_comparison());
        let mut operand_ty = self.merge_operands(lt, rt, op, span)?;
        if self.ctxt.is_hole(operand_ty) {
            // Two bare literals compared: the result is discarded as a
            // bool either way, so the operands default to `i32`.
            let i32_ty = self.ctxt.prim(PrimKind::I32);
            let lt = self.check_expr(lhs, Expectation::Exact(i32_ty))?;
            let rt = self.check_expr(rhs, Expectation::Exact(i32_ty))?;
            operand_ty = self.merge_operands(lt, rt, op, span)?;
        }
        if !self.ctxt.is_never(operand_ty) && !self.comparable(op, operand_ty) {
            return Err(SemError::ty(
                span,
                format!(
                    "operator `{}` cannot compare values of type `{}`",
                    op.describe(),
                    self.ctxt.display(operand_ty)
                ),
            ));
        }
        let bool_ty = self.ctxt.prim(PrimKind::Bool);
        self.finish(expr, bool_ty, false, false, endpoints, expect)
    }

    /// Merge two operand types: identical wins, `!` yields, anything else
    /// is a mismatch.
    fn merge_operands(
        &mut self,
        lt: TypeId,
        rt: TypeId,
        op: BinOp,
        span: Span,
    ) -> SemResult<TypeId> {
        if lt == rt {
            return Ok(lt);
        }
        if self.ctxt.is_never(lt) {
            return Ok(rt);
        }
        if self.ctxt.is_never(rt) {
            return Ok(lt);
        }
        // A hole paired with a concrete non-integer is a mismatch too.
        Err(SemError::ty(
            span,
            format!(
                "mismatched operand types for `{}`: `{}` and `{}`",
                op.describe(),
                self.ctxt.display(lt),
                self.ctxt.display(rt)
            ),
        ))
    }

    /// Operand categories for comparisons: equality accepts equal
    /// primitives, enums and references; ordering demands integers or
    /// chars.
    fn comparable(&self, op: BinOp, ty: TypeId) -> bool {
        if op.is_equality() {
            matches!(
                self.ctxt.kind(ty),
                Ty::Prim(_) | Ty::Enum(_) | Ty::Ref { .. }
            )
        } else {
            self.ctxt.is_integer(ty) || self.ctxt.prim_kind(ty) == Some(PrimKind::Char)
        }
    }

    fn check_cast(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::Cast { operand, ann } = &mut expr.kind else {
            unreachable!()
        };
        let target = ann.ty();

        let mut ot = self.check_expr(operand, Expectation::None)?;
        if self.ctxt.is_hole(ot) && self.ctxt.is_integer(target) {
            ot = self.check_expr(operand, Expectation::Exact(target))?;
        }
        let endpoints = operand.info.as_ref().expect("checked").endpoints.clone();

        let valid = self.ctxt.is_never(ot)
            || ot == target && self.ctxt.prim_kind(target).is_some()
            || self.ctxt.is_integer(ot) && self.ctxt.is_integer(target);
        if !valid {
            return Err(SemError::ty(
                span,
                format!(
                    "invalid cast from `{}` to `{}`",
                    self.ctxt.display(ot),
                    self.ctxt.display(target)
                ),
            ));
        }
        self.finish(expr, target, false, false, endpoints, expect)
    }

    fn check_call(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::Call { callee, args } = &mut expr.kind else {
            unreachable!()
        };

        let ExprKind::FuncUse(fid) = callee.kind else {
            return Err(SemError::ty(
                callee.span,
                "call target is not a function",
            ));
        };
        let params = self.sigs[fid].params.clone();
        let ret = self.sigs[fid].ret;

        if args.len() != params.len() {
            return Err(SemError::shape(
                span,
                format!(
                    "function `{}` takes {} argument(s) but {} were supplied",
                    self.sigs[fid].name,
                    params.len(),
                    args.len()
                ),
            ));
        }

        // The callee node itself is not a value; it carries `()` as a
        // placeholder so the info invariant holds.
        let unit = self.ctxt.unit();
        callee.info = Some(ExprInfo {
            ty: unit,
            is_place: false,
            is_mut: false,
            endpoints: EndpointSet::normal(),
        });

        let mut endpoints = EndpointSet::normal();
        for (arg, want) in args.iter_mut().zip(&params) {
            self.check_expr(arg, Expectation::Exact(*want))?;
            endpoints = endpoints.then(&arg.info.as_ref().expect("checked").endpoints);
        }
        if self.ctxt.is_never(ret) {
            endpoints.normal = false;
        }
        self.finish(expr, ret, false, false, endpoints, expect)
    }

    fn check_method_call(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::MethodCall {
            receiver,
            method,
            method_span,
            resolved,
            args,
        } = &mut expr.kind
        else {
            unreachable!()
        };
        let method = *method;
        let method_span = *method_span;

        let recv_ty = self.check_expr(receiver, Expectation::None)?;
        if self.ctxt.is_hole(recv_ty) {
            return Err(SemError::ty(receiver.span, "cannot infer integer type"));
        }
        if self.ctxt.is_never(recv_ty) {
            return Err(SemError::ty(
                receiver.span,
                "cannot call a method on a diverging expression",
            ));
        }
        let recv_info = receiver.info.clone().expect("checked");

        // Base type for lookup: strip every reference layer.
        let mut base_ty = recv_ty;
        while let Ty::Ref { pointee, .. } = *self.ctxt.kind(base_ty) {
            base_ty = pointee;
        }

        let Some(fid) = self.impls.lookup_method(self.ctxt, base_ty, method) else {
            return Err(SemError::ty(
                method_span,
                format!(
                    "no method `{method}` on type `{}`",
                    self.ctxt.display(base_ty)
                ),
            ));
        };
        *resolved = Some(fid);
        let (wants_ref, wants_mut) = self.sigs[fid]
            .self_shape
            .ok_or_else(|| SemError::invariant(method_span, "method without a `self` shape"))?;

        // Auto-deref down to at most one reference layer, recording each
        // inserted `*` in the tree.
        loop {
            let cur = receiver.info.as_ref().expect("checked").ty;
            let Ty::Ref { pointee, .. } = *self.ctxt.kind(cur) else {
                break;
            };
            if wants_ref && !matches!(self.ctxt.kind(pointee), Ty::Ref { .. }) {
                break;
            }
            self.insert_deref(receiver)?;
            if !wants_ref && !matches!(self.ctxt.kind(pointee), Ty::Ref { .. }) {
                break;
            }
        }

        let cur = receiver.info.as_ref().expect("checked").clone();
        if wants_ref {
            match *self.ctxt.kind(cur.ty) {
                Ty::Ref { mutable, .. } => {
                    if wants_mut && !mutable {
                        return Err(SemError::mutability(
                            receiver.span,
                            format!("method `{method}` requires a mutable reference"),
                        ));
                    }
                }
                _ => {
                    // Value receiver: auto-reference, which needs a place.
                    if !cur.is_place {
                        return Err(SemError::mutability(
                            receiver.span,
                            format!(
                                "method `{method}` borrows its receiver, which must be a place"
                            ),
                        ));
                    }
                    if wants_mut && !cur.is_mut {
                        return Err(SemError::mutability(
                            receiver.span,
                            format!("method `{method}` requires a mutable receiver"),
                        ));
                    }
                    self.insert_ref(receiver, wants_mut);
                }
            }
        }

        let params = self.sigs[fid].params.clone();
        let ret = self.sigs[fid].ret;
        if args.len() != params.len() {
            return Err(SemError::shape(
                span,
                format!(
                    "method `{method}` takes {} argument(s) but {} were supplied",
                    params.len(),
                    args.len()
                ),
            ));
        }
        let mut endpoints = recv_info.endpoints;
        for (arg, want) in args.iter_mut().zip(&params) {
            self.check_expr(arg, Expectation::Exact(*want))?;
            endpoints = endpoints.then(&arg.info.as_ref().expect("checked").endpoints);
        }
        self.finish(expr, ret, false, false, endpoints, expect)
    }

    /// Wrap the receiver in an explicit dereference node.
    fn insert_deref(&mut self, receiver: &mut Box<Expr>) -> SemResult<()> {
        let span = receiver.span;
        let inner_info = receiver.info.clone().expect("checked");
        let Ty::Ref { pointee, mutable } = *self.ctxt.kind(inner_info.ty) else {
            return Err(SemError::invariant(span, "dereference of a non-reference"));
        };
        let inner = std::mem::replace(
            receiver,
            Box::new(Expr::new(ExprKind::Literal(Lit::Unit), span)),
        );
        **receiver = Expr {
            kind: ExprKind::Unary {
                op: UnOp::Deref,
                operand: inner,
            },
            span,
            info: Some(ExprInfo {
                ty: pointee,
                is_place: true,
                is_mut: mutable,
                endpoints: inner_info.endpoints,
            }),
        };
        Ok(())
    }

    /// Wrap the receiver in an explicit reference node.
    fn insert_ref(&mut self, receiver: &mut Box<Expr>, mutable: bool) {
        let span = receiver.span;
        let inner_info = receiver.info.clone().expect("checked");
        let ref_ty = self.ctxt.mk_ref(inner_info.ty, mutable);
        let inner = std::mem::replace(
            receiver,
            Box::new(Expr::new(ExprKind::Literal(Lit::Unit), span)),
        );
        **receiver = Expr {
            kind: ExprKind::Unary {
                op: UnOp::Ref { mutable },
                operand: inner,
            },
            span,
            info: Some(ExprInfo {
                ty: ref_ty,
                is_place: false,
                is_mut: false,
                endpoints: inner_info.endpoints,
            }),
        };
    }

    fn check_block_expr(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let ExprKind::Block(block) = &mut expr.kind else {
            unreachable!()
        };
        let (ty, is_place, is_mut, endpoints) = self.check_block(block, expect)?;
        self.finish(expr, ty, is_place, is_mut, endpoints, expect)
    }

    fn check_block(
        &mut self,
        block: &mut Block,
        expect: Expectation,
    ) -> SemResult<(TypeId, bool, bool, EndpointSet)> {
        let mut acc = EndpointSet::normal();

        for stmt in &mut block.stmts {
            match stmt {
                Stmt::Let(l) => {
                    let annotated = l.ann.as_ref().and_then(|ann| ann.resolved());
                    match annotated {
                        Some(want) => {
                            self.check_expr(&mut l.init, Expectation::Exact(want))?;
                        }
                        None => {
                            let ty = self.check_expr(&mut l.init, Expectation::None)?;
                            if self.ctxt.is_hole(ty) {
                                return Err(SemError::ty(
                                    l.init.span,
                                    "cannot infer integer type",
                                ));
                            }
                            // Un-annotated binding: the initializer's type
                            // stamps the pattern now.
                            crate::finalize::stamp_pattern(&l.pat, ty, self.locals, self.ctxt)?;
                        }
                    }
                    acc = acc.then(&l.init.info.as_ref().expect("checked").endpoints);
                }
                Stmt::Expr(e) => {
                    let mut ty = self.check_expr(e, Expectation::None)?;
                    // The value is discarded here, so an unresolved integer
                    // defaults to `i32` instead of failing.
                    if self.ctxt.is_hole(ty) {
                        let i32_ty = self.ctxt.prim(PrimKind::I32);
                        ty = self.check_expr(e, Expectation::Exact(i32_ty))?;
                    }
                    let e_info = e.info.as_ref().expect("checked").clone();
                    let unit = self.ctxt.unit();
                    // A `loop` statement may carry a break value; it is
                    // simply dropped.
                    let discards_value = matches!(e.kind, ExprKind::Loop { .. });
                    if e_info.endpoints.normal && ty != unit && !discards_value {
                        return Err(SemError::ty(
                            e.span,
                            format!(
                                "expression statement has type `{}`; expected `()` or a diverging expression",
                                self.ctxt.display(ty)
                            ),
                        ));
                    }
                    acc = acc.then(&e_info.endpoints);
                }
            }
        }

        match &mut block.tail {
            Some(tail) => {
                let ty = self.check_expr(tail, expect)?;
                let tail_info = tail.info.as_ref().expect("checked");
                let endpoints = acc.then(&tail_info.endpoints);
                let ty = if endpoints.diverges() {
                    self.ctxt.never()
                } else {
                    ty
                };
                // A block is never a place, even when its tail is one.
                Ok((ty, false, false, endpoints))
            }
            None => {
                let ty = if acc.diverges() {
                    self.ctxt.never()
                } else {
                    self.ctxt.unit()
                };
                Ok((ty, false, false, acc))
            }
        }
    }

    fn check_if(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let bool_ty = self.ctxt.prim(PrimKind::Bool);
        let ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } = &mut expr.kind
        else {
            unreachable!()
        };

        self.check_expr(cond, Expectation::Exact(bool_ty))?;
        let cond_e = cond.info.as_ref().expect("checked").endpoints.clone();

        match else_branch {
            None => {
                let then_ty = self.check_expr(then_branch, Expectation::None)?;
                let then_info = then_branch.info.as_ref().expect("checked");
                let unit = self.ctxt.unit();
                if then_info.endpoints.normal && then_ty != unit {
                    if self.ctxt.is_hole(then_ty) {
                        return Err(SemError::ty(then_branch.span, "cannot infer integer type"));
                    }
                    return Err(SemError::ty(
                        then_branch.span,
                        format!(
                            "`if` without `else` has type `()`, but the branch has type `{}`",
                            self.ctxt.display(then_ty)
                        ),
                    ));
                }
                // The untaken branch falls through.
                let mut branch_e = then_info.endpoints.clone();
                branch_e.union(&EndpointSet::normal());
                let endpoints = cond_e.then(&branch_e);
                self.finish(expr, unit, false, false, endpoints, expect)
            }
            Some(else_expr) => {
                // Both branches see the outer expectation.
                let mut then_ty = self.check_expr(then_branch, expect)?;
                let mut else_ty = self.check_expr(else_expr, expect)?;

                // A hole branch adopts the concrete sibling's type.
                if self.ctxt.is_hole(then_ty) && !self.ctxt.is_hole(else_ty) {
                    then_ty =
                        self.check_expr(then_branch, Expectation::Exact(else_ty))?;
                } else if self.ctxt.is_hole(else_ty) && !self.ctxt.is_hole(then_ty) {
                    else_ty = self.check_expr(else_expr, Expectation::Exact(then_ty))?;
                }

                let ty = if self.ctxt.is_never(then_ty) {
                    else_ty
                } else if self.ctxt.is_never(else_ty) {
                    then_ty
                } else if then_ty == else_ty {
                    then_ty
                } else {
                    return Err(SemError::ty(
                        span,
                        format!(
                            "`if` and `else` have incompatible types: `{}` vs `{}`",
                            self.ctxt.display(then_ty),
                            self.ctxt.display(else_ty)
                        ),
                    ));
                };

                let mut branches = then_branch.info.as_ref().expect("checked").endpoints.clone();
                branches.union(&else_expr.info.as_ref().expect("checked").endpoints);
                let endpoints = cond_e.then(&branches);
                self.finish(expr, ty, false, false, endpoints, expect)
            }
        }
    }

    fn check_loop(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let ExprKind::Loop { id, body } = &mut expr.kind else {
            unreachable!()
        };
        let id = *id;
        // An outer expectation pre-elects the break type, so `break value`
        // inside is checked against it directly.
        let pre_elected = expect.ty().filter(|t| !self.ctxt.is_hole(*t));
        self.loop_info.insert(
            id,
            LoopCheckInfo {
                elected: pre_elected,
            },
        );

        let body_ty = self.check_expr(body, Expectation::None)?;
        let body_info = body.info.as_ref().expect("checked");
        let unit = self.ctxt.unit();
        if body_info.endpoints.normal && body_ty != unit {
            return Err(SemError::ty(
                body.span,
                "a loop body must have type `()`",
            ));
        }

        let mut endpoints = body_info.endpoints.clone();
        let had_break = endpoints.remove_loop(id);
        endpoints.normal = had_break;

        let info = self.loop_info.remove(&id).expect("loop entry pushed");
        let ty = if had_break {
            // A still-unresolved break type stays a hole; the surrounding
            // constraint site re-checks or reports it.
            match info.elected {
                Some(t) => t,
                None => unit,
            }
        } else {
            self.ctxt.never()
        };
        self.finish(expr, ty, false, false, endpoints, expect)
    }

    fn check_while(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let bool_ty = self.ctxt.prim(PrimKind::Bool);
        let ExprKind::While { id, cond, body } = &mut expr.kind else {
            unreachable!()
        };
        let id = *id;
        self.loop_info.insert(id, LoopCheckInfo { elected: None });

        self.check_expr(cond, Expectation::Exact(bool_ty))?;
        let cond_e = cond.info.as_ref().expect("checked").endpoints.clone();

        let body_ty = self.check_expr(body, Expectation::None)?;
        let body_info = body.info.as_ref().expect("checked");
        let unit = self.ctxt.unit();
        if body_info.endpoints.normal && body_ty != unit {
            return Err(SemError::ty(
                body.span,
                "a `while` body must have type `()`",
            ));
        }

        // A `while` may carry `break value` only if the value is `()`.
        let info = self.loop_info.remove(&id).expect("loop entry pushed");
        if let Some(t) = info.elected {
            if t != unit && !self.ctxt.is_never(t) {
                return Err(SemError::ty(
                    expr.span,
                    "`break` with a value is only allowed inside `loop`",
                ));
            }
        }

        let mut endpoints = cond_e.then(&body_info.endpoints);
        endpoints.remove_loop(id);
        // The condition may be false on first evaluation.
        endpoints.normal = cond_e.normal;
        let ty = if cond_e.normal { unit } else { self.ctxt.never() };
        self.finish(expr, ty, false, false, endpoints, expect)
    }

    fn check_break(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::Break { value, target } = &mut expr.kind else {
            unreachable!()
        };
        let target = target
            .ok_or_else(|| SemError::invariant(span, "`break` was never linked to a loop"))?;

        let elected = self
            .loop_info
            .get(&target)
            .ok_or_else(|| SemError::invariant(span, "`break` targets a loop not being checked"))?
            .elected;

        let mut endpoints = EndpointSet::breaking(target);
        match value {
            Some(v) => {
                let vt = match elected {
                    Some(t) if !self.ctxt.is_hole(t) => {
                        self.check_expr(v, Expectation::Exact(t))?
                    }
                    _ => self.check_expr(v, Expectation::None)?,
                };
                endpoints = v
                    .info
                    .as_ref()
                    .expect("checked")
                    .endpoints
                    .then(&endpoints);
                self.elect_break_type(target, vt, span)?;
            }
            None => {
                let unit = self.ctxt.unit();
                self.elect_break_type(target, unit, span)?;
            }
        }

        let never = self.ctxt.never();
        self.finish(expr, never, false, false, endpoints, expect)
    }

    /// Record a break value type on its loop, merging with any earlier
    /// election: `!` yields, a hole upgrades to a concrete type, and two
    /// distinct concrete types are a mismatch.
    fn elect_break_type(&mut self, target: LoopId, vt: TypeId, span: Span) -> SemResult<()> {
        let prev = self
            .loop_info
            .get(&target)
            .expect("loop entry present")
            .elected;
        let merged = match prev {
            None => vt,
            Some(prev) if prev == vt || self.ctxt.is_never(vt) => prev,
            Some(prev) if self.ctxt.is_never(prev) || self.ctxt.is_hole(prev) => vt,
            Some(prev) if self.ctxt.is_hole(vt) => prev,
            Some(prev) => {
                return Err(SemError::ty(
                    span,
                    format!(
                        "`break` value type `{}` does not match earlier `break` type `{}`",
                        self.ctxt.display(vt),
                        self.ctxt.display(prev)
                    ),
                ))
            }
        };
        self.loop_info
            .get_mut(&target)
            .expect("loop entry present")
            .elected = Some(merged);
        Ok(())
    }

    fn check_return(&mut self, expr: &mut Expr, expect: Expectation) -> SemResult<TypeId> {
        let span = expr.span;
        let ExprKind::Return { value, target } = &mut expr.kind else {
            unreachable!()
        };
        let target = target
            .ok_or_else(|| SemError::invariant(span, "`return` was never linked to a function"))?;
        let ret = self.sigs[target].ret;

        let mut endpoints = EndpointSet::returning();
        match value {
            Some(v) => {
                self.check_expr(v, Expectation::Exact(ret))?;
                endpoints = v
                    .info
                    .as_ref()
                    .expect("checked")
                    .endpoints
                    .then(&endpoints);
            }
            None => {
                let unit = self.ctxt.unit();
                if !self.is_assignable(ret, unit) {
                    return Err(SemError::ty(
                        span,
                        format!(
                            "`return` without a value in a function returning `{}`",
                            self.ctxt.display(ret)
                        ),
                    ));
                }
            }
        }

        let never = self.ctxt.never();
        self.finish(expr, never, false, false, endpoints, expect)
    }
}

/// Thread the expectation through `!`/`-` when it names an integer (or
/// bool) so bare literals resolve; anything else probes freely.
fn expect_through_not(expect: Expectation, ctxt: &TyCtxt) -> Expectation {
    match expect.ty() {
        Some(t) if ctxt.is_integer(t) || ctxt.prim_kind(t) == Some(PrimKind::Bool) => expect,
        _ => Expectation::None,
    }
}

/// The expression kinds the constant evaluator supports.
fn is_const_kind(kind: &ExprKind) -> bool {
    matches!(
        kind,
        ExprKind::Literal(_)
            | ExprKind::ConstUse(_)
            | ExprKind::AssocConst { .. }
            | ExprKind::Unary { .. }
            | ExprKind::Binary { .. }
            | ExprKind::Cast { .. }
    )
}

/// Range-check an integer literal against its resolved kind.
fn check_literal_range(
    kind: PrimKind,
    value: u128,
    negative: bool,
    span: Span,
) -> SemResult<()> {
    let (min, max): (i128, i128) = match kind {
        PrimKind::I32 => (i32::MIN as i128, i32::MAX as i128),
        PrimKind::U32 => (0, u32::MAX as i128),
        PrimKind::Isize => (i64::MIN as i128, i64::MAX as i128),
        PrimKind::Usize => (0, u64::MAX as i128),
        _ => return Err(SemError::invariant(span, "integer literal of non-integer kind")),
    };
    if value > i128::MAX as u128 {
        return Err(SemError::ty(span, "integer literal is too large"));
    }
    let signed = if negative {
        -(value as i128)
    } else {
        value as i128
    };
    if signed < min || signed > max {
        return Err(SemError::ty(
            span,
            format!(
                "integer literal `{signed}` out of range for `{}`",
                kind.name()
            ),
        ));
    }
    Ok(())
}
