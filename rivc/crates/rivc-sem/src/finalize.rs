//! Type & const finalization.
//!
//! After this pass no [`TypeAnnotation::Syntactic`] remains anywhere in the
//! tree: every annotation holds an interned [`TypeId`], every array length
//! (in types and in `[elem; count]` expressions) is a materialized integer,
//! every constant definition carries its computed [`ConstValue`], and every
//! annotated binding pattern has stamped its [`Local`]'s type.
//!
//! Annotation resolution is exposed to the trait validator as the pure
//! [`ann_type`] / [`type_of_node`] helpers, which compute the interned type
//! without rewriting the annotation.

use tracing::debug;

use rivc_util::{IndexVec, Span};

use crate::consteval::{self, ConstCache, ConstValue};
use crate::error::{SemError, SemResult};
use crate::hir::*;
use crate::ty::{PrimKind, Ty, TyCtxt, TypeId};

/// Run finalization over the whole program.
pub fn finalize(program: &mut Program, ctxt: &mut TyCtxt) -> SemResult<()> {
    debug!(
        consts = program.consts.len(),
        funcs = program.funcs.len(),
        "type and const finalization"
    );
    let mut cache = ConstCache::new();

    finalize_struct_fields(program, ctxt, &mut cache)?;
    finalize_trait_sigs(program, ctxt, &mut cache)?;
    finalize_impl_targets(program)?;
    finalize_consts(program, ctxt, &mut cache)?;
    finalize_functions(program, ctxt, &mut cache)?;
    Ok(())
}

/// The interned type of an annotation, resolved but not rewritten.
pub(crate) fn ann_type(
    ann: &TypeAnnotation,
    ctxt: &mut TyCtxt,
    consts: &IndexVec<ConstId, ConstDef>,
    cache: &mut ConstCache,
) -> SemResult<TypeId> {
    match ann {
        TypeAnnotation::Resolved(id) => Ok(*id),
        TypeAnnotation::Syntactic(node) => type_of_node(node, ctxt, consts, cache),
    }
}

/// Resolve a syntactic type node to an interned type.
pub(crate) fn type_of_node(
    node: &TypeNode,
    ctxt: &mut TyCtxt,
    consts: &IndexVec<ConstId, ConstDef>,
    cache: &mut ConstCache,
) -> SemResult<TypeId> {
    match &node.kind {
        TypeNodeKind::Unit => Ok(ctxt.unit()),
        TypeNodeKind::Prim(kind) => Ok(ctxt.prim(*kind)),
        TypeNodeKind::Named { target, name } => match target {
            Some(TypeDefRef::Struct(sid)) => Ok(ctxt.intern(Ty::Struct(*sid))),
            Some(TypeDefRef::Enum(eid)) => Ok(ctxt.intern(Ty::Enum(*eid))),
            None => Err(SemError::invariant(
                node.span,
                format!("type `{name}` was not linked during name resolution"),
            )),
        },
        TypeNodeKind::SelfType { target } => match target {
            Some(TypeDefRef::Struct(sid)) => Ok(ctxt.intern(Ty::Struct(*sid))),
            Some(TypeDefRef::Enum(eid)) => Ok(ctxt.intern(Ty::Enum(*eid))),
            None => Err(SemError::invariant(
                node.span,
                "`Self` was not linked during name resolution",
            )),
        },
        TypeNodeKind::Ref { pointee, mutable } => {
            let inner = type_of_node(pointee, ctxt, consts, cache)?;
            Ok(ctxt.mk_ref(inner, *mutable))
        }
        TypeNodeKind::Array { elem, len } => {
            let elem_ty = type_of_node(elem, ctxt, consts, cache)?;
            let len = consteval::eval_array_len(cache, consts, &*ctxt, len)?;
            Ok(ctxt.mk_array(elem_ty, len))
        }
        TypeNodeKind::Infer => Err(SemError::ty(
            node.span,
            "the type placeholder `_` is not allowed here",
        )),
    }
}

fn finalize_struct_fields(
    program: &mut Program,
    ctxt: &mut TyCtxt,
    cache: &mut ConstCache,
) -> SemResult<()> {
    for id in program.struct_defs.indices() {
        let sid = program.struct_defs[id]
            .struct_id
            .ok_or_else(|| {
                SemError::invariant(program.struct_defs[id].span, "struct was never declared")
            })?;
        for i in 0..program.struct_defs[id].fields.len() {
            let ann = std::mem::replace(
                &mut program.struct_defs[id].fields[i].ann,
                TypeAnnotation::Resolved(TypeId::INVALID),
            );
            let ty = ann_type(&ann, ctxt, &program.consts, cache)?;
            program.struct_defs[id].fields[i].ann = TypeAnnotation::Resolved(ty);
            ctxt.struct_info_mut(sid).fields[i].ty = ty;
        }
    }
    Ok(())
}

fn finalize_trait_sigs(
    program: &mut Program,
    ctxt: &mut TyCtxt,
    cache: &mut ConstCache,
) -> SemResult<()> {
    for id in program.traits.indices() {
        for m in 0..program.traits[id].methods.len() {
            for p in 0..program.traits[id].methods[m].param_anns.len() {
                let ann = std::mem::replace(
                    &mut program.traits[id].methods[m].param_anns[p],
                    TypeAnnotation::Resolved(TypeId::INVALID),
                );
                let ty = ann_type(&ann, ctxt, &program.consts, cache)?;
                program.traits[id].methods[m].param_anns[p] = TypeAnnotation::Resolved(ty);
            }
            let ret = match &program.traits[id].methods[m].ret_ann {
                Some(ann) => ann_type(ann, ctxt, &program.consts, cache)?,
                None => ctxt.unit(),
            };
            program.traits[id].methods[m].ret_ann = Some(TypeAnnotation::Resolved(ret));
        }
        for c in 0..program.traits[id].consts.len() {
            let ann = std::mem::replace(
                &mut program.traits[id].consts[c].ann,
                TypeAnnotation::Resolved(TypeId::INVALID),
            );
            let ty = ann_type(&ann, ctxt, &program.consts, cache)?;
            program.traits[id].consts[c].ann = TypeAnnotation::Resolved(ty);
        }
    }
    Ok(())
}

fn finalize_impl_targets(program: &mut Program) -> SemResult<()> {
    for id in program.impls.indices() {
        let target = program.impls[id].target.ok_or_else(|| {
            SemError::invariant(program.impls[id].span, "impl target was never resolved")
        })?;
        program.impls[id].target_ann = TypeAnnotation::Resolved(target);
    }
    Ok(())
}

fn finalize_consts(
    program: &mut Program,
    ctxt: &mut TyCtxt,
    cache: &mut ConstCache,
) -> SemResult<()> {
    // Resolve declared types first so const evaluation sees every
    // expectation.
    for id in program.consts.indices() {
        let ann = std::mem::replace(
            &mut program.consts[id].ann,
            TypeAnnotation::Resolved(TypeId::INVALID),
        );
        let ty = ann_type(&ann, ctxt, &program.consts, cache)?;
        program.consts[id].ann = TypeAnnotation::Resolved(ty);
    }

    // Finalize annotations nested inside initializers (casts, repeat
    // counts), then evaluate.
    for id in program.consts.indices() {
        let mut init = std::mem::replace(
            &mut program.consts[id].init,
            Expr::new(ExprKind::Literal(Lit::Unit), Span::DUMMY),
        );
        {
            let Program { consts, funcs, .. } = &mut *program;
                let consts = &*consts;
            let mut env = ExprFinalizer {
                ctxt,
                consts,
                cache,
                locals: None,
                funcs,
            };
            env.finalize_expr(&mut init)?;
        }
        program.consts[id].init = init;
    }

    for id in program.consts.indices() {
        let value = consteval::eval_const(cache, &program.consts, &*ctxt, id)?;
        let declared = program.consts[id].ann.ty();
        check_const_value_type(&value, declared, ctxt, program.consts[id].span)?;
        program.consts[id].value = Some(value);
    }
    Ok(())
}

/// The computed value must inhabit the declared type exactly.
fn check_const_value_type(
    value: &ConstValue,
    declared: TypeId,
    ctxt: &mut TyCtxt,
    span: Span,
) -> SemResult<()> {
    let value_ty = match value {
        ConstValue::Int { kind, .. } => ctxt.prim(*kind),
        ConstValue::Bool(_) => ctxt.prim(PrimKind::Bool),
        ConstValue::Char(_) => ctxt.prim(PrimKind::Char),
        ConstValue::Str(_) => ctxt.prim(PrimKind::Str),
    };
    if value_ty != declared {
        return Err(SemError::konst(
            span,
            format!(
                "constant value of type `{}` does not match declared type `{}`",
                ctxt.display(value_ty),
                ctxt.display(declared)
            ),
        ));
    }
    Ok(())
}

fn finalize_functions(
    program: &mut Program,
    ctxt: &mut TyCtxt,
    cache: &mut ConstCache,
) -> SemResult<()> {
    // Stamp `self` locals from each impl's target type.
    for id in program.impls.indices() {
        let target = program.impls[id].target.expect("impl target resolved");
        for fid in program.impls[id].funcs.clone() {
            let Some(self_param) = program.funcs[fid].self_param else {
                continue;
            };
            let self_ty = if self_param.is_ref {
                ctxt.mk_ref(target, self_param.is_mut)
            } else {
                target
            };
            let lid = self_param.local.ok_or_else(|| {
                SemError::invariant(self_param.span, "`self` local was never bound")
            })?;
            program.funcs[fid].locals[lid].ty = self_ty;
        }
    }

    for fid in program.funcs.indices() {
        // Parameter annotations, stamping their patterns.
        for i in 0..program.funcs[fid].param_anns.len() {
            let ann = std::mem::replace(
                &mut program.funcs[fid].param_anns[i],
                TypeAnnotation::Resolved(TypeId::INVALID),
            );
            let ty = ann_type(&ann, ctxt, &program.consts, cache)?;
            program.funcs[fid].param_anns[i] = TypeAnnotation::Resolved(ty);

            let mut pat = std::mem::replace(
                &mut program.funcs[fid].params[i],
                Pattern {
                    kind: PatternKind::Wildcard,
                    span: Span::DUMMY,
                },
            );
            stamp_pattern(&pat, ty, &mut program.funcs[fid].locals, ctxt)?;
            std::mem::swap(&mut program.funcs[fid].params[i], &mut pat);
        }

        // Return type, defaulting to unit.
        let ret = match &program.funcs[fid].ret_ann {
            Some(ann) => ann_type(ann, ctxt, &program.consts, cache)?,
            None => ctxt.unit(),
        };
        program.funcs[fid].ret_ann = Some(TypeAnnotation::Resolved(ret));

        // Body: nested annotations, repeat counts, annotated lets.
        if let Some(mut body) = program.funcs[fid].body.take() {
            {
                let Program { consts, funcs, .. } = &mut *program;
                let consts = &*consts;
                let mut env = ExprFinalizer {
                    ctxt,
                    consts,
                    cache,
                    locals: Some(fid),
                    funcs,
                };
                env.finalize_expr(&mut body)?;
            }
            program.funcs[fid].body = Some(body);
        }
    }
    Ok(())
}

/// Stamp a resolved type onto the locals bound by a pattern.
///
/// Reference patterns must match a reference type of the same mutability
/// and strip one layer.
pub(crate) fn stamp_pattern(
    pat: &Pattern,
    ty: TypeId,
    locals: &mut IndexVec<LocalId, Local>,
    ctxt: &mut TyCtxt,
) -> SemResult<()> {
    match &pat.kind {
        PatternKind::Wildcard => Ok(()),
        PatternKind::Binding(BindingDef::Resolved(lid)) => {
            let is_ref = locals[*lid].is_ref;
            locals[*lid].ty = if is_ref { ctxt.mk_ref(ty, false) } else { ty };
            Ok(())
        }
        PatternKind::Binding(BindingDef::Unresolved { .. }) => Err(SemError::invariant(
            pat.span,
            "binding pattern survived name resolution",
        )),
        PatternKind::Ref { inner, mutable } => match *ctxt.kind(ty) {
            Ty::Ref { pointee, mutable: m } if m == *mutable => {
                stamp_pattern(inner, pointee, locals, ctxt)
            }
            Ty::Ref { .. } => Err(SemError::ty(
                pat.span,
                "reference pattern mutability does not match the matched type",
            )),
            _ => Err(SemError::ty(
                pat.span,
                format!(
                    "reference pattern cannot match non-reference type `{}`",
                    ctxt.display(ty)
                ),
            )),
        },
    }
}

/// Walker replacing the syntactic leftovers inside an expression tree.
struct ExprFinalizer<'a> {
    ctxt: &'a mut TyCtxt,
    consts: &'a IndexVec<ConstId, ConstDef>,
    cache: &'a mut ConstCache,
    /// Function whose locals annotated lets stamp into; `None` inside
    /// constant initializers.
    locals: Option<FuncId>,
    funcs: &'a mut IndexVec<FuncId, Function>,
}

impl<'a> ExprFinalizer<'a> {
    fn finalize_expr(&mut self, expr: &mut Expr) -> SemResult<()> {
        match &mut expr.kind {
            ExprKind::Cast { operand, ann } => {
                self.finalize_expr(operand)?;
                if let TypeAnnotation::Syntactic(node) = ann {
                    let ty = type_of_node(node, self.ctxt, self.consts, self.cache)?;
                    *ann = TypeAnnotation::Resolved(ty);
                }
                Ok(())
            }
            ExprKind::ArrayRepeat { elem, count } => {
                self.finalize_expr(elem)?;
                let n = consteval::eval_count(self.cache, self.consts, &*self.ctxt, count)?;
                *count = ArrayCount::Resolved(n);
                Ok(())
            }
            ExprKind::Block(block) => {
                for stmt in &mut block.stmts {
                    match stmt {
                        Stmt::Let(l) => {
                            if let Some(ann) = &mut l.ann {
                                if let TypeAnnotation::Syntactic(node) = ann {
                                    let ty =
                                        type_of_node(node, self.ctxt, self.consts, self.cache)?;
                                    *ann = TypeAnnotation::Resolved(ty);
                                }
                                let ty = l.ann.as_ref().expect("just set").ty();
                                let fid = self.locals.ok_or_else(|| {
                                    SemError::invariant(
                                        l.span,
                                        "let statement outside a function body",
                                    )
                                })?;
                                stamp_pattern(&l.pat, ty, &mut self.funcs[fid].locals, self.ctxt)?;
                            }
                            self.finalize_expr(&mut l.init)?;
                        }
                        Stmt::Expr(e) => self.finalize_expr(e)?,
                    }
                }
                if let Some(tail) = &mut block.tail {
                    self.finalize_expr(tail)?;
                }
                Ok(())
            }
            _ => crate::cfl::walk_children(expr, &mut |e| self.finalize_expr(e)),
        }
    }
}
