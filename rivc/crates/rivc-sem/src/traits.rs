//! Trait impl validation.
//!
//! For every `impl Trait for Type`, each item the trait requires must be
//! present in the impl with the same kind, the same name and, once
//! annotations resolve, identical parameter and return type ids. Extra impl
//! items are permitted; inherent impls are skipped.

use tracing::debug;

use crate::consteval::ConstCache;
use crate::error::{SemError, SemResult};
use crate::finalize::ann_type;
use crate::hir::*;
use crate::ty::TyCtxt;

/// Validate every trait impl in the program.
pub fn validate(program: &Program, ctxt: &mut TyCtxt) -> SemResult<()> {
    debug!(impls = program.impls.len(), "trait validation");
    let mut cache = ConstCache::new();

    for impl_block in program.impls.iter() {
        let Some(trait_id) = impl_block.trait_ref else {
            continue;
        };
        let trait_def = &program.traits[trait_id];

        for required in &trait_def.methods {
            check_required_method(program, ctxt, &mut cache, impl_block, trait_def, required)?;
        }
        for required in &trait_def.consts {
            check_required_const(program, ctxt, &mut cache, impl_block, trait_def, required)?;
        }
    }
    Ok(())
}

fn check_required_method(
    program: &Program,
    ctxt: &mut TyCtxt,
    cache: &mut ConstCache,
    impl_block: &ImplBlock,
    trait_def: &TraitDef,
    required: &TraitMethodSig,
) -> SemResult<()> {
    let Some(&fid) = impl_block
        .funcs
        .iter()
        .find(|fid| program.funcs[**fid].name == required.name)
    else {
        return Err(SemError::trait_err(
            impl_block.span,
            format!(
                "missing required item `{}` of trait `{}`",
                required.name, trait_def.name
            ),
        ));
    };
    let func = &program.funcs[fid];

    let self_matches = match (&required.self_param, &func.self_param) {
        (None, None) => true,
        (Some(a), Some(b)) => a.is_ref == b.is_ref && a.is_mut == b.is_mut,
        _ => false,
    };
    if !self_matches {
        return Err(SemError::trait_err(
            func.span,
            format!(
                "`{}` has a different `self` shape than trait `{}` requires",
                required.name, trait_def.name
            ),
        ));
    }

    if func.param_anns.len() != required.param_anns.len() {
        return Err(SemError::trait_err(
            func.span,
            format!(
                "`{}` takes {} parameter(s) but trait `{}` requires {}",
                required.name,
                func.param_anns.len(),
                trait_def.name,
                required.param_anns.len()
            ),
        ));
    }

    for (impl_ann, trait_ann) in func.param_anns.iter().zip(&required.param_anns) {
        let impl_ty = ann_type(impl_ann, ctxt, &program.consts, cache)?;
        let trait_ty = ann_type(trait_ann, ctxt, &program.consts, cache)?;
        if impl_ty != trait_ty {
            return Err(SemError::trait_err(
                func.span,
                format!(
                    "parameter type `{}` does not match `{}` required by trait `{}`",
                    ctxt.display(impl_ty),
                    ctxt.display(trait_ty),
                    trait_def.name
                ),
            ));
        }
    }

    let impl_ret = match &func.ret_ann {
        Some(ann) => ann_type(ann, ctxt, &program.consts, cache)?,
        None => ctxt.unit(),
    };
    let trait_ret = match &required.ret_ann {
        Some(ann) => ann_type(ann, ctxt, &program.consts, cache)?,
        None => ctxt.unit(),
    };
    if impl_ret != trait_ret {
        return Err(SemError::trait_err(
            func.span,
            format!(
                "return type `{}` does not match `{}` required by trait `{}`",
                ctxt.display(impl_ret),
                ctxt.display(trait_ret),
                trait_def.name
            ),
        ));
    }
    Ok(())
}

fn check_required_const(
    program: &Program,
    ctxt: &mut TyCtxt,
    cache: &mut ConstCache,
    impl_block: &ImplBlock,
    trait_def: &TraitDef,
    required: &TraitConstSig,
) -> SemResult<()> {
    let Some(&cid) = impl_block
        .consts
        .iter()
        .find(|cid| program.consts[**cid].name == required.name)
    else {
        return Err(SemError::trait_err(
            impl_block.span,
            format!(
                "missing required item `{}` of trait `{}`",
                required.name, trait_def.name
            ),
        ));
    };
    let konst = &program.consts[cid];

    let impl_ty = ann_type(&konst.ann, ctxt, &program.consts, cache)?;
    let trait_ty = ann_type(&required.ann, ctxt, &program.consts, cache)?;
    if impl_ty != trait_ty {
        return Err(SemError::trait_err(
            konst.span,
            format!(
                "constant type `{}` does not match `{}` required by trait `{}`",
                ctxt.display(impl_ty),
                ctxt.display(trait_ty),
                trait_def.name
            ),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rivc_util::FileId;

    fn validate_src(src: &str) -> SemResult<()> {
        let tokens = rivc_lex::lex(src, FileId::DUMMY).unwrap();
        let ast = rivc_par::parse(tokens).unwrap();
        let mut program = crate::lower::lower_program(ast);
        let mut ctxt = crate::ty::TyCtxt::new();
        crate::resolve::resolve(&mut program, &mut ctxt)?;
        validate(&program, &mut ctxt)
    }

    #[test]
    fn test_complete_impl_passes() {
        validate_src(
            "trait T { fn f(&self) -> i32; const N: i32; } \
             struct S; \
             impl T for S { fn f(&self) -> i32 { 0 } const N: i32 = 1; }",
        )
        .unwrap();
    }

    #[test]
    fn test_missing_method_is_fatal() {
        let err = validate_src(
            "trait T { fn f(&self) -> i32; } \
             struct S; \
             impl T for S { fn g(&self) -> i32 { 0 } }",
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Trait);
        assert!(err.message.contains("`f`"));
    }

    #[test]
    fn test_return_type_mismatch_is_fatal() {
        let err = validate_src(
            "trait T { fn f(&self) -> i32; } \
             struct S; \
             impl T for S { fn f(&self) -> bool { true } }",
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Trait);
    }

    #[test]
    fn test_param_type_mismatch_is_fatal() {
        let err = validate_src(
            "trait T { fn f(&self, x: i32); } \
             struct S; \
             impl T for S { fn f(&self, x: u32) { } }",
        )
        .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Trait);
    }

    #[test]
    fn test_arity_mismatch_is_fatal() {
        let err = validate_src(
            "trait T { fn f(&self, x: i32); } \
             struct S; \
             impl T for S { fn f(&self) { } }",
        )
        .unwrap_err();
        assert!(err.message.contains("parameter"));
    }

    #[test]
    fn test_self_shape_mismatch_is_fatal() {
        let err = validate_src(
            "trait T { fn f(&mut self); } \
             struct S; \
             impl T for S { fn f(&self) { } }",
        )
        .unwrap_err();
        assert!(err.message.contains("self"));
    }

    #[test]
    fn test_missing_const_is_fatal() {
        let err = validate_src(
            "trait T { const N: i32; } struct S; impl T for S { }",
        )
        .unwrap_err();
        assert!(err.message.contains("`N`"));
    }

    #[test]
    fn test_extra_items_are_permitted() {
        validate_src(
            "trait T { fn f(&self); } \
             struct S; \
             impl T for S { fn f(&self) { } fn extra(&self) -> i32 { 1 } }",
        )
        .unwrap();
    }

    #[test]
    fn test_inherent_impl_skipped() {
        validate_src("struct S; impl S { fn anything(&self) -> bool { true } }").unwrap();
    }
}
