//! The predefined environment.
//!
//! Built-ins are installed as body-less arena functions with already
//! resolved signatures, so every later pass treats them exactly like user
//! code: calls resolve to a `FuncUse`, methods resolve through the impl
//! table, and lowering can dispatch on [`Builtin`].
//!
//! The exhaustive set:
//!
//! | name | signature |
//! |---|---|
//! | `print` / `println` | `(&String) -> ()` |
//! | `printInt` / `printlnInt` | `(i32) -> ()` |
//! | `getString` | `() -> String` |
//! | `getInt` | `() -> i32` |
//! | `exit` | `(i32) -> !` |
//! | `String::append` | `(&mut self, &String) -> ()` |
//! | `String::len` | `(&self) -> usize` |
//! | `{i32,u32,isize,usize}::to_string` | `(self) -> String` |
//! | `[T; N]::len` | `(&self) -> usize` (synthetic, every array type) |

use rivc_util::{IndexVec, Span, Symbol};

use crate::error::SemResult;
use crate::hir::{
    Builtin, FuncId, Function, Pattern, PatternKind, Program, SelfParam, TypeAnnotation,
};
use crate::impl_table::ImplTable;
use crate::scope::{ScopeStack, ValueDef};
use crate::ty::{PrimKind, TyCtxt, TypeId};

/// Arena ids of built-ins that later passes must recognize directly.
#[derive(Clone, Copy, Debug)]
pub struct BuiltinIds {
    /// `exit(i32) -> !`; the exit check keys on this id.
    pub exit: FuncId,
    /// The synthetic array `len`.
    pub array_len: FuncId,
}

/// Install every built-in into the program arenas, the predefined scope and
/// the impl table.
pub fn install(
    program: &mut Program,
    ctxt: &mut TyCtxt,
    scopes: &mut ScopeStack,
    impls: &mut ImplTable,
) -> SemResult<BuiltinIds> {
    let unit = ctxt.unit();
    let never = ctxt.never();
    let i32_ty = ctxt.prim(PrimKind::I32);
    let usize_ty = ctxt.prim(PrimKind::Usize);
    let string_ty = ctxt.prim(PrimKind::Str);
    let str_ref = ctxt.mk_ref(string_ty, false);

    let mut free_fn = |program: &mut Program,
                       scopes: &mut ScopeStack,
                       name: &str,
                       params: Vec<TypeId>,
                       ret: TypeId,
                       builtin: Builtin|
     -> SemResult<FuncId> {
        let id = push_builtin(program, name, None, params, ret, builtin);
        scopes.declare_value_item(
            Symbol::intern(name),
            ValueDef::Func(id),
            Span::DUMMY,
        )?;
        Ok(id)
    };

    free_fn(program, scopes, "print", vec![str_ref], unit, Builtin::Print)?;
    free_fn(program, scopes, "println", vec![str_ref], unit, Builtin::Println)?;
    free_fn(program, scopes, "printInt", vec![i32_ty], unit, Builtin::PrintInt)?;
    free_fn(program, scopes, "printlnInt", vec![i32_ty], unit, Builtin::PrintlnInt)?;
    free_fn(program, scopes, "getString", vec![], string_ty, Builtin::GetString)?;
    free_fn(program, scopes, "getInt", vec![], i32_ty, Builtin::GetInt)?;
    let exit = free_fn(program, scopes, "exit", vec![i32_ty], never, Builtin::Exit)?;

    // String methods.
    let append = push_builtin(
        program,
        "append",
        Some(self_shape(true, true)),
        vec![str_ref],
        unit,
        Builtin::StrAppend,
    );
    impls.add_method(string_ty, Symbol::intern("append"), append, Span::DUMMY)?;
    let str_len = push_builtin(
        program,
        "len",
        Some(self_shape(true, false)),
        vec![],
        usize_ty,
        Builtin::StrLen,
    );
    impls.add_method(string_ty, Symbol::intern("len"), str_len, Span::DUMMY)?;

    // Integer to_string methods, one per width.
    for kind in [PrimKind::I32, PrimKind::U32, PrimKind::Isize, PrimKind::Usize] {
        let target = ctxt.prim(kind);
        let id = push_builtin(
            program,
            "to_string",
            Some(self_shape(false, false)),
            vec![],
            string_ty,
            Builtin::ToString(kind),
        );
        impls.add_method(target, Symbol::intern("to_string"), id, Span::DUMMY)?;
    }

    // The synthetic array `len`, answered for every array type.
    let array_len = push_builtin(
        program,
        "len",
        Some(self_shape(true, false)),
        vec![],
        usize_ty,
        Builtin::ArrayLen,
    );
    impls.set_array_len(array_len);

    Ok(BuiltinIds { exit, array_len })
}

fn self_shape(is_ref: bool, is_mut: bool) -> SelfParam {
    SelfParam {
        is_ref,
        is_mut,
        local: None,
        span: Span::DUMMY,
    }
}

fn push_builtin(
    program: &mut Program,
    name: &str,
    self_param: Option<SelfParam>,
    params: Vec<TypeId>,
    ret: TypeId,
    builtin: Builtin,
) -> FuncId {
    let param_anns: Vec<TypeAnnotation> =
        params.iter().map(|ty| TypeAnnotation::Resolved(*ty)).collect();
    let params: Vec<Pattern> = params
        .iter()
        .map(|_| Pattern {
            kind: PatternKind::Wildcard,
            span: Span::DUMMY,
        })
        .collect();
    program.funcs.push(Function {
        name: Symbol::intern(name),
        self_param,
        params,
        param_anns,
        ret_ann: Some(TypeAnnotation::Resolved(ret)),
        body: None,
        locals: IndexVec::new(),
        builtin: Some(builtin),
        span: Span::DUMMY,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_populates_everything() {
        let mut program = Program::default();
        let mut ctxt = TyCtxt::new();
        let mut scopes = ScopeStack::new();
        let mut impls = ImplTable::new();

        let ids = install(&mut program, &mut ctxt, &mut scopes, &mut impls).unwrap();

        // Free functions land in the predefined scope.
        let exit = scopes.lookup_value(Symbol::intern("exit"));
        assert_eq!(exit, Some(ValueDef::Func(ids.exit)));
        assert!(scopes.lookup_value(Symbol::intern("getString")).is_some());

        // exit returns `!`.
        let exit_fn = &program.funcs[ids.exit];
        let ret = exit_fn.ret_ann.as_ref().unwrap().ty();
        assert!(ctxt.is_never(ret));
        assert_eq!(exit_fn.builtin, Some(Builtin::Exit));

        // String methods resolve through the impl table.
        let string_ty = ctxt.prim(PrimKind::Str);
        assert!(impls
            .lookup_method(&ctxt, string_ty, Symbol::intern("append"))
            .is_some());
        assert!(impls
            .lookup_method(&ctxt, string_ty, Symbol::intern("len"))
            .is_some());

        // to_string exists for each integer width.
        for kind in [PrimKind::I32, PrimKind::U32, PrimKind::Isize, PrimKind::Usize] {
            let ty = ctxt.prim(kind);
            assert!(impls
                .lookup_method(&ctxt, ty, Symbol::intern("to_string"))
                .is_some());
        }

        // Arrays answer len via the synthetic method.
        let i32_ty = ctxt.prim(PrimKind::I32);
        let arr = ctxt.mk_array(i32_ty, 5);
        assert_eq!(
            impls.lookup_method(&ctxt, arr, Symbol::intern("len")),
            Some(ids.array_len)
        );
    }
}
