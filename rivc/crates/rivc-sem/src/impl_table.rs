//! The impl table: associated items keyed by target type.
//!
//! Name resolution registers every impl-block item here; the checker and
//! the path resolver look items up by `(TypeId, name)`. One special case is
//! hard-coded: every array type answers the method name `len` with the
//! synthetic built-in `[T; N]::len(&self) -> usize`.

use indexmap::IndexMap;
use rivc_util::{FxHashMap, Span, Symbol};

use crate::error::{SemError, SemResult};
use crate::hir::{ConstId, FuncId};
use crate::ty::{Ty, TyCtxt, TypeId};

/// Associated items of one target type.
#[derive(Debug, Default)]
pub struct TypeImpls {
    /// Associated functions (no `self`).
    pub fns: FxHashMap<Symbol, FuncId>,
    /// Associated constants.
    pub consts: FxHashMap<Symbol, ConstId>,
    /// Methods (take `self` in some shape).
    pub methods: FxHashMap<Symbol, FuncId>,
}

/// Table of all impls, keyed by interned target type.
#[derive(Debug, Default)]
pub struct ImplTable {
    entries: IndexMap<TypeId, TypeImpls>,
    /// The synthetic array `len` method, installed with the built-ins.
    array_len: Option<FuncId>,
}

impl ImplTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_array_len(&mut self, id: FuncId) {
        self.array_len = Some(id);
    }

    fn entry(&mut self, ty: TypeId) -> &mut TypeImpls {
        self.entries.entry(ty).or_default()
    }

    pub fn add_assoc_fn(
        &mut self,
        ty: TypeId,
        name: Symbol,
        id: FuncId,
        span: Span,
    ) -> SemResult<()> {
        let slot = self.entry(ty);
        if slot.fns.insert(name, id).is_some() {
            return Err(SemError::name(
                span,
                format!("duplicate associated function `{name}`"),
            ));
        }
        Ok(())
    }

    pub fn add_assoc_const(
        &mut self,
        ty: TypeId,
        name: Symbol,
        id: ConstId,
        span: Span,
    ) -> SemResult<()> {
        let slot = self.entry(ty);
        if slot.consts.insert(name, id).is_some() {
            return Err(SemError::name(
                span,
                format!("duplicate associated constant `{name}`"),
            ));
        }
        Ok(())
    }

    pub fn add_method(
        &mut self,
        ty: TypeId,
        name: Symbol,
        id: FuncId,
        span: Span,
    ) -> SemResult<()> {
        let slot = self.entry(ty);
        if slot.methods.insert(name, id).is_some() {
            return Err(SemError::name(span, format!("duplicate method `{name}`")));
        }
        Ok(())
    }

    pub fn lookup_assoc_fn(&self, ty: TypeId, name: Symbol) -> Option<FuncId> {
        self.entries.get(&ty)?.fns.get(&name).copied()
    }

    pub fn lookup_assoc_const(&self, ty: TypeId, name: Symbol) -> Option<ConstId> {
        self.entries.get(&ty)?.consts.get(&name).copied()
    }

    /// Method lookup. Arrays answer `len` with the synthetic built-in.
    pub fn lookup_method(&self, ctxt: &TyCtxt, ty: TypeId, name: Symbol) -> Option<FuncId> {
        if matches!(ctxt.kind(ty), Ty::Array { .. }) && name.as_str() == "len" {
            return self.array_len;
        }
        self.entries.get(&ty)?.methods.get(&name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ty::PrimKind;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn test_register_and_lookup() {
        let mut ctxt = TyCtxt::new();
        let sid = ctxt.declare_struct(sym("P"), Vec::new());
        let ty = ctxt.intern(Ty::Struct(sid));

        let mut table = ImplTable::new();
        table.add_assoc_fn(ty, sym("new"), FuncId(0), Span::DUMMY).unwrap();
        table.add_method(ty, sym("get"), FuncId(1), Span::DUMMY).unwrap();
        table.add_assoc_const(ty, sym("ZERO"), ConstId(0), Span::DUMMY).unwrap();

        assert_eq!(table.lookup_assoc_fn(ty, sym("new")), Some(FuncId(0)));
        assert_eq!(table.lookup_method(&ctxt, ty, sym("get")), Some(FuncId(1)));
        assert_eq!(table.lookup_assoc_const(ty, sym("ZERO")), Some(ConstId(0)));
        assert_eq!(table.lookup_method(&ctxt, ty, sym("new")), None);
    }

    #[test]
    fn test_duplicate_method_is_error() {
        let mut ctxt = TyCtxt::new();
        let ty = ctxt.prim(PrimKind::I32);
        let mut table = ImplTable::new();
        table.add_method(ty, sym("m"), FuncId(0), Span::DUMMY).unwrap();
        assert!(table.add_method(ty, sym("m"), FuncId(1), Span::DUMMY).is_err());
    }

    #[test]
    fn test_every_array_type_answers_len() {
        let mut ctxt = TyCtxt::new();
        let i32_ty = ctxt.prim(PrimKind::I32);
        let a3 = ctxt.mk_array(i32_ty, 3);
        let a9 = ctxt.mk_array(i32_ty, 9);

        let mut table = ImplTable::new();
        table.set_array_len(FuncId(7));
        assert_eq!(table.lookup_method(&ctxt, a3, sym("len")), Some(FuncId(7)));
        assert_eq!(table.lookup_method(&ctxt, a9, sym("len")), Some(FuncId(7)));
        assert_eq!(table.lookup_method(&ctxt, i32_ty, sym("len")), None);
        assert_eq!(table.lookup_method(&ctxt, a3, sym("push")), None);
    }
}
