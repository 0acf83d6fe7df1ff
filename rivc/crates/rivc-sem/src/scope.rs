//! Lexical scope stack for name resolution.
//!
//! A [`Scope`] holds two name tables: one for values (locals, constants,
//! functions, constructors) and one for type definitions (structs, enums,
//! traits). Scopes form a stack walked from the innermost outwards.
//!
//! Function and method bodies push a scope marked as a *boundary*: value
//! lookup crosses a boundary only for items (never for locals), while type
//! lookup ignores boundaries entirely. Locals shadow freely; item
//! declarations collide.

use rivc_util::{FxHashMap, Span, Symbol};

use crate::error::{SemError, SemResult};
use crate::hir::{ConstId, FuncId, LocalId, TraitDefId};
use crate::ty::{EnumId, StructId};

/// What a name means in value position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueDef {
    Local(LocalId),
    Func(FuncId),
    Const(ConstId),
    /// A unit-struct constructor used as a value, e.g. `let s = S;`.
    StructCtor(StructId),
    /// An enum variant constructor registered under its bare name.
    VariantCtor { enum_id: EnumId, variant: usize },
}

/// What a name means in type position.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeEntry {
    Struct(StructId),
    Enum(EnumId),
    Trait(TraitDefId),
}

#[derive(Default)]
struct Scope {
    is_boundary: bool,
    values: FxHashMap<Symbol, ValueDef>,
    types: FxHashMap<Symbol, TypeEntry>,
}

/// The scope stack. Always contains at least the predefined root scope.
pub struct ScopeStack {
    scopes: Vec<Scope>,
}

impl ScopeStack {
    /// Create a stack holding only the (empty) predefined root scope.
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope::default()],
        }
    }

    pub fn push(&mut self, is_boundary: bool) {
        self.scopes.push(Scope {
            is_boundary,
            ..Scope::default()
        });
    }

    pub fn pop(&mut self) {
        debug_assert!(self.scopes.len() > 1, "cannot pop the predefined scope");
        self.scopes.pop();
    }

    /// Declare a value that shadows freely (locals).
    pub fn declare_local(&mut self, name: Symbol, local: LocalId) {
        self.current().values.insert(name, ValueDef::Local(local));
    }

    /// Declare an item value; a second declaration in the same scope is a
    /// duplicate-declaration error.
    pub fn declare_value_item(
        &mut self,
        name: Symbol,
        def: ValueDef,
        span: Span,
    ) -> SemResult<()> {
        if self.current().values.contains_key(&name) {
            return Err(SemError::name(
                span,
                format!("duplicate declaration of `{name}`"),
            ));
        }
        self.current().values.insert(name, def);
        Ok(())
    }

    /// Declare an enum variant constructor under its bare name. Collisions
    /// are not errors: the first registration wins and later ones stay
    /// reachable through `Enum::Variant` paths.
    pub fn declare_variant_ctor(&mut self, name: Symbol, enum_id: EnumId, variant: usize) {
        self.current()
            .values
            .entry(name)
            .or_insert(ValueDef::VariantCtor { enum_id, variant });
    }

    pub fn declare_type(&mut self, name: Symbol, entry: TypeEntry, span: Span) -> SemResult<()> {
        if self.current().types.contains_key(&name) {
            return Err(SemError::name(
                span,
                format!("duplicate declaration of type `{name}`"),
            ));
        }
        self.current().types.insert(name, entry);
        Ok(())
    }

    /// Install the `Self` alias inside an impl body (shadowing permitted).
    pub fn declare_self_type(&mut self, entry: TypeEntry) {
        self.current().types.insert(Symbol::intern("Self"), entry);
    }

    /// Resolve a name in value position. Locals become invisible once the
    /// walk crosses a function boundary.
    pub fn lookup_value(&self, name: Symbol) -> Option<ValueDef> {
        let mut crossed_boundary = false;
        for scope in self.scopes.iter().rev() {
            if let Some(def) = scope.values.get(&name) {
                match def {
                    ValueDef::Local(_) if crossed_boundary => {}
                    _ => return Some(*def),
                }
            }
            crossed_boundary |= scope.is_boundary;
        }
        None
    }

    /// Resolve a name in type position; boundaries do not apply.
    pub fn lookup_type(&self, name: Symbol) -> Option<TypeEntry> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.types.get(&name).copied())
    }

    fn current(&mut self) -> &mut Scope {
        self.scopes.last_mut().expect("scope stack never empty")
    }
}

impl Default for ScopeStack {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sym(s: &str) -> Symbol {
        Symbol::intern(s)
    }

    #[test]
    fn test_shadowing_within_and_across_scopes() {
        let mut scopes = ScopeStack::new();
        scopes.push(true);
        scopes.declare_local(sym("x"), LocalId(0));
        scopes.declare_local(sym("x"), LocalId(1));
        assert_eq!(scopes.lookup_value(sym("x")), Some(ValueDef::Local(LocalId(1))));

        scopes.push(false);
        scopes.declare_local(sym("x"), LocalId(2));
        assert_eq!(scopes.lookup_value(sym("x")), Some(ValueDef::Local(LocalId(2))));
        scopes.pop();
        assert_eq!(scopes.lookup_value(sym("x")), Some(ValueDef::Local(LocalId(1))));
    }

    #[test]
    fn test_boundary_hides_locals_but_not_items() {
        let mut scopes = ScopeStack::new();
        scopes
            .declare_value_item(sym("f"), ValueDef::Func(FuncId(0)), Span::DUMMY)
            .unwrap();
        scopes.push(true);
        scopes.declare_local(sym("x"), LocalId(0));

        // Inner function boundary: `x` is gone, `f` is visible.
        scopes.push(true);
        assert_eq!(scopes.lookup_value(sym("x")), None);
        assert_eq!(scopes.lookup_value(sym("f")), Some(ValueDef::Func(FuncId(0))));
    }

    #[test]
    fn test_duplicate_item_is_error() {
        let mut scopes = ScopeStack::new();
        scopes
            .declare_value_item(sym("f"), ValueDef::Func(FuncId(0)), Span::DUMMY)
            .unwrap();
        let err = scopes
            .declare_value_item(sym("f"), ValueDef::Func(FuncId(1)), Span::DUMMY)
            .unwrap_err();
        assert_eq!(err.kind, crate::error::ErrorKind::Name);
    }

    #[test]
    fn test_type_lookup_ignores_boundaries() {
        let mut scopes = ScopeStack::new();
        scopes
            .declare_type(sym("P"), TypeEntry::Struct(StructId(0)), Span::DUMMY)
            .unwrap();
        scopes.push(true);
        scopes.push(true);
        assert_eq!(scopes.lookup_type(sym("P")), Some(TypeEntry::Struct(StructId(0))));
    }

    #[test]
    fn test_variant_ctor_first_wins() {
        let mut scopes = ScopeStack::new();
        scopes.declare_variant_ctor(sym("Red"), EnumId(0), 0);
        scopes.declare_variant_ctor(sym("Red"), EnumId(1), 2);
        assert_eq!(
            scopes.lookup_value(sym("Red")),
            Some(ValueDef::VariantCtor { enum_id: EnumId(0), variant: 0 })
        );
    }
}
