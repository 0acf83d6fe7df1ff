//! The interned type universe.
//!
//! Every type the pipeline ever mentions is interned into the [`TyCtxt`]
//! arena and handled as a [`TypeId`]. Interning gives the core its central
//! guarantee: structural equality of types is identity of ids, so every type
//! comparison downstream is one integer compare.
//!
//! The context also owns the nominal-type tables: [`StructInfo`] keyed by
//! [`StructId`] and [`EnumInfo`] keyed by [`EnumId`]. Name resolution
//! declares entries (names only); the finalizer fills in field types once
//! annotations are resolved.
//!
//! The context is created per compilation and threaded explicitly through
//! the passes; nothing here is process-global.

use rivc_util::{define_idx, FxHashMap, IndexVec, Symbol};

define_idx!(
    /// Handle of an interned [`Ty`] in a [`TyCtxt`].
    TypeId
);
define_idx!(
    /// Handle of a struct definition in the context's struct table.
    StructId
);
define_idx!(
    /// Handle of an enum definition in the context's enum table.
    EnumId
);

impl TypeId {
    /// Sentinel for "no type computed (yet)". Interned first, so it is
    /// always id 0.
    pub const INVALID: TypeId = TypeId(0);

    pub fn is_invalid(self) -> bool {
        self == Self::INVALID
    }
}

/// Primitive type kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PrimKind {
    I32,
    U32,
    Isize,
    Usize,
    Bool,
    Char,
    /// The built-in `String` type.
    Str,
}

impl PrimKind {
    pub fn name(self) -> &'static str {
        match self {
            PrimKind::I32 => "i32",
            PrimKind::U32 => "u32",
            PrimKind::Isize => "isize",
            PrimKind::Usize => "usize",
            PrimKind::Bool => "bool",
            PrimKind::Char => "char",
            PrimKind::Str => "String",
        }
    }

    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimKind::I32 | PrimKind::U32 | PrimKind::Isize | PrimKind::Usize
        )
    }

    pub fn is_signed_integer(self) -> bool {
        matches!(self, PrimKind::I32 | PrimKind::Isize)
    }

    /// Map a literal suffix (`i32`, `u32`, `isize`, `usize`) to its kind.
    pub fn from_suffix(suffix: &str) -> Option<PrimKind> {
        match suffix {
            "i32" => Some(PrimKind::I32),
            "u32" => Some(PrimKind::U32),
            "isize" => Some(PrimKind::Isize),
            "usize" => Some(PrimKind::Usize),
            _ => None,
        }
    }

    /// Map a source-level type name to its primitive, if it is one.
    pub fn from_name(name: &str) -> Option<PrimKind> {
        match name {
            "i32" => Some(PrimKind::I32),
            "u32" => Some(PrimKind::U32),
            "isize" => Some(PrimKind::Isize),
            "usize" => Some(PrimKind::Usize),
            "bool" => Some(PrimKind::Bool),
            "char" => Some(PrimKind::Char),
            "String" => Some(PrimKind::Str),
            _ => None,
        }
    }
}

/// A type, in structural form. Interned; compare [`TypeId`]s instead.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Ty {
    /// The "no type" sentinel.
    Invalid,
    /// `()`
    Unit,
    /// `!`, the type of diverging expressions.
    Never,
    /// Placeholder for a not-yet-inferred integer literal (and `_`).
    Hole,
    Prim(PrimKind),
    Struct(StructId),
    Enum(EnumId),
    Ref {
        pointee: TypeId,
        mutable: bool,
    },
    Array {
        elem: TypeId,
        len: usize,
    },
}

#[derive(Clone, Debug)]
pub struct FieldInfo {
    pub name: Symbol,
    /// `TypeId::INVALID` until the finalizer resolves the field annotation.
    pub ty: TypeId,
}

#[derive(Clone, Debug)]
pub struct StructInfo {
    pub name: Symbol,
    pub fields: Vec<FieldInfo>,
}

impl StructInfo {
    pub fn field_index(&self, name: Symbol) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

#[derive(Clone, Debug)]
pub struct EnumInfo {
    pub name: Symbol,
    pub variants: Vec<Symbol>,
}

impl EnumInfo {
    pub fn variant_index(&self, name: Symbol) -> Option<usize> {
        self.variants.iter().position(|v| *v == name)
    }
}

/// The type context: interning arena plus nominal-type tables.
///
/// # Examples
///
/// ```
/// use rivc_sem::ty::{PrimKind, Ty, TyCtxt};
///
/// let mut ctxt = TyCtxt::new();
/// let i32_ty = ctxt.prim(PrimKind::I32);
/// let a = ctxt.intern(Ty::Ref { pointee: i32_ty, mutable: false });
/// let b = ctxt.intern(Ty::Ref { pointee: i32_ty, mutable: false });
/// assert_eq!(a, b); // structural equality <=> id equality
/// ```
#[derive(Debug)]
pub struct TyCtxt {
    types: IndexVec<TypeId, Ty>,
    lookup: FxHashMap<Ty, TypeId>,
    structs: IndexVec<StructId, StructInfo>,
    enums: IndexVec<EnumId, EnumInfo>,
}

impl TyCtxt {
    pub fn new() -> Self {
        let mut ctxt = Self {
            types: IndexVec::new(),
            lookup: FxHashMap::default(),
            structs: IndexVec::new(),
            enums: IndexVec::new(),
        };
        // The sentinel must take slot 0.
        let invalid = ctxt.intern(Ty::Invalid);
        debug_assert_eq!(invalid, TypeId::INVALID);
        ctxt.intern(Ty::Unit);
        ctxt.intern(Ty::Never);
        ctxt.intern(Ty::Hole);
        ctxt
    }

    /// Intern a type, returning its canonical id.
    pub fn intern(&mut self, ty: Ty) -> TypeId {
        if let Some(&id) = self.lookup.get(&ty) {
            return id;
        }
        let id = self.types.push(ty.clone());
        self.lookup.insert(ty, id);
        id
    }

    /// Structural form of an interned id.
    pub fn kind(&self, id: TypeId) -> &Ty {
        &self.types[id]
    }

    pub fn invalid(&self) -> TypeId {
        TypeId::INVALID
    }

    pub fn unit(&mut self) -> TypeId {
        self.intern(Ty::Unit)
    }

    pub fn never(&mut self) -> TypeId {
        self.intern(Ty::Never)
    }

    pub fn hole(&mut self) -> TypeId {
        self.intern(Ty::Hole)
    }

    pub fn prim(&mut self, kind: PrimKind) -> TypeId {
        self.intern(Ty::Prim(kind))
    }

    pub fn mk_ref(&mut self, pointee: TypeId, mutable: bool) -> TypeId {
        self.intern(Ty::Ref { pointee, mutable })
    }

    pub fn mk_array(&mut self, elem: TypeId, len: usize) -> TypeId {
        self.intern(Ty::Array { elem, len })
    }

    /// Register a struct by name; fields are filled by the finalizer.
    pub fn declare_struct(&mut self, name: Symbol, fields: Vec<FieldInfo>) -> StructId {
        self.structs.push(StructInfo { name, fields })
    }

    pub fn struct_info(&self, id: StructId) -> &StructInfo {
        &self.structs[id]
    }

    pub fn struct_info_mut(&mut self, id: StructId) -> &mut StructInfo {
        &mut self.structs[id]
    }

    pub fn declare_enum(&mut self, name: Symbol, variants: Vec<Symbol>) -> EnumId {
        self.enums.push(EnumInfo { name, variants })
    }

    pub fn enum_info(&self, id: EnumId) -> &EnumInfo {
        &self.enums[id]
    }

    pub fn prim_kind(&self, id: TypeId) -> Option<PrimKind> {
        match self.kind(id) {
            Ty::Prim(kind) => Some(*kind),
            _ => None,
        }
    }

    pub fn is_integer(&self, id: TypeId) -> bool {
        self.prim_kind(id).is_some_and(PrimKind::is_integer)
    }

    pub fn is_signed_integer(&self, id: TypeId) -> bool {
        self.prim_kind(id).is_some_and(PrimKind::is_signed_integer)
    }

    pub fn is_never(&self, id: TypeId) -> bool {
        matches!(self.kind(id), Ty::Never)
    }

    pub fn is_hole(&self, id: TypeId) -> bool {
        matches!(self.kind(id), Ty::Hole)
    }

    /// Human-readable rendering for diagnostics.
    pub fn display(&self, id: TypeId) -> String {
        match self.kind(id) {
            Ty::Invalid => "{invalid}".to_string(),
            Ty::Unit => "()".to_string(),
            Ty::Never => "!".to_string(),
            Ty::Hole => "_".to_string(),
            Ty::Prim(kind) => kind.name().to_string(),
            Ty::Struct(sid) => self.struct_info(*sid).name.as_str().to_string(),
            Ty::Enum(eid) => self.enum_info(*eid).name.as_str().to_string(),
            Ty::Ref { pointee, mutable } => {
                if *mutable {
                    format!("&mut {}", self.display(*pointee))
                } else {
                    format!("&{}", self.display(*pointee))
                }
            }
            Ty::Array { elem, len } => format!("[{}; {}]", self.display(*elem), len),
        }
    }
}

impl Default for TyCtxt {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_is_slot_zero() {
        let ctxt = TyCtxt::new();
        assert!(matches!(ctxt.kind(TypeId::INVALID), Ty::Invalid));
        assert!(TypeId::INVALID.is_invalid());
    }

    #[test]
    fn test_interning_canonicity() {
        let mut ctxt = TyCtxt::new();
        let i32_ty = ctxt.prim(PrimKind::I32);
        let u32_ty = ctxt.prim(PrimKind::U32);
        assert_ne!(i32_ty, u32_ty);
        assert_eq!(i32_ty, ctxt.prim(PrimKind::I32));

        let r1 = ctxt.mk_ref(i32_ty, true);
        let r2 = ctxt.mk_ref(i32_ty, true);
        let r3 = ctxt.mk_ref(i32_ty, false);
        assert_eq!(r1, r2);
        assert_ne!(r1, r3);

        let a1 = ctxt.mk_array(i32_ty, 3);
        let a2 = ctxt.mk_array(i32_ty, 3);
        let a3 = ctxt.mk_array(i32_ty, 4);
        assert_eq!(a1, a2);
        assert_ne!(a1, a3);
    }

    #[test]
    fn test_nested_interning() {
        let mut ctxt = TyCtxt::new();
        let i32_ty = ctxt.prim(PrimKind::I32);
        let inner = ctxt.mk_array(i32_ty, 2);
        let a = ctxt.mk_ref(inner, false);
        let inner_again = ctxt.mk_array(i32_ty, 2);
        let b = ctxt.mk_ref(inner_again, false);
        assert_eq!(a, b);
    }

    #[test]
    fn test_struct_tables() {
        let mut ctxt = TyCtxt::new();
        let name = Symbol::intern("Point");
        let sid = ctxt.declare_struct(
            name,
            vec![
                FieldInfo { name: Symbol::intern("x"), ty: TypeId::INVALID },
                FieldInfo { name: Symbol::intern("y"), ty: TypeId::INVALID },
            ],
        );
        assert_eq!(ctxt.struct_info(sid).field_index(Symbol::intern("y")), Some(1));
        assert_eq!(ctxt.struct_info(sid).field_index(Symbol::intern("z")), None);

        // Distinct structs with the same shape stay distinct (nominal).
        let sid2 = ctxt.declare_struct(name, Vec::new());
        let t1 = ctxt.intern(Ty::Struct(sid));
        let t2 = ctxt.intern(Ty::Struct(sid2));
        assert_ne!(t1, t2);
    }

    #[test]
    fn test_display() {
        let mut ctxt = TyCtxt::new();
        let i32_ty = ctxt.prim(PrimKind::I32);
        let arr = ctxt.mk_array(i32_ty, 3);
        let r = ctxt.mk_ref(arr, true);
        assert_eq!(ctxt.display(r), "&mut [i32; 3]");
        let unit = ctxt.unit();
        assert_eq!(ctxt.display(unit), "()");
        let never = ctxt.never();
        assert_eq!(ctxt.display(never), "!");
    }

    #[test]
    fn test_prim_from_suffix_and_name() {
        assert_eq!(PrimKind::from_suffix("usize"), Some(PrimKind::Usize));
        assert_eq!(PrimKind::from_suffix("i64"), None);
        assert_eq!(PrimKind::from_name("String"), Some(PrimKind::Str));
        assert_eq!(PrimKind::from_name("bool"), Some(PrimKind::Bool));
        assert_eq!(PrimKind::from_name("Point"), None);
    }
}
