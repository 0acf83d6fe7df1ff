//! The High-level Intermediate Representation.
//!
//! The HIR is created once by the converter ([`crate::lower`]) as a
//! structural mirror of the AST, then refined in place by every later pass:
//! name resolution replaces [`ExprKind::Unresolved`] nodes with resolved
//! cross-references, the finalizer replaces every
//! [`TypeAnnotation::Syntactic`] with an interned [`TypeId`], and the
//! checker stamps an [`ExprInfo`] onto every expression.
//!
//! Ownership follows the arena-and-index idiom: the [`Program`] owns one
//! `IndexVec` per item category, each [`Function`] owns its [`Local`]s, and
//! cross-references (a variable to its local, a `break` to its loop, a call
//! to its callee) are typed indices rather than pointers. Indices stay valid
//! for the whole pipeline because arenas only grow.

use rivc_util::{define_idx, IndexVec, Span, Symbol};

use crate::consteval::ConstValue;
use crate::ty::{EnumId, PrimKind, StructId, TypeId};

define_idx!(
    /// A function or method in [`Program::funcs`].
    FuncId
);
define_idx!(
    /// A constant definition in [`Program::consts`].
    ConstId
);
define_idx!(
    /// A struct definition in [`Program::struct_defs`].
    StructDefId
);
define_idx!(
    /// An enum definition in [`Program::enum_defs`].
    EnumDefId
);
define_idx!(
    /// A trait definition in [`Program::traits`].
    TraitDefId
);
define_idx!(
    /// An impl block in [`Program::impls`].
    ImplId
);
define_idx!(
    /// A local (let-binding or parameter) in its function's local arena.
    LocalId
);
define_idx!(
    /// A `loop`/`while` expression; the target of `break`/`continue`.
    LoopId
);

/// The whole program, refined in place by each pass.
#[derive(Debug, Default)]
pub struct Program {
    /// Top-level items in source order.
    pub items: Vec<ItemRef>,
    pub funcs: IndexVec<FuncId, Function>,
    pub consts: IndexVec<ConstId, ConstDef>,
    pub struct_defs: IndexVec<StructDefId, StructDef>,
    pub enum_defs: IndexVec<EnumDefId, EnumDef>,
    pub traits: IndexVec<TraitDefId, TraitDef>,
    pub impls: IndexVec<ImplId, ImplBlock>,
    /// Number of `LoopId`s handed out by the converter.
    pub loop_count: u32,
}

impl Program {
    /// The top-level `main` function, if any.
    pub fn main_func(&self) -> Option<FuncId> {
        self.items.iter().find_map(|item| match item {
            ItemRef::Func(id) if self.funcs[*id].name.as_str() == "main" => Some(*id),
            _ => None,
        })
    }
}

/// Reference from an item list (program or block) into the arenas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ItemRef {
    Func(FuncId),
    Const(ConstId),
    Struct(StructDefId),
    Enum(EnumDefId),
    Trait(TraitDefId),
    Impl(ImplId),
}

/// A function or method. Methods carry a `self_param`; predefined built-ins
/// carry a `builtin` tag and no body.
#[derive(Debug)]
pub struct Function {
    pub name: Symbol,
    pub self_param: Option<SelfParam>,
    /// Parameter patterns; parallel to `param_anns` (same length).
    pub params: Vec<Pattern>,
    pub param_anns: Vec<TypeAnnotation>,
    /// Missing means the return type defaults to `()`.
    pub ret_ann: Option<TypeAnnotation>,
    /// Always a block expression; `None` only for built-ins.
    pub body: Option<Expr>,
    pub locals: IndexVec<LocalId, Local>,
    pub builtin: Option<Builtin>,
    pub span: Span,
}

impl Function {
    pub fn is_method(&self) -> bool {
        self.self_param.is_some()
    }
}

/// Shape of a `self` parameter, plus the local the resolver binds for it.
#[derive(Clone, Copy, Debug)]
pub struct SelfParam {
    pub is_ref: bool,
    pub is_mut: bool,
    pub local: Option<LocalId>,
    pub span: Span,
}

/// The canonical record for a let-binding or parameter.
#[derive(Clone, Copy, Debug)]
pub struct Local {
    pub name: Symbol,
    pub is_mut: bool,
    /// A `ref x` binding; the local's type gains one reference layer.
    pub is_ref: bool,
    /// `TypeId::INVALID` until stamped by the finalizer or the checker.
    pub ty: TypeId,
}

/// Predefined built-in functions and methods (spec'd initial environment).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    /// `print(&String) -> ()`
    Print,
    /// `println(&String) -> ()`
    Println,
    /// `printInt(i32) -> ()`
    PrintInt,
    /// `printlnInt(i32) -> ()`
    PrintlnInt,
    /// `getString() -> String`
    GetString,
    /// `getInt() -> i32`
    GetInt,
    /// `exit(i32) -> !`; placement enforced by the exit check.
    Exit,
    /// `String::append(&mut self, &String) -> ()`
    StrAppend,
    /// `String::len(&self) -> usize`
    StrLen,
    /// `{integer}::to_string(self) -> String`
    ToString(PrimKind),
    /// `[T; N]::len(&self) -> usize`, answered for every array type.
    ArrayLen,
}

#[derive(Debug)]
pub struct ConstDef {
    pub name: Symbol,
    pub ann: TypeAnnotation,
    pub init: Expr,
    /// Computed by the finalizer; memoized for the whole pipeline.
    pub value: Option<ConstValue>,
    pub span: Span,
}

#[derive(Debug)]
pub struct StructDef {
    pub name: Symbol,
    pub fields: Vec<FieldDef>,
    /// Table handle, stamped during name resolution.
    pub struct_id: Option<StructId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct FieldDef {
    pub name: Symbol,
    pub ann: TypeAnnotation,
    pub span: Span,
}

#[derive(Debug)]
pub struct EnumDef {
    pub name: Symbol,
    pub variants: Vec<VariantDef>,
    /// Table handle, stamped during name resolution.
    pub enum_id: Option<EnumId>,
    pub span: Span,
}

#[derive(Debug)]
pub struct VariantDef {
    pub name: Symbol,
    pub span: Span,
}

#[derive(Debug)]
pub struct TraitDef {
    pub name: Symbol,
    pub methods: Vec<TraitMethodSig>,
    pub consts: Vec<TraitConstSig>,
    pub span: Span,
}

/// A required method signature in a trait.
#[derive(Debug)]
pub struct TraitMethodSig {
    pub name: Symbol,
    pub self_param: Option<SelfParam>,
    pub param_anns: Vec<TypeAnnotation>,
    pub ret_ann: Option<TypeAnnotation>,
    pub span: Span,
}

/// A required associated constant in a trait.
#[derive(Debug)]
pub struct TraitConstSig {
    pub name: Symbol,
    pub ann: TypeAnnotation,
    pub span: Span,
}

#[derive(Debug)]
pub struct ImplBlock {
    pub trait_name: Option<Symbol>,
    pub trait_span: Span,
    /// Resolved trait, stamped during name resolution.
    pub trait_ref: Option<TraitDefId>,
    pub target_ann: TypeAnnotation,
    /// Interned target type, stamped during name resolution.
    pub target: Option<TypeId>,
    pub funcs: Vec<FuncId>,
    pub consts: Vec<ConstId>,
    pub span: Span,
}

/// A type annotation: syntactic until the finalizer, interned afterwards.
#[derive(Debug)]
pub enum TypeAnnotation {
    Syntactic(TypeNode),
    Resolved(TypeId),
}

impl TypeAnnotation {
    /// The interned type, if finalized.
    pub fn resolved(&self) -> Option<TypeId> {
        match self {
            TypeAnnotation::Resolved(id) => Some(*id),
            TypeAnnotation::Syntactic(_) => None,
        }
    }

    /// The interned type; panics on a still-syntactic annotation, which
    /// after the finalizer would be a pipeline bug.
    pub fn ty(&self) -> TypeId {
        self.resolved()
            .expect("annotation not finalized; finalizer must run first")
    }
}

/// Syntactic type held by an unfinalized annotation.
#[derive(Debug)]
pub struct TypeNode {
    pub kind: TypeNodeKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum TypeNodeKind {
    Unit,
    Prim(PrimKind),
    /// A user type name; `target` is linked by the resolver.
    Named {
        name: Symbol,
        target: Option<TypeDefRef>,
    },
    /// `Self` inside an impl; `target` is linked by the resolver.
    SelfType { target: Option<TypeDefRef> },
    Ref {
        pointee: Box<TypeNode>,
        mutable: bool,
    },
    /// `[elem; len]`; the length is const-evaluated by the finalizer.
    Array {
        elem: Box<TypeNode>,
        len: Box<Expr>,
    },
    /// `_`: only legal where an expectation supplies the type.
    Infer,
}

/// Resolved referent of a type name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TypeDefRef {
    Struct(StructId),
    Enum(EnumId),
}

#[derive(Debug)]
pub struct Block {
    /// Block-level items, hoisted into the program arenas.
    pub items: Vec<ItemRef>,
    pub stmts: Vec<Stmt>,
    pub tail: Option<Box<Expr>>,
    pub span: Span,
}

#[derive(Debug)]
pub enum Stmt {
    Let(LetStmt),
    Expr(Expr),
}

#[derive(Debug)]
pub struct LetStmt {
    pub pat: Pattern,
    pub ann: Option<TypeAnnotation>,
    pub init: Expr,
    pub span: Span,
}

#[derive(Debug)]
pub struct Pattern {
    pub kind: PatternKind,
    pub span: Span,
}

#[derive(Debug)]
pub enum PatternKind {
    Wildcard,
    Binding(BindingDef),
    /// Matches `&T` / `&mut T`, stripping one reference layer.
    Ref {
        inner: Box<Pattern>,
        mutable: bool,
    },
}

/// An identifier binding: unresolved until name resolution materializes the
/// local.
#[derive(Debug)]
pub enum BindingDef {
    Unresolved {
        name: Symbol,
        is_mut: bool,
        is_ref: bool,
    },
    Resolved(LocalId),
}

#[derive(Debug)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    /// Stamped by the semantic checker; `Some` on every node afterwards.
    pub info: Option<ExprInfo>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            span,
            info: None,
        }
    }

    /// The checked type of this expression. Panics before the checker ran.
    pub fn ty(&self) -> TypeId {
        self.info.as_ref().expect("expression not checked yet").ty
    }
}

#[derive(Debug)]
pub enum ExprKind {
    Literal(Lit),
    /// A bare identifier, eliminated by name resolution.
    Unresolved(Symbol),
    /// A `Qualifier::name` path, eliminated by name resolution.
    UnresolvedPath {
        qualifier: PathQual,
        qualifier_span: Span,
        name: Symbol,
    },
    /// `self`, eliminated by name resolution (becomes a `Variable`).
    SelfValue,
    /// Resolved reference to a local.
    Variable(LocalId),
    /// Resolved reference to a constant definition.
    ConstUse(ConstId),
    /// Resolved reference to a free or associated function.
    FuncUse(FuncId),
    /// Associated constant access on a type, e.g. `Point::ORIGIN`.
    AssocConst {
        target: TypeId,
        konst: ConstId,
    },
    /// Enum variant constructor, e.g. `Color::Red`.
    EnumVariant {
        enum_id: EnumId,
        variant: usize,
    },
    Underscore,
    FieldAccess {
        base: Box<Expr>,
        field: Symbol,
        field_span: Span,
        /// Field slot, stamped by the checker.
        index: Option<usize>,
    },
    StructLiteral {
        name: Symbol,
        name_span: Span,
        /// Table handle, stamped by name resolution.
        struct_id: Option<StructId>,
        fields: StructLitFields,
    },
    ArrayLiteral(Vec<Expr>),
    ArrayRepeat {
        elem: Box<Expr>,
        count: ArrayCount,
    },
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
    },
    Assign {
        place: Box<Expr>,
        value: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cast {
        operand: Box<Expr>,
        ann: TypeAnnotation,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: Symbol,
        method_span: Span,
        /// Resolved target, stamped by the checker via the impl table.
        resolved: Option<FuncId>,
        args: Vec<Expr>,
    },
    Block(Block),
    If {
        cond: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Option<Box<Expr>>,
    },
    Loop {
        id: LoopId,
        body: Box<Expr>,
    },
    While {
        id: LoopId,
        cond: Box<Expr>,
        body: Box<Expr>,
    },
    Break {
        value: Option<Box<Expr>>,
        /// Enclosing loop, stamped by the control-flow linker.
        target: Option<LoopId>,
    },
    Continue {
        target: Option<LoopId>,
    },
    Return {
        value: Option<Box<Expr>>,
        /// Enclosing function, stamped by the control-flow linker.
        target: Option<FuncId>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PathQual {
    Named(Symbol),
    SelfType,
}

/// Struct literal fields: source order until name resolution canonicalizes
/// them into declaration order, one initializer per field slot.
#[derive(Debug)]
pub enum StructLitFields {
    Syntactic(Vec<FieldInit>),
    Canonical(Vec<Expr>),
}

#[derive(Debug)]
pub struct FieldInit {
    pub name: Symbol,
    pub span: Span,
    pub expr: Expr,
}

/// Array-repeat count: an expression until the finalizer materializes it.
#[derive(Debug)]
pub enum ArrayCount {
    Unevaluated(Box<Expr>),
    Resolved(usize),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Lit {
    Int {
        value: u128,
        suffix: Option<PrimKind>,
        /// Set during const folding of literal negation.
        negative: bool,
    },
    Bool(bool),
    Char(char),
    Str(Symbol),
    Unit,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnOp {
    /// `-`
    Neg,
    /// `!`
    Not,
    /// `*`
    Deref,
    /// `&` / `&mut`; also inserted by auto-ref during method lookup.
    Ref { mutable: bool },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    And,
    Or,
}

impl BinOp {
    pub fn is_arithmetic(self) -> bool {
        matches!(
            self,
            BinOp::Add
                | BinOp::Sub
                | BinOp::Mul
                | BinOp::Div
                | BinOp::Rem
                | BinOp::BitAnd
                | BinOp::BitOr
                | BinOp::BitXor
                | BinOp::Shl
                | BinOp::Shr
        )
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Gt | BinOp::Le | BinOp::Ge
        )
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, BinOp::And | BinOp::Or)
    }

    pub fn describe(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::BitAnd => "&",
            BinOp::BitOr => "|",
            BinOp::BitXor => "^",
            BinOp::Shl => "<<",
            BinOp::Shr => ">>",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Gt => ">",
            BinOp::Le => "<=",
            BinOp::Ge => ">=",
            BinOp::And => "&&",
            BinOp::Or => "||",
        }
    }
}

/// Semantic facts about one expression, stamped by the checker.
#[derive(Clone, Debug)]
pub struct ExprInfo {
    pub ty: TypeId,
    /// Does the expression denote a memory location?
    pub is_place: bool,
    /// If a place, may it be assigned through?
    pub is_mut: bool,
    pub endpoints: EndpointSet,
}

/// How control can leave an expression: falling through normally, or
/// jumping to an enclosing loop or function.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndpointSet {
    pub normal: bool,
    pub returns: bool,
    pub breaks: Vec<LoopId>,
    pub continues: Vec<LoopId>,
}

impl EndpointSet {
    /// Plain fall-through.
    pub fn normal() -> Self {
        Self {
            normal: true,
            ..Self::default()
        }
    }

    pub fn returning() -> Self {
        Self {
            returns: true,
            ..Self::default()
        }
    }

    pub fn breaking(target: LoopId) -> Self {
        Self {
            breaks: vec![target],
            ..Self::default()
        }
    }

    pub fn continuing(target: LoopId) -> Self {
        Self {
            continues: vec![target],
            ..Self::default()
        }
    }

    /// The expression never yields a value normally.
    pub fn diverges(&self) -> bool {
        !self.normal
    }

    pub fn has_break(&self, id: LoopId) -> bool {
        self.breaks.contains(&id)
    }

    /// Set union of both endpoint sets (branching control flow).
    pub fn union(&mut self, other: &EndpointSet) {
        self.normal |= other.normal;
        self.returns |= other.returns;
        for b in &other.breaks {
            if !self.breaks.contains(b) {
                self.breaks.push(*b);
            }
        }
        for c in &other.continues {
            if !self.continues.contains(c) {
                self.continues.push(*c);
            }
        }
    }

    /// Sequential composition: `next` only runs if `self` falls through.
    pub fn then(&self, next: &EndpointSet) -> EndpointSet {
        let mut out = self.clone();
        out.normal = false;
        if self.normal {
            out.union(next);
            out.normal = next.normal;
        }
        out
    }

    /// Drop breaks/continues targeting `id` (used when leaving the loop);
    /// returns whether any break targeted it.
    pub fn remove_loop(&mut self, id: LoopId) -> bool {
        let had_break = self.breaks.contains(&id);
        self.breaks.retain(|b| *b != id);
        self.continues.retain(|c| *c != id);
        had_break
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_union_merges_jumps() {
        let mut a = EndpointSet::breaking(LoopId(0));
        a.union(&EndpointSet::normal());
        a.union(&EndpointSet::returning());
        a.union(&EndpointSet::breaking(LoopId(0)));
        assert!(a.normal);
        assert!(a.returns);
        assert_eq!(a.breaks, vec![LoopId(0)]);
    }

    #[test]
    fn test_then_short_circuits_on_divergence() {
        let diverging = EndpointSet::returning();
        let after = diverging.then(&EndpointSet::normal());
        assert!(!after.normal);
        assert!(after.returns);
    }

    #[test]
    fn test_then_threads_normal() {
        let first = EndpointSet::normal();
        let mut second = EndpointSet::breaking(LoopId(1));
        second.normal = true;
        let out = first.then(&second);
        assert!(out.normal);
        assert_eq!(out.breaks, vec![LoopId(1)]);
    }

    #[test]
    fn test_remove_loop() {
        let mut set = EndpointSet::breaking(LoopId(2));
        set.continues.push(LoopId(2));
        set.breaks.push(LoopId(3));
        assert!(set.remove_loop(LoopId(2)));
        assert_eq!(set.breaks, vec![LoopId(3)]);
        assert!(set.continues.is_empty());
        assert!(!set.remove_loop(LoopId(2)));
    }

    #[test]
    fn test_main_lookup() {
        let mut program = Program::default();
        let id = program.funcs.push(Function {
            name: Symbol::intern("main"),
            self_param: None,
            params: Vec::new(),
            param_anns: Vec::new(),
            ret_ann: None,
            body: None,
            locals: IndexVec::new(),
            builtin: None,
            span: Span::DUMMY,
        });
        program.items.push(ItemRef::Func(id));
        assert_eq!(program.main_func(), Some(id));
    }
}
