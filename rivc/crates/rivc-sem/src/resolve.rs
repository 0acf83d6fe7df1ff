//! Name resolution.
//!
//! The pass walks the HIR with a scope stack, rewriting every
//! [`ExprKind::Unresolved`] / [`ExprKind::UnresolvedPath`] node into a
//! resolved cross-reference, materializing a [`Local`] for every binding
//! pattern, canonicalizing struct literals into declaration field order,
//! registering every impl block in the [`ImplTable`], and linking every
//! named type node to its definition.
//!
//! Top-level items (and block-level items, within their block) are declared
//! before any body is visited, so items may reference each other regardless
//! of source order.

use tracing::debug;

use rivc_util::{Span, Symbol};

use crate::builtins::{self, BuiltinIds};
use crate::error::{SemError, SemResult};
use crate::hir::*;
use crate::impl_table::ImplTable;
use crate::scope::{ScopeStack, TypeEntry, ValueDef};
use crate::ty::{FieldInfo, Ty, TyCtxt, TypeId};

/// Pass output: the populated impl table and the built-in ids.
#[derive(Debug)]
pub struct Resolution {
    pub impls: ImplTable,
    pub builtins: BuiltinIds,
}

/// Run name resolution over the whole program.
pub fn resolve(program: &mut Program, ctxt: &mut TyCtxt) -> SemResult<Resolution> {
    debug!(
        funcs = program.funcs.len(),
        consts = program.consts.len(),
        "name resolution"
    );

    let mut scopes = ScopeStack::new();
    let mut impls = ImplTable::new();
    let builtins = builtins::install(program, ctxt, &mut scopes, &mut impls)?;

    // The program's root scope sits above the predefined one, so user items
    // may shadow built-ins.
    scopes.push(false);

    let mut resolver = Resolver {
        ctxt,
        scopes,
        impls,
        current_fn: None,
        current_self: None,
        self_entry: None,
    };

    let items = program.items.clone();
    resolver.declare_items(program, &items)?;
    resolver.register_impls(program, &items)?;
    resolver.resolve_items(program, &items)?;

    Ok(Resolution {
        impls: resolver.impls,
        builtins,
    })
}

struct Resolver<'a> {
    ctxt: &'a mut TyCtxt,
    scopes: ScopeStack,
    impls: ImplTable,
    /// Function whose locals arena receives new bindings.
    current_fn: Option<FuncId>,
    /// The `self` local of the method being resolved.
    current_self: Option<LocalId>,
    /// Target of the enclosing impl block, for `Self`.
    self_entry: Option<TypeEntry>,
}

impl<'a> Resolver<'a> {
    /// Pre-declare a batch of items into the current scope: type names
    /// first, then value names, so a value item may already mention any
    /// sibling type.
    fn declare_items(&mut self, program: &mut Program, items: &[ItemRef]) -> SemResult<()> {
        for item in items {
            match *item {
                ItemRef::Struct(id) => {
                    let def = &program.struct_defs[id];
                    let fields = def
                        .fields
                        .iter()
                        .map(|f| FieldInfo {
                            name: f.name,
                            ty: TypeId::INVALID,
                        })
                        .collect();
                    let sid = self.ctxt.declare_struct(def.name, fields);
                    let (name, span, is_unit) = (def.name, def.span, def.fields.is_empty());
                    program.struct_defs[id].struct_id = Some(sid);
                    self.scopes.declare_type(name, TypeEntry::Struct(sid), span)?;
                    if is_unit {
                        self.scopes
                            .declare_value_item(name, ValueDef::StructCtor(sid), span)?;
                    }
                }
                ItemRef::Enum(id) => {
                    let def = &program.enum_defs[id];
                    let variants: Vec<Symbol> = def.variants.iter().map(|v| v.name).collect();
                    let eid = self.ctxt.declare_enum(def.name, variants.clone());
                    let (name, span) = (def.name, def.span);
                    program.enum_defs[id].enum_id = Some(eid);
                    self.scopes.declare_type(name, TypeEntry::Enum(eid), span)?;
                    for (idx, variant) in variants.into_iter().enumerate() {
                        self.scopes.declare_variant_ctor(variant, eid, idx);
                    }
                }
                ItemRef::Trait(id) => {
                    let def = &program.traits[id];
                    self.scopes
                        .declare_type(def.name, TypeEntry::Trait(id), def.span)?;
                }
                _ => {}
            }
        }
        for item in items {
            match *item {
                ItemRef::Func(id) => {
                    let func = &program.funcs[id];
                    self.scopes
                        .declare_value_item(func.name, ValueDef::Func(id), func.span)?;
                }
                ItemRef::Const(id) => {
                    let konst = &program.consts[id];
                    self.scopes
                        .declare_value_item(konst.name, ValueDef::Const(id), konst.span)?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Bind every impl block to its target type and register its associated
    /// items in the impl table.
    fn register_impls(&mut self, program: &mut Program, items: &[ItemRef]) -> SemResult<()> {
        for item in items {
            let ItemRef::Impl(impl_id) = *item else {
                continue;
            };

            // Resolve the target annotation in place first.
            let mut ann = std::mem::replace(
                &mut program.impls[impl_id].target_ann,
                TypeAnnotation::Resolved(TypeId::INVALID),
            );
            if let TypeAnnotation::Syntactic(node) = &mut ann {
                self.resolve_type_node(program, node)?;
            }

            let target_ty = {
                let TypeAnnotation::Syntactic(node) = &ann else {
                    return Err(SemError::invariant(
                        program.impls[impl_id].span,
                        "impl target already finalized",
                    ));
                };
                match &node.kind {
                    TypeNodeKind::Named {
                        target: Some(TypeDefRef::Struct(sid)),
                        ..
                    } => self.ctxt.intern(Ty::Struct(*sid)),
                    TypeNodeKind::Named {
                        target: Some(TypeDefRef::Enum(eid)),
                        ..
                    } => self.ctxt.intern(Ty::Enum(*eid)),
                    _ => {
                        return Err(SemError::name(
                            node.span,
                            "impl target must be a struct or enum defined in this program",
                        ))
                    }
                }
            };
            program.impls[impl_id].target_ann = ann;
            program.impls[impl_id].target = Some(target_ty);

            if let Some(trait_name) = program.impls[impl_id].trait_name {
                let trait_span = program.impls[impl_id].trait_span;
                match self.scopes.lookup_type(trait_name) {
                    Some(TypeEntry::Trait(tid)) => {
                        program.impls[impl_id].trait_ref = Some(tid);
                    }
                    Some(_) => {
                        return Err(SemError::name(
                            trait_span,
                            format!("`{trait_name}` is not a trait"),
                        ))
                    }
                    None => {
                        return Err(SemError::name(
                            trait_span,
                            format!("unresolved trait `{trait_name}`"),
                        ))
                    }
                }
            }

            let funcs = program.impls[impl_id].funcs.clone();
            for fid in funcs {
                let func = &program.funcs[fid];
                let (name, span) = (func.name, func.span);
                if func.is_method() {
                    self.impls.add_method(target_ty, name, fid, span)?;
                } else {
                    self.impls.add_assoc_fn(target_ty, name, fid, span)?;
                }
            }
            let consts = program.impls[impl_id].consts.clone();
            for cid in consts {
                let konst = &program.consts[cid];
                let (name, span) = (konst.name, konst.span);
                self.impls.add_assoc_const(target_ty, name, cid, span)?;
            }
        }
        Ok(())
    }

    fn resolve_items(&mut self, program: &mut Program, items: &[ItemRef]) -> SemResult<()> {
        for item in items {
            match *item {
                ItemRef::Struct(id) => {
                    for i in 0..program.struct_defs[id].fields.len() {
                        self.resolve_annotation_at(program, |p| {
                            &mut p.struct_defs[id].fields[i].ann
                        })?;
                    }
                }
                ItemRef::Enum(_) => {}
                ItemRef::Trait(id) => self.resolve_trait_sigs(program, id)?,
                ItemRef::Const(id) => self.resolve_const(program, id)?,
                ItemRef::Func(id) => {
                    if program.funcs[id].self_param.is_some() {
                        return Err(SemError::name(
                            program.funcs[id].span,
                            "`self` parameter outside an impl block",
                        ));
                    }
                    self.resolve_function(program, id)?;
                }
                ItemRef::Impl(id) => self.resolve_impl(program, id)?,
            }
        }
        Ok(())
    }

    fn resolve_impl(&mut self, program: &mut Program, impl_id: ImplId) -> SemResult<()> {
        let target = program.impls[impl_id].target.expect("impl registered");
        let entry = match self.ctxt.kind(target) {
            Ty::Struct(sid) => TypeEntry::Struct(*sid),
            Ty::Enum(eid) => TypeEntry::Enum(*eid),
            _ => {
                return Err(SemError::invariant(
                    program.impls[impl_id].span,
                    "impl target is not a nominal type",
                ))
            }
        };

        self.scopes.push(false);
        self.scopes.declare_self_type(entry);
        let saved_entry = self.self_entry.replace(entry);

        let consts = program.impls[impl_id].consts.clone();
        for cid in consts {
            self.resolve_const(program, cid)?;
        }
        let funcs = program.impls[impl_id].funcs.clone();
        for fid in funcs {
            self.resolve_function(program, fid)?;
        }

        self.self_entry = saved_entry;
        self.scopes.pop();
        Ok(())
    }

    fn resolve_trait_sigs(&mut self, program: &mut Program, id: TraitDefId) -> SemResult<()> {
        for m in 0..program.traits[id].methods.len() {
            for p in 0..program.traits[id].methods[m].param_anns.len() {
                self.resolve_annotation_at(program, |prog| {
                    &mut prog.traits[id].methods[m].param_anns[p]
                })?;
            }
            if program.traits[id].methods[m].ret_ann.is_some() {
                self.resolve_annotation_at(program, |prog| {
                    prog.traits[id].methods[m].ret_ann.as_mut().expect("checked")
                })?;
            }
        }
        for c in 0..program.traits[id].consts.len() {
            self.resolve_annotation_at(program, |prog| &mut prog.traits[id].consts[c].ann)?;
        }
        Ok(())
    }

    fn resolve_const(&mut self, program: &mut Program, id: ConstId) -> SemResult<()> {
        self.resolve_annotation_at(program, |p| &mut p.consts[id].ann)?;
        let mut init = std::mem::replace(
            &mut program.consts[id].init,
            Expr::new(ExprKind::Literal(Lit::Unit), Span::DUMMY),
        );
        self.resolve_expr(program, &mut init)?;
        program.consts[id].init = init;
        Ok(())
    }

    fn resolve_function(&mut self, program: &mut Program, fid: FuncId) -> SemResult<()> {
        // Signature annotations resolve in the enclosing scope.
        for i in 0..program.funcs[fid].param_anns.len() {
            self.resolve_annotation_at(program, |p| &mut p.funcs[fid].param_anns[i])?;
        }
        if program.funcs[fid].ret_ann.is_some() {
            self.resolve_annotation_at(program, |p| {
                p.funcs[fid].ret_ann.as_mut().expect("checked")
            })?;
        }

        let saved_fn = self.current_fn.replace(fid);
        let saved_self = self.current_self.take();

        self.scopes.push(true);

        if let Some(mut self_param) = program.funcs[fid].self_param {
            let lid = program.funcs[fid].locals.push(Local {
                name: Symbol::intern("self"),
                is_mut: false,
                is_ref: false,
                ty: TypeId::INVALID,
            });
            self_param.local = Some(lid);
            program.funcs[fid].self_param = Some(self_param);
            self.current_self = Some(lid);
        }

        let mut params = std::mem::take(&mut program.funcs[fid].params);
        for pat in &mut params {
            self.resolve_pattern(program, pat)?;
        }
        program.funcs[fid].params = params;

        if let Some(mut body) = program.funcs[fid].body.take() {
            self.resolve_expr(program, &mut body)?;
            program.funcs[fid].body = Some(body);
        }

        self.scopes.pop();
        self.current_fn = saved_fn;
        self.current_self = saved_self;
        Ok(())
    }

    /// Materialize locals for the binding occurrences of a pattern.
    fn resolve_pattern(&mut self, program: &mut Program, pat: &mut Pattern) -> SemResult<()> {
        match &mut pat.kind {
            PatternKind::Wildcard => Ok(()),
            PatternKind::Binding(binding) => {
                let BindingDef::Unresolved {
                    name,
                    is_mut,
                    is_ref,
                } = *binding
                else {
                    return Ok(());
                };
                // Outside any function this can only be a let inside a
                // constant initializer.
                let fid = self.current_fn.ok_or_else(|| {
                    SemError::konst(
                        pat.span,
                        "let bindings are not allowed in constant expressions",
                    )
                })?;
                let lid = program.funcs[fid].locals.push(Local {
                    name,
                    is_mut,
                    is_ref,
                    ty: TypeId::INVALID,
                });
                self.scopes.declare_local(name, lid);
                *binding = BindingDef::Resolved(lid);
                Ok(())
            }
            PatternKind::Ref { inner, .. } => self.resolve_pattern(program, inner),
        }
    }

    fn resolve_block(&mut self, program: &mut Program, block: &mut Block) -> SemResult<()> {
        self.scopes.push(false);
        self.declare_items(program, &block.items)?;
        let items = block.items.clone();
        self.resolve_items(program, &items)?;
        for stmt in &mut block.stmts {
            match stmt {
                Stmt::Let(l) => {
                    if let Some(TypeAnnotation::Syntactic(node)) = &mut l.ann {
                        self.resolve_type_node(program, node)?;
                    }
                    // The initializer sees the scope *before* the binding.
                    self.resolve_expr(program, &mut l.init)?;
                    self.resolve_pattern(program, &mut l.pat)?;
                }
                Stmt::Expr(e) => self.resolve_expr(program, e)?,
            }
        }
        if let Some(tail) = &mut block.tail {
            self.resolve_expr(program, tail)?;
        }
        self.scopes.pop();
        Ok(())
    }

    fn resolve_expr(&mut self, program: &mut Program, expr: &mut Expr) -> SemResult<()> {
        let span = expr.span;
        match &mut expr.kind {
            ExprKind::Literal(_) | ExprKind::Underscore => {}
            ExprKind::Variable(_)
            | ExprKind::ConstUse(_)
            | ExprKind::FuncUse(_)
            | ExprKind::AssocConst { .. }
            | ExprKind::EnumVariant { .. } => {}

            ExprKind::Unresolved(name) => {
                let name = *name;
                expr.kind = self.resolve_name(name, span)?;
            }
            ExprKind::UnresolvedPath {
                qualifier,
                qualifier_span,
                name,
            } => {
                let (qualifier, qualifier_span, name) = (*qualifier, *qualifier_span, *name);
                expr.kind = self.resolve_path(qualifier, qualifier_span, name, span)?;
            }
            ExprKind::SelfValue => {
                let lid = self.current_self.ok_or_else(|| {
                    SemError::name(span, "`self` is only allowed inside impl methods")
                })?;
                expr.kind = ExprKind::Variable(lid);
            }

            ExprKind::StructLiteral {
                name,
                name_span,
                struct_id,
                fields,
            } => {
                let sid = match self.scopes.lookup_type(*name) {
                    Some(TypeEntry::Struct(sid)) => sid,
                    Some(_) => {
                        return Err(SemError::name(
                            *name_span,
                            format!("`{name}` is not a struct"),
                        ))
                    }
                    None => {
                        return Err(SemError::name(
                            *name_span,
                            format!("unresolved struct `{name}`"),
                        ))
                    }
                };
                *struct_id = Some(sid);

                if let StructLitFields::Syntactic(inits) = fields {
                    let declared: Vec<Symbol> = self
                        .ctxt
                        .struct_info(sid)
                        .fields
                        .iter()
                        .map(|f| f.name)
                        .collect();
                    let mut slots: Vec<Option<Expr>> = Vec::new();
                    slots.resize_with(declared.len(), || None);

                    for init in std::mem::take(inits) {
                        let Some(idx) = declared.iter().position(|f| *f == init.name) else {
                            return Err(SemError::shape(
                                init.span,
                                format!("struct `{name}` has no field `{}`", init.name),
                            ));
                        };
                        if slots[idx].is_some() {
                            return Err(SemError::shape(
                                init.span,
                                format!("field `{}` specified more than once", init.name),
                            ));
                        }
                        let mut value = init.expr;
                        self.resolve_expr(program, &mut value)?;
                        slots[idx] = Some(value);
                    }

                    let mut canonical = Vec::with_capacity(slots.len());
                    for (idx, slot) in slots.into_iter().enumerate() {
                        match slot {
                            Some(e) => canonical.push(e),
                            None => {
                                return Err(SemError::shape(
                                    span,
                                    format!("missing field `{}` in struct `{name}`", declared[idx]),
                                ))
                            }
                        }
                    }
                    *fields = StructLitFields::Canonical(canonical);
                }
            }

            ExprKind::FieldAccess { base, .. } => self.resolve_expr(program, base)?,
            ExprKind::ArrayLiteral(elems) => {
                for e in elems {
                    self.resolve_expr(program, e)?;
                }
            }
            ExprKind::ArrayRepeat { elem, count } => {
                self.resolve_expr(program, elem)?;
                if let ArrayCount::Unevaluated(count) = count {
                    self.resolve_expr(program, count)?;
                }
            }
            ExprKind::Index { base, index } => {
                self.resolve_expr(program, base)?;
                self.resolve_expr(program, index)?;
            }
            ExprKind::Assign { place, value } => {
                self.resolve_expr(program, place)?;
                self.resolve_expr(program, value)?;
            }
            ExprKind::Unary { operand, .. } => self.resolve_expr(program, operand)?,
            ExprKind::Binary { lhs, rhs, .. } => {
                self.resolve_expr(program, lhs)?;
                self.resolve_expr(program, rhs)?;
            }
            ExprKind::Cast { operand, ann } => {
                self.resolve_expr(program, operand)?;
                if let TypeAnnotation::Syntactic(node) = ann {
                    self.resolve_type_node(program, node)?;
                }
            }
            ExprKind::Call { callee, args } => {
                self.resolve_expr(program, callee)?;
                for a in args {
                    self.resolve_expr(program, a)?;
                }
            }
            ExprKind::MethodCall { receiver, args, .. } => {
                // The method name itself resolves during checking, once the
                // receiver type is known.
                self.resolve_expr(program, receiver)?;
                for a in args {
                    self.resolve_expr(program, a)?;
                }
            }
            ExprKind::Block(block) => self.resolve_block(program, block)?,
            ExprKind::If {
                cond,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(program, cond)?;
                self.resolve_expr(program, then_branch)?;
                if let Some(e) = else_branch {
                    self.resolve_expr(program, e)?;
                }
            }
            ExprKind::Loop { body, .. } => self.resolve_expr(program, body)?,
            ExprKind::While { cond, body, .. } => {
                self.resolve_expr(program, cond)?;
                self.resolve_expr(program, body)?;
            }
            ExprKind::Break { value, .. } => {
                if let Some(v) = value {
                    self.resolve_expr(program, v)?;
                }
            }
            ExprKind::Continue { .. } => {}
            ExprKind::Return { value, .. } => {
                if let Some(v) = value {
                    self.resolve_expr(program, v)?;
                }
            }
        }
        Ok(())
    }

    fn resolve_name(&mut self, name: Symbol, span: Span) -> SemResult<ExprKind> {
        match self.scopes.lookup_value(name) {
            Some(ValueDef::Local(lid)) => Ok(ExprKind::Variable(lid)),
            Some(ValueDef::Func(fid)) => Ok(ExprKind::FuncUse(fid)),
            Some(ValueDef::Const(cid)) => Ok(ExprKind::ConstUse(cid)),
            Some(ValueDef::StructCtor(sid)) => Ok(ExprKind::StructLiteral {
                name,
                name_span: span,
                struct_id: Some(sid),
                fields: StructLitFields::Canonical(Vec::new()),
            }),
            Some(ValueDef::VariantCtor { enum_id, variant }) => {
                Ok(ExprKind::EnumVariant { enum_id, variant })
            }
            None => Err(SemError::name(
                span,
                format!("unresolved identifier `{name}`"),
            )),
        }
    }

    fn resolve_path(
        &mut self,
        qualifier: PathQual,
        qualifier_span: Span,
        name: Symbol,
        span: Span,
    ) -> SemResult<ExprKind> {
        let entry = match qualifier {
            PathQual::Named(q) => match self.scopes.lookup_type(q) {
                Some(entry) => entry,
                None => {
                    return Err(SemError::name(
                        qualifier_span,
                        format!("unresolved type `{q}`"),
                    ))
                }
            },
            PathQual::SelfType => self.self_entry.ok_or_else(|| {
                SemError::name(qualifier_span, "`Self` is only allowed inside impl blocks")
            })?,
        };

        let target_ty = match entry {
            TypeEntry::Struct(sid) => self.ctxt.intern(Ty::Struct(sid)),
            TypeEntry::Enum(eid) => {
                if let Some(variant) = self.ctxt.enum_info(eid).variant_index(name) {
                    return Ok(ExprKind::EnumVariant {
                        enum_id: eid,
                        variant,
                    });
                }
                self.ctxt.intern(Ty::Enum(eid))
            }
            TypeEntry::Trait(_) => {
                return Err(SemError::name(
                    qualifier_span,
                    "trait paths are not supported in expression position",
                ))
            }
        };

        if let Some(fid) = self.impls.lookup_assoc_fn(target_ty, name) {
            return Ok(ExprKind::FuncUse(fid));
        }
        if let Some(cid) = self.impls.lookup_assoc_const(target_ty, name) {
            return Ok(ExprKind::AssocConst {
                target: target_ty,
                konst: cid,
            });
        }
        Err(SemError::name(
            span,
            format!(
                "no associated item `{name}` on `{}`",
                self.ctxt.display(target_ty)
            ),
        ))
    }

    /// Link the named leaves of a syntactic type node to their definitions.
    fn resolve_type_node(&mut self, program: &mut Program, node: &mut TypeNode) -> SemResult<()> {
        match &mut node.kind {
            TypeNodeKind::Unit | TypeNodeKind::Prim(_) | TypeNodeKind::Infer => Ok(()),
            TypeNodeKind::Named { name, target } => match self.scopes.lookup_type(*name) {
                Some(TypeEntry::Struct(sid)) => {
                    *target = Some(TypeDefRef::Struct(sid));
                    Ok(())
                }
                Some(TypeEntry::Enum(eid)) => {
                    *target = Some(TypeDefRef::Enum(eid));
                    Ok(())
                }
                Some(TypeEntry::Trait(_)) => Err(SemError::name(
                    node.span,
                    format!("trait `{name}` cannot be used as a type"),
                )),
                None => Err(SemError::name(
                    node.span,
                    format!("unresolved type `{name}`"),
                )),
            },
            TypeNodeKind::SelfType { target } => match self.self_entry {
                Some(TypeEntry::Struct(sid)) => {
                    *target = Some(TypeDefRef::Struct(sid));
                    Ok(())
                }
                Some(TypeEntry::Enum(eid)) => {
                    *target = Some(TypeDefRef::Enum(eid));
                    Ok(())
                }
                _ => Err(SemError::name(
                    node.span,
                    "`Self` is only allowed inside impl blocks",
                )),
            },
            TypeNodeKind::Ref { pointee, .. } => self.resolve_type_node(program, pointee),
            TypeNodeKind::Array { elem, len } => {
                self.resolve_type_node(program, elem)?;
                self.resolve_expr(program, len)
            }
        }
    }

    /// Resolve an annotation that lives inside the program arenas: take it
    /// out, walk it, put it back. The accessor is re-run after the walk so
    /// the borrow never overlaps the recursion.
    fn resolve_annotation_at(
        &mut self,
        program: &mut Program,
        accessor: impl Fn(&mut Program) -> &mut TypeAnnotation,
    ) -> SemResult<()> {
        let mut ann = std::mem::replace(
            accessor(program),
            TypeAnnotation::Resolved(TypeId::INVALID),
        );
        let result = match &mut ann {
            TypeAnnotation::Syntactic(node) => self.resolve_type_node(program, node),
            TypeAnnotation::Resolved(_) => Ok(()),
        };
        *accessor(program) = ann;
        result
    }
}
