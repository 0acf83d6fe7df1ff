//! End-to-end semantic pipeline tests: source text in, validated HIR (or a
//! specific error kind) out.

use rivc_sem::error::ErrorKind;
use rivc_sem::hir::*;
use rivc_sem::ty::{PrimKind, Ty, TyCtxt};
use rivc_sem::{analyze, Analysis, SemError};
use rivc_util::FileId;

fn run(src: &str) -> Result<(Analysis, TyCtxt), SemError> {
    let tokens = rivc_lex::lex(src, FileId::DUMMY).expect("lexing failed");
    let ast = rivc_par::parse(tokens).expect("parsing failed");
    let mut ctxt = TyCtxt::new();
    analyze(ast, &mut ctxt).map(|a| (a, ctxt))
}

fn run_err(src: &str) -> SemError {
    run(src).err().expect("expected a semantic error")
}

fn main_block(analysis: &Analysis) -> &Block {
    let fid = analysis.program.main_func().expect("main");
    let body = analysis.program.funcs[fid].body.as_ref().expect("body");
    match &body.kind {
        ExprKind::Block(block) => block,
        _ => panic!("function body is not a block"),
    }
}

// ---------------------------------------------------------------------------
// The nine specified end-to-end scenarios.
// ---------------------------------------------------------------------------

#[test]
fn scenario_1_annotated_literal_arithmetic() {
    let (analysis, ctxt) = run("fn main() { let x: i32 = 1 + 2; }").unwrap();
    let fid = analysis.program.main_func().unwrap();
    let local = analysis.program.funcs[fid].locals[LocalId(0)];
    assert_eq!(ctxt.prim_kind(local.ty), Some(PrimKind::I32));

    let block = main_block(&analysis);
    let Stmt::Let(l) = &block.stmts[0] else { panic!() };
    assert_eq!(ctxt.prim_kind(l.init.ty()), Some(PrimKind::I32));
}

#[test]
fn scenario_2_unannotated_literal_fails_inference() {
    let err = run_err("fn main() { let x = 1 + 2; }");
    assert_eq!(err.kind, ErrorKind::Type);
    assert!(err.message.contains("cannot infer integer type"), "{}", err.message);
}

#[test]
fn scenario_3_const_array_length() {
    let (analysis, ctxt) =
        run("const N: usize = 3; fn main() { let a: [i32; N] = [0, 0, 0]; }").unwrap();
    let konst = &analysis.program.consts[ConstId(0)];
    assert_eq!(konst.value.as_ref().and_then(|v| v.as_int()), Some(3));

    let fid = analysis.program.main_func().unwrap();
    let local_ty = analysis.program.funcs[fid].locals[LocalId(0)].ty;
    let Ty::Array { elem, len } = *ctxt.kind(local_ty) else {
        panic!("expected array type")
    };
    assert_eq!(len, 3);
    assert_eq!(ctxt.prim_kind(elem), Some(PrimKind::I32));
}

#[test]
fn scenario_4_const_cycle() {
    let err = run_err("const N: usize = N; fn main() { }");
    assert_eq!(err.kind, ErrorKind::Const);
    assert!(err.message.contains("cycle"), "{}", err.message);
}

#[test]
fn scenario_5_assignment_to_immutable() {
    let err = run_err("fn main() { let x = 1i32; x = 2; }");
    assert_eq!(err.kind, ErrorKind::Mutability);
    assert!(err.message.contains("immutable"), "{}", err.message);

    // With `mut` the same program passes.
    run("fn main() { let mut x = 1i32; x = 2; }").unwrap();
}

#[test]
fn scenario_6_struct_literal_canonicalization_and_field_access() {
    let (analysis, _) = run(
        "struct P { x: i32, y: i32 } fn main() { let p = P { y: 2, x: 1 }; let _ = p.x; }",
    )
    .unwrap();
    let block = main_block(&analysis);

    let Stmt::Let(l) = &block.stmts[0] else { panic!() };
    let ExprKind::StructLiteral {
        fields: StructLitFields::Canonical(fields),
        ..
    } = &l.init.kind
    else {
        panic!("expected canonical struct literal")
    };
    // Declaration order: x first, despite source order.
    assert!(matches!(
        fields[0].kind,
        ExprKind::Literal(Lit::Int { value: 1, .. })
    ));
    assert!(matches!(
        fields[1].kind,
        ExprKind::Literal(Lit::Int { value: 2, .. })
    ));

    let Stmt::Let(l) = &block.stmts[1] else { panic!() };
    let ExprKind::FieldAccess { index, .. } = &l.init.kind else {
        panic!("expected field access")
    };
    assert_eq!(*index, Some(0));
}

#[test]
fn scenario_7_missing_trait_item() {
    let err = run_err(
        "trait T { fn f(&self) -> i32; } struct S; impl T for S { fn g(&self) -> i32 { 0 } }",
    );
    assert_eq!(err.kind, ErrorKind::Trait);
    assert!(err.message.contains("`f`"), "{}", err.message);
}

#[test]
fn scenario_8_loop_break_type_and_final_exit() {
    let (analysis, ctxt) =
        run("fn main() { loop { break 1; break 2; } exit(0); }").unwrap();
    let block = main_block(&analysis);
    let Stmt::Expr(loop_expr) = &block.stmts[0] else { panic!() };
    assert!(matches!(loop_expr.kind, ExprKind::Loop { .. }));
    assert_eq!(ctxt.prim_kind(loop_expr.ty()), Some(PrimKind::I32));
}

#[test]
fn scenario_9_exit_outside_main() {
    let err = run_err("fn f() { exit(0); } fn main() { f(); }");
    assert_eq!(err.kind, ErrorKind::ControlFlow);
    assert!(err.message.contains("exit"), "{}", err.message);
}

// ---------------------------------------------------------------------------
// Boundary behaviors.
// ---------------------------------------------------------------------------

#[test]
fn empty_program_succeeds() {
    let (analysis, _) = run("").unwrap();
    assert!(analysis.program.items.is_empty());
}

#[test]
fn type_definitions_only() {
    run("struct P { x: i32 } enum E { A, B } trait T { fn f(&self); }").unwrap();
}

#[test]
fn exit_as_whole_main_body() {
    run("fn main() { exit(0); }").unwrap();
}

#[test]
fn exit_in_non_final_position_fails() {
    let err = run_err("fn main() { exit(0); let x = 1i32; }");
    assert_eq!(err.kind, ErrorKind::ControlFlow);
}

#[test]
fn exit_in_method_fails() {
    let err = run_err(
        "struct S; impl S { fn go(&self) { exit(0); } } fn main() { }",
    );
    assert_eq!(err.kind, ErrorKind::ControlFlow);
}

#[test]
fn exit_in_nested_function_fails() {
    let err = run_err("fn main() { fn inner() { exit(0); } inner(); }");
    assert_eq!(err.kind, ErrorKind::ControlFlow);
}

// ---------------------------------------------------------------------------
// Structural invariants over the validated output.
// ---------------------------------------------------------------------------

const EXERCISER: &str = "
    struct Point { x: i32, y: i32 }
    enum Color { Red, Green }
    trait Summed { fn total(&self) -> i32; }
    const SIZE: usize = 2;
    const BASE: i32 = 10;

    impl Summed for Point {
        fn total(&self) -> i32 { self.x + self.y }
    }
    impl Point {
        const ORIGIN_X: i32 = 0;
        fn origin() -> Point { Point { x: Point::ORIGIN_X, y: 0 } }
        fn shift(&mut self, dx: i32) { self.x = self.x + dx; }
    }

    fn pick(c: Color) -> i32 {
        if c == Color::Red { BASE } else { 0 }
    }

    fn main() {
        let mut p = Point::origin();
        p.shift(3);
        let t = p.total();
        let arr: [i32; SIZE] = [t, pick(Color::Green)];
        let mut i = 0usize;
        let mut sum = 0i32;
        while i < arr.len() {
            sum = sum + arr[i];
            i = i + 1;
        }
        let msg = sum.to_string();
        println(&msg);
        let flag = loop {
            if sum > 0 { break true; }
            break false;
        };
        if flag { printInt(sum); }
    }
";

#[test]
fn invariant_every_expression_has_info() {
    let (analysis, ctxt) = run(EXERCISER).unwrap();
    for func in analysis.program.funcs.iter() {
        if let Some(body) = &func.body {
            walk_exprs(body, &mut |e| {
                let info = e
                    .info
                    .as_ref()
                    .unwrap_or_else(|| panic!("missing info on {:?}", e.kind));
                assert!(!info.ty.is_invalid(), "invalid type on {:?}", e.kind);
                // Divergence implies never.
                if !info.endpoints.normal {
                    assert!(ctxt.is_never(info.ty), "divergent non-never {:?}", e.kind);
                }
            });
        }
    }
    for konst in analysis.program.consts.iter() {
        walk_exprs(&konst.init, &mut |e| {
            assert!(e.info.is_some());
        });
        assert!(konst.value.is_some());
    }
}

#[test]
fn invariant_no_unresolved_and_all_targets_linked() {
    let (analysis, _) = run(EXERCISER).unwrap();
    for func in analysis.program.funcs.iter() {
        if let Some(body) = &func.body {
            walk_exprs(body, &mut |e| match &e.kind {
                ExprKind::Unresolved(_)
                | ExprKind::UnresolvedPath { .. }
                | ExprKind::SelfValue => panic!("unresolved node in output"),
                ExprKind::Break { target, .. } | ExprKind::Continue { target } => {
                    assert!(target.is_some())
                }
                ExprKind::Return { target, .. } => assert!(target.is_some()),
                ExprKind::MethodCall { resolved, .. } => assert!(resolved.is_some()),
                ExprKind::FieldAccess { index, .. } => assert!(index.is_some()),
                ExprKind::StructLiteral { fields, .. } => {
                    assert!(matches!(fields, StructLitFields::Canonical(_)))
                }
                ExprKind::ArrayRepeat { count, .. } => {
                    assert!(matches!(count, ArrayCount::Resolved(_)))
                }
                _ => {}
            });
        }
    }
}

#[test]
fn invariant_impl_table_closure() {
    let (analysis, ctxt) = run(EXERCISER).unwrap();
    for impl_block in analysis.program.impls.iter() {
        let target = impl_block.target.expect("impl target");
        for &fid in &impl_block.funcs {
            let func = &analysis.program.funcs[fid];
            let found = if func.is_method() {
                analysis.impls.lookup_method(&ctxt, target, func.name)
            } else {
                analysis.impls.lookup_assoc_fn(target, func.name)
            };
            assert_eq!(found, Some(fid), "impl item `{}` not reachable", func.name);
        }
        for &cid in &impl_block.consts {
            let name = analysis.program.consts[cid].name;
            assert_eq!(analysis.impls.lookup_assoc_const(target, name), Some(cid));
        }
    }
}

#[test]
fn invariant_auto_ref_is_recorded() {
    // `p.shift(3)` on a by-value receiver of an `&mut self` method must
    // leave an explicit `&mut` node in the tree.
    let (analysis, _) = run(EXERCISER).unwrap();
    let block = main_block(&analysis);
    let Stmt::Expr(call) = &block.stmts[1] else { panic!() };
    let ExprKind::MethodCall { receiver, .. } = &call.kind else {
        panic!("expected method call")
    };
    assert!(matches!(
        receiver.kind,
        ExprKind::Unary { op: UnOp::Ref { mutable: true }, .. }
    ));
}

// ---------------------------------------------------------------------------
// Additional rule coverage.
// ---------------------------------------------------------------------------

#[test]
fn return_coverage_is_enforced() {
    let err = run_err("fn f() -> i32 { } fn main() { }");
    assert_eq!(err.kind, ErrorKind::Type);

    run("fn f() -> i32 { 5 } fn main() { }").unwrap();
    run("fn f() -> i32 { return 5; } fn main() { }").unwrap();
    run("fn f() -> i32 { loop { } } fn main() { }").unwrap();
}

#[test]
fn condition_must_be_bool() {
    let err = run_err("fn main() { if 1i32 { } }");
    assert_eq!(err.kind, ErrorKind::Type);
    let err = run_err("fn main() { while 1i32 { } }");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn if_branches_must_agree() {
    let err = run_err("fn main() { let x: i32 = if true { 1 } else { false }; }");
    assert_eq!(err.kind, ErrorKind::Type);

    // Never yields to the concrete branch.
    run("fn f() -> i32 { if true { return 1; } else { 2 } } fn main() { }").unwrap();
}

#[test]
fn integer_widths_do_not_mix() {
    let err = run_err("fn main() { let x = 1i32 + 1u32; }");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn sibling_resolves_bare_literal() {
    run("fn main() { let x = 1u32 + 1; let y = 1 + 1u32; }").unwrap();
}

#[test]
fn casts_between_integers_only() {
    run("fn main() { let x = 1i32 as u32; let y = x as usize; }").unwrap();
    let err = run_err("fn main() { let b = true as i32; }");
    assert_eq!(err.kind, ErrorKind::Type);
    let err = run_err("fn main() { let x = 1i32; let r = &x as u32; }");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn call_arity_is_checked() {
    let err = run_err("fn f(a: i32) { } fn main() { f(); }");
    assert_eq!(err.kind, ErrorKind::Shape);
    let err = run_err("fn f(a: i32) { } fn main() { f(1, 2); }");
    assert_eq!(err.kind, ErrorKind::Shape);
}

#[test]
fn method_not_found() {
    let err = run_err("struct S; fn main() { let s = S; s.nope(); }");
    assert_eq!(err.kind, ErrorKind::Type);
    assert!(err.message.contains("nope"));
}

#[test]
fn unknown_field() {
    let err = run_err("struct P { x: i32 } fn main() { let p = P { x: 1 }; let y = p.z; }");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn mutable_reference_requires_mutable_place() {
    let err = run_err("fn main() { let x = 1i32; let r = &mut x; }");
    assert_eq!(err.kind, ErrorKind::Mutability);
    run("fn main() { let mut x = 1i32; let r = &mut x; *r = 2; }").unwrap();
}

#[test]
fn deref_assignment_respects_reference_mutability() {
    let err = run_err("fn main() { let mut x = 1i32; let r = &x; *r = 2; }");
    assert_eq!(err.kind, ErrorKind::Mutability);
}

#[test]
fn assignment_to_non_place() {
    let err = run_err("fn main() { 1i32 = 2; }");
    assert_eq!(err.kind, ErrorKind::Mutability);
}

#[test]
fn array_len_via_synthetic_method() {
    run("fn main() { let a = [1i32, 2, 3]; let n: usize = a.len(); }").unwrap();
}

#[test]
fn string_builtins_work_end_to_end() {
    run(
        "fn main() { \
             let mut s = getString(); \
             s.append(&\"!\"); \
             let n: usize = s.len(); \
             printlnInt(getInt()); \
         }",
    )
    .unwrap();
}

#[test]
fn indexing_requires_usize() {
    let err = run_err("fn main() { let a = [1i32, 2]; let x = a[0i32]; }");
    assert_eq!(err.kind, ErrorKind::Type);
    run("fn main() { let a = [1i32, 2]; let x = a[0]; }").unwrap();
}

#[test]
fn array_element_types_must_agree() {
    let err = run_err("fn main() { let a = [1i32, true]; }");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn enum_comparison_is_allowed() {
    run("enum E { A, B } fn main() { let e = E::A; let b = e == E::B; }").unwrap();
    let err = run_err("enum E { A } fn main() { let b = E::A < E::A; }");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn break_types_must_agree() {
    let err = run_err("fn main() { loop { break 1i32; break true; } }");
    assert_eq!(err.kind, ErrorKind::Type);
}

#[test]
fn while_loops_produce_unit() {
    run("fn main() { let u: () = while false { }; }").unwrap();
}

#[test]
fn nested_loop_breaks_separate() {
    run(
        "fn main() { \
             let x: i32 = loop { \
                 loop { break; } \
                 break 7; \
             }; \
         }",
    )
    .unwrap();
}

#[test]
fn assoc_const_through_self_path() {
    run(
        "struct P { x: i32 } \
         impl P { \
             const ZERO: i32 = 0; \
             fn base() -> i32 { Self::ZERO } \
         } \
         fn main() { let b = P::base(); }",
    )
    .unwrap();
}

#[test]
fn re_running_a_completed_pass_is_a_no_op() {
    // Idempotence: the linker's postcondition implies its precondition is
    // void, so running it twice cannot change or fail anything.
    let tokens = rivc_lex::lex(
        "fn main() { loop { break 1i32; } while true { continue; } return; }",
        FileId::DUMMY,
    )
    .unwrap();
    let ast = rivc_par::parse(tokens).unwrap();
    let mut program = rivc_sem::lower::lower_program(ast);
    let mut ctxt = TyCtxt::new();
    rivc_sem::resolve::resolve(&mut program, &mut ctxt).unwrap();
    rivc_sem::cfl::link(&mut program).unwrap();
    rivc_sem::cfl::link(&mut program).unwrap();
    rivc_sem::finalize::finalize(&mut program, &mut ctxt).unwrap();
    rivc_sem::finalize::finalize(&mut program, &mut ctxt).unwrap();
}

fn walk_exprs(expr: &Expr, f: &mut impl FnMut(&Expr)) {
    f(expr);
    match &expr.kind {
        ExprKind::FieldAccess { base, .. } => walk_exprs(base, f),
        ExprKind::StructLiteral { fields, .. } => match fields {
            StructLitFields::Syntactic(inits) => {
                inits.iter().for_each(|i| walk_exprs(&i.expr, f))
            }
            StructLitFields::Canonical(exprs) => exprs.iter().for_each(|e| walk_exprs(e, f)),
        },
        ExprKind::ArrayLiteral(elems) => elems.iter().for_each(|e| walk_exprs(e, f)),
        ExprKind::ArrayRepeat { elem, count } => {
            walk_exprs(elem, f);
            if let ArrayCount::Unevaluated(c) = count {
                walk_exprs(c, f);
            }
        }
        ExprKind::Index { base, index } => {
            walk_exprs(base, f);
            walk_exprs(index, f);
        }
        ExprKind::Assign { place, value } => {
            walk_exprs(place, f);
            walk_exprs(value, f);
        }
        ExprKind::Unary { operand, .. } => walk_exprs(operand, f),
        ExprKind::Binary { lhs, rhs, .. } => {
            walk_exprs(lhs, f);
            walk_exprs(rhs, f);
        }
        ExprKind::Cast { operand, .. } => walk_exprs(operand, f),
        ExprKind::Call { callee, args } => {
            walk_exprs(callee, f);
            args.iter().for_each(|a| walk_exprs(a, f));
        }
        ExprKind::MethodCall { receiver, args, .. } => {
            walk_exprs(receiver, f);
            args.iter().for_each(|a| walk_exprs(a, f));
        }
        ExprKind::Block(block) => {
            for stmt in &block.stmts {
                match stmt {
                    Stmt::Let(l) => walk_exprs(&l.init, f),
                    Stmt::Expr(e) => walk_exprs(e, f),
                }
            }
            if let Some(tail) = &block.tail {
                walk_exprs(tail, f);
            }
        }
        ExprKind::If {
            cond,
            then_branch,
            else_branch,
        } => {
            walk_exprs(cond, f);
            walk_exprs(then_branch, f);
            if let Some(e) = else_branch {
                walk_exprs(e, f);
            }
        }
        ExprKind::Loop { body, .. } => walk_exprs(body, f),
        ExprKind::While { cond, body, .. } => {
            walk_exprs(cond, f);
            walk_exprs(body, f);
        }
        ExprKind::Break { value, .. } | ExprKind::Return { value, .. } => {
            if let Some(v) = value {
                walk_exprs(v, f);
            }
        }
        _ => {}
    }
}
