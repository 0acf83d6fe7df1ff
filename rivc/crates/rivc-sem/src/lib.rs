//! rivc-sem - The semantic middle-end of the Riv compiler.
//!
//! Takes a freshly parsed AST and refines it, pass by pass, into a
//! lowering-ready HIR in which every expression has a known type, every
//! name is bound to a definition, every jump targets a known construct,
//! every constant has a computed value, and every program-level rule is
//! checked.
//!
//! The passes run in a fixed order over a shared mutable [`hir::Program`]
//! and an explicitly threaded [`ty::TyCtxt`]:
//!
//! 1. [`lower`]: AST to HIR conversion (mechanical, infallible),
//! 2. [`resolve`]: name resolution, impl registration, struct-literal
//!    canonicalization,
//! 3. [`traits`]: trait impls validated signature by signature,
//! 4. [`cfl`]: `return`/`break`/`continue` linked to their targets,
//! 5. [`finalize`]: type annotations interned, constants evaluated,
//! 6. [`check`]: the bidirectional type checker stamps an `ExprInfo` on
//!    every expression,
//! 7. [`exit`]: `exit()` placement.
//!
//! Every pass is fail-fast: the first error aborts the pipeline, so each
//! pass may rely on the full postcondition of the previous one.

pub mod builtins;
pub mod cfl;
pub mod check;
pub mod consteval;
pub mod error;
pub mod exit;
pub mod finalize;
pub mod hir;
pub mod impl_table;
pub mod lower;
pub mod resolve;
pub mod scope;
pub mod traits;
pub mod ty;

use tracing::debug;

pub use builtins::BuiltinIds;
pub use consteval::ConstValue;
pub use error::{ErrorKind, SemError, SemResult};
pub use hir::Program;
pub use impl_table::ImplTable;
pub use ty::{TyCtxt, TypeId};

/// The validated output of the semantic pipeline.
#[derive(Debug)]
pub struct Analysis {
    pub program: Program,
    pub impls: ImplTable,
    pub builtins: BuiltinIds,
}

/// Run the whole semantic pipeline over a parsed program.
///
/// The type context is created by the caller and threaded through
/// explicitly; on success it holds every interned type the lowering stage
/// will see.
///
/// # Examples
///
/// ```
/// use rivc_util::FileId;
///
/// let tokens = rivc_lex::lex("fn main() { let x: i32 = 1 + 2; }", FileId::DUMMY).unwrap();
/// let ast = rivc_par::parse(tokens).unwrap();
/// let mut ctxt = rivc_sem::TyCtxt::new();
/// let analysis = rivc_sem::analyze(ast, &mut ctxt).unwrap();
/// assert!(analysis.program.main_func().is_some());
/// ```
pub fn analyze(ast: rivc_par::ast::Ast, ctxt: &mut TyCtxt) -> SemResult<Analysis> {
    debug!("semantic pipeline start");
    let mut program = lower::lower_program(ast);
    let resolution = resolve::resolve(&mut program, ctxt)?;
    traits::validate(&program, ctxt)?;
    cfl::link(&mut program)?;
    finalize::finalize(&mut program, ctxt)?;
    check::check(&mut program, ctxt, &resolution.impls)?;
    exit::check_exit(&program, resolution.builtins.exit)?;
    debug!("semantic pipeline done");
    Ok(Analysis {
        program,
        impls: resolution.impls,
        builtins: resolution.builtins,
    })
}
