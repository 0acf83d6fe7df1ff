//! rivc-util - Foundation types for the Riv compiler.
//!
//! Everything in this crate is phase-agnostic infrastructure shared by the
//! lexer, parser, semantic core and driver:
//!
//! - [`Span`] / [`FileId`] / [`SourceMap`]: source location tracking,
//! - [`Symbol`]: 4-byte interned strings with O(1) equality,
//! - [`IndexVec`] / [`Idx`]: vectors with typed indices (arena handles),
//! - [`Diagnostic`]: fatal error values rendered with a caret underline.
//!
//! The crate deliberately has no knowledge of tokens, AST or HIR shapes;
//! those live in the phase crates that depend on it.

pub mod diagnostic;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, Level};
pub use index_vec::{Idx, IndexVec};
pub use span::{FileId, SourceMap, Span};
pub use symbol::Symbol;

// Re-export the hash collections used throughout the compiler so phase
// crates agree on one hasher.
pub use rustc_hash::{FxHashMap, FxHashSet};
