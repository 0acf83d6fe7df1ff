//! Semantic error values.
//!
//! Every pass is fail-fast: the first error aborts the pass and the
//! pipeline. A [`SemError`] carries a taxonomy [`ErrorKind`], a
//! human-readable message and one primary span; the driver renders it
//! through [`rivc_util::Diagnostic`].

use rivc_util::{Diagnostic, Span};
use thiserror::Error;

/// Taxonomy of semantic error kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// Unresolved identifier or path, duplicate declaration, `self`/`Self`
    /// misuse.
    Name,
    /// Type mismatch, failed integer inference, bad operand category,
    /// invalid cast, reference mutability mismatch.
    Type,
    /// Struct literal field problems, call arity mismatch.
    Shape,
    /// Assignment to a non-place or immutable place, `&mut` of an immutable
    /// place.
    Mutability,
    /// Const evaluation failure, const cycle, non-const expression in const
    /// context, bad array length.
    Const,
    /// `break`/`continue` outside a loop, `return` outside a function,
    /// misplaced `exit`.
    ControlFlow,
    /// Missing or mismatched item in a trait impl.
    Trait,
    /// Internal logic error; firing one is a compiler bug.
    Invariant,
}

impl ErrorKind {
    /// Short label rendered inside `error[...]`.
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::Name => "name",
            ErrorKind::Type => "type",
            ErrorKind::Shape => "shape",
            ErrorKind::Mutability => "mutability",
            ErrorKind::Const => "const",
            ErrorKind::ControlFlow => "control-flow",
            ErrorKind::Trait => "trait",
            ErrorKind::Invariant => "invariant",
        }
    }
}

/// A fatal semantic error.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct SemError {
    pub kind: ErrorKind,
    pub message: String,
    pub span: Span,
}

pub type SemResult<T> = Result<T, SemError>;

impl SemError {
    pub fn new(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            span,
        }
    }

    pub fn name(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Name, span, message)
    }

    pub fn ty(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Type, span, message)
    }

    pub fn shape(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Shape, span, message)
    }

    pub fn mutability(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Mutability, span, message)
    }

    pub fn konst(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Const, span, message)
    }

    pub fn control_flow(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ControlFlow, span, message)
    }

    pub fn trait_err(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Trait, span, message)
    }

    pub fn invariant(span: Span, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Invariant, span, message)
    }

    pub fn into_diagnostic(self) -> Diagnostic {
        Diagnostic::error(self.message, self.span).with_kind(self.kind.label())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(ErrorKind::Name.label(), "name");
        assert_eq!(ErrorKind::ControlFlow.label(), "control-flow");
    }

    #[test]
    fn test_into_diagnostic_keeps_kind_and_span() {
        let span = Span::new(3, 7, 1, 4);
        let err = SemError::ty(span, "type mismatch");
        let diag = err.into_diagnostic();
        assert_eq!(diag.kind.as_deref(), Some("type"));
        assert_eq!(diag.span, span);
        assert_eq!(diag.message, "type mismatch");
    }
}
