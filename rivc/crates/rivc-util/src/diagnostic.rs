//! Diagnostic module - fatal error values and their rendering.
//!
//! The semantic pipeline is fail-fast: each pass either completes or raises
//! one fatal [`Diagnostic`]. A diagnostic carries a severity, a taxonomy
//! label (rendered as `error[name]`), a message, a primary span, and any
//! notes or help lines the raising pass attached.
//!
//! Rendering is done against a [`SourceMap`] and produces the familiar
//! caret-underline format:
//!
//! ```text
//! error[type]: type mismatch: expected `i32`, found `bool`
//!   --> main.rs:3:18
//!    |
//!  3 |     let x: i32 = true;
//!    |                  ^^^^
//! ```

use std::fmt;

use crate::span::{SourceMap, Span};

/// Diagnostic severity level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Level {
    /// A fatal error; compilation of the current input stops.
    Error,
    /// A non-fatal observation.
    Warning,
    /// Additional context attached to another diagnostic.
    Note,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
            Level::Note => write!(f, "note"),
        }
    }
}

/// A diagnostic message with severity and location.
#[derive(Clone, Debug)]
pub struct Diagnostic {
    pub level: Level,
    /// Taxonomy label, e.g. `"name"`, `"type"`, `"const"`.
    pub kind: Option<String>,
    pub message: String,
    pub span: Span,
    pub notes: Vec<String>,
    pub helps: Vec<String>,
}

impl Diagnostic {
    pub fn new(level: Level, message: impl Into<String>, span: Span) -> Self {
        Self {
            level,
            kind: None,
            message: message.into(),
            span,
            notes: Vec::new(),
            helps: Vec::new(),
        }
    }

    pub fn error(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Error, message, span)
    }

    pub fn warning(message: impl Into<String>, span: Span) -> Self {
        Self::new(Level::Warning, message, span)
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.helps.push(help.into());
        self
    }

    /// Render with file/line/column and a caret underline.
    ///
    /// Spans that do not resolve against the map (dummy spans, synthesized
    /// nodes) fall back to the header line alone.
    pub fn render(&self, map: &SourceMap) -> String {
        let mut out = String::new();

        match &self.kind {
            Some(kind) => {
                out.push_str(&format!("{}[{}]: {}", self.level, kind, self.message));
            }
            None => out.push_str(&format!("{}: {}", self.level, self.message)),
        }

        if let Ok(file) = map.file(self.span.file_id) {
            if self.span.line > 0 {
                let line_no = self.span.line as usize;
                out.push_str(&format!(
                    "\n  --> {}:{}:{}",
                    file.name(),
                    self.span.line,
                    self.span.column
                ));
                if let Some(line_text) = file.line_at(line_no) {
                    let gutter = line_no.to_string();
                    let pad = " ".repeat(gutter.len());
                    let col = (self.span.column as usize).saturating_sub(1);
                    let width = self.span.len().max(1).min(line_text.len().saturating_sub(col).max(1));
                    out.push_str(&format!("\n {pad} |"));
                    out.push_str(&format!("\n {gutter} | {line_text}"));
                    out.push_str(&format!(
                        "\n {pad} | {}{}",
                        " ".repeat(col),
                        "^".repeat(width)
                    ));
                }
            }
        }

        for note in &self.notes {
            out.push_str(&format!("\n note: {note}"));
        }
        for help in &self.helps {
            out.push_str(&format!("\n help: {help}"));
        }

        out
    }
}
