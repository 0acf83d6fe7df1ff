//! rivc-drv - Compiler driver.
//!
//! Orchestrates the front-end phases over one input file: read, lex,
//! parse, run the semantic pipeline, and render any fatal diagnostic with
//! file/line/column and a caret underline. I/O problems are the caller's
//! (`anyhow`) errors; source-level problems become a rendered diagnostic
//! and a [`CompileOutcome::Error`].

use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use rivc_sem::{Analysis, TyCtxt};
use rivc_util::{Diagnostic, SourceMap};

/// Driver options, mapped straight from the CLI flags.
#[derive(Debug, Default)]
pub struct Options {
    /// Dump the validated HIR to stdout on success.
    pub emit_hir: bool,
}

/// Result of compiling one file.
#[derive(Debug)]
pub enum CompileOutcome {
    /// The program is semantically valid.
    Success(Box<Analysis>),
    /// A fatal diagnostic, already rendered for the terminal.
    Error(String),
}

/// Run the semantic pipeline over `input`.
pub fn run_semantic(input: &Path, options: &Options) -> anyhow::Result<CompileOutcome> {
    let source = fs::read_to_string(input)
        .with_context(|| format!("cannot read input file `{}`", input.display()))?;

    let mut sources = SourceMap::new();
    let file_id = sources.add_file(input.display().to_string(), source.as_str());
    info!(file = %input.display(), bytes = source.len(), "compiling");

    let tokens = match rivc_lex::lex(&source, file_id) {
        Ok(tokens) => tokens,
        Err(err) => {
            let diag = Diagnostic::error(err.kind.to_string(), err.span).with_kind("lex");
            return Ok(CompileOutcome::Error(diag.render(&sources)));
        }
    };

    let ast = match rivc_par::parse(tokens) {
        Ok(ast) => ast,
        Err(err) => {
            let diag = Diagnostic::error(err.message, err.span).with_kind("parse");
            return Ok(CompileOutcome::Error(diag.render(&sources)));
        }
    };

    let mut ctxt = TyCtxt::new();
    match rivc_sem::analyze(ast, &mut ctxt) {
        Ok(analysis) => {
            if options.emit_hir {
                println!("{:#?}", analysis.program);
            }
            Ok(CompileOutcome::Success(Box::new(analysis)))
        }
        Err(err) => Ok(CompileOutcome::Error(err.into_diagnostic().render(&sources))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(content.as_bytes()).expect("write");
        file
    }

    #[test]
    fn test_success_outcome() {
        let file = write_temp("fn main() { let x: i32 = 1 + 2; }");
        let outcome = run_semantic(file.path(), &Options::default()).unwrap();
        assert!(matches!(outcome, CompileOutcome::Success(_)));
    }

    #[test]
    fn test_semantic_error_is_rendered() {
        let file = write_temp("fn main() {\n    let x: i32 = true;\n}\n");
        let outcome = run_semantic(file.path(), &Options::default()).unwrap();
        let CompileOutcome::Error(rendered) = outcome else {
            panic!("expected an error outcome")
        };
        assert!(rendered.contains("error[type]"), "{rendered}");
        assert!(rendered.contains(":2:"), "{rendered}");
        assert!(rendered.contains('^'), "{rendered}");
    }

    #[test]
    fn test_lex_and_parse_errors() {
        let file = write_temp("fn main() { let s = \"unterminated; }");
        let outcome = run_semantic(file.path(), &Options::default()).unwrap();
        let CompileOutcome::Error(rendered) = outcome else {
            panic!("expected an error outcome")
        };
        assert!(rendered.contains("error[lex]"), "{rendered}");

        let file = write_temp("fn main( { }");
        let outcome = run_semantic(file.path(), &Options::default()).unwrap();
        let CompileOutcome::Error(rendered) = outcome else {
            panic!("expected an error outcome")
        };
        assert!(rendered.contains("error[parse]"), "{rendered}");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = run_semantic(Path::new("/nonexistent/input.rs"), &Options::default())
            .unwrap_err();
        assert!(err.to_string().contains("cannot read"));
    }
}
