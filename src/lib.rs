pub mod code;
pub mod cursor;
pub mod diagnostic;
pub mod error;
pub mod gen;
pub mod isa;
pub mod lexer;
pub mod span;
pub mod symtab;
pub mod token;
pub mod vm;

use std::fmt;

use code::Code;
use diagnostic::{render_diagnostics, Diagnostic};
use error::GenError;
use gen::generate;
use lexer::Lexer;

/// Failure of either pipeline stage.
#[derive(Debug)]
pub enum CompileError {
    Lex(Vec<Diagnostic>),
    Gen(GenError),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompileError::Lex(diags) => write!(f, "{} lexical error(s)", diags.len()),
            CompileError::Gen(err) => write!(f, "error {}: {}", err.code(), err),
        }
    }
}

impl std::error::Error for CompileError {}

/// Lex and generate, rendering lexer diagnostics to stderr.
pub fn compile_source(source: &str, filename: &str) -> Result<Code, CompileError> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        render_diagnostics(&lex_errors, filename, source);
        return Err(CompileError::Lex(lex_errors));
    }
    generate(&tokens).map_err(CompileError::Gen)
}

/// Lex and generate without touching stderr.
pub fn compile_source_silent(source: &str) -> Result<Code, CompileError> {
    let (tokens, lex_errors) = Lexer::new(source).tokenize();
    if !lex_errors.is_empty() {
        return Err(CompileError::Lex(lex_errors));
    }
    generate(&tokens).map_err(CompileError::Gen)
}
