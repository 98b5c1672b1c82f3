pub mod build;
pub mod check;
pub mod lex;
pub mod run;

use std::path::Path;
use std::process;

use plzero::code::Code;
use plzero::CompileError;

/// Read and compile a source file, or exit with status 1.
///
/// Lexer diagnostics are rendered by the pipeline itself; generation
/// errors are reported through the numeric message table.
pub(crate) fn compile_or_exit(path: &Path) -> Code {
    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read '{}': {}", path.display(), err);
            process::exit(1);
        }
    };
    match plzero::compile_source(&source, &path.display().to_string()) {
        Ok(code) => code,
        Err(CompileError::Lex(_)) => process::exit(1),
        Err(CompileError::Gen(err)) => {
            eprintln!("error {}: {}", err.code(), err);
            process::exit(1);
        }
    }
}
