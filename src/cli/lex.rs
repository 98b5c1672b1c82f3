use std::path::PathBuf;
use std::process;

use clap::Args;

use plzero::diagnostic::render_diagnostics;
use plzero::lexer::Lexer;

#[derive(Args)]
pub struct LexArgs {
    /// Input .pl0 source file
    pub input: PathBuf,
}

/// Print the token stream, one `kind [lexeme]` pair per line.
pub fn cmd_lex(args: LexArgs) {
    let source = match std::fs::read_to_string(&args.input) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("error: cannot read '{}': {}", args.input.display(), err);
            process::exit(1);
        }
    };

    let (tokens, diagnostics) = Lexer::new(&source).tokenize();
    if !diagnostics.is_empty() {
        render_diagnostics(&diagnostics, &args.input.display().to_string(), &source);
        process::exit(1);
    }

    for token in &tokens {
        match token.lexeme() {
            Some(text) => println!("{} {}", token.kind_name(), text),
            None => println!("{}", token.kind_name()),
        }
    }
}
