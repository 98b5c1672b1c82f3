use std::path::PathBuf;
use std::process;

use clap::Args;

use super::compile_or_exit;

#[derive(Args)]
pub struct BuildArgs {
    /// Input .pl0 source file
    pub input: PathBuf,
    /// Output listing file (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// Print indices and mnemonics instead of the loader format
    #[arg(long)]
    pub pretty: bool,
}

pub fn cmd_build(args: BuildArgs) {
    let code = compile_or_exit(&args.input);

    let text = if args.pretty {
        code.disassemble()
    } else {
        code.to_string()
    };

    match args.output {
        Some(path) => {
            if let Err(err) = std::fs::write(&path, &text) {
                eprintln!("error: cannot write '{}': {}", path.display(), err);
                process::exit(1);
            }
        }
        None => print!("{}", text),
    }
}
