use std::path::PathBuf;

use clap::Args;

use super::compile_or_exit;

#[derive(Args)]
pub struct CheckArgs {
    /// Input .pl0 source file
    pub input: PathBuf,
}

pub fn cmd_check(args: CheckArgs) {
    let code = compile_or_exit(&args.input);
    println!("ok: {} instructions", code.len());
}
