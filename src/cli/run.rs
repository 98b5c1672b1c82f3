use std::io;
use std::path::PathBuf;
use std::process;

use clap::Args;

use plzero::vm::Vm;

use super::compile_or_exit;

#[derive(Args)]
pub struct RunArgs {
    /// Input .pl0 source file
    pub input: PathBuf,
}

pub fn cmd_run(args: RunArgs) {
    let code = compile_or_exit(&args.input);

    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut vm = Vm::new(&code);
    if let Err(err) = vm.run(&mut stdin.lock(), &mut stdout.lock()) {
        eprintln!("runtime error: {}", err);
        process::exit(1);
    }
}
