mod cli;

use clap::{Parser, Subcommand};

use cli::build::BuildArgs;
use cli::check::CheckArgs;
use cli::lex::LexArgs;
use cli::run::RunArgs;

#[derive(Parser)]
#[command(name = "plzero", version, about = "PL/0 compiler for the P-machine")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a .pl0 file to a P-machine listing
    Build(BuildArgs),
    /// Compile and execute immediately
    Run(RunArgs),
    /// Lex and generate without writing a listing
    Check(CheckArgs),
    /// Print the token stream of a source file
    Lex(LexArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Build(args) => cli::build::cmd_build(args),
        Command::Run(args) => cli::run::cmd_run(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Lex(args) => cli::lex::cmd_lex(args),
    }
}
