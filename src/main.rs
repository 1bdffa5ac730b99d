use clap::{Parser, Subcommand};

mod cli;

use cli::generate::{cmd_generate, GenerateArgs};
use cli::list::{cmd_list, ListArgs};

#[derive(Parser)]
#[command(
    name = "minihost",
    version,
    about = "Turn captured OpenCL dispatches into standalone replay programs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Emit one C replay program per capture record
    Generate(GenerateArgs),
    /// Summarize and validate the records of a capture log
    List(ListArgs),
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Command::Generate(args) => cmd_generate(args),
        Command::List(args) => cmd_list(args),
    }
}
