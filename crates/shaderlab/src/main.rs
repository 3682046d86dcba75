mod bootstrap;
mod cli;
mod config;
mod editor;
mod paths;
mod run;

use anyhow::Result;
use cli::Command;

fn main() -> Result<()> {
    let cli = cli::parse();
    run::initialise_tracing();

    let config = cli.run.config.clone();
    match cli.command {
        Some(Command::Generate(args)) => run::generate(args, config.as_deref()),
        Some(Command::Paths) => run::print_paths(config.as_deref()),
        None => run::run(cli.run),
    }
}
