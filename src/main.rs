use clap::Parser;
use miette::Result;
use camo::cli::{Cli, Commands};
use camo::output::{install_logger, Printer};

fn main() -> Result<()> {
    let cli = Cli::parse();
    install_logger(cli.log_level());
    let printer = Printer::new();

    match cli.command {
        Commands::Build(args) => camo::cli::build::run(args, &printer)?,
        Commands::Palette(args) => camo::cli::palette::run(args, &printer)?,
        Commands::Init(args) => camo::cli::init::run(args, &printer)?,
        Commands::Completions(args) => camo::cli::completions::run(args)?,
    }

    Ok(())
}
