use std::process;

use anyhow::Result;
use clap::Parser;
use native_prep::cli::{Cli, Command};
use native_prep::cmd;
use tracing::Level;

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Emit(args) => cmd::emit::run(&args),
        Command::Validate(args) => {
            let code = cmd::validate::run(&args)?;
            process::exit(code);
        }
        Command::Inventory(args) => cmd::inventory::run(&args),
        Command::Config(config_cmd) => cmd::config::run(config_cmd),
    }
}

fn init_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::WARN };
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init();
}
