//! `skill-deploy` binary: parse arguments, set up logging, run the engine.
use anyhow::Result;
use clap::Parser;

use skill_deploy::{cli, commands, logging};

fn main() -> Result<()> {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = cli::Cli::parse();
    logging::init_subscriber(args.verbose);
    let log = logging::Logger::new();
    commands::run(&args, &log)
}
