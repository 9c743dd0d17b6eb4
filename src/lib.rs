#![doc = include_str!("../README.md")]

pub mod cli;
pub mod command;
pub mod error;
pub mod fs;
pub mod github;
pub mod manifest;
pub mod rewrite;
pub mod steps;
pub mod vcs;
pub mod verify;

pub use error::*;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn run() -> Result<()> {
    use clap::Parser;

    let cli = cli::Cli::parse();
    init_logging(cli.verbose);
    cli.command.execute()
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(format!("warn,eng_bump={}", level)),
    )
    .format_timestamp(None)
    .format_target(false)
    .init();
}
