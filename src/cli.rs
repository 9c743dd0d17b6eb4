use crate::command::Command;
use clap::Parser;

#[derive(Parser)]
#[command(name = "eng-bump", version, about)]
pub struct Cli {
    /// Log progress at debug level (RUST_LOG overrides)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbose_is_global() {
        let cli = Cli::try_parse_from(["eng-bump", "mono-addin", "artifacts.json", "-v"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Command::MonoAddin(_)));
    }
}
