use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Harvests issue-tracker and source-control activity and publishes it
/// as events on the message bus.
#[derive(Parser, Debug)]
#[command(name = "kesi", version, about)]
pub struct CliArgs {
    /// Path to the kesi.toml config file.
    #[arg(long, global = true, env = "KESI_CONFIG", default_value = "kesi.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the pipeline and run until Ctrl-C.
    Run,

    /// Validate the configuration and list the configured sources.
    Check,

    /// Print the persisted checkpoint of every source.
    Checkpoints,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults_and_subcommand() {
        let args = CliArgs::try_parse_from(["kesi", "check"]).unwrap();
        assert!(matches!(args.command, Command::Check));
        assert_eq!(args.config, PathBuf::from("kesi.toml"));
    }

    #[test]
    fn config_flag_after_subcommand() {
        let args = CliArgs::try_parse_from(["kesi", "run", "--config", "/etc/kesi.toml"]).unwrap();
        assert!(matches!(args.command, Command::Run));
        assert_eq!(args.config, PathBuf::from("/etc/kesi.toml"));
    }
}
