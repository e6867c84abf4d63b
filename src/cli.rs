use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a script and print its diagnostics
    Validate {
        /// Script file
        file: PathBuf,
        /// Engine command catalog (defaults to executes.json next to the script)
        #[arg(long)]
        catalog: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = Format::Text)]
        format: Format,
    },
    /// Parse a script and report lines that could not be understood
    Parse {
        /// Script file
        file: PathBuf,
        /// Print the parsed script as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let cli = Cli::parse_from(["gamebook", "validate", "intro.gbs", "--format", "json", "-v"]);
        assert!(cli.verbose);
        match cli.command {
            Command::Validate {
                file,
                catalog,
                format,
            } => {
                assert_eq!(file, PathBuf::from("intro.gbs"));
                assert_eq!(catalog, None);
                assert_eq!(format, Format::Json);
            }
            other => panic!("unexpected {other:?}"),
        }

        let cli = Cli::parse_from(["gamebook", "parse", "--json", "intro.gbs"]);
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Command::Parse { json: true, .. }));
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["gamebook"]).is_err());
    }
}
