//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::application::services::DocumentFormat;

/// Resolve ${variable} references and arithmetic in YAML configuration files
#[derive(Parser, Debug)]
#[command(name = "yamlx")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub debug: u8,

    /// Config file (default: ./.yamlx.toml)
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve all expressions in a document and print it
    Resolve {
        /// Document to resolve (.yaml, .yml, .ymx or .json)
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        /// Output format (default from settings)
        #[arg(short, long, value_enum)]
        format: Option<FormatArg>,

        /// Write to this file instead of stdout
        #[arg(short, long, value_hint = ValueHint::FilePath)]
        output: Option<PathBuf>,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Check that every expression in a document resolves
    Check {
        /// Document to check
        #[arg(value_hint = ValueHint::FilePath)]
        file: PathBuf,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Evaluate a single expression
    Eval {
        /// Expression, e.g. '${server.port} + 1'
        expression: String,

        /// Document that variables are looked up in
        #[arg(long, value_hint = ValueHint::FilePath)]
        context: Option<PathBuf>,

        #[command(flatten)]
        resolve: ResolveArgs,
    },

    /// Show the syntax tree of an expression
    Parse {
        /// Expression to parse
        expression: String,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Flags that override resolver settings.
#[derive(Args, Debug, Clone, Default)]
pub struct ResolveArgs {
    /// Only treat ${...} and pure arithmetic strings as expressions
    #[arg(long)]
    pub strict: bool,

    /// Also resolve expressions inside lists
    #[arg(long)]
    pub sequences: bool,

    /// Limit for chained variable references
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Limit for referenced expressions expanded by one value
    #[arg(long)]
    pub max_expansions: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective settings
    Show,
    /// Show config file locations
    Path,
    /// Print a commented config template
    Template,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    Yaml,
    Json,
}

impl From<FormatArg> for DocumentFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Yaml => DocumentFormat::Yaml,
            FormatArg::Json => DocumentFormat::Json,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    // https://docs.rs/clap/latest/clap/_derive/_tutorial/index.html#testing
    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn given_resolve_flags_when_parsing_then_collected() {
        let cli = Cli::try_parse_from([
            "yamlx", "-dd", "resolve", "conf.ymx", "--strict", "--sequences", "--max-depth", "5",
            "--max-expansions", "100", "-f", "json",
        ])
        .unwrap();

        assert_eq!(cli.debug, 2);
        match cli.command {
            Some(Commands::Resolve {
                file,
                format,
                output,
                resolve,
            }) => {
                assert_eq!(file, PathBuf::from("conf.ymx"));
                assert_eq!(format, Some(FormatArg::Json));
                assert!(output.is_none());
                assert!(resolve.strict);
                assert!(resolve.sequences);
                assert_eq!(resolve.max_depth, Some(5));
                assert_eq!(resolve.max_expansions, Some(100));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
