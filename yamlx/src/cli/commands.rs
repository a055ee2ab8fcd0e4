//! Command dispatch

use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use tracing::{debug, instrument};

use crate::application::services::DocumentFormat;
use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, FormatArg, ResolveArgs};
use crate::cli::output;
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{parse, Detection};
use crate::infrastructure::ServiceContainer;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, run `yamlx --help`".to_string(),
        ));
    };
    match command {
        Commands::Resolve {
            file,
            format,
            output,
            resolve,
        } => cmd_resolve(cli, file, *format, output.as_deref(), resolve),
        Commands::Check { file, resolve } => cmd_check(cli, file, resolve),
        Commands::Eval {
            expression,
            context,
            resolve,
        } => cmd_eval(cli, expression, context.as_deref(), resolve),
        Commands::Parse { expression } => cmd_parse(expression),
        Commands::Config { command } => cmd_config(cli, command),
        Commands::Completion { shell } => {
            clap_complete::generate(*shell, &mut Cli::command(), "yamlx", &mut io::stdout());
            Ok(())
        }
    }
}

/// The local config file: `--config` if given, else `./.yamlx.toml`.
fn local_config(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.config {
        Some(path) if !path.exists() => Err(CliError::InvalidArgs(format!(
            "config file not found: {}",
            path.display()
        ))),
        Some(path) => Ok(path.clone()),
        None => Ok(local_config_path(Path::new("."))),
    }
}

/// Settings from all config layers, with command line flags on top.
fn load_settings(cli: &Cli, args: Option<&ResolveArgs>) -> CliResult<Settings> {
    let mut settings = Settings::load(Some(local_config(cli)?.as_path()))?;
    if let Some(args) = args {
        if args.strict {
            settings.detection = Detection::Strict;
        }
        if args.sequences {
            settings.resolve_sequences = true;
        }
        if let Some(depth) = args.max_depth {
            settings.max_depth = depth;
        }
        if let Some(expansions) = args.max_expansions {
            settings.max_expansions = expansions;
        }
    }
    debug!("settings: {:?}", settings);
    Ok(settings)
}

#[instrument(skip(cli))]
fn cmd_resolve(
    cli: &Cli,
    file: &Path,
    format: Option<FormatArg>,
    output_path: Option<&Path>,
    args: &ResolveArgs,
) -> CliResult<()> {
    let container = ServiceContainer::new(load_settings(cli, Some(args))?);
    let resolved = container.documents.resolve_file(file)?;
    let format = format
        .map(DocumentFormat::from)
        .unwrap_or(container.settings.output_format);

    match output_path {
        Some(path) => {
            container.documents.write(path, &resolved, format)?;
            output::action("Wrote", &path.display());
        }
        None => output::data(&container.documents.render(&resolved, format)?),
    }
    Ok(())
}

#[instrument(skip(cli))]
fn cmd_check(cli: &Cli, file: &Path, args: &ResolveArgs) -> CliResult<()> {
    let container = ServiceContainer::new(load_settings(cli, Some(args))?);
    match container.documents.resolve_file(file) {
        Ok(_) => {
            output::success(&format!("{}: all expressions resolve", file.display()));
            Ok(())
        }
        Err(e) => {
            output::failure(&file.display());
            Err(e.into())
        }
    }
}

#[instrument(skip(cli))]
fn cmd_eval(
    cli: &Cli,
    expression: &str,
    context: Option<&Path>,
    args: &ResolveArgs,
) -> CliResult<()> {
    let container = ServiceContainer::new(load_settings(cli, Some(args))?);
    let value = container.documents.evaluate(expression, context)?;
    output::info(&format!("{value:?}"));
    Ok(())
}

#[instrument]
fn cmd_parse(expression: &str) -> CliResult<()> {
    let expr = parse(expression).map_err(ApplicationError::from)?;
    output::info(&expr.to_tree());
    output::detail(&format!("grouping: {expr}"));
    Ok(())
}

fn cmd_config(cli: &Cli, command: &ConfigCommands) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            let settings = load_settings(cli, None)?;
            output::data(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            output::header("Config files (lowest to highest precedence)");
            match global_config_path() {
                Some(path) => output::detail(&format!("global: {}", path.display())),
                None => output::detail(&"global: <no config directory>"),
            }
            output::detail(&format!("local:  {}", local_config(cli)?.display()));
            output::detail(&"env:    YAMLX_DETECTION, YAMLX_RESOLVE_SEQUENCES, YAMLX_MAX_DEPTH,");
            output::detail(&"        YAMLX_MAX_EXPANSIONS, YAMLX_OUTPUT_FORMAT");
        }
        ConfigCommands::Template => output::data(&Settings::template()),
    }
    Ok(())
}
