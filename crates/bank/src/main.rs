#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
//! Command-line interface for synchronizing a bank of git repositories via
//! the libbank crate.

/// Command-line argument definitions.
mod args;
/// Implementations of the CLI subcommands.
mod commands;

use std::{
    io::{self, IsTerminal},
    path::PathBuf,
    process,
};

use anyhow::Result;
use clap::Parser;
use libbank::{BankConfig, BankError, DEFAULT_VERBOSITY, Output, Terminal};

use crate::args::{Cli, Commands};

/// CLI entrypoint.
fn main() -> Result<()> {
    let cli = Cli::parse();

    // Color preference from the flags alone, so configuration errors still
    // render correctly before the config file has been read.
    let flag_color = if cli.color {
        true
    } else if cli.no_color {
        false
    } else {
        io::stdout().is_terminal()
    };

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(err) => {
            let output = Terminal::new(flag_color, DEFAULT_VERBOSITY);
            fail_with(&output, &anyhow::Error::new(err));
        }
    };

    let color = config.colorize.unwrap_or(flag_color);
    let output = Terminal::new(color, config.verbosity);

    match run(&cli, &config, &output) {
        Ok(true) => {
            output.finish()?;
            Ok(())
        }
        Ok(false) => {
            output.finish()?;
            process::exit(1);
        }
        Err(err) => fail_with(&output, &err),
    }
}

/// Report a fatal error through the output handler and exit with the error's
/// recommended code.
fn fail_with(output: &dyn Output, err: &anyhow::Error) -> ! {
    if let Err(display_err) = output.error(&format!("{err:#}")) {
        eprintln!("failed to report error: {display_err:#}");
    }
    if let Err(finish_err) = output.finish() {
        eprintln!("failed to flush output handler: {finish_err:#}");
    }
    let code = err
        .downcast_ref::<BankError>()
        .map_or(1, BankError::exit_code);
    process::exit(code);
}

/// Merge defaults, the optional `bankconfig.toml`, and command-line flags
/// into one explicit configuration value, in increasing precedence.
fn resolve_config(cli: &Cli) -> libbank::Result<BankConfig> {
    let config_dir = cli.cwd.clone().unwrap_or_else(|| PathBuf::from("."));
    let mut config = BankConfig::load(&config_dir)?;

    if let Some(cwd) = &cli.cwd {
        config.cwd = cwd.clone();
    }
    if let Some(syncfile) = &cli.syncfile {
        config.syncfile = syncfile.clone();
    }
    if let Some(verbosity) = cli.verbosity {
        config.verbosity = verbosity;
    }
    if cli.color {
        config.colorize = Some(true);
    }
    if cli.no_color {
        config.colorize = Some(false);
    }
    if let Commands::Sync {
        matching: Some(mode),
    } = &cli.command
    {
        config.matching = (*mode).into();
    }

    Ok(config)
}

/// Execute the selected command. Returns whether the batch succeeded; fatal
/// errors are returned as errors.
fn run(cli: &Cli, config: &BankConfig, output: &dyn Output) -> Result<bool> {
    match &cli.command {
        Commands::Sync { .. } => commands::sync(config, cli.dry_run, output),
        Commands::Record => commands::record(config, cli.dry_run, output),
        Commands::Create { repos } => commands::create(config, repos, cli.dry_run, output),
    }
}
