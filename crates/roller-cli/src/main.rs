// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

use clap::error::ErrorKind;
use clap::{CommandFactory, Parser, Subcommand};
use roller_cli::commands;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "roll")]
#[command(version)]
#[command(about = "Project build tool with task orchestration and live reload", long_about = None)]
struct Cli {
    /// Log level: error, warn, info, debug, trace
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    /// Verbose mode: show debug output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: only show errors (useful for CI)
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build every declared task once
    Build {
        /// Project directories to build, in order (default: current)
        projects: Vec<String>,
    },
    /// Watch, rebuild and live-reload until Ctrl-C
    Dev {
        /// Project directories to watch (default: current)
        projects: Vec<String>,
    },
    /// Serve the output directory without watching
    Serve {
        /// Port to serve on (default: from config, or 3000)
        #[arg(short, long)]
        port: Option<u16>,
        /// Directory to serve (default: from config)
        #[arg(short, long)]
        dir: Option<String>,
    },
    /// Format sources with the configured formatter
    Format {
        /// Project directories to format (default: current)
        projects: Vec<String>,
    },
    /// Check sources with the configured linter
    Lint {
        /// Project directories to lint (default: current)
        projects: Vec<String>,
    },
    /// Package the project as a zip
    Archive {
        /// Overwrite an existing archive without asking
        #[arg(short, long)]
        yes: bool,
    },
    /// Fetch declared dependencies into vendor/
    Install {
        /// Skip development-only dependencies
        #[arg(long)]
        production: bool,
    },
    /// Refresh installed dependencies
    Update {
        /// Skip development-only dependencies
        #[arg(long)]
        production: bool,
    },
    /// Bundle a script and run it under node
    Run {
        /// Script file to bundle and execute
        file: String,
        /// KEY=VALUE pairs passed as environment variables
        vars: Vec<String>,
        /// Rerun on changes to the script's directory
        #[arg(short, long)]
        watch: bool,
    },
    /// List projects under the current directory
    List,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::InvalidSubcommand | ErrorKind::UnknownArgument
            ) =>
        {
            // Unknown commands fall back to help, like a bare `roll`.
            eprintln!("{err}");
            Cli::command().print_help()?;
            std::process::exit(0);
        }
        Err(err) => err.exit(),
    };

    let level = if cli.quiet {
        "error".to_string()
    } else if cli.verbose {
        "debug".to_string()
    } else {
        cli.log_level.clone()
    };
    let filter = EnvFilter::try_new(&level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let code = match cli.command {
        None => {
            Cli::command().print_help()?;
            0
        }
        Some(Commands::Build { projects }) => {
            commands::build::run(projects).await?;
            0
        }
        Some(Commands::Dev { projects }) => commands::dev::run(projects).await?,
        Some(Commands::Serve { port, dir }) => {
            commands::serve::run(port, dir).await?;
            0
        }
        Some(Commands::Format { projects }) => {
            commands::format::run(projects).await?;
            0
        }
        Some(Commands::Lint { projects }) => {
            commands::lint::run(projects).await?;
            0
        }
        Some(Commands::Archive { yes }) => {
            commands::archive::run(yes).await?;
            0
        }
        Some(Commands::Install { production }) => {
            commands::install::run(production, false).await?;
            0
        }
        Some(Commands::Update { production }) => {
            commands::install::run(production, true).await?;
            0
        }
        Some(Commands::Run { file, vars, watch }) => {
            commands::run::run(file, vars, watch).await?
        }
        Some(Commands::List) => {
            commands::list::run().await?;
            0
        }
    };

    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_subcommands_take_the_help_fallback() {
        let err = Cli::try_parse_from(["roll", "frobnicate"]).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::InvalidSubcommand | ErrorKind::UnknownArgument
        ));
    }

    #[test]
    fn known_subcommands_parse() {
        let cli = Cli::try_parse_from(["roll", "build"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Build { .. })));
    }
}
