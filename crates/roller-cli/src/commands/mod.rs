// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! CLI command implementations.
//!
//! One module per `roll` subcommand:
//!
//! - `build`: one-shot build of the declared tasks
//! - `dev`: watch, rebuild and live-reload
//! - `serve`: static server without watching
//! - `format` / `lint`: batched external formatter and linter
//! - `archive`: package the project as a zip
//! - `install`: fetch declared dependencies into `vendor/`
//! - `run`: bundle and execute a single script
//! - `list`: list projects found under the current directory

/// Zip packaging command.
pub mod archive;
/// One-shot build command.
pub mod build;
/// Dev session command.
pub mod dev;
/// Formatter command.
pub mod format;
/// Dependency install and update commands.
pub mod install;
/// Linter command.
pub mod lint;
/// Project listing command.
pub mod list;
/// Script execution command.
pub mod run;
/// Static server command.
pub mod serve;

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use console::style;
use roller::config::{Config, Mode};
use roller::error::ConfigError;

/// Process exit code for a dev session ended by Ctrl-C.
pub const EXIT_INTERRUPTED: i32 = 130;

/// Resolves the mode for non-dev commands: production unless
/// `ROLLER_ENV=development` says otherwise.
pub fn mode_from_env() -> Mode {
    match std::env::var("ROLLER_ENV").as_deref() {
        Ok("development") | Ok("dev") => Mode::Development,
        _ => Mode::Production,
    }
}

/// Loads the project config, offering to scaffold a starter `roller.toml`
/// when none exists.
pub fn load_or_scaffold(root: &Path) -> anyhow::Result<Config> {
    match Config::load(root) {
        Ok(config) => {
            tracing::debug!(root = %root.display(), tasks = config.build.len(), "configuration loaded");
            Ok(config)
        }
        Err(ConfigError::Missing(path)) => {
            println!(
                "{}",
                style(format!("No {} found in this directory.", roller::config::CONFIG_FILE_NAME))
                    .yellow()
            );
            if confirm("Create a starter config?")? {
                let created = Config::scaffold(root)?;
                println!("Created {}", style(created.display()).bold());
                Ok(Config::load(root)?)
            } else {
                anyhow::bail!("No configuration file found at {}", path.display())
            }
        }
        Err(err) => Err(err.into()),
    }
}

/// Asks a yes/no question on stdin. Defaults to yes on a bare Enter.
pub fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [Y/n] ");
    io::stdout().flush()?;
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;
    let answer = answer.trim().to_lowercase();
    Ok(answer.is_empty() || answer == "y" || answer == "yes")
}

/// The project root for the current invocation.
pub fn project_root() -> anyhow::Result<PathBuf> {
    Ok(std::env::current_dir()?)
}

/// Turns positional project directories into absolute roots; no
/// directories means the current one.
pub fn resolve_projects(projects: Vec<String>) -> anyhow::Result<Vec<PathBuf>> {
    let root = project_root()?;
    if projects.is_empty() {
        Ok(vec![root])
    } else {
        Ok(projects.iter().map(|dir| root.join(dir)).collect())
    }
}
