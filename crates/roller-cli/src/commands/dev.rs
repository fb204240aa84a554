// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dev session command: watch, rebuild, live reload.

use console::style;
use roller::orchestrator::run_dev;
use tokio::task::JoinSet;

use super::{load_or_scaffold, resolve_projects, EXIT_INTERRUPTED};

/// Runs the dev command until Ctrl-C.
///
/// With project directories given, every listed project runs its own
/// session concurrently, each with its own reload port. Returns the
/// process exit code: 130 when interrupted, matching shell convention
/// for SIGINT.
pub async fn run(projects: Vec<String>) -> anyhow::Result<i32> {
    let roots = resolve_projects(projects)?;

    let mut configs = Vec::new();
    for project in roots {
        configs.push(load_or_scaffold(&project)?);
    }

    println!("{}", style("Starting dev session").cyan());

    let mut sessions = JoinSet::new();
    for config in configs {
        sessions.spawn(async move { run_dev(&config).await });
    }

    let mut interrupted = false;
    while let Some(joined) = sessions.join_next().await {
        match joined {
            Ok(Ok(report)) => interrupted |= report.interrupted,
            Ok(Err(err)) => return Err(err.into()),
            Err(err) => return Err(err.into()),
        }
    }

    if interrupted {
        println!("{}", style("Stopped").dim());
        return Ok(EXIT_INTERRUPTED);
    }
    Ok(0)
}
