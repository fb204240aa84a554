// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot build command.

use std::time::Instant;

use console::style;
use roller::orchestrator::run_build;

use super::{load_or_scaffold, mode_from_env, resolve_projects};

/// Runs the build command: every declared task once, concurrently.
///
/// With project directories given, each is built in turn; the current
/// directory otherwise. Per-task failures are logged by the orchestrator
/// and do not fail the command, so partial output always lands.
pub async fn run(projects: Vec<String>) -> anyhow::Result<()> {
    let mode = mode_from_env();
    let roots = resolve_projects(projects)?;
    let multi = roots.len() > 1;

    let start = Instant::now();
    for project in roots {
        if multi {
            println!(
                "{} {}",
                style("Project").cyan(),
                style(project.display()).bold()
            );
        }
        let config = load_or_scaffold(&project)?;
        let report = run_build(&config, mode).await?;
        if report.failed > 0 {
            println!(
                "{}",
                style(format!("{} task(s) failed", report.failed)).red()
            );
        }
    }

    println!(
        "{} in {:.2}s",
        style("Done").green(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}
