// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Linter command: same batching as `format`, but with the check-only
//! tool command, and failures fail the command.

use console::style;

use super::format::run_batched_tool;
use super::load_or_scaffold;

/// Runs the lint command over the `lint` patterns, per project.
pub async fn run(projects: Vec<String>) -> anyhow::Result<()> {
    let mut total_failures = 0;
    for project in super::resolve_projects(projects)? {
        let config = load_or_scaffold(&project)?;
        if config.lint.is_empty() {
            println!("{}", style("No lint patterns configured").yellow());
            continue;
        }
        total_failures +=
            run_batched_tool(&project, &config.tools.lint_command, &config.lint).await?;
    }

    if total_failures > 0 {
        anyhow::bail!("lint found problems in {total_failures} batch(es)");
    }
    println!("{}", style("Lint clean").green());
    Ok(())
}
