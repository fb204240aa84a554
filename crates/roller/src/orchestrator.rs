// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Build orchestration.
//!
//! Two entry points: [`run_build`] fans the declared tasks out once and
//! joins them, [`run_dev`] keeps them running under watch with live
//! reload and the static server. Task failures are contained at this
//! boundary; a broken task never takes its siblings down.
//!
//! Tasks writing to overlapping destinations are not detected; with
//! concurrent rounds the last write wins.

use std::sync::Arc;

use console::style;
use tokio::task::JoinSet;

use crate::build::{self, run_once, TaskContext};
use crate::config::{Config, Mode};
use crate::engine::ToolEngine;
use crate::error::RollerError;
use crate::reload::Reloader;
use crate::serve;
use crate::task::{normalize, Normalized, Task};
use crate::watch::watch_task;

/// What a run did, for the CLI's exit-code decision.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunReport {
    /// Tasks whose round succeeded (one-shot) or that were watched (dev).
    pub completed: usize,
    /// Tasks whose round failed.
    pub failed: usize,
    /// Declared tasks with no resolvable kind, skipped.
    pub unsupported: usize,
    /// True when a dev session ended on Ctrl-C.
    pub interrupted: bool,
}

/// `live` is true only for the dev watch session; one-shot builds get a
/// disabled reloader regardless of mode.
fn prepare(
    config: &Config,
    mode: Mode,
    live: bool,
) -> Result<(Normalized, Arc<TaskContext>), RollerError> {
    let normalized = normalize(&config.build);
    for label in &normalized.unsupported {
        println!(
            "{}",
            style(format!("Task type \"{label}\" not supported")).yellow()
        );
    }

    let reloader = if live {
        Reloader::new(config, &normalized.tasks)?
    } else {
        Reloader::disabled()
    };
    let ctx = Arc::new(TaskContext {
        root: config.root.clone(),
        mode,
        engine: Arc::new(ToolEngine::new(&config.root, &config.tools)),
        reloader,
    });

    Ok((normalized, ctx))
}

/// Runs every declared task once, concurrently, and joins them.
///
/// A failing task is logged and counted; the run itself still succeeds so
/// sibling outputs land on disk.
pub async fn run_build(config: &Config, mode: Mode) -> Result<RunReport, RollerError> {
    let (normalized, ctx) = prepare(config, mode, false)?;
    let mut report = RunReport {
        unsupported: normalized.unsupported.len(),
        ..RunReport::default()
    };

    let mut rounds = JoinSet::new();
    for task in normalized.tasks {
        let ctx = Arc::clone(&ctx);
        rounds.spawn(async move {
            let outcome = run_once(&task, &ctx).await;
            (task, outcome)
        });
    }

    while let Some(joined) = rounds.join_next().await {
        let Ok((task, outcome)) = joined else {
            report.failed += 1;
            continue;
        };
        match outcome {
            Ok(summary) => {
                build::log_summary(&task, &summary);
                report.completed += 1;
            }
            Err(err) => {
                eprintln!("{}", build::format_error(&task, &err, &ctx.root));
                report.failed += 1;
            }
        }
    }

    Ok(report)
}

/// Runs a dev session: every task under watch, live reload, and the
/// static server once all first rounds have finished.
///
/// First rounds gate server startup so the initial page load never sees a
/// half-built output directory. The session runs until Ctrl-C.
pub async fn run_dev(config: &Config) -> Result<RunReport, RollerError> {
    let mode = Mode::Development;
    let (normalized, ctx) = prepare(config, mode, true)?;
    let mut report = RunReport {
        unsupported: normalized.unsupported.len(),
        ..RunReport::default()
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let mut watchers = JoinSet::new();
    let mut first_rounds = Vec::new();

    for task in normalized.tasks {
        let (first_tx, first_rx) = tokio::sync::oneshot::channel();
        first_rounds.push((task.name().to_string(), first_rx));
        watchers.spawn(watch_task(
            task,
            Arc::clone(&ctx),
            first_tx,
            shutdown_rx.clone(),
        ));
        report.completed += 1;
    }

    for (name, first_rx) in first_rounds {
        if first_rx.await.is_err() {
            tracing::warn!(task = %name, "watch loop ended before its first round");
        }
    }

    ctx.reloader.start_server().await?;
    if let Some(serve_config) = &config.serve {
        serve::start(&config.root, serve_config).await?;
    }

    if tokio::signal::ctrl_c().await.is_ok() {
        println!();
        report.interrupted = true;
    }

    let _ = shutdown_tx.send(true);
    while let Some(joined) = watchers.join_next().await {
        if let Ok(Err(err)) = joined {
            tracing::error!("watch loop failed: {err}");
        }
    }

    Ok(report)
}
