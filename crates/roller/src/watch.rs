// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-task watch loop for dev sessions.
//!
//! Each task gets its own loop: build once, then rebuild on debounced
//! file events until shutdown. The first round only signals readiness;
//! later successful rounds notify the reload coordinator. A failing
//! round leaves the loop alive, so the next save retries.

use std::time::Duration;

use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebouncedEvent};

use crate::build::{self, run_once, TaskContext};
use crate::error::WatchError;
use crate::reload::Notification;
use crate::task::{Task, TaskKind};
use crate::util;

/// Lifecycle of one watched task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchState {
    /// Waiting for the initial round.
    Idle,
    /// A round is running.
    Building,
    /// Last round succeeded.
    Ready,
    /// Last round failed; waiting for the next change.
    Failed,
}

/// Maps a finished round to the next state.
pub fn after_round(succeeded: bool) -> WatchState {
    if succeeded {
        WatchState::Ready
    } else {
        WatchState::Failed
    }
}

/// What to tell browsers after a successful round. The first round is
/// silent since no browser is connected before the server starts. Style
/// rounds swap stylesheets in place; everything else is a full reload.
pub fn notification_for(kind: TaskKind, first_round: bool) -> Option<Notification> {
    if first_round {
        return None;
    }
    match kind {
        TaskKind::Style => Some(Notification::RefreshCss),
        _ => Some(Notification::Reload),
    }
}

/// Runs one task's watch loop until `shutdown` flips.
///
/// `first_round` fires after the initial round regardless of its outcome,
/// so the orchestrator's startup gate never hangs on a broken source
/// file.
pub async fn watch_task(
    task: Task,
    ctx: std::sync::Arc<TaskContext>,
    first_round: tokio::sync::oneshot::Sender<()>,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
) -> Result<(), WatchError> {
    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<()>(16);

    // The debouncer calls back on its own thread; forward into the async
    // loop with a blocking send.
    let mut debouncer = new_debouncer(
        Duration::from_millis(250),
        None,
        move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| {
            if let Ok(events) = result {
                if !events.is_empty() {
                    let _ = event_tx.blocking_send(());
                }
            }
        },
    )?;

    for pattern in task.watch_patterns() {
        let joined = ctx.root.join(&pattern);
        let watch_root = util::glob_static_root(&joined.to_string_lossy());
        if watch_root.exists() {
            debouncer.watch(&watch_root, RecursiveMode::Recursive)?;
        } else {
            tracing::warn!(task = task.name(), path = %watch_root.display(), "watch path does not exist");
        }
    }

    let mut state = WatchState::Idle;
    tracing::debug!(task = task.name(), ?state, "watch loop started");
    let mut first = Some(first_round);

    loop {
        state = WatchState::Building;
        tracing::debug!(task = task.name(), ?state, "round started");

        let is_first = first.is_some();
        match run_once(&task, &ctx).await {
            Ok(summary) => {
                state = after_round(true);
                build::log_summary(&task, &summary);
                if let Some(notification) = notification_for(task.kind(), is_first) {
                    match notification {
                        Notification::Reload => ctx.reloader.reload(),
                        Notification::RefreshCss => ctx.reloader.reload_css(),
                    }
                }
            }
            Err(err) => {
                state = after_round(false);
                eprintln!("{}", build::format_error(&task, &err, &ctx.root));
            }
        }
        tracing::debug!(task = task.name(), ?state, "round finished");

        if let Some(sender) = first.take() {
            let _ = sender.send(());
        }

        tokio::select! {
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
            received = event_rx.recv() => {
                if received.is_none() {
                    break;
                }
                // Fold events that piled up during the round into one.
                while event_rx.try_recv().is_ok() {}
            }
        }
    }

    drop(debouncer);
    Ok(())
}
