// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Script execution command: bundle one file and run it under node.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use console::style;
use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebouncedEvent};
use roller::config::{Mode, SrcPatterns};
use roller::engine::{Engine, ToolEngine};
use roller::spec::script_spec;
use roller::task::ScriptTask;
use roller::util;

use super::{load_or_scaffold, project_root};

/// Runs the run command: bundle `file` into a scratch directory, execute
/// it with node, and propagate node's exit code. `vars` are `KEY=VALUE`
/// pairs passed through as environment variables. With `watch` the
/// bundle-and-run cycle repeats on every change to the file's directory.
pub async fn run(file: String, vars: Vec<String>, watch: bool) -> anyhow::Result<i32> {
    let root = project_root()?;
    let config = load_or_scaffold(&root)?;

    let env = parse_vars(&vars)?;
    let engine = Arc::new(ToolEngine::new(&root, &config.tools));
    let scratch = tempfile::tempdir()?;
    let bundle = scratch.path().join("bundle.js");

    if !watch {
        return cycle(&root, &engine, &file, &bundle, &env).await;
    }

    let (event_tx, mut event_rx) = tokio::sync::mpsc::channel::<()>(16);
    let mut debouncer = new_debouncer(
        Duration::from_millis(250),
        None,
        move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| {
            if matches!(&result, Ok(events) if !events.is_empty()) {
                let _ = event_tx.blocking_send(());
            }
        },
    )?;
    // For a concrete file this is its parent directory.
    let watch_root = util::glob_static_root(&root.join(&file).to_string_lossy());
    debouncer.watch(&watch_root, RecursiveMode::Recursive)?;

    loop {
        let code = cycle(&root, &engine, &file, &bundle, &env).await?;
        if code != 0 {
            println!("{}", style(format!("..Exited with code {code}")).yellow());
        }
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                return Ok(0);
            }
            received = event_rx.recv() => {
                if received.is_none() {
                    return Ok(0);
                }
                while event_rx.try_recv().is_ok() {}
                println!("{}", style("..Rerunning").dim());
            }
        }
    }
}

/// One bundle-and-execute cycle.
async fn cycle(
    root: &Path,
    engine: &Arc<ToolEngine>,
    file: &str,
    bundle: &Path,
    env: &BTreeMap<String, String>,
) -> anyhow::Result<i32> {
    let task = ScriptTask {
        src: SrcPatterns::one(file),
        dest: bundle.to_string_lossy().into_owned(),
        map: Some(false),
        minify: Some(false),
        alias: BTreeMap::new(),
        globals: BTreeMap::new(),
        jsx: false,
        watch: Vec::new(),
    };
    let spec = script_spec(Mode::Development, &task);

    let engine = Arc::clone(engine);
    tokio::task::spawn_blocking(move || engine.compile(&spec)).await??;

    let status = tokio::process::Command::new("node")
        .arg(bundle)
        .current_dir(root)
        .envs(env)
        .status()
        .await?;

    Ok(status.code().unwrap_or(1))
}

fn parse_vars(vars: &[String]) -> anyhow::Result<BTreeMap<String, String>> {
    let mut env = BTreeMap::new();
    for var in vars {
        let Some((key, value)) = var.split_once('=') else {
            anyhow::bail!("expected KEY=VALUE, got `{var}`");
        };
        env.insert(key.to_string(), value.to_string());
    }
    Ok(env)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vars_parse_into_env_pairs() {
        let env = parse_vars(&["A=1".to_string(), "NAME=roller".to_string()]).unwrap();
        assert_eq!(env.get("A").map(String::as_str), Some("1"));
        assert_eq!(env.get("NAME").map(String::as_str), Some("roller"));
    }

    #[test]
    fn malformed_vars_are_rejected() {
        assert!(parse_vars(&["NOEQUALS".to_string()]).is_err());
    }

    #[test]
    fn values_may_contain_equals_signs() {
        let env = parse_vars(&["URL=a=b".to_string()]).unwrap();
        assert_eq!(env.get("URL").map(String::as_str), Some("a=b"));
    }
}
