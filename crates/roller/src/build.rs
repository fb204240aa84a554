// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single build rounds.
//!
//! [`run_once`] executes one task one time: compile, render, copy or run,
//! returning a summary or a per-task error. It has no knowledge of
//! fan-out or watching; the orchestrator and the watch runner both call
//! it, which keeps one-shot and incremental builds behaviorally
//! identical.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use console::style;

use crate::config::{Mode, SrcPatterns};
use crate::engine::{BuildSummary, Engine};
use crate::error::BuildError;
use crate::reload::Reloader;
use crate::spec::{script_spec, style_spec};
use crate::task::{CopyTask, CustomTask, MarkupTask, Task};
use crate::util;

/// Everything a build round needs. Shared across tasks and rounds.
pub struct TaskContext {
    pub root: PathBuf,
    pub mode: Mode,
    pub engine: Arc<dyn Engine>,
    pub reloader: Reloader,
}

/// Runs one task once.
pub async fn run_once(task: &Task, ctx: &TaskContext) -> Result<BuildSummary, BuildError> {
    match task {
        Task::Script(t) => compile(ctx, script_spec(ctx.mode, t)).await,
        Task::Style(t) => compile(ctx, style_spec(ctx.mode, t)).await,
        Task::Markup(t) => render_markup(t, ctx),
        Task::Copy(t) => copy_files(t, ctx),
        Task::Custom(t) => run_custom(t, ctx).await,
    }
}

/// Engine calls block on a child process, so they run off the async
/// runtime.
async fn compile(
    ctx: &TaskContext,
    spec: crate::spec::CompileSpec,
) -> Result<BuildSummary, BuildError> {
    let engine = Arc::clone(&ctx.engine);
    let summary = tokio::task::spawn_blocking(move || engine.compile(&spec))
        .await
        .map_err(|_| BuildError::Cancelled)??;
    Ok(summary)
}

/// Compiled `!` exclusions of a pattern set, matched against paths
/// relative to the project root.
fn compile_negations(src: &SrcPatterns) -> Result<Vec<glob::Pattern>, BuildError> {
    Ok(src
        .negations()
        .map(glob::Pattern::new)
        .collect::<Result<_, _>>()?)
}

fn excluded(source: &Path, root: &Path, negations: &[glob::Pattern]) -> bool {
    let relative = source.strip_prefix(root).unwrap_or(source);
    negations.iter().any(|pattern| pattern.matches_path(relative))
}

/// Renders markup files: expand the source patterns, substitute `%key%`
/// tokens from the task data and, in a live session, inject the reload
/// client before `</body>`.
fn render_markup(task: &MarkupTask, ctx: &TaskContext) -> Result<BuildSummary, BuildError> {
    let start = Instant::now();
    let single_file_dest = util::dest_is_file(&task.dest);
    let client = ctx.reloader.client_script();
    let negations = compile_negations(&task.src)?;

    let mut outputs = Vec::new();
    let mut bytes = 0u64;

    for pattern in task.src.includes() {
        let full = ctx.root.join(pattern);
        let static_root = util::glob_static_root(&full.to_string_lossy());

        for entry in glob::glob(&full.to_string_lossy())? {
            let source = entry?;
            if !source.is_file() || excluded(&source, &ctx.root, &negations) {
                continue;
            }

            let mut html = std::fs::read_to_string(&source)?;
            html = util::substitute_tokens(&html, &task.data);
            if let Some(client) = &client {
                html = util::inject_before_body_end(&html, client);
            }

            let dest = if single_file_dest {
                ctx.root.join(&task.dest)
            } else {
                let relative = source.strip_prefix(&static_root).unwrap_or(&source);
                ctx.root.join(&task.dest).join(relative)
            };

            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&dest, &html)?;

            bytes += html.len() as u64;
            outputs.push(dest);
        }
    }

    Ok(BuildSummary {
        outputs,
        duration: start.elapsed(),
        bytes,
    })
}

/// Copies directory trees or glob expansions into the destination,
/// preserving paths relative to each pattern's static prefix. `!`
/// exclusions apply to both forms.
fn copy_files(task: &CopyTask, ctx: &TaskContext) -> Result<BuildSummary, BuildError> {
    let start = Instant::now();
    let dest = ctx.root.join(&task.dest);
    let negations = compile_negations(&task.src)?;

    let mut outputs = Vec::new();
    let mut bytes = 0u64;

    for pattern in task.src.includes() {
        let src = ctx.root.join(pattern);

        if src.is_dir() {
            copy_tree(&src, &dest, ctx, &negations, &mut outputs, &mut bytes)?;
            continue;
        }

        let static_root = util::glob_static_root(&src.to_string_lossy());
        let single_file_dest = util::dest_is_file(&task.dest);

        for entry in glob::glob(&src.to_string_lossy())? {
            let source = entry?;
            if !source.is_file() || excluded(&source, &ctx.root, &negations) {
                continue;
            }

            let target = if single_file_dest {
                dest.clone()
            } else {
                let relative = source.strip_prefix(&static_root).unwrap_or(&source);
                dest.join(relative)
            };

            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            bytes += std::fs::copy(&source, &target)?;
            outputs.push(target);
        }
    }

    Ok(BuildSummary {
        outputs,
        duration: start.elapsed(),
        bytes,
    })
}

fn copy_tree(
    from: &Path,
    to: &Path,
    ctx: &TaskContext,
    negations: &[glob::Pattern],
    outputs: &mut Vec<PathBuf>,
    bytes: &mut u64,
) -> Result<(), BuildError> {
    std::fs::create_dir_all(to)?;
    for entry in std::fs::read_dir(from)? {
        let entry = entry?;
        let target = to.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_tree(&entry.path(), &target, ctx, negations, outputs, bytes)?;
        } else if !excluded(&entry.path(), &ctx.root, negations) {
            *bytes += std::fs::copy(entry.path(), &target)?;
            outputs.push(target);
        }
    }
    Ok(())
}

/// Runs a custom task: its registered build function, or its shell
/// command with the project root as working directory.
async fn run_custom(task: &CustomTask, ctx: &TaskContext) -> Result<BuildSummary, BuildError> {
    let start = Instant::now();

    if let Some(build) = &task.build {
        build(ctx).map_err(BuildError::Custom)?;
    } else if let Some(command) = &task.command {
        let status = tokio::process::Command::new("sh")
            .args(["-c", command])
            .current_dir(&ctx.root)
            .status()
            .await?;

        if !status.success() {
            return Err(BuildError::CustomCommand {
                name: task.name.clone(),
                code: status.code(),
            });
        }
    }

    Ok(BuildSummary {
        outputs: Vec::new(),
        duration: start.elapsed(),
        bytes: 0,
    })
}

/// One console line per successful round, e.g.
/// `Built src/index.scss (4.2kB) in 0.31s`.
pub fn log_summary(task: &Task, summary: &BuildSummary) {
    println!(
        "{} {} {} in {:.2}s",
        style("Built").green(),
        style(task.name()).bold(),
        style(format!("({})", util::human_size(summary.bytes))).dim(),
        summary.duration.as_secs_f64()
    );
}

/// One console line per failed round, with tool attribution kept and
/// absolute project paths shortened.
pub fn format_error(task: &Task, err: &BuildError, root: &Path) -> String {
    format!(
        "{} {}: {}",
        style("Failed").red(),
        style(task.name()).bold(),
        util::relativize(root, &err.to_string())
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ServeConfig, TaskConfig};
    use crate::error::EngineError;
    use crate::spec::CompileSpec;
    use crate::task::{normalize, TaskFn};
    use std::fs;

    struct NullEngine;

    impl Engine for NullEngine {
        fn compile(&self, _spec: &CompileSpec) -> Result<BuildSummary, EngineError> {
            Ok(BuildSummary {
                outputs: Vec::new(),
                duration: std::time::Duration::ZERO,
                bytes: 0,
            })
        }
    }

    fn context(root: &Path) -> TaskContext {
        TaskContext {
            root: root.to_path_buf(),
            mode: Mode::Development,
            engine: Arc::new(NullEngine),
            reloader: Reloader::disabled(),
        }
    }

    fn markup_task(src: &str, dest: &str, data: toml::Table) -> Task {
        normalize(&[TaskConfig {
            src: Some(SrcPatterns::one(src)),
            dest: Some(dest.to_string()),
            data,
            ..TaskConfig::default()
        }])
        .tasks
        .remove(0)
    }

    #[tokio::test]
    async fn markup_substitutes_tokens() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/index.html"),
            "<html><body><h1>%title%</h1></body></html>",
        )
        .unwrap();

        let mut data = toml::Table::new();
        data.insert("title".into(), toml::Value::String("Hello".into()));
        let task = markup_task("src/*.html", "build", data);

        let summary = run_once(&task, &context(dir.path())).await.unwrap();
        assert_eq!(summary.outputs.len(), 1);

        let rendered = fs::read_to_string(dir.path().join("build/index.html")).unwrap();
        assert!(rendered.contains("<h1>Hello</h1>"));
        assert!(!rendered.contains("%title%"));
        assert!(!rendered.contains("<script>"));
    }

    #[tokio::test]
    async fn markup_injects_the_reload_client_when_live() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(
            dir.path().join("src/index.html"),
            "<html><body>hi</body></html>",
        )
        .unwrap();

        let task = markup_task("src/*.html", "build", toml::Table::new());

        let mut config = Config::default();
        config.serve = Some(ServeConfig::default());
        let reloader = Reloader::new(&config, std::slice::from_ref(&task)).unwrap();

        let mut ctx = context(dir.path());
        ctx.reloader = reloader;

        run_once(&task, &ctx).await.unwrap();

        let rendered = fs::read_to_string(dir.path().join("build/index.html")).unwrap();
        let script_at = rendered.find("<script>").unwrap();
        let body_end = rendered.find("</body>").unwrap();
        assert!(script_at < body_end);
    }

    #[tokio::test]
    async fn markup_single_file_dest_writes_directly() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/page.html"), "<body></body>").unwrap();

        let task = markup_task("src/page.html", "build/out.html", toml::Table::new());
        run_once(&task, &context(dir.path())).await.unwrap();

        assert!(dir.path().join("build/out.html").is_file());
    }

    #[tokio::test]
    async fn copy_mirrors_glob_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets/img")).unwrap();
        fs::write(dir.path().join("assets/a.txt"), "a").unwrap();
        fs::write(dir.path().join("assets/img/b.txt"), "bb").unwrap();

        let task = normalize(&[TaskConfig {
            task: Some("copy".to_string()),
            src: Some(SrcPatterns::one("assets/**/*.txt")),
            dest: Some("build/assets".to_string()),
            ..TaskConfig::default()
        }])
        .tasks
        .remove(0);

        let summary = run_once(&task, &context(dir.path())).await.unwrap();
        assert_eq!(summary.outputs.len(), 2);
        assert_eq!(summary.bytes, 3);
        assert!(dir.path().join("build/assets/a.txt").is_file());
        assert!(dir.path().join("build/assets/img/b.txt").is_file());
    }

    #[tokio::test]
    async fn copy_handles_a_whole_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("static/fonts")).unwrap();
        fs::write(dir.path().join("static/fonts/x.woff"), "x").unwrap();

        let task = normalize(&[TaskConfig {
            task: Some("copy".to_string()),
            src: Some(SrcPatterns::one("static")),
            dest: Some("build/static".to_string()),
            ..TaskConfig::default()
        }])
        .tasks
        .remove(0);

        run_once(&task, &context(dir.path())).await.unwrap();
        assert!(dir.path().join("build/static/fonts/x.woff").is_file());
    }

    #[tokio::test]
    async fn negated_patterns_exclude_their_matches() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("assets/raw")).unwrap();
        fs::write(dir.path().join("assets/keep.txt"), "k").unwrap();
        fs::write(dir.path().join("assets/skip.txt"), "s").unwrap();
        fs::write(dir.path().join("assets/raw/big.txt"), "b").unwrap();

        let task = normalize(&[TaskConfig {
            task: Some("copy".to_string()),
            src: Some(SrcPatterns::Many(vec![
                "assets/**/*.txt".to_string(),
                "!assets/skip.txt".to_string(),
                "!assets/raw/**".to_string(),
            ])),
            dest: Some("build/assets".to_string()),
            ..TaskConfig::default()
        }])
        .tasks
        .remove(0);

        let summary = run_once(&task, &context(dir.path())).await.unwrap();
        assert_eq!(summary.outputs.len(), 1);
        assert!(dir.path().join("build/assets/keep.txt").is_file());
        assert!(!dir.path().join("build/assets/skip.txt").exists());
        assert!(!dir.path().join("build/assets/raw/big.txt").exists());
    }

    #[tokio::test]
    async fn markup_accepts_multiple_source_patterns() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();
        fs::create_dir_all(dir.path().join("pages")).unwrap();
        fs::write(dir.path().join("src/a.html"), "<body>a</body>").unwrap();
        fs::write(dir.path().join("pages/b.html"), "<body>b</body>").unwrap();

        let task = normalize(&[TaskConfig {
            src: Some(SrcPatterns::Many(vec![
                "src/a.html".to_string(),
                "pages/b.html".to_string(),
            ])),
            dest: Some("build".to_string()),
            ..TaskConfig::default()
        }])
        .tasks
        .remove(0);

        let summary = run_once(&task, &context(dir.path())).await.unwrap();
        assert_eq!(summary.outputs.len(), 2);
        assert!(dir.path().join("build/a.html").is_file());
        assert!(dir.path().join("build/b.html").is_file());
    }

    #[tokio::test]
    async fn custom_command_exit_code_is_surfaced() {
        let dir = tempfile::tempdir().unwrap();
        let task = normalize(&[TaskConfig {
            command: Some("exit 3".to_string()),
            ..TaskConfig::default()
        }])
        .tasks
        .remove(0);

        match run_once(&task, &context(dir.path())).await {
            Err(BuildError::CustomCommand { code, .. }) => assert_eq!(code, Some(3)),
            other => panic!("expected command failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn custom_build_function_runs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let build: TaskFn = Arc::new(move |ctx: &TaskContext| {
            fs::write(ctx.root.join("made-by-fn"), "ok")?;
            Ok(())
        });

        let task = Task::Custom(crate::task::CustomTask {
            name: "stamp".to_string(),
            command: None,
            build: Some(build),
            watch: Vec::new(),
        });

        run_once(&task, &context(&root)).await.unwrap();
        assert!(root.join("made-by-fn").is_file());
    }

    #[tokio::test]
    async fn failing_engine_error_keeps_tool_prefix() {
        let dir = tempfile::tempdir().unwrap();

        struct FailingEngine;
        impl Engine for FailingEngine {
            fn compile(&self, _spec: &CompileSpec) -> Result<BuildSummary, EngineError> {
                Err(EngineError::Failed {
                    tool: "sass".to_string(),
                    detail: "Undefined variable".to_string(),
                })
            }
        }

        let task = normalize(&[TaskConfig {
            src: Some(SrcPatterns::one("src/index.scss")),
            dest: Some("build/css".to_string()),
            ..TaskConfig::default()
        }])
        .tasks
        .remove(0);

        let mut ctx = context(dir.path());
        ctx.engine = Arc::new(FailingEngine);

        let err = run_once(&task, &ctx).await.unwrap_err();
        assert!(err.to_string().contains("[sass] Undefined variable"));

        let line = format_error(&task, &err, dir.path());
        assert!(line.contains("src/index.scss"));
    }
}
