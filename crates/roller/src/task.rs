// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Task classification and normalization.
//!
//! A declared task resolves to exactly one [`TaskKind`] before anything is
//! compiled: either from the explicit `task` field or inferred from the
//! source file extension. Tasks that resolve to no kind are reported as
//! unsupported and skipped; their siblings are unaffected.
//!
//! Normalization turns the loose config records into one tagged [`Task`]
//! variant per kind, each carrying only the fields that kind uses, so the
//! runners never re-check optional fields downstream.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use crate::build::TaskContext;
use crate::config::{SrcPatterns, TaskConfig};

/// The category of a task, determining which adapter and runner path
/// handles it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// JavaScript/TypeScript bundling.
    Script,
    /// Sass compilation.
    Style,
    /// HTML rendering with token substitution and reload-client injection.
    Markup,
    /// File copying.
    Copy,
    /// A user-supplied command or build function.
    Custom,
}

impl TaskKind {
    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            TaskKind::Script => "script",
            TaskKind::Style => "style",
            TaskKind::Markup => "markup",
            TaskKind::Copy => "copy",
            TaskKind::Custom => "custom",
        }
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "script" | "js" => Ok(TaskKind::Script),
            "style" | "sass" | "scss" => Ok(TaskKind::Style),
            "markup" | "html" => Ok(TaskKind::Markup),
            "copy" => Ok(TaskKind::Copy),
            "custom" => Ok(TaskKind::Custom),
            other => Err(format!("Unknown task kind: {other}")),
        }
    }
}

/// Resolves the kind of a declared task.
///
/// Explicit `task` values win; an unknown explicit value resolves to
/// nothing rather than falling through to inference. A task carrying a
/// `command` is custom. Otherwise the extension of the first source
/// pattern decides.
pub fn classify(raw: &TaskConfig) -> Option<TaskKind> {
    if let Some(explicit) = &raw.task {
        return explicit.parse().ok();
    }

    if raw.command.is_some() {
        return Some(TaskKind::Custom);
    }

    let src = raw.src.as_ref().and_then(SrcPatterns::first)?;
    match Path::new(src).extension().and_then(|e| e.to_str()) {
        Some("scss") => Some(TaskKind::Style),
        Some("html") => Some(TaskKind::Markup),
        Some("js") | Some("jsx") | Some("ts") | Some("tsx") => Some(TaskKind::Script),
        _ => None,
    }
}

/// Build function of a custom task registered through the library API.
pub type TaskFn = Arc<dyn Fn(&TaskContext) -> anyhow::Result<()> + Send + Sync>;

/// A script bundling task. The first source pattern is the bundle entry.
#[derive(Debug, Clone)]
pub struct ScriptTask {
    pub src: SrcPatterns,
    pub dest: String,
    pub map: Option<bool>,
    pub minify: Option<bool>,
    pub alias: BTreeMap<String, String>,
    pub globals: BTreeMap<String, String>,
    pub jsx: bool,
    pub watch: Vec<String>,
}

/// A style compilation task. The first source pattern is the entry file.
#[derive(Debug, Clone)]
pub struct StyleTask {
    pub src: SrcPatterns,
    pub dest: String,
    pub map: Option<bool>,
    pub minify: Option<bool>,
    pub watch: Vec<String>,
}

/// A markup rendering task.
#[derive(Debug, Clone)]
pub struct MarkupTask {
    pub src: SrcPatterns,
    pub dest: String,
    pub data: toml::Table,
    pub watch: Vec<String>,
}

/// A file copy task.
#[derive(Debug, Clone)]
pub struct CopyTask {
    pub src: SrcPatterns,
    pub dest: String,
    pub watch: Vec<String>,
}

/// A custom task: a shell command from the config, or a build function
/// registered through the library API.
#[derive(Clone)]
pub struct CustomTask {
    pub name: String,
    pub command: Option<String>,
    pub build: Option<TaskFn>,
    pub watch: Vec<String>,
}

impl fmt::Debug for CustomTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomTask")
            .field("name", &self.name)
            .field("command", &self.command)
            .field("build", &self.build.as_ref().map(|_| "fn"))
            .finish()
    }
}

/// A normalized task, one variant per kind.
#[derive(Debug, Clone)]
pub enum Task {
    Script(ScriptTask),
    Style(StyleTask),
    Markup(MarkupTask),
    Copy(CopyTask),
    Custom(CustomTask),
}

impl Task {
    /// The resolved kind.
    pub fn kind(&self) -> TaskKind {
        match self {
            Task::Script(_) => TaskKind::Script,
            Task::Style(_) => TaskKind::Style,
            Task::Markup(_) => TaskKind::Markup,
            Task::Copy(_) => TaskKind::Copy,
            Task::Custom(_) => TaskKind::Custom,
        }
    }

    /// Human-readable label used in logs: the first source pattern.
    pub fn name(&self) -> &str {
        match self {
            Task::Script(t) => t.src.first().unwrap_or(""),
            Task::Style(t) => t.src.first().unwrap_or(""),
            Task::Markup(t) => t.src.first().unwrap_or(""),
            Task::Copy(t) => t.src.first().unwrap_or(""),
            Task::Custom(t) => &t.name,
        }
    }

    /// Patterns the dev watch runner observes for this task: every source
    /// include plus any extra `watch` entries.
    pub fn watch_patterns(&self) -> Vec<String> {
        let (src, extra) = match self {
            Task::Script(t) => (Some(&t.src), &t.watch),
            Task::Style(t) => (Some(&t.src), &t.watch),
            Task::Markup(t) => (Some(&t.src), &t.watch),
            Task::Copy(t) => (Some(&t.src), &t.watch),
            Task::Custom(t) => (None, &t.watch),
        };

        let mut patterns: Vec<String> = src
            .map(|s| s.includes().map(String::from).collect())
            .unwrap_or_default();
        patterns.extend(extra.iter().cloned());
        patterns
    }
}

/// Result of normalizing the declared task list.
#[derive(Debug, Default)]
pub struct Normalized {
    /// Tasks ready to run.
    pub tasks: Vec<Task>,
    /// Labels of tasks with no resolvable kind, in declaration order.
    pub unsupported: Vec<String>,
}

/// Normalizes the declared task list into tagged variants.
///
/// Script, style, markup and copy tasks additionally require `dest` and
/// at least one non-negated `src` pattern; a task missing either is
/// unsupported.
pub fn normalize(declared: &[TaskConfig]) -> Normalized {
    let mut out = Normalized::default();

    for (index, raw) in declared.iter().enumerate() {
        let label = raw
            .task
            .clone()
            .or_else(|| raw.src.as_ref().and_then(SrcPatterns::first).map(String::from))
            .unwrap_or_else(|| format!("#{}", index + 1));

        let Some(kind) = classify(raw) else {
            out.unsupported.push(label);
            continue;
        };

        let task = match kind {
            TaskKind::Custom => Some(Task::Custom(CustomTask {
                name: raw.command.clone().unwrap_or(label.clone()),
                command: raw.command.clone(),
                build: None,
                watch: raw.watch.clone(),
            })),
            _ => {
                match (raw.src.clone(), raw.dest.clone()) {
                    (Some(src), Some(dest)) if src.first().is_some() => Some(match kind {
                        TaskKind::Script => Task::Script(ScriptTask {
                            src,
                            dest,
                            map: raw.map,
                            minify: raw.minify,
                            alias: raw.alias.clone(),
                            globals: raw.globals.clone(),
                            jsx: raw.jsx,
                            watch: raw.watch.clone(),
                        }),
                        TaskKind::Style => Task::Style(StyleTask {
                            src,
                            dest,
                            map: raw.map,
                            minify: raw.minify,
                            watch: raw.watch.clone(),
                        }),
                        TaskKind::Markup => Task::Markup(MarkupTask {
                            src,
                            dest,
                            data: raw.data.clone(),
                            watch: raw.watch.clone(),
                        }),
                        TaskKind::Copy => Task::Copy(CopyTask {
                            src,
                            dest,
                            watch: raw.watch.clone(),
                        }),
                        TaskKind::Custom => unreachable!(),
                    }),
                    _ => None,
                }
            }
        };

        match task {
            Some(task) => out.tasks.push(task),
            None => out.unsupported.push(label),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_src(src: &str) -> TaskConfig {
        TaskConfig {
            src: Some(SrcPatterns::one(src)),
            dest: Some("build/out".to_string()),
            ..TaskConfig::default()
        }
    }

    #[test]
    fn infers_kind_from_extension() {
        assert_eq!(classify(&with_src("a.scss")), Some(TaskKind::Style));
        assert_eq!(classify(&with_src("pages/index.html")), Some(TaskKind::Markup));
        assert_eq!(classify(&with_src("a.js")), Some(TaskKind::Script));
        assert_eq!(classify(&with_src("a.jsx")), Some(TaskKind::Script));
        assert_eq!(classify(&with_src("a.ts")), Some(TaskKind::Script));
        assert_eq!(classify(&with_src("a.tsx")), Some(TaskKind::Script));
    }

    #[test]
    fn classification_uses_the_first_include() {
        let raw = TaskConfig {
            src: Some(SrcPatterns::Many(vec![
                "!src/vendor/**".to_string(),
                "src/index.scss".to_string(),
            ])),
            dest: Some("build/css".to_string()),
            ..TaskConfig::default()
        };
        assert_eq!(classify(&raw), Some(TaskKind::Style));
    }

    #[test]
    fn unknown_extension_resolves_to_nothing() {
        assert_eq!(classify(&with_src("readme.md")), None);
        assert_eq!(classify(&with_src("image.png")), None);
    }

    #[test]
    fn explicit_kind_wins_over_extension() {
        let mut raw = with_src("assets/logo.svg");
        raw.task = Some("copy".to_string());
        assert_eq!(classify(&raw), Some(TaskKind::Copy));
    }

    #[test]
    fn unknown_explicit_kind_is_unsupported() {
        let mut raw = with_src("a.js");
        raw.task = Some("webassembly".to_string());
        assert_eq!(classify(&raw), None);
    }

    #[test]
    fn explicit_aliases() {
        for (name, kind) in [
            ("js", TaskKind::Script),
            ("sass", TaskKind::Style),
            ("html", TaskKind::Markup),
        ] {
            let mut raw = with_src("whatever.bin");
            raw.task = Some(name.to_string());
            assert_eq!(classify(&raw), Some(kind), "alias {name}");
        }
    }

    #[test]
    fn command_implies_custom() {
        let raw = TaskConfig {
            command: Some("make docs".to_string()),
            ..TaskConfig::default()
        };
        assert_eq!(classify(&raw), Some(TaskKind::Custom));
    }

    #[test]
    fn normalize_counts_unsupported() {
        let declared = vec![
            with_src("src/index.js"),
            with_src("notes.txt"),
            with_src("src/index.scss"),
            TaskConfig {
                task: Some("quantum".to_string()),
                ..with_src("a.js")
            },
        ];

        let normalized = normalize(&declared);
        assert_eq!(normalized.tasks.len(), 2);
        assert_eq!(normalized.unsupported.len(), 2);
        assert_eq!(normalized.unsupported[0], "notes.txt");
        assert_eq!(normalized.unsupported[1], "quantum");
    }

    #[test]
    fn normalize_requires_src_and_dest() {
        let declared = vec![TaskConfig {
            src: Some(SrcPatterns::one("src/index.js")),
            dest: None,
            ..TaskConfig::default()
        }];

        let normalized = normalize(&declared);
        assert!(normalized.tasks.is_empty());
        assert_eq!(normalized.unsupported.len(), 1);
    }

    #[test]
    fn src_with_only_exclusions_is_unsupported() {
        let declared = vec![TaskConfig {
            task: Some("copy".to_string()),
            src: Some(SrcPatterns::Many(vec!["!assets/raw/**".to_string()])),
            dest: Some("build/assets".to_string()),
            ..TaskConfig::default()
        }];

        let normalized = normalize(&declared);
        assert!(normalized.tasks.is_empty());
        assert_eq!(normalized.unsupported.len(), 1);
    }

    #[test]
    fn normalized_variants_carry_their_fields() {
        let mut raw = with_src("src/page.html");
        raw.data.insert("title".into(), toml::Value::String("T".into()));

        let normalized = normalize(&[raw]);
        match &normalized.tasks[0] {
            Task::Markup(markup) => {
                assert_eq!(markup.src, SrcPatterns::one("src/page.html"));
                assert_eq!(markup.data.len(), 1);
            }
            other => panic!("expected markup task, got {other:?}"),
        }
    }

    #[test]
    fn watch_patterns_include_src_and_extras() {
        let mut raw = with_src("src/index.scss");
        raw.watch = vec!["src/components/**/*.scss".to_string()];

        let normalized = normalize(&[raw]);
        let patterns = normalized.tasks[0].watch_patterns();
        assert_eq!(
            patterns,
            vec![
                "src/index.scss".to_string(),
                "src/components/**/*.scss".to_string()
            ]
        );
    }
}
