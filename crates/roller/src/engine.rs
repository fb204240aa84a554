// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! External compile engine.
//!
//! Script and style tasks delegate to standalone tool binaries (esbuild
//! and dart-sass) rather than compiling in-process. The engine turns a
//! [`CompileSpec`] into one child-process invocation, blocking until the
//! tool exits. Callers run it through `spawn_blocking`; nothing here
//! touches the async runtime.

use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

use crate::config::ToolsConfig;
use crate::error::EngineError;
use crate::spec::CompileSpec;

/// Which external tool a compile spec targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    /// esbuild, for script bundling.
    Bundler,
    /// dart-sass, for style compilation.
    Styles,
}

impl Tool {
    /// Binary name looked up on `PATH` when no override is configured.
    pub fn binary_name(self) -> &'static str {
        match self {
            Tool::Bundler => "esbuild",
            Tool::Styles => "sass",
        }
    }
}

/// Outcome of one successful compilation.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    /// Primary output files written, as configured (not canonicalized).
    pub outputs: Vec<PathBuf>,
    /// Wall-clock time of the tool invocation.
    pub duration: Duration,
    /// Total size of the outputs.
    pub bytes: u64,
}

/// Runs compilations. The seam exists so build logic can be tested
/// without the tool binaries installed.
pub trait Engine: Send + Sync {
    fn compile(&self, spec: &CompileSpec) -> Result<BuildSummary, EngineError>;
}

/// The real engine: spawns the configured (or `PATH`-resolved) tool
/// binaries from the project root.
pub struct ToolEngine {
    root: PathBuf,
    bundler: PathBuf,
    styles: PathBuf,
}

impl ToolEngine {
    pub fn new(root: &Path, tools: &ToolsConfig) -> Self {
        Self {
            root: root.to_path_buf(),
            bundler: tools
                .bundler
                .clone()
                .unwrap_or_else(|| PathBuf::from(Tool::Bundler.binary_name())),
            styles: tools
                .styles
                .clone()
                .unwrap_or_else(|| PathBuf::from(Tool::Styles.binary_name())),
        }
    }

    fn program(&self, tool: Tool) -> &Path {
        match tool {
            Tool::Bundler => &self.bundler,
            Tool::Styles => &self.styles,
        }
    }

    fn bundler_args(spec: &CompileSpec) -> Vec<String> {
        let mut args = vec![
            spec.input.entry.to_string_lossy().into_owned(),
            "--bundle".to_string(),
        ];

        if spec.output.dir_fanout {
            args.push(format!("--outdir={}", spec.output.dest.display()));
        } else {
            args.push(format!("--outfile={}", spec.output.dest.display()));
        }

        if spec.minify {
            args.push("--minify".to_string());
        }
        if spec.output.source_map {
            args.push("--sourcemap".to_string());
        }

        for stage in &spec.stages {
            args.extend(stage.args.iter().cloned());
        }

        args
    }

    fn styles_args(spec: &CompileSpec) -> Vec<String> {
        let entry = &spec.input.entry;
        let out = if spec.output.dir_fanout {
            spec.output.dest.join(css_name(entry))
        } else {
            spec.output.dest.clone()
        };

        let mut args = vec![
            entry.to_string_lossy().into_owned(),
            out.to_string_lossy().into_owned(),
        ];

        if spec.minify {
            args.push("--style=compressed".to_string());
        }
        if !spec.output.source_map {
            args.push("--no-source-map".to_string());
        }

        args
    }

    /// The files an invocation is expected to produce, relative to the
    /// project root. Sizes are summed from these after the tool exits.
    fn expected_outputs(spec: &CompileSpec) -> Vec<PathBuf> {
        if !spec.output.dir_fanout {
            return vec![spec.output.dest.clone()];
        }

        let name = match spec.tool {
            Tool::Bundler => js_name(&spec.input.entry),
            Tool::Styles => css_name(&spec.input.entry),
        };
        vec![spec.output.dest.join(name)]
    }
}

fn stem(entry: &Path) -> String {
    entry
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "out".to_string())
}

fn js_name(entry: &Path) -> String {
    format!("{}.js", stem(entry))
}

fn css_name(entry: &Path) -> String {
    format!("{}.css", stem(entry))
}

impl Engine for ToolEngine {
    fn compile(&self, spec: &CompileSpec) -> Result<BuildSummary, EngineError> {
        let program = self.program(spec.tool);
        let args = match spec.tool {
            Tool::Bundler => Self::bundler_args(spec),
            Tool::Styles => Self::styles_args(spec),
        };

        if let Some(parent) = spec.output.dest.parent() {
            std::fs::create_dir_all(self.root.join(parent))?;
        }
        if spec.output.dir_fanout {
            std::fs::create_dir_all(self.root.join(&spec.output.dest))?;
        }

        let start = Instant::now();
        let output = Command::new(program)
            .args(&args)
            .current_dir(&self.root)
            .output()
            .map_err(|source| EngineError::ToolMissing {
                tool: program.display().to_string(),
                source,
            })?;
        let duration = start.elapsed();

        if !output.status.success() {
            return Err(EngineError::Failed {
                tool: spec.tool.binary_name().to_string(),
                detail: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        if !output.stderr.is_empty() {
            tracing::warn!(
                tool = spec.tool.binary_name(),
                "{}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        let outputs = Self::expected_outputs(spec);
        let bytes = outputs
            .iter()
            .filter_map(|path| std::fs::metadata(self.root.join(path)).ok())
            .map(|meta| meta.len())
            .sum();

        Ok(BuildSummary {
            outputs,
            duration,
            bytes,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Mode, SrcPatterns};
    use crate::spec::{script_spec, style_spec};
    use crate::task::{ScriptTask, StyleTask};
    use std::collections::BTreeMap;

    fn script(dest: &str) -> ScriptTask {
        ScriptTask {
            src: SrcPatterns::One("src/index.js".to_string()),
            dest: dest.to_string(),
            map: None,
            minify: None,
            alias: BTreeMap::new(),
            globals: BTreeMap::new(),
            jsx: false,
            watch: Vec::new(),
        }
    }

    #[test]
    fn bundler_args_for_a_file_dest() {
        let spec = script_spec(Mode::Development, &script("build/app.js"));
        let args = ToolEngine::bundler_args(&spec);
        assert_eq!(args[0], "src/index.js");
        assert!(args.contains(&"--bundle".to_string()));
        assert!(args.contains(&"--outfile=build/app.js".to_string()));
        assert!(args.contains(&"--sourcemap".to_string()));
        assert!(!args.contains(&"--minify".to_string()));
    }

    #[test]
    fn bundler_args_for_a_directory_dest() {
        let spec = script_spec(Mode::Production, &script("build/js"));
        let args = ToolEngine::bundler_args(&spec);
        assert!(args.contains(&"--outdir=build/js".to_string()));
        assert!(args.contains(&"--minify".to_string()));
        assert!(!args.contains(&"--sourcemap".to_string()));
    }

    #[test]
    fn stage_args_are_appended() {
        let mut task = script("build/app.js");
        task.alias.insert("react".to_string(), "preact/compat".to_string());
        let spec = script_spec(Mode::Development, &task);
        let args = ToolEngine::bundler_args(&spec);
        assert!(args.contains(&"--alias:react=preact/compat".to_string()));
    }

    #[test]
    fn styles_args_rename_to_css_in_fanout() {
        let task = StyleTask {
            src: SrcPatterns::One("src/index.scss".to_string()),
            dest: "build/css".to_string(),
            map: None,
            minify: None,
            watch: Vec::new(),
        };
        let spec = style_spec(Mode::Production, &task);
        let args = ToolEngine::styles_args(&spec);
        assert_eq!(args[0], "src/index.scss");
        assert_eq!(args[1], format!("build/css{}index.css", std::path::MAIN_SEPARATOR));
        assert!(args.contains(&"--style=compressed".to_string()));
        assert!(args.contains(&"--no-source-map".to_string()));
    }

    #[test]
    fn configured_tool_paths_override_path_lookup() {
        let tools = ToolsConfig {
            bundler: Some(PathBuf::from("/opt/tools/esbuild")),
            ..ToolsConfig::default()
        };
        let engine = ToolEngine::new(Path::new("."), &tools);
        assert_eq!(engine.program(Tool::Bundler), Path::new("/opt/tools/esbuild"));
        assert_eq!(engine.program(Tool::Styles), Path::new("sass"));
    }

    #[test]
    fn missing_tool_is_reported_as_such() {
        let tools = ToolsConfig {
            bundler: Some(PathBuf::from("/nonexistent/no-such-esbuild")),
            ..ToolsConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let engine = ToolEngine::new(dir.path(), &tools);
        let spec = script_spec(Mode::Development, &script("build/app.js"));
        match engine.compile(&spec) {
            Err(EngineError::ToolMissing { tool, .. }) => {
                assert!(tool.contains("no-such-esbuild"));
            }
            other => panic!("expected ToolMissing, got {other:?}"),
        }
    }
}
