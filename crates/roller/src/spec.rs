// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Translation of script and style tasks into tool-neutral compile specs.
//!
//! A [`CompileSpec`] captures everything an engine needs to run one
//! compilation: entry, destination, mode-derived switches and the extra
//! argument stages a task contributes. Building the spec is pure; process
//! spawning lives in [`crate::engine`].

use std::path::{Path, PathBuf};

use crate::config::Mode;
use crate::engine::Tool;
use crate::task::{ScriptTask, StyleTask};
use crate::util;

/// What to compile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSpec {
    /// Entry file, or a glob pattern expanded by the engine caller.
    pub entry: PathBuf,
}

/// Where the output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    /// Destination file or directory.
    pub dest: PathBuf,
    /// True when `dest` is a directory and the tool fans entries out into
    /// it, keeping their file names.
    pub dir_fanout: bool,
    /// Emit a source map next to the output.
    pub source_map: bool,
}

/// A named group of extra tool arguments contributed by one task feature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub name: &'static str,
    pub args: Vec<String>,
}

/// A complete, tool-neutral description of one compilation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileSpec {
    pub tool: Tool,
    pub input: InputSpec,
    pub output: OutputSpec,
    pub minify: bool,
    pub stages: Vec<Stage>,
}

/// Source maps default on in development, off in production; a task
/// override always wins.
fn source_map(mode: Mode, task_map: Option<bool>) -> bool {
    task_map.unwrap_or(mode.is_dev())
}

/// Minification defaults to the inverse of source maps.
fn minify(mode: Mode, task_minify: Option<bool>) -> bool {
    task_minify.unwrap_or(!mode.is_dev())
}

/// Builds the compile spec for a script task.
pub fn script_spec(mode: Mode, task: &ScriptTask) -> CompileSpec {
    let dest = Path::new(&task.dest).to_path_buf();
    let mut stages = Vec::new();

    if !task.alias.is_empty() {
        stages.push(Stage {
            name: "alias",
            args: task
                .alias
                .iter()
                .map(|(from, to)| format!("--alias:{from}={to}"))
                .collect(),
        });
    }

    if !task.globals.is_empty() {
        stages.push(Stage {
            name: "globals",
            args: task
                .globals
                .iter()
                .map(|(name, value)| format!("--define:{name}={value}"))
                .collect(),
        });
    }

    if task.jsx {
        stages.push(Stage {
            name: "jsx",
            args: vec!["--jsx=automatic".to_string(), "--loader:.js=jsx".to_string()],
        });
    }

    CompileSpec {
        tool: Tool::Bundler,
        input: InputSpec {
            entry: task.src.first().map(PathBuf::from).unwrap_or_default(),
        },
        output: OutputSpec {
            dir_fanout: !util::dest_is_file(&task.dest),
            dest,
            source_map: source_map(mode, task.map),
        },
        minify: minify(mode, task.minify),
        stages,
    }
}

/// Builds the compile spec for a style task.
pub fn style_spec(mode: Mode, task: &StyleTask) -> CompileSpec {
    let dest = Path::new(&task.dest).to_path_buf();

    CompileSpec {
        tool: Tool::Styles,
        input: InputSpec {
            entry: task.src.first().map(PathBuf::from).unwrap_or_default(),
        },
        output: OutputSpec {
            dir_fanout: !util::dest_is_file(&task.dest),
            dest,
            source_map: source_map(mode, task.map),
        },
        minify: minify(mode, task.minify),
        stages: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SrcPatterns;
    use std::collections::BTreeMap;

    fn script(dest: &str) -> ScriptTask {
        ScriptTask {
            src: SrcPatterns::one("src/index.js"),
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
    fn development_defaults() {
        let spec = script_spec(Mode::Development, &script("build/app.js"));
        assert!(spec.output.source_map);
        assert!(!spec.minify);
        assert!(!spec.output.dir_fanout);
    }

    #[test]
    fn production_defaults() {
        let spec = script_spec(Mode::Production, &script("build/app.js"));
        assert!(!spec.output.source_map);
        assert!(spec.minify);
    }

    #[test]
    fn task_overrides_win_over_mode() {
        let mut task = script("build/app.js");
        task.map = Some(false);
        task.minify = Some(true);

        let spec = script_spec(Mode::Development, &task);
        assert!(!spec.output.source_map);
        assert!(spec.minify);
    }

    #[test]
    fn entry_is_the_first_include() {
        let mut task = script("build/app.js");
        task.src = SrcPatterns::Many(vec![
            "src/main.js".to_string(),
            "src/lib/**/*.js".to_string(),
        ]);

        let spec = script_spec(Mode::Development, &task);
        assert_eq!(spec.input.entry, PathBuf::from("src/main.js"));
    }

    #[test]
    fn directory_dest_enables_fanout() {
        let spec = script_spec(Mode::Development, &script("build/js"));
        assert!(spec.output.dir_fanout);
    }

    #[test]
    fn building_a_spec_is_deterministic() {
        let mut task = script("build/app.js");
        task.alias.insert("react".to_string(), "preact/compat".to_string());
        task.globals.insert("DEBUG".to_string(), "true".to_string());

        let a = script_spec(Mode::Production, &task);
        let b = script_spec(Mode::Production, &task);
        assert_eq!(a, b);
    }

    #[test]
    fn alias_and_globals_become_stages() {
        let mut task = script("build/app.js");
        task.alias.insert("react".to_string(), "preact/compat".to_string());
        task.globals.insert("VERSION".to_string(), "\"1.0\"".to_string());
        task.jsx = true;

        let spec = script_spec(Mode::Development, &task);
        let names: Vec<_> = spec.stages.iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alias", "globals", "jsx"]);
        assert_eq!(spec.stages[0].args, vec!["--alias:react=preact/compat"]);
        assert_eq!(spec.stages[1].args, vec!["--define:VERSION=\"1.0\""]);
    }

    #[test]
    fn style_spec_uses_the_styles_tool() {
        let task = StyleTask {
            src: SrcPatterns::one("src/index.scss"),
            dest: "build/css".to_string(),
            map: None,
            minify: None,
            watch: Vec::new(),
        };

        let spec = style_spec(Mode::Production, &task);
        assert_eq!(spec.tool, Tool::Styles);
        assert!(spec.minify);
        assert!(spec.output.dir_fanout);
    }
}
