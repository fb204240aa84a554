// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project configuration.
//!
//! Configuration is loaded from `roller.toml` at the project root.
//!
//! # Example Configuration
//!
//! ```toml
//! [[build]]
//! src = "src/index.js"
//! dest = "build/index.min.js"
//!
//! [[build]]
//! src = "src/index.scss"
//! dest = "build/index.min.css"
//!
//! [[build]]
//! src = "src/pages/**/*.html"
//! dest = "build"
//!
//! [serve]
//! dir = "build"
//! port = 3000
//!
//! [reload]
//! debounce_ms = 300
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ConfigError;

/// Name of the project configuration file.
pub const CONFIG_FILE_NAME: &str = "roller.toml";

/// Default config written by [`Config::scaffold`].
pub const DEFAULT_CONFIG: &str = r#"[[build]]
src = "src/index.js"
dest = "build/index.min.js"

[[build]]
src = "src/index.scss"
dest = "build/index.min.css"
"#;

/// The mode a command runs in.
///
/// Development mode keeps source maps on and minification off. Live
/// reload is tied to the dev watch session, not to the mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// `dev` command: watch, rebuild, live reload.
    Development,
    /// Everything else: optimized one-shot output.
    Production,
}

impl Mode {
    /// True in development mode.
    pub fn is_dev(self) -> bool {
        matches!(self, Mode::Development)
    }
}

/// Main configuration structure loaded from `roller.toml`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Project root, set at load time. Not part of the file.
    #[serde(skip)]
    pub root: PathBuf,

    /// Declared build tasks.
    #[serde(default)]
    pub build: Vec<TaskConfig>,

    /// Static file server settings.
    #[serde(default)]
    pub serve: Option<ServeConfig>,

    /// Source patterns passed to the external formatter.
    #[serde(default)]
    pub format: Vec<String>,

    /// Source patterns passed to the external linter.
    #[serde(default)]
    pub lint: Vec<String>,

    /// Zip packaging settings.
    #[serde(default)]
    pub archive: Option<ArchiveConfig>,

    /// Dependencies fetched into `vendor/`.
    #[serde(default)]
    pub install: Vec<InstallSource>,

    /// Development-only dependencies.
    #[serde(default)]
    pub install_dev: Vec<InstallSource>,

    /// Live-reload coordinator settings.
    #[serde(default)]
    pub reload: ReloadConfig,

    /// External tool overrides.
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Source patterns of a task: a single string or a list of strings.
/// List entries starting with `!` exclude their matches from the other
/// patterns.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SrcPatterns {
    /// The common case: one path or glob pattern.
    One(String),
    /// Several patterns, possibly with `!` exclusions.
    Many(Vec<String>),
}

impl SrcPatterns {
    /// Wraps a single pattern.
    pub fn one(pattern: impl Into<String>) -> Self {
        SrcPatterns::One(pattern.into())
    }

    fn all(&self) -> std::slice::Iter<'_, String> {
        match self {
            SrcPatterns::One(pattern) => std::slice::from_ref(pattern).iter(),
            SrcPatterns::Many(patterns) => patterns.iter(),
        }
    }

    /// Patterns that contribute matches, in declaration order.
    pub fn includes(&self) -> impl Iterator<Item = &str> {
        self.all()
            .map(String::as_str)
            .filter(|pattern| !pattern.starts_with('!'))
    }

    /// Exclusion patterns, without the leading `!`.
    pub fn negations(&self) -> impl Iterator<Item = &str> {
        self.all().filter_map(|pattern| pattern.strip_prefix('!'))
    }

    /// The first include: the entry file for compiled tasks and the
    /// label used in logs.
    pub fn first(&self) -> Option<&str> {
        self.includes().next()
    }
}

/// One declared task. Kind is either explicit (`task = "..."`) or inferred
/// from the source extension; see [`crate::task`].
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Explicit task kind (`script`, `style`, `markup`, `copy`, `custom`;
    /// the aliases `js`, `sass` and `html` are accepted).
    #[serde(default)]
    pub task: Option<String>,

    /// Source patterns.
    #[serde(default)]
    pub src: Option<SrcPatterns>,

    /// Destination file or directory.
    #[serde(default)]
    pub dest: Option<String>,

    /// Source map override. Unset inherits the mode default.
    #[serde(default)]
    pub map: Option<bool>,

    /// Minification override. Unset inherits the mode default.
    #[serde(default)]
    pub minify: Option<bool>,

    /// Module aliases for script bundling.
    #[serde(default)]
    pub alias: BTreeMap<String, String>,

    /// Compile-time constant injection for script bundling.
    #[serde(default)]
    pub globals: BTreeMap<String, String>,

    /// JSX support for script tasks.
    #[serde(default)]
    pub jsx: bool,

    /// Template data for markup tasks, substituted as `%key%` tokens.
    #[serde(default)]
    pub data: toml::Table,

    /// Shell command for custom tasks.
    #[serde(default)]
    pub command: Option<String>,

    /// Extra paths to watch beyond `src`.
    #[serde(default)]
    pub watch: Vec<String>,
}

/// Static file server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServeConfig {
    /// Directory to serve. Absent means no static server.
    #[serde(default)]
    pub dir: Option<String>,

    /// Preferred port (default: 3000). Probed upward when busy.
    #[serde(default = "default_serve_port")]
    pub port: u16,

    /// Optional server command run alongside (or instead of) the static
    /// server.
    #[serde(default)]
    pub script: Option<String>,

    /// Paths watched to restart `script`.
    #[serde(default)]
    pub watch: Vec<String>,
}

impl Default for ServeConfig {
    fn default() -> Self {
        Self {
            dir: None,
            port: default_serve_port(),
            script: None,
            watch: Vec::new(),
        }
    }
}

/// Zip packaging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ArchiveConfig {
    /// Patterns to include.
    pub src: Vec<String>,
    /// Destination zip path.
    pub dest: String,
    /// Additional patterns to exclude.
    #[serde(default)]
    pub exclude: Vec<String>,
    /// Folder the files are nested under inside the archive.
    #[serde(default)]
    pub root_folder: Option<String>,
}

/// One dependency fetched by `roll install`.
#[derive(Debug, Clone, Deserialize)]
pub struct InstallSource {
    /// Git repository URL.
    #[serde(default)]
    pub git: Option<String>,
    /// Branch cloned from a git source (default: `main`).
    #[serde(default = "default_branch")]
    pub branch: String,
    /// Zip archive URL.
    #[serde(default)]
    pub url: Option<String>,
}

/// Live-reload coordinator configuration.
///
/// The defaults mirror the conventional LiveReload port and a debounce
/// window wide enough to fold one logical edit into one reload.
#[derive(Debug, Clone, Deserialize)]
pub struct ReloadConfig {
    /// Master switch. When false the coordinator never activates.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// First port probed for the push channel (default: 35729).
    #[serde(default = "default_reload_port")]
    pub port: u16,

    /// Number of ports probed upward from `port` (default: 100).
    #[serde(default = "default_probe_range")]
    pub probe_range: u16,

    /// Debounce window for full reloads, in milliseconds (default: 300).
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            port: default_reload_port(),
            probe_range: default_probe_range(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

/// Paths and commands for the external tools the build delegates to.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ToolsConfig {
    /// Bundler executable (default: `esbuild` from PATH).
    #[serde(default)]
    pub bundler: Option<PathBuf>,

    /// Style compiler executable (default: `sass` from PATH).
    #[serde(default)]
    pub styles: Option<PathBuf>,

    /// Formatter command for `roll format`.
    #[serde(default = "default_format_command")]
    pub format_command: String,

    /// Linter command for `roll lint`.
    #[serde(default = "default_lint_command")]
    pub lint_command: String,
}

fn default_serve_port() -> u16 {
    3000
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_true() -> bool {
    true
}

fn default_reload_port() -> u16 {
    35729
}

fn default_probe_range() -> u16 {
    100
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_format_command() -> String {
    "npx prettier --no-config --write".to_string()
}

fn default_lint_command() -> String {
    "npx prettier --no-config --check".to_string()
}

impl Config {
    /// Loads configuration from `roller.toml` under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] when the file does not exist, so
    /// callers can offer to scaffold one, and [`ConfigError::Parse`] when
    /// it exists but does not match the schema.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let root = root.as_ref();
        let path = root.join(CONFIG_FILE_NAME);

        if !path.exists() {
            return Err(ConfigError::Missing(path));
        }

        let content = fs::read_to_string(&path)?;
        let mut config: Config = toml::from_str(&content)?;
        config.root = root.to_path_buf();
        Ok(config)
    }

    /// Writes [`DEFAULT_CONFIG`] to `roller.toml` under `root`.
    pub fn scaffold(root: impl AsRef<Path>) -> Result<PathBuf, ConfigError> {
        let path = root.as_ref().join(CONFIG_FILE_NAME);
        fs::write(&path, DEFAULT_CONFIG)?;
        Ok(path)
    }
}
