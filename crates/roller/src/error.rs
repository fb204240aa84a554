// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the orchestration core.
//!
//! Each failure domain gets its own enum so callers can tell a fatal
//! configuration problem apart from a per-task build failure that must
//! not abort sibling tasks.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while locating or parsing `roller.toml`.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file at the expected path.
    #[error("No configuration file found at {0}")]
    Missing(PathBuf),

    /// The file exists but is not valid TOML for the expected schema.
    #[error("Failed to parse configuration: {0}")]
    Parse(#[from] toml::de::Error),

    /// An I/O error occurred while reading or scaffolding the file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the external compile engine (bundler / style compiler).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The tool executable could not be spawned at all.
    #[error("Could not start `{tool}`: {source}")]
    ToolMissing {
        /// Program name or configured path.
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and exited non-zero.
    #[error("[{tool}] {detail}")]
    Failed {
        /// Tool name, used as the attribution prefix.
        tool: String,
        /// Captured stderr, trimmed.
        detail: String,
    },

    /// An I/O error occurred around the invocation.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a single build round of one task.
///
/// These are always recovered at the fan-out boundary: a failing task is
/// logged and its siblings keep running.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid source pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Could not read matched path: {0}")]
    Glob(#[from] glob::GlobError),

    /// A custom task's command exited non-zero.
    #[error("Custom task `{name}` failed with exit code {code:?}")]
    CustomCommand {
        /// Task label.
        name: String,
        /// Exit code if the child was not killed by a signal.
        code: Option<i32>,
    },

    /// A custom task's registered build function returned an error.
    #[error("Custom task failed: {0}")]
    Custom(#[source] anyhow::Error),

    /// The build round was cancelled while joining the blocking engine call.
    #[error("Build task was cancelled")]
    Cancelled,
}

/// Errors from the reload coordinator.
///
/// Unlike [`BuildError`] these are fatal to the dev session: a session
/// without its reserved reload port is misconfigured, not merely failing
/// one task.
#[derive(Debug, Error)]
pub enum ReloadError {
    /// No free port in `[base, base + range)`.
    #[error("No free live-reload port in {base}..{}", *base as u32 + *range as u32)]
    PortsExhausted {
        /// First port probed.
        base: u16,
        /// Number of ports probed.
        range: u16,
    },

    /// The reserved port was taken between reservation and bind.
    #[error("Failed to bind live-reload port: {0}")]
    Bind(#[source] std::io::Error),
}

/// Errors from the static file server.
#[derive(Debug, Error)]
pub enum ServeError {
    /// No free port in the probed range.
    #[error("No free port for the static server in {base}..{}", *base as u32 + *range as u32)]
    PortsExhausted {
        /// First port probed.
        base: u16,
        /// Number of ports probed.
        range: u16,
    },

    #[error("Failed to bind static server: {0}")]
    Bind(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from a watch session.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error(transparent)]
    Notify(#[from] notify::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Umbrella error for the orchestrator's public entry points.
#[derive(Debug, Error)]
pub enum RollerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Reload(#[from] ReloadError),

    #[error(transparent)]
    Serve(#[from] ServeError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
