// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! # Roller
//!
//! Build orchestration core for the `roll` command-line tool.
//!
//! Roller reads a task list from `roller.toml` and turns it into builds:
//! script bundling and style compilation through external tool binaries,
//! markup rendering, file copying and custom commands. In development it
//! keeps every task under watch, serves the output directory and pushes
//! live-reload notifications to connected browsers.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use roller::config::{Config, Mode};
//! use roller::orchestrator;
//!
//! let config = Config::load(std::env::current_dir()?)?;
//! let report = orchestrator::run_build(&config, Mode::Production).await?;
//! ```
//!
//! The [`orchestrator`] module is the entry point; everything below it is
//! public so embedders can drive single tasks or single rounds directly.

pub mod build;
pub mod config;
pub mod engine;
pub mod error;
pub mod orchestrator;
pub mod reload;
pub mod serve;
pub mod spec;
pub mod task;
pub mod util;
pub mod watch;

pub use config::{Config, Mode};
pub use error::RollerError;
pub use orchestrator::{run_build, run_dev, RunReport};
