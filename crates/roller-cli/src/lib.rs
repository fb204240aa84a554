// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Roller CLI library.
//!
//! This crate provides the `roll` command-line interface on top of the
//! `roller` orchestration core: project builds, the dev session, the
//! static server, and the project housekeeping commands (format, lint,
//! archive, install, run, list).
//!
//! # Usage
//!
//! This crate is primarily used through the `roll` binary:
//!
//! ```bash
//! roll dev       # Watch, rebuild and live-reload
//! roll build     # One-shot production build
//! roll serve     # Serve the output directory
//! roll archive   # Package the project as a zip
//! ```
//!
//! Projects are configured via `roller.toml` at the project root.

/// CLI command implementations.
pub mod commands;
