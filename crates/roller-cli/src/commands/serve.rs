// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static server command, without watching or live reload.

use super::{load_or_scaffold, project_root};

/// Runs the serve command until Ctrl-C.
///
/// Uses the `[serve]` table when present; a missing table serves the
/// current directory on the default port.
pub async fn run(port: Option<u16>, dir: Option<String>) -> anyhow::Result<()> {
    let root = project_root()?;
    let config = load_or_scaffold(&root)?;

    let mut serve_config = config.serve.clone().unwrap_or_default();
    if serve_config.dir.is_none() {
        serve_config.dir = Some(".".to_string());
    }
    if let Some(port) = port {
        serve_config.port = port;
    }
    if let Some(dir) = dir {
        serve_config.dir = Some(dir);
    }

    roller::serve::start(&root, &serve_config).await?;
    tokio::signal::ctrl_c().await?;
    println!();
    Ok(())
}
