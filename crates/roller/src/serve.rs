// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Static file server for dev sessions and `roll serve`.
//!
//! Serves one directory over HTTP, probing upward from the configured
//! port when it is busy. An optional server command runs alongside and is
//! restarted when its watched paths change.

use std::path::{Path, PathBuf};
use std::time::Duration;

use axum::Router;
use console::style;
use notify::RecursiveMode;
use notify_debouncer_full::{new_debouncer, DebouncedEvent};
use tower_http::services::ServeDir;

use crate::config::ServeConfig;
use crate::error::ServeError;
use crate::util;

const PORT_PROBE_RANGE: u16 = 100;

/// A running static server.
pub struct ServerHandle {
    /// Port actually bound, after probing.
    pub port: u16,
    /// Directory being served.
    pub dir: PathBuf,
}

/// Starts the static server and, when configured, the server command.
pub async fn start(root: &Path, config: &ServeConfig) -> Result<ServerHandle, ServeError> {
    let dir = root.join(config.dir.as_deref().unwrap_or("."));

    let port = util::find_free_port(config.port, PORT_PROBE_RANGE).ok_or(
        ServeError::PortsExhausted {
            base: config.port,
            range: PORT_PROBE_RANGE,
        },
    )?;
    if port != config.port {
        println!(
            "{}",
            style(format!("..Port {} is busy - Using {}", config.port, port)).yellow()
        );
    }

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(ServeError::Bind)?;

    let app = Router::new().fallback_service(ServeDir::new(&dir));
    tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, app).await {
            tracing::error!("static server stopped: {err}");
        }
    });

    println!(
        "Serve directory {} at {}",
        style(util::display_path(root, &dir)).bold(),
        style(format!("http://localhost:{port}")).cyan()
    );

    if let Some(script) = &config.script {
        spawn_script(root, script.clone(), config.watch.clone())?;
    }

    Ok(ServerHandle { port, dir })
}

/// Runs the server command, restarting it whenever a watched path
/// changes. Without watch paths the command runs once and its exit is
/// only logged.
fn spawn_script(root: &Path, script: String, watch: Vec<String>) -> Result<(), ServeError> {
    let root = root.to_path_buf();
    let (restart_tx, mut restart_rx) = tokio::sync::mpsc::channel::<()>(4);

    let debouncer = if watch.is_empty() {
        None
    } else {
        let mut debouncer = new_debouncer(
            Duration::from_millis(500),
            None,
            move |result: Result<Vec<DebouncedEvent>, Vec<notify::Error>>| {
                if matches!(&result, Ok(events) if !events.is_empty()) {
                    let _ = restart_tx.blocking_send(());
                }
            },
        )
        .map_err(|err| ServeError::Io(std::io::Error::other(err)))?;

        for pattern in &watch {
            let path = util::glob_static_root(&root.join(pattern).to_string_lossy());
            if path.exists() {
                debouncer
                    .watch(&path, RecursiveMode::Recursive)
                    .map_err(|err| ServeError::Io(std::io::Error::other(err)))?;
            }
        }
        Some(debouncer)
    };

    tokio::spawn(async move {
        // Keep the watcher alive for the lifetime of the script loop.
        let _debouncer = debouncer;
        loop {
            let mut child = match tokio::process::Command::new("sh")
                .args(["-c", &script])
                .current_dir(&root)
                .spawn()
            {
                Ok(child) => child,
                Err(err) => {
                    tracing::error!("could not start server command: {err}");
                    return;
                }
            };

            tokio::select! {
                status = child.wait() => {
                    match status {
                        Ok(status) => tracing::info!("server command exited: {status}"),
                        Err(err) => tracing::error!("server command failed: {err}"),
                    }
                    if _debouncer.is_none() {
                        return;
                    }
                    // Wait for a change before restarting a crashed command.
                    if restart_rx.recv().await.is_none() {
                        return;
                    }
                }
                changed = restart_rx.recv() => {
                    if changed.is_none() {
                        return;
                    }
                    let _ = child.kill().await;
                    println!("{}", style("..Restarting server").dim());
                }
            }
        }
    });

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[tokio::test]
    async fn serves_the_configured_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("index.html"), "<h1>ok</h1>").unwrap();

        let config = ServeConfig {
            dir: Some(".".to_string()),
            port: 3999,
            script: None,
            watch: Vec::new(),
        };

        let handle = start(dir.path(), &config).await.unwrap();
        assert!(handle.port >= 3999);

        let stream = tokio::net::TcpStream::connect(("127.0.0.1", handle.port)).await;
        assert!(stream.is_ok());
    }

    #[tokio::test]
    async fn busy_port_probes_upward() {
        let dir = tempfile::tempdir().unwrap();
        let config = ServeConfig {
            dir: None,
            port: 4100,
            script: None,
            watch: Vec::new(),
        };

        let first = start(dir.path(), &config).await.unwrap();
        let second = start(dir.path(), &config).await.unwrap();
        assert_ne!(first.port, second.port);
        assert!(second.port > first.port);
    }
}
