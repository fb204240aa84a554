// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Live-reload coordinator.
//!
//! One WebSocket endpoint per dev session, on its own port picked by
//! probing upward from the configured base. Build rounds push
//! [`Notification`]s; connected browsers either swap stylesheets in place
//! or do a full reload. An inactive coordinator exposes the same API and
//! does nothing, so callers never branch on live versus one-shot runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::error::ReloadError;
use crate::task::{Task, TaskKind};
use crate::util;

/// What connected browsers are told to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Reload the whole page.
    Reload,
    /// Re-fetch stylesheets without reloading.
    RefreshCss,
}

impl Notification {
    /// Wire form sent over the WebSocket.
    pub fn to_json(self) -> String {
        match self {
            Notification::Reload => serde_json::json!({ "reload": true }).to_string(),
            Notification::RefreshCss => serde_json::json!({ "reloadCSS": true }).to_string(),
        }
    }
}

/// Browser-side client, served inline and injected into rendered markup.
/// `%PORT%` is substituted with the reserved port.
const CLIENT_JS: &str = r#"(function () {
  var attempts = 0;
  function connect() {
    var socket = new WebSocket("ws://" + location.hostname + ":%PORT%/");
    socket.onopen = function () { attempts = 0; };
    socket.onmessage = function (event) {
      var msg;
      try { msg = JSON.parse(event.data); } catch (e) { return; }
      if (msg.reload) {
        location.reload();
      } else if (msg.reloadCSS) {
        var links = document.querySelectorAll('link[rel="stylesheet"]');
        links.forEach(function (link) {
          var href = link.href.replace(/[?&]reload=\d+/, "");
          link.href = href + (href.indexOf("?") < 0 ? "?" : "&") + "reload=" + Date.now();
        });
      }
    };
    socket.onclose = function () {
      if (attempts < 3) {
        attempts += 1;
        setTimeout(connect, 3000);
      }
    };
  }
  connect();
})();
"#;

struct ReloaderInner {
    port: u16,
    debounce: std::time::Duration,
    tx: broadcast::Sender<Notification>,
    pending: Mutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
}

/// Handle to the reload coordinator. Cheap to clone; all clones share the
/// same pending-reload window and broadcast channel.
#[derive(Clone)]
pub struct Reloader {
    inner: Option<Arc<ReloaderInner>>,
}

impl Reloader {
    /// An inactive coordinator that ignores every call.
    pub fn disabled() -> Self {
        Self { inner: None }
    }

    /// Decides whether a watch session gets live reload and reserves a
    /// port for it. Only watch sessions construct one; one-shot builds
    /// use [`Reloader::disabled`]. Activation requires a static server,
    /// at least one markup task and the feature left enabled.
    /// Reservation failing when every probed port is busy is fatal;
    /// everything else yields a silent no-op coordinator.
    pub fn new(config: &Config, tasks: &[Task]) -> Result<Self, ReloadError> {
        let wanted = config.reload.enabled
            && config.serve.is_some()
            && tasks.iter().any(|t| t.kind() == TaskKind::Markup);

        if !wanted {
            return Ok(Self::disabled());
        }

        let base = config.reload.port;
        let range = config.reload.probe_range;
        let port = util::find_free_port(base, range)
            .ok_or(ReloadError::PortsExhausted { base, range })?;

        let (tx, _) = broadcast::channel(16);
        Ok(Self {
            inner: Some(Arc::new(ReloaderInner {
                port,
                debounce: std::time::Duration::from_millis(config.reload.debounce_ms),
                tx,
                pending: Mutex::new(None),
                started: AtomicBool::new(false),
            })),
        })
    }

    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    #[cfg(test)]
    pub(crate) fn subscribe(&self) -> Option<broadcast::Receiver<Notification>> {
        self.inner.as_ref().map(|inner| inner.tx.subscribe())
    }

    /// The reserved port, when active.
    pub fn port(&self) -> Option<u16> {
        self.inner.as_ref().map(|inner| inner.port)
    }

    /// Schedules a full-page reload. Calls landing inside the debounce
    /// window replace the pending one, so a burst of build rounds ends in
    /// a single notification.
    pub fn reload(&self) {
        let Some(inner) = &self.inner else { return };

        let delayed = {
            let inner = Arc::clone(inner);
            tokio::spawn(async move {
                tokio::time::sleep(inner.debounce).await;
                let _ = inner.tx.send(Notification::Reload);
            })
        };

        let mut pending = match inner.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(previous) = pending.replace(delayed) {
            previous.abort();
        }
    }

    /// Tells browsers to re-fetch stylesheets, immediately. Style-only
    /// changes never wait out the debounce window.
    pub fn reload_css(&self) {
        if let Some(inner) = &self.inner {
            let _ = inner.tx.send(Notification::RefreshCss);
        }
    }

    /// The script tag injected into rendered markup, when active.
    pub fn client_script(&self) -> Option<String> {
        let inner = self.inner.as_ref()?;
        Some(format!(
            "<script>\n{}</script>\n",
            CLIENT_JS.replace("%PORT%", &inner.port.to_string())
        ))
    }

    /// Binds the reserved port and starts serving WebSocket upgrades.
    /// Idempotent; only the first call binds. A bind failure is fatal to
    /// the session since clients were already told this port.
    pub async fn start_server(&self) -> Result<(), ReloadError> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };
        if inner.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let addr = ("127.0.0.1", inner.port);
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(ReloadError::Bind)?;

        let app = Router::new()
            .route("/", get(upgrade_handler))
            .with_state(inner.tx.clone());

        tracing::debug!(port = inner.port, "live-reload endpoint listening");
        tokio::spawn(async move {
            if let Err(err) = axum::serve(listener, app).await {
                tracing::error!("live-reload server stopped: {err}");
            }
        });

        Ok(())
    }
}

async fn upgrade_handler(
    ws: WebSocketUpgrade,
    State(tx): State<broadcast::Sender<Notification>>,
) -> impl IntoResponse {
    let rx = tx.subscribe();
    ws.on_upgrade(move |socket| handle_socket(socket, rx))
}

async fn handle_socket(mut socket: WebSocket, mut rx: broadcast::Receiver<Notification>) {
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(notification) => {
                        if socket
                            .send(Message::Text(notification.to_json()))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}
