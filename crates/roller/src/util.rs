// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Small path, text and formatting helpers shared across the crate.

use std::net::TcpListener;
use std::path::{Path, PathBuf};

/// Formats a byte count for human consumption (`B`, `kB`, `MB`).
pub fn human_size(bytes: u64) -> String {
    const KB: u64 = 1000;
    const MB: u64 = KB * 1000;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} kB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}

/// Rewrites absolute occurrences of `root` in `text` as `.` so error
/// messages and logs stay readable regardless of where the project lives.
pub fn relativize(root: &Path, text: &str) -> String {
    text.replace(&root.display().to_string(), ".")
}

/// Renders `path` relative to `root` when possible.
pub fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

/// Splits a glob pattern into its static prefix, the directory that a
/// recursive watcher should be attached to.
///
/// `src/**/*.html` yields `src`; a concrete file path yields its parent so
/// atomic editor writes are still observed.
pub fn glob_static_root(pattern: &str) -> PathBuf {
    let path = Path::new(pattern);
    let components: Vec<_> = path.components().collect();

    let split_idx = components
        .iter()
        .position(|c| {
            c.as_os_str()
                .to_str()
                .is_some_and(|s| s.contains(['*', '?', '[']))
        })
        .unwrap_or(components.len());

    let root: PathBuf = components.iter().take(split_idx).collect();

    if split_idx == components.len() {
        // Concrete path. A trailing extension means a file, watch its parent.
        if dest_is_file(pattern) {
            return root.parent().map(Path::to_path_buf).unwrap_or_default();
        }
    }

    root
}

/// A destination with a file extension in its last component targets a
/// single file; anything else targets a directory.
pub fn dest_is_file(dest: &str) -> bool {
    Path::new(dest)
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.rsplit_once('.').is_some_and(|(stem, _)| !stem.is_empty()))
}

/// Splits `files` into batches whose joined length stays below `max_len`,
/// so a single external tool invocation never exceeds the platform's
/// argument length limits.
pub fn batch_file_lists(files: &[String], max_len: usize) -> Vec<Vec<String>> {
    let mut batches = Vec::new();
    let mut current: Vec<String> = Vec::new();
    let mut current_len = 0;

    for file in files {
        if current_len + file.len() > max_len && !current.is_empty() {
            batches.push(std::mem::take(&mut current));
            current_len = 0;
        }
        current_len += file.len() + 1;
        current.push(file.clone());
    }

    if !current.is_empty() {
        batches.push(current);
    }

    batches
}

/// Inserts `snippet` before the final `</body>` tag, falling back to
/// `</html>` and finally to appending when neither tag is present.
pub fn inject_before_body_end(html: &str, snippet: &str) -> String {
    let lower = html.to_lowercase();

    if let Some(pos) = lower.rfind("</body>") {
        let mut out = html.to_string();
        out.insert_str(pos, snippet);
        out
    } else if let Some(pos) = lower.rfind("</html>") {
        let mut out = html.to_string();
        out.insert_str(pos, snippet);
        out
    } else {
        format!("{html}{snippet}")
    }
}

/// Replaces `%key%` tokens in `text` with values from `data`.
///
/// Non-string values are rendered with their TOML display form.
pub fn substitute_tokens(text: &str, data: &toml::Table) -> String {
    let mut out = text.to_string();
    for (key, value) in data {
        let token = format!("%{key}%");
        let rendered = match value {
            toml::Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out = out.replace(&token, &rendered);
    }
    out
}

/// Probes `[base, base + range)` for a port that can be bound on the
/// loopback interface, returning the first free one.
pub fn find_free_port(base: u16, range: u16) -> Option<u16> {
    (0..range)
        .map(|off| base.saturating_add(off))
        .find(|&port| TcpListener::bind(("127.0.0.1", port)).is_ok())
}
