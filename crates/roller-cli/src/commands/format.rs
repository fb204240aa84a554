// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Formatter command: hands the configured source patterns to an
//! external formatter, in batches sized to stay under command-line
//! length limits.

use std::path::Path;

use console::style;
use roller::util;
use tokio::task::JoinSet;

use super::load_or_scaffold;

/// Command lines are chunked so no invocation's file list exceeds this.
const MAX_BATCH_CHARS: usize = 1024;

/// Extensions a bare directory pattern expands to.
const KNOWN_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx", "scss", "css", "html", "json"];

/// Runs the format command over the `format` patterns, per project.
pub async fn run(projects: Vec<String>) -> anyhow::Result<()> {
    let mut total_failures = 0;
    for project in super::resolve_projects(projects)? {
        let config = load_or_scaffold(&project)?;
        if config.format.is_empty() {
            println!("{}", style("No format patterns configured").yellow());
            continue;
        }
        total_failures +=
            run_batched_tool(&project, &config.tools.format_command, &config.format).await?;
    }

    if total_failures > 0 {
        anyhow::bail!("formatter failed on {total_failures} batch(es)");
    }
    println!("{}", style("Formatted").green());
    Ok(())
}

/// A bare existing directory stands for every known source file under
/// it; anything else is taken as a glob pattern.
fn expand_pattern(root: &Path, pattern: &str) -> Vec<String> {
    if root.join(pattern).is_dir() {
        KNOWN_EXTENSIONS
            .iter()
            .map(|ext| format!("{}/**/*.{ext}", pattern.trim_end_matches('/')))
            .collect()
    } else {
        vec![pattern.to_string()]
    }
}

/// Expands the patterns, batches the files and runs one tool process per
/// batch, concurrently. One failed batch does not cancel the others;
/// returns how many failed.
pub(crate) async fn run_batched_tool(
    root: &Path,
    command: &str,
    patterns: &[String],
) -> anyhow::Result<usize> {
    let mut files = Vec::new();
    for pattern in patterns {
        for expanded in expand_pattern(root, pattern) {
            for entry in glob::glob(&root.join(&expanded).to_string_lossy())? {
                let path = entry?;
                if path.is_file() {
                    files.push(path.to_string_lossy().into_owned());
                }
            }
        }
    }
    files.sort();
    files.dedup();

    if files.is_empty() {
        println!("{}", style("No files matched").yellow());
        return Ok(0);
    }

    let mut batches = JoinSet::new();
    for batch in util::batch_file_lists(&files, MAX_BATCH_CHARS) {
        let command = format!("{command} {}", batch.join(" "));
        let root = root.to_path_buf();
        batches.spawn(async move {
            tokio::process::Command::new("sh")
                .args(["-c", &command])
                .current_dir(root)
                .status()
                .await
        });
    }

    let mut failures = 0;
    while let Some(joined) = batches.join_next().await {
        match joined {
            Ok(Ok(status)) if status.success() => {}
            Ok(Ok(_)) | Ok(Err(_)) | Err(_) => failures += 1,
        }
    }
    Ok(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn bare_directories_expand_to_known_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("src")).unwrap();

        let expanded = expand_pattern(dir.path(), "src");
        assert!(expanded.contains(&"src/**/*.js".to_string()));
        assert!(expanded.contains(&"src/**/*.scss".to_string()));
        assert_eq!(expanded.len(), KNOWN_EXTENSIONS.len());
    }

    #[test]
    fn glob_patterns_pass_through() {
        let dir = tempfile::tempdir().unwrap();
        let expanded = expand_pattern(dir.path(), "src/**/*.ts");
        assert_eq!(expanded, vec!["src/**/*.ts".to_string()]);
    }
}
