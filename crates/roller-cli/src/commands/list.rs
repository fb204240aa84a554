// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Project listing command: find every `roller.toml` under the current
//! directory and summarize it.

use std::path::{Path, PathBuf};

use console::style;
use roller::config::{Config, CONFIG_FILE_NAME};
use roller::util;

use super::project_root;

/// Directories never descended into.
const SKIPPED_DIRS: &[&str] = &["node_modules", ".git", "vendor", "build", "target"];

/// Runs the list command.
pub async fn run() -> anyhow::Result<()> {
    let root = project_root()?;
    let mut found = Vec::new();
    find_projects(&root, &mut found)?;

    if found.is_empty() {
        println!("{}", style("No projects found").yellow());
        return Ok(());
    }

    for project in &found {
        let relative = project.strip_prefix(&root).unwrap_or(project);
        let depth = relative.components().count();
        let indent = "  ".repeat(depth);
        let label = if *project == root {
            ".".to_string()
        } else {
            util::display_path(&root, project)
        };

        match Config::load(project) {
            Ok(config) => {
                println!(
                    "{indent}{} {}",
                    style(label).bold(),
                    style(format!("({} task(s))", config.build.len())).dim()
                );
            }
            Err(err) => {
                println!(
                    "{indent}{} {}",
                    style(label).bold(),
                    style(format!("(invalid: {err})")).red()
                );
            }
        }
    }
    Ok(())
}

/// Depth-first search for config files, skipping dependency and output
/// directories.
fn find_projects(dir: &Path, found: &mut Vec<PathBuf>) -> anyhow::Result<()> {
    if dir.join(CONFIG_FILE_NAME).is_file() {
        found.push(dir.to_path_buf());
    }

    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if SKIPPED_DIRS.contains(&name.to_string_lossy().as_ref()) {
            continue;
        }
        find_projects(&entry.path(), found)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn finds_nested_projects_but_not_vendored_ones() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE_NAME), "").unwrap();

        fs::create_dir_all(dir.path().join("site")).unwrap();
        fs::write(dir.path().join("site").join(CONFIG_FILE_NAME), "").unwrap();

        fs::create_dir_all(dir.path().join("vendor/dep")).unwrap();
        fs::write(dir.path().join("vendor/dep").join(CONFIG_FILE_NAME), "").unwrap();

        let mut found = Vec::new();
        find_projects(dir.path(), &mut found).unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.contains(&dir.path().to_path_buf()));
        assert!(found.contains(&dir.path().join("site")));
    }
}
