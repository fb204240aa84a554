// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Zip packaging command.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use console::style;
use roller::config::ArchiveConfig;
use roller::util;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{confirm, load_or_scaffold, project_root};

/// Directory names never packaged, regardless of the include patterns.
const EXCLUDED_DIRS: &[&str] = &["node_modules", ".git", "vendor"];

/// File names never packaged.
const EXCLUDED_FILES: &[&str] = &["package-lock.json", "yarn.lock", "pnpm-lock.yaml"];

/// Runs the archive command: collect the configured patterns into a zip.
///
/// The file list and destination are shown and confirmed before writing
/// unless `yes` is set. An existing archive is replaced.
pub async fn run(yes: bool) -> anyhow::Result<()> {
    let root = project_root()?;
    let config = load_or_scaffold(&root)?;

    let Some(archive) = &config.archive else {
        anyhow::bail!("no [archive] section in roller.toml");
    };

    let files = collect_files(&root, archive)?;
    if files.is_empty() {
        anyhow::bail!("no files matched the archive patterns");
    }

    for file in &files {
        println!("  {}", util::display_path(&root, file));
    }
    println!("  -> {}", style(&archive.dest).bold());

    let dest = root.join(&archive.dest);
    if !yes && !confirm(&format!("Archive {} file(s)?", files.len()))? {
        println!("{}", style("Cancelled").dim());
        return Ok(());
    }

    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let bytes = write_zip(&root, &dest, archive, &files)?;
    println!(
        "{} {} {}",
        style("Archived").green(),
        style(&archive.dest).bold(),
        style(format!(
            "({} files, {})",
            files.len(),
            util::human_size(bytes)
        ))
        .dim()
    );
    Ok(())
}

/// Expands the include patterns and drops excluded paths. The destination
/// zip itself and the standard dependency directories are always skipped.
fn collect_files(root: &Path, archive: &ArchiveConfig) -> anyhow::Result<Vec<PathBuf>> {
    let dest = root.join(&archive.dest);
    let excludes: Vec<glob::Pattern> = archive
        .exclude
        .iter()
        .map(|pattern| glob::Pattern::new(pattern))
        .collect::<Result<_, _>>()?;

    let mut files = Vec::new();
    for pattern in &archive.src {
        for entry in glob::glob(&root.join(pattern).to_string_lossy())? {
            let path = entry?;
            if !path.is_file() || path == dest {
                continue;
            }

            let relative = path.strip_prefix(root).unwrap_or(&path);
            let in_excluded_dir = relative
                .components()
                .any(|c| EXCLUDED_DIRS.contains(&c.as_os_str().to_string_lossy().as_ref()));
            let excluded_name = relative
                .file_name()
                .is_some_and(|name| EXCLUDED_FILES.contains(&name.to_string_lossy().as_ref()));
            let matches_exclude = excludes
                .iter()
                .any(|pattern| pattern.matches_path(relative));

            if !in_excluded_dir && !excluded_name && !matches_exclude {
                files.push(path);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

fn write_zip(
    root: &Path,
    dest: &Path,
    archive: &ArchiveConfig,
    files: &[PathBuf],
) -> anyhow::Result<u64> {
    let mut writer = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

    let mut bytes = 0u64;
    for path in files {
        let relative = path.strip_prefix(root).unwrap_or(path);
        let name = match &archive.root_folder {
            Some(folder) => Path::new(folder).join(relative),
            None => relative.to_path_buf(),
        };

        writer.start_file(name.to_string_lossy().replace('\\', "/"), options)?;
        let content = std::fs::read(path)?;
        bytes += content.len() as u64;
        writer.write_all(&content)?;
    }

    writer.finish()?;
    Ok(bytes)
}
