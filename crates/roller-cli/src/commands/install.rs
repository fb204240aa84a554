// Copyright 2024-2026 The Roller Authors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dependency install and update commands.
//!
//! Declared sources land under `vendor/`: git sources are cloned (or
//! pulled on update), zip sources are downloaded and extracted.

use std::io::Cursor;
use std::path::Path;

use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use roller::config::InstallSource;

use super::{load_or_scaffold, project_root};

const VENDOR_DIR: &str = "vendor";

/// Runs the install command. `production` skips the dev-only sources;
/// `update` refreshes sources that are already present.
pub async fn run(production: bool, update: bool) -> anyhow::Result<()> {
    let root = project_root()?;
    let config = load_or_scaffold(&root)?;

    let mut sources: Vec<&InstallSource> = config.install.iter().collect();
    if !production {
        sources.extend(config.install_dev.iter());
    }

    if sources.is_empty() {
        println!("{}", style("Nothing to install").yellow());
        return Ok(());
    }

    let vendor = root.join(VENDOR_DIR);
    std::fs::create_dir_all(&vendor)?;

    for source in sources {
        install_source(&vendor, source, update).await?;
    }

    println!("{}", style("Install complete").green());
    Ok(())
}

async fn install_source(
    vendor: &Path,
    source: &InstallSource,
    update: bool,
) -> anyhow::Result<()> {
    match (&source.git, &source.url) {
        (Some(git), _) => install_git(vendor, git, &source.branch, update).await,
        (None, Some(url)) => install_zip(vendor, url, update).await,
        (None, None) => {
            println!(
                "{}",
                style("Skipping install source with neither git nor url").yellow()
            );
            Ok(())
        }
    }
}

/// Clones a git source, or pulls it when already present and updating.
async fn install_git(vendor: &Path, url: &str, branch: &str, update: bool) -> anyhow::Result<()> {
    let name = source_name(url);
    let target = vendor.join(&name);

    let spinner = progress(&format!("{name} ({branch})"));
    let status = if target.join(".git").exists() {
        if !update {
            spinner.finish_with_message(format!("{name} already installed"));
            return Ok(());
        }
        tokio::process::Command::new("git")
            .args(["pull", "origin", branch])
            .current_dir(&target)
            .output()
            .await?
    } else {
        tokio::process::Command::new("git")
            .args(["clone", "--depth", "1", "--single-branch", "--branch", branch, url])
            .arg(&target)
            .output()
            .await?
    };
    spinner.finish_and_clear();

    if !status.status.success() {
        anyhow::bail!(
            "git failed for {url}: {}",
            String::from_utf8_lossy(&status.stderr).trim()
        );
    }
    println!("{} {}", style("Installed").green(), style(name).bold());
    Ok(())
}

/// Downloads a zip source and extracts it under `vendor/<name>/`.
async fn install_zip(vendor: &Path, url: &str, update: bool) -> anyhow::Result<()> {
    let name = source_name(url);
    let target = vendor.join(&name);

    if target.exists() {
        if !update {
            println!("{}", style(format!("{name} already installed")).dim());
            return Ok(());
        }
        // Updating replaces the extracted tree rather than merging into it.
        std::fs::remove_dir_all(&target)?;
    }

    let spinner = progress(&format!("downloading {name}"));
    let response = reqwest::get(url).await?.error_for_status()?;
    let bytes = response.bytes().await?;
    spinner.finish_and_clear();

    let target_for_extract = target.clone();
    tokio::task::spawn_blocking(move || -> anyhow::Result<()> {
        let mut zip = zip::ZipArchive::new(Cursor::new(bytes))?;
        zip.extract(&target_for_extract)?;
        Ok(())
    })
    .await??;

    println!("{} {}", style("Installed").green(), style(name).bold());
    Ok(())
}

/// Last path segment of the source URL, without `.git` or `.zip`.
fn source_name(url: &str) -> String {
    let last = url
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or("dependency");
    last.trim_end_matches(".git")
        .trim_end_matches(".zip")
        .to_string()
}

fn progress(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(std::time::Duration::from_millis(100));
    spinner
}
