// ABOUTME: Command-line uploader backend (PicGo-Core)
// ABOUTME: Runs `picgo upload <paths>` and reads the resulting URLs from the tail of its output

use anyhow::{Context, Result};
use tokio::process::Command;

use super::{ClipboardUpload, UploadBatch};

/// Printed by the CLI on failure; its exit status is not reliable
pub const ERROR_MARKER: &str = "PicGo ERROR";

pub struct PicGoCoreUploader {
    command: String,
}

struct CommandOutput {
    stdout: String,
    combined: String,
}

impl PicGoCoreUploader {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }

    pub async fn upload_files(&self, paths: &[String]) -> Result<UploadBatch> {
        let output = self.run(paths).await?;

        if output.combined.contains(ERROR_MARKER) {
            tracing::debug!("{} output:\n{}", self.command, output.combined);
            anyhow::bail!("Upload failed: {}", last_error_line(&output.combined));
        }

        let urls = tail_lines(&output.stdout, paths.len())
            .with_context(|| {
                format!("Unexpected output from {}:\n{}", self.command, output.stdout)
            })?;
        Ok(UploadBatch::from_urls(urls))
    }

    /// With no paths the CLI uploads the clipboard image
    pub async fn upload_by_clipboard(&self) -> Result<ClipboardUpload> {
        let output = self.run(&[]).await?;

        let url = last_url(&output.stdout).with_context(|| {
            format!("Please check PicGo-Core config\n{}", output.combined)
        })?;

        Ok(ClipboardUpload {
            url,
            full_result: Vec::new(),
        })
    }

    async fn run(&self, paths: &[String]) -> Result<CommandOutput> {
        let output = Command::new(&self.command)
            .arg("upload")
            .args(paths)
            .output()
            .await
            .with_context(|| format!("Failed to run {}", self.command))?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr);
        let combined = format!("{}{}", stdout, stderr);

        Ok(CommandOutput { stdout, combined })
    }
}

/// The last `n` lines, ignoring trailing blank lines
fn tail_lines(output: &str, n: usize) -> Option<Vec<String>> {
    let lines: Vec<&str> = output.trim_end().lines().collect();
    if lines.len() < n {
        return None;
    }
    Some(
        lines[lines.len() - n..]
            .iter()
            .map(|l| l.trim().to_string())
            .collect(),
    )
}

fn last_url(output: &str) -> Option<String> {
    output
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| l.starts_with("http"))
        .map(String::from)
}

fn last_error_line(output: &str) -> &str {
    output
        .lines()
        .rev()
        .find(|l| l.contains(ERROR_MARKER))
        .unwrap_or(ERROR_MARKER)
        .trim()
}

/// Import PATH from the user's login shell so a GUI-launched process finds `picgo`
#[cfg(unix)]
pub fn fix_path() -> Result<()> {
    const MARKER: &str = "__IMGUP_PATH__";

    let shell = std::env::var("SHELL").unwrap_or_else(|_| "/bin/sh".to_string());
    let output = std::process::Command::new(&shell)
        .arg("-ilc")
        .arg(format!("echo {}\"$PATH\"{}", MARKER, MARKER))
        .output()
        .with_context(|| format!("Failed to run {}", shell))?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    let path = stdout
        .split(MARKER)
        .nth(1)
        .filter(|p| !p.is_empty())
        .context("Login shell did not report a PATH")?;

    tracing::debug!("PATH from {}: {}", shell, path);
    std::env::set_var("PATH", path);
    Ok(())
}

#[cfg(not(unix))]
pub fn fix_path() -> Result<()> {
    Ok(())
}
