// ABOUTME: Upload flows that tie extraction, resolution, uploading and document patching together
// ABOUTME: Whole-note upload, single-file upload, paste and drop handling against one editor

use anyhow::{Context, Result};
use serde_json::Value;
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::Settings;
use crate::editor::Editor;
use crate::extract::{extract, is_image_path, ImageReference};
use crate::ledger::Ledger;
use crate::note::allow_upload;
use crate::patch::{
    apply_replacements, embed_image, handle_name, insert_placeholder, mark_failed,
    markdown_image, random_id, set_value_preserving_view,
};
use crate::resolve::{filter_references, has_black_domain, resolve, ImageSource, ResolvedImage};
use crate::uploader::{ClipboardPayload, Uploader};
use crate::vault::Vault;

/// Everything one command needs: settings, ledger, vault index and backend
pub struct Session {
    pub settings: Settings,
    pub ledger: Ledger,
    pub vault: Vault,
    pub uploader: Uploader,
}

/// Outcome counts for a batch operation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Summary {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl Summary {
    pub fn new(total: usize, success: usize) -> Self {
        Self {
            total,
            success,
            failed: total.saturating_sub(success),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "all: {}, success: {}, failed: {}", self.total, self.success, self.failed)
    }
}

/// What happened to the image part of a paste
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClipboardOutcome {
    Uploaded(String),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PasteReport {
    /// False when the paste was left to the default text insertion
    pub handled: bool,
    /// Remote images found in the pasted text, if any were uploaded
    pub network: Option<Summary>,
    pub image: Option<ClipboardOutcome>,
}

impl Session {
    /// Build the backend named in `settings` and bundle it with the rest
    pub fn new(settings: Settings, ledger: Ledger, vault: Vault) -> Result<Self> {
        let uploader = Uploader::from_settings(&settings)?;
        Ok(Self::with_uploader(settings, ledger, vault, uploader))
    }

    pub fn with_uploader(
        settings: Settings,
        ledger: Ledger,
        vault: Vault,
        uploader: Uploader,
    ) -> Self {
        Self {
            settings,
            ledger,
            vault,
            uploader,
        }
    }

    /// Upload every local (and, when enabled, remote) image in the note and rewrite its links
    pub async fn upload_all<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        note_rel: &str,
    ) -> Result<Summary> {
        let candidates = filter_references(extract(&editor.value()), &self.settings);
        let total = candidates.len();

        let resolved: Vec<ResolvedImage> = candidates
            .iter()
            .filter_map(|r| {
                let found = resolve(r, note_rel, &self.vault);
                if found.is_none() {
                    tracing::debug!("No file found for {}", r.path);
                }
                found
            })
            .collect();

        let images = dedupe_spans(resolved);
        if images.is_empty() {
            tracing::info!("No image files found in {}", note_rel);
            return Ok(Summary::new(total, 0));
        }

        let inputs: Vec<String> = images.iter().map(ResolvedImage::upload_input).collect();
        let batch = self.uploader.upload_files(&inputs).await?;

        let mut replacements = Vec::new();
        let mut uploaded_sources = HashSet::new();
        let mut uploaded_files = Vec::new();

        for item in &batch.items {
            let Some(image) = images.get(item.index) else {
                tracing::warn!("Upload result for unknown input #{}", item.index);
                continue;
            };
            let name = handle_name(&image.reference.name, &self.settings);
            replacements.push((image.reference.source.clone(), markdown_image(&name, &item.url)));
            uploaded_sources.insert(image.reference.source.clone());
            if let ImageSource::Local(path) = &image.source {
                uploaded_files.push(path.clone());
            }
        }

        let value = editor.value();
        let patched = apply_replacements(&value, &replacements);
        if patched != value {
            set_value_preserving_view(editor, &patched);
        }
        self.record(batch.full_result);

        if self.settings.delete_source {
            remove_sources(&uploaded_files).await;
        }

        let success = candidates
            .iter()
            .filter(|r| uploaded_sources.contains(&r.source))
            .count();
        Ok(Summary::new(total, success))
    }

    /// Upload one image file and point every reference to it at the new URL
    pub async fn upload_file<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        image: &Path,
    ) -> Result<Summary> {
        if !is_image_path(image) {
            anyhow::bail!("{} is not an image file", image.display());
        }
        let file_name = image
            .file_name()
            .and_then(|n| n.to_str())
            .context("Invalid filename")?
            .to_string();
        let image = image
            .canonicalize()
            .with_context(|| format!("Failed to find {}", image.display()))?;

        let mut seen = HashSet::new();
        let matches: Vec<ImageReference> = extract(&editor.value())
            .into_iter()
            .filter(|r| !r.is_remote())
            .filter(|r| r.path.rsplit('/').next() == Some(file_name.as_str()))
            .filter(|r| seen.insert(r.source.clone()))
            .collect();

        if matches.is_empty() {
            tracing::info!("No references to {} found", file_name);
            return Ok(Summary::default());
        }

        let batch = self
            .uploader
            .upload_files(&[image.to_string_lossy().into_owned()])
            .await?;

        let Some(url) = batch.items.first().map(|i| i.url.clone()) else {
            self.record(batch.full_result);
            return Ok(Summary::new(matches.len(), 0));
        };

        let replacements: Vec<(String, String)> = matches
            .iter()
            .map(|r| {
                let name = handle_name(&r.name, &self.settings);
                (r.source.clone(), markdown_image(&name, &url))
            })
            .collect();

        let value = editor.value();
        let patched = apply_replacements(&value, &replacements);
        if patched != value {
            set_value_preserving_view(editor, &patched);
        }
        self.record(batch.full_result);

        if self.settings.delete_source {
            remove_sources(&[image]).await;
        }

        Ok(Summary::new(matches.len(), matches.len()))
    }

    /// Handle a paste event in the editor
    pub async fn handle_paste<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        payload: &ClipboardPayload,
    ) -> Result<PasteReport> {
        if !allow_upload(&editor.value(), self.settings.upload_by_clip_switch) {
            editor.replace_selection(payload.text());
            return Ok(PasteReport::default());
        }

        let upload_image =
            payload.has_image() && (payload.text().is_empty() || self.settings.apply_image);
        let mut report = PasteReport {
            handled: true,
            ..PasteReport::default()
        };

        if !upload_image {
            editor.replace_selection(payload.text());
        }

        if self.settings.work_on_network {
            report.network = self.upload_pasted_links(editor, payload.text()).await?;
        }

        if upload_image {
            let id = random_id();
            insert_placeholder(editor, &id);
            let name = payload
                .files
                .first()
                .map(|f| f.name.clone())
                .unwrap_or_default();

            report.image = Some(match self.uploader.upload_by_clipboard(payload).await {
                Ok(upload) => {
                    embed_image(editor, &id, &upload.url, &name, &self.settings);
                    self.record(upload.full_result);
                    ClipboardOutcome::Uploaded(upload.url)
                }
                Err(e) => {
                    tracing::error!("Clipboard upload failed: {:#}", e);
                    mark_failed(editor, &id);
                    ClipboardOutcome::Failed(format!("{:#}", e))
                }
            });
        }

        Ok(report)
    }

    /// Handle files dropped onto the editor; `None` when the drop is not an image drop
    pub async fn handle_drop<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        files: &[PathBuf],
    ) -> Result<Option<Summary>> {
        if !allow_upload(&editor.value(), self.settings.upload_by_clip_switch) {
            return Ok(None);
        }
        let Some(first) = files.first() else {
            return Ok(None);
        };
        let is_image = mime_guess::from_path(first)
            .first()
            .map(|m| m.essence_str().starts_with("image/"))
            .unwrap_or(false);
        if !is_image {
            return Ok(None);
        }

        let inputs: Vec<String> = files
            .iter()
            .map(|f| f.canonicalize().unwrap_or_else(|_| f.clone()).to_string_lossy().into_owned())
            .collect();
        let batch = self.uploader.upload_files(&inputs).await?;

        let name = first
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default()
            .to_string();
        for item in &batch.items {
            let id = random_id();
            insert_placeholder(editor, &id);
            embed_image(editor, &id, &item.url, &name, &self.settings);
        }
        let uploaded = batch.items.len();
        self.record(batch.full_result);

        Ok(Some(Summary::new(files.len(), uploaded)))
    }

    /// Upload the remote images found in pasted text and relink them in the document
    async fn upload_pasted_links<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        text: &str,
    ) -> Result<Option<Summary>> {
        let mut seen = HashSet::new();
        let links: Vec<ImageReference> = extract(text)
            .into_iter()
            .filter(|r| r.is_remote())
            .filter(|r| !has_black_domain(&r.path, &self.settings.network_black_domains))
            .filter(|r| seen.insert(r.source.clone()))
            .collect();

        if links.is_empty() {
            return Ok(None);
        }

        let inputs: Vec<String> = links.iter().map(|r| r.path.clone()).collect();
        let batch = match self.uploader.upload_files(&inputs).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!("Upload error: {:#}", e);
                return Ok(Some(Summary::new(links.len(), 0)));
            }
        };

        let replacements: Vec<(String, String)> = batch
            .items
            .iter()
            .filter_map(|item| {
                let link = links.get(item.index)?;
                let name = handle_name(&link.name, &self.settings);
                Some((link.source.clone(), markdown_image(&name, &item.url)))
            })
            .collect();

        let value = editor.value();
        let patched = apply_replacements(&value, &replacements);
        if patched != value {
            set_value_preserving_view(editor, &patched);
        }
        self.record(batch.full_result);

        Ok(Some(Summary::new(links.len(), replacements.len())))
    }

    /// Append the daemon's per-file metadata to the ledger.
    ///
    /// Runs after the document is patched. A failed save is logged and the
    /// records stay in memory, so the new URLs are never lost from the note.
    fn record(&mut self, full_result: Vec<Value>) {
        if full_result.is_empty() {
            return;
        }
        let added = self.ledger.append(full_result);
        tracing::debug!("Recorded {} uploaded image(s)", added);
        if let Err(e) = self.ledger.save() {
            tracing::warn!("Failed to save upload ledger: {:#}", e);
        }
    }
}

/// Keep the first image for each distinct source span
fn dedupe_spans(images: Vec<ResolvedImage>) -> Vec<ResolvedImage> {
    let mut seen = HashSet::new();
    images
        .into_iter()
        .filter(|i| seen.insert(i.reference.source.clone()))
        .collect()
}

/// Best-effort removal of uploaded source files
async fn remove_sources(paths: &[PathBuf]) {
    let mut seen = HashSet::new();
    for path in paths.iter().filter(|p| seen.insert(p.to_path_buf())) {
        match tokio::fs::remove_file(path).await {
            Ok(()) => tracing::info!("Deleted source {}", path.display()),
            Err(e) => tracing::debug!("Could not delete {}: {}", path.display(), e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(source: &str, path: &str) -> ResolvedImage {
        ResolvedImage {
            reference: ImageReference {
                source: source.to_string(),
                name: String::new(),
                path: path.to_string(),
            },
            source: ImageSource::Local(PathBuf::from(path)),
        }
    }

    #[test]
    fn test_dedupe_spans_keeps_first() {
        let images = vec![
            image("![](a.png)", "/v/a.png"),
            image("![](b.png)", "/v/b.png"),
            image("![](a.png)", "/v/a.png"),
        ];
        let unique = dedupe_spans(images);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[1].reference.source, "![](b.png)");
    }

    #[test]
    fn test_summary_counts_failures() {
        let summary = Summary::new(5, 3);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.to_string(), "all: 5, success: 3, failed: 2");
    }
}
