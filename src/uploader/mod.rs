// ABOUTME: Upload backends behind one capability interface
// ABOUTME: Dispatches to the configured backend and implements the shared per-file upload loop

pub mod blog;
pub mod cos;
pub mod forge;
pub mod picgo;
pub mod picgo_core;

use anyhow::{Context, Result};
use reqwest::Client as HttpClient;
use serde_json::Value;
use std::path::Path;

use crate::config::{Settings, UploaderKind};
use crate::extract::{is_remote, url_asset};

pub use blog::BlogUploader;
pub use cos::CosUploader;
pub use forge::{Forge, ForgeUploader};
pub use picgo::PicGoUploader;
pub use picgo_core::PicGoCoreUploader;

/// One uploaded input; `index` is its position in the list given to `upload_files`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedItem {
    pub index: usize,
    pub url: String,
}

/// Result of a successful batch; inputs may be missing but never reordered
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadBatch {
    pub items: Vec<UploadedItem>,
    /// Extended per-file metadata reported by the upload daemon
    pub full_result: Vec<Value>,
}

impl UploadBatch {
    /// Pair URLs with inputs in order, as backends that answer with a plain list do
    pub fn from_urls(urls: Vec<String>) -> Self {
        Self {
            items: urls
                .into_iter()
                .enumerate()
                .map(|(index, url)| UploadedItem { index, url })
                .collect(),
            full_result: Vec::new(),
        }
    }

    pub fn urls(&self) -> Vec<String> {
        self.items.iter().map(|i| i.url.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A file carried by a paste event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipboardFile {
    pub name: String,
    pub mime: String,
    pub data: Vec<u8>,
}

impl ClipboardFile {
    /// Build a clipboard file from a file on disk, guessing its MIME type
    pub fn from_path(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .context("Invalid filename")?
            .to_string();
        let mime = mime_guess::from_path(path).first_or_octet_stream().to_string();
        Ok(Self { name, mime, data })
    }

    pub fn is_image(&self) -> bool {
        self.mime.starts_with("image")
    }
}

/// What a paste event carries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClipboardPayload {
    pub text: Option<String>,
    pub files: Vec<ClipboardFile>,
}

impl ClipboardPayload {
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or_default()
    }

    /// True when the first file is an image
    pub fn has_image(&self) -> bool {
        self.files.first().map(ClipboardFile::is_image).unwrap_or(false)
    }
}

/// Successful clipboard upload
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClipboardUpload {
    pub url: String,
    pub full_result: Vec<Value>,
}

/// The configured upload backend
pub enum Uploader {
    PicGo(PicGoUploader),
    PicGoCore(PicGoCoreUploader),
    Blog(BlogUploader),
    GitHub(ForgeUploader),
    Gitee(ForgeUploader),
    Tencent(CosUploader),
}

impl Uploader {
    /// Select and build the backend named by `settings.uploader`
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let uploader = match settings.uploader {
            UploaderKind::PicGo => Uploader::PicGo(PicGoUploader::new(&settings.upload_server)),
            UploaderKind::PicGoCore => {
                Uploader::PicGoCore(PicGoCoreUploader::new(settings.picgo_core_command()))
            }
            UploaderKind::Blog => {
                Uploader::Blog(BlogUploader::new(settings.blog_setting.clone(), settings.rename))
            }
            UploaderKind::GitHub => Uploader::GitHub(ForgeUploader::new(
                Forge::GitHub,
                settings.github_setting.clone(),
                settings.rename,
            )),
            UploaderKind::Gitee => Uploader::Gitee(ForgeUploader::new(
                Forge::Gitee,
                settings.gitee_setting.clone(),
                settings.rename,
            )),
            UploaderKind::Tencent => Uploader::Tencent(
                CosUploader::new(settings.tencent_setting.clone(), settings.rename)
                    .context("Failed to configure Tencent COS")?,
            ),
        };
        Ok(uploader)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Uploader::PicGo(_) => "PicGo",
            Uploader::PicGoCore(_) => "PicGo-Core",
            Uploader::Blog(_) => "Blog",
            Uploader::GitHub(_) => "GitHub",
            Uploader::Gitee(_) => "Gitee",
            Uploader::Tencent(_) => "Tencent",
        }
    }

    /// Upload local paths or remote URLs, preserving input order
    pub async fn upload_files(&self, paths: &[String]) -> Result<UploadBatch> {
        tracing::debug!("Uploading {} file(s) with {}", paths.len(), self.name());
        match self {
            Uploader::PicGo(u) => u.upload_files(paths).await,
            Uploader::PicGoCore(u) => u.upload_files(paths).await,
            _ => self.upload_each(paths).await,
        }
    }

    /// Upload the image carried by a paste event
    pub async fn upload_by_clipboard(&self, payload: &ClipboardPayload) -> Result<ClipboardUpload> {
        match self {
            Uploader::PicGo(u) => u.upload_by_clipboard().await,
            Uploader::PicGoCore(u) => u.upload_by_clipboard().await,
            _ => {
                let mut urls = Vec::new();
                for file in &payload.files {
                    let name = format!("{}{}", current_timestamp(), extension_of(&file.name));
                    urls.push(self.put(&file.data, &name).await?);
                }
                let url = urls
                    .into_iter()
                    .next()
                    .context("Clipboard holds no file to upload")?;
                Ok(ClipboardUpload {
                    url,
                    full_result: Vec::new(),
                })
            }
        }
    }

    /// Shared loop for backends that take one file per request
    async fn upload_each(&self, paths: &[String]) -> Result<UploadBatch> {
        let client = HttpClient::new();
        let mut batch = UploadBatch::default();

        for (index, input) in paths.iter().enumerate() {
            let data = match read_input(&client, input).await {
                Ok(data) => data,
                Err(e) => {
                    tracing::warn!("Skipping {}: {:#}", input, e);
                    continue;
                }
            };

            let file_name = self.file_name_for(input);
            let url = self.put(&data, &file_name).await?;
            tracing::info!("Uploaded {} -> {}", input, url);
            batch.items.push(UploadedItem { index, url });
        }

        Ok(batch)
    }

    async fn put(&self, data: &[u8], file_name: &str) -> Result<String> {
        match self {
            Uploader::Blog(u) => u.upload(data, file_name).await,
            Uploader::GitHub(u) | Uploader::Gitee(u) => u.upload(data, file_name).await,
            Uploader::Tencent(u) => u.upload(data, file_name).await,
            Uploader::PicGo(_) | Uploader::PicGoCore(_) => {
                anyhow::bail!("{} uploads whole batches only", self.name())
            }
        }
    }

    fn rename(&self) -> bool {
        match self {
            Uploader::Blog(u) => u.rename,
            Uploader::GitHub(u) | Uploader::Gitee(u) => u.rename,
            Uploader::Tencent(u) => u.rename,
            Uploader::PicGo(_) | Uploader::PicGoCore(_) => false,
        }
    }

    fn file_name_for(&self, input: &str) -> String {
        upload_file_name(input, self.rename())
    }
}

/// Name an input is stored under: a timestamp plus extension, or its base name
pub fn upload_file_name(input: &str, rename: bool) -> String {
    let base = base_name(input);
    if rename {
        format!("{}{}", current_timestamp(), extension_of(&base))
    } else {
        base
    }
}

fn base_name(input: &str) -> String {
    if is_remote(input) {
        url_asset(input).to_string()
    } else {
        Path::new(input)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(input)
            .to_string()
    }
}

/// Extension including the dot, or empty
pub fn extension_of(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e))
        .unwrap_or_default()
}

/// Local time as `YYYYMMDDHHmmssSSS`
pub fn current_timestamp() -> String {
    chrono::Local::now().format("%Y%m%d%H%M%S%3f").to_string()
}

/// Object key under a configured folder prefix, without a leading slash
pub fn object_key(prefix: &str, file_name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        file_name.to_string()
    } else {
        format!("{}/{}", prefix, file_name)
    }
}

/// Bytes of a local file, or of a URL fetched first
async fn read_input(client: &HttpClient, input: &str) -> Result<Vec<u8>> {
    if is_remote(input) {
        fetch_bytes(client, input).await
    } else {
        tokio::fs::read(input)
            .await
            .with_context(|| format!("Failed to read {}", input))
    }
}

pub(crate) async fn fetch_bytes(client: &HttpClient, url: &str) -> Result<Vec<u8>> {
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to download {}", url))?;

    if !response.status().is_success() {
        anyhow::bail!("Download failed: {} {}", response.status(), url);
    }

    Ok(response.bytes().await?.to_vec())
}
