// ABOUTME: Source-hosting backends (GitHub and Gitee content APIs)
// ABOUTME: Commits each image as a new file and returns its download or CDN URL

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::{header, Client as HttpClient};
use serde_json::{json, Value};

use super::object_key;
use crate::config::RepoSettings;

/// Characters escaped inside one URL path segment
const SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forge {
    GitHub,
    Gitee,
}

impl Forge {
    pub fn default_api_url(&self) -> &'static str {
        match self {
            Forge::GitHub => "https://api.github.com",
            Forge::Gitee => "https://gitee.com/api/v5",
        }
    }
}

pub struct ForgeUploader {
    http_client: HttpClient,
    forge: Forge,
    settings: RepoSettings,
    pub(crate) rename: bool,
}

impl ForgeUploader {
    pub fn new(forge: Forge, settings: RepoSettings, rename: bool) -> Self {
        Self {
            http_client: HttpClient::new(),
            forge,
            settings,
            rename,
        }
    }

    /// Contents API URL for a repository path
    pub fn contents_url(&self, key: &str) -> String {
        let api = self
            .settings
            .api_url
            .as_deref()
            .unwrap_or_else(|| self.forge.default_api_url())
            .trim_end_matches('/');
        let encoded: Vec<String> = key
            .split('/')
            .map(|segment| utf8_percent_encode(segment, SEGMENT).to_string())
            .collect();
        format!("{}/repos/{}/contents/{}", api, self.settings.repo.trim(), encoded.join("/"))
    }

    pub async fn upload(&self, data: &[u8], file_name: &str) -> Result<String> {
        if self.settings.repo.trim().is_empty() {
            anyhow::bail!("No repository configured for {:?}", self.forge);
        }

        let key = object_key(&self.settings.path, file_name);
        let url = self.contents_url(&key);

        let mut body = json!({
            "message": format!("Upload {}", key),
            "branch": self.settings.branch,
            "content": STANDARD.encode(data),
        });

        let request = match self.forge {
            Forge::GitHub => self.http_client
                .put(&url)
                .header(header::AUTHORIZATION, format!("token {}", self.settings.token))
                .header(header::ACCEPT, "application/vnd.github+json")
                .header(header::USER_AGENT, concat!("imgup/", env!("CARGO_PKG_VERSION"))),
            Forge::Gitee => {
                body["access_token"] = Value::String(self.settings.token.clone());
                self.http_client.post(&url)
            }
        };

        let response = request
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.to_string())
            .send()
            .await
            .with_context(|| format!("Failed to reach {:?} API", self.forge))?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("{:?} upload failed: HTTP {}\n{}", self.forge, status, text);
        }

        let reply: Value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {:?} response", self.forge))?;
        self.image_url(&reply)
    }

    /// The file's download URL, or the custom prefix plus its repository path
    fn image_url(&self, reply: &Value) -> Result<String> {
        let content = reply.get("content").context("Response has no content")?;
        let custom = self.settings.custom_url.trim();

        if custom.is_empty() {
            content
                .get("download_url")
                .and_then(Value::as_str)
                .map(String::from)
                .context("Response has no download_url")
        } else {
            let path = content
                .get("path")
                .and_then(Value::as_str)
                .context("Response has no path")?;
            Ok(format!("{}{}", custom, path))
        }
    }
}
