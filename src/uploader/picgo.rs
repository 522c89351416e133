// ABOUTME: Upload daemon backend (PicGo / PicList HTTP server)
// ABOUTME: Posts the path list as JSON; the daemon reads and uploads the files itself

use anyhow::{Context, Result};
use reqwest::{header, Client as HttpClient};
use serde::Deserialize;
use serde_json::{json, Value};

use super::{ClipboardUpload, UploadBatch};

#[derive(Debug, Deserialize)]
pub struct PicGoResponse {
    #[serde(default)]
    pub success: Value,
    #[serde(default)]
    pub msg: Option<String>,
    #[serde(default)]
    pub result: Value,
    #[serde(default, rename = "fullResult")]
    pub full_result: Option<Vec<Value>>,
}

impl PicGoResponse {
    /// Daemons report success as a bool, some builds as a string
    pub fn is_success(&self) -> bool {
        match &self.success {
            Value::Bool(b) => *b,
            Value::String(s) => s.eq_ignore_ascii_case("true"),
            _ => false,
        }
    }

    /// `result` is a list of URLs, or a single URL for clipboard uploads
    pub fn urls(&self) -> Vec<String> {
        match &self.result {
            Value::String(s) => vec![s.clone()],
            Value::Array(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(String::from))
                .collect(),
            _ => Vec::new(),
        }
    }

    fn message(&self) -> String {
        self.msg.clone().unwrap_or_else(|| "unknown error".to_string())
    }
}

pub struct PicGoUploader {
    http_client: HttpClient,
    endpoint: String,
}

impl PicGoUploader {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub async fn upload_files(&self, paths: &[String]) -> Result<UploadBatch> {
        let response = self.http_client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .body(json!({ "list": paths }).to_string())
            .send()
            .await
            .context("Failed to reach upload server")?;

        let data = Self::parse(response).await?;
        if !data.is_success() {
            anyhow::bail!("Upload failed: {}", data.message());
        }

        let mut batch = UploadBatch::from_urls(data.urls());
        batch.items.truncate(paths.len());
        batch.full_result = data.full_result.unwrap_or_default();
        Ok(batch)
    }

    /// The daemon uploads whatever is on the system clipboard
    pub async fn upload_by_clipboard(&self) -> Result<ClipboardUpload> {
        let response = self.http_client
            .post(&self.endpoint)
            .send()
            .await
            .context("Failed to reach upload server")?;

        let data = Self::parse(response).await?;
        let url = data
            .urls()
            .into_iter()
            .next()
            .with_context(|| format!("Upload failed: {}", data.message()))?;

        Ok(ClipboardUpload {
            url,
            full_result: data.full_result.unwrap_or_default(),
        })
    }

    async fn parse(response: reqwest::Response) -> Result<PicGoResponse> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let msg = serde_json::from_str::<PicGoResponse>(&body)
                .ok()
                .and_then(|r| r.msg)
                .unwrap_or(body);
            anyhow::bail!("Upload server error: {} - {}", status, msg);
        }

        serde_json::from_str(&body).context("Failed to parse upload server response")
    }
}
