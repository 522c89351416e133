// ABOUTME: Client for the upload daemon's delete endpoint
// ABOUTME: Sends ledger records back to PicList so it can remove the remote images

use anyhow::{Context, Result};
use reqwest::{header, Client as HttpClient};
use serde::Deserialize;
use serde_json::json;

use crate::ledger::UploadedImageRecord;

#[derive(Debug, Deserialize)]
pub struct DeleteResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub msg: Option<String>,
}

pub struct PicGoDeleter {
    http_client: HttpClient,
    endpoint: String,
}

impl PicGoDeleter {
    pub fn new(endpoint: &str) -> Self {
        Self {
            http_client: HttpClient::new(),
            endpoint: endpoint.to_string(),
        }
    }

    pub async fn delete_images(&self, records: &[UploadedImageRecord]) -> Result<DeleteResponse> {
        let response = self.http_client
            .post(&self.endpoint)
            .header(header::CONTENT_TYPE, "application/json")
            .body(json!({ "list": records }).to_string())
            .send()
            .await
            .context("Failed to reach delete server")?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            anyhow::bail!("Delete server error: {} - {}", status, body);
        }

        serde_json::from_str(&body).context("Failed to parse delete server response")
    }
}
