// ABOUTME: Tencent Cloud COS object storage backend
// ABOUTME: Puts each image through the S3-compatible COS endpoint and returns its public URL

use anyhow::{Context, Result};
use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path as ObjectPath, ObjectStore};
use std::sync::Arc;

use super::object_key;
use crate::config::TencentSettings;

pub struct CosUploader {
    settings: TencentSettings,
    object_store: Arc<dyn ObjectStore>,
    pub(crate) rename: bool,
}

impl CosUploader {
    pub fn new(settings: TencentSettings, rename: bool) -> Result<Self> {
        if settings.bucket_name.trim().is_empty() {
            anyhow::bail!("No bucket configured (tencentSetting.bucketName)");
        }

        let store = AmazonS3Builder::new()
            .with_endpoint(bucket_host_url(&settings))
            .with_virtual_hosted_style_request(true)
            .with_bucket_name(settings.bucket_name.trim())
            .with_region(settings.region.trim())
            .with_access_key_id(&settings.secret_id)
            .with_secret_access_key(&settings.secret_key)
            .build()
            .context("Failed to build COS client")?;

        Ok(Self::with_object_store(settings, Arc::new(store), rename))
    }

    /// Use a custom object store (for testing)
    pub fn with_object_store(
        settings: TencentSettings,
        object_store: Arc<dyn ObjectStore>,
        rename: bool,
    ) -> Self {
        Self {
            settings,
            object_store,
            rename,
        }
    }

    pub async fn upload(&self, data: &[u8], file_name: &str) -> Result<String> {
        let key = object_key(&self.settings.path, file_name);
        let path = ObjectPath::from(key.as_str());

        self.object_store
            .put(&path, Bytes::copy_from_slice(data).into())
            .await
            .with_context(|| format!("Failed to put {} into COS", key))?;

        Ok(format!("{}/{}", bucket_host_url(&self.settings), path))
    }
}

/// `https://{bucket}.cos.{region}.myqcloud.com`
pub fn bucket_host_url(settings: &TencentSettings) -> String {
    format!(
        "https://{}.cos.{}.myqcloud.com",
        settings.bucket_name.trim(),
        settings.region.trim()
    )
}
