// ABOUTME: Configuration management for imgup
// ABOUTME: Handles XDG directories, settings file parsing, and backend settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the XDG config directory for imgup
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .context("Could not determine config directory")?
        .join("imgup");

    fs::create_dir_all(&config_dir)
        .context("Failed to create config directory")?;

    Ok(config_dir)
}

/// Get the XDG data directory for imgup
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .context("Could not determine data directory")?
        .join("imgup");

    fs::create_dir_all(&data_dir)
        .context("Failed to create data directory")?;

    Ok(data_dir)
}

/// Default location of the settings file
pub fn default_config_path() -> Result<PathBuf> {
    Ok(get_config_dir()?.join("config.toml"))
}

/// Default location of the uploaded-image ledger
pub fn default_ledger_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join("uploaded_images.json"))
}

/// Which backend receives uploads
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum UploaderKind {
    #[default]
    #[serde(rename = "PicGo")]
    PicGo,
    #[serde(rename = "PicGo-Core")]
    PicGoCore,
    #[serde(rename = "Blog")]
    Blog,
    #[serde(rename = "GitHub")]
    GitHub,
    #[serde(rename = "Gitee")]
    Gitee,
    #[serde(rename = "Tencent")]
    Tencent,
}

/// How the alt text of a rewritten image is built
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ImageDesc {
    #[default]
    Origin,
    None,
    RemoveDefault,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct BlogSettings {
    pub blog_url: String,
    pub blog_id: String,
    pub blog_user_name: String,
    pub blog_password: String,
}

/// Shared by the GitHub and Gitee content APIs
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct RepoSettings {
    pub repo: String,
    pub branch: String,
    pub token: String,
    pub path: String,
    pub custom_url: String,
    /// Overrides the provider's public API root (enterprise installs)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,
}

impl Default for RepoSettings {
    fn default() -> Self {
        Self {
            repo: String::new(),
            branch: "master".to_string(),
            token: String::new(),
            path: "pics/".to_string(),
            custom_url: String::new(),
            api_url: None,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct TencentSettings {
    pub secret_id: String,
    pub secret_key: String,
    pub region: String,
    pub bucket_name: String,
    pub path: String,
}

impl Default for TencentSettings {
    fn default() -> Self {
        Self {
            secret_id: String::new(),
            secret_key: String::new(),
            region: "ap-guangzhou".to_string(),
            bucket_name: String::new(),
            path: "/".to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub upload_by_clip_switch: bool,
    pub uploader: UploaderKind,
    pub upload_server: String,
    pub delete_server: String,
    pub picgo_core_path: String,
    #[serde(rename = "workOnNetWork")]
    pub work_on_network: bool,
    #[serde(rename = "newWorkBlackDomains")]
    pub network_black_domains: String,
    pub fix_path: bool,
    pub apply_image: bool,
    pub delete_source: bool,
    pub image_desc: ImageDesc,
    pub image_size_suffix: String,
    pub rename: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_folder: Option<String>,
    pub blog_setting: BlogSettings,
    pub github_setting: RepoSettings,
    pub gitee_setting: RepoSettings,
    pub tencent_setting: TencentSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            upload_by_clip_switch: true,
            uploader: UploaderKind::PicGo,
            upload_server: "http://127.0.0.1:36677/upload".to_string(),
            delete_server: "http://127.0.0.1:36677/delete".to_string(),
            picgo_core_path: String::new(),
            work_on_network: false,
            network_black_domains: String::new(),
            fix_path: false,
            apply_image: true,
            delete_source: false,
            image_desc: ImageDesc::Origin,
            image_size_suffix: String::new(),
            rename: true,
            attachment_folder: None,
            blog_setting: BlogSettings::default(),
            github_setting: RepoSettings::default(),
            gitee_setting: RepoSettings {
                path: "imgs/".to_string(),
                ..RepoSettings::default()
            },
            tencent_setting: TencentSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from the default location, or defaults if absent
    pub fn load() -> Result<Self> {
        Self::load_from(&default_config_path()?)
    }

    /// Load settings from an explicit file, or defaults if it does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .context("Failed to read config file")?;
            let settings: Settings = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file {}", path.display()))?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to the default location
    pub fn save(&self) -> Result<()> {
        self.save_to(&default_config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }
        let contents = toml::to_string_pretty(self)
            .context("Failed to serialize config")?;
        fs::write(path, contents)
            .context("Failed to write config file")?;
        Ok(())
    }

    /// The CLI uploader binary, `picgo` unless overridden
    pub fn picgo_core_command(&self) -> &str {
        let path = self.picgo_core_path.trim();
        if path.is_empty() {
            "picgo"
        } else {
            path
        }
    }
}
