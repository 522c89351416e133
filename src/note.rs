// ABOUTME: Markdown note loading, saving and front matter lookup
// ABOUTME: Front matter can override the auto-upload switch per note

use anyhow::{Context, Result};
use serde_yaml::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::editor::MemoryEditor;

/// Front matter key that overrides `uploadByClipSwitch` for one note
pub const AUTO_UPLOAD_KEY: &str = "image-auto-upload";

#[derive(Debug, Clone)]
pub struct Note {
    pub path: PathBuf,
    pub content: String,
}

impl Note {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read note {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            content,
        })
    }

    pub fn save(&self) -> Result<()> {
        fs::write(&self.path, &self.content)
            .with_context(|| format!("Failed to write note {}", self.path.display()))
    }

    pub fn editor(&self) -> MemoryEditor {
        MemoryEditor::new(self.content.clone())
    }

    /// Whether anything changed; writes only then
    pub fn save_if_changed(&mut self, content: String) -> Result<bool> {
        if content == self.content {
            return Ok(false);
        }
        self.content = content;
        self.save()?;
        Ok(true)
    }
}

/// Parse the YAML front matter block at the top of a document
pub fn frontmatter(content: &str) -> Option<serde_yaml::Mapping> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    // Split on --- delimiters
    let end = rest
        .find("\n---")
        .map(|i| i + 1)
        .or_else(|| rest.starts_with("---").then_some(0))?;
    let block = &rest[..end];

    match serde_yaml::from_str::<Value>(block) {
        Ok(Value::Mapping(map)) => Some(map),
        Ok(_) => None,
        Err(e) => {
            tracing::debug!("Ignoring malformed front matter: {}", e);
            None
        }
    }
}

pub fn frontmatter_value(content: &str, key: &str) -> Option<Value> {
    frontmatter(content)?.get(key).cloned()
}

/// The note's `image-auto-upload` flag, falling back to the global switch
pub fn allow_upload(content: &str, default: bool) -> bool {
    match frontmatter_value(content, AUTO_UPLOAD_KEY) {
        Some(Value::Bool(b)) => b,
        Some(Value::String(s)) => s.eq_ignore_ascii_case("true"),
        _ => default,
    }
}
