// ABOUTME: Persistent ledger of uploaded images reported by the upload daemon
// ABOUTME: Records are kept verbatim so they can be sent back to the delete endpoint

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};

/// One uploaded image as reported in the daemon's `fullResult`
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct UploadedImageRecord {
    #[serde(rename = "imgUrl")]
    pub img_url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl UploadedImageRecord {
    /// Build a record from a raw `fullResult` entry; entries without `imgUrl` are ignored
    pub fn from_value(value: Value) -> Option<Self> {
        serde_json::from_value(value).ok()
    }
}

#[derive(Debug, Clone)]
pub struct Ledger {
    path: PathBuf,
    pub records: Vec<UploadedImageRecord>,
}

impl Ledger {
    /// Load the ledger, starting empty if the file does not exist
    pub fn load(path: &Path) -> Result<Self> {
        let records = if path.exists() {
            let contents = fs::read_to_string(path)
                .context("Failed to read uploaded image ledger")?;
            if contents.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse ledger {}", path.display()))?
            }
        } else {
            Vec::new()
        };

        Ok(Self {
            path: path.to_path_buf(),
            records,
        })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create ledger directory")?;
        }
        let contents = serde_json::to_string_pretty(&self.records)
            .context("Failed to serialize ledger")?;
        fs::write(&self.path, contents)
            .context("Failed to write ledger")?;
        Ok(())
    }

    /// Append raw daemon metadata, returning how many records were added
    pub fn append(&mut self, full_result: Vec<Value>) -> usize {
        let before = self.records.len();
        self.records
            .extend(full_result.into_iter().filter_map(UploadedImageRecord::from_value));
        self.records.len() - before
    }

    pub fn find(&self, img_url: &str) -> Option<&UploadedImageRecord> {
        self.records.iter().find(|r| r.img_url == img_url)
    }

    /// Remove every record for the URL
    pub fn remove(&mut self, img_url: &str) {
        self.records.retain(|r| r.img_url != img_url);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_append_keeps_backend_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let mut ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();

        let added = ledger.append(vec![
            json!({"imgUrl": "https://cdn.example.com/a.png", "type": "smms", "hash": "abc"}),
            json!({"fileName": "no-url.png"}),
        ]);

        assert_eq!(added, 1);
        let record = ledger.find("https://cdn.example.com/a.png").unwrap();
        assert_eq!(record.extra.get("hash"), Some(&json!("abc")));

        let serialized = serde_json::to_value(record).unwrap();
        assert_eq!(serialized["imgUrl"], "https://cdn.example.com/a.png");
        assert_eq!(serialized["type"], "smms");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ledger.json");

        let mut ledger = Ledger::load(&path).unwrap();
        ledger.append(vec![json!({"imgUrl": "https://x/1.png"})]);
        ledger.save().unwrap();

        let mut loaded = Ledger::load(&path).unwrap();
        assert_eq!(loaded.len(), 1);

        loaded.remove("https://x/1.png");
        assert!(loaded.is_empty());
    }
}
