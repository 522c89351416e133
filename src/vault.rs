// ABOUTME: Vault file index used to resolve image locators to files on disk
// ABOUTME: Walks the vault root once, in sorted order, and indexes files by path and name

use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Settings;

/// Directory name marking the root of an Obsidian-style vault
const VAULT_MARKER: &str = ".obsidian";

#[derive(Debug, Clone)]
pub struct Vault {
    root: PathBuf,
    /// Vault-relative paths with `/` separators, in walk order
    files: Vec<String>,
    by_path: HashMap<String, usize>,
    by_name: HashMap<String, Vec<usize>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppConfig {
    attachment_folder_path: Option<String>,
}

impl Vault {
    /// Index every non-hidden file below `root`
    pub fn open(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("Vault root not found: {}", root.display()))?;

        let mut files = Vec::new();
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));

        for entry in walker {
            let entry = entry.context("Failed to walk vault")?;
            if !entry.file_type().is_file() {
                continue;
            }
            if let Ok(rel) = entry.path().strip_prefix(&root) {
                files.push(to_slash(rel));
            }
        }

        let mut by_path = HashMap::new();
        let mut by_name: HashMap<String, Vec<usize>> = HashMap::new();
        for (i, rel) in files.iter().enumerate() {
            by_path.insert(rel.clone(), i);
            let name = rel.rsplit('/').next().unwrap_or(rel).to_string();
            by_name.entry(name).or_default().push(i);
        }

        tracing::debug!("Indexed {} files under {}", files.len(), root.display());

        Ok(Self {
            root,
            files,
            by_path,
            by_name,
        })
    }

    /// Find the vault containing a note: the nearest ancestor holding `.obsidian`,
    /// else the note's own directory
    pub fn discover(note: &Path) -> Result<Self> {
        let note = note
            .canonicalize()
            .with_context(|| format!("Note not found: {}", note.display()))?;
        let parent = note.parent().context("Note has no parent directory")?;

        let root = parent
            .ancestors()
            .find(|dir| dir.join(VAULT_MARKER).is_dir())
            .unwrap_or(parent);

        Self::open(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn files(&self) -> &[String] {
        &self.files
    }

    /// Absolute path of a vault-relative path
    pub fn full_path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Vault-relative form of a path inside the vault
    pub fn relative_path(&self, path: &Path) -> Result<String> {
        let abs = if path.is_absolute() {
            path.to_path_buf()
        } else {
            std::env::current_dir()?.join(path)
        };
        let abs = abs.canonicalize().unwrap_or(abs);
        let rel = abs
            .strip_prefix(&self.root)
            .with_context(|| {
                format!("{} is outside the vault {}", path.display(), self.root.display())
            })?;
        Ok(to_slash(rel))
    }

    pub fn get_by_path(&self, rel: &str) -> Option<&str> {
        self.by_path.get(rel).map(|&i| self.files[i].as_str())
    }

    /// First file with this base name, in index order
    pub fn get_by_name(&self, name: &str) -> Option<&str> {
        let hits = self.by_name.get(name)?;
        if hits.len() > 1 {
            tracing::warn!(
                "{} files are named {}, using {}",
                hits.len(),
                name,
                self.files[hits[0]]
            );
        }
        hits.first().map(|&i| self.files[i].as_str())
    }

    /// Folder that downloaded images for a note are written to
    pub fn asset_folder(&self, note_rel: &str, settings: &Settings) -> PathBuf {
        let folder = settings
            .attachment_folder
            .clone()
            .or_else(|| self.app_attachment_folder())
            .unwrap_or_else(|| "/".to_string());

        if folder.starts_with("./") {
            let note_dir = parent_of(note_rel);
            self.root.join(note_dir).join(folder.trim_start_matches("./"))
        } else {
            self.root.join(folder.trim_start_matches('/'))
        }
    }

    fn app_attachment_folder(&self) -> Option<String> {
        let path = self.root.join(VAULT_MARKER).join("app.json");
        let contents = fs::read_to_string(path).ok()?;
        let config: AppConfig = serde_json::from_str(&contents).ok()?;
        config.attachment_folder_path
    }
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_str().map(|s| s.starts_with('.')).unwrap_or(false)
}

fn to_slash(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => part.to_str(),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Directory part of a vault-relative path (`""` at the root)
pub fn parent_of(rel: &str) -> &str {
    match rel.rfind('/') {
        Some(i) => &rel[..i],
        None => "",
    }
}

/// Join a relative locator onto a vault-relative directory, collapsing `.` and `..`.
/// Returns `None` when the result would leave the vault.
pub fn join_normalized(dir: &str, locator: &str) -> Option<String> {
    let mut parts: Vec<&str> = dir.split('/').filter(|p| !p.is_empty()).collect();
    for part in locator.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop()?;
            }
            other => parts.push(other),
        }
    }
    Some(parts.join("/"))
}
