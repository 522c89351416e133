// ABOUTME: Classifies image references as local files or remote URLs
// ABOUTME: Applies the network switch and domain blocklist, and resolves local locators via the vault

use std::path::PathBuf;
use url::Url;

use crate::config::Settings;
use crate::extract::{is_image_path, ImageReference};
use crate::vault::{join_normalized, parent_of, Vault};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageSource {
    /// Absolute path of an existing file
    Local(PathBuf),
    Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub reference: ImageReference,
    pub source: ImageSource,
}

impl ResolvedImage {
    /// What gets handed to the uploader: a file path or a URL
    pub fn upload_input(&self) -> String {
        match &self.source {
            ImageSource::Local(path) => path.to_string_lossy().into_owned(),
            ImageSource::Remote(url) => url.clone(),
        }
    }

    pub fn is_local(&self) -> bool {
        matches!(self.source, ImageSource::Local(_))
    }
}

/// Whether the URL's host contains any of the comma-separated blocked domains
pub fn has_black_domain(src: &str, black_domains: &str) -> bool {
    if black_domains.trim().is_empty() {
        return false;
    }

    let host = match Url::parse(src) {
        Ok(url) => match url.host_str() {
            Some(host) => host.to_string(),
            None => return false,
        },
        Err(_) => return false,
    };

    black_domains
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .any(|d| host.contains(d))
}

/// Drop remote references unless network uploads are enabled and the host is not blocked
pub fn filter_references(refs: Vec<ImageReference>, settings: &Settings) -> Vec<ImageReference> {
    refs.into_iter()
        .filter(|r| {
            if !r.is_remote() {
                return true;
            }
            settings.work_on_network && !has_black_domain(&r.path, &settings.network_black_domains)
        })
        .collect()
}

/// Resolve a reference relative to the note at `note_rel` (vault-relative).
///
/// Local lookups try, in order: the locator as a vault path, the locator
/// relative to the note's folder (only for `./` and `../` locators), and
/// finally the first file in the vault with the same base name. Anything
/// that does not land on an image file is dropped.
pub fn resolve(reference: &ImageReference, note_rel: &str, vault: &Vault) -> Option<ResolvedImage> {
    if reference.is_remote() {
        return Some(ResolvedImage {
            reference: reference.clone(),
            source: ImageSource::Remote(reference.path.clone()),
        });
    }

    let locator = reference.path.as_str();
    let mut found = vault.get_by_path(locator.trim_start_matches('/'));

    if found.is_none() && (locator.starts_with("./") || locator.starts_with("../")) {
        found = join_normalized(parent_of(note_rel), locator)
            .and_then(|rel| vault.get_by_path(&rel));
    }

    if found.is_none() {
        let name = locator.rsplit('/').next().unwrap_or(locator);
        found = vault.get_by_name(name);
    }

    let rel = found?;
    if !is_image_path(rel) {
        tracing::debug!("Skipping non-image file {}", rel);
        return None;
    }

    Some(ResolvedImage {
        reference: reference.clone(),
        source: ImageSource::Local(vault.full_path(rel)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(path: &str) -> ImageReference {
        ImageReference {
            source: format!("![x]({})", path),
            name: "x".to_string(),
            path: path.to_string(),
        }
    }

    #[test]
    fn test_black_domain_substring_on_host() {
        let list = "evil.com,spam.net";
        assert!(has_black_domain("https://cdn.evil.com/a.png", list));
        assert!(has_black_domain("http://spam.net/b.jpg", list));
        assert!(!has_black_domain("https://good.com/evil.com.png", list));
    }

    #[test]
    fn test_empty_blocklist_blocks_nothing() {
        assert!(!has_black_domain("https://evil.com/a.png", ""));
        assert!(!has_black_domain("https://evil.com/a.png", "  "));
        assert!(!has_black_domain("https://evil.com/a.png", ",,"));
    }

    #[test]
    fn test_filter_respects_network_switch() {
        let refs = vec![
            reference("./a.png"),
            reference("https://cdn.evil.com/b.png"),
            reference("https://good.com/c.png"),
        ];

        let mut settings = Settings::default();
        let kept = filter_references(refs.clone(), &settings);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].path, "./a.png");

        settings.work_on_network = true;
        settings.network_black_domains = "evil.com".to_string();
        let kept = filter_references(refs, &settings);
        let paths: Vec<_> = kept.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["./a.png", "https://good.com/c.png"]);
    }
}
