// ABOUTME: Image reference extraction from markdown text
// ABOUTME: Finds inline ![alt](target) and wiki ![[target|opts]] embeds with their source spans

use lazy_static::lazy_static;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::path::Path;

lazy_static! {
    // Local targets must carry an extension; remote targets may have any suffix.
    static ref INLINE_IMAGE_RE: Regex =
        Regex::new(r"!\[(.*?)\]\((\S+\.\w+)\)|!\[(.*?)\]\((https?://.*?)\)").unwrap();
    static ref WIKI_IMAGE_RE: Regex = Regex::new(r"!\[\[(.*?)(\s*?\|.*?)?\]\]").unwrap();
    static ref SELECTION_IMAGE_RE: Regex = Regex::new(r"!\[.*\]\((.*)\)").unwrap();
}

const IMAGE_EXTENSIONS: &[&str] = &[
    "png", "jpg", "jpeg", "bmp", "gif", "svg", "tiff", "webp", "avif",
];

/// An image reference as written in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Exact substring of the document; used as the replace key
    pub source: String,
    /// Alt text, or the wiki target's file stem plus its `|options`
    pub name: String,
    /// Path or URL; local paths are percent-decoded
    pub path: String,
}

impl ImageReference {
    pub fn is_remote(&self) -> bool {
        is_remote(&self.path)
    }
}

/// Extract every image reference, inline matches first, then wiki embeds
pub fn extract(text: &str) -> Vec<ImageReference> {
    let mut refs = Vec::new();

    for cap in INLINE_IMAGE_RE.captures_iter(text) {
        let source = cap.get(0).map(|m| m.as_str()).unwrap_or_default();
        let name = cap
            .get(1)
            .or_else(|| cap.get(3))
            .map(|m| m.as_str())
            .unwrap_or_default();
        let Some(target) = cap.get(2).or_else(|| cap.get(4)) else {
            continue;
        };

        refs.push(ImageReference {
            source: source.to_string(),
            name: name.to_string(),
            path: decode_locator(target.as_str()),
        });
    }

    for cap in WIKI_IMAGE_RE.captures_iter(text) {
        let source = cap.get(0).map(|m| m.as_str()).unwrap_or_default();
        let target = cap.get(1).map(|m| m.as_str()).unwrap_or_default();

        let mut name = Path::new(target)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_string();
        if let Some(options) = cap.get(2) {
            name.push_str(options.as_str());
        }

        refs.push(ImageReference {
            source: source.to_string(),
            name,
            path: decode_locator(target),
        });
    }

    refs
}

/// Whether a locator points at the network
pub fn is_remote(path: &str) -> bool {
    path.starts_with("http")
}

fn decode_locator(locator: &str) -> String {
    if is_remote(locator) {
        return locator.to_string();
    }
    percent_decode_str(locator)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| locator.to_string())
}

/// Check whether a path names an image file by its extension
pub fn is_image_path(path: impl AsRef<Path>) -> bool {
    path.as_ref()
        .extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// Last path segment of a URL, without query or fragment
pub fn url_asset(url: &str) -> &str {
    let tail = url.rsplit('/').next().unwrap_or(url);
    let tail = tail.split('?').next().unwrap_or(tail);
    tail.split('#').next().unwrap_or(tail)
}

/// URL of the first markdown image inside an editor selection
pub fn selected_image_url(selection: &str) -> Option<String> {
    SELECTION_IMAGE_RE
        .captures(selection)
        .and_then(|cap| cap.get(1))
        .map(|m| m.as_str().to_string())
}
