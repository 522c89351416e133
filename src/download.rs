// ABOUTME: Downloads every remote image in a note into the vault's attachment folder
// ABOUTME: Sniffs image types from content, picks collision-free names and relinks the note

use anyhow::{Context, Result};
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Client as HttpClient;
use std::collections::HashSet;
use std::path::{Component, Path};

use crate::editor::Editor;
use crate::extract::{extract, url_asset};
use crate::patch::{
    handle_name, markdown_image, random_id, replace_first, set_value_preserving_view,
};
use crate::uploader::fetch_bytes;
use crate::vault::parent_of;
use crate::workflow::{Session, Summary};

/// Characters `encodeURI` leaves alone
const URI: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

impl Session {
    /// Fetch each remote image into the attachment folder and point the note at the local copy
    pub async fn download_all<E: Editor + ?Sized>(
        &mut self,
        editor: &mut E,
        note_rel: &str,
    ) -> Result<Summary> {
        let folder = self.vault.asset_folder(note_rel, &self.settings);
        tokio::fs::create_dir_all(&folder)
            .await
            .with_context(|| format!("Failed to create {}", folder.display()))?;
        let note_dir = self.vault.full_path(parent_of(note_rel));

        let remote: Vec<_> = extract(&editor.value())
            .into_iter()
            .filter(|r| r.is_remote())
            .collect();
        if remote.is_empty() {
            tracing::info!("No remote images found in {}", note_rel);
            return Ok(Summary::default());
        }

        let client = HttpClient::new();
        let mut taken: HashSet<String> = HashSet::new();
        let mut downloaded = Vec::new();

        for reference in &remote {
            let (data, ext) = match download_image(&client, &reference.path).await {
                Ok(found) => found,
                Err(e) => {
                    tracing::warn!("Failed to download {}: {:#}", reference.path, e);
                    continue;
                }
            };

            let mut stem = sanitize_file_name(&decoded_stem(&reference.path));
            if stem.is_empty() || folder.join(format!("{}.{}", stem, ext)).exists() {
                stem = random_id();
            }
            if !taken.insert(format!("{}.{}", stem, ext)) {
                stem = format!("{}-{}", stem, random_id());
                taken.insert(format!("{}.{}", stem, ext));
            }
            let file_name = format!("{}.{}", stem, ext);
            let target = folder.join(&file_name);

            if let Err(e) = tokio::fs::write(&target, &data).await {
                tracing::warn!("Failed to write {}: {}", target.display(), e);
                continue;
            }
            tracing::info!("Downloaded {} -> {}", reference.path, target.display());

            let link = encode_uri(&relative_link(&note_dir, &target));
            downloaded.push((reference.source.clone(), stem, link));
        }

        let mut value = editor.value();
        for (source, stem, link) in &downloaded {
            let name = handle_name(stem, &self.settings);
            value = replace_first(&value, source, &markdown_image(&name, link));
        }
        if value != editor.value() {
            set_value_preserving_view(editor, &value);
        }

        Ok(Summary::new(remote.len(), downloaded.len()))
    }
}

/// Download `url` and return its bytes with an extension sniffed from them
pub async fn download_image(client: &HttpClient, url: &str) -> Result<(Vec<u8>, &'static str)> {
    let data = fetch_bytes(client, url).await?;
    let ext = image_extension(&data).context("Response is not a recognized image")?;
    Ok((data, ext))
}

/// Image extension sniffed from the content, `None` for anything that is not an image
pub fn image_extension(data: &[u8]) -> Option<&'static str> {
    infer::get(data)
        .filter(|kind| kind.matcher_type() == infer::MatcherType::Image)
        .map(|kind| kind.extension())
}

/// Replace characters that are not allowed in file names with `-`
pub fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '\\' | '/' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '-',
            other => other,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Percent-decoded last URL segment without its extension
fn decoded_stem(url: &str) -> String {
    let asset = url_asset(url);
    let decoded = percent_decode_str(asset)
        .decode_utf8()
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| asset.to_string());
    Path::new(&decoded)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Slash-separated path from `from_dir` to `to`
pub fn relative_link(from_dir: &Path, to: &Path) -> String {
    let from: Vec<Component> = from_dir.components().collect();
    let target: Vec<Component> = to.components().collect();
    let common = from
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let ups = from[common..]
        .iter()
        .filter(|c| matches!(c, Component::Normal(_)))
        .map(|_| "..".to_string());
    let downs = target[common..]
        .iter()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        });

    ups.chain(downs).collect::<Vec<_>>().join("/")
}

pub fn encode_uri(link: &str) -> String {
    utf8_percent_encode(link, URI).to_string()
}
