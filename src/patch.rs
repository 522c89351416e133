// ABOUTME: Rewrites document text once images are uploaded or downloaded
// ABOUTME: Name policy, markdown tag building, progress placeholders, viewport-preserving writes

use rand::Rng;

use crate::config::{ImageDesc, Settings};
use crate::editor::{Editor, Position};

/// Names equal to this are treated as meaningless under `removeDefault`
pub const DEFAULT_IMAGE_NAME: &str = "image.png";

/// Written in place of a placeholder when its upload fails
pub const FAILED_MARKER: &str = "⚠️upload failed, check dev console";

/// Apply the configured alt-text policy to an image name
pub fn format_name(name: &str, desc: ImageDesc, suffix: &str) -> String {
    match desc {
        ImageDesc::Origin => format!("{}{}", name, suffix),
        ImageDesc::None => String::new(),
        ImageDesc::RemoveDefault if name == DEFAULT_IMAGE_NAME => String::new(),
        ImageDesc::RemoveDefault => format!("{}{}", name, suffix),
    }
}

/// `format_name` with the policy taken from settings
pub fn handle_name(name: &str, settings: &Settings) -> String {
    format_name(name, settings.image_desc, &settings.image_size_suffix)
}

pub fn markdown_image(name: &str, url: &str) -> String {
    format!("![{}]({})", name, url)
}

/// Replace every occurrence of each source span, in order.
///
/// Once a span has been consumed, later pairs with the same span find
/// nothing to replace, so the first replacement for a span wins.
pub fn apply_replacements(text: &str, replacements: &[(String, String)]) -> String {
    let mut result = text.to_string();

    for (source, markdown) in replacements {
        if source.is_empty() {
            continue;
        }
        if !result.contains(source.as_str()) {
            tracing::debug!("Source span already replaced: {}", source);
            continue;
        }
        result = result.replace(source.as_str(), markdown);
    }

    result
}

/// Replace only the first occurrence of `source`
pub fn replace_first(text: &str, source: &str, markdown: &str) -> String {
    text.replacen(source, markdown, 1)
}

/// Five random base-36 characters, used for paste ids and collision-free file names
pub fn random_id() -> String {
    const ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    let mut rng = rand::thread_rng();
    (0..5)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

pub fn progress_text(id: &str) -> String {
    format!("![Uploading file...{}]()", id)
}

/// Insert the progress placeholder for `id` at the cursor
pub fn insert_placeholder<E: Editor + ?Sized>(editor: &mut E, id: &str) {
    editor.replace_selection(&format!("{}\n", progress_text(id)));
}

/// Replace the first line holding `target` with `replacement`; returns whether it was found
pub fn replace_first_occurrence<E: Editor + ?Sized>(
    editor: &mut E,
    target: &str,
    replacement: &str,
) -> bool {
    let value = editor.value();
    for (line, text) in value.split('\n').enumerate() {
        if let Some(ch) = text.find(target) {
            let from = Position::new(line, ch);
            let to = Position::new(line, ch + target.len());
            editor.replace_range(replacement, from, to);
            return true;
        }
    }
    false
}

/// Swap the placeholder for the final image tag
pub fn embed_image<E: Editor + ?Sized>(
    editor: &mut E,
    id: &str,
    url: &str,
    name: &str,
    settings: &Settings,
) {
    let markdown = markdown_image(&handle_name(name, settings), url);
    if !replace_first_occurrence(editor, &progress_text(id), &markdown) {
        tracing::warn!("Placeholder {} vanished before upload finished", id);
    }
}

/// Swap the placeholder for the failure marker
pub fn mark_failed<E: Editor + ?Sized>(editor: &mut E, id: &str) {
    replace_first_occurrence(editor, &progress_text(id), FAILED_MARKER);
}

/// Write the whole document and put scroll offset and cursor back
pub fn set_value_preserving_view<E: Editor + ?Sized>(editor: &mut E, value: &str) {
    let scroll = editor.scroll_info();
    let cursor = editor.cursor();

    editor.set_value(value);
    editor.scroll_to(scroll.left, scroll.top);
    editor.set_cursor(cursor);
}
