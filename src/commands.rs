// ABOUTME: Command handlers behind the CLI subcommands
// ABOUTME: Load settings, ledger, vault and note, run one flow, save the note and report

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use crate::config::{default_config_path, default_ledger_path, Settings, UploaderKind};
use crate::delete::DeleteOutcome;
use crate::editor::{offset_to_position, Editor, MemoryEditor, Position};
use crate::ledger::Ledger;
use crate::note::Note;
use crate::uploader::{picgo_core, ClipboardFile, ClipboardPayload};
use crate::vault::Vault;
use crate::workflow::{ClipboardOutcome, Session, Summary};

/// Paths shared by every subcommand
#[derive(Debug, Clone, Default)]
pub struct GlobalOptions {
    pub config: Option<PathBuf>,
    pub ledger: Option<PathBuf>,
    pub vault: Option<PathBuf>,
}

impl GlobalOptions {
    pub fn config_path(&self) -> Result<PathBuf> {
        match &self.config {
            Some(path) => Ok(path.clone()),
            None => default_config_path(),
        }
    }

    pub fn ledger_path(&self) -> Result<PathBuf> {
        match &self.ledger {
            Some(path) => Ok(path.clone()),
            None => default_ledger_path(),
        }
    }

    pub fn settings(&self) -> Result<Settings> {
        Settings::load_from(&self.config_path()?)
    }
}

/// A note opened in an editor together with the session that works on it
struct Workbench {
    session: Session,
    note: Note,
    note_rel: String,
    editor: MemoryEditor,
}

impl Workbench {
    fn open(opts: &GlobalOptions, note_path: &Path) -> Result<Self> {
        let settings = opts.settings()?;
        let ledger = Ledger::load(&opts.ledger_path()?)?;
        let note = Note::load(note_path)?;

        let vault = match &opts.vault {
            Some(root) => Vault::open(root)?,
            None => Vault::discover(&note.path)?,
        };
        let note_rel = vault.relative_path(&note.path)?;

        if settings.fix_path && settings.uploader == UploaderKind::PicGoCore {
            if let Err(e) = picgo_core::fix_path() {
                tracing::warn!("Could not import PATH from login shell: {:#}", e);
            }
        }

        let session = Session::new(settings, ledger, vault)?;
        tracing::debug!("Using {} uploader for {}", session.uploader.name(), note_rel);

        let editor = note.editor();
        Ok(Self {
            session,
            note,
            note_rel,
            editor,
        })
    }

    /// Put the cursor at the given position, or at the end of the note
    fn place_cursor(&mut self, line: Option<usize>, ch: Option<usize>) {
        let pos = match line {
            Some(line) => Position::new(line, ch.unwrap_or(0)),
            None => offset_to_position(self.editor.text(), self.editor.text().len()),
        };
        self.editor.set_cursor(pos);
    }

    fn save(mut self) -> Result<bool> {
        let content = self.editor.into_text();
        self.note.save_if_changed(content)
    }
}

fn print_summary(action: &str, summary: &Summary) {
    println!(
        "{} {} image(s): {} succeeded, {} failed",
        action, summary.total, summary.success, summary.failed
    );
}

pub async fn cmd_upload(opts: &GlobalOptions, note: &Path) -> Result<Summary> {
    let mut bench = Workbench::open(opts, note)?;
    let summary = bench
        .session
        .upload_all(&mut bench.editor, &bench.note_rel)
        .await
        .context("Upload error")?;

    if summary.total == 0 {
        println!("No image files found");
    } else {
        print_summary("Uploaded", &summary);
    }
    if bench.save()? {
        println!("✓ Updated {}", note.display());
    }
    Ok(summary)
}

pub async fn cmd_download(opts: &GlobalOptions, note: &Path) -> Result<Summary> {
    let mut bench = Workbench::open(opts, note)?;
    let summary = bench
        .session
        .download_all(&mut bench.editor, &bench.note_rel)
        .await?;

    if summary.total == 0 {
        println!("No remote images found");
    } else {
        print_summary("Downloaded", &summary);
    }
    if bench.save()? {
        println!("✓ Updated {}", note.display());
    }
    Ok(summary)
}

pub async fn cmd_upload_file(opts: &GlobalOptions, note: &Path, image: &Path) -> Result<Summary> {
    let mut bench = Workbench::open(opts, note)?;
    let summary = bench
        .session
        .upload_file(&mut bench.editor, image)
        .await
        .context("Upload error")?;

    if summary.total == 0 {
        println!("No references to {} found", image.display());
    } else {
        print_summary("Uploaded", &summary);
    }
    if bench.save()? {
        println!("✓ Updated {}", note.display());
    }
    Ok(summary)
}

pub async fn cmd_paste(
    opts: &GlobalOptions,
    note: &Path,
    text: Option<String>,
    images: &[PathBuf],
    line: Option<usize>,
    ch: Option<usize>,
) -> Result<()> {
    let files = images
        .iter()
        .map(|p| ClipboardFile::from_path(p))
        .collect::<Result<Vec<_>>>()?;
    let payload = ClipboardPayload { text, files };

    let mut bench = Workbench::open(opts, note)?;
    bench.place_cursor(line, ch);
    let report = bench.session.handle_paste(&mut bench.editor, &payload).await?;

    if !report.handled {
        println!("Auto upload is off for this note, pasted as text");
    }
    if let Some(summary) = &report.network {
        print_summary("Uploaded linked", summary);
    }
    match &report.image {
        Some(ClipboardOutcome::Uploaded(url)) => println!("✓ Uploaded clipboard image: {}", url),
        Some(ClipboardOutcome::Failed(msg)) => println!("Clipboard upload failed: {}", msg),
        None => {}
    }

    if bench.save()? {
        println!("✓ Updated {}", note.display());
    }
    Ok(())
}

pub async fn cmd_drop(
    opts: &GlobalOptions,
    note: &Path,
    files: &[PathBuf],
    line: Option<usize>,
    ch: Option<usize>,
) -> Result<()> {
    let mut bench = Workbench::open(opts, note)?;
    bench.place_cursor(line, ch);

    match bench
        .session
        .handle_drop(&mut bench.editor, files)
        .await
        .context("Upload error")?
    {
        Some(summary) => print_summary("Uploaded", &summary),
        None => println!("Nothing to upload: auto upload is off or the first file is not an image"),
    }

    if bench.save()? {
        println!("✓ Updated {}", note.display());
    }
    Ok(())
}

pub async fn cmd_delete(opts: &GlobalOptions, note: &Path, selection: &str) -> Result<()> {
    let mut bench = Workbench::open(opts, note)?;
    if !bench.editor.select_text(selection) {
        anyhow::bail!("Selection not found in {}", note.display());
    }

    match bench.session.delete_selected(&mut bench.editor).await? {
        DeleteOutcome::Deleted(url) => println!("✓ Delete successfully: {}", url),
        DeleteOutcome::Rejected(url) => println!("Delete failed: {}", url),
    }

    if bench.save()? {
        println!("✓ Updated {}", note.display());
    }
    Ok(())
}

pub fn cmd_config_show(opts: &GlobalOptions) -> Result<()> {
    let settings = opts.settings()?;
    let rendered = toml::to_string_pretty(&settings).context("Failed to serialize config")?;
    println!("{}", rendered);
    Ok(())
}

pub fn cmd_config_path(opts: &GlobalOptions) -> Result<()> {
    println!("config: {}", opts.config_path()?.display());
    println!("ledger: {}", opts.ledger_path()?.display());
    Ok(())
}

/// Write default settings unless a config file already exists
pub fn cmd_config_init(opts: &GlobalOptions) -> Result<bool> {
    let path = opts.config_path()?;
    if path.exists() {
        println!("Config already exists: {}", path.display());
        return Ok(false);
    }
    Settings::default().save_to(&path)?;
    println!("✓ Wrote default config to {}", path.display());
    Ok(true)
}
