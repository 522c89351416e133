// ABOUTME: Main entry point for the imgup CLI
// ABOUTME: Parses commands and dispatches to appropriate handlers

use anyhow::Context;
use clap::{Parser, Subcommand};
use imgup::commands::{self, GlobalOptions};
use imgup::Result;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "imgup")]
#[command(about = "Upload and download the images of Markdown notes", long_about = None)]
#[command(version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Settings file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Uploaded image ledger (defaults to the user data directory)
    #[arg(long, global = true)]
    ledger: Option<PathBuf>,

    /// Vault root (defaults to the nearest folder holding .obsidian)
    #[arg(long, global = true)]
    vault: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Upload every image in a note and rewrite its links
    Upload {
        /// Path to the note
        note: PathBuf,
    },
    /// Download every remote image in a note into the vault
    Download {
        /// Path to the note
        note: PathBuf,
    },
    /// Upload one image file and relink the note's references to it
    UploadFile {
        /// Path to the note
        note: PathBuf,
        /// Image file to upload
        image: PathBuf,
    },
    /// Paste text and/or an image into a note
    Paste {
        /// Path to the note
        note: PathBuf,
        /// Clipboard text
        #[arg(long)]
        text: Option<String>,
        /// Clipboard image file
        #[arg(long = "image")]
        images: Vec<PathBuf>,
        /// Cursor line (0-based, defaults to end of note)
        #[arg(long)]
        line: Option<usize>,
        /// Cursor column in bytes
        #[arg(long)]
        ch: Option<usize>,
    },
    /// Drop files onto a note
    Drop {
        /// Path to the note
        note: PathBuf,
        /// Dropped files
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Cursor line (0-based, defaults to end of note)
        #[arg(long)]
        line: Option<usize>,
        /// Cursor column in bytes
        #[arg(long)]
        ch: Option<usize>,
    },
    /// Delete an uploaded image through the upload daemon
    Delete {
        /// Path to the note
        note: PathBuf,
        /// Selected markdown image, e.g. "![](https://...)"
        #[arg(long)]
        selection: String,
    },
    /// Settings management commands
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the effective settings
    Show,
    /// Print the settings and ledger locations
    Path,
    /// Write a default settings file
    Init,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    let opts = GlobalOptions {
        config: cli.config,
        ledger: cli.ledger,
        vault: cli.vault,
    };

    match cli.command {
        Commands::Upload { note } => {
            commands::cmd_upload(&opts, &note).await?;
            Ok(())
        }
        Commands::Download { note } => {
            commands::cmd_download(&opts, &note).await?;
            Ok(())
        }
        Commands::UploadFile { note, image } => {
            commands::cmd_upload_file(&opts, &note, &image).await?;
            Ok(())
        }
        Commands::Paste {
            note,
            text,
            images,
            line,
            ch,
        } => commands::cmd_paste(&opts, &note, text, &images, line, ch).await,
        Commands::Drop {
            note,
            files,
            line,
            ch,
        } => commands::cmd_drop(&opts, &note, &files, line, ch).await,
        Commands::Delete { note, selection } => {
            commands::cmd_delete(&opts, &note, &selection).await
        }
        Commands::Config(cmd) => match cmd {
            ConfigCommands::Show => commands::cmd_config_show(&opts),
            ConfigCommands::Path => commands::cmd_config_path(&opts),
            ConfigCommands::Init => {
                commands::cmd_config_init(&opts)?;
                Ok(())
            }
        },
    }
}
