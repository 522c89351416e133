use imgup::config::Settings;
use imgup::editor::MemoryEditor;
use imgup::ledger::Ledger;
use imgup::uploader::Uploader;
use imgup::vault::Vault;
use imgup::workflow::{Session, Summary};
use std::fs;
use tempfile::TempDir;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F'];

fn session(dir: &TempDir, settings: Settings) -> Session {
    let ledger = Ledger::load(&dir.path().join("ledger.json")).unwrap();
    let vault = Vault::open(dir.path()).unwrap();
    let uploader = Uploader::from_settings(&settings).unwrap();
    Session::with_uploader(settings, ledger, vault, uploader)
}

fn vault_with_note() -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::create_dir_all(dir.path().join(".obsidian")).unwrap();
    fs::create_dir_all(dir.path().join("notes")).unwrap();
    fs::write(dir.path().join("notes/today.md"), "").unwrap();
    dir
}

#[tokio::test]
async fn test_download_all_saves_images_and_relinks() {
    let dir = vault_with_note();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/img/cat.png")
        .with_status(200)
        .with_body(PNG)
        .create_async()
        .await;
    server
        .mock("GET", "/img/photo")
        .with_status(200)
        .with_body(JPEG)
        .create_async()
        .await;
    server
        .mock("GET", "/img/page.png")
        .with_status(200)
        .with_body("<html>not an image</html>")
        .create_async()
        .await;

    let settings = Settings {
        attachment_folder: Some("assets".to_string()),
        ..Settings::default()
    };
    let mut session = session(&dir, settings);

    let base = server.url();
    let mut editor = MemoryEditor::new(format!(
        "![c]({base}/img/cat.png)\n![p]({base}/img/photo)\n![bad]({base}/img/page.png)\n![local](./x.png)"
    ));

    let summary = session
        .download_all(&mut editor, "notes/today.md")
        .await
        .expect("Should download");

    assert_eq!(summary, Summary { total: 3, success: 2, failed: 1 });
    assert_eq!(
        editor.text(),
        format!("![cat](../assets/cat.png)\n![photo](../assets/photo.jpg)\n![bad]({base}/img/page.png)\n![local](./x.png)")
    );
    assert_eq!(fs::read(dir.path().join("assets/cat.png")).unwrap(), PNG);
    assert_eq!(fs::read(dir.path().join("assets/photo.jpg")).unwrap(), JPEG);
    assert!(!dir.path().join("assets/page.png").exists());
}

#[tokio::test]
async fn test_download_never_overwrites_existing_files() {
    let dir = vault_with_note();
    fs::create_dir_all(dir.path().join("notes/assets")).unwrap();
    fs::write(dir.path().join("notes/assets/cat.png"), b"keep me").unwrap();
    fs::write(
        dir.path().join(".obsidian/app.json"),
        r#"{"attachmentFolderPath": "./assets"}"#,
    )
    .unwrap();

    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/img/cat.png")
        .with_status(200)
        .with_body(PNG)
        .create_async()
        .await;

    let mut session = session(&dir, Settings::default());
    let mut editor = MemoryEditor::new(format!("![c]({}/img/cat.png)", server.url()));

    let summary = session
        .download_all(&mut editor, "notes/today.md")
        .await
        .expect("Should download");

    assert_eq!(summary.success, 1);
    assert_eq!(fs::read(dir.path().join("notes/assets/cat.png")).unwrap(), b"keep me");
    assert!(!editor.text().starts_with("![cat]"));

    // Random five-character stem in the note's own attachment folder
    let text = editor.text().to_string();
    let link = text
        .strip_prefix("![")
        .and_then(|t| t.split("](").nth(1))
        .and_then(|t| t.strip_suffix(')'))
        .expect("Should be a markdown image");
    assert!(link.starts_with("assets/"));
    assert!(link.ends_with(".png"));
    assert_ne!(link, "assets/cat.png");
    assert_eq!(fs::read(dir.path().join("notes").join(link)).unwrap(), PNG);
}

#[tokio::test]
async fn test_download_encodes_link_but_keeps_readable_file_name() {
    let dir = vault_with_note();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/img/my%20cat.png")
        .with_status(200)
        .with_body(PNG)
        .create_async()
        .await;

    let mut session = session(&dir, Settings::default());
    let mut editor = MemoryEditor::new(format!("![]({}/img/my%20cat.png)", server.url()));

    session
        .download_all(&mut editor, "notes/today.md")
        .await
        .expect("Should download");

    assert!(dir.path().join("my cat.png").exists());
    assert_eq!(editor.text(), "![my cat](../my%20cat.png)");
}

#[tokio::test]
async fn test_download_without_remote_images_is_a_no_op() {
    let dir = vault_with_note();
    let mut session = session(&dir, Settings::default());
    let mut editor = MemoryEditor::new("![local](./x.png)");

    let summary = session
        .download_all(&mut editor, "notes/today.md")
        .await
        .expect("Should succeed");

    assert_eq!(summary, Summary::default());
    assert_eq!(editor.text(), "![local](./x.png)");
}

#[tokio::test]
async fn test_download_alt_text_uses_stem_with_size_suffix() {
    let dir = vault_with_note();
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/img/cat.png")
        .with_status(200)
        .with_body(PNG)
        .create_async()
        .await;

    let settings = Settings {
        image_size_suffix: "|300".to_string(),
        ..Settings::default()
    };
    let mut session = session(&dir, settings);
    let mut editor = MemoryEditor::new(format!("![c]({}/img/cat.png)", server.url()));

    session
        .download_all(&mut editor, "notes/today.md")
        .await
        .expect("Should download");

    assert_eq!(editor.text(), "![cat|300](../cat.png)");
}
