use imgup::config::{BlogSettings, RepoSettings, Settings, TencentSettings, UploaderKind};
use imgup::uploader::{
    ClipboardFile, ClipboardPayload, CosUploader, Forge, ForgeUploader, UploadedItem, Uploader,
};
use mockito::Matcher;
use object_store::memory::InMemory;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

fn write_image(dir: &Path, name: &str) -> String {
    let path = dir.join(name);
    std::fs::write(&path, b"\x89PNG\r\n\x1a\nfake").unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn test_picgo_daemon_upload_keeps_order_and_full_result() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/upload")
        .match_header("content-type", "application/json")
        .match_body(Matcher::PartialJson(json!({"list": ["/v/a.png", "/v/b.png"]})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!({
                "success": true,
                "result": ["https://cdn/a.png", "https://cdn/b.png"],
                "fullResult": [
                    {"imgUrl": "https://cdn/a.png", "type": "smms"},
                    {"imgUrl": "https://cdn/b.png", "type": "smms"}
                ]
            })
            .to_string(),
        )
        .create_async()
        .await;

    let settings = Settings {
        upload_server: format!("{}/upload", server.url()),
        ..Settings::default()
    };
    let uploader = Uploader::from_settings(&settings).unwrap();
    assert_eq!(uploader.name(), "PicGo");

    let batch = uploader
        .upload_files(&["/v/a.png".to_string(), "/v/b.png".to_string()])
        .await
        .expect("Should upload");

    mock.assert_async().await;
    assert_eq!(batch.urls(), vec!["https://cdn/a.png", "https://cdn/b.png"]);
    assert_eq!(batch.full_result.len(), 2);
    assert_eq!(batch.full_result[1]["type"], "smms");
}

#[tokio::test]
async fn test_picgo_daemon_failure_is_an_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(r#"{"success": false, "msg": "picbed not configured"}"#)
        .create_async()
        .await;

    let settings = Settings {
        upload_server: format!("{}/upload", server.url()),
        ..Settings::default()
    };
    let uploader = Uploader::from_settings(&settings).unwrap();

    let err = uploader
        .upload_files(&["/v/a.png".to_string()])
        .await
        .unwrap_err();
    assert!(err.to_string().contains("picbed not configured"));
}

#[tokio::test]
async fn test_picgo_daemon_clipboard_upload() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/upload")
        .with_status(200)
        .with_body(
            r#"{"success": true, "result": ["https://cdn/clip.png"], "fullResult": [{"imgUrl": "https://cdn/clip.png"}]}"#,
        )
        .create_async()
        .await;

    let settings = Settings {
        upload_server: format!("{}/upload", server.url()),
        ..Settings::default()
    };
    let uploader = Uploader::from_settings(&settings).unwrap();

    let upload = uploader
        .upload_by_clipboard(&ClipboardPayload::default())
        .await
        .expect("Should upload clipboard");
    assert_eq!(upload.url, "https://cdn/clip.png");
    assert_eq!(upload.full_result.len(), 1);
}

#[tokio::test]
async fn test_github_upload_skips_unreadable_input_without_shifting_urls() {
    let dir = TempDir::new().unwrap();
    let first = write_image(dir.path(), "first.png");
    let missing = dir.path().join("missing.png").to_string_lossy().into_owned();
    let third = write_image(dir.path(), "third.png");

    let mut server = mockito::Server::new_async().await;
    let first_mock = server
        .mock("PUT", "/repos/me/images/contents/pics/first.png")
        .match_header("authorization", "token secret")
        .match_header("user-agent", Matcher::Regex("^imgup/".to_string()))
        .match_body(Matcher::PartialJson(json!({"branch": "main"})))
        .with_status(201)
        .with_body(
            json!({"content": {"path": "pics/first.png", "download_url": "https://raw/first.png"}})
                .to_string(),
        )
        .create_async()
        .await;
    let third_mock = server
        .mock("PUT", "/repos/me/images/contents/pics/third.png")
        .with_status(201)
        .with_body(
            json!({"content": {"path": "pics/third.png", "download_url": "https://raw/third.png"}})
                .to_string(),
        )
        .create_async()
        .await;

    let uploader = Uploader::GitHub(ForgeUploader::new(
        Forge::GitHub,
        RepoSettings {
            repo: "me/images".to_string(),
            branch: "main".to_string(),
            token: "secret".to_string(),
            api_url: Some(server.url()),
            ..RepoSettings::default()
        },
        false,
    ));

    let batch = uploader
        .upload_files(&[first, missing, third])
        .await
        .expect("Should upload readable files");

    first_mock.assert_async().await;
    third_mock.assert_async().await;
    assert_eq!(
        batch.items,
        vec![
            UploadedItem { index: 0, url: "https://raw/first.png".to_string() },
            UploadedItem { index: 2, url: "https://raw/third.png".to_string() },
        ]
    );
}

#[tokio::test]
async fn test_gitee_upload_posts_token_and_honors_custom_url() {
    let dir = TempDir::new().unwrap();
    let image = write_image(dir.path(), "shot.png");

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/repos/me/images/contents/imgs/shot.png")
        .match_body(Matcher::PartialJson(json!({
            "access_token": "gitee-token",
            "branch": "master"
        })))
        .with_status(201)
        .with_body(
            json!({"content": {"path": "imgs/shot.png", "download_url": "https://gitee.com/raw/shot.png"}})
                .to_string(),
        )
        .create_async()
        .await;

    let uploader = Uploader::Gitee(ForgeUploader::new(
        Forge::Gitee,
        RepoSettings {
            repo: "me/images".to_string(),
            token: "gitee-token".to_string(),
            path: "imgs/".to_string(),
            custom_url: "https://cdn.example.com/".to_string(),
            api_url: Some(server.url()),
            ..RepoSettings::default()
        },
        false,
    ));

    let batch = uploader.upload_files(&[image]).await.expect("Should upload");

    mock.assert_async().await;
    assert_eq!(batch.urls(), vec!["https://cdn.example.com/imgs/shot.png"]);
}

#[tokio::test]
async fn test_forge_http_error_fails_batch() {
    let dir = TempDir::new().unwrap();
    let image = write_image(dir.path(), "shot.png");

    let mut server = mockito::Server::new_async().await;
    server
        .mock("PUT", Matcher::Any)
        .with_status(422)
        .with_body(r#"{"message": "sha wasn't supplied"}"#)
        .create_async()
        .await;

    let uploader = Uploader::GitHub(ForgeUploader::new(
        Forge::GitHub,
        RepoSettings {
            repo: "me/images".to_string(),
            api_url: Some(server.url()),
            ..RepoSettings::default()
        },
        false,
    ));

    let err = uploader.upload_files(&[image]).await.unwrap_err();
    assert!(err.to_string().contains("422"));
}

#[tokio::test]
async fn test_blog_upload_reads_url_from_xml_rpc_reply() {
    let dir = TempDir::new().unwrap();
    let image = write_image(dir.path(), "shot.png");

    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/xmlrpc.php")
        .match_header("content-type", "text/xml")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("metaWeblog.newMediaObject".to_string()),
            Matcher::Regex("<string>shot.png</string>".to_string()),
            Matcher::Regex("<string>image/png</string>".to_string()),
        ]))
        .with_status(200)
        .with_body(
            r#"<?xml version="1.0"?>
<methodResponse><params><param><value><struct>
  <member><name>id</name><value><string>42</string></value></member>
  <member><name>url</name><value><string>https://blog.example/uploads/shot.png</string></value></member>
</struct></value></param></params></methodResponse>"#,
        )
        .create_async()
        .await;

    let settings = Settings {
        uploader: UploaderKind::Blog,
        rename: false,
        blog_setting: BlogSettings {
            blog_url: format!("{}/xmlrpc.php", server.url()),
            blog_id: "1".to_string(),
            blog_user_name: "me".to_string(),
            blog_password: "pw".to_string(),
        },
        ..Settings::default()
    };
    let uploader = Uploader::from_settings(&settings).unwrap();

    let batch = uploader.upload_files(&[image]).await.expect("Should upload");

    mock.assert_async().await;
    assert_eq!(batch.urls(), vec!["https://blog.example/uploads/shot.png"]);
}

#[tokio::test]
async fn test_remote_input_is_fetched_before_upload() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/remote/cat.png")
        .with_status(200)
        .with_body(b"\x89PNG\r\n\x1a\ncat".to_vec())
        .create_async()
        .await;

    let store = Arc::new(InMemory::new());
    let settings = TencentSettings {
        bucket_name: "b-1".to_string(),
        region: "ap-beijing".to_string(),
        path: "/img/".to_string(),
        ..TencentSettings::default()
    };
    let uploader = Uploader::Tencent(CosUploader::with_object_store(settings, store, false));

    let batch = uploader
        .upload_files(&[format!("{}/remote/cat.png", server.url())])
        .await
        .expect("Should upload");

    assert_eq!(batch.urls(), vec!["https://b-1.cos.ap-beijing.myqcloud.com/img/cat.png"]);
}

#[tokio::test]
async fn test_clipboard_upload_to_object_store_uses_timestamp_name() {
    let store = Arc::new(InMemory::new());
    let uploader = Uploader::Tencent(CosUploader::with_object_store(
        TencentSettings {
            bucket_name: "b-1".to_string(),
            ..TencentSettings::default()
        },
        store,
        true,
    ));

    let payload = ClipboardPayload {
        text: None,
        files: vec![ClipboardFile {
            name: "image.png".to_string(),
            mime: "image/png".to_string(),
            data: b"png".to_vec(),
        }],
    };

    let upload = uploader.upload_by_clipboard(&payload).await.expect("Should upload");
    let name = upload.url.rsplit('/').next().unwrap();
    assert!(upload.url.starts_with("https://b-1.cos.ap-guangzhou.myqcloud.com/"));
    assert!(name.ends_with(".png"));
    assert_eq!(name.len(), "20240101120000000.png".len());
}

#[cfg(unix)]
mod picgo_core {
    use super::*;
    use imgup::uploader::PicGoCoreUploader;
    use std::os::unix::fs::PermissionsExt;

    fn fake_cli(dir: &Path, body: &str) -> String {
        let path = dir.join("picgo");
        std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().into_owned()
    }

    #[tokio::test]
    async fn test_urls_come_from_last_lines() {
        let dir = TempDir::new().unwrap();
        let cli = fake_cli(
            dir.path(),
            "echo '[PicGo INFO]: Before transform'\necho '[PicGo SUCCESS]:'\necho https://cdn/1.png\necho https://cdn/2.png",
        );
        let uploader = Uploader::PicGoCore(PicGoCoreUploader::new(&cli));

        let batch = uploader
            .upload_files(&["/v/1.png".to_string(), "/v/2.png".to_string()])
            .await
            .expect("Should upload");
        assert_eq!(batch.urls(), vec!["https://cdn/1.png", "https://cdn/2.png"]);
    }

    #[tokio::test]
    async fn test_error_marker_fails_upload() {
        let dir = TempDir::new().unwrap();
        let cli = fake_cli(dir.path(), "echo '[PicGo ERROR]: token invalid'");
        let uploader = Uploader::PicGoCore(PicGoCoreUploader::new(&cli));

        let err = uploader.upload_files(&["/v/1.png".to_string()]).await.unwrap_err();
        assert!(err.to_string().contains("token invalid"));
    }
}
