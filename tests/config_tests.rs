use imgup::config::{get_config_dir, get_data_dir, ImageDesc, Settings, UploaderKind};
use tempfile::TempDir;

#[test]
fn test_config_dir_exists() {
    let config_dir = get_config_dir().expect("Should get config dir");
    assert!(config_dir.to_str().unwrap().contains("imgup"));
}

#[test]
fn test_data_dir_exists() {
    let data_dir = get_data_dir().expect("Should get data dir");
    assert!(data_dir.to_str().unwrap().contains("imgup"));
}

#[test]
fn test_missing_file_gives_defaults() {
    let dir = TempDir::new().unwrap();
    let settings =
        Settings::load_from(&dir.path().join("nope.toml")).expect("Should load defaults");

    assert_eq!(settings, Settings::default());
    assert!(settings.upload_by_clip_switch);
    assert_eq!(settings.uploader, UploaderKind::PicGo);
    assert_eq!(settings.upload_server, "http://127.0.0.1:36677/upload");
    assert_eq!(settings.gitee_setting.path, "imgs/");
    assert_eq!(settings.github_setting.path, "pics/");
}

#[test]
fn test_settings_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    let mut settings = Settings::default();
    settings.uploader = UploaderKind::GitHub;
    settings.image_desc = ImageDesc::RemoveDefault;
    settings.image_size_suffix = "|300".to_string();
    settings.github_setting.repo = "me/pics".to_string();
    settings.github_setting.api_url = Some("http://127.0.0.1:9/api".to_string());
    settings.attachment_folder = Some("./assets".to_string());

    settings.save_to(&path).expect("Should save settings");
    let loaded = Settings::load_from(&path).expect("Should load settings");

    assert_eq!(loaded, settings);
}

#[test]
fn test_partial_file_uses_original_key_names() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
uploader = "PicGo-Core"
picgoCorePath = "/opt/picgo/bin/picgo"
workOnNetWork = true
newWorkBlackDomains = "example.com, cdn.example.org"
imageDesc = "none"

[tencentSetting]
bucketName = "pics-1250000000"
"#,
    )
    .unwrap();

    let settings = Settings::load_from(&path).expect("Should parse settings");

    assert_eq!(settings.uploader, UploaderKind::PicGoCore);
    assert_eq!(settings.picgo_core_command(), "/opt/picgo/bin/picgo");
    assert!(settings.work_on_network);
    assert_eq!(settings.network_black_domains, "example.com, cdn.example.org");
    assert_eq!(settings.image_desc, ImageDesc::None);
    assert_eq!(settings.tencent_setting.bucket_name, "pics-1250000000");
    assert_eq!(settings.tencent_setting.region, "ap-guangzhou");
    // Untouched keys keep their defaults
    assert!(settings.apply_image);
    assert!(settings.rename);
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "uploader = \"Dropbox\"").unwrap();

    assert!(Settings::load_from(&path).is_err());
}
