// SPDX-License-Identifier: MPL-2.0

//! Integration tests for configuration module

use snapcam::Config;
use snapcam::config::NoDevicePolicy;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(
        config.mirror_preview,
        "Mirror preview should be enabled by default"
    );
    assert_eq!(config.no_device_policy, NoDevicePolicy::Block);
    assert!(!config.require_storage_permission);
    assert_eq!(config.save_folder, "Camera");
}

#[test]
fn test_default_watermark() {
    let stamp = Config::default()
        .watermark
        .expect("Watermark should be enabled by default");

    assert_eq!(stamp.text, "text marker");
    assert_eq!((stamp.x, stamp.y), (150, 150));
    assert_eq!(stamp.color, "#FF0000");
    assert_eq!(stamp.font_size, 44.0);
    assert_eq!(stamp.quality, 100);
}

#[test]
fn test_config_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.json");

    let mut config = Config::default();
    config.no_device_policy = NoDevicePolicy::Revert;
    config.watermark = None;
    config.back_device = Some("/dev/video2".into());
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
fn test_partial_file_uses_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, r#"{ "save_folder": "Snaps", "watermark": { "text": "hi" } }"#).unwrap();

    let config = Config::load_from(&path).unwrap();
    assert_eq!(config.save_folder, "Snaps");
    assert_eq!(config.jpeg_quality, Config::default().jpeg_quality);

    let stamp = config.watermark.unwrap();
    assert_eq!(stamp.text, "hi");
    assert_eq!(stamp.x, 150, "Missing stamp fields should keep their defaults");
}

#[test]
fn test_invalid_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.json");
    std::fs::write(&path, "{ not json").unwrap();

    assert!(Config::load_from(&path).is_err());
}

#[test]
fn test_absolute_save_folder() {
    let config = Config {
        save_folder: "/srv/photos".into(),
        ..Config::default()
    };
    assert_eq!(config.photo_directory(), std::path::PathBuf::from("/srv/photos"));
}
