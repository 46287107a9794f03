use ocsync_fs::{ConfigStore, Error};
use pretty_assertions::assert_eq;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Serialize, Deserialize, PartialEq)]
struct TestConfig {
    name: String,
    count: i32,
}

#[test]
fn test_load_jsonc_with_comments() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("opencode-synced.jsonc");
    fs::write(
        &file_path,
        r#"{
  // which config to sync
  "name": "test", /* inline */
  "count": 42
}"#,
    )
    .unwrap();

    let config: TestConfig = ConfigStore::new().load(&file_path).unwrap();

    assert_eq!(config, TestConfig { name: "test".into(), count: 42 });
}

#[test]
fn test_load_json_tolerates_comments() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("opencode.json");
    fs::write(&file_path, "{\n  // theme\n  \"theme\": \"dark\"\n}").unwrap();

    let value: serde_json::Value = ConfigStore::new().load(&file_path).unwrap();

    assert_eq!(value, json!({ "theme": "dark" }));
}

#[test]
fn test_load_invalid_json_reports_parse_error() {
    let temp = TempDir::new().unwrap();
    let file_path = temp.path().join("broken.jsonc");
    fs::write(&file_path, "{ \"name\": ").unwrap();

    let result: Result<TestConfig, _> = ConfigStore::new().load(&file_path);

    assert!(matches!(result, Err(Error::ConfigParse { format, .. }) if format == "JSONC"));
}

#[test]
fn test_load_optional_missing_file() {
    let temp = TempDir::new().unwrap();
    let result: Option<TestConfig> = ConfigStore::new()
        .load_optional(&temp.path().join("absent.json"))
        .unwrap();
    assert!(result.is_none());
}

#[test]
fn test_save_then_load_preserves_value() {
    let temp = TempDir::new().unwrap();
    let store = ConfigStore::new();
    let original = TestConfig { name: "sync".into(), count: 7 };

    for name in ["out.json", "out.jsonc"] {
        let path = temp.path().join(name);
        store.save(&path, &original).unwrap();
        assert!(fs::read_to_string(&path).unwrap().ends_with('\n'));
        let loaded: TestConfig = store.load(&path).unwrap();
        assert_eq!(loaded, original);
    }
}

#[test]
fn test_save_unsupported_format() {
    let temp = TempDir::new().unwrap();
    for name in ["out.yaml", "out.toml"] {
        let path = temp.path().join(name);
        let result = ConfigStore::new().save(&path, &json!({}));
        assert!(matches!(result, Err(Error::UnsupportedFormat { .. })), "{name}");
        assert!(!path.exists());
    }
}
