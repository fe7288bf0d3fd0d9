//! File-backed settings tests

use serde_json::json;
use tempfile::TempDir;
use xpt_tool::{FileSettings, SettingDefinition, SettingsError, SettingsExt, SettingsProvider, TRIM_STYLE};

#[test]
fn missing_file_starts_empty() {
    let dir = TempDir::new().unwrap();
    let settings = FileSettings::open(dir.path().join("settings.toml")).unwrap();
    assert!(!settings.get(&TRIM_STYLE).unwrap());
    assert!(!settings.path().exists());
}

#[test]
fn values_survive_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");

    let settings = FileSettings::open(&path).unwrap();
    settings.set(&TRIM_STYLE, &true).unwrap();
    settings.set_value("Other.Count", json!(3)).unwrap();
    drop(settings);

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("XPathTesterGui.TrimStyle"));

    let reopened = FileSettings::open(&path).unwrap();
    assert!(reopened.get(&TRIM_STYLE).unwrap());
    const COUNT: SettingDefinition<i64> = SettingDefinition::new("Other.Count", 0);
    assert_eq!(reopened.get(&COUNT).unwrap(), 3);
}

#[test]
fn corrupt_file_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "not = [valid").unwrap();
    assert!(matches!(FileSettings::open(&path), Err(SettingsError::Parse(_))));
}

#[test]
fn wrongly_typed_value_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.toml");
    std::fs::write(&path, "\"XPathTesterGui.TrimStyle\" = \"yes\"\n").unwrap();
    let settings = FileSettings::open(&path).unwrap();
    assert!(matches!(
        settings.get(&TRIM_STYLE),
        Err(SettingsError::InvalidValue { .. })
    ));
}

#[test]
fn failed_write_leaves_values_unchanged() {
    let dir = TempDir::new().unwrap();
    let settings = FileSettings::open(dir.path().join("missing").join("settings.toml")).unwrap();

    assert!(matches!(settings.set(&TRIM_STYLE, &true), Err(SettingsError::Io(_))));
    assert_eq!(settings.get_value(TRIM_STYLE.name()).unwrap(), None);
    assert!(!settings.get(&TRIM_STYLE).unwrap());
}
