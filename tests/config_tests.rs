use std::collections::HashMap;

use edutrack::config::{FileBackend, TabularBackend};
use edutrack::{AppConfig, ConfigError};

fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
    let env: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    AppConfig::from_lookup(|key| env.get(key).cloned())
}

#[test]
fn defaults_target_hosted_backends() {
    let config = config_from(&[]).unwrap();
    assert_eq!(config.http_addr.port(), 5000);
    assert_eq!(config.tabular_backend, TabularBackend::Sheets);
    assert_eq!(config.file_backend, FileBackend::ImageKit);
    assert!(config.rehydrate_slots);
    assert_eq!(config.classes.len(), 12);
    assert_eq!(config.classes[0], "LKG");
}

#[test]
fn hosted_backends_need_credentials() {
    let config = config_from(&[("SPREADSHEET_ID", "sheet-123"), ("GOOGLE_SHEETS_TOKEN", "  ")])
        .unwrap();
    assert!(matches!(
        config.tabular_store(),
        Err(ConfigError::Missing("GOOGLE_SHEETS_TOKEN"))
    ));
    assert!(matches!(
        config.file_store(),
        Err(ConfigError::Missing("IMAGEKIT_PRIVATE_KEY"))
    ));
}

#[test]
fn memory_backends_build_without_credentials() {
    let config = config_from(&[
        ("EDUTRACK_TABULAR_BACKEND", "memory"),
        ("EDUTRACK_FILE_BACKEND", "Memory"),
        ("EDUTRACK_REHYDRATE_SLOTS", "off"),
        ("EDUTRACK_CLASSES", "Class1, Class2,,"),
    ])
    .unwrap();
    assert!(config.tabular_store().is_ok());
    assert!(config.file_store().is_ok());
    assert!(!config.rehydrate_slots);
    assert_eq!(config.classes, vec!["Class1", "Class2"]);
}

#[test]
fn invalid_values_name_their_key() {
    let err = config_from(&[("EDUTRACK_HTTP_ADDR", "localhost")]).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { key: "EDUTRACK_HTTP_ADDR", .. }));

    let err = config_from(&[("EDUTRACK_TABULAR_BACKEND", "excel")]).unwrap_err();
    assert_eq!(err.to_string(), "invalid value 'excel' for EDUTRACK_TABULAR_BACKEND");

    let err = config_from(&[("EDUTRACK_REHYDRATE_SLOTS", "maybe")]).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { .. }));
}
