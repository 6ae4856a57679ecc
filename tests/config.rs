use std::collections::HashMap;
use std::fs;

use assert_matches::assert_matches;
use serde_yaml::Value;

use refinebio::config::{
    BASE_URL_ENV, CONFIG_FILE_ENV, Config, ConfigFile, ConfigLoader, RATE_LIMIT_ENV, TOKEN_ENV,
};
use refinebio::error::RefineError;

fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();
    move |key| map.get(key).cloned()
}

#[test]
fn file_values_are_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refinebio.yaml");
    fs::write(
        &path,
        "token: file-token\nbase_url: http://localhost:8000/v1/\napi_max_calls_per_second: 3\n",
    )
    .unwrap();
    let path_str = path.to_string_lossy().into_owned();

    let config = ConfigLoader::resolve_with(env(&[(CONFIG_FILE_ENV, path_str.as_str())])).unwrap();
    assert_eq!(config.token.as_deref(), Some("file-token"));
    assert_eq!(config.base_url, "http://localhost:8000/v1/");
    assert_eq!(config.api_max_calls_per_second, 3);
    assert_eq!(config.path, path);
}

#[test]
fn environment_beats_file() {
    let file = ConfigFile {
        token: Some("file-token".to_string()),
        base_url: Some("http://file/v1/".to_string()),
        api_max_calls_per_second: Some(3),
    };
    let config = ConfigLoader::resolve_config(
        "x.yaml".into(),
        file,
        env(&[
            (TOKEN_ENV, "env-token"),
            (BASE_URL_ENV, "http://env/v1"),
            (RATE_LIMIT_ENV, "7"),
        ]),
    )
    .unwrap();
    assert_eq!(config.token.as_deref(), Some("env-token"));
    assert_eq!(config.base_url, "http://env/v1/");
    assert_eq!(config.api_max_calls_per_second, 7);
}

#[test]
fn bad_rate_limit_is_a_parse_error() {
    let result = ConfigLoader::resolve_config(
        "x.yaml".into(),
        ConfigFile::default(),
        env(&[(RATE_LIMIT_ENV, "fast")]),
    );
    assert_matches!(result, Err(RefineError::ConfigParse(_)));
}

#[test]
fn missing_or_empty_file_is_empty_config() {
    let dir = tempfile::tempdir().unwrap();
    let missing = ConfigLoader::read_file(&dir.path().join("nope.yaml")).unwrap();
    assert!(missing.token.is_none());

    let empty = dir.path().join("empty.yaml");
    fs::write(&empty, "\n").unwrap();
    assert!(ConfigLoader::read_file(&empty).unwrap().base_url.is_none());

    let broken = dir.path().join("broken.yaml");
    fs::write(&broken, "token: [unclosed").unwrap();
    assert_matches!(
        ConfigLoader::read_file(&broken),
        Err(RefineError::ConfigParse(_))
    );
}

#[test]
fn save_keeps_unrelated_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refinebio.yaml");
    fs::write(&path, "token: old\nfavourite_organism: DANIO_RERIO\n").unwrap();

    let config = Config {
        token: Some("new".to_string()),
        path: path.clone(),
        ..Config::default()
    };
    config.save().unwrap();

    let saved: Value = serde_yaml::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(saved["token"], Value::from("new"));
    assert_eq!(saved["favourite_organism"], Value::from("DANIO_RERIO"));
    assert_eq!(saved["base_url"], Value::from("https://api.refine.bio/v1/"));

    let reread = ConfigLoader::read_file(&path).unwrap();
    assert_eq!(reread.token.as_deref(), Some("new"));
}

#[test]
fn save_creates_missing_parent_directories() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested/config.yaml");
    let config = Config {
        token: Some("t".to_string()),
        path: path.clone(),
        ..Config::default()
    };
    config.save().unwrap();
    assert!(path.exists());
}
