mod support;

use std::fs;

use assert_matches::assert_matches;
use serde_json::json;

use refinebio::client::Api;
use refinebio::config::Config;
use refinebio::error::RefineError;
use refinebio::http::Method;
use refinebio::models::Token;

use support::{BASE_URL, MockTransport};

const ID: &str = "7f0bb1e8-1b0c-4c0a-9d52-1a2b3c4d5e6f";

fn api_with_config_file(mock: &MockTransport, path: std::path::PathBuf) -> Api {
    let config = Config {
        token: None,
        base_url: BASE_URL.to_string(),
        api_max_calls_per_second: 0,
        path,
    };
    Api::with_transport(config, mock.clone())
}

#[test]
fn create_activate_and_save() {
    let mock = MockTransport::new();
    mock.on(
        Method::Post,
        "token/",
        &[],
        json!({"id": ID, "is_activated": false, "terms_and_conditions": "Be nice."}),
    );
    mock.on(
        Method::Put,
        &format!("token/{ID}/"),
        &[],
        json!({"id": ID, "is_activated": true}),
    );
    mock.on(
        Method::Get,
        &format!("token/{ID}/"),
        &[],
        json!({"id": ID, "is_activated": true}),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refinebio.yaml");
    let api = api_with_config_file(&mock, path.clone());

    let mut token = Token::create(&api).unwrap();
    assert_eq!(token.id(), Some(ID));
    assert!(!token.is_activated());
    assert_eq!(token.terms_and_conditions(), Some("Be nice."));

    token.agree_to_terms_and_conditions().unwrap();
    assert!(token.is_activated());
    assert_eq!(token.terms_and_conditions(), Some("Be nice."));
    assert_eq!(api.config().token.as_deref(), Some(ID));

    let requests = mock.requests();
    assert_eq!(requests[1].body, Some(json!({"is_activated": true})));

    token.save().unwrap();
    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains(ID));

    // Later requests carry the key.
    assert_eq!(mock.requests().last().unwrap().api_key.as_deref(), Some(ID));
}

#[test]
fn saving_an_unactivated_token_fails() {
    let mock = MockTransport::new();
    mock.on(
        Method::Post,
        "token/",
        &[],
        json!({"id": ID, "is_activated": false}),
    );
    mock.on(
        Method::Get,
        &format!("token/{ID}/"),
        &[],
        json!({"id": ID, "is_activated": false}),
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("refinebio.yaml");
    let api = api_with_config_file(&mock, path.clone());

    let token = Token::create(&api).unwrap();
    assert_matches!(
        token.save(),
        Err(RefineError::BadRequest(message)) if message.contains("is not activated")
    );
    assert!(!path.exists());
}

#[test]
fn saving_an_unknown_token_fails() {
    let mock = MockTransport::new();
    let dir = tempfile::tempdir().unwrap();
    let api = api_with_config_file(&mock, dir.path().join("refinebio.yaml"));
    api.set_token(Some("gone".to_string()));

    let token = Token::load(&api).unwrap();
    assert_eq!(token.id(), Some("gone"));
    assert_matches!(
        token.save(),
        Err(RefineError::BadRequest(message)) if message.contains("does not exist")
    );
}

#[test]
fn load_without_a_configured_token() {
    let mock = MockTransport::new();
    assert!(Token::load(&mock.api()).is_none());
    assert_eq!(mock.request_count(), 0);
}
