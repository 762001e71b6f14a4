use std::sync::Arc;

use super::*;
use crate::primitives::key_value_store::InMemoryDeviceKeyValueStore;

/// A store whose every operation fails the way a broken keychain would.
struct BrokenStore;

impl DeviceKeyValueStore for BrokenStore {
    fn get(&self, _key: String) -> Result<String, KeyValueStoreError> {
        Err(KeyValueStoreError::ParsingFailure)
    }

    fn set(&self, _key: String, _value: String) -> Result<(), KeyValueStoreError> {
        Err(KeyValueStoreError::UpdateFailure)
    }

    fn delete(&self, _key: String) -> Result<(), KeyValueStoreError> {
        Err(KeyValueStoreError::UpdateFailure)
    }
}

fn configured_session() -> CaptureSession {
    let session = CaptureSession::new();
    session.configure(
        "myapp.janraincapture.com".to_string(),
        "myapp.janrain.com".to_string(),
        "abc123clientid".to_string(),
        "user".to_string(),
    );
    session
}

#[test]
fn test_unconfigured_getters_fail() {
    let session = CaptureSession::new();

    assert!(!session.is_configured());
    assert!(matches!(session.client_id(), Err(CaptureError::NotConfigured)));
    assert!(matches!(
        session.capture_apid_base_url(),
        Err(CaptureError::NotConfigured)
    ));
}

#[test]
fn test_configure_then_getters_return_exact_values() {
    let session = configured_session();

    assert!(session.is_configured());
    assert_eq!(
        session.capture_apid_domain().unwrap(),
        "myapp.janraincapture.com"
    );
    assert_eq!(session.capture_ui_domain().unwrap(), "myapp.janrain.com");
    assert_eq!(session.client_id().unwrap(), "abc123clientid");
    assert_eq!(session.entity_type_name().unwrap(), "user");
}

#[test]
fn test_reconfigure_replaces_all_values() {
    let session = configured_session();
    session.configure(
        "other.janraincapture.com".to_string(),
        "other.janrain.com".to_string(),
        "otherclient".to_string(),
        "member".to_string(),
    );

    assert_eq!(
        session.config().unwrap(),
        CaptureConfig {
            capture_apid_domain: "other.janraincapture.com".to_string(),
            capture_ui_domain: "other.janrain.com".to_string(),
            client_id: "otherclient".to_string(),
            entity_type_name: "member".to_string(),
        }
    );
}

#[test]
fn test_base_urls() {
    let session = configured_session();

    assert_eq!(
        session.capture_apid_base_url().unwrap(),
        "https://myapp.janraincapture.com"
    );
    assert_eq!(
        session.capture_ui_base_url().unwrap(),
        "https://myapp.janrain.com"
    );
}

#[test]
fn test_base_url_keeps_explicit_scheme() {
    assert_eq!(base_url("http://localhost:8080/"), "http://localhost:8080");
    assert_eq!(base_url("https://capture.test"), "https://capture.test");
}

#[test]
fn test_mobile_endpoint_url() {
    let session = configured_session();

    assert_eq!(
        session.capture_mobile_endpoint_url().unwrap(),
        "https://myapp.janrain.com/oauth/mobile_signin?client_id=abc123clientid\
         &redirect_uri=https%3A%2F%2Fmyapp.janrain.com%2Fcmeu"
    );
}

#[test]
fn test_access_tokens_are_per_user() {
    let session = CaptureSession::new();
    session.set_access_token("token-a".to_string(), "alice".to_string());
    session.set_access_token("token-b".to_string(), "bob".to_string());
    session.set_access_token("token-a2".to_string(), "alice".to_string());

    assert_eq!(
        session.access_token_for_user("alice".to_string()).as_deref(),
        Some("token-a2")
    );
    assert_eq!(
        session.access_token_for_user("bob".to_string()).as_deref(),
        Some("token-b")
    );
    assert_eq!(session.access_token_for_user("carol".to_string()), None);
}

#[test]
fn test_access_token_follows_current_user() {
    let session = CaptureSession::new();
    assert_eq!(session.access_token(), None);

    session.set_access_token("token-a".to_string(), "alice".to_string());
    assert_eq!(session.access_token().as_deref(), Some("token-a"));

    session.set_access_token("token-b".to_string(), "bob".to_string());
    assert_eq!(session.current_user().as_deref(), Some("bob"));
    assert_eq!(session.access_token().as_deref(), Some("token-b"));
}

#[test]
fn test_creation_token_is_global() {
    let session = CaptureSession::new();
    assert_eq!(session.creation_token(), None);

    session.set_creation_token("creation-1".to_string());
    session.set_access_token("token-a".to_string(), "alice".to_string());

    assert_eq!(session.creation_token().as_deref(), Some("creation-1"));
}

#[test]
fn test_tokens_are_written_through_to_store() {
    let store = Arc::new(InMemoryDeviceKeyValueStore::new());
    let session = CaptureSession::with_key_value_store(store.clone());

    session.set_access_token("token-a".to_string(), "alice".to_string());
    session.set_creation_token("creation-1".to_string());

    assert_eq!(store.len(), 3);
    assert_eq!(
        store.get("capture/access_token/alice".to_string()).unwrap(),
        "token-a"
    );
    assert_eq!(store.get("capture/current_user".to_string()).unwrap(), "alice");
    assert_eq!(
        store.get("capture/creation_token".to_string()).unwrap(),
        "creation-1"
    );
}

#[test]
fn test_tokens_are_restored_from_store() {
    let store = Arc::new(InMemoryDeviceKeyValueStore::new());
    CaptureSession::with_key_value_store(store.clone())
        .set_access_token("token-a".to_string(), "alice".to_string());

    let restarted = CaptureSession::with_key_value_store(store);

    assert_eq!(restarted.current_user().as_deref(), Some("alice"));
    assert_eq!(restarted.access_token().as_deref(), Some("token-a"));
    assert_eq!(restarted.creation_token(), None);
}

#[test]
fn test_clear_access_token_signs_out_current_user() {
    let session = CaptureSession::new();
    session.set_access_token("token-a".to_string(), "alice".to_string());
    session.set_access_token("token-b".to_string(), "bob".to_string());

    session.clear_access_token("alice".to_string());
    assert_eq!(session.access_token_for_user("alice".to_string()), None);
    assert_eq!(session.current_user().as_deref(), Some("bob"));

    session.clear_access_token("bob".to_string());
    assert_eq!(session.current_user(), None);
    assert_eq!(session.access_token(), None);
}

#[test]
fn test_clear_access_token_deletes_from_store() {
    let store = Arc::new(InMemoryDeviceKeyValueStore::new());
    let session = CaptureSession::with_key_value_store(store.clone());
    session.set_access_token("token-a".to_string(), "alice".to_string());
    session.set_creation_token("creation-1".to_string());

    session.clear_access_token("alice".to_string());
    session.clear_access_token("nobody".to_string());

    assert_eq!(store.len(), 1);
    let restarted = CaptureSession::with_key_value_store(store);
    assert_eq!(restarted.current_user(), None);
    assert_eq!(restarted.access_token_for_user("alice".to_string()), None);
    assert_eq!(restarted.creation_token().as_deref(), Some("creation-1"));
}

#[test]
fn test_store_failures_do_not_fail_token_calls() {
    let session = CaptureSession::with_key_value_store(Arc::new(BrokenStore));

    assert_eq!(session.access_token(), None);
    assert_eq!(session.creation_token(), None);

    session.set_access_token("token-a".to_string(), "alice".to_string());
    assert_eq!(session.access_token().as_deref(), Some("token-a"));

    session.clear_access_token("alice".to_string());
    assert_eq!(session.access_token_for_user("alice".to_string()), None);
}

#[test]
fn test_debug_output_hides_tokens() {
    let session = configured_session();
    session.set_access_token("super-secret".to_string(), "alice".to_string());

    let rendered = format!("{session:?}");
    assert!(rendered.contains("abc123clientid"));
    assert!(!rendered.contains("super-secret"));
}
