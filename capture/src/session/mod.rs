//! Session and endpoint configuration.
//!
//! A [`CaptureSession`] is configured once at startup with the Capture domains, client id and
//! entity type, and then read on every request the [`CaptureClient`](crate::client::CaptureClient)
//! builds. It also holds the OAuth access tokens (one per signed-in user) and the creation token
//! returned by a "thin" registration.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::primitives::{DeviceKeyValueStore, KeyValueStoreError};
use crate::{capture_export, debug, info, warn, CaptureError};

const ACCESS_TOKEN_KEY_PREFIX: &str = "capture/access_token/";
const CURRENT_USER_KEY: &str = "capture/current_user";
const CREATION_TOKEN_KEY: &str = "capture/creation_token";

/// Path of the mobile sign-in endpoint on the Capture UI domain.
const MOBILE_SIGNIN_PATH: &str = "/oauth/mobile_signin";

/// Redirect path Capture uses for the mobile endpoint; never loaded by the SDK.
const MOBILE_REDIRECT_PATH: &str = "/cmeu";

/// Endpoint configuration of a Capture application.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct CaptureConfig {
    /// Domain of the Capture API, e.g. `myapp.janraincapture.com`
    pub capture_apid_domain: String,
    /// Domain serving the Capture UI and OAuth endpoints
    pub capture_ui_domain: String,
    /// Capture client id of this app
    pub client_id: String,
    /// Name of the entity type (schema) records live in, usually `user`
    pub entity_type_name: String,
}

impl CaptureConfig {
    /// Base URL of the Capture API.
    #[must_use]
    pub fn apid_base_url(&self) -> String {
        base_url(&self.capture_apid_domain)
    }

    /// Base URL of the Capture UI.
    #[must_use]
    pub fn ui_base_url(&self) -> String {
        base_url(&self.capture_ui_domain)
    }

    /// URL the host opens to start a mobile sign-in.
    #[must_use]
    pub fn mobile_endpoint_url(&self) -> String {
        let ui_base = self.ui_base_url();
        format!(
            "{ui_base}{MOBILE_SIGNIN_PATH}?client_id={}&redirect_uri={}",
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&format!("{ui_base}{MOBILE_REDIRECT_PATH}")),
        )
    }
}

/// Domains are configured bare; an explicit scheme is kept as given.
fn base_url(domain: &str) -> String {
    let domain = domain.trim_end_matches('/');
    if domain.starts_with("https://") || domain.starts_with("http://") {
        domain.to_string()
    } else {
        format!("https://{domain}")
    }
}

#[derive(Debug, Default)]
struct Tokens {
    access_tokens: HashMap<String, String>,
    current_user: Option<String>,
    creation_token: Option<String>,
}

/// Configuration and credentials used to build Capture requests.
///
/// Writers take a short exclusive lock; readers never block each other. Configure the session
/// before issuing requests from several tasks.
#[derive(uniffi::Object)]
pub struct CaptureSession {
    config: RwLock<Option<CaptureConfig>>,
    tokens: RwLock<Tokens>,
    kv_store: Option<Arc<dyn DeviceKeyValueStore>>,
}

impl std::fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // tokens stay out of debug output
        f.debug_struct("CaptureSession")
            .field("config", &*self.config.read().unwrap_or_else(PoisonError::into_inner))
            .field("persistent", &self.kv_store.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for CaptureSession {
    fn default() -> Self {
        Self::new()
    }
}

#[capture_export]
impl CaptureSession {
    /// Creates an unconfigured session whose tokens only live in memory.
    #[uniffi::constructor]
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: RwLock::new(None),
            tokens: RwLock::new(Tokens::default()),
            kv_store: None,
        }
    }

    /// Creates an unconfigured session that persists tokens in the given store.
    ///
    /// Tokens already in the store are picked up lazily on first read.
    #[uniffi::constructor]
    #[must_use]
    pub fn with_key_value_store(kv_store: Arc<dyn DeviceKeyValueStore>) -> Self {
        Self {
            config: RwLock::new(None),
            tokens: RwLock::new(Tokens::default()),
            kv_store: Some(kv_store),
        }
    }

    /// Sets the domains, client id and entity type name in one step.
    ///
    /// Replaces any previous configuration.
    pub fn configure(
        &self,
        capture_apid_domain: String,
        capture_ui_domain: String,
        client_id: String,
        entity_type_name: String,
    ) {
        let config = CaptureConfig {
            capture_apid_domain,
            capture_ui_domain,
            client_id,
            entity_type_name,
        };
        info!(
            "configured apid_domain={} ui_domain={} entity_type={}",
            config.capture_apid_domain, config.capture_ui_domain, config.entity_type_name
        );
        *self.config.write().unwrap_or_else(PoisonError::into_inner) = Some(config);
    }

    /// Whether [`configure`](Self::configure) has been called.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// The full current configuration.
    ///
    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn config(&self) -> Result<CaptureConfig, CaptureError> {
        self.config
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(CaptureError::NotConfigured)
    }

    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn capture_apid_domain(&self) -> Result<String, CaptureError> {
        self.config().map(|c| c.capture_apid_domain)
    }

    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn capture_ui_domain(&self) -> Result<String, CaptureError> {
        self.config().map(|c| c.capture_ui_domain)
    }

    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn client_id(&self) -> Result<String, CaptureError> {
        self.config().map(|c| c.client_id)
    }

    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn entity_type_name(&self) -> Result<String, CaptureError> {
        self.config().map(|c| c.entity_type_name)
    }

    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn capture_apid_base_url(&self) -> Result<String, CaptureError> {
        self.config().map(|c| c.apid_base_url())
    }

    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn capture_ui_base_url(&self) -> Result<String, CaptureError> {
        self.config().map(|c| c.ui_base_url())
    }

    /// # Errors
    /// `CaptureError::NotConfigured` before the session is configured.
    pub fn capture_mobile_endpoint_url(&self) -> Result<String, CaptureError> {
        self.config().map(|c| c.mobile_endpoint_url())
    }

    /// Stores the access token of `user_id` and makes that user the current one.
    pub fn set_access_token(&self, access_token: String, user_id: String) {
        debug!("storing access token for user {}", user_id);
        self.persist(&access_token_key(&user_id), &access_token);
        self.persist(CURRENT_USER_KEY, &user_id);

        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access_tokens.insert(user_id.clone(), access_token);
        tokens.current_user = Some(user_id);
    }

    /// The access token last stored for `user_id`.
    #[must_use]
    pub fn access_token_for_user(&self, user_id: String) -> Option<String> {
        let cached = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .access_tokens
            .get(&user_id)
            .cloned();
        if cached.is_some() {
            return cached;
        }

        let restored = self.restore(&access_token_key(&user_id))?;
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .access_tokens
            .insert(user_id, restored.clone());
        Some(restored)
    }

    /// The user whose token was stored most recently.
    #[must_use]
    pub fn current_user(&self) -> Option<String> {
        let cached = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_user
            .clone();
        cached.or_else(|| {
            let restored = self.restore(CURRENT_USER_KEY)?;
            self.tokens
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .current_user = Some(restored.clone());
            Some(restored)
        })
    }

    /// The access token of the current user.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.current_user()
            .and_then(|user_id| self.access_token_for_user(user_id))
    }

    /// Signs `user_id` out by forgetting their access token, here and in the device store.
    ///
    /// If `user_id` is the current user, there is no current user afterwards.
    pub fn clear_access_token(&self, user_id: String) {
        debug!("clearing access token for user {}", user_id);
        let was_current = self.current_user().as_deref() == Some(user_id.as_str());

        self.forget(&access_token_key(&user_id));
        if was_current {
            self.forget(CURRENT_USER_KEY);
        }

        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        tokens.access_tokens.remove(&user_id);
        if was_current {
            tokens.current_user = None;
        }
    }

    /// Stores the creation token of a pending registration.
    pub fn set_creation_token(&self, creation_token: String) {
        self.persist(CREATION_TOKEN_KEY, &creation_token);
        self.tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .creation_token = Some(creation_token);
    }

    /// The creation token, if one was stored.
    #[must_use]
    pub fn creation_token(&self) -> Option<String> {
        let cached = self
            .tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .creation_token
            .clone();
        cached.or_else(|| {
            let restored = self.restore(CREATION_TOKEN_KEY)?;
            self.tokens
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .creation_token = Some(restored.clone());
            Some(restored)
        })
    }
}

impl CaptureSession {
    /// Writes through to the device store. Failures only cost persistence, so they are logged.
    fn persist(&self, key: &str, value: &str) {
        let Some(store) = &self.kv_store else {
            return;
        };
        if let Err(e) = store.set(key.to_string(), value.to_string()) {
            warn!("failed to persist {}: {}", key, e);
        }
    }

    fn forget(&self, key: &str) {
        let Some(store) = &self.kv_store else {
            return;
        };
        match store.delete(key.to_string()) {
            Ok(()) | Err(KeyValueStoreError::KeyNotFound) => {}
            Err(e) => warn!("failed to delete {}: {}", key, e),
        }
    }

    fn restore(&self, key: &str) -> Option<String> {
        let store = self.kv_store.as_ref()?;
        match store.get(key.to_string()) {
            Ok(value) => Some(value),
            Err(KeyValueStoreError::KeyNotFound) => None,
            Err(e) => {
                warn!("failed to restore {}: {}", key, e);
                None
            }
        }
    }
}

fn access_token_key(user_id: &str) -> String {
    format!("{ACCESS_TOKEN_KEY_PREFIX}{user_id}")
}

#[cfg(test)]
mod test;
