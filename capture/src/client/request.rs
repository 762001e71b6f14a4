//! Wire format of the Capture entity API.
//!
//! Requests are `application/x-www-form-urlencoded` POSTs; responses are JSON documents with a
//! `stat` member of `"ok"` or `"error"`.

use serde::Deserialize;
use serde_json::Value;

use crate::primitives::{HttpError, HttpHeader};
use crate::CaptureError;

/// Endpoints of the Capture entity API used by the SDK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum CaptureEndpoint {
    /// Updates the given attributes of an object, leaving everything else alone.
    #[strum(serialize = "entity.update")]
    EntityUpdate,
    /// Replaces the value at an attribute path, used for whole plurals.
    #[strum(serialize = "entity.replace")]
    EntityReplace,
}

/// A form-encoded request against one endpoint.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    endpoint: CaptureEndpoint,
    params: Vec<(&'static str, String)>,
}

impl CaptureRequest {
    /// A request without parameters.
    #[must_use]
    pub const fn new(endpoint: CaptureEndpoint) -> Self {
        Self {
            endpoint,
            params: Vec::new(),
        }
    }

    /// Adds a form parameter.
    #[must_use]
    pub fn param(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.params.push((name, value.into()));
        self
    }

    /// The endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> CaptureEndpoint {
        self.endpoint
    }

    /// Absolute URL under `base_url`.
    #[must_use]
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/{}", base_url.trim_end_matches('/'), self.endpoint)
    }

    /// Headers sent with every request.
    #[must_use]
    pub fn headers() -> Vec<HttpHeader> {
        vec![
            HttpHeader::new("Content-Type", "application/x-www-form-urlencoded"),
            HttpHeader::new("Accept", "application/json"),
        ]
    }

    /// The url-encoded form body.
    #[must_use]
    pub fn form_body(&self) -> Vec<u8> {
        self.params
            .iter()
            .map(|(name, value)| format!("{name}={}", urlencoding::encode(value)))
            .collect::<Vec<_>>()
            .join("&")
            .into_bytes()
    }
}

#[derive(Debug, Deserialize)]
struct ErrorDocument {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Parses a successful transport response.
///
/// # Errors
/// `CaptureError::Api` for `stat: error` documents, `CaptureError::InvalidResponse` for anything
/// that is not a Capture response.
pub fn parse_response(body: &[u8]) -> Result<Value, CaptureError> {
    let document: Value = serde_json::from_slice(body)?;

    match document.get("stat").and_then(Value::as_str) {
        Some("ok") => Ok(document),
        Some("error") => Err(api_error(document)),
        Some(other) => Err(CaptureError::InvalidResponse {
            message: format!("unknown stat '{other}'"),
        }),
        None => Err(CaptureError::InvalidResponse {
            message: "response has no stat".to_string(),
        }),
    }
}

/// Maps a transport failure, keeping the Capture error document of 4xx/5xx responses.
#[must_use]
pub fn map_http_error(error: HttpError) -> CaptureError {
    if let HttpError::BadStatusCode { response_body, .. } = &error {
        if let Ok(document) = serde_json::from_slice::<Value>(response_body) {
            if document.get("stat").and_then(Value::as_str) == Some("error") {
                return api_error(document);
            }
        }
    }
    CaptureError::Http(error)
}

fn api_error(document: Value) -> CaptureError {
    match serde_json::from_value::<ErrorDocument>(document) {
        Ok(doc) => CaptureError::Api {
            code: doc.code,
            error: doc.error,
            description: doc.error_description,
        },
        Err(e) => CaptureError::InvalidResponse {
            message: format!("malformed error document: {e}"),
        },
    }
}
