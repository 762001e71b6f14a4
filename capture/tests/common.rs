#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use capture::primitives::{AuthenticatedHttpClient, HttpError, HttpHeader, HttpMethod};
use capture::CaptureSession;

pub const APID_DOMAIN: &str = "myapp.janraincapture.com";
pub const UI_DOMAIN: &str = "myapp.us.janraincapture.com";
pub const CLIENT_ID: &str = "mobile-client";
pub const ACCESS_TOKEN: &str = "token-user-1";

/// In-process stand-in for the Capture entity API.
///
/// Keeps one record, applies `entity.update` and `entity.replace` to it and assigns fresh
/// element ids on every replace, like Capture does.
#[derive(Clone)]
pub struct FakeCaptureServer {
    record: Arc<Mutex<Value>>,
    next_id: Arc<Mutex<i64>>,
    offline: Arc<Mutex<bool>>,
    calls: Arc<Mutex<Vec<String>>>,
}

impl FakeCaptureServer {
    pub fn new(record: Value) -> Self {
        Self {
            record: Arc::new(Mutex::new(record)),
            next_id: Arc::new(Mutex::new(100)),
            offline: Arc::new(Mutex::new(false)),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Makes every following request fail with `NoConnectivity`.
    pub fn set_offline(&self, offline: bool) {
        *self.offline.lock().unwrap() = offline;
    }

    /// The server-side record.
    pub fn record(&self) -> Value {
        self.record.lock().unwrap().clone()
    }

    /// Endpoints called so far.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn handle(&self, endpoint: &str, form: &HashMap<String, String>) -> Value {
        if form.get("access_token").map(String::as_str) != Some(ACCESS_TOKEN) {
            return error_document(414, "access_token_expired", "invalid access token");
        }
        let Some(path) = form.get("attribute_name") else {
            return error_document(100, "missing_argument", "attribute_name is required");
        };
        let Some(Ok(attributes)) = form.get("attributes").map(|a| serde_json::from_str::<Value>(a))
        else {
            return error_document(200, "invalid_argument", "attributes is not JSON");
        };

        let mut record = self.record.lock().unwrap();
        match endpoint {
            "entity.update" => {
                let Some(target) = resolve(&mut record, path) else {
                    return error_document(223, "unknown_attribute", "no such attribute");
                };
                merge(target, &attributes);
                json!({ "stat": "ok" })
            }
            "entity.replace" => {
                let Some(target) = resolve(&mut record, path) else {
                    return error_document(223, "unknown_attribute", "no such attribute");
                };
                let mut next_id = self.next_id.lock().unwrap();
                let result: Vec<Value> = attributes
                    .as_array()
                    .cloned()
                    .unwrap_or_default()
                    .into_iter()
                    .map(|mut element| {
                        *next_id += 1;
                        element["id"] = json!(*next_id);
                        element
                    })
                    .collect();
                *target = Value::Array(result.clone());
                json!({ "stat": "ok", "result": result })
            }
            other => error_document(404, "unknown_endpoint", other),
        }
    }
}

#[async_trait::async_trait]
impl AuthenticatedHttpClient for FakeCaptureServer {
    async fn fetch_from_capture(
        &self,
        url: String,
        method: HttpMethod,
        _headers: Vec<HttpHeader>,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, HttpError> {
        if *self.offline.lock().unwrap() {
            return Err(HttpError::NoConnectivity);
        }
        if method != HttpMethod::Post {
            return Err(HttpError::Generic {
                message: "unsupported method".to_string(),
            });
        }

        let endpoint = url.rsplit('/').next().unwrap_or_default().to_string();
        self.calls.lock().unwrap().push(endpoint.clone());

        let form = parse_form(&body.unwrap_or_default());
        let response = self.handle(&endpoint, &form);
        let body = serde_json::to_vec(&response).unwrap();
        if response["stat"] == "error" {
            return Err(HttpError::BadStatusCode {
                code: 400,
                response_body: body,
            });
        }
        Ok(body)
    }
}

/// A configured, signed-in session.
pub fn session() -> Arc<CaptureSession> {
    let session = CaptureSession::new();
    session.configure(
        APID_DOMAIN.to_string(),
        UI_DOMAIN.to_string(),
        CLIENT_ID.to_string(),
        "user".to_string(),
    );
    session.set_access_token(ACCESS_TOKEN.to_string(), "user-1".to_string());
    Arc::new(session)
}

fn error_document(code: i64, error: &str, description: &str) -> Value {
    json!({
        "stat": "error",
        "code": code,
        "error": error,
        "error_description": description,
    })
}

fn parse_form(body: &[u8]) -> HashMap<String, String> {
    String::from_utf8_lossy(body)
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| {
            (
                name.to_string(),
                urlencoding::decode(value).unwrap().into_owned(),
            )
        })
        .collect()
}

/// Walks an attribute path such as `/properties/managedBy#101`.
fn resolve<'a>(record: &'a mut Value, path: &str) -> Option<&'a mut Value> {
    let mut current = record;
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        let (name, id) = match segment.split_once('#') {
            Some((name, id)) => (name, Some(id.parse::<i64>().ok()?)),
            None => (segment, None),
        };
        current = current.as_object_mut()?.get_mut(name)?;
        if let Some(id) = id {
            current = current
                .as_array_mut()?
                .iter_mut()
                .find(|element| element["id"] == json!(id))?;
        }
    }
    Some(current)
}

fn merge(target: &mut Value, attributes: &Value) {
    let (Some(target), Some(attributes)) = (target.as_object_mut(), attributes.as_object())
    else {
        return;
    };
    for (name, value) in attributes {
        if value.is_object() && target.get(name).is_some_and(Value::is_object) {
            if let Some(existing) = target.get_mut(name) {
                merge(existing, value);
            }
        } else {
            target.insert(name.clone(), value.clone());
        }
    }
}
