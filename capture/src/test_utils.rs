//! Test utilities for unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use crate::primitives::{AuthenticatedHttpClient, HttpError, HttpHeader, HttpMethod};
use crate::session::CaptureSession;

/// A request as seen by [`FakeCaptureHttpClient`].
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub url: String,
    pub method: HttpMethod,
    pub headers: Vec<HttpHeader>,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    /// Decoded form parameters of the body.
    pub fn form(&self) -> HashMap<String, String> {
        String::from_utf8_lossy(&self.body)
            .split('&')
            .filter(|pair| !pair.is_empty())
            .map(|pair| {
                let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
                (
                    name.to_string(),
                    urlencoding::decode(value).unwrap().into_owned(),
                )
            })
            .collect()
    }

    /// The `attributes` parameter, parsed.
    pub fn attributes(&self) -> serde_json::Value {
        serde_json::from_str(&self.form()["attributes"]).unwrap()
    }
}

/// Scripted transport: answers requests from a queue of canned responses and records them.
///
/// Requests made with an empty queue fail with `HttpError::Generic`.
#[derive(Clone, Default)]
pub struct FakeCaptureHttpClient {
    responses: Arc<Mutex<VecDeque<Result<Vec<u8>, HttpError>>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeCaptureHttpClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a JSON response body.
    pub fn respond_with(&self, document: serde_json::Value) {
        self.responses
            .lock()
            .unwrap()
            .push_back(Ok(serde_json::to_vec(&document).unwrap()));
    }

    /// Queues a transport failure.
    pub fn fail_with(&self, error: HttpError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    /// Everything requested so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl AuthenticatedHttpClient for FakeCaptureHttpClient {
    async fn fetch_from_capture(
        &self,
        url: String,
        method: HttpMethod,
        headers: Vec<HttpHeader>,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, HttpError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url,
            method,
            headers,
            body: body.unwrap_or_default(),
        });

        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(HttpError::Generic {
                    message: "no response queued".to_string(),
                })
            })
    }
}

/// A configured session with a signed-in user.
pub fn signed_in_session() -> Arc<CaptureSession> {
    let session = CaptureSession::new();
    session.configure(
        "myapp.janraincapture.com".to_string(),
        "myapp.us.janraincapture.com".to_string(),
        "client-id".to_string(),
        "user".to_string(),
    );
    session.set_access_token("token-1".to_string(), "user-1".to_string());
    Arc::new(session)
}
