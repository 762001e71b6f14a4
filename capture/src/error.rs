use crate::primitives::HttpError;

/// Everything that can make a Capture operation fail.
///
/// Remote operations never panic and never retry; the error is handed back together with the
/// caller's context so the caller can decide between retrying and re-fetching.
#[crate::capture_error]
pub enum CaptureError {
    /// The transport could not complete the request.
    #[error("HTTP request failed: {0}")]
    Http(#[from] HttpError),

    /// Capture answered with an error document (validation failure, bad token, ...).
    #[error("Capture error {code} ({error}): {description}")]
    Api {
        /// Numeric Capture error code
        code: i64,
        /// Short error identifier, e.g. `invalid_argument`
        error: String,
        /// Human readable description
        description: String,
    },

    /// The array this element belongs to was replaced on Capture; the element is stale.
    #[error("the '{array_name}' array was replaced; element is stale")]
    StaleArray {
        /// Name of the replaced array
        array_name: String,
    },

    /// The element was never confirmed by Capture (e.g. appended locally).
    #[error("element of '{array_name}' has no Capture id; replace the array instead")]
    ElementNotOnCapture {
        /// Name of the array owning the element
        array_name: String,
    },

    /// The session has not been configured with domains and client id.
    #[error("Capture session is not configured")]
    NotConfigured,

    /// No access token is available for the signed-in user.
    #[error("no access token available")]
    MissingAccessToken,

    /// The response body could not be understood.
    #[error("invalid response from Capture: {message}")]
    InvalidResponse {
        /// What was wrong with the response
        message: String,
    },
}

impl From<serde_json::Error> for CaptureError {
    fn from(e: serde_json::Error) -> Self {
        Self::InvalidResponse {
            message: e.to_string(),
        }
    }
}

impl CaptureError {
    /// Whether retrying the same call later can reasonably succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Http(HttpError::BadStatusCode { code, .. }) => *code >= 500,
            Self::Http(HttpError::Cancelled) => false,
            Self::Http(_) => true,
            _ => false,
        }
    }
}
