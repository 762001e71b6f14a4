/// HTTP transport that host applications implement for the SDK to reach Capture.
///
/// The SDK builds complete requests (URL, headers, form-encoded body) and leaves the actual
/// networking to the platform stack, so certificate pinning, proxies and reachability are
/// handled the same way as the rest of the app.
///
/// Implementations should map platform errors onto the matching [`HttpError`] variant.
#[uniffi::export(with_foreign)]
#[async_trait::async_trait]
pub trait AuthenticatedHttpClient: Send + Sync {
    /// Performs a request against the Capture API and returns the raw response body.
    ///
    /// # Arguments
    /// * `url` - Absolute URL, e.g. `https://myapp.janraincapture.com/entity.update`
    /// * `method` - The HTTP method
    /// * `headers` - Headers to send in addition to the platform defaults
    /// * `body` - Optional request body
    ///
    /// # Errors
    /// * `HttpError::BadStatusCode` - For 4xx/5xx responses, with the response body
    /// * `HttpError::NoConnectivity` - When no internet connection is available
    /// * `HttpError::Timeout` - When the request times out
    /// * `HttpError::DnsResolutionFailed` - When DNS lookup fails
    /// * `HttpError::ConnectionRefused` - When the server refuses the connection
    /// * `HttpError::SslError` - When TLS validation fails
    /// * `HttpError::Cancelled` - When the request is cancelled
    /// * `HttpError::Generic` - For anything else
    async fn fetch_from_capture(
        &self,
        url: String,
        method: HttpMethod,
        headers: Vec<HttpHeader>,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, HttpError>;
}

/// HTTP methods used against the Capture API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, strum::Display)]
#[strum(serialize_all = "UPPERCASE")]
pub enum HttpMethod {
    /// Reads.
    Get,
    /// Every mutating Capture call.
    Post,
}

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct HttpHeader {
    /// Header name
    pub name: String,
    /// Header value
    pub value: String,
}

impl HttpHeader {
    /// Convenience constructor.
    #[must_use]
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Transport failures reported by the host [`AuthenticatedHttpClient`].
#[crate::capture_error]
pub enum HttpError {
    /// HTTP error with a 4xx/5xx status code
    #[error("Bad status code {code}")]
    BadStatusCode {
        /// The HTTP status code that was returned
        code: u64,
        /// The response body, which may contain a Capture error document
        response_body: Vec<u8>,
    },
    /// No internet connectivity available
    #[error("No internet connectivity")]
    NoConnectivity,
    /// Request timed out
    #[error("Request timed out after {seconds} seconds")]
    Timeout {
        /// Number of seconds before the timeout occurred
        seconds: u64,
    },
    /// DNS resolution failed for the hostname
    #[error("DNS resolution failed for {hostname}")]
    DnsResolutionFailed {
        /// The hostname that failed to resolve
        hostname: String,
    },
    /// Connection was refused by the server
    #[error("Connection refused by {host}")]
    ConnectionRefused {
        /// The host that refused the connection
        host: String,
    },
    /// TLS certificate validation failed
    #[error("SSL certificate validation failed: {reason}")]
    SslError {
        /// Reason for the failure
        reason: String,
    },
    /// The request was cancelled before completion
    #[error("Request was cancelled")]
    Cancelled,
}

/// Converts unexpected foreign callback errors (uncaught exceptions in Swift/Kotlin) to `HttpError`.
///
/// A bare numeric reason is treated as a status code.
impl From<uniffi::UnexpectedUniFFICallbackError> for HttpError {
    fn from(error: uniffi::UnexpectedUniFFICallbackError) -> Self {
        error.reason.parse::<u64>().map_or_else(
            |_| Self::Generic {
                message: error.reason.clone(),
            },
            |code| Self::BadStatusCode {
                code,
                response_body: Vec::new(),
            },
        )
    }
}
