/// Transport trait implemented by the host app, plus its request and error types.
pub mod http_client;

/// Device key-value store implemented by the host app.
pub mod key_value_store;

/// Log forwarding to the host app and context-prefixed logging macros.
pub mod logger;

pub use http_client::{AuthenticatedHttpClient, HttpError, HttpHeader, HttpMethod};
pub use key_value_store::{DeviceKeyValueStore, KeyValueStoreError};
