#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![warn(missing_docs, dead_code)]

//! `capture` is a client for the Janrain Capture identity API.
//!
//! It mirrors Capture records locally with dirty tracking, pushes changed fields with
//! `entity.update` and swaps whole arrays with `entity.replace`. The HTTP transport, the device
//! key-value store and log output are provided by the host app through foreign traits.
//!
//! ```ignore
//! let session = Arc::new(CaptureSession::new());
//! session.configure(apid, ui, client_id, "user".to_string());
//! session.set_access_token(token, user_id);
//!
//! let client = CaptureClient::new(http_client, session);
//! properties.managed_by_mut().push(ManagedByElement::new("other-client"));
//! client.replace_array(&mut properties, &Properties::MANAGED_BY, ()).await?;
//! ```

pub use capture_macros::{capture_error, capture_export};

/// Host-provided capabilities (transport, storage, logging).
pub mod primitives;

/// The crate's error type.
mod error;
pub use error::CaptureError;

/// Endpoint configuration and tokens.
pub mod session;
pub use session::{CaptureConfig, CaptureSession};

/// Dirty-tracked local mirrors of Capture records.
pub mod entity;
pub use entity::{ManagedByElement, Properties};

/// Update and array-replace operations against Capture.
pub mod client;
pub use client::{
    ArrayReplaceFailed, ArrayReplaced, CaptureClient, UpdateFailed, UpdateSucceeded,
};

#[cfg(test)]
mod test_utils;

uniffi::setup_scaffolding!("capture");
