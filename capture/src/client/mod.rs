//! Remote operations on Capture entities.
//!
//! Every operation resolves to one of two outcomes, both carrying the caller's `context` back
//! unchanged so responses can be correlated with the code that issued them:
//!
//! | operation         | success                | failure                    |
//! |-------------------|------------------------|----------------------------|
//! | [`update`]        | [`UpdateSucceeded`]    | [`UpdateFailed`]           |
//! | [`replace_array`] | [`ArrayReplaced`]      | [`ArrayReplaceFailed`]     |
//!
//! Operations borrow the entity mutably until they resolve, so two operations on the same
//! entity cannot run at once. Local state is only touched after Capture confirmed the change;
//! a failed or abandoned operation leaves the entity as it was.
//!
//! [`update`]: CaptureClient::update
//! [`replace_array`]: CaptureClient::replace_array

mod request;

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;

pub use request::{map_http_error, parse_response, CaptureEndpoint, CaptureRequest};

use crate::entity::{
    child_path, ArrayField, CaptureArray, CaptureElement, CaptureObject, ManagedByElement,
    Properties,
};
use crate::primitives::{AuthenticatedHttpClient, HttpMethod};
use crate::session::{CaptureConfig, CaptureSession};
use crate::{debug, info, warn, CaptureError};

/// `update` went through; the object's non-array fields are now clean.
#[derive(Debug)]
pub struct UpdateSucceeded<C> {
    /// The caller's context
    pub context: C,
}

/// `update` failed; the object is unchanged.
#[derive(Debug)]
pub struct UpdateFailed<C> {
    /// What went wrong
    pub error: CaptureError,
    /// The caller's context
    pub context: C,
}

/// `replace_array` went through.
///
/// `new_array` holds clones of the elements now installed in the object: same content as what
/// was sent, new identities. Elements of the previous array are stale.
#[derive(Debug)]
pub struct ArrayReplaced<E, C> {
    /// The confirmed elements
    pub new_array: Vec<E>,
    /// Name of the replaced array
    pub array_name: &'static str,
    /// The caller's context
    pub context: C,
}

/// `replace_array` failed; the array is unchanged.
#[derive(Debug)]
pub struct ArrayReplaceFailed<C> {
    /// What went wrong
    pub error: CaptureError,
    /// Name of the array
    pub array_name: &'static str,
    /// The caller's context
    pub context: C,
}

/// Client for the Capture entity API.
///
/// Requests go through the host's [`AuthenticatedHttpClient`]; endpoint configuration and the
/// access token come from the [`CaptureSession`].
pub struct CaptureClient {
    http_client: Arc<dyn AuthenticatedHttpClient>,
    session: Arc<CaptureSession>,
}

impl CaptureClient {
    /// Creates a client.
    #[must_use]
    pub fn new(
        http_client: Arc<dyn AuthenticatedHttpClient>,
        session: Arc<CaptureSession>,
    ) -> Self {
        Self {
            http_client,
            session,
        }
    }

    /// The session this client reads configuration and tokens from.
    #[must_use]
    pub const fn session(&self) -> &Arc<CaptureSession> {
        &self.session
    }

    /// Pushes the dirty non-array fields of `object` (recursing into sub-objects) to Capture.
    ///
    /// When nothing is dirty this resolves immediately without a request.
    ///
    /// # Errors
    /// [`UpdateFailed`] with the context. Array elements that were never confirmed or whose
    /// array has been replaced fail with `ElementNotOnCapture` / `StaleArray` before any request.
    pub async fn update<O, C>(
        &self,
        object: &mut O,
        context: C,
    ) -> Result<UpdateSucceeded<C>, UpdateFailed<C>>
    where
        O: CaptureObject,
    {
        match self.send_update(object).await {
            Ok(()) => Ok(UpdateSucceeded { context }),
            Err(error) => Err(UpdateFailed { error, context }),
        }
    }

    /// Replaces the whole array `field` of `object` on Capture with its local content.
    ///
    /// On success the array is swapped for the server-confirmed version: new element instances
    /// with equal content. Any element of the old array, including copies, reports
    /// `StaleArray` from then on.
    ///
    /// # Errors
    /// [`ArrayReplaceFailed`] with the array name and context; the array is left untouched.
    pub async fn replace_array<O, E, C>(
        &self,
        object: &mut O,
        field: &ArrayField<O, E>,
        context: C,
    ) -> Result<ArrayReplaced<E, C>, ArrayReplaceFailed<C>>
    where
        O: CaptureObject,
        E: CaptureElement,
    {
        match self.send_replace(object, field).await {
            Ok(new_array) => Ok(ArrayReplaced {
                new_array,
                array_name: field.name,
                context,
            }),
            Err(error) => Err(ArrayReplaceFailed {
                error,
                array_name: field.name,
                context,
            }),
        }
    }

    /// [`replace_array`](Self::replace_array) for the `managedBy` array of [`Properties`].
    ///
    /// # Errors
    /// See [`replace_array`](Self::replace_array).
    pub async fn replace_managed_by_array<C>(
        &self,
        properties: &mut Properties,
        context: C,
    ) -> Result<ArrayReplaced<ManagedByElement, C>, ArrayReplaceFailed<C>> {
        self.replace_array(properties, &Properties::MANAGED_BY, context)
            .await
    }

    async fn send_update<O: CaptureObject>(&self, object: &mut O) -> Result<(), CaptureError> {
        object.ensure_updatable()?;

        let path = object.capture_path();
        let attributes = object.update_attributes();
        if attributes.is_empty() {
            debug!("update of {} skipped, nothing changed", path);
            return Ok(());
        }

        let (config, access_token) = self.credentials()?;
        let request = CaptureRequest::new(CaptureEndpoint::EntityUpdate)
            .param("type_name", config.entity_type_name.as_str())
            .param("attribute_name", path.as_str())
            .param("attributes", Value::Object(attributes).to_string())
            .param("access_token", access_token);

        self.execute(&config, &request).await?;
        object.mark_synced();
        Ok(())
    }

    async fn send_replace<O, E>(
        &self,
        object: &mut O,
        field: &ArrayField<O, E>,
    ) -> Result<Vec<E>, CaptureError>
    where
        O: CaptureObject,
        E: CaptureElement,
    {
        let array_path = child_path(&object.capture_path(), field.name);
        let attributes = (field.get)(object).to_replace_json();

        let (config, access_token) = self.credentials()?;
        let request = CaptureRequest::new(CaptureEndpoint::EntityReplace)
            .param("type_name", config.entity_type_name.as_str())
            .param("attribute_name", array_path.as_str())
            .param("attributes", attributes.to_string())
            .param("access_token", access_token);

        let response = self.execute(&config, &request).await?;
        let result = response
            .get("result")
            .ok_or_else(|| CaptureError::InvalidResponse {
                message: format!("{} response has no result", request.endpoint()),
            })?;

        // Parse everything before touching the object: a bad element must not leave a
        // half-installed array behind.
        let (new_array, lease) =
            CaptureArray::<E>::from_capture_json(result, field.name, &array_path)?;

        let sent = attributes.as_array().map_or(0, Vec::len);
        if new_array.len() != sent {
            warn!(
                "{} returned {} elements for {} sent",
                array_path,
                new_array.len(),
                sent
            );
        }

        (field.get_mut)(object).install(new_array.clone(), lease);
        Ok(new_array)
    }

    fn credentials(&self) -> Result<(CaptureConfig, String), CaptureError> {
        let config = self.session.config()?;
        let access_token = self
            .session
            .access_token()
            .ok_or(CaptureError::MissingAccessToken)?;
        Ok((config, access_token))
    }

    async fn execute(
        &self,
        config: &CaptureConfig,
        request: &CaptureRequest,
    ) -> Result<Value, CaptureError> {
        let request_id = hex::encode(rand::random::<[u8; 8]>());
        let started_at = Utc::now();
        debug!(
            "capture_request.started id={} endpoint={}",
            request_id,
            request.endpoint()
        );

        let result = self
            .http_client
            .fetch_from_capture(
                request.url(&config.apid_base_url()),
                HttpMethod::Post,
                CaptureRequest::headers(),
                Some(request.form_body()),
            )
            .await
            .map_err(map_http_error)
            .and_then(|body| parse_response(&body));

        let elapsed_ms = (Utc::now() - started_at).num_milliseconds();
        match &result {
            Ok(_) => info!(
                "capture_request.succeeded id={} endpoint={} elapsed_ms={}",
                request_id,
                request.endpoint(),
                elapsed_ms
            ),
            Err(e) => warn!(
                "capture_request.failed id={} endpoint={} elapsed_ms={} error={}",
                request_id,
                request.endpoint(),
                elapsed_ms,
                e
            ),
        }
        result
    }
}
