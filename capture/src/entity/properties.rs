use serde_json::{Map, Value};

use super::{
    child_path, insert_if_dirty, ArrayField, CaptureArray, CaptureElement, CaptureObject,
    ElementAttachment, ElementId, Tracked,
};
use crate::CaptureError;

const MANAGED_BY: &str = "managedBy";
const CLIENT_ID: &str = "clientId";

/// The `properties` object of a Capture record.
///
/// Its only field, `managedBy`, is a plural listing the client ids allowed to manage the
/// record. Being an array it never makes the object dirty; push changes to it with
/// [`CaptureClient::replace_array`](crate::client::CaptureClient::replace_array) and
/// [`Properties::MANAGED_BY`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Properties {
    managed_by: CaptureArray<ManagedByElement>,
}

fn managed_by(properties: &Properties) -> &CaptureArray<ManagedByElement> {
    &properties.managed_by
}

fn managed_by_mut(properties: &mut Properties) -> &mut CaptureArray<ManagedByElement> {
    &mut properties.managed_by
}

impl Properties {
    /// Attribute path on Capture.
    pub const CAPTURE_PATH: &'static str = "/properties";

    /// The `managedBy` array.
    pub const MANAGED_BY: ArrayField<Self, ManagedByElement> = ArrayField {
        name: MANAGED_BY,
        get: managed_by,
        get_mut: managed_by_mut,
    };

    /// An empty object.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the object from Capture's JSON, e.g.
    /// `{"managedBy": [{"id": 3, "clientId": "abc"}]}`.
    ///
    /// A missing or `null` `managedBy` yields an empty, confirmed array.
    ///
    /// # Errors
    /// `CaptureError::InvalidResponse` if the JSON does not match.
    pub fn from_capture_json(value: &Value) -> Result<Self, CaptureError> {
        let object = value.as_object().ok_or_else(|| CaptureError::InvalidResponse {
            message: "properties is not an object".to_string(),
        })?;

        let array_json = match object.get(MANAGED_BY) {
            None | Some(Value::Null) => Value::Array(Vec::new()),
            Some(array) => array.clone(),
        };
        let (elements, lease) = CaptureArray::from_capture_json(
            &array_json,
            MANAGED_BY,
            &child_path(Self::CAPTURE_PATH, MANAGED_BY),
        )?;

        let mut properties = Self::new();
        properties.managed_by.install(elements, lease);
        Ok(properties)
    }

    /// Full JSON form of the object, including arrays and element ids.
    #[must_use]
    pub fn to_capture_json(&self) -> Value {
        serde_json::json!({
            MANAGED_BY: self.managed_by.iter().map(ManagedByElement::to_capture_json).collect::<Vec<_>>(),
        })
    }

    /// The `managedBy` array.
    #[must_use]
    pub const fn managed_by(&self) -> &CaptureArray<ManagedByElement> {
        &self.managed_by
    }

    /// Mutable access to `managedBy`, to add, remove, reorder or edit elements.
    pub fn managed_by_mut(&mut self) -> &mut CaptureArray<ManagedByElement> {
        &mut self.managed_by
    }

    /// Replaces the local content of `managedBy` with new, unconfirmed elements.
    pub fn set_managed_by<I, S>(&mut self, client_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self.managed_by.elements_mut() =
            client_ids.into_iter().map(ManagedByElement::new).collect();
    }
}

impl CaptureObject for Properties {
    fn capture_path(&self) -> String {
        Self::CAPTURE_PATH.to_string()
    }

    fn needs_update(&self) -> bool {
        false
    }

    fn update_attributes(&self) -> Map<String, Value> {
        Map::new()
    }

    fn mark_synced(&mut self) {}
}

/// One entry of [`Properties`]' `managedBy` plural: a Capture client id.
///
/// Equality compares the client id only; identity and server id are ignored.
#[derive(Debug, Clone)]
pub struct ManagedByElement {
    element_id: ElementId,
    capture_id: Option<i64>,
    client_id: Tracked<String>,
    attachment: Option<ElementAttachment>,
}

impl ManagedByElement {
    /// A new local element, not yet on Capture.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            element_id: ElementId::next(),
            capture_id: None,
            client_id: Tracked::new(client_id.into()),
            attachment: None,
        }
    }

    /// The client id.
    #[must_use]
    pub fn client_id(&self) -> &str {
        self.client_id.get()
    }

    /// Changes the client id locally.
    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        self.client_id.set(client_id.into());
    }

    /// Server id, present once the element came from Capture.
    #[must_use]
    pub const fn capture_id(&self) -> Option<i64> {
        self.capture_id
    }

    /// Whether this element can be updated without replacing the whole array.
    ///
    /// False for elements added locally and for elements of an array that has since been
    /// replaced.
    #[must_use]
    pub fn can_be_updated_on_capture(&self) -> bool {
        self.ensure_updatable().is_ok()
    }

    fn to_capture_json(&self) -> Value {
        let mut object = Map::new();
        if let Some(id) = self.capture_id {
            object.insert("id".to_string(), Value::from(id));
        }
        object.insert(CLIENT_ID.to_string(), self.client_id.to_json());
        Value::Object(object)
    }
}

impl PartialEq for ManagedByElement {
    fn eq(&self, other: &Self) -> bool {
        self.client_id == other.client_id
    }
}

impl Eq for ManagedByElement {}

impl CaptureElement for ManagedByElement {
    fn to_replace_json(&self) -> Value {
        serde_json::json!({ CLIENT_ID: self.client_id.get() })
    }

    fn from_capture_json(
        value: &Value,
        attachment: ElementAttachment,
    ) -> Result<Self, CaptureError> {
        let invalid = |message: &str| CaptureError::InvalidResponse {
            message: format!("{MANAGED_BY} element {message}: {value}"),
        };

        let capture_id = value
            .get("id")
            .and_then(Value::as_i64)
            .ok_or_else(|| invalid("has no id"))?;
        let client_id = value
            .get(CLIENT_ID)
            .and_then(Value::as_str)
            .ok_or_else(|| invalid("has no clientId"))?;

        Ok(Self {
            element_id: ElementId::next(),
            capture_id: Some(capture_id),
            client_id: Tracked::new(client_id.to_string()),
            attachment: Some(attachment),
        })
    }

    fn element_id(&self) -> ElementId {
        self.element_id
    }
}

impl CaptureObject for ManagedByElement {
    fn capture_path(&self) -> String {
        match (&self.attachment, self.capture_id) {
            (Some(attachment), Some(id)) => attachment.element_path(id),
            _ => child_path(Properties::CAPTURE_PATH, MANAGED_BY),
        }
    }

    fn needs_update(&self) -> bool {
        self.client_id.is_dirty()
    }

    fn update_attributes(&self) -> Map<String, Value> {
        let mut attributes = Map::new();
        insert_if_dirty(&mut attributes, CLIENT_ID, &self.client_id);
        attributes
    }

    fn mark_synced(&mut self) {
        self.client_id.mark_synced();
    }

    fn ensure_updatable(&self) -> Result<(), CaptureError> {
        match (&self.attachment, self.capture_id) {
            (Some(attachment), Some(_)) => attachment.ensure_live(),
            _ => Err(CaptureError::ElementNotOnCapture {
                array_name: MANAGED_BY.to_string(),
            }),
        }
    }
}
