//! Local mirrors of Capture records.
//!
//! Every entity keeps, per scalar field, the value Capture last confirmed next to the local value
//! ([`Tracked`]). Array-typed fields ([`CaptureArray`]) are kept apart: they never make an object
//! dirty and are synced by replacing them whole, after which the array holds new element
//! instances and the old ones are marked stale.

mod array;
mod properties;
mod tracked;

use serde_json::{Map, Value};

pub use array::{
    ArrayField, ArrayLease, CaptureArray, CaptureElement, ElementAttachment, ElementId,
};
pub use properties::{ManagedByElement, Properties};
pub use tracked::Tracked;

use crate::CaptureError;

/// An object or array element that can be updated on Capture.
///
/// Implementations are hand-written per entity type: `needs_update`, `update_attributes` and
/// `mark_synced` visit the scalar fields and recurse into owned sub-objects, and skip arrays.
pub trait CaptureObject: Send {
    /// Attribute path of this object on Capture, e.g. `/properties`.
    fn capture_path(&self) -> String;

    /// Whether any scalar field, here or in a sub-object, differs from its confirmed value.
    /// Arrays and their elements are not considered.
    fn needs_update(&self) -> bool;

    /// The dirty non-array fields as a JSON object; sub-objects nest.
    fn update_attributes(&self) -> Map<String, Value>;

    /// Records all non-array fields as confirmed, recursively.
    fn mark_synced(&mut self);

    /// Checks that this object may be updated on its own.
    ///
    /// # Errors
    /// Array elements fail with `StaleArray` or `ElementNotOnCapture`.
    fn ensure_updatable(&self) -> Result<(), CaptureError> {
        Ok(())
    }
}

/// Adds `field` to `attributes` under `name` if it is dirty.
pub fn insert_if_dirty<T>(attributes: &mut Map<String, Value>, name: &str, field: &Tracked<T>)
where
    T: Clone + PartialEq + Into<Value>,
{
    if field.is_dirty() {
        attributes.insert(name.to_string(), field.to_json());
    }
}

/// Nests the dirty fields of `object` under `name`, if there are any.
pub fn insert_sub_object<O: CaptureObject>(
    attributes: &mut Map<String, Value>,
    name: &str,
    object: &O,
) {
    let nested = object.update_attributes();
    if !nested.is_empty() {
        attributes.insert(name.to_string(), Value::Object(nested));
    }
}

/// Joins a Capture attribute path and a property name.
#[must_use]
pub fn child_path(parent: &str, name: &str) -> String {
    format!("{}/{name}", parent.trim_end_matches('/'))
}
