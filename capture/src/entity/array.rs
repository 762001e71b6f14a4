use std::fmt;
use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;

use super::CaptureObject;
use crate::CaptureError;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a local element instance.
///
/// Elements built from a replaced array always get fresh identities, even when their content is
/// unchanged. Clones share the identity of their original.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    /// Allocates a new identity.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Liveness marker shared by an installed array and all of its elements.
///
/// Replacing the array retires the lease, so copies of old elements still held by the caller
/// can tell they no longer belong to the array on Capture.
#[derive(Debug)]
pub struct ArrayLease {
    array_name: &'static str,
    retired: AtomicBool,
}

impl ArrayLease {
    /// A live lease for the array called `array_name`.
    #[must_use]
    pub fn new(array_name: &'static str) -> Arc<Self> {
        Arc::new(Self {
            array_name,
            retired: AtomicBool::new(false),
        })
    }

    /// Name of the array this lease belongs to.
    #[must_use]
    pub const fn array_name(&self) -> &'static str {
        self.array_name
    }

    /// Whether the array has been replaced since this lease was issued.
    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired.load(Ordering::Acquire)
    }

    fn retire(&self) {
        self.retired.store(true, Ordering::Release);
    }
}

/// Where a server-confirmed element lives on Capture.
#[derive(Debug, Clone)]
pub struct ElementAttachment {
    lease: Arc<ArrayLease>,
    array_path: String,
}

impl ElementAttachment {
    /// Attaches to the array at `array_path` (e.g. `/properties/managedBy`).
    #[must_use]
    pub const fn new(lease: Arc<ArrayLease>, array_path: String) -> Self {
        Self { lease, array_path }
    }

    /// Lease of the owning array.
    #[must_use]
    pub const fn lease(&self) -> &Arc<ArrayLease> {
        &self.lease
    }

    /// Capture path of the owning array.
    #[must_use]
    pub fn array_path(&self) -> &str {
        &self.array_path
    }

    /// Capture path of the element with server id `capture_id`.
    #[must_use]
    pub fn element_path(&self, capture_id: i64) -> String {
        format!("{}#{capture_id}", self.array_path)
    }

    /// Fails if the owning array has been replaced.
    ///
    /// # Errors
    /// `CaptureError::StaleArray` once the lease is retired.
    pub fn ensure_live(&self) -> Result<(), CaptureError> {
        if self.lease.is_retired() {
            return Err(CaptureError::StaleArray {
                array_name: self.lease.array_name().to_string(),
            });
        }
        Ok(())
    }
}

/// An element of a Capture plural.
///
/// `PartialEq` must compare logical content only, never identity or server id. The
/// [`CaptureObject`] side covers updating a single confirmed element in place.
pub trait CaptureElement: CaptureObject + Clone + PartialEq + Send + Sync {
    /// Element content sent when the owning array is replaced. Server ids are left out; Capture
    /// assigns new ones.
    fn to_replace_json(&self) -> Value;

    /// Builds a confirmed element from Capture's JSON.
    ///
    /// # Errors
    /// `CaptureError::InvalidResponse` if `value` does not describe an element.
    fn from_capture_json(
        value: &Value,
        attachment: ElementAttachment,
    ) -> Result<Self, CaptureError>;

    /// Local identity of this instance.
    fn element_id(&self) -> ElementId;
}

/// An array-typed property.
///
/// Arrays are excluded from `needs_update`; they are synced by replacing them whole. The array
/// remembers which element instances Capture last confirmed, in order, so
/// [`needs_replace`](Self::needs_replace) can tell whether that is necessary. Edits to a
/// confirmed element are tracked by the element itself and cleared by updating it.
#[derive(Debug, Clone)]
pub struct CaptureArray<E> {
    elements: Vec<E>,
    confirmed: Vec<ElementId>,
    lease: Option<Arc<ArrayLease>>,
}

impl<E> Default for CaptureArray<E> {
    fn default() -> Self {
        Self {
            elements: Vec::new(),
            confirmed: Vec::new(),
            lease: None,
        }
    }
}

impl<E: CaptureElement> CaptureArray<E> {
    /// An empty, unconfirmed array.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a server-confirmed array, attaching every element to a fresh lease.
    ///
    /// # Errors
    /// `CaptureError::InvalidResponse` if `value` is not an array of valid elements.
    pub fn from_capture_json(
        value: &Value,
        array_name: &'static str,
        array_path: &str,
    ) -> Result<(Vec<E>, Arc<ArrayLease>), CaptureError> {
        let items = value.as_array().ok_or_else(|| CaptureError::InvalidResponse {
            message: format!("'{array_name}' is not an array"),
        })?;

        let lease = ArrayLease::new(array_name);
        let elements = items
            .iter()
            .map(|item| {
                E::from_capture_json(
                    item,
                    ElementAttachment::new(lease.clone(), array_path.to_string()),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok((elements, lease))
    }

    /// Mutable access to the elements, for adding, removing or reordering.
    ///
    /// Structural changes are only pushed by replacing the array.
    pub fn elements_mut(&mut self) -> &mut Vec<E> {
        &mut self.elements
    }

    /// Appends an element.
    pub fn push(&mut self, element: E) {
        self.elements.push(element);
    }

    /// Mutable access to one element, e.g. to edit it and update it on its own.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut E> {
        self.elements.get_mut(index)
    }

    /// Content as sent on replace.
    #[must_use]
    pub fn to_replace_json(&self) -> Value {
        Value::Array(self.elements.iter().map(CaptureElement::to_replace_json).collect())
    }

    /// Whether elements were added, removed, reordered or edited since Capture last confirmed
    /// them.
    ///
    /// An element edit stops counting once that element has been updated on its own.
    #[must_use]
    pub fn needs_replace(&self) -> bool {
        self.elements.len() != self.confirmed.len()
            || self
                .elements
                .iter()
                .zip(&self.confirmed)
                .any(|(element, confirmed)| {
                    element.element_id() != *confirmed || element.needs_update()
                })
    }

    /// Whether the current elements came from Capture.
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.lease.is_some()
    }

    /// Installs a server-confirmed array in place of the current one.
    ///
    /// The previous lease is retired, invalidating every element of the old array including
    /// copies held elsewhere.
    pub fn install(&mut self, elements: Vec<E>, lease: Arc<ArrayLease>) {
        if let Some(old) = self.lease.replace(lease) {
            old.retire();
        }
        self.confirmed = elements.iter().map(CaptureElement::element_id).collect();
        self.elements = elements;
    }
}

impl<E> Deref for CaptureArray<E> {
    type Target = [E];

    fn deref(&self) -> &[E] {
        &self.elements
    }
}

/// Compares current content only.
impl<E: PartialEq> PartialEq for CaptureArray<E> {
    fn eq(&self, other: &Self) -> bool {
        self.elements == other.elements
    }
}

/// Typed handle on one array property of an object `O`.
///
/// Used with [`CaptureClient::replace_array`](crate::client::CaptureClient::replace_array); only
/// array-typed fields have one, so replacing a scalar cannot be expressed.
pub struct ArrayField<O, E> {
    /// Name of the property on Capture, e.g. `managedBy`
    pub name: &'static str,
    /// Reads the property
    pub get: fn(&O) -> &CaptureArray<E>,
    /// Writes the property
    pub get_mut: fn(&mut O) -> &mut CaptureArray<E>,
}

impl<O, E> fmt::Debug for ArrayField<O, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayField").field("name", &self.name).finish()
    }
}
