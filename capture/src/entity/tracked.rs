use serde_json::Value;

/// A scalar property together with the value Capture last confirmed.
///
/// The field is dirty while `current != baseline`. Setting a field back to its confirmed value
/// makes it clean again.
#[derive(Debug, Clone, Default)]
pub struct Tracked<T> {
    current: T,
    baseline: T,
}

impl<T> Tracked<T>
where
    T: Clone + PartialEq + Into<Value>,
{
    /// A clean field holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            baseline: value.clone(),
            current: value,
        }
    }

    /// The local value.
    pub const fn get(&self) -> &T {
        &self.current
    }

    /// The value Capture last confirmed.
    pub const fn baseline(&self) -> &T {
        &self.baseline
    }

    /// Changes the local value.
    pub fn set(&mut self, value: T) {
        self.current = value;
    }

    /// Whether the local value differs from the confirmed one.
    pub fn is_dirty(&self) -> bool {
        self.current != self.baseline
    }

    /// Records the local value as confirmed.
    pub fn mark_synced(&mut self) {
        self.baseline.clone_from(&self.current);
    }

    /// JSON form of the local value.
    pub fn to_json(&self) -> Value {
        self.current.clone().into()
    }
}

/// Compares local values only.
impl<T: PartialEq> PartialEq for Tracked<T> {
    fn eq(&self, other: &Self) -> bool {
        self.current == other.current
    }
}

impl<T: Eq> Eq for Tracked<T> {}
