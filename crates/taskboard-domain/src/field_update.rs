use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A three-state update for a nullable field in a patch.
///
/// - `NoChange`: the field is omitted from the patch
/// - `Set(value)`: the field is set to `value`
/// - `Clear`: the field is sent as `null`
///
/// # Example
///
/// ```
/// use taskboard_domain::FieldUpdate;
///
/// assert_eq!(FieldUpdate::from(Some(5)), FieldUpdate::Set(5));
/// assert_eq!(FieldUpdate::<i64>::from(None), FieldUpdate::Clear);
/// assert!(!FieldUpdate::<i64>::default().is_change());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FieldUpdate<T> {
    #[default]
    NoChange,
    Set(T),
    Clear,
}

impl<T> FieldUpdate<T> {
    pub fn is_change(&self) -> bool {
        !matches!(self, FieldUpdate::NoChange)
    }

    pub fn is_no_change(&self) -> bool {
        !self.is_change()
    }
}

impl<T> From<Option<T>> for FieldUpdate<T> {
    fn from(opt: Option<T>) -> Self {
        match opt {
            Some(value) => FieldUpdate::Set(value),
            None => FieldUpdate::Clear,
        }
    }
}

/// Serialize as the bare value or `null`. Pair with
/// `skip_serializing_if = "FieldUpdate::is_no_change"` so that `NoChange`
/// leaves the key out entirely.
impl<T: Serialize> Serialize for FieldUpdate<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            FieldUpdate::Set(value) => serializer.serialize_some(value),
            FieldUpdate::Clear | FieldUpdate::NoChange => serializer.serialize_none(),
        }
    }
}

/// A present key deserializes to `Set` or `Clear`; use `#[serde(default)]`
/// so a missing key becomes `NoChange`.
impl<'de, T: Deserialize<'de>> Deserialize<'de> for FieldUpdate<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(FieldUpdate::from)
    }
}
