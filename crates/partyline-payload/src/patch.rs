//! Tri-state field values that remember whether a key was present.

use serde::{Deserialize, Deserializer};

/// A field of a partial update.
///
/// Deserializes from a JSON value: `null` becomes [`Patch::Null`], anything
/// else [`Patch::Present`]. A missing key never reaches the deserializer,
/// so the containing struct must carry `#[serde(default)]` to get
/// [`Patch::Absent`].
///
/// ```
/// use partyline_payload::Patch;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// #[serde(default)]
/// struct Update {
///     hp: Patch<i64>,
/// }
///
/// impl Default for Update {
///     fn default() -> Self {
///         Self { hp: Patch::Absent }
///     }
/// }
///
/// let update: Update = serde_json::from_str("{}").unwrap();
/// assert_eq!(update.hp, Patch::Absent);
/// let update: Update = serde_json::from_str(r#"{"hp":null}"#).unwrap();
/// assert_eq!(update.hp, Patch::Null);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Patch<T> {
    /// The key was missing; keep whatever is stored.
    Absent,
    /// The key was present with `null`; clear the stored value.
    Null,
    /// The key was present with a value; replace the stored value.
    Present(T),
}

impl<T> Default for Patch<T> {
    fn default() -> Self {
        Self::Absent
    }
}

impl<T> Patch<T> {
    /// Returns `true` if the key was missing.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }

    /// Maps a present value, keeping `Absent` and `Null` as they are.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Patch<U> {
        match self {
            Self::Absent => Patch::Absent,
            Self::Null => Patch::Null,
            Self::Present(value) => Patch::Present(f(value)),
        }
    }

    /// Like [`map`](Self::map), but `f` decides the resulting state.
    pub fn and_then<U>(self, f: impl FnOnce(T) -> Patch<U>) -> Patch<U> {
        match self {
            Self::Absent => Patch::Absent,
            Self::Null => Patch::Null,
            Self::Present(value) => f(value),
        }
    }

    /// Writes this patch into `slot`: `Present` replaces, `Null` clears,
    /// `Absent` leaves it untouched.
    pub fn apply_to(self, slot: &mut Option<T>) {
        match self {
            Self::Absent => {}
            Self::Null => *slot = None,
            Self::Present(value) => *slot = Some(value),
        }
    }
}

impl<T> From<Option<T>> for Patch<T> {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Self::Present(value),
            None => Self::Null,
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Option::<T>::deserialize(deserializer).map(Self::from)
    }
}
