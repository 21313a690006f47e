use serde::{Deserialize, Deserializer};

/// A field of a partial update to a nullable column.
///
/// Fields declared as `#[serde(default)] Patch<T>` distinguish an absent key (`Unset`,
/// the column is left alone) from an explicit `null` (`Null`, the column is cleared)
/// and a value (`Value`, the column is overwritten).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Unset,
    Null,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_unset(&self) -> bool {
        matches!(self, Patch::Unset)
    }

    /// The value the column holds after applying this patch to `current`.
    pub fn apply(&self, current: Option<T>) -> Option<T>
    where
        T: Clone,
    {
        match self {
            Patch::Unset => current,
            Patch::Null => None,
            Patch::Value(value) => Some(value.clone()),
        }
    }

    /// `None` when unset, otherwise the new column value.
    pub fn as_change(&self) -> Option<Option<&T>> {
        match self {
            Patch::Unset => None,
            Patch::Null => Some(None),
            Patch::Value(value) => Some(Some(value)),
        }
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Null,
        })
    }
}
