use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{TypeError, TypeResult};

/// A set that always holds at least one element.
///
/// The store rejects empty sets outright, so the typed-set wire variants
/// carry this type instead of a bare `BTreeSet`. "Empty" has to be expressed
/// by leaving the attribute out.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NonEmptySet<T: Ord>(BTreeSet<T>);

#[allow(clippy::len_without_is_empty)]
impl<T: Ord> NonEmptySet<T> {
    /// Wrap `set`, failing if it is empty.
    pub fn new(set: BTreeSet<T>) -> TypeResult<Self> {
        if set.is_empty() {
            Err(TypeError::EmptySet { kind: "typed" })
        } else {
            Ok(Self(set))
        }
    }

    /// Collect `items` into a set, failing if there are none.
    pub fn try_from_iter<I: IntoIterator<Item = T>>(items: I) -> TypeResult<Self> {
        Self::new(items.into_iter().collect())
    }

    pub fn single(item: T) -> Self {
        Self(BTreeSet::from([item]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, item: &T) -> bool {
        self.0.contains(item)
    }

    pub fn iter(&self) -> std::collections::btree_set::Iter<'_, T> {
        self.0.iter()
    }

    pub fn as_set(&self) -> &BTreeSet<T> {
        &self.0
    }

    pub fn into_inner(self) -> BTreeSet<T> {
        self.0
    }

    /// Union with another set.
    pub fn union(mut self, other: Self) -> Self {
        self.0.extend(other.0);
        self
    }

    /// Remove every element of `other`. Returns `None` when nothing is left.
    pub fn difference(mut self, other: &Self) -> Option<Self> {
        self.0.retain(|item| !other.0.contains(item));
        Self::new(self.0).ok()
    }
}

impl<'a, T: Ord> IntoIterator for &'a NonEmptySet<T> {
    type Item = &'a T;
    type IntoIter = std::collections::btree_set::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Ord + Serialize> Serialize for NonEmptySet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de, T: Ord + Deserialize<'de>> Deserialize<'de> for NonEmptySet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let set = BTreeSet::<T>::deserialize(deserializer)?;
        Self::new(set).map_err(serde::de::Error::custom)
    }
}
