use super::Lattice;
use std::{
    borrow::Borrow,
    collections::{btree_map, BTreeMap},
};

/// An ordered map whose values are lattices themselves.
///
/// Merging takes the union of both key sets and merges the values of keys present on both
/// sides. Keys are kept sorted so that serialized clocks and log output are stable.
///
/// ```
/// use causal_rpc_api::lattice::{Lattice, MapLattice, MaxLattice};
///
/// let mut clock: MapLattice<&str, MaxLattice<u64>> =
///     [("a", MaxLattice::new(5)), ("b", MaxLattice::new(12))].into_iter().collect();
/// let other: MapLattice<_, _> =
///     [("b", MaxLattice::new(16)), ("a", MaxLattice::new(2)), ("c", MaxLattice::new(1))]
///         .into_iter()
///         .collect();
///
/// assert!(clock.merge(&other));
/// assert_eq!(clock.get("a"), Some(&MaxLattice::new(5)));
/// assert_eq!(clock.get("b"), Some(&MaxLattice::new(16)));
/// assert_eq!(clock.get("c"), Some(&MaxLattice::new(1)));
///
/// // everything in `other` is known now
/// assert!(!clock.merge(&other));
/// ```
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct MapLattice<K, V> {
    #[serde(bound = "
        K: Ord + serde::Serialize + for<'a> serde::Deserialize<'a>,
        V: serde::Serialize + for<'a> serde::Deserialize<'a>,
    ")]
    element: BTreeMap<K, V>,
}

impl<K, V> Lattice for MapLattice<K, V>
where
    K: Ord + Clone,
    V: Lattice + Clone,
{
    type Element = BTreeMap<K, V>;

    fn reveal(&self) -> &BTreeMap<K, V> {
        &self.element
    }

    fn merge_element(&mut self, elements: &BTreeMap<K, V>) -> bool {
        let mut grew = false;
        for (key, value) in elements {
            // `|` instead of `||`, every entry has to be merged
            grew |= self.merge_entry(key.clone(), value);
        }
        grew
    }
}

impl<K: Ord, V> MapLattice<K, V> {
    /// Merges `value` into the entry for `key`. A missing entry is created as a copy of
    /// `value` and counts as growth.
    pub fn merge_entry(&mut self, key: K, value: &V) -> bool
    where
        V: Lattice + Clone,
    {
        match self.element.entry(key) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(value.clone());
                true
            }
            btree_map::Entry::Occupied(mut entry) => entry.get_mut().merge(value),
        }
    }

    /// Returns the value stored for the given key, if any.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.element.get(key)
    }

    /// Returns the entry for `key`, starting it at the bottom element `V::default()` if it
    /// is missing.
    pub fn entry_or_bottom(&mut self, key: K) -> &mut V
    where
        V: Default,
    {
        self.element.entry(key).or_default()
    }

    /// Iterates over the keys in ascending order.
    pub fn keys(&self) -> btree_map::Keys<'_, K, V> {
        self.element.keys()
    }

    /// Returns the number of keys in the map.
    pub fn len(&self) -> usize {
        self.element.len()
    }

    /// Returns `true` if the map contains no keys.
    pub fn is_empty(&self) -> bool {
        self.element.is_empty()
    }
}

impl<K, V> Default for MapLattice<K, V> {
    fn default() -> Self {
        Self {
            element: Default::default(),
        }
    }
}

impl<K: Ord, V> FromIterator<(K, V)> for MapLattice<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            element: iter.into_iter().collect(),
        }
    }
}
