//! PropertyMap: the key-value store on vertices and edges.

use std::collections::BTreeMap;
use super::Value;

/// A map of property names to values.
///
/// Ordered so serialized records are byte-stable between runs.
pub type PropertyMap = BTreeMap<String, Value>;

/// Merge `new` into `acc`, last write wins per key.
///
/// Merging the same input twice leaves `acc` unchanged the second time.
pub fn merge_properties(acc: &mut PropertyMap, new: PropertyMap) {
    for (key, value) in new {
        acc.insert(key, value);
    }
}

/// Build a PropertyMap from (key, value) pairs.
pub fn props<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> PropertyMap
where
    K: Into<String>,
    V: Into<Value>,
{
    pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect()
}
