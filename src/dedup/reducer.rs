//! Property reducers for merging duplicate elements.
//!
//! A reducer folds the property map of each incoming duplicate into an
//! accumulator. The first occurrence is folded into `base()`.

use serde::{Deserialize, Serialize};

use crate::model::{PropertyMap, Value, merge_properties};

/// `(new, acc) → acc'` fold over property maps.
pub trait Reducer {
    /// Identity accumulator the first occurrence is reduced into.
    fn base(&self) -> PropertyMap {
        PropertyMap::new()
    }

    fn reduce(&self, new: PropertyMap, acc: PropertyMap) -> PropertyMap;
}

/// Numeric properties add up; everything else is last-write-wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumReducer;

impl Reducer for SumReducer {
    fn reduce(&self, new: PropertyMap, mut acc: PropertyMap) -> PropertyMap {
        for (key, value) in new {
            let summed = acc.get(&key).and_then(|old| old.checked_add(&value));
            acc.insert(key, summed.unwrap_or(value));
        }
        acc
    }
}

/// Counts occurrences into one property; other properties merge
/// last-write-wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountReducer {
    pub property: String,
}

impl CountReducer {
    pub fn new(property: impl Into<String>) -> Self {
        Self { property: property.into() }
    }
}

impl Reducer for CountReducer {
    fn reduce(&self, mut new: PropertyMap, mut acc: PropertyMap) -> PropertyMap {
        let count = acc.get(&self.property).and_then(Value::as_int).unwrap_or(0);
        new.remove(&self.property);
        merge_properties(&mut acc, new);
        acc.insert(self.property.clone(), Value::Int(count + 1));
        acc
    }
}

/// Reducer from closures.
pub struct FnReducer<B, R> {
    base: B,
    reduce: R,
}

impl<B, R> FnReducer<B, R>
where
    B: Fn() -> PropertyMap,
    R: Fn(PropertyMap, PropertyMap) -> PropertyMap,
{
    pub fn new(base: B, reduce: R) -> Self {
        Self { base, reduce }
    }
}

impl<B, R> Reducer for FnReducer<B, R>
where
    B: Fn() -> PropertyMap,
    R: Fn(PropertyMap, PropertyMap) -> PropertyMap,
{
    fn base(&self) -> PropertyMap {
        (self.base)()
    }

    fn reduce(&self, new: PropertyMap, acc: PropertyMap) -> PropertyMap {
        (self.reduce)(new, acc)
    }
}

/// Reducers selectable from configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ReducerKind {
    /// No reducer: plain last-write-wins merge.
    #[default]
    Overwrite,
    Sum,
    Count { property: String },
}

impl ReducerKind {
    /// The reducer to hand to the deduplicator, if any.
    pub fn build(&self) -> Option<Box<dyn Reducer>> {
        match self {
            ReducerKind::Overwrite => None,
            ReducerKind::Sum => Some(Box::new(SumReducer)),
            ReducerKind::Count { property } => Some(Box::new(CountReducer::new(property.clone()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::props;

    #[test]
    fn test_sum_reducer() {
        let acc = SumReducer.reduce(props([("w", 2)]), SumReducer.base());
        let acc = SumReducer.reduce(props([("w", Value::Float(0.5)), ("tag", Value::from("x"))]), acc);
        assert_eq!(acc.get("w"), Some(&Value::Float(2.5)));
        assert_eq!(acc.get("tag"), Some(&Value::from("x")));
    }

    #[test]
    fn test_count_reducer() {
        let r = CountReducer::new("n");
        let acc = r.reduce(props([("a", 1)]), r.base());
        let acc = r.reduce(props([("a", 2)]), acc);
        let acc = r.reduce(PropertyMap::new(), acc);
        assert_eq!(acc.get("n"), Some(&Value::Int(3)));
        assert_eq!(acc.get("a"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_fn_reducer_base_used() {
        let r = FnReducer::new(
            || props([("seen", true)]),
            |new, mut acc| { merge_properties(&mut acc, new); acc },
        );
        let acc = r.reduce(props([("x", 1)]), r.base());
        assert_eq!(acc.get("seen"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_reducer_kind_from_toml() {
        #[derive(Deserialize)]
        struct Wrap { r: ReducerKind }
        let w: Wrap = toml::from_str("r = { kind = \"count\", property = \"hits\" }").unwrap();
        assert_eq!(w.r, ReducerKind::Count { property: "hits".into() });
        assert!(ReducerKind::Overwrite.build().is_none());
    }
}
