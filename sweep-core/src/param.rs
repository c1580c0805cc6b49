//! Resolved parameter sets.

use linked_hash_map::LinkedHashMap;

use crate::Value;

/// Fully resolved mapping of parameter names to values, used for exactly one
/// replication batch.
///
/// Entries keep the order in which they were resolved: default values first,
/// then overrides. This is also the order in which they get applied to the
/// simulation. Once built the set can't be modified.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParameterSet {
    entries: LinkedHashMap<String, Value>,
}

impl ParameterSet {
    /// Merges defaults with overrides.
    ///
    /// Defaults that are not overridden come first, in their original order.
    /// Overrides follow in their own order, including keys that have no
    /// default value.
    pub fn merge(
        defaults: &LinkedHashMap<String, Value>,
        overrides: &LinkedHashMap<String, Value>,
    ) -> Self {
        let mut entries = LinkedHashMap::new();
        for (name, value) in defaults {
            if !overrides.contains_key(name) {
                entries.insert(name.clone(), value.clone());
            }
        }
        for (name, value) in overrides {
            entries.insert(name.clone(), value.clone());
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.entries.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Iterates over entries in application order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &String> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_vec(&self) -> Vec<(String, Value)> {
        self.entries
            .iter()
            .map(|(n, v)| (n.clone(), v.clone()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = (&'a String, &'a Value);
    type IntoIter = linked_hash_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn map(entries: &[(&str, Value)]) -> LinkedHashMap<String, Value> {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn overrides_come_after_defaults() {
        let defaults = map(&[("a", 1.into()), ("b", 2.into()), ("c", 3.into())]);
        let overrides = map(&[("b", 20.into()), ("z", "x".into())]);
        let set = ParameterSet::merge(&defaults, &overrides);
        let names: Vec<&str> = set.names().map(|s| s.as_str()).collect();
        assert_eq!(names, vec!["a", "c", "b", "z"]);
        assert_eq!(set.get("b"), Some(&Value::Int(20)));
        assert_eq!(set.get("z"), Some(&Value::String("x".to_string())));
    }

    proptest! {
        #[test]
        fn merge_keeps_every_key(
            defaults in prop::collection::btree_map("[a-e]", 0i64..100, 0..5),
            overrides in prop::collection::btree_map("[c-h]", 100i64..200, 0..5),
        ) {
            let d: LinkedHashMap<String, Value> =
                defaults.iter().map(|(k, v)| (k.clone(), Value::Int(*v))).collect();
            let o: LinkedHashMap<String, Value> =
                overrides.iter().map(|(k, v)| (k.clone(), Value::Int(*v))).collect();
            let set = ParameterSet::merge(&d, &o);

            for (k, v) in &overrides {
                prop_assert_eq!(set.get(k), Some(&Value::Int(*v)));
            }
            for (k, v) in &defaults {
                if !overrides.contains_key(k) {
                    prop_assert_eq!(set.get(k), Some(&Value::Int(*v)));
                }
            }
            let expected = defaults.keys().chain(overrides.keys())
                .collect::<std::collections::BTreeSet<_>>();
            prop_assert_eq!(set.len(), expected.len());
            for name in set.names() {
                prop_assert!(expected.contains(name));
            }
        }
    }
}
