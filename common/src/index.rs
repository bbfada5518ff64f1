//! Variant index
//!
//! Inverted index from variant string to the entities that produced it.
//! Built once from a borrowed collection and never mutated afterwards, so
//! lookups are side-effect free and any number of readers can share it.

use std::collections::HashMap;

/// Variant → insertion-ordered entity bucket
#[derive(Debug)]
pub struct VariantIndex<'a, T> {
    /// Variant → position in `buckets`
    slots: HashMap<String, usize>,
    /// Buckets in first-insertion order of their variant
    buckets: Vec<(String, Vec<&'a T>)>,
}

impl<'a, T> VariantIndex<'a, T> {
    /// Builds the index
    ///
    /// # Arguments
    /// * `entities` - collection to index, visited in slice order
    /// * `variant_fn` - variant extraction for one entity
    pub fn build<F, I>(entities: &'a [T], variant_fn: F) -> Self
    where
        F: Fn(&T) -> I,
        I: IntoIterator<Item = String>,
    {
        let mut index = Self {
            slots: HashMap::new(),
            buckets: Vec::new(),
        };

        for entity in entities {
            for variant in variant_fn(entity) {
                if variant.is_empty() {
                    continue;
                }
                index.insert(variant, entity);
            }
        }

        index
    }

    fn insert(&mut self, variant: String, entity: &'a T) {
        match self.slots.get(&variant) {
            Some(&slot) => {
                let bucket = &mut self.buckets[slot].1;
                // same entity yielding the same variant twice
                if bucket.last().is_some_and(|last| std::ptr::eq(*last, entity)) {
                    return;
                }
                bucket.push(entity);
            }
            None => {
                self.slots.insert(variant.clone(), self.buckets.len());
                self.buckets.push((variant, vec![entity]));
            }
        }
    }

    /// Bucket for `variant`, empty when unknown
    pub fn lookup(&self, variant: &str) -> &[&'a T] {
        self.slots
            .get(variant)
            .map(|&slot| self.buckets[slot].1.as_slice())
            .unwrap_or(&[])
    }

    /// First entity of the bucket (tie-break: first inserted wins)
    pub fn first(&self, variant: &str) -> Option<&'a T> {
        self.lookup(variant).first().copied()
    }

    pub fn contains(&self, variant: &str) -> bool {
        self.slots.contains_key(variant)
    }

    /// Number of distinct variants
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets in first-insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[&'a T])> + '_ {
        self.buckets
            .iter()
            .map(|(variant, bucket)| (variant.as_str(), bucket.as_slice()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Item {
        id: &'static str,
        codes: Vec<&'static str>,
    }

    fn item(id: &'static str, codes: &[&'static str]) -> Item {
        Item {
            id,
            codes: codes.to_vec(),
        }
    }

    fn codes(item: &Item) -> Vec<String> {
        item.codes.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_lookup_keeps_insertion_order() {
        let items = vec![item("a", &["2676", "X"]), item("b", &["2676"]), item("c", &["Y"])];
        let index = VariantIndex::build(&items, codes);

        let ids: Vec<&str> = index.lookup("2676").iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(index.first("2676").map(|i| i.id), Some("a"));
        assert_eq!(index.len(), 3);
    }

    #[test]
    fn test_lookup_unknown_is_empty() {
        let items = vec![item("a", &["1"])];
        let index = VariantIndex::build(&items, codes);
        assert!(index.lookup("missing").is_empty());
        assert!(index.first("missing").is_none());
        assert!(!index.contains("missing"));
    }

    #[test]
    fn test_empty_variants_skipped() {
        let items = vec![item("a", &["", "1"])];
        let index = VariantIndex::build(&items, codes);
        assert!(!index.contains(""));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_duplicate_variant_same_entity_once() {
        let items = vec![item("a", &["1", "1"])];
        let index = VariantIndex::build(&items, codes);
        assert_eq!(index.lookup("1").len(), 1);
    }

    #[test]
    fn test_iter_in_first_insertion_order() {
        let items = vec![item("a", &["z", "m"]), item("b", &["a", "z"])];
        let index = VariantIndex::build(&items, codes);
        let keys: Vec<&str> = index.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["z", "m", "a"]);
    }

    #[test]
    fn test_build_is_deterministic() {
        let items = vec![item("a", &["1", "2"]), item("b", &["2", "3"]), item("c", &["1"])];
        let first = VariantIndex::build(&items, codes);
        let second = VariantIndex::build(&items, codes);

        let dump = |index: &VariantIndex<Item>| -> Vec<(String, Vec<&'static str>)> {
            index
                .iter()
                .map(|(k, bucket)| (k.to_string(), bucket.iter().map(|i| i.id).collect()))
                .collect()
        };
        assert_eq!(dump(&first), dump(&second));
    }

    #[test]
    fn test_empty_collection() {
        let items: Vec<Item> = Vec::new();
        let index = VariantIndex::build(&items, codes);
        assert!(index.is_empty());
    }
}
