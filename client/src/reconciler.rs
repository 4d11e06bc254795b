//! Element availability.
//!
//! Splits a raffle's pool into free, sold and reserved elements and answers
//! the membership questions the detail view asks while rendering and
//! handling clicks. The backend owns allocation; this module only trusts and
//! projects what it reports.
//!
//! Every comparison goes through [`normalize_label`], so an element generated
//! as the integer `7` matches the string `"7"` the backend sends back.

use crate::types::{ElementLabel, Raffle};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Canonical string form of a label
///
/// This is the only place labels are coerced for comparison.
#[must_use]
pub fn normalize_label(label: &ElementLabel) -> String {
    match label {
        ElementLabel::Number(n) => n.to_string(),
        ElementLabel::Text(s) => s.trim().to_string(),
    }
}

/// Which elements a view lists
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    /// Whole pool
    #[default]
    All,
    /// Elements still for sale
    Free,
    /// Sold elements
    Sold,
    /// Reserved elements
    Reserved,
}

/// Badge counts
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionCounts {
    /// Pool size
    pub total: usize,
    /// Free elements
    pub free: usize,
    /// Sold elements
    pub sold: usize,
    /// Reserved elements
    pub reserved: usize,
}

/// Three-way split of a raffle pool
///
/// `free = pool − sold − reserved`. Sold and reserved keep the order the
/// backend reported them in; the pool and free lists keep declaration order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    pool: Vec<ElementLabel>,
    free: Vec<ElementLabel>,
    sold: Vec<ElementLabel>,
    reserved: Vec<ElementLabel>,
    free_keys: HashSet<String>,
    sold_keys: HashSet<String>,
    reserved_keys: HashSet<String>,
    numeric: bool,
}

/// Split `pool` into free, sold and reserved
///
/// Never fails. Duplicate labels (after normalization) are kept once.
/// Sold/reserved lists are trusted as reported, including entries outside
/// the pool.
#[must_use]
pub fn partition(
    pool: &[ElementLabel],
    sold: &[ElementLabel],
    reserved: &[ElementLabel],
) -> Partition {
    let (sold, sold_keys) = dedup(sold);
    let (reserved, reserved_keys) = dedup(reserved);
    let (pool, _) = dedup(pool);

    let mut free = Vec::new();
    let mut free_keys = HashSet::new();
    for label in &pool {
        let key = normalize_label(label);
        if !sold_keys.contains(&key) && !reserved_keys.contains(&key) {
            free.push(label.clone());
            free_keys.insert(key);
        }
    }

    let numeric = pool.iter().all(|label| label.as_number().is_some());

    Partition {
        pool,
        free,
        sold,
        reserved,
        free_keys,
        sold_keys,
        reserved_keys,
        numeric,
    }
}

fn dedup(labels: &[ElementLabel]) -> (Vec<ElementLabel>, HashSet<String>) {
    let mut keys = HashSet::with_capacity(labels.len());
    let unique = labels
        .iter()
        .filter(|label| keys.insert(normalize_label(label)))
        .cloned()
        .collect();
    (unique, keys)
}

impl Partition {
    /// Partition a fetched raffle
    #[must_use]
    pub fn from_raffle(raffle: &Raffle) -> Self {
        partition(&raffle.pool, &raffle.sold, &raffle.reserved)
    }

    /// Whether the label is sold
    #[must_use]
    pub fn is_sold(&self, label: &ElementLabel) -> bool {
        self.sold_keys.contains(&normalize_label(label))
    }

    /// Whether the label is reserved
    #[must_use]
    pub fn is_reserved(&self, label: &ElementLabel) -> bool {
        self.reserved_keys.contains(&normalize_label(label))
    }

    /// Whether the label can be selected
    #[must_use]
    pub fn is_free(&self, label: &ElementLabel) -> bool {
        self.free_keys.contains(&normalize_label(label))
    }

    /// Whether every pool label is an integer
    #[must_use]
    pub const fn is_numeric(&self) -> bool {
        self.numeric
    }

    /// Full pool, declaration order
    #[must_use]
    pub fn pool(&self) -> &[ElementLabel] {
        &self.pool
    }

    /// Free elements, declaration order
    #[must_use]
    pub fn free(&self) -> &[ElementLabel] {
        &self.free
    }

    /// Sold elements, server order
    #[must_use]
    pub fn sold(&self) -> &[ElementLabel] {
        &self.sold
    }

    /// Reserved elements, server order
    #[must_use]
    pub fn reserved(&self) -> &[ElementLabel] {
        &self.reserved
    }

    /// Elements to list for `mode`
    ///
    /// Numeric pools are sorted ascending; other pools keep the order of
    /// the underlying list.
    #[must_use]
    pub fn filter_by_mode(&self, mode: FilterMode) -> Vec<ElementLabel> {
        let source = match mode {
            FilterMode::All => &self.pool,
            FilterMode::Free => &self.free,
            FilterMode::Sold => &self.sold,
            FilterMode::Reserved => &self.reserved,
        };
        let mut labels = source.clone();
        if self.numeric {
            sort_numeric(&mut labels);
        }
        labels
    }

    /// Counts for status badges
    #[must_use]
    pub fn counts(&self) -> PartitionCounts {
        PartitionCounts {
            total: self.pool.len(),
            free: self.free.len(),
            sold: self.sold.len(),
            reserved: self.reserved.len(),
        }
    }
}

/// Sort labels by integer value; non-integer labels keep their relative order at the end
pub(crate) fn sort_numeric(labels: &mut [ElementLabel]) {
    labels.sort_by_key(|label| label.as_number().map_or((1, 0), |n| (0, n)));
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;
    use proptest::prelude::*;
    use sorteohub_testing::properties::{numeric_pool_with_disjoint_picks, text_labels};

    fn numbers(range: std::ops::RangeInclusive<i64>) -> Vec<ElementLabel> {
        range.map(ElementLabel::Number).collect()
    }

    fn texts(items: &[&str]) -> Vec<ElementLabel> {
        items.iter().map(|s| ElementLabel::from(*s)).collect()
    }

    #[test]
    fn numbers_and_strings_compare_equal() {
        let p = partition(&numbers(1..=10), &texts(&["3", "7"]), &texts(&["5"]));

        assert!(p.is_sold(&ElementLabel::Number(3)));
        assert!(p.is_sold(&ElementLabel::from("7")));
        assert!(p.is_reserved(&ElementLabel::Number(5)));
        assert!(!p.is_free(&ElementLabel::Number(5)));
        assert!(p.is_free(&ElementLabel::from("1")));
        assert_eq!(p.counts(), PartitionCounts { total: 10, free: 7, sold: 2, reserved: 1 });
    }

    #[test]
    fn hundred_element_scenario() {
        let p = partition(&numbers(1..=100), &texts(&["3", "7"]), &texts(&["50"]));
        let free = p.filter_by_mode(FilterMode::Free);

        assert_eq!(free.len(), 97);
        for excluded in [3, 7, 50] {
            assert!(!free.contains(&ElementLabel::Number(excluded)));
        }
    }

    #[test]
    fn empty_inputs_degrade_to_empty_lists() {
        let p = partition(&[], &[], &[]);
        assert!(p.free().is_empty());
        assert!(p.filter_by_mode(FilterMode::Sold).is_empty());
        assert_eq!(p.counts(), PartitionCounts::default());
    }

    #[test]
    fn numeric_modes_sort_ascending() {
        let pool = texts(&["10", "2", "33", "4"]);
        let sold = texts(&["33", "2"]);
        let p = partition(&pool, &sold, &[]);

        assert!(p.is_numeric());
        assert_eq!(p.filter_by_mode(FilterMode::All), texts(&["2", "4", "10", "33"]));
        assert_eq!(p.filter_by_mode(FilterMode::Sold), texts(&["2", "33"]));
        assert_eq!(p.filter_by_mode(FilterMode::Free), texts(&["4", "10"]));
    }

    #[test]
    fn text_pools_keep_their_order() {
        let pool = texts(&["Rojo", "Azul", "Verde", "Negro"]);
        let sold = texts(&["Negro", "Rojo"]);
        let reserved = texts(&["Verde"]);
        let p = partition(&pool, &sold, &reserved);

        assert!(!p.is_numeric());
        assert_eq!(p.filter_by_mode(FilterMode::All), pool);
        assert_eq!(p.filter_by_mode(FilterMode::Free), texts(&["Azul"]));
        assert_eq!(p.filter_by_mode(FilterMode::Sold), texts(&["Negro", "Rojo"]));
        assert_eq!(p.filter_by_mode(FilterMode::Reserved), texts(&["Verde"]));
    }

    #[test]
    fn duplicate_labels_are_kept_once() {
        let pool = vec![ElementLabel::Number(1), ElementLabel::from("1"), ElementLabel::Number(2)];
        let p = partition(&pool, &[], &[]);
        assert_eq!(p.pool().len(), 2);
        assert_eq!(p.free().len(), 2);
    }

    #[test]
    fn filter_mode_wire_names() {
        let mode: FilterMode = serde_json::from_str("\"reserved\"").unwrap();
        assert_eq!(mode, FilterMode::Reserved);
    }

    proptest! {
        #[test]
        fn partition_covers_pool_without_overlap((size, sold, reserved) in numeric_pool_with_disjoint_picks()) {
            let pool = numbers(1..=size);
            // backend sends sold/reserved as strings
            let sold: Vec<ElementLabel> = sold.iter().map(|n| ElementLabel::Text(n.to_string())).collect();
            let reserved: Vec<ElementLabel> = reserved.iter().map(|n| ElementLabel::Number(*n)).collect();
            let p = partition(&pool, &sold, &reserved);

            prop_assert_eq!(p.free().len() + p.sold().len() + p.reserved().len(), pool.len());
            for label in &pool {
                let memberships = [p.is_free(label), p.is_sold(label), p.is_reserved(label)];
                prop_assert_eq!(memberships.iter().filter(|m| **m).count(), 1);
            }
        }

        #[test]
        fn text_pool_with_nothing_sold_is_all_free(labels in text_labels()) {
            let pool: Vec<ElementLabel> = labels.into_iter().map(ElementLabel::Text).collect();
            let p = partition(&pool, &[], &[]);
            prop_assert_eq!(p.filter_by_mode(FilterMode::Free), p.filter_by_mode(FilterMode::All));
        }
    }
}
