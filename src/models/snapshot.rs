//! Parsed pollen readings

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Reading for a single pollen type (tree, grass, weed, ...)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
pub struct PollenTypeReading {
    pub value: Option<f64>,
    pub category: Option<String>,
}

/// One fetched-and-parsed pollen reading for a single location.
///
/// A snapshot is never mutated after the fetcher builds it. The coordinator
/// replaces it wholesale on each successful refresh.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct PollenSnapshot {
    /// Overall pollen index
    pub index: Option<i64>,
    /// Overall pollen category (e.g. "High")
    pub category: Option<String>,
    /// Readings keyed by pollen type name. A missing key means "not reported", not zero.
    pub types: BTreeMap<String, PollenTypeReading>,
    /// When the snapshot was produced
    pub fetched_at: DateTime<Utc>,
}

impl PollenSnapshot {
    /// Snapshot with every field empty
    #[must_use]
    pub fn empty() -> Self {
        Self {
            index: None,
            category: None,
            types: BTreeMap::new(),
            fetched_at: Utc::now(),
        }
    }

    #[must_use]
    pub fn has_type(&self, pollen_type: &str) -> bool {
        self.types.contains_key(pollen_type)
    }

    #[must_use]
    pub fn type_reading(&self, pollen_type: &str) -> Option<&PollenTypeReading> {
        self.types.get(pollen_type)
    }

    /// Field-wise equality ignoring the fetch timestamp
    #[must_use]
    pub fn same_readings(&self, other: &Self) -> bool {
        self.index == other.index && self.category == other.category && self.types == other.types
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_snapshot() {
        let snapshot = PollenSnapshot::empty();
        assert!(snapshot.index.is_none());
        assert!(snapshot.category.is_none());
        assert!(snapshot.types.is_empty());
        assert!(!snapshot.has_type("tree"));
    }

    #[test]
    fn test_same_readings_ignores_timestamp() {
        let mut first = PollenSnapshot::empty();
        first.index = Some(2);
        let mut second = first.clone();
        second.fetched_at = first.fetched_at + chrono::Duration::hours(1);
        assert!(first.same_readings(&second));
        assert_ne!(first, second);
    }
}
