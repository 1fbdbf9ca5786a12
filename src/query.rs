// Copyright 2024 Saptak Santra
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Bitmask query predicates and the memoized match cache.
//!
//! A query is a pair of masks: an archetype matches when its mask is a
//! superset of `required` and disjoint from `excluded`. Results are memoized
//! per predicate; archetypes are never destroyed, so cached index lists only
//! ever grow.

use ahash::AHashMap;

/// True when an archetype mask satisfies the predicate.
#[inline]
pub fn mask_matches(mask: u64, required: u64, excluded: u64) -> bool {
    (mask & required) == required && (mask & excluded) == 0
}

/// Memoized archetype index lists, keyed by the full `(required, excluded)`
/// predicate.
///
/// The single invalidation path is [`on_archetype_created`]: every cached
/// entry whose predicate the new mask satisfies gets the index appended.
/// There is no eviction.
///
/// [`on_archetype_created`]: QueryCache::on_archetype_created
pub(crate) struct QueryCache {
    entries: AHashMap<(u64, u64), Vec<usize>>,
}

impl QueryCache {
    pub fn new() -> Self {
        Self {
            // Most simulations run well under a hundred distinct predicates.
            entries: AHashMap::with_capacity(32),
        }
    }

    pub fn get(&self, required: u64, excluded: u64) -> Option<&Vec<usize>> {
        self.entries.get(&(required, excluded))
    }

    pub fn insert(&mut self, required: u64, excluded: u64, matches: Vec<usize>) {
        self.entries.insert((required, excluded), matches);
    }

    /// Append a newly created archetype to every satisfied entry.
    pub fn on_archetype_created(&mut self, index: usize, mask: u64) {
        for (&(required, excluded), matches) in self.entries.iter_mut() {
            if mask_matches(mask, required, excluded) {
                matches.push(index);
            }
        }
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predicate_semantics() {
        // Superset of required.
        assert!(mask_matches(0b111, 0b101, 0));
        assert!(!mask_matches(0b110, 0b101, 0));
        // Disjoint from excluded.
        assert!(mask_matches(0b011, 0b001, 0b100));
        assert!(!mask_matches(0b101, 0b001, 0b100));
        // Empty predicate matches everything.
        assert!(mask_matches(0b1010, 0, 0));
    }

    #[test]
    fn creation_appends_only_to_satisfied_entries() {
        let mut cache = QueryCache::new();
        cache.insert(0b01, 0, vec![0]);
        cache.insert(0b01, 0b10, vec![0]);

        // New archetype {0b11} satisfies the first predicate but trips the
        // exclusion of the second.
        cache.on_archetype_created(1, 0b11);
        assert_eq!(cache.get(0b01, 0), Some(&vec![0, 1]));
        assert_eq!(cache.get(0b01, 0b10), Some(&vec![0]));
        assert_eq!(cache.len(), 2);
    }
}
