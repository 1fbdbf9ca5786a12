//! Tag sideband: boolean entity membership outside the archetype system.
//!
//! Adding or removing a tag never moves a row, so tags are the right tool
//! for churny markers that would otherwise thrash the archetype graph. Tag
//! predicates stay out of the query cache entirely.

use rustc_hash::FxHashMap;

use crate::entity::Entity;
use crate::error::{EcsError, Result};

/// Maximum number of registered tags.
pub const MAX_TAGS: usize = 64;

const NO_ENTITIES: &[Entity] = &[];

#[derive(Default)]
struct TagStore {
    entries: Vec<Entity>,
}

/// Dense per-tag entity sets, registered by name.
///
/// Tags live outside the world; despawning an entity does not touch its
/// tags. Call [`clear_entity`](Tags::clear_entity) when freeing a handle.
#[derive(Default)]
pub struct Tags {
    stores: Vec<TagStore>,
    names: FxHashMap<String, usize>,
}

impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag under `name` and return its id.
    ///
    /// Names are not deduplicated; registering the same name twice claims
    /// two slots and `id_of` resolves to the newest.
    pub fn register(&mut self, name: &str) -> Result<usize> {
        if self.stores.len() >= MAX_TAGS {
            return Err(EcsError::TagLimitReached);
        }
        let id = self.stores.len();
        self.stores.push(TagStore::default());
        self.names.insert(name.to_owned(), id);
        Ok(id)
    }

    /// Look a tag id up by registration name.
    pub fn id_of(&self, name: &str) -> Option<usize> {
        self.names.get(name).copied()
    }

    /// Tag an entity. Idempotent by slot id: re-tagging refreshes the stored
    /// generation instead of duplicating the entry.
    pub fn add(&mut self, tag: usize, entity: Entity) {
        let Some(store) = self.stores.get_mut(tag) else {
            return;
        };
        for entry in &mut store.entries {
            if entry.id == entity.id {
                *entry = entity;
                return;
            }
        }
        store.entries.push(entity);
    }

    /// Untag an entity (swap-remove, order not preserved).
    pub fn remove(&mut self, tag: usize, entity: Entity) {
        let Some(store) = self.stores.get_mut(tag) else {
            return;
        };
        if let Some(position) = store.entries.iter().position(|entry| entry.id == entity.id) {
            store.entries.swap_remove(position);
        }
    }

    /// Whether the exact handle (id and generation) carries the tag.
    pub fn has(&self, tag: usize, entity: Entity) -> bool {
        self.stores
            .get(tag)
            .is_some_and(|store| store.entries.contains(&entity))
    }

    /// Every entity carrying the tag. Out-of-range ids yield an empty slice.
    pub fn query(&self, tag: usize) -> &[Entity] {
        self.stores
            .get(tag)
            .map_or(NO_ENTITIES, |store| &store.entries)
    }

    /// Number of entities carrying the tag.
    pub fn count(&self, tag: usize) -> usize {
        self.stores.get(tag).map_or(0, |store| store.entries.len())
    }

    /// Strip the entity from every tag store. Intended for despawn cleanup.
    pub fn clear_entity(&mut self, entity: Entity) {
        for tag in 0..self.stores.len() {
            self.remove(tag, entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entity(id: u32, generation: u32) -> Entity {
        Entity { id, generation }
    }

    #[test]
    fn add_is_idempotent_by_id() {
        let mut tags = Tags::new();
        let enemy = tags.register("enemy").unwrap();

        tags.add(enemy, entity(4, 0));
        tags.add(enemy, entity(4, 0));
        assert_eq!(tags.count(enemy), 1);

        // Re-tagging a recycled slot refreshes the generation.
        tags.add(enemy, entity(4, 1));
        assert_eq!(tags.count(enemy), 1);
        assert!(tags.has(enemy, entity(4, 1)));
        assert!(!tags.has(enemy, entity(4, 0)));
    }

    #[test]
    fn remove_and_query() {
        let mut tags = Tags::new();
        let selected = tags.register("selected").unwrap();
        tags.add(selected, entity(0, 0));
        tags.add(selected, entity(1, 0));
        tags.add(selected, entity(2, 0));

        tags.remove(selected, entity(1, 0));
        assert_eq!(tags.count(selected), 2);
        assert!(!tags.has(selected, entity(1, 0)));
        assert_eq!(tags.query(selected).len(), 2);
    }

    #[test]
    fn out_of_range_ids_are_inert() {
        let mut tags = Tags::new();
        tags.add(12, entity(0, 0));
        tags.remove(12, entity(0, 0));
        assert!(!tags.has(12, entity(0, 0)));
        assert!(tags.query(12).is_empty());
        assert_eq!(tags.count(12), 0);
    }

    #[test]
    fn clear_entity_sweeps_all_stores() {
        let mut tags = Tags::new();
        let a = tags.register("a").unwrap();
        let b = tags.register("b").unwrap();
        tags.add(a, entity(7, 0));
        tags.add(b, entity(7, 0));
        tags.add(b, entity(8, 0));

        tags.clear_entity(entity(7, 0));
        assert_eq!(tags.count(a), 0);
        assert_eq!(tags.count(b), 1);
    }

    #[test]
    fn registration_caps_and_resolves_names() {
        let mut tags = Tags::new();
        for i in 0..MAX_TAGS {
            tags.register(&format!("tag{i}")).unwrap();
        }
        assert_eq!(tags.register("overflow"), Err(EcsError::TagLimitReached));
        assert_eq!(tags.id_of("tag3"), Some(3));
        assert_eq!(tags.id_of("missing"), None);
    }
}
