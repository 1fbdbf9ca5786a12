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

//! World: central entity and archetype storage

use std::cell::RefCell;
use std::ptr::NonNull;

use ahash::AHashMap;
use bytemuck::Pod;
use smallvec::SmallVec;

#[cfg(feature = "profiling")]
use tracing::info_span;

use crate::archetype::{Archetype, ColumnSpec};
use crate::component::{bit_index, ComponentData, ComponentRegistry};
use crate::entity::{Entity, EntityLocation, EntitySlots};
use crate::error::Result;
use crate::query::{mask_matches, QueryCache};

/// Central ECS world
///
/// Owns the slot table, every archetype, the archetype index, and the query
/// cache. All operations are synchronous and single-threaded; the world
/// performs no locking.
pub struct World {
    registry: ComponentRegistry,
    slots: EntitySlots,

    /// All archetypes, addressed by stable index; never destroyed.
    archetypes: Vec<Archetype>,

    /// Maps component bitmasks to archetype indices
    archetype_index: AHashMap<u64, usize>,

    /// Memoized query results; interior mutability lets `&self` queries
    /// populate it
    query_cache: RefCell<QueryCache>,

    /// Deferred removal queue for safe entity deletion during iteration
    despawn_queue: Vec<Entity>,
}

impl World {
    /// Create a new, empty world.
    pub fn new() -> Self {
        Self {
            registry: ComponentRegistry::new(),
            slots: EntitySlots::new(),

            // Start with reasonable defaults to avoid resize spikes
            archetypes: Vec::with_capacity(64),
            archetype_index: AHashMap::with_capacity(64),

            query_cache: RefCell::new(QueryCache::new()),
            despawn_queue: Vec::new(),
        }
    }

    // ========== Component registration ==========

    /// Register a component type, claiming the next free bit.
    pub fn register_component<T: Pod>(&mut self) -> Result<u64> {
        self.registry
            .register(std::mem::size_of::<T>(), std::mem::align_of::<T>())
    }

    /// Register a component from a raw layout.
    ///
    /// `size == 0` registers a tag-by-bit: it takes a mask bit but stores no
    /// column bytes. `align` must be a power of two (or zero, normalized to
    /// one).
    pub fn register_component_raw(&mut self, size: usize, align: usize) -> Result<u64> {
        self.registry.register(size, align)
    }

    // ========== Spawning ==========

    /// Spawn an entity whose shape is `mask`, with payloads from `entries`.
    ///
    /// Bits of `mask` not covered by an entry (or covered with `bytes:
    /// None`) are zero-initialized. A zero mask or empty entry list spawns
    /// nothing and returns [`Entity::NIL`].
    pub fn spawn(&mut self, mask: u64, entries: &[ComponentData]) -> Entity {
        if mask == 0 || entries.is_empty() {
            return Entity::NIL;
        }

        #[cfg(feature = "profiling")]
        let span = info_span!(
            "world.spawn",
            mask,
            archetype_count = self.archetypes.len()
        );
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let archetype_index = self.find_or_create_archetype(mask);
        let entity = self.slots.alloc();
        let archetype = &mut self.archetypes[archetype_index];
        let row = archetype.push_row_zeroed(entity);

        for entry in entries {
            if mask & entry.bit == 0 {
                continue;
            }
            let Some(bytes) = entry.bytes else { continue };
            if let Some(column) = archetype.column_mut(entry.bit) {
                debug_assert_eq!(bytes.len(), column.elem_size());
                column.write(row, bytes);
            }
        }

        self.slots.place(entity, archetype_index as u32, row as u32);
        entity
    }

    /// Spawn `count` zero-initialized entities of the same shape.
    ///
    /// Capacity is reserved up front in every column, so the per-entity cost
    /// is amortized O(1).
    pub fn spawn_batch(&mut self, mask: u64, count: usize) -> Vec<Entity> {
        if mask == 0 || count == 0 {
            return Vec::new();
        }

        #[cfg(feature = "profiling")]
        let span = info_span!("world.spawn_batch", mask, count);
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let archetype_index = self.find_or_create_archetype(mask);
        let archetype = &mut self.archetypes[archetype_index];
        archetype.reserve_rows(count);

        let mut entities = Vec::with_capacity(count);
        for _ in 0..count {
            let entity = self.slots.alloc();
            let row = archetype.push_row_zeroed(entity);
            self.slots.place(entity, archetype_index as u32, row as u32);
            entities.push(entity);
        }
        entities
    }

    /// Batch spawn, then run `init` on every fresh row.
    pub fn spawn_with_init<F>(&mut self, mask: u64, count: usize, mut init: F) -> Vec<Entity>
    where
        F: FnMut(&mut Archetype, usize),
    {
        let entities = self.spawn_batch(mask, count);
        if entities.is_empty() {
            return entities;
        }

        let Some(&archetype_index) = self.archetype_index.get(&mask) else {
            return entities;
        };
        let archetype = &mut self.archetypes[archetype_index];
        let start = archetype.len() - entities.len();
        for offset in 0..entities.len() {
            init(archetype, start + offset);
        }
        entities
    }

    // ========== Despawning ==========

    /// Despawn immediately. Returns false for dead or stale handles.
    pub fn despawn(&mut self, entity: Entity) -> bool {
        let Some(location) = self.slots.location(entity) else {
            return false;
        };

        let archetype = &mut self.archetypes[location.archetype_index as usize];
        if let Some(moved) = archetype.swap_remove_row(location.row as usize) {
            self.slots.repair_row(moved.id, location.row);
        }
        self.slots.free(entity.id);
        true
    }

    /// Despawn every handle in the slice; returns how many were live.
    pub fn despawn_batch(&mut self, entities: &[Entity]) -> usize {
        let mut despawned = 0;
        for &entity in entities {
            if self.despawn(entity) {
                despawned += 1;
            }
        }
        despawned
    }

    /// Queue a despawn to be applied later by [`apply_despawns`].
    ///
    /// The handle stays live and usable until the flush, which makes this
    /// safe to call while iterating archetypes.
    ///
    /// [`apply_despawns`]: World::apply_despawns
    pub fn queue_despawn(&mut self, entity: Entity) {
        self.despawn_queue.push(entity);
    }

    /// Flush the deferred despawn queue in FIFO order.
    pub fn apply_despawns(&mut self) {
        #[cfg(feature = "profiling")]
        let span = info_span!("world.apply_despawns", queued = self.despawn_queue.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        let mut queue = std::mem::take(&mut self.despawn_queue);
        for entity in queue.drain(..) {
            self.despawn(entity);
        }
        // Hand the allocation back for the next tick.
        self.despawn_queue = queue;
    }

    // ========== Component access ==========

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots.is_alive(entity)
    }

    /// Number of live entities.
    pub fn entity_count(&self) -> usize {
        self.slots.live_count()
    }

    /// Raw pointer to the entity's component bytes for `bit`.
    ///
    /// `None` for dead handles and absent components. The pointer stays
    /// valid until the next structural mutation.
    pub fn get_ptr(&self, entity: Entity, bit: u64) -> Option<NonNull<u8>> {
        let location = self.slots.location(entity)?;
        let archetype = &self.archetypes[location.archetype_index as usize];
        let column = archetype.column(bit)?;
        Some(column.row_ptr(location.row as usize))
    }

    /// Raw pointer without liveness or presence checks.
    ///
    /// # Safety
    /// `entity` must be live and its archetype must carry a sized column for
    /// `bit`.
    pub unsafe fn get_ptr_unchecked(&self, entity: Entity, bit: u64) -> NonNull<u8> {
        let location = self.slots.location_unchecked(entity.id);
        let archetype = &self.archetypes[location.archetype_index as usize];
        let column = archetype
            .column(bit)
            .unwrap_unchecked();
        column.row_ptr(location.row as usize)
    }

    /// Typed view of one component on one entity.
    pub fn get<T: Pod>(&self, entity: Entity, bit: u64) -> Option<&T> {
        let location = self.slots.location(entity)?;
        let archetype = &self.archetypes[location.archetype_index as usize];
        let column = archetype.column(bit)?;
        debug_assert_eq!(std::mem::size_of::<T>(), column.elem_size());
        let ptr = column.row_ptr(location.row as usize);
        Some(unsafe { &*(ptr.as_ptr() as *const T) })
    }

    /// Mutable typed view of one component on one entity.
    pub fn get_mut<T: Pod>(&mut self, entity: Entity, bit: u64) -> Option<&mut T> {
        let location = self.slots.location(entity)?;
        let archetype = &mut self.archetypes[location.archetype_index as usize];
        let column = archetype.column_mut(bit)?;
        debug_assert_eq!(std::mem::size_of::<T>(), column.elem_size());
        let ptr = column.row_ptr(location.row as usize);
        Some(unsafe { &mut *(ptr.as_ptr() as *mut T) })
    }

    /// Overwrite a present component with raw bytes.
    pub fn set_bytes(&mut self, entity: Entity, bit: u64, bytes: &[u8]) -> bool {
        let Some(location) = self.slots.location(entity) else {
            return false;
        };
        let archetype = &mut self.archetypes[location.archetype_index as usize];
        let Some(column) = archetype.column_mut(bit) else {
            return false;
        };
        debug_assert_eq!(bytes.len(), column.elem_size());
        column.write(location.row as usize, bytes);
        true
    }

    /// Overwrite a present component with a typed value.
    pub fn set<T: Pod>(&mut self, entity: Entity, bit: u64, value: T) -> bool {
        self.set_bytes(entity, bit, bytemuck::bytes_of(&value))
    }

    /// Whether a live entity carries the component bit.
    pub fn has(&self, entity: Entity, bit: u64) -> bool {
        self.slots
            .location(entity)
            .is_some_and(|location| self.archetypes[location.archetype_index as usize].has(bit))
    }

    /// Whether a live entity carries every bit of `mask`.
    pub fn has_components(&self, entity: Entity, mask: u64) -> bool {
        self.slots.location(entity).is_some_and(|location| {
            self.archetypes[location.archetype_index as usize].mask() & mask == mask
        })
    }

    /// The entity's full component mask, or `None` if dead.
    pub fn component_mask(&self, entity: Entity) -> Option<u64> {
        let location = self.slots.location(entity)?;
        Some(self.archetypes[location.archetype_index as usize].mask())
    }

    // ========== Structural mutation ==========

    /// Add a component from raw bytes, moving the entity to the neighboring
    /// archetype.
    ///
    /// If the bit is already present this overwrites in place. `bytes: None`
    /// leaves the new column zeroed. Returns false for dead handles.
    pub fn add_component_bytes(&mut self, entity: Entity, bit: u64, bytes: Option<&[u8]>) -> bool {
        let Some(location) = self.slots.location(entity) else {
            return false;
        };
        let source_index = location.archetype_index as usize;
        let b = bit_index(bit);

        if self.archetypes[source_index].has(bit) {
            if let Some(bytes) = bytes {
                if let Some(column) = self.archetypes[source_index].column_mut(bit) {
                    debug_assert_eq!(bytes.len(), column.elem_size());
                    column.write(location.row as usize, bytes);
                }
            }
            return true;
        }

        let target_index = match self.archetypes[source_index].edges.add[b] {
            Some(target) => target as usize,
            None => {
                let new_mask = self.archetypes[source_index].mask() | bit;
                let target = self.find_or_create_archetype(new_mask);
                self.archetypes[source_index].edges.add[b] = Some(target as u32);
                target
            }
        };

        let new_row = self.move_entity(entity, location, target_index);

        if let Some(bytes) = bytes {
            if let Some(column) = self.archetypes[target_index].column_mut(bit) {
                debug_assert_eq!(bytes.len(), column.elem_size());
                column.write(new_row, bytes);
            }
        }
        true
    }

    /// Add a typed component value.
    pub fn add_component<T: Pod>(&mut self, entity: Entity, bit: u64, value: T) -> bool {
        self.add_component_bytes(entity, bit, Some(bytemuck::bytes_of(&value)))
    }

    /// Remove a component, moving the entity to the neighboring archetype.
    ///
    /// Removing the last remaining component despawns the entity. Returns
    /// false for dead handles and absent bits.
    pub fn remove_component(&mut self, entity: Entity, bit: u64) -> bool {
        let Some(location) = self.slots.location(entity) else {
            return false;
        };
        let source_index = location.archetype_index as usize;
        let source_mask = self.archetypes[source_index].mask();
        if source_mask & bit == 0 {
            return false;
        }

        let new_mask = source_mask & !bit;
        if new_mask == 0 {
            return self.despawn(entity);
        }

        let b = bit_index(bit);
        let target_index = match self.archetypes[source_index].edges.remove[b] {
            Some(target) => target as usize,
            None => {
                let target = self.find_or_create_archetype(new_mask);
                self.archetypes[source_index].edges.remove[b] = Some(target as u32);
                target
            }
        };

        self.move_entity(entity, location, target_index);
        true
    }

    /// Relocate one row to another archetype, copying shared columns and
    /// zeroing the rest. Returns the destination row.
    fn move_entity(&mut self, entity: Entity, from: EntityLocation, target_index: usize) -> usize {
        let source_index = from.archetype_index as usize;
        debug_assert_ne!(source_index, target_index);

        // Disjoint mutable access to source and target archetypes.
        let (source, target) = if source_index < target_index {
            let (left, right) = self.archetypes.split_at_mut(target_index);
            (&mut left[source_index], &mut right[0])
        } else {
            let (left, right) = self.archetypes.split_at_mut(source_index);
            (&mut right[0], &mut left[target_index])
        };

        let from_row = from.row as usize;
        let new_row = target.len();
        target.push_entity(entity);
        for column in target.columns_mut() {
            match source.column(column.bit()) {
                Some(src) => column.push_copy_from(src, from_row),
                None => column.push_zeroed(),
            }
        }

        if let Some(moved) = source.swap_remove_row(from_row) {
            self.slots.repair_row(moved.id, from_row as u32);
        }

        self.slots.place(entity, target_index as u32, new_row as u32);
        new_row
    }

    /// Find the archetype for `mask`, creating and cross-wiring it on miss.
    fn find_or_create_archetype(&mut self, mask: u64) -> usize {
        if let Some(&index) = self.archetype_index.get(&mask) {
            return index;
        }

        let mut specs: SmallVec<[ColumnSpec; 8]> = SmallVec::new();
        let mut bits = mask;
        while bits != 0 {
            let idx = bits.trailing_zeros() as usize;
            let info = self.registry.info(idx);
            if info.size > 0 {
                specs.push(ColumnSpec {
                    bit: 1u64 << idx,
                    size: info.size,
                    align: info.align,
                });
            }
            bits &= bits - 1;
        }

        let index = self.archetypes.len();
        self.archetypes.push(Archetype::new(mask, &specs));
        self.archetype_index.insert(mask, index);

        // Wire add/remove edges on every archetype exactly one bit away.
        // Existing edges stay correct because archetypes never die.
        for existing in &mut self.archetypes[..index] {
            let diff = existing.mask() ^ mask;
            if diff.count_ones() == 1 {
                let b = bit_index(diff);
                if existing.mask() | diff == mask {
                    existing.edges.add[b] = Some(index as u32);
                } else {
                    existing.edges.remove[b] = Some(index as u32);
                }
            }
        }

        self.query_cache
            .borrow_mut()
            .on_archetype_created(index, mask);
        index
    }

    // ========== Queries ==========

    /// Indices of archetypes matching the predicate.
    ///
    /// Results are memoized; the returned vector is an owned snapshot, so it
    /// stays coherent even if later spawns create new archetypes.
    pub fn matching_archetypes(&self, required: u64, excluded: u64) -> Vec<usize> {
        {
            let cache = self.query_cache.borrow();
            if let Some(matches) = cache.get(required, excluded) {
                return matches.clone();
            }
        }

        let matches: Vec<usize> = self
            .archetypes
            .iter()
            .enumerate()
            .filter(|(_, archetype)| mask_matches(archetype.mask(), required, excluded))
            .map(|(index, _)| index)
            .collect();
        self.query_cache
            .borrow_mut()
            .insert(required, excluded, matches.clone());
        matches
    }

    /// Number of entities across all matching archetypes.
    pub fn query_count(&self, required: u64, excluded: u64) -> usize {
        self.matching_archetypes(required, excluded)
            .iter()
            .map(|&index| self.archetypes[index].len())
            .sum()
    }

    /// Every matching entity, concatenated into a fresh vector.
    pub fn query_entities(&self, required: u64, excluded: u64) -> Vec<Entity> {
        let matches = self.matching_archetypes(required, excluded);
        let total: usize = matches.iter().map(|&index| self.archetypes[index].len()).sum();
        let mut entities = Vec::with_capacity(total);
        for &index in &matches {
            entities.extend_from_slice(self.archetypes[index].entities());
        }
        entities
    }

    /// First entity of the first non-empty match.
    pub fn query_first(&self, required: u64, excluded: u64) -> Option<Entity> {
        self.matching_archetypes(required, excluded)
            .into_iter()
            .map(|index| &self.archetypes[index])
            .find(|archetype| !archetype.is_empty())
            .map(|archetype| archetype.entity(0))
    }

    /// Call `f` once per matching row, archetype by archetype.
    pub fn for_each<F>(&mut self, required: u64, excluded: u64, mut f: F)
    where
        F: FnMut(&mut Archetype, usize),
    {
        for index in self.matching_archetypes(required, excluded) {
            let mut row = 0;
            while row < self.archetypes[index].len() {
                f(&mut self.archetypes[index], row);
                row += 1;
            }
        }
    }

    /// Call `f` once per matching archetype.
    pub fn for_each_table<F>(&mut self, required: u64, excluded: u64, mut f: F)
    where
        F: FnMut(&mut Archetype),
    {
        for index in self.matching_archetypes(required, excluded) {
            f(&mut self.archetypes[index]);
        }
    }

    /// Step-by-step variant of [`for_each_table`](World::for_each_table).
    pub fn table_iter(&mut self, required: u64, excluded: u64) -> TableIter<'_> {
        let indices = self.matching_archetypes(required, excluded);
        TableIter {
            world: self,
            indices,
            cursor: 0,
        }
    }

    // ========== Archetype access ==========

    pub fn archetype(&self, index: usize) -> Option<&Archetype> {
        self.archetypes.get(index)
    }

    pub fn archetype_mut(&mut self, index: usize) -> Option<&mut Archetype> {
        self.archetypes.get_mut(index)
    }

    pub fn archetypes(&self) -> &[Archetype] {
        &self.archetypes
    }

    pub fn archetype_count(&self) -> usize {
        self.archetypes.len()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

/// Walks the archetypes matching a predicate, yielding mutable tables.
pub struct TableIter<'w> {
    world: &'w mut World,
    indices: Vec<usize>,
    cursor: usize,
}

impl TableIter<'_> {
    /// Next matching archetype and its index, or `None` when exhausted.
    pub fn next(&mut self) -> Option<(usize, &mut Archetype)> {
        let index = *self.indices.get(self.cursor)?;
        self.cursor += 1;
        Some((index, &mut self.world.archetypes[index]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archetypes_are_shared_by_mask() {
        let mut world = World::new();
        let a = world.register_component::<u32>().unwrap();
        let b = world.register_component::<u64>().unwrap();

        world.spawn(a, &[ComponentData::zeroed(a)]);
        world.spawn(a | b, &[ComponentData::zeroed(a)]);
        world.spawn(a, &[ComponentData::zeroed(a)]);

        assert_eq!(world.archetype_count(), 2);
        assert_eq!(world.archetype(0).unwrap().len(), 2);
        assert_eq!(world.archetype(1).unwrap().len(), 1);
    }

    #[test]
    fn edges_are_wired_on_creation() {
        let mut world = World::new();
        let a = world.register_component::<u32>().unwrap();
        let b = world.register_component::<u64>().unwrap();

        world.spawn(a, &[ComponentData::zeroed(a)]);
        world.spawn(a | b, &[ComponentData::zeroed(a)]);

        // {a} was created first, so creating {a, b} wires its add edge.
        let from = world.archetype(0).unwrap();
        assert_eq!(from.edges.add[bit_index(b)], Some(1));
        // The new archetype's own edges resolve lazily on first mutation.
        let back = world.archetype(1).unwrap();
        assert_eq!(back.edges.remove[bit_index(b)], None);
    }

    #[test]
    fn table_iter_visits_every_match() {
        let mut world = World::new();
        let a = world.register_component::<u32>().unwrap();
        let b = world.register_component::<u64>().unwrap();
        world.spawn(a, &[ComponentData::zeroed(a)]);
        world.spawn(a | b, &[ComponentData::zeroed(a)]);

        let mut iter = world.table_iter(a, 0);
        let mut seen = Vec::new();
        while let Some((index, archetype)) = iter.next() {
            seen.push((index, archetype.len()));
        }
        assert_eq!(seen, vec![(0, 1), (1, 1)]);
    }
}
