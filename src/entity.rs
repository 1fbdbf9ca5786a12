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

//! Entity handles and the generational slot table.

/// Minimum slot table capacity reserved up front.
pub const MIN_ENTITY_CAPACITY: usize = 64;

/// Handle to an entity: dense slot id plus reuse generation.
///
/// Handles are cheap to copy and hash. Equality compares both fields, so a
/// handle left over from before a slot was recycled compares unequal to the
/// slot's current occupant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Entity {
    pub id: u32,
    pub generation: u32,
}

impl Entity {
    /// Sentinel returned by operations that cannot produce an entity.
    pub const NIL: Entity = Entity { id: 0, generation: 0 };
}

/// Where a live entity currently resides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityLocation {
    pub archetype_index: u32,
    pub row: u32,
}

#[derive(Debug, Clone, Copy)]
struct EntitySlot {
    archetype_index: u32,
    row: u32,
    generation: u32,
    alive: bool,
}

/// Slot table with freelist-backed handle allocation.
///
/// Freed slots go on the freelist with their generation already bumped, so
/// the next allocation hands out the stamped handle unchanged. Generation
/// wrap after 2^32 reuses of one slot is accepted.
pub(crate) struct EntitySlots {
    slots: Vec<EntitySlot>,
    free_list: Vec<Entity>,
    next_id: u32,
    live: usize,
}

impl EntitySlots {
    pub fn new() -> Self {
        Self {
            slots: Vec::with_capacity(MIN_ENTITY_CAPACITY),
            free_list: Vec::new(),
            next_id: 0,
            live: 0,
        }
    }

    /// Hand out a handle, reusing a freed slot when one is available.
    ///
    /// The slot stays dead until [`place`](Self::place) records a location.
    pub fn alloc(&mut self) -> Entity {
        if let Some(entity) = self.free_list.pop() {
            return entity;
        }

        let id = self.next_id;
        self.next_id += 1;
        self.slots.push(EntitySlot {
            archetype_index: 0,
            row: 0,
            generation: 0,
            alive: false,
        });
        Entity { id, generation: 0 }
    }

    /// Record where an entity now lives and mark it alive.
    pub fn place(&mut self, entity: Entity, archetype_index: u32, row: u32) {
        let slot = &mut self.slots[entity.id as usize];
        if !slot.alive {
            self.live += 1;
        }
        *slot = EntitySlot {
            archetype_index,
            row,
            generation: entity.generation,
            alive: true,
        };
    }

    /// Patch the row of an entity that was swap-moved within its archetype.
    pub fn repair_row(&mut self, id: u32, row: u32) {
        self.slots[id as usize].row = row;
    }

    /// Kill a slot: bump its generation and push the successor handle onto
    /// the freelist. The caller must have validated the handle.
    pub fn free(&mut self, id: u32) {
        let slot = &mut self.slots[id as usize];
        debug_assert!(slot.alive);
        slot.alive = false;
        slot.generation = slot.generation.wrapping_add(1);
        self.live -= 1;
        self.free_list.push(Entity {
            id,
            generation: slot.generation,
        });
    }

    /// Location of a live entity, or `None` for dead and stale handles.
    pub fn location(&self, entity: Entity) -> Option<EntityLocation> {
        let slot = self.slots.get(entity.id as usize)?;
        if !slot.alive || slot.generation != entity.generation {
            return None;
        }
        Some(EntityLocation {
            archetype_index: slot.archetype_index,
            row: slot.row,
        })
    }

    /// Location without liveness or generation checks.
    ///
    /// Callers must guarantee `id` belongs to a live entity.
    pub fn location_unchecked(&self, id: u32) -> EntityLocation {
        let slot = &self.slots[id as usize];
        EntityLocation {
            archetype_index: slot.archetype_index,
            row: slot.row,
        }
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        self.slots
            .get(entity.id as usize)
            .is_some_and(|slot| slot.alive && slot.generation == entity.generation)
    }

    pub fn live_count(&self) -> usize {
        self.live
    }
}
