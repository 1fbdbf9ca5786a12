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

//! Command buffer with struct variants
//!
//! Records structural mutations for later replay against a world. Payload
//! bytes are copied into the buffer at queue time, so the caller's data need
//! not outlive submission.

use smallvec::SmallVec;

use crate::component::ComponentData;
use crate::entity::Entity;
use crate::world::World;

/// A component payload captured at queue time. Empty bytes mean
/// zero-default.
#[derive(Debug, Clone)]
struct OwnedComponent {
    bit: u64,
    bytes: Vec<u8>,
}

impl OwnedComponent {
    fn capture(entry: &ComponentData) -> Self {
        Self {
            bit: entry.bit,
            bytes: entry.bytes.map(<[u8]>::to_vec).unwrap_or_default(),
        }
    }

    fn as_entry(&self) -> ComponentData<'_> {
        ComponentData {
            bit: self.bit,
            bytes: if self.bytes.is_empty() {
                None
            } else {
                Some(&self.bytes)
            },
        }
    }
}

/// Deferred structural mutation
#[derive(Debug)]
enum Command {
    Spawn {
        mask: u64,
        components: Vec<OwnedComponent>,
    },
    Despawn(Entity),
    AddComponents {
        entity: Entity,
        components: Vec<OwnedComponent>,
    },
    RemoveComponents {
        entity: Entity,
        mask: u64,
    },
}

/// Command buffer for deferred operations
///
/// Replay order matches insertion order. Commands that land on handles dead
/// by replay time are skipped, matching the world's own failure signaling.
#[derive(Debug, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Create new command buffer
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    /// Queue a spawn, capturing the payload bytes.
    pub fn queue_spawn(&mut self, mask: u64, entries: &[ComponentData]) {
        self.commands.push(Command::Spawn {
            mask,
            components: entries.iter().map(OwnedComponent::capture).collect(),
        });
    }

    /// Queue a despawn.
    pub fn queue_despawn(&mut self, entity: Entity) {
        self.commands.push(Command::Despawn(entity));
    }

    /// Queue component additions, capturing the payload bytes.
    ///
    /// Entries with no bytes zero-default their columns on replay.
    pub fn queue_add_components(&mut self, entity: Entity, entries: &[ComponentData]) {
        self.commands.push(Command::AddComponents {
            entity,
            components: entries.iter().map(OwnedComponent::capture).collect(),
        });
    }

    /// Queue removal of every component bit in `mask`.
    pub fn queue_remove_components(&mut self, entity: Entity, mask: u64) {
        self.commands.push(Command::RemoveComponents { entity, mask });
    }

    /// Replay all commands against the world in insertion order, then clear.
    pub fn apply(&mut self, world: &mut World) {
        #[cfg(feature = "profiling")]
        let span = tracing::info_span!("command_buffer.apply", queued = self.commands.len());
        #[cfg(feature = "profiling")]
        let _span_guard = span.enter();

        for command in self.commands.drain(..) {
            match command {
                Command::Spawn { mask, components } => {
                    let entries: SmallVec<[ComponentData; 8]> =
                        components.iter().map(OwnedComponent::as_entry).collect();
                    world.spawn(mask, &entries);
                }
                Command::Despawn(entity) => {
                    world.despawn(entity);
                }
                Command::AddComponents { entity, components } => {
                    for component in &components {
                        let entry = component.as_entry();
                        world.add_component_bytes(entity, entry.bit, entry.bytes);
                    }
                }
                Command::RemoveComponents { entity, mask } => {
                    let mut bits = mask;
                    while bits != 0 {
                        let bit = 1u64 << bits.trailing_zeros();
                        world.remove_component(entity, bit);
                        bits &= bits - 1;
                    }
                }
            }
        }
    }

    /// Drop all queued commands without replaying them.
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Get length
    pub fn len(&self) -> usize {
        self.commands.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_and_clear() {
        let mut buffer = CommandBuffer::new();
        assert!(buffer.is_empty());

        buffer.queue_despawn(Entity::NIL);
        buffer.queue_remove_components(Entity::NIL, 0b11);
        assert_eq!(buffer.len(), 2);

        buffer.clear();
        assert!(buffer.is_empty());
    }

    #[test]
    fn spawn_captures_payload_bytes() {
        let mut world = World::new();
        let health = world.register_component::<u32>().unwrap();

        let mut buffer = CommandBuffer::new();
        {
            // The payload goes out of scope before apply; the buffer owns a
            // copy.
            let value: u32 = 250;
            buffer.queue_spawn(health, &[ComponentData::from_value(health, &value)]);
        }

        assert_eq!(world.entity_count(), 0);
        buffer.apply(&mut world);
        assert!(buffer.is_empty());
        assert_eq!(world.entity_count(), 1);

        let entity = world.query_first(health, 0).unwrap();
        assert_eq!(world.get::<u32>(entity, health), Some(&250));
    }
}
