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

//! Bitmask archetype ECS
//!
//! Entities are grouped into archetypes by the exact set of component bits
//! they carry, and each component type is stored as one packed column per
//! archetype. Queries match archetypes with two mask operations and memoize
//! the resulting index lists; structural mutations route through cached
//! graph edges between neighboring archetypes.
//!
//! The engine is single-threaded and destructor-free: component payloads
//! are plain-old-data bytes, relocated with raw copies.

pub mod archetype;
pub mod column;
pub mod command;
pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod query;
pub mod tag;
pub mod world;

#[cfg(feature = "profiling")]
pub mod profiling;

// Re-exports for convenience
pub use archetype::Archetype;
pub use command::CommandBuffer;
pub use component::{bit_index, ComponentData, MAX_COMPONENTS};
pub use entity::{Entity, EntityLocation, MIN_ENTITY_CAPACITY};
pub use error::{EcsError, Result};
pub use event::EventQueue;
pub use query::mask_matches;
pub use tag::{Tags, MAX_TAGS};
pub use world::{TableIter, World};
