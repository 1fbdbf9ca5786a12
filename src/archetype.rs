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

//! Archetype storage with row allocation and removal
//!
//! An archetype holds every entity carrying exactly one component bitmask,
//! column-major. The mask is fixed at creation and the column order is
//! stable for the archetype's lifetime.

use std::ptr::NonNull;

use bytemuck::Pod;

use crate::column::Column;
use crate::component::{bit_index, MAX_COMPONENTS};
use crate::entity::Entity;

/// Cached destination indices for single-bit structural moves.
///
/// `None` means unresolved; entries are filled lazily during mutation and
/// eagerly when a neighboring archetype is created. Archetypes are never
/// destroyed, so a resolved edge stays correct forever.
pub(crate) struct ArchetypeEdges {
    pub add: [Option<u32>; MAX_COMPONENTS],
    pub remove: [Option<u32>; MAX_COMPONENTS],
}

impl ArchetypeEdges {
    fn new() -> Self {
        Self {
            add: [None; MAX_COMPONENTS],
            remove: [None; MAX_COMPONENTS],
        }
    }
}

/// Layout of one column at archetype creation.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ColumnSpec {
    pub bit: u64,
    pub size: usize,
    pub align: usize,
}

/// Set of entities sharing one component bitmask.
pub struct Archetype {
    mask: u64,
    entities: Vec<Entity>,
    columns: Vec<Column>,
    column_of: [Option<u32>; MAX_COMPONENTS],
    pub(crate) edges: ArchetypeEdges,
}

impl Archetype {
    /// Create the table for `mask` with one column per sized spec.
    pub(crate) fn new(mask: u64, specs: &[ColumnSpec]) -> Self {
        let mut column_of = [None; MAX_COMPONENTS];
        let mut columns = Vec::with_capacity(specs.len());
        for spec in specs {
            debug_assert_ne!(mask & spec.bit, 0);
            column_of[bit_index(spec.bit)] = Some(columns.len() as u32);
            columns.push(Column::new(spec.bit, spec.size, spec.align));
        }
        Self {
            mask,
            entities: Vec::new(),
            columns,
            column_of,
            edges: ArchetypeEdges::new(),
        }
    }

    pub fn mask(&self) -> u64 {
        self.mask
    }

    /// Number of entities (rows).
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Entity occupying `row`.
    pub fn entity(&self, row: usize) -> Entity {
        self.entities[row]
    }

    /// Whether the component bit is part of this archetype's mask.
    pub fn has(&self, bit: u64) -> bool {
        self.mask & bit != 0
    }

    pub(crate) fn column(&self, bit: u64) -> Option<&Column> {
        let index = self.column_of[bit_index(bit)]?;
        Some(&self.columns[index as usize])
    }

    pub(crate) fn column_mut(&mut self, bit: u64) -> Option<&mut Column> {
        let index = self.column_of[bit_index(bit)]?;
        Some(&mut self.columns[index as usize])
    }

    pub(crate) fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    /// Append the entity without touching columns; the caller fills them.
    pub(crate) fn push_entity(&mut self, entity: Entity) {
        self.entities.push(entity);
    }

    /// Append a fully zero-initialized row and return its index.
    pub(crate) fn push_row_zeroed(&mut self, entity: Entity) -> usize {
        let row = self.entities.len();
        self.entities.push(entity);
        for column in &mut self.columns {
            column.push_zeroed();
        }
        row
    }

    /// Remove `row`, keeping rows dense by moving the last row into its
    /// place. Returns the entity that now occupies `row`, so the caller can
    /// repair its slot.
    pub(crate) fn swap_remove_row(&mut self, row: usize) -> Option<Entity> {
        debug_assert!(row < self.entities.len());
        self.entities.swap_remove(row);
        for column in &mut self.columns {
            column.swap_remove(row);
        }
        if row < self.entities.len() {
            Some(self.entities[row])
        } else {
            None
        }
    }

    /// Pre-size every column and the entity vector for `additional` rows.
    pub(crate) fn reserve_rows(&mut self, additional: usize) {
        self.entities.reserve(additional);
        for column in &mut self.columns {
            column.reserve_rows(additional);
        }
    }

    /// Raw base pointer and row count of the column for `bit`.
    ///
    /// `None` when the bit has no column here (absent from the mask, or a
    /// zero-sized component). The pointer is valid until the next structural
    /// mutation that grows the column.
    pub fn column_ptr(&self, bit: u64) -> Option<(NonNull<u8>, usize)> {
        let column = self.column(bit)?;
        Some((column.as_ptr(), self.entities.len()))
    }

    /// Raw base pointer without presence checks.
    ///
    /// # Safety
    /// The archetype must carry a sized column for `bit`.
    pub unsafe fn column_ptr_unchecked(&self, bit: u64) -> NonNull<u8> {
        self.column(bit).unwrap_unchecked().as_ptr()
    }

    /// Typed view of the column for `bit`.
    pub fn column_slice<T: Pod>(&self, bit: u64) -> Option<&[T]> {
        let column = self.column(bit)?;
        debug_assert_eq!(std::mem::size_of::<T>(), column.elem_size());
        let bytes = unsafe {
            std::slice::from_raw_parts(
                column.as_ptr().as_ptr(),
                self.entities.len() * column.elem_size(),
            )
        };
        Some(bytemuck::cast_slice(bytes))
    }

    /// Mutable typed view of the column for `bit`.
    pub fn column_slice_mut<T: Pod>(&mut self, bit: u64) -> Option<&mut [T]> {
        let rows = self.entities.len();
        let column = self.column_mut(bit)?;
        debug_assert_eq!(std::mem::size_of::<T>(), column.elem_size());
        let bytes = unsafe {
            std::slice::from_raw_parts_mut(column.as_ptr().as_ptr(), rows * column.elem_size())
        };
        Some(bytemuck::cast_slice_mut(bytes))
    }
}
