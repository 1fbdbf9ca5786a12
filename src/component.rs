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

//! Component registration and spawn payload descriptors.
//!
//! Every registered component type gets one bit of a 64-bit mask, assigned
//! sequentially. The registry records the byte size and alignment once; from
//! then on components travel as raw bytes keyed by their bit.

use bytemuck::Pod;

use crate::error::{EcsError, Result};

/// Maximum number of registered component types.
///
/// The cap keeps an archetype signature in a single machine word, so mask
/// matching is two instructions.
pub const MAX_COMPONENTS: usize = 64;

/// Index of the single set bit in a component mask.
#[inline]
pub fn bit_index(bit: u64) -> usize {
    bit.trailing_zeros() as usize
}

/// Size and alignment recorded at registration time.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct ComponentInfo {
    pub size: usize,
    pub align: usize,
}

/// Assigns single-bit masks to component types.
pub(crate) struct ComponentRegistry {
    infos: [ComponentInfo; MAX_COMPONENTS],
    next_bit: u64,
}

impl ComponentRegistry {
    pub fn new() -> Self {
        Self {
            infos: [ComponentInfo::default(); MAX_COMPONENTS],
            next_bit: 1,
        }
    }

    /// Claim the next free bit for a component of the given layout.
    ///
    /// A size of zero registers a tag-by-bit: it occupies a mask bit but no
    /// column bytes.
    pub fn register(&mut self, size: usize, align: usize) -> Result<u64> {
        if self.next_bit == 0 {
            return Err(EcsError::ComponentLimitReached);
        }
        debug_assert!(align == 0 || align.is_power_of_two());

        let bit = self.next_bit;
        // Shifts to zero once bit 63 is handed out.
        self.next_bit = self.next_bit.wrapping_shl(1);
        self.infos[bit_index(bit)] = ComponentInfo {
            size,
            align: align.max(1),
        };
        Ok(bit)
    }

    pub fn info(&self, bit_idx: usize) -> ComponentInfo {
        self.infos[bit_idx]
    }
}

/// One component payload handed to `spawn` or queued on a command buffer.
///
/// `bytes: None` zero-defaults the column, as does omitting the bit from the
/// entry list entirely.
#[derive(Debug, Clone, Copy)]
pub struct ComponentData<'a> {
    pub bit: u64,
    pub bytes: Option<&'a [u8]>,
}

impl<'a> ComponentData<'a> {
    pub fn new(bit: u64, bytes: &'a [u8]) -> Self {
        Self {
            bit,
            bytes: Some(bytes),
        }
    }

    /// Entry whose column bytes stay zeroed.
    pub fn zeroed(bit: u64) -> Self {
        Self { bit, bytes: None }
    }

    /// View a component value as its raw bytes.
    pub fn from_value<T: Pod>(bit: u64, value: &'a T) -> Self {
        Self {
            bit,
            bytes: Some(bytemuck::bytes_of(value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_are_sequential_powers_of_two() {
        let mut registry = ComponentRegistry::new();
        let a = registry.register(8, 4).unwrap();
        let b = registry.register(16, 8).unwrap();
        let c = registry.register(4, 4).unwrap();
        assert_eq!((a, b, c), (1, 2, 4));
        assert_eq!(bit_index(a), 0);
        assert_eq!(bit_index(c), 2);
        assert_eq!(registry.info(1).size, 16);
    }

    #[test]
    fn registry_caps_at_sixty_four() {
        let mut registry = ComponentRegistry::new();
        for _ in 0..MAX_COMPONENTS {
            registry.register(4, 4).unwrap();
        }
        assert_eq!(
            registry.register(4, 4),
            Err(EcsError::ComponentLimitReached)
        );
    }

    #[test]
    fn from_value_exposes_bytes() {
        let value: u32 = 0x0403_0201;
        let entry = ComponentData::from_value(1, &value);
        assert_eq!(entry.bytes.unwrap(), &value.to_ne_bytes());
    }
}
