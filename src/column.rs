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

//! Type-erased component columns.
//!
//! A column is a packed byte buffer holding one component type for one
//! archetype: row `r` lives at bytes `[r * elem_size, (r + 1) * elem_size)`.
//! Rows are relocated as raw bytes; component types must not carry drop
//! glue.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

/// Initial allocation size in bytes; growth doubles from here.
const MIN_COLUMN_BYTES: usize = 16;

pub struct Column {
    data: NonNull<u8>,
    len: usize,
    cap: usize,
    elem_size: usize,
    align: usize,
    bit: u64,
}

// The buffer is uniquely owned and carries no interior mutability.
unsafe impl Send for Column {}
unsafe impl Sync for Column {}

impl Column {
    /// New empty column. `align` must be a power of two; `elem_size` must be
    /// a positive multiple of it (zero-sized components get no column).
    pub(crate) fn new(bit: u64, elem_size: usize, align: usize) -> Self {
        debug_assert!(elem_size > 0);
        debug_assert!(align.is_power_of_two());
        debug_assert_eq!(elem_size % align, 0);
        Self {
            // Dangling but aligned, never dereferenced while cap == 0.
            data: unsafe { NonNull::new_unchecked(align as *mut u8) },
            len: 0,
            cap: 0,
            elem_size,
            align,
            bit,
        }
    }

    pub fn bit(&self) -> u64 {
        self.bit
    }

    pub fn elem_size(&self) -> usize {
        self.elem_size
    }

    /// Number of rows currently stored.
    pub fn rows(&self) -> usize {
        self.len / self.elem_size
    }

    pub fn as_ptr(&self) -> NonNull<u8> {
        self.data
    }

    /// Pointer to the start of row `row`.
    pub fn row_ptr(&self, row: usize) -> NonNull<u8> {
        debug_assert!(row < self.rows());
        unsafe { NonNull::new_unchecked(self.data.as_ptr().add(row * self.elem_size)) }
    }

    /// Append one zero-initialized row.
    pub(crate) fn push_zeroed(&mut self) {
        self.grow_to(self.len + self.elem_size);
        unsafe {
            std::ptr::write_bytes(self.data.as_ptr().add(self.len), 0, self.elem_size);
        }
        self.len += self.elem_size;
    }

    /// Append one row copied out of `src` at `src_row`.
    pub(crate) fn push_copy_from(&mut self, src: &Column, src_row: usize) {
        debug_assert_eq!(self.elem_size, src.elem_size);
        debug_assert!(src_row < src.rows());
        self.grow_to(self.len + self.elem_size);
        unsafe {
            std::ptr::copy_nonoverlapping(
                src.data.as_ptr().add(src_row * src.elem_size),
                self.data.as_ptr().add(self.len),
                self.elem_size,
            );
        }
        self.len += self.elem_size;
    }

    /// Overwrite row `row` with `bytes`.
    pub(crate) fn write(&mut self, row: usize, bytes: &[u8]) {
        debug_assert!(row < self.rows());
        debug_assert_eq!(bytes.len(), self.elem_size);
        unsafe {
            std::ptr::copy_nonoverlapping(
                bytes.as_ptr(),
                self.data.as_ptr().add(row * self.elem_size),
                self.elem_size,
            );
        }
    }

    /// Drop row `row` by moving the last row into its place.
    ///
    /// When `row` is the last row the regions would alias, so the copy is
    /// skipped and the row is simply truncated away.
    pub(crate) fn swap_remove(&mut self, row: usize) {
        let last = self.rows() - 1;
        if row < last {
            unsafe {
                std::ptr::copy_nonoverlapping(
                    self.data.as_ptr().add(last * self.elem_size),
                    self.data.as_ptr().add(row * self.elem_size),
                    self.elem_size,
                );
            }
        }
        self.len -= self.elem_size;
    }

    /// Pre-size for `additional` more rows.
    pub(crate) fn reserve_rows(&mut self, additional: usize) {
        self.grow_to(self.len + additional * self.elem_size);
    }

    fn grow_to(&mut self, needed_bytes: usize) {
        if needed_bytes <= self.cap {
            return;
        }
        let mut new_cap = if self.cap == 0 {
            MIN_COLUMN_BYTES
        } else {
            self.cap * 2
        };
        while new_cap < needed_bytes {
            new_cap *= 2;
        }

        unsafe {
            // align is a power of two by construction; new_cap cannot
            // realistically overflow isize at the entity counts the engine
            // targets.
            let new_layout = Layout::from_size_align_unchecked(new_cap, self.align);
            let Some(new_data) = NonNull::new(alloc::alloc(new_layout)) else {
                alloc::handle_alloc_error(new_layout)
            };
            if self.cap > 0 {
                std::ptr::copy_nonoverlapping(self.data.as_ptr(), new_data.as_ptr(), self.len);
                alloc::dealloc(
                    self.data.as_ptr(),
                    Layout::from_size_align_unchecked(self.cap, self.align),
                );
            }
            self.data = new_data;
            self.cap = new_cap;
        }
    }
}

impl Drop for Column {
    fn drop(&mut self) {
        if self.cap > 0 {
            unsafe {
                alloc::dealloc(
                    self.data.as_ptr(),
                    Layout::from_size_align_unchecked(self.cap, self.align),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_u32(column: &Column, row: usize) -> u32 {
        unsafe { *(column.row_ptr(row).as_ptr() as *const u32) }
    }

    #[test]
    fn push_and_write_round_trip() {
        let mut column = Column::new(1, 4, 4);
        column.push_zeroed();
        column.push_zeroed();
        assert_eq!(column.rows(), 2);
        assert_eq!(read_u32(&column, 0), 0);

        column.write(1, &7u32.to_ne_bytes());
        assert_eq!(read_u32(&column, 1), 7);
    }

    #[test]
    fn swap_remove_moves_last_row_down() {
        let mut column = Column::new(1, 4, 4);
        for value in [10u32, 20, 30] {
            column.push_zeroed();
            column.write(column.rows() - 1, &value.to_ne_bytes());
        }

        column.swap_remove(0);
        assert_eq!(column.rows(), 2);
        assert_eq!(read_u32(&column, 0), 30);
        assert_eq!(read_u32(&column, 1), 20);

        // Removing the last row only truncates.
        column.swap_remove(1);
        assert_eq!(column.rows(), 1);
        assert_eq!(read_u32(&column, 0), 30);
    }

    #[test]
    fn push_copy_from_duplicates_a_row() {
        let mut src = Column::new(1, 8, 8);
        src.push_zeroed();
        src.write(0, &0xDEAD_BEEF_u64.to_ne_bytes());

        let mut dst = Column::new(1, 8, 8);
        dst.push_copy_from(&src, 0);
        assert_eq!(dst.rows(), 1);
        let copied = unsafe { *(dst.row_ptr(0).as_ptr() as *const u64) };
        assert_eq!(copied, 0xDEAD_BEEF);
    }

    #[test]
    fn growth_preserves_contents() {
        let mut column = Column::new(1, 4, 4);
        for i in 0..100u32 {
            column.push_zeroed();
            column.write(i as usize, &i.to_ne_bytes());
        }
        for i in 0..100u32 {
            assert_eq!(read_u32(&column, i as usize), i);
        }
    }
}
