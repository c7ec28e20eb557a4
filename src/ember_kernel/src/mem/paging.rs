// Copyright (C) 2024 The Ember Project Developers.
//
// This file is part of The Ember Project.
//
// Ember is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// Ember is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with Ember. If not, see <https://www.gnu.org/licenses/>.

//! Portable per-process user address space.
//!
//! The address space answers one question with a definite verdict: is this
//! byte currently mapped for the owning process, below the user/kernel
//! boundary? The user-memory guard is built entirely on that query, so no
//! user access can ever take down the kernel with an unrecoverable fault.

use alloc::boxed::Box;
use hashbrown::HashMap;
use spin::RwLock;

use super::{page_base, page_offset, PAGE_SIZE, USER_TOP};

type PageData = Box<[u8; PAGE_SIZE]>;

/// A process's user address space: the set of pages mapped for it, with
/// byte-level checked access.
pub struct AddressSpace {
    pages: RwLock<HashMap<usize, PageData>>,
}

impl AddressSpace {
    pub fn new() -> Self {
        Self {
            pages: RwLock::new(HashMap::new()),
        }
    }

    /// Maps a zero-filled page at `base`. Returns `false` if `base` is not
    /// page-aligned, reaches into kernel space, or is already mapped.
    pub fn map_page(&self, base: usize) -> bool {
        if page_offset(base) != 0 || base >= USER_TOP {
            return false;
        }

        let mut pages = self.pages.write();

        if pages.contains_key(&base) {
            return false;
        }

        pages.insert(base, Box::new([0u8; PAGE_SIZE]));
        true
    }

    /// Unmaps the page at `base`. Returns `false` if no such page was mapped.
    pub fn unmap_page(&self, base: usize) -> bool {
        self.pages.write().remove(&page_base(base)).is_some()
    }

    /// Whether `addr` is a valid user address: strictly below [`USER_TOP`]
    /// and currently mapped.
    pub fn is_mapped(&self, addr: usize) -> bool {
        addr < USER_TOP && self.pages.read().contains_key(&page_base(addr))
    }

    /// Reads one byte of user memory, or [`None`] if `addr` is invalid.
    pub fn read_byte(&self, addr: usize) -> Option<u8> {
        if addr >= USER_TOP {
            return None;
        }

        let pages = self.pages.read();
        let page = pages.get(&page_base(addr))?;

        Some(page[page_offset(addr)])
    }

    /// Writes one byte of user memory. Returns `false` if `addr` is invalid.
    pub fn write_byte(&self, addr: usize, value: u8) -> bool {
        if addr >= USER_TOP {
            return false;
        }

        let mut pages = self.pages.write();

        match pages.get_mut(&page_base(addr)) {
            Some(page) => {
                page[page_offset(addr)] = value;
                true
            }
            None => false,
        }
    }

    /// Bulk write used by embedders to stage a process's memory image.
    /// Returns `false` (without a partial-write guarantee) if any byte of the
    /// destination range is unmapped.
    pub fn write_bytes(&self, addr: usize, bytes: &[u8]) -> bool {
        for (i, byte) in bytes.iter().enumerate() {
            if !self.write_byte(addr + i, *byte) {
                return false;
            }
        }

        true
    }

    /// Bulk read counterpart of [`AddressSpace::write_bytes`].
    pub fn read_bytes(&self, addr: usize, buffer: &mut [u8]) -> bool {
        for (i, slot) in buffer.iter_mut().enumerate() {
            match self.read_byte(addr + i) {
                Some(byte) => *slot = byte,
                None => return false,
            }
        }

        true
    }
}

impl Default for AddressSpace {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn map_rejects_unaligned_and_kernel_addresses() {
        let vm = AddressSpace::new();

        assert!(!vm.map_page(0x1001));
        assert!(!vm.map_page(USER_TOP));
        assert!(!vm.map_page(usize::MAX & !(PAGE_SIZE - 1)));

        assert!(vm.map_page(0x1000));
        // Double-mapping the same page is refused.
        assert!(!vm.map_page(0x1000));
    }

    #[test]
    fn byte_access_respects_the_map() {
        let vm = AddressSpace::new();
        assert!(vm.map_page(0x4000));

        assert!(vm.write_byte(0x4fff, 0xab));
        assert_eq!(vm.read_byte(0x4fff), Some(0xab));

        // One byte past the page is a different, unmapped page.
        assert_eq!(vm.read_byte(0x5000), None);
        assert!(!vm.write_byte(0x5000, 0));

        assert!(vm.unmap_page(0x4000));
        assert_eq!(vm.read_byte(0x4fff), None);
    }

    #[test]
    fn kernel_addresses_are_never_mapped() {
        let vm = AddressSpace::new();

        assert!(!vm.is_mapped(USER_TOP));
        assert!(!vm.is_mapped(USER_TOP + 123));
        assert_eq!(vm.read_byte(usize::MAX), None);
    }
}
