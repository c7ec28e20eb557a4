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

use core::sync::atomic::{AtomicUsize, Ordering};

use alloc::boxed::Box;
use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use spin::{Mutex, RwLock};

use super::{File, FileSystemError};

/// Handles 0 and 1 are the console and never enter the table, so the first
/// allocated handle is 2.
pub const FIRST_HANDLE: usize = 2;

/// Cap on simultaneously open files per process. Hitting it degrades to a
/// recoverable error on open rather than an allocation failure.
pub const MAX_OPEN_FILES: usize = 256;

pub struct FileHandle {
    pub fd: usize,
    file: Mutex<Box<dyn File>>,
}

impl FileHandle {
    fn new(fd: usize, file: Box<dyn File>) -> Self {
        Self {
            fd,
            file: Mutex::new(file),
        }
    }

    pub fn read(&self, buffer: &mut [u8]) -> super::Result<usize> {
        self.file.lock().read(buffer)
    }

    pub fn write(&self, buffer: &[u8]) -> super::Result<usize> {
        self.file.lock().write(buffer)
    }

    pub fn seek(&self, position: usize) {
        self.file.lock().seek(position)
    }

    pub fn tell(&self) -> usize {
        self.file.lock().tell()
    }

    pub fn length(&self) -> usize {
        self.file.lock().length()
    }
}

/// A process's descriptor table. Handles are allocated from a monotonically
/// increasing counter and never reused for the lifetime of the process.
pub struct FileTable {
    files: RwLock<HashMap<usize, Arc<FileHandle>>>,
    next_fd: AtomicUsize,
}

impl FileTable {
    pub fn new() -> Self {
        Self {
            files: RwLock::new(HashMap::new()),
            next_fd: AtomicUsize::new(FIRST_HANDLE),
        }
    }

    pub fn get_handle(&self, fd: usize) -> Option<Arc<FileHandle>> {
        self.files.read().get(&fd).cloned()
    }

    /// Registers an open file and returns its fresh handle, or
    /// [`FileSystemError::Busy`] if the table is full (the file is dropped,
    /// closing it).
    pub fn open_file(&self, file: Box<dyn File>) -> super::Result<usize> {
        let mut files = self.files.write();

        if files.len() >= MAX_OPEN_FILES {
            return Err(FileSystemError::Busy);
        }

        let fd = self.next_fd.fetch_add(1, Ordering::SeqCst);
        files.insert(fd, Arc::new(FileHandle::new(fd, file)));

        Ok(fd)
    }

    /// Removes `fd` from the table, returning the handle so the caller can
    /// drop it (closing the file) under the filesystem lock. The handle is
    /// unusable through the table immediately.
    pub fn close_file(&self, fd: usize) -> Option<Arc<FileHandle>> {
        self.files.write().remove(&fd)
    }

    /// Empties the table, returning every handle for closing. Used on
    /// process termination.
    pub fn drain(&self) -> Vec<Arc<FileHandle>> {
        self.files.write().drain().map(|(_, handle)| handle).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl Default for FileTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::ramfs::RamFs;
    use crate::fs::FileSystem;

    fn open_one(fs: &RamFs, table: &FileTable) -> usize {
        table.open_file(fs.open("f").unwrap()).unwrap()
    }

    fn fixture() -> (Arc<RamFs>, FileTable) {
        let fs = RamFs::new();
        fs.create("f", 32).unwrap();
        (fs, FileTable::new())
    }

    #[test]
    fn handles_start_at_two_and_never_repeat() {
        let (fs, table) = fixture();

        assert_eq!(open_one(&fs, &table), 2);
        assert_eq!(open_one(&fs, &table), 3);

        assert!(table.close_file(2).is_some());
        assert!(table.close_file(2).is_none());

        // The freed handle is not recycled.
        assert_eq!(open_one(&fs, &table), 4);
        assert!(table.get_handle(2).is_none());
        assert!(table.get_handle(3).is_some());
    }

    #[test]
    fn reserved_handles_never_resolve() {
        let (fs, table) = fixture();
        open_one(&fs, &table);

        assert!(table.get_handle(0).is_none());
        assert!(table.get_handle(1).is_none());
    }

    #[test]
    fn table_exhaustion_is_recoverable() {
        let (fs, table) = fixture();

        for _ in 0..MAX_OPEN_FILES {
            open_one(&fs, &table);
        }

        assert_eq!(
            table.open_file(fs.open("f").unwrap()).err(),
            Some(FileSystemError::Busy)
        );

        // Closing one frees a slot again.
        assert!(table.close_file(FIRST_HANDLE).is_some());
        assert_eq!(open_one(&fs, &table), FIRST_HANDLE + MAX_OPEN_FILES);
    }
}
