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

//! Implementation of an in-memory file store. Ember has no disk filesystem
//! wired into the core, so ram-fs backs the syscall tests and any embedder
//! that does not bring its own store.
//!
//! Files are fixed-size: create allocates the full extent up front and a
//! write that reaches the end of that extent is short. Removing a file
//! unlinks its name; opens that already hold the contents keep them alive.

use alloc::boxed::Box;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec;
use alloc::vec::Vec;

use hashbrown::HashMap;
use spin::RwLock;

use super::{File, FileSystem, FileSystemError, Result};

type FileContents = Arc<RwLock<Vec<u8>>>;

pub struct RamFs {
    files: RwLock<HashMap<String, FileContents>>,
}

impl RamFs {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            files: RwLock::new(HashMap::new()),
        })
    }
}

impl FileSystem for RamFs {
    fn create(&self, path: &str, initial_size: usize) -> Result<()> {
        if path.is_empty() {
            return Err(FileSystemError::NotSupported);
        }

        let mut files = self.files.write();

        if files.contains_key(path) {
            return Err(FileSystemError::EntryExists);
        }

        files.insert(String::from(path), Arc::new(RwLock::new(vec![0; initial_size])));
        Ok(())
    }

    fn remove(&self, path: &str) -> Result<()> {
        self.files
            .write()
            .remove(path)
            .map(|_| ())
            .ok_or(FileSystemError::EntryNotFound)
    }

    fn open(&self, path: &str) -> Result<Box<dyn File>> {
        let files = self.files.read();
        let contents = files.get(path).ok_or(FileSystemError::EntryNotFound)?;

        Ok(Box::new(RamFile {
            contents: contents.clone(),
            offset: 0,
        }))
    }
}

struct RamFile {
    contents: FileContents,
    offset: usize,
}

impl File for RamFile {
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize> {
        let contents = self.contents.read();

        // The offset may have been seeked past the end; that is simply EOF.
        let remaining = contents.len().saturating_sub(self.offset);
        let count = buffer.len().min(remaining);

        if count > 0 {
            buffer[..count].copy_from_slice(&contents[self.offset..self.offset + count]);
            self.offset += count;
        }

        Ok(count)
    }

    fn write(&mut self, buffer: &[u8]) -> Result<usize> {
        let mut contents = self.contents.write();

        let remaining = contents.len().saturating_sub(self.offset);
        let count = buffer.len().min(remaining);

        if count > 0 {
            contents[self.offset..self.offset + count].copy_from_slice(&buffer[..count]);
            self.offset += count;
        }

        Ok(count)
    }

    fn seek(&mut self, position: usize) {
        self.offset = position;
    }

    fn tell(&self) -> usize {
        self.offset
    }

    fn length(&self) -> usize {
        self.contents.read().len()
    }
}
