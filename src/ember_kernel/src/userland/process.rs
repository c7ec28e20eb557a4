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

use core::sync::atomic::{AtomicBool, Ordering};

use alloc::sync::Arc;

use super::child::{ChildRegistry, ChildStatus};
use crate::fs::file_table::FileTable;
use crate::mem::paging::AddressSpace;
use crate::Kernel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pid(usize);

impl Pid {
    pub const fn new(pid: usize) -> Self {
        Self(pid)
    }

    pub fn as_usize(&self) -> usize {
        self.0
    }
}

impl core::fmt::Display for Pid {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        self.0.fmt(f)
    }
}

/// One user process, as the syscall layer sees it: its identity, its user
/// address space, and the two tables it exclusively owns.
pub struct Process {
    pid: Pid,
    vm: AddressSpace,

    /// Open-file table. Only this process's own syscalls touch it.
    pub file_table: FileTable,
    /// Records for the processes this one spawned.
    pub children: ChildRegistry,

    /// This process's half of the cell its parent is holding. The first
    /// process has no parent and no cell.
    status: Option<Arc<ChildStatus>>,

    dead: AtomicBool,
}

impl Process {
    pub fn new(pid: Pid, status: Option<Arc<ChildStatus>>) -> Arc<Self> {
        Arc::new(Self {
            pid,
            vm: AddressSpace::new(),
            file_table: FileTable::new(),
            children: ChildRegistry::new(),
            status,
            dead: AtomicBool::new(false),
        })
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn vm(&self) -> &AddressSpace {
        &self.vm
    }

    /// Whether this process has been torn down.
    pub fn is_dead(&self) -> bool {
        self.dead.load(Ordering::SeqCst)
    }

    /// The single termination path, for voluntary exit and fatal faults
    /// alike: record the status for a waiting parent, close every open file
    /// under the filesystem lock, and discard the child records. Runs at
    /// most once; later calls are no-ops.
    pub(crate) fn exit(&self, kernel: &Kernel, status: i32) {
        if self.dead.swap(true, Ordering::SeqCst) {
            return;
        }

        log::trace!("process {} exiting with status {}", self.pid, status);

        if let Some(cell) = &self.status {
            cell.record_exit(&*kernel.scheduler, status);
        }

        {
            let _fs = kernel.fs_lock.lock();
            drop(self.file_table.drain());
        }

        self.children.clear();
    }
}
