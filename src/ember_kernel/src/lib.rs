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

//! The Ember syscall boundary: the trusted edge between unprivileged user
//! processes and kernel services.
//!
//! The crate is portable: it owns the dispatch table, the user-memory
//! guard, the per-process file and child tables and the filesystem
//! serialization lock, and reaches everything else (scheduling, program
//! loading, the file store, the console, power control) through the
//! collaborator traits in [`userland::scheduler`], [`fs`] and [`drivers`].
//! An embedding kernel implements those traits, builds a [`Kernel`], and
//! calls [`syscall::handle_syscall`] from its trap handler; the hosted test
//! suite does exactly the same with scripted collaborators.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod drivers;
pub mod fs;
pub mod mem;
pub mod syscall;
pub mod userland;
pub mod utils;

use alloc::sync::Arc;

use spin::Mutex;

use drivers::{Console, Power};
use fs::FileSystem;
use userland::scheduler::Scheduler;

/// The kernel context handed to every syscall handler. Owns the filesystem
/// serialization lock and the collaborator services; holds no per-process
/// state, so independent instances can coexist (one per test, for example).
pub struct Kernel {
    pub(crate) fs: Arc<dyn FileSystem>,
    /// Serializes filesystem operations.
    pub(crate) fs_lock: Mutex<()>,
    pub(crate) console: Arc<dyn Console>,
    pub(crate) power: Arc<dyn Power>,
    pub(crate) scheduler: Arc<dyn Scheduler>,
}

impl Kernel {
    pub fn new(
        fs: Arc<dyn FileSystem>,
        console: Arc<dyn Console>,
        power: Arc<dyn Power>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Arc<Self> {
        Arc::new(Self {
            fs,
            fs_lock: Mutex::new(()),
            console,
            power,
            scheduler,
        })
    }

    /// The process-lifecycle collaborator, for embedders that need to route
    /// loader results back through the cells they were handed in `spawn`.
    pub fn scheduler(&self) -> &Arc<dyn Scheduler> {
        &self.scheduler
    }
}
