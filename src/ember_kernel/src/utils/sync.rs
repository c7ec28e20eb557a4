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

use alloc::vec::Vec;

use spin::{Mutex, MutexGuard};

use crate::userland::process::Pid;
use crate::userland::scheduler::Scheduler;

/// Used to manage and block processes that are waiting for a condition to
/// become true. The waiting process is suspended through the scheduler
/// between checks, never spun.
pub struct WaitQueue {
    queue: Mutex<Vec<Pid>>,
}

impl WaitQueue {
    pub const fn new() -> Self {
        Self {
            queue: Mutex::new(Vec::new()),
        }
    }

    /// Blocks the calling process until `condition` holds for the data in
    /// `mutex`, then returns the guard with the condition still true.
    ///
    /// The condition is re-evaluated under the lock after every wakeup, so a
    /// wake that arrives for any other reason is harmless.
    pub fn block_on<'a, T, F>(
        &self,
        scheduler: &dyn Scheduler,
        mutex: &'a Mutex<T>,
        mut condition: F,
    ) -> MutexGuard<'a, T>
    where
        F: FnMut(&mut MutexGuard<T>) -> bool,
    {
        let mut lock = mutex.lock();

        if condition(&mut lock) {
            return lock;
        }

        let pid = scheduler.current();
        self.queue.lock().push(pid);

        while !condition(&mut lock) {
            drop(lock);
            scheduler.block_current();
            lock = mutex.lock();
        }

        self.remove(pid);
        lock
    }

    fn remove(&self, pid: Pid) {
        let mut queue = self.queue.lock();

        if let Some(index) = queue.iter().position(|waiter| *waiter == pid) {
            queue.remove(index);
        }
    }

    /// Wakes every process in the queue.
    pub fn notify_all(&self, scheduler: &dyn Scheduler) {
        for pid in self.queue.lock().iter() {
            scheduler.wake(*pid);
        }
    }
}
