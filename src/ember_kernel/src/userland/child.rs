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

//! The parent/child exit-status channel.
//!
//! A [`ChildStatus`] cell is created by the parent at spawn time, before the
//! child runs. The parent keeps one handle in its [`ChildRegistry`]; the
//! child process holds the other and writes its load outcome and exit status
//! into it. The cell dies with its last handle, so a parent that exits first
//! leaves the child writing into a cell nobody reads, and a child that exits
//! first leaves its status behind for the parent's wait.

use alloc::sync::Arc;
use alloc::vec::Vec;

use hashbrown::HashMap;
use spin::Mutex;

use super::process::Pid;
use super::scheduler::Scheduler;
use crate::utils::sync::WaitQueue;

/// Whether a spawned program's image was established before it began
/// executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Pending,
    Loaded,
    Failed,
}

struct ChildState {
    load: LoadOutcome,
    exit_status: i32,
    exited: bool,
    /// Set by the first wait; a second wait on the same child fails.
    waited: bool,
}

/// Shared exit-status cell. Its own lock serializes the parent's reads
/// against the child's writes, independent of every other kernel lock.
pub struct ChildStatus {
    state: Mutex<ChildState>,
    wq: WaitQueue,
}

impl ChildStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(ChildState {
                load: LoadOutcome::Pending,
                exit_status: 0,
                exited: false,
                waited: false,
            }),
            wq: WaitQueue::new(),
        })
    }

    /// Reports the load outcome. Called by the loader, exactly once, from
    /// the child's side of the spawn.
    pub fn set_load_outcome(&self, scheduler: &dyn Scheduler, success: bool) {
        {
            let mut state = self.state.lock();

            state.load = if success {
                LoadOutcome::Loaded
            } else {
                LoadOutcome::Failed
            };
        }

        self.wq.notify_all(scheduler);
    }

    /// Blocks until the load outcome is known and returns it. Never returns
    /// [`LoadOutcome::Pending`].
    pub fn wait_load(&self, scheduler: &dyn Scheduler) -> LoadOutcome {
        let state = self
            .wq
            .block_on(scheduler, &self.state, |state| {
                state.load != LoadOutcome::Pending
            });

        state.load
    }

    /// Records the child's exit status and wakes any waiter. The status is
    /// written before the wakeup is delivered.
    pub fn record_exit(&self, scheduler: &dyn Scheduler, status: i32) {
        {
            let mut state = self.state.lock();
            state.exit_status = status;
            state.exited = true;
        }

        self.wq.notify_all(scheduler);
    }

    /// Claims the single wait this cell honors. Returns `false` if a wait
    /// already claimed it.
    pub fn claim_wait(&self) -> bool {
        let mut state = self.state.lock();

        if state.waited {
            return false;
        }

        state.waited = true;
        true
    }

    /// Blocks until the child has recorded its exit status, then returns it.
    /// Returns immediately if the child already exited.
    pub fn wait_exit(&self, scheduler: &dyn Scheduler) -> i32 {
        let state = self.wq.block_on(scheduler, &self.state, |state| state.exited);

        state.exit_status
    }

    /// Whether the child has recorded its exit.
    pub fn has_exited(&self) -> bool {
        self.state.lock().exited
    }
}

/// The parent-owned map from child pid to status cell. Never shared with
/// another process.
pub struct ChildRegistry {
    children: Mutex<HashMap<Pid, Arc<ChildStatus>>>,
}

impl ChildRegistry {
    pub fn new() -> Self {
        Self {
            children: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, pid: Pid, status: Arc<ChildStatus>) {
        self.children.lock().insert(pid, status);
    }

    pub fn get(&self, pid: Pid) -> Option<Arc<ChildStatus>> {
        self.children.lock().get(&pid).cloned()
    }

    pub fn remove(&self, pid: Pid) -> Option<Arc<ChildStatus>> {
        self.children.lock().remove(&pid)
    }

    /// Discards every record. The children themselves keep running; they
    /// just no longer have anyone to report to.
    pub fn clear(&self) -> Vec<Arc<ChildStatus>> {
        self.children.lock().drain().map(|(_, cell)| cell).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.children.lock().is_empty()
    }
}

impl Default for ChildRegistry {
    fn default() -> Self {
        Self::new()
    }
}
