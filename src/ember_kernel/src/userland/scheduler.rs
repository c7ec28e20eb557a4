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

use alloc::sync::Arc;

use super::child::ChildStatus;
use super::process::Pid;

/// The process-lifecycle service: creation, identity, and the block/wake
/// primitive every kernel-side wait is built on.
///
/// Process and thread management are not the syscall layer's business; the
/// embedding kernel implements this trait and the core calls through it.
pub trait Scheduler: Send + Sync {
    /// Starts a new process running the program named by `command_line`.
    /// `status` is the child's half of the exit-status cell: the loader must
    /// report the load outcome into it, and the child's exit travels through
    /// it.
    ///
    /// Returns the new process's identifier, or [`None`] if no process could
    /// be created at all.
    fn spawn(&self, command_line: &str, status: Arc<ChildStatus>) -> Option<Pid>;

    /// The process on whose context the kernel is currently executing.
    fn current(&self) -> Pid;

    /// Suspends the calling process until another process wakes it. A wake
    /// delivered before the caller suspends must not be lost; spurious
    /// wakeups are permitted.
    fn block_current(&self);

    /// Wakes `pid` if it is blocked in [`Scheduler::block_current`].
    fn wake(&self, pid: Pid);
}
