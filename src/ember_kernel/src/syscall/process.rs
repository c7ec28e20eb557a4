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

use crate::mem::user_copy;
use crate::userland::child::{ChildStatus, LoadOutcome};
use crate::userland::process::{Pid, Process};
use crate::Kernel;

use super::{SysResult, Teardown};

pub fn halt(kernel: &Kernel) -> SysResult {
    kernel.power.shutdown()
}

pub fn exit(status: i32) -> SysResult {
    // Termination and cleanup are funneled through the dispatcher so the
    // fatal path and the voluntary path cannot diverge.
    Err(Teardown::Exit(status))
}

pub fn exec(kernel: &Kernel, process: &Process, command_line: usize) -> SysResult {
    let command_line = user_copy::copy_in_string(process.vm(), command_line)?;

    let status = ChildStatus::new();

    // The load reads the program image out of the file store, so spawning
    // happens under the filesystem lock. The lock is released before we
    // block on the outcome: the loader may need it itself.
    let pid = {
        let _fs = kernel.fs_lock.lock();
        kernel.scheduler.spawn(&command_line, status.clone())
    };

    let Some(pid) = pid else {
        log::trace!("exec: spawn refused for {:?}", command_line);
        return Ok(-1);
    };

    process.children.insert(pid, status.clone());

    match status.wait_load(&*kernel.scheduler) {
        LoadOutcome::Loaded => Ok(pid.as_usize() as isize),

        _ => {
            log::trace!("exec: load failed for {:?} (pid={})", command_line, pid);
            process.children.remove(pid);
            Ok(-1)
        }
    }
}

pub fn wait(kernel: &Kernel, process: &Process, pid: usize) -> SysResult {
    let pid = Pid::new(pid);

    let Some(status) = process.children.get(pid) else {
        return Ok(-1);
    };

    // Exactly one wait per child.
    if !status.claim_wait() {
        return Ok(-1);
    }

    let exit_status = status.wait_exit(&*kernel.scheduler);
    process.children.remove(pid);

    Ok(exit_status as isize)
}
