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

//! System call entry: the one place user-controlled data crosses into the
//! kernel.
//!
//! The dispatcher reads the call number from the bottom of the user argument
//! area, fetches exactly the number of argument words that call is declared
//! to take (unused slots stay zero), decodes them into a typed [`Syscall`]
//! and routes to the handler. Every user read goes through the memory guard
//! in [`crate::mem::user_copy`]; the dispatcher itself never dereferences a
//! user pointer.
//!
//! Failures come in two tiers. A protocol violation (an unmapped argument
//! area, an out-of-range call number, a bad buffer inside a handler) tears
//! the process down on the spot. Everything else ("file not found", "bad
//! handle", "already waited") is reported to the caller as -1 and the
//! process keeps running.

mod fs;
mod process;

use ember_syscall::{Syscall, MAX_SYSCALL_ARGS, WORD_SIZE};

use crate::mem::user_copy::{self, SegmentationFault};
use crate::userland::process::Process;
use crate::Kernel;

/// Exit status recorded for a process torn down for a protocol violation.
pub const FAULT_EXIT_STATUS: i32 = -1;

/// The kernel-side view of one trap: where the caller left its arguments,
/// and the slot its result word goes to.
#[derive(Debug, Clone, Copy)]
pub struct SyscallFrame {
    /// User address of the argument area (call number first, then the
    /// argument words).
    pub stack_pointer: usize,
    /// Written with the handler's return value when the call completes.
    pub result: usize,
}

impl SyscallFrame {
    pub fn new(stack_pointer: usize) -> Self {
        Self {
            stack_pointer,
            result: 0,
        }
    }
}

/// Raised by a handler when the calling process must be torn down instead of
/// receiving a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// Invalid user-memory access or malformed trap.
    Fault,
    /// Voluntary exit with the given status.
    Exit(i32),
}

impl From<SegmentationFault> for Teardown {
    fn from(_: SegmentationFault) -> Self {
        Teardown::Fault
    }
}

pub type SysResult = core::result::Result<isize, Teardown>;

/// What the trap layer must do once a syscall has been handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Return to user mode; the frame's result slot holds the reply.
    Resume,
    /// The process was terminated with this status (voluntarily or not).
    /// Its cleanup has already run; the thread must be retired.
    Terminated(i32),
}

/// Handles one trap on the calling process's own context. This is the only
/// entry point the embedding kernel calls.
pub fn handle_syscall(kernel: &Kernel, process: &Process, frame: &mut SyscallFrame) -> Flow {
    match dispatch(kernel, process, frame) {
        Ok(value) => {
            frame.result = value as usize;
            Flow::Resume
        }

        Err(Teardown::Fault) => {
            process.exit(kernel, FAULT_EXIT_STATUS);
            Flow::Terminated(FAULT_EXIT_STATUS)
        }

        Err(Teardown::Exit(status)) => {
            process.exit(kernel, status);
            Flow::Terminated(status)
        }
    }
}

fn dispatch(kernel: &Kernel, process: &Process, frame: &SyscallFrame) -> SysResult {
    let vm = process.vm();

    let nr = user_copy::copy_word_from_user(vm, frame.stack_pointer)?;

    let Some(arg_count) = ember_syscall::arg_count(nr) else {
        log::error!("invalid syscall: {:#x}", nr);
        return Err(Teardown::Fault);
    };

    let mut args = [0usize; MAX_SYSCALL_ARGS];

    for (i, slot) in args.iter_mut().enumerate().take(arg_count) {
        let address = frame.stack_pointer + (i + 1) * WORD_SIZE;
        *slot = user_copy::copy_word_from_user(vm, address)?;
    }

    // `arg_count` and `decode` agree on the set of known calls.
    let call = Syscall::decode(nr, args).ok_or(Teardown::Fault)?;

    log::trace!("syscall: {} (pid={})", call.name(), process.pid());

    match call {
        Syscall::Halt => process::halt(kernel),
        Syscall::Exit { status } => process::exit(status),
        Syscall::Exec { command_line } => process::exec(kernel, process, command_line),
        Syscall::Wait { pid } => process::wait(kernel, process, pid),

        Syscall::Create { path, initial_size } => fs::create(kernel, process, path, initial_size),
        Syscall::Remove { path } => fs::remove(kernel, process, path),
        Syscall::Open { path } => fs::open(kernel, process, path),
        Syscall::Filesize { handle } => fs::filesize(kernel, process, handle),
        Syscall::Read {
            handle,
            buffer,
            size,
        } => fs::read(kernel, process, handle, buffer, size),
        Syscall::Write {
            handle,
            buffer,
            size,
        } => fs::write(kernel, process, handle, buffer, size),
        Syscall::Seek { handle, position } => fs::seek(kernel, process, handle, position),
        Syscall::Tell { handle } => fs::tell(kernel, process, handle),
        Syscall::Close { handle } => fs::close(kernel, process, handle),
    }
}
