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

//! The Ember system call ABI, shared between the kernel and userland.
//!
//! A user process traps into the kernel with the call number and up to three
//! word-sized arguments laid out contiguously in its own memory, starting at
//! the address it hands the kernel (the user stack pointer). The kernel's
//! reply is a single word written back into the trap frame's result slot.
//!
//! | nr     | Name                    | args |
//! |--------|-------------------------|------|
//! | 0      | halt                    | 0    |
//! | 1      | exit                    | 1    |
//! | 2      | exec                    | 1    |
//! | 3      | wait                    | 1    |
//! | 4      | create                  | 2    |
//! | 5      | remove                  | 1    |
//! | 6      | open                    | 1    |
//! | 7      | filesize                | 1    |
//! | 8      | read                    | 3    |
//! | 9      | write                   | 3    |
//! | 10     | seek                    | 2    |
//! | 11     | tell                    | 1    |
//! | 12     | close                   | 1    |

#![no_std]

macro_rules! define_syscall_ids {
    ($($name:ident => $id:expr;)*) => {
        $(
            pub const $name: usize = $id;
        )*
    };
}

define_syscall_ids!(
    SYS_HALT => 0;
    SYS_EXIT => 1;
    SYS_EXEC => 2;
    SYS_WAIT => 3;
    SYS_CREATE => 4;
    SYS_REMOVE => 5;
    SYS_OPEN => 6;
    SYS_FILESIZE => 7;
    SYS_READ => 8;
    SYS_WRITE => 9;
    SYS_SEEK => 10;
    SYS_TELL => 11;
    SYS_CLOSE => 12;
);

/// Reserved handle for the console input device.
pub const STDIN_FILENO: usize = 0;
/// Reserved handle for the console output device.
pub const STDOUT_FILENO: usize = 1;

/// Size of one ABI word. The call number, every argument and the result are
/// all exactly one word.
pub const WORD_SIZE: usize = core::mem::size_of::<usize>();

/// The maximum number of arguments a system call can take.
pub const MAX_SYSCALL_ARGS: usize = 3;

/// Returns the number of argument words `nr` is declared to take, or [`None`]
/// if `nr` is not a known system call.
pub const fn arg_count(nr: usize) -> Option<usize> {
    match nr {
        SYS_HALT => Some(0),
        SYS_EXIT => Some(1),
        SYS_EXEC => Some(1),
        SYS_WAIT => Some(1),
        SYS_CREATE => Some(2),
        SYS_REMOVE => Some(1),
        SYS_OPEN => Some(1),
        SYS_FILESIZE => Some(1),
        SYS_READ => Some(3),
        SYS_WRITE => Some(3),
        SYS_SEEK => Some(2),
        SYS_TELL => Some(1),
        SYS_CLOSE => Some(1),
        _ => None,
    }
}

/// A decoded system call: one variant per call, carrying exactly the
/// arguments that call is declared to take.
///
/// Pointer arguments stay raw addresses here. They are *user* addresses and
/// only the kernel's user-memory guard may turn them into bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syscall {
    Halt,
    Exit { status: i32 },
    Exec { command_line: usize },
    Wait { pid: usize },
    Create { path: usize, initial_size: usize },
    Remove { path: usize },
    Open { path: usize },
    Filesize { handle: usize },
    Read { handle: usize, buffer: usize, size: usize },
    Write { handle: usize, buffer: usize, size: usize },
    Seek { handle: usize, position: usize },
    Tell { handle: usize },
    Close { handle: usize },
}

impl Syscall {
    /// Decodes a raw call number and argument words into a typed call.
    /// Returns [`None`] if `nr` is not a known system call. Argument slots
    /// beyond the call's declared arity are ignored.
    pub fn decode(nr: usize, args: [usize; MAX_SYSCALL_ARGS]) -> Option<Syscall> {
        let call = match nr {
            SYS_HALT => Syscall::Halt,
            SYS_EXIT => Syscall::Exit {
                status: args[0] as i32,
            },
            SYS_EXEC => Syscall::Exec {
                command_line: args[0],
            },
            SYS_WAIT => Syscall::Wait { pid: args[0] },
            SYS_CREATE => Syscall::Create {
                path: args[0],
                initial_size: args[1],
            },
            SYS_REMOVE => Syscall::Remove { path: args[0] },
            SYS_OPEN => Syscall::Open { path: args[0] },
            SYS_FILESIZE => Syscall::Filesize { handle: args[0] },
            SYS_READ => Syscall::Read {
                handle: args[0],
                buffer: args[1],
                size: args[2],
            },
            SYS_WRITE => Syscall::Write {
                handle: args[0],
                buffer: args[1],
                size: args[2],
            },
            SYS_SEEK => Syscall::Seek {
                handle: args[0],
                position: args[1],
            },
            SYS_TELL => Syscall::Tell { handle: args[0] },
            SYS_CLOSE => Syscall::Close { handle: args[0] },

            _ => return None,
        };

        Some(call)
    }

    /// The call's name, for tracing.
    pub fn name(&self) -> &'static str {
        match self {
            Syscall::Halt => "halt",
            Syscall::Exit { .. } => "exit",
            Syscall::Exec { .. } => "exec",
            Syscall::Wait { .. } => "wait",
            Syscall::Create { .. } => "create",
            Syscall::Remove { .. } => "remove",
            Syscall::Open { .. } => "open",
            Syscall::Filesize { .. } => "filesize",
            Syscall::Read { .. } => "read",
            Syscall::Write { .. } => "write",
            Syscall::Seek { .. } => "seek",
            Syscall::Tell { .. } => "tell",
            Syscall::Close { .. } => "close",
        }
    }
}
