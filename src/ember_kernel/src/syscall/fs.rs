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

use alloc::vec;

use ember_syscall::{STDIN_FILENO, STDOUT_FILENO};

use crate::mem::user_copy;
use crate::mem::{page_offset, PAGE_SIZE};
use crate::userland::process::Process;
use crate::Kernel;

use super::SysResult;

pub fn create(kernel: &Kernel, process: &Process, path: usize, initial_size: usize) -> SysResult {
    let path = user_copy::copy_in_string(process.vm(), path)?;

    let _fs = kernel.fs_lock.lock();

    match kernel.fs.create(&path, initial_size) {
        Ok(()) => Ok(1),
        Err(_) => Ok(0),
    }
}

pub fn remove(kernel: &Kernel, process: &Process, path: usize) -> SysResult {
    let path = user_copy::copy_in_string(process.vm(), path)?;

    let _fs = kernel.fs_lock.lock();

    match kernel.fs.remove(&path) {
        Ok(()) => Ok(1),
        Err(_) => Ok(0),
    }
}

pub fn open(kernel: &Kernel, process: &Process, path: usize) -> SysResult {
    let path = user_copy::copy_in_string(process.vm(), path)?;

    let _fs = kernel.fs_lock.lock();

    let file = match kernel.fs.open(&path) {
        Ok(file) => file,
        Err(_) => return Ok(-1),
    };

    // A full descriptor table degrades to -1; the file is dropped (and with
    // it, closed) before the lock is released.
    match process.file_table.open_file(file) {
        Ok(fd) => Ok(fd as isize),
        Err(_) => Ok(-1),
    }
}

pub fn filesize(kernel: &Kernel, process: &Process, handle: usize) -> SysResult {
    let Some(file) = process.file_table.get_handle(handle) else {
        return Ok(-1);
    };

    let _fs = kernel.fs_lock.lock();
    Ok(file.length() as isize)
}

pub fn seek(kernel: &Kernel, process: &Process, handle: usize, position: usize) -> SysResult {
    let Some(file) = process.file_table.get_handle(handle) else {
        return Ok(-1);
    };

    let _fs = kernel.fs_lock.lock();
    file.seek(position);

    Ok(0)
}

pub fn tell(kernel: &Kernel, process: &Process, handle: usize) -> SysResult {
    let Some(file) = process.file_table.get_handle(handle) else {
        return Ok(-1);
    };

    let _fs = kernel.fs_lock.lock();
    Ok(file.tell() as isize)
}

pub fn close(kernel: &Kernel, process: &Process, handle: usize) -> SysResult {
    let Some(file) = process.file_table.close_file(handle) else {
        return Ok(-1);
    };

    // The handle is already unreachable through the table; dropping the
    // last reference under the lock closes the file.
    let _fs = kernel.fs_lock.lock();
    drop(file);

    Ok(0)
}

pub fn read(kernel: &Kernel, process: &Process, handle: usize, buffer: usize, size: usize) -> SysResult {
    let vm = process.vm();

    user_copy::verify_user(vm, buffer)?;

    if handle == STDIN_FILENO {
        // Console input is always available: exactly `size` bytes, fetched
        // one character at a time.
        for i in 0..size {
            let byte = kernel.console.read_char();
            user_copy::copy_to_user(vm, buffer + i, &[byte])?;
        }

        return Ok(size as isize);
    }

    let Some(file) = process.file_table.get_handle(handle) else {
        return Ok(-1);
    };

    let mut staging = vec![0u8; PAGE_SIZE];
    let mut total = 0usize;
    let mut dst = buffer;
    let mut remaining = size;

    let _fs = kernel.fs_lock.lock();

    while remaining > 0 {
        let chunk = remaining.min(PAGE_SIZE - page_offset(dst));

        let count = match file.read(&mut staging[..chunk]) {
            Ok(count) => count,
            Err(_) => {
                if total == 0 {
                    return Ok(-1);
                }

                break;
            }
        };

        user_copy::copy_to_user(vm, dst, &staging[..count])?;
        total += count;

        // End-of-file.
        if count < chunk {
            break;
        }

        dst += count;
        remaining -= count;
    }

    Ok(total as isize)
}

pub fn write(kernel: &Kernel, process: &Process, handle: usize, buffer: usize, size: usize) -> SysResult {
    let file = if handle == STDOUT_FILENO {
        None
    } else {
        match process.file_table.get_handle(handle) {
            Some(file) => Some(file),
            // Nothing has been written yet: the whole call fails.
            None => return Ok(-1),
        }
    };

    let vm = process.vm();
    let mut staging = vec![0u8; PAGE_SIZE];
    let mut written = 0usize;
    let mut src = buffer;
    let mut remaining = size;

    // Held across the whole loop so the write is atomic with respect to
    // other filesystem users.
    let _fs = kernel.fs_lock.lock();

    while remaining > 0 {
        // A multi-page buffer may have some pages mapped and others not:
        // validate one page at a time, immediately before touching it. The
        // guard error path drops the lock on the way out.
        let chunk = remaining.min(PAGE_SIZE - page_offset(src));
        user_copy::copy_from_user(vm, src, &mut staging[..chunk])?;

        let count = match &file {
            None => {
                kernel.console.write(&staging[..chunk]);
                chunk
            }

            Some(file) => match file.write(&staging[..chunk]) {
                Ok(count) => count,
                Err(_) => {
                    if written == 0 {
                        return Ok(-1);
                    }

                    break;
                }
            },
        };

        written += count;

        // A short write means the file ran out of room.
        if count < chunk {
            break;
        }

        src += count;
        remaining -= count;
    }

    Ok(written as isize)
}
