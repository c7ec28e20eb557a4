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

//! Hosted embedding of the syscall boundary: user processes are threads,
//! the scheduler blocks with park/unpark, the file store is ram-fs and the
//! console is scripted. Each test builds its own independent [`Kernel`].

#![allow(dead_code)]

use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use ember_kernel::drivers::{Console, Power};
use ember_kernel::fs::ramfs::RamFs;
use ember_kernel::mem::{PAGE_SIZE, USER_TOP};
use ember_kernel::syscall::{handle_syscall, Flow, SyscallFrame};
use ember_kernel::userland::child::ChildStatus;
use ember_kernel::userland::process::{Pid, Process};
use ember_kernel::userland::scheduler::Scheduler;
use ember_kernel::Kernel;
use ember_syscall::WORD_SIZE;

/// Page the harness stages syscall frames in.
pub const STACK_PAGE: usize = USER_TOP - PAGE_SIZE;
/// Scratch area for user buffers and strings.
pub const DATA_PAGE: usize = 0x1000_0000;

pub const INIT_PID: usize = 1;

thread_local! {
    static CURRENT_PID: Cell<usize> = const { Cell::new(0) };
}

#[derive(Default)]
pub struct TestConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
}

impl TestConsole {
    pub fn script_input(&self, bytes: &[u8]) {
        self.input.lock().unwrap().extend(bytes.iter().copied());
    }

    pub fn output(&self) -> Vec<u8> {
        self.output.lock().unwrap().clone()
    }
}

impl Console for TestConsole {
    fn read_char(&self) -> u8 {
        // Console input is always available; an exhausted script yields dots.
        self.input.lock().unwrap().pop_front().unwrap_or(b'.')
    }

    fn write(&self, buffer: &[u8]) {
        self.output.lock().unwrap().extend_from_slice(buffer);
    }
}

pub struct TestPower;

impl Power for TestPower {
    fn shutdown(&self) -> ! {
        panic!("machine powered off");
    }
}

/// Everything a scripted child program gets to work with.
pub struct ProgramCtx {
    pub kernel: Arc<Kernel>,
    pub status: Arc<ChildStatus>,
    pub pid: Pid,
    pub command_line: String,
}

impl ProgramCtx {
    pub fn mark_loaded(&self) {
        self.status
            .set_load_outcome(self.kernel.scheduler().as_ref(), true);
    }

    pub fn mark_load_failed(&self) {
        self.status
            .set_load_outcome(self.kernel.scheduler().as_ref(), false);
    }

    /// The command line minus the program name.
    pub fn argument(&self) -> &str {
        self.command_line
            .split_once(char::is_whitespace)
            .map(|(_, rest)| rest)
            .unwrap_or("")
    }

    /// A user-mode view of this child, with its frame page mapped.
    pub fn user(&self) -> UserProc {
        UserProc::new(
            self.kernel.clone(),
            self.pid,
            Some(self.status.clone()),
        )
    }
}

type Program = Arc<dyn Fn(ProgramCtx) + Send + Sync>;

/// Thread-backed process lifecycle: `spawn` runs a registered program on a
/// fresh thread, `block_current`/`wake` are park/unpark (so a wake delivered
/// before the park is not lost).
pub struct TestScheduler {
    kernel: Mutex<Option<Arc<Kernel>>>,
    programs: Mutex<HashMap<String, Program>>,
    threads: Mutex<HashMap<usize, thread::Thread>>,
    next_pid: AtomicUsize,
}

impl TestScheduler {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            kernel: Mutex::new(None),
            programs: Mutex::new(HashMap::new()),
            threads: Mutex::new(HashMap::new()),
            next_pid: AtomicUsize::new(INIT_PID + 1),
        })
    }

    /// Binds the scheduler to its kernel and adopts the calling thread as
    /// the initial process.
    fn attach(&self, kernel: Arc<Kernel>) {
        *self.kernel.lock().unwrap() = Some(kernel);

        CURRENT_PID.with(|pid| pid.set(INIT_PID));
        self.threads
            .lock()
            .unwrap()
            .insert(INIT_PID, thread::current());
    }

    fn register_program(&self, name: &str, program: Program) {
        self.programs
            .lock()
            .unwrap()
            .insert(String::from(name), program);
    }

    fn kernel(&self) -> Arc<Kernel> {
        self.kernel.lock().unwrap().clone().expect("scheduler not attached")
    }
}

impl Scheduler for TestScheduler {
    fn spawn(&self, command_line: &str, status: Arc<ChildStatus>) -> Option<Pid> {
        let kernel = self.kernel();
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst);

        let name = command_line
            .split_whitespace()
            .next()
            .unwrap_or("")
            .to_string();
        let program = self.programs.lock().unwrap().get(&name).cloned();
        let command_line = command_line.to_string();

        let handle = thread::Builder::new()
            .name(format!("user-{name}"))
            .spawn(move || {
                CURRENT_PID.with(|current| current.set(pid));

                let ctx = ProgramCtx {
                    kernel: kernel.clone(),
                    status: status.clone(),
                    pid: Pid::new(pid),
                    command_line,
                };

                match program {
                    Some(program) => program(ctx),
                    // No such program image: the load fails.
                    None => ctx.mark_load_failed(),
                }
            })
            .ok()?;

        // Registered before spawn returns, so a wake can never miss.
        self.threads
            .lock()
            .unwrap()
            .insert(pid, handle.thread().clone());

        Some(Pid::new(pid))
    }

    fn current(&self) -> Pid {
        Pid::new(CURRENT_PID.with(|pid| pid.get()))
    }

    fn block_current(&self) {
        thread::park();
    }

    fn wake(&self, pid: Pid) {
        if let Some(thread) = self.threads.lock().unwrap().get(&pid.as_usize()) {
            thread.unpark();
        }
    }
}

/// A process plus the machinery to issue syscalls the way user code would:
/// stage the call number and arguments in user memory, trap, read the
/// result word back.
pub struct UserProc {
    pub kernel: Arc<Kernel>,
    pub process: Arc<Process>,
}

impl UserProc {
    pub fn new(kernel: Arc<Kernel>, pid: Pid, status: Option<Arc<ChildStatus>>) -> Self {
        let process = Process::new(pid, status);
        assert!(process.vm().map_page(STACK_PAGE));

        Self { kernel, process }
    }

    pub fn map(&self, base: usize) {
        assert!(self.process.vm().map_page(base));
    }

    pub fn unmap(&self, base: usize) {
        assert!(self.process.vm().unmap_page(base));
    }

    pub fn poke(&self, addr: usize, bytes: &[u8]) {
        assert!(self.process.vm().write_bytes(addr, bytes));
    }

    pub fn poke_str(&self, addr: usize, s: &str) {
        self.poke(addr, s.as_bytes());
        self.poke(addr + s.len(), &[0]);
    }

    pub fn peek(&self, addr: usize, len: usize) -> Vec<u8> {
        let mut bytes = vec![0u8; len];
        assert!(self.process.vm().read_bytes(addr, &mut bytes));
        bytes
    }

    /// Issues a raw trap and reports both the control flow and the result.
    pub fn trap(&self, nr: usize, args: &[usize]) -> (Flow, usize) {
        assert!(args.len() <= ember_syscall::MAX_SYSCALL_ARGS);

        let mut frame_words = vec![nr];
        frame_words.extend_from_slice(args);

        for (i, word) in frame_words.iter().enumerate() {
            self.poke(STACK_PAGE + i * WORD_SIZE, &word.to_ne_bytes());
        }

        let mut frame = SyscallFrame::new(STACK_PAGE);
        let flow = handle_syscall(&self.kernel, &self.process, &mut frame);

        (flow, frame.result)
    }

    /// Issues a syscall that must not terminate the process.
    pub fn syscall(&self, nr: usize, args: &[usize]) -> isize {
        let (flow, result) = self.trap(nr, args);
        assert_eq!(flow, Flow::Resume, "syscall unexpectedly fatal");

        result as isize
    }
}

/// One kernel instance with scripted collaborators.
pub struct TestBed {
    pub kernel: Arc<Kernel>,
    pub fs: Arc<RamFs>,
    pub console: Arc<TestConsole>,
    pub scheduler: Arc<TestScheduler>,
}

impl TestBed {
    pub fn new() -> Self {
        let fs = RamFs::new();
        let console = Arc::new(TestConsole::default());
        let scheduler = TestScheduler::new();

        let kernel = Kernel::new(
            fs.clone(),
            console.clone(),
            Arc::new(TestPower),
            scheduler.clone(),
        );
        scheduler.attach(kernel.clone());

        Self {
            kernel,
            fs,
            console,
            scheduler,
        }
    }

    /// Registers a program image `exec` can spawn.
    pub fn program<F>(&self, name: &str, body: F)
    where
        F: Fn(ProgramCtx) + Send + Sync + 'static,
    {
        self.scheduler.register_program(name, Arc::new(body));
    }

    /// The initial process (pid 1, no parent).
    pub fn init_proc(&self) -> UserProc {
        UserProc::new(self.kernel.clone(), Pid::new(INIT_PID), None)
    }
}
