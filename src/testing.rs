//! Host test machine
//!
//! `std` implementations of every collaborator so syscalls can be driven
//! end-to-end from unit tests. Each simulated process runs on its own
//! thread; process termination unwinds that thread with a [`Terminated`]
//! payload.

use std::alloc::{GlobalAlloc, Layout, System};
use std::cell::Cell;
use std::collections::{HashMap, VecDeque};
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::thread::{self, JoinHandle, ThreadId};

use crate::drivers::console::{Console, CONSOLE_TERMINATOR};
use crate::drivers::power::Power;
use crate::fs::{FileHandle, FileLock, FileSystem};
use crate::mm::{UserAddr, UserFault, UserMemory};
use crate::process::{Pid, Process, ProcessControl};
use crate::syscall::{numbers, regions, AddressValidator, Syscalls};
use crate::trap::{syscall_trap, TrapFrame};

/// Unwind payload of a terminated process.
pub struct Terminated;

/// Unwind payload of `halt`.
pub struct PoweredOff;

/// Run `f`, reporting whether it ended by terminating the process.
pub fn terminates(f: impl FnOnce()) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(()) => false,
        Err(payload) if payload.is::<Terminated>() => true,
        Err(payload) => panic::resume_unwind(payload),
    }
}

thread_local! {
    static LARGEST_ALLOCATION: Cell<usize> = const { Cell::new(0) };
}

/// System allocator that remembers the largest block each thread asked for.
struct PeakAlloc;

impl PeakAlloc {
    fn note(size: usize) {
        let _ = LARGEST_ALLOCATION.try_with(|largest| largest.set(largest.get().max(size)));
    }
}

unsafe impl GlobalAlloc for PeakAlloc {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        Self::note(layout.size());
        unsafe { System.alloc(layout) }
    }

    unsafe fn alloc_zeroed(&self, layout: Layout) -> *mut u8 {
        Self::note(layout.size());
        unsafe { System.alloc_zeroed(layout) }
    }

    unsafe fn realloc(&self, ptr: *mut u8, layout: Layout, new_size: usize) -> *mut u8 {
        Self::note(new_size);
        unsafe { System.realloc(ptr, layout, new_size) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOCATOR: PeakAlloc = PeakAlloc;

/// Run `f` and return the largest single allocation it made on this thread.
pub fn largest_allocation(f: impl FnOnce()) -> usize {
    LARGEST_ALLOCATION.with(|largest| largest.set(0));
    f();
    LARGEST_ALLOCATION.with(Cell::get)
}

/// Contiguous user memory mapped at `base`.
pub struct FlatMemory {
    base: u32,
    bytes: Mutex<Vec<u8>>,
}

impl FlatMemory {
    pub fn new(base: u32, size: u32) -> Self {
        Self {
            base,
            bytes: Mutex::new(vec![0; size as usize]),
        }
    }

    fn range(&self, addr: UserAddr, len: usize) -> Result<Range<usize>, UserFault> {
        let start = addr
            .as_u32()
            .checked_sub(self.base)
            .ok_or(UserFault::at(addr))? as usize;
        let size = self.bytes.lock().unwrap().len();
        let end = start
            .checked_add(len)
            .filter(|&end| end <= size)
            .ok_or(UserFault::at(addr))?;
        Ok(start..end)
    }

    pub fn poke(&self, addr: u32, data: &[u8]) {
        self.write(UserAddr::new(addr), data).expect("poke outside mapped memory");
    }

    pub fn poke_words(&self, addr: u32, words: &[u32]) {
        let bytes: Vec<u8> = words.iter().flat_map(|w| w.to_le_bytes()).collect();
        self.poke(addr, &bytes);
    }

    pub fn peek(&self, addr: u32, len: usize) -> Vec<u8> {
        let mut buf = vec![0; len];
        self.read(UserAddr::new(addr), &mut buf).expect("peek outside mapped memory");
        buf
    }
}

impl UserMemory for FlatMemory {
    fn read(&self, addr: UserAddr, buf: &mut [u8]) -> Result<(), UserFault> {
        let range = self.range(addr, buf.len())?;
        buf.copy_from_slice(&self.bytes.lock().unwrap()[range]);
        Ok(())
    }

    fn write(&self, addr: UserAddr, data: &[u8]) -> Result<(), UserFault> {
        let range = self.range(addr, data.len())?;
        self.bytes.lock().unwrap()[range].copy_from_slice(data);
        Ok(())
    }
}

struct OpenFile {
    data: Arc<Mutex<Vec<u8>>>,
    pos: usize,
}

#[derive(Default)]
struct FsState {
    files: HashMap<String, Arc<Mutex<Vec<u8>>>>,
    open: HashMap<usize, OpenFile>,
    next_handle: usize,
}

/// In-memory filesystem. Writes go byte by byte with a yield in between and
/// are recorded in a global journal, so unserialized callers would show up as
/// interleaved journal entries.
#[derive(Default)]
pub struct MemFs {
    state: Mutex<FsState>,
    journal: Mutex<Vec<(FileHandle, u8)>>,
}

impl MemFs {
    pub fn contents(&self, name: &str) -> Option<Vec<u8>> {
        let state = self.state.lock().unwrap();
        let data = state.files.get(name)?;
        let bytes = data.lock().unwrap().clone();
        Some(bytes)
    }

    pub fn open_handles(&self) -> usize {
        self.state.lock().unwrap().open.len()
    }

    pub fn journal(&self) -> Vec<(FileHandle, u8)> {
        self.journal.lock().unwrap().clone()
    }

    fn with_open<R>(&self, file: FileHandle, f: impl FnOnce(&mut OpenFile) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        let open = state.open.get_mut(&file.as_raw()).expect("use of closed handle");
        f(open)
    }
}

impl FileSystem for MemFs {
    fn create(&self, name: &str, initial_size: u32) -> bool {
        let mut state = self.state.lock().unwrap();
        if name.is_empty() || state.files.contains_key(name) {
            return false;
        }
        let data = Arc::new(Mutex::new(vec![0; initial_size as usize]));
        state.files.insert(name.to_string(), data);
        true
    }

    fn remove(&self, name: &str) -> bool {
        self.state.lock().unwrap().files.remove(name).is_some()
    }

    fn open(&self, name: &str) -> Option<FileHandle> {
        let mut state = self.state.lock().unwrap();
        let data = Arc::clone(state.files.get(name)?);
        state.next_handle += 1;
        let raw = state.next_handle;
        state.open.insert(raw, OpenFile { data, pos: 0 });
        Some(FileHandle::from_raw(raw))
    }

    fn close(&self, file: FileHandle) {
        let closed = self.state.lock().unwrap().open.remove(&file.as_raw());
        assert!(closed.is_some(), "double close of {:?}", file);
    }

    fn read(&self, file: FileHandle, buf: &mut [u8]) -> usize {
        self.with_open(file, |open| {
            let data = open.data.lock().unwrap();
            let start = open.pos.min(data.len());
            let count = buf.len().min(data.len() - start);
            buf[..count].copy_from_slice(&data[start..start + count]);
            drop(data);
            open.pos += count;
            count
        })
    }

    fn write(&self, file: FileHandle, data: &[u8]) -> usize {
        for &byte in data {
            self.with_open(file, |open| {
                let mut contents = open.data.lock().unwrap();
                if open.pos >= contents.len() {
                    contents.resize(open.pos + 1, 0);
                }
                contents[open.pos] = byte;
                drop(contents);
                open.pos += 1;
            });
            self.journal.lock().unwrap().push((file, byte));
            thread::yield_now();
        }
        data.len()
    }

    fn seek(&self, file: FileHandle, position: u32) {
        self.with_open(file, |open| open.pos = position as usize);
    }

    fn tell(&self, file: FileHandle) -> u32 {
        self.with_open(file, |open| open.pos as u32)
    }

    fn length(&self, file: FileHandle) -> u32 {
        self.with_open(file, |open| open.data.lock().unwrap().len() as u32)
    }
}

/// Console with scripted input and captured output.
#[derive(Default)]
pub struct TestConsole {
    input: Mutex<VecDeque<u8>>,
    output: Mutex<Vec<u8>>,
    largest_put: AtomicUsize,
}

impl TestConsole {
    pub fn type_input(&self, bytes: &[u8]) {
        self.input.lock().unwrap().extend(bytes);
    }

    pub fn pending_input(&self) -> usize {
        self.input.lock().unwrap().len()
    }

    pub fn output(&self) -> String {
        String::from_utf8_lossy(&self.output.lock().unwrap()).into_owned()
    }

    /// Size of the biggest single `putbuf` so far.
    pub fn largest_put(&self) -> usize {
        self.largest_put.load(Ordering::SeqCst)
    }
}

impl Console for TestConsole {
    fn getc(&self) -> u8 {
        self.input.lock().unwrap().pop_front().unwrap_or(CONSOLE_TERMINATOR)
    }

    fn putbuf(&self, buf: &[u8]) {
        self.largest_put.fetch_max(buf.len(), Ordering::SeqCst);
        self.output.lock().unwrap().extend_from_slice(buf);
    }
}

pub struct TestPower;

impl Power for TestPower {
    fn power_off(&self) -> ! {
        panic::resume_unwind(Box::new(PoweredOff))
    }
}

/// Body of a user program; runs on the process's own thread.
pub type Program = Arc<dyn Fn(&Task) + Send + Sync>;

/// Process table backed by host threads.
pub struct Procs {
    machine: Weak<Machine>,
    records: Mutex<HashMap<Pid, Arc<Process>>>,
    threads: Mutex<HashMap<ThreadId, Arc<Process>>>,
    programs: Mutex<HashMap<String, Program>>,
    children: Mutex<Vec<JoinHandle<()>>>,
    next_pid: AtomicI32,
    yields: AtomicUsize,
}

impl Procs {
    fn new(machine: Weak<Machine>) -> Self {
        Self {
            machine,
            records: Mutex::new(HashMap::new()),
            threads: Mutex::new(HashMap::new()),
            programs: Mutex::new(HashMap::new()),
            children: Mutex::new(Vec::new()),
            next_pid: AtomicI32::new(1),
            yields: AtomicUsize::new(0),
        }
    }

    fn create(&self, name: &str, parent: Option<Pid>) -> Arc<Process> {
        let pid = Pid::new(self.next_pid.fetch_add(1, Ordering::SeqCst));
        let record = Arc::new(Process::new(pid, name, parent));
        self.records.lock().unwrap().insert(pid, Arc::clone(&record));
        record
    }

    fn attach(&self, record: Arc<Process>) {
        self.threads.lock().unwrap().insert(thread::current().id(), record);
    }

    fn try_current(&self) -> Option<Arc<Process>> {
        self.threads.lock().unwrap().get(&thread::current().id()).cloned()
    }

    /// Times a blocked process gave up the processor.
    pub fn yields(&self) -> usize {
        self.yields.load(Ordering::SeqCst)
    }
}

impl ProcessControl for Procs {
    fn spawn(&self, cmd_line: &str) -> Option<Pid> {
        let name = cmd_line.split_whitespace().next()?.to_string();
        let parent = self.try_current().map(|p| p.pid());
        let record = self.create(&name, parent);
        let pid = record.pid();
        let machine = self.machine.clone();

        let child = thread::spawn(move || {
            let machine = machine.upgrade().expect("machine dropped");
            machine.procs.attach(Arc::clone(&record));
            let program = machine.procs.programs.lock().unwrap().get(&name).cloned();
            let task = Task::new(Arc::clone(&machine), record);
            task.process.finish_load(program.is_some());

            let outcome = panic::catch_unwind(AssertUnwindSafe(|| match program {
                Some(program) => {
                    program(&task);
                    task.exit(0);
                }
                None => {
                    task.exit(-1);
                }
            }));
            if let Err(payload) = outcome {
                if !payload.is::<Terminated>() {
                    panic::resume_unwind(payload);
                }
            }
        });
        self.children.lock().unwrap().push(child);
        Some(pid)
    }

    fn lookup(&self, pid: Pid) -> Option<Arc<Process>> {
        self.records.lock().unwrap().get(&pid).cloned()
    }

    fn current(&self) -> Arc<Process> {
        self.try_current().expect("thread is not a process")
    }

    fn yield_now(&self) {
        self.yields.fetch_add(1, Ordering::SeqCst);
        thread::yield_now();
    }

    fn exit_current(&self) -> ! {
        self.threads.lock().unwrap().remove(&thread::current().id());
        panic::resume_unwind(Box::new(Terminated))
    }
}

/// Size of the user memory slice each process gets.
pub const PROCESS_PAGE: u32 = 0x2000;
pub const MAX_PROCESSES: u32 = 64;
/// Where argument data starts inside a process page.
const DATA_OFFSET: u32 = 0x40;

/// A whole simulated machine.
pub struct Machine {
    pub memory: FlatMemory,
    pub fs: MemFs,
    pub console: TestConsole,
    pub power: TestPower,
    pub procs: Procs,
    pub file_lock: FileLock,
}

impl Machine {
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            memory: FlatMemory::new(regions::USER_CODE_START, PROCESS_PAGE * MAX_PROCESSES),
            fs: MemFs::default(),
            console: TestConsole::default(),
            power: TestPower,
            procs: Procs::new(weak.clone()),
            file_lock: FileLock::new(),
        })
    }

    /// Make the calling thread a fresh top-level process.
    pub fn boot(self: &Arc<Self>, name: &str) -> Task {
        let record = self.procs.create(name, None);
        self.procs.attach(Arc::clone(&record));
        Task::new(Arc::clone(self), record)
    }

    /// Register a program that `exec` can load by name.
    pub fn install(&self, name: &str, program: impl Fn(&Task) + Send + Sync + 'static) {
        self.procs
            .programs
            .lock()
            .unwrap()
            .insert(name.to_string(), Arc::new(program));
    }

    pub fn syscalls(&self) -> Syscalls<'_> {
        Syscalls::new(
            AddressValidator::new(),
            &self.memory,
            &self.fs,
            &self.file_lock,
            &self.procs,
            &self.console,
            &self.power,
        )
    }

    /// Join every spawned process thread, re-raising test failures.
    pub fn join_children(&self) {
        let children: Vec<_> = self.procs.children.lock().unwrap().drain(..).collect();
        for child in children {
            if let Err(payload) = child.join() {
                panic::resume_unwind(payload);
            }
        }
    }
}

/// User-side view of one process: its page of memory and syscall stubs.
pub struct Task {
    pub machine: Arc<Machine>,
    pub process: Arc<Process>,
    page: u32,
    cursor: Cell<u32>,
}

impl Task {
    fn new(machine: Arc<Machine>, process: Arc<Process>) -> Self {
        let index = process.pid().as_i32() as u32;
        assert!(index < MAX_PROCESSES, "out of process pages");
        Self {
            machine,
            process,
            page: regions::USER_CODE_START + index * PROCESS_PAGE,
            cursor: Cell::new(DATA_OFFSET),
        }
    }

    pub fn pid(&self) -> i32 {
        self.process.pid().as_i32()
    }

    /// Stack pointer used for this process's traps.
    pub fn sp(&self) -> u32 {
        self.page
    }

    /// Reserve `len` bytes of this process's memory.
    pub fn alloc(&self, len: u32) -> u32 {
        let offset = self.cursor.get();
        assert!(offset + len <= PROCESS_PAGE, "process page exhausted");
        self.cursor.set(offset + len);
        self.page + offset
    }

    pub fn bytes(&self, data: &[u8]) -> u32 {
        let addr = self.alloc(data.len() as u32);
        self.machine.memory.poke(addr, data);
        addr
    }

    pub fn cstr(&self, s: &str) -> u32 {
        let addr = self.alloc(s.len() as u32 + 1);
        self.machine.memory.poke(addr, s.as_bytes());
        self.machine.memory.poke(addr + s.len() as u32, &[0]);
        addr
    }

    pub fn peek(&self, addr: u32, len: usize) -> Vec<u8> {
        self.machine.memory.peek(addr, len)
    }

    /// Take a trap with an arbitrary frame.
    pub fn trap(&self, frame: &mut TrapFrame) {
        let syscalls = self.machine.syscalls();
        syscall_trap(&syscalls, frame);
    }

    /// Push `number` and `args` on the user stack and trap.
    pub fn syscall(&self, number: u32, args: &[u32]) -> TrapFrame {
        let mut words = vec![number];
        words.extend_from_slice(args);
        assert!(words.len() as u32 * 4 <= DATA_OFFSET);
        self.machine.memory.poke_words(self.sp(), &words);
        let mut frame = TrapFrame::new(self.sp());
        self.trap(&mut frame);
        frame
    }

    fn call(&self, number: u32, args: &[u32]) -> i32 {
        self.syscall(number, args).return_value()
    }

    pub fn exit(&self, status: i32) -> ! {
        self.syscall(numbers::SYS_EXIT, &[status as u32]);
        unreachable!("exit returned")
    }

    pub fn exec(&self, cmd_line: &str) -> i32 {
        let cmd_line = self.cstr(cmd_line);
        self.call(numbers::SYS_EXEC, &[cmd_line])
    }

    pub fn wait(&self, pid: i32) -> i32 {
        self.call(numbers::SYS_WAIT, &[pid as u32])
    }

    pub fn create(&self, name: &str, size: u32) -> bool {
        let name = self.cstr(name);
        self.call(numbers::SYS_CREATE, &[name, size]) != 0
    }

    pub fn remove(&self, name: &str) -> bool {
        let name = self.cstr(name);
        self.call(numbers::SYS_REMOVE, &[name]) != 0
    }

    pub fn open(&self, name: &str) -> i32 {
        let name = self.cstr(name);
        self.call(numbers::SYS_OPEN, &[name])
    }

    pub fn filesize(&self, fd: i32) -> i32 {
        self.call(numbers::SYS_FILESIZE, &[fd as u32])
    }

    /// Read up to `len` bytes; returns the result and the bytes delivered.
    pub fn read(&self, fd: i32, len: u32) -> (i32, Vec<u8>) {
        let buf = self.alloc(len);
        let result = self.call(numbers::SYS_READ, &[fd as u32, buf, len]);
        let delivered = result.max(0) as usize;
        (result, self.peek(buf, delivered))
    }

    pub fn write(&self, fd: i32, data: &[u8]) -> i32 {
        let buf = self.bytes(data);
        self.call(numbers::SYS_WRITE, &[fd as u32, buf, data.len() as u32])
    }

    pub fn seek(&self, fd: i32, position: u32) {
        self.call(numbers::SYS_SEEK, &[fd as u32, position]);
    }

    pub fn tell(&self, fd: i32) -> u32 {
        self.syscall(numbers::SYS_TELL, &[fd as u32]).ret
    }

    pub fn close(&self, fd: i32) {
        self.call(numbers::SYS_CLOSE, &[fd as u32]);
    }

    /// Rewind the data allocator.
    pub fn reset_data(&self) {
        self.cursor.set(DATA_OFFSET);
    }
}
