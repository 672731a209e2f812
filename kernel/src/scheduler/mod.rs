//! Thread table and the `Blocker` binding `multios_ipc` suspends through
//!
//! A full scheduler (run queues, time quanta, priority-based preemption,
//! per-core affinity) is out of scope for this crate; what the IPC layer
//! actually needs is the narrow contract in [`multios_ipc::blocking::Blocker`].
//! This table tracks just enough per-thread state to satisfy it. The
//! `block` implementation below spins on the thread's own state rather
//! than performing a real context switch — wiring an arch-specific
//! context switch into `block` is the integration point a real scheduler
//! fills in; see the thread control block shape this mirrors.

use alloc::vec::Vec;
use core::sync::atomic::{AtomicUsize, Ordering};

use spin::Mutex;

use multios_ipc::{Blocker, ThreadId};

/// Scheduling state of a single thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadState {
    Ready,
    Running,
    Blocked,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerError {
    ThreadNotFound,
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;

struct ThreadControlBlock {
    state: ThreadState,
}

/// The thread table. One instance lives for the kernel's lifetime;
/// syscall dispatch consults it to know which thread is making the
/// current call and to suspend/resume it across blocking IPC operations.
pub struct ThreadTable {
    threads: Mutex<Vec<Option<ThreadControlBlock>>>,
    current: AtomicUsize,
}

impl ThreadTable {
    pub const fn new() -> Self {
        ThreadTable { threads: Mutex::new(Vec::new()), current: AtomicUsize::new(0) }
    }

    /// Register a new thread, Ready, and return its id.
    pub fn spawn(&self) -> ThreadId {
        let mut threads = self.threads.lock();
        threads.push(Some(ThreadControlBlock { state: ThreadState::Ready }));
        threads.len() - 1
    }

    /// Tell the table which thread is about to enter the syscall
    /// dispatcher. A real kernel derives this from the trap frame; tests
    /// and the dispatch shim here set it explicitly.
    pub fn set_current(&self, tid: ThreadId) {
        self.current.store(tid, Ordering::Release);
    }

    pub fn state_of(&self, tid: ThreadId) -> SchedulerResult<ThreadState> {
        self.threads
            .lock()
            .get(tid)
            .and_then(|t| t.as_ref())
            .map(|tcb| tcb.state)
            .ok_or(SchedulerError::ThreadNotFound)
    }

    pub fn terminate(&self, tid: ThreadId) -> SchedulerResult<()> {
        let mut threads = self.threads.lock();
        match threads.get_mut(tid).and_then(|t| t.as_mut()) {
            Some(tcb) => {
                tcb.state = ThreadState::Terminated;
                Ok(())
            }
            None => Err(SchedulerError::ThreadNotFound),
        }
    }
}

impl Default for ThreadTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-teardown hook: tear down `tid` and sweep its waiter node out of
/// every queue in `registry` it might be enrolled in. There is no
/// cancellation API that targets a single queue — a thread is enrolled in
/// at most one waiter list at a time, but the scheduler doesn't track
/// which, so this walks the whole registry rather than requiring every
/// call site to remember the queue a blocked thread was last seen on.
pub fn teardown_thread(table: &ThreadTable, registry: &multios_ipc::Registry, tid: ThreadId) {
    registry.for_each(|queue| {
        queue.cancel_wait(tid);
    });
    let _ = table.terminate(tid);
}

impl Blocker for ThreadTable {
    fn current(&self) -> ThreadId {
        self.current.load(Ordering::Acquire)
    }

    fn block(&self, tid: ThreadId) {
        {
            let mut threads = self.threads.lock();
            if let Some(Some(tcb)) = threads.get_mut(tid) {
                tcb.state = ThreadState::Blocked;
            }
        }
        loop {
            let woken = matches!(self.state_of(tid), Ok(ThreadState::Ready));
            if woken {
                break;
            }
            core::hint::spin_loop();
        }
        let mut threads = self.threads.lock();
        if let Some(Some(tcb)) = threads.get_mut(tid) {
            tcb.state = ThreadState::Running;
        }
    }

    fn wake(&self, tid: ThreadId) {
        let mut threads = self.threads.lock();
        if let Some(Some(tcb)) = threads.get_mut(tid) {
            if tcb.state == ThreadState::Blocked {
                tcb.state = ThreadState::Ready;
            }
        }
    }
}
