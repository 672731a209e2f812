//! The blocking engine used by `send`/`receive` to suspend a caller until
//! a predicate over queue state becomes true.
//!
//! The core never talks to a scheduler directly. It only needs three
//! primitives — "who is the current thread", "block the current thread
//! until woken", "wake a specific thread" — so those are captured in the
//! [`Blocker`] trait and injected by whatever kernel embeds this crate.
//! This is a condition-variable-shaped primitive paired with the queue's
//! own lock: enrollment happens while holding the lock, the lock is
//! dropped across the suspension point, and the predicate is re-tested
//! under the lock on wake.

use spin::Mutex;

/// Opaque thread identifier. The core never inspects this beyond passing
/// it back to the `Blocker` that handed it out.
pub type ThreadId = usize;

/// The narrow scheduler surface the message-queue core depends on.
///
/// Implementations must guarantee that a `wake(tid)` which lands after
/// `current()` returned `tid` but before that thread's matching `block(tid)`
/// call is not lost — i.e. the upcoming `block` call must return
/// immediately rather than suspend. This is the same guarantee a
/// textbook condvar gives when wait() is called with the mutex held: here
/// the queue's own lock stands in for the mutex, and `wait_until_with_setup`
/// below is the `wait()` call.
pub trait Blocker {
    /// The thread id of the caller of the current syscall.
    fn current(&self) -> ThreadId;
    /// Mark `tid` BLOCKED and yield the CPU; returns once `tid` has been
    /// woken. Must be a no-op (return immediately) if `tid` was already
    /// woken since its last enrollment.
    fn block(&self, tid: ThreadId);
    /// Transition `tid` from BLOCKED to READY.
    fn wake(&self, tid: ThreadId);
}

/// Atomically enroll, block, and re-check a predicate against state
/// guarded by `lock`, exactly once running `setup` and exactly once
/// running `teardown`.
///
/// `setup` enrolls the caller (e.g. pushes a `Sender`/`Receiver` node)
/// while the lock is held. `predicate` is then re-evaluated under the
/// same lock acquisition before any suspension happens, so a queue that
/// is already satisfiable never blocks. If it isn't, the lock is dropped
/// and the caller suspends via `blocker.block`; on every wake the lock is
/// re-acquired and the predicate re-checked. `teardown` runs exactly once,
/// under the lock, once the predicate finally holds — callers use it to
/// remove their own enrolled node if a wake from elsewhere didn't already
/// do so (e.g. thread teardown during cancellation).
pub fn wait_until_with_setup<T, B, S, P, D>(
    lock: &Mutex<T>,
    blocker: &B,
    setup: S,
    mut predicate: P,
    teardown: D,
) where
    B: Blocker,
    S: FnOnce(&mut T, ThreadId),
    P: FnMut(&T) -> bool,
    D: FnOnce(&mut T),
{
    let tid = blocker.current();
    let mut setup = Some(setup);

    loop {
        let ready = {
            let mut guard = lock.lock();
            if let Some(setup_fn) = setup.take() {
                setup_fn(&mut guard, tid);
            }
            predicate(&guard)
        };
        if ready {
            break;
        }
        blocker.block(tid);
    }

    let mut guard = lock.lock();
    teardown(&mut guard);
}
