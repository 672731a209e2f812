//! The queue object and the priority-ordered send/receive algorithm.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicBool, Ordering};

use spin::Mutex;

use crate::attr::Attr;
use crate::blocking::{wait_until_with_setup, Blocker, ThreadId};
use crate::{MqError, MqResult};

/// A single queued message. Owned by the queue from enqueue to dequeue;
/// `receive` frees it by dropping it after copying out its payload.
#[derive(Debug, Clone)]
pub struct Msg {
    pub payload: Vec<u8>,
    pub len: usize,
    pub priority: u32,
}

/// A thread waiting in a queue's `senders` or `receivers` list.
///
/// Senders and receivers have identical shape, so this crate keeps them as
/// one `Waiter` type used in both roles; the only difference is which list
/// a node lives in and what its `priority` field means (a message priority
/// to send vs. an ordering priority for waiting receivers). Enrollment is
/// represented implicitly: membership in the `Vec` *is* the enrollment
/// flag, an owned, ownership-clean container in place of an intrusive
/// linked list.
#[derive(Debug, Clone)]
pub struct Waiter {
    pub thread: ThreadId,
    pub priority: u32,
    /// Only populated for receivers: the slot a blocked sender's direct
    /// handoff (the fast path in `send`) deposits its message into. `None`
    /// for sender waiters, which never receive a handed-off message.
    handoff: Option<Arc<Mutex<Option<Msg>>>>,
}

impl Waiter {
    fn sender(thread: ThreadId, priority: u32) -> Self {
        Waiter { thread, priority, handoff: None }
    }

    fn receiver(thread: ThreadId, priority: u32, handoff: Arc<Mutex<Option<Msg>>>) -> Self {
        Waiter { thread, priority, handoff: Some(handoff) }
    }
}

/// Insert `item` into `list`, keeping it sorted by strictly decreasing
/// priority with FIFO order preserved among equal priorities. The same
/// algorithm is used for `messages`, `senders` and `receivers` alike.
fn priority_insert<T>(list: &mut Vec<T>, item: T, priority_of: impl Fn(&T) -> u32) {
    let p = priority_of(&item);
    let pos = list.iter().position(|existing| priority_of(existing) < p).unwrap_or(list.len());
    list.insert(pos, item);
}

/// The mutable state guarded by the queue's single coarse-grained lock.
struct Inner {
    attr: Attr,
    messages: Vec<Msg>,
    senders: Vec<Waiter>,
    receivers: Vec<Waiter>,
}

impl Inner {
    #[cfg(debug_assertions)]
    fn check_invariants(&self) {
        debug_assert_eq!(
            self.messages.len() as u32,
            self.attr.cur_msgs,
            "cur_msgs must track the live message count"
        );
        debug_assert!(
            self.attr.cur_msgs <= self.attr.max_msgs,
            "cur_msgs must never exceed max_msgs"
        );
        if !self.receivers.is_empty() {
            debug_assert!(
                self.messages.is_empty(),
                "a waiting receiver means every arriving message is handed off directly"
            );
        }
        if !self.senders.is_empty() {
            debug_assert_eq!(
                self.attr.cur_msgs, self.attr.max_msgs,
                "senders only block when the queue is full"
            );
        }
        for m in &self.messages {
            debug_assert!(m.len as u32 <= self.attr.msg_size, "message exceeds msg_size");
        }
    }

    #[cfg(not(debug_assertions))]
    fn check_invariants(&self) {}
}

/// A named, persistent, kernel-resident mailbox.
pub struct MessageQueue {
    pub name: String,
    inner: Mutex<Inner>,
    /// Set once the owning name is removed from the registry; checked by
    /// `send`/`receive` on their way out so an in-flight operation still
    /// completes but reports `MqError::Shutdown`.
    unlinked: AtomicBool,
}

impl MessageQueue {
    pub fn new(name: String, attr: Attr) -> Self {
        MessageQueue {
            name,
            inner: Mutex::new(Inner {
                attr,
                messages: Vec::new(),
                senders: Vec::new(),
                receivers: Vec::new(),
            }),
            unlinked: AtomicBool::new(false),
        }
    }

    /// A consistent snapshot of the queue's attributes, including the
    /// live `cur_msgs` count.
    pub fn attr(&self) -> Attr {
        self.inner.lock().attr
    }

    /// Reopening an existing queue with caller-supplied attributes that
    /// don't match its capacity shape is a programming error, not a
    /// runtime condition — callers should treat a `false` return as
    /// grounds to abort rather than silently proceed.
    pub fn check_attr_compat(&self, requested: &Attr) -> bool {
        self.inner.lock().attr.is_congruent_with(requested)
    }

    pub fn is_unlinked(&self) -> bool {
        self.unlinked.load(Ordering::Acquire)
    }

    /// `unlink`: drain every list, waking every waiter into READY so each
    /// one observes the shutdown indicator, then mark the queue unlinked
    /// so any fd still holding a reference gets `Shutdown` from further
    /// ops.
    pub fn unlink<B: Blocker>(&self, blocker: &B) {
        let (senders, receivers) = {
            let mut guard = self.inner.lock();
            guard.messages.clear();
            guard.attr.cur_msgs = 0;
            let senders = core::mem::take(&mut guard.senders);
            let receivers = core::mem::take(&mut guard.receivers);
            (senders, receivers)
        };
        self.unlinked.store(true, Ordering::Release);
        for s in senders {
            blocker.wake(s.thread);
        }
        for r in receivers {
            blocker.wake(r.thread);
        }
        log::debug!("mq: unlinked queue, woke all waiters");
    }

    /// Thread-teardown hook: remove `tid`'s waiter node from whichever
    /// list it's enrolled in, if any, so a thread that is
    /// destroyed while blocked doesn't leave a dangling entry behind for
    /// a later `send`/`receive` to trip over. Returns whether a node was
    /// actually removed. Does not itself wake `tid` — the caller is
    /// already tearing that thread down and does not need it READY.
    pub fn cancel_wait(&self, tid: ThreadId) -> bool {
        let mut guard = self.inner.lock();
        let before = guard.senders.len() + guard.receivers.len();
        guard.senders.retain(|s| s.thread != tid);
        guard.receivers.retain(|r| r.thread != tid);
        let removed = before != guard.senders.len() + guard.receivers.len();
        guard.check_invariants();
        removed
    }

    /// Send a message, handling the full-queue and direct-handoff cases.
    pub fn send<B: Blocker>(&self, blocker: &B, buf: &[u8], priority: u32) -> MqResult<()> {
        let tid = blocker.current();

        let (msg_size, is_full, non_blocking) = {
            let guard = self.inner.lock();
            (
                guard.attr.msg_size,
                guard.attr.cur_msgs == guard.attr.max_msgs,
                guard.attr.is_non_blocking(),
            )
        };

        if buf.len() as u32 > msg_size {
            return Err(MqError::MsgTooLarge);
        }

        if is_full {
            if non_blocking {
                return Err(MqError::WouldBlock);
            }
            wait_until_with_setup(
                &self.inner,
                blocker,
                |inner, tid| {
                    priority_insert(&mut inner.senders, Waiter::sender(tid, priority), |w| w.priority);
                    inner.check_invariants();
                },
                |inner| {
                    inner.attr.cur_msgs < inner.attr.max_msgs
                        && !inner.senders.iter().any(|s| s.thread == tid)
                },
                |inner| {
                    inner.senders.retain(|s| s.thread != tid);
                },
            );
        }

        let mut guard = self.inner.lock();
        debug_assert!(guard.attr.cur_msgs < guard.attr.max_msgs);

        // Fast-path handoff: a non-empty `receivers` list implies
        // `messages` is empty, so handing the message straight to the
        // highest-priority receiver and never touching `messages`/`cur_msgs`
        // is the only way to keep that true when more than one receiver is
        // waiting.
        if !guard.receivers.is_empty() {
            let receiver = guard.receivers.remove(0);
            guard.check_invariants();
            drop(guard);

            let msg = Msg { payload: buf.to_vec(), len: buf.len(), priority };
            if let Some(slot) = &receiver.handoff {
                *slot.lock() = Some(msg);
            }
            blocker.wake(receiver.thread);
        } else {
            let msg = Msg { payload: buf.to_vec(), len: buf.len(), priority };
            priority_insert(&mut guard.messages, msg, |m| m.priority);
            guard.attr.cur_msgs += 1;
            guard.check_invariants();
            drop(guard);
        }

        log::debug!("mq: send completed on {:?} (priority {})", self.name.as_bytes(), priority);

        if self.is_unlinked() {
            Err(MqError::Shutdown)
        } else {
            Ok(())
        }
    }

    /// Receive a message, handling the empty-queue and sender-promotion cases.
    pub fn receive<B: Blocker>(&self, blocker: &B, buf: &mut [u8], priority: u32) -> MqResult<usize> {
        let tid = blocker.current();

        // Full-queue sender promotion: pop and wake one blocked
        // sender before this call consumes the message that's about to
        // free up a slot, so the sender can refill it without starving.
        let promoted = {
            let mut guard = self.inner.lock();
            if guard.attr.cur_msgs == guard.attr.max_msgs && !guard.senders.is_empty() {
                Some(guard.senders.remove(0).thread)
            } else {
                None
            }
        };
        if let Some(sender_tid) = promoted {
            blocker.wake(sender_tid);
        }

        let (empty, non_blocking) = {
            let guard = self.inner.lock();
            (guard.attr.cur_msgs == 0, guard.attr.is_non_blocking())
        };

        let mut handoff_slot = None;
        if empty {
            if non_blocking {
                return Err(MqError::WouldBlock);
            }
            let slot: Arc<Mutex<Option<Msg>>> = Arc::new(Mutex::new(None));
            handoff_slot = Some(slot.clone());
            wait_until_with_setup(
                &self.inner,
                blocker,
                move |inner, tid| {
                    priority_insert(&mut inner.receivers, Waiter::receiver(tid, priority, slot), |w| w.priority);
                    inner.check_invariants();
                },
                // A waiting receiver is only ever woken by a direct handoff:
                // as long as it stays enrolled, `receivers` is
                // non-empty, which forces every concurrent `send` onto the
                // fast path rather than the normal enqueue. So "no longer
                // enrolled" is exactly the wake condition.
                move |inner| !inner.receivers.iter().any(|r| r.thread == tid),
                |inner| {
                    inner.receivers.retain(|r| r.thread != tid);
                },
            );
        }

        let n = if let Some(slot) = handoff_slot.take().and_then(|s| s.lock().take()) {
            let n = core::cmp::min(slot.len, buf.len());
            buf[..n].copy_from_slice(&slot.payload[..n]);
            n
        } else {
            let mut guard = self.inner.lock();
            debug_assert!(guard.attr.cur_msgs > 0);
            let msg = guard.messages.remove(0);
            guard.attr.cur_msgs -= 1;
            guard.check_invariants();
            drop(guard);
            let n = core::cmp::min(msg.len, buf.len());
            buf[..n].copy_from_slice(&msg.payload[..n]);
            n
        };

        log::debug!("mq: receive completed on {:?} ({} bytes)", self.name.as_bytes(), n);

        if self.is_unlinked() {
            Err(MqError::Shutdown)
        } else {
            Ok(n)
        }
    }
}
