//! Property-based tests for the round-trip and ordering laws the core is
//! expected to satisfy (distinct-priority descending drain, equal-priority
//! FIFO, payload round-trip). Requires the `std` feature, since `proptest`
//! itself is a std-dependent crate: `cargo test --features std`.

use alloc::vec::Vec;

use proptest::prelude::*;

use crate::attr::{Attr, MqFlags};
use crate::blocking::{Blocker, ThreadId};
use crate::message_queue::MessageQueue;

/// A `Blocker` for these single-threaded property tests: every queue stays
/// within capacity and never actually suspends, so `block` is never called.
struct SingleThreadBlocker;

impl Blocker for SingleThreadBlocker {
    fn current(&self) -> ThreadId {
        1
    }
    fn block(&self, _tid: ThreadId) {
        unreachable!("property tests keep every queue within capacity");
    }
    fn wake(&self, _tid: ThreadId) {}
}

fn queue(max_msgs: u32, msg_size: u32) -> MessageQueue {
    MessageQueue::new("proptest".into(), Attr::new(MqFlags::empty(), Some(max_msgs), Some(msg_size)))
}

proptest! {
    /// `send(q, p, b)` followed by `receive(q, ·)` on an otherwise-empty
    /// queue yields byte-identical `b`.
    #[test]
    fn send_receive_roundtrip_preserves_payload(
        payload in prop::collection::vec(any::<u8>(), 0..64),
        priority in any::<u32>(),
    ) {
        let q = queue(4, 64);
        let b = SingleThreadBlocker;
        q.send(&b, &payload, priority).unwrap();

        let mut buf = [0u8; 64];
        let n = q.receive(&b, &mut buf, 0).unwrap();
        prop_assert_eq!(&buf[..n], payload.as_slice());
    }

    /// Messages sent with distinct priorities, in any order, drain in
    /// strictly descending priority order.
    #[test]
    fn distinct_priorities_drain_highest_first(
        priorities in prop::collection::hash_set(0u32..10_000, 1..8),
    ) {
        let items: Vec<u32> = priorities.into_iter().collect();
        let q = queue(items.len() as u32, 8);
        let b = SingleThreadBlocker;
        for (i, p) in items.iter().enumerate() {
            q.send(&b, &[i as u8], *p).unwrap();
        }

        let mut expected = items.clone();
        expected.sort_unstable_by(|a, bb| bb.cmp(a));

        let mut buf = [0u8; 8];
        for want_priority in expected {
            let n = q.receive(&b, &mut buf, 0).unwrap();
            prop_assert_eq!(n, 1);
            let sent_idx = buf[0] as usize;
            prop_assert_eq!(items[sent_idx], want_priority);
        }
    }

    /// Messages of equal priority drain in the order they were sent.
    #[test]
    fn equal_priority_messages_drain_fifo(count in 1usize..8) {
        let q = queue(count as u32, 8);
        let b = SingleThreadBlocker;
        for i in 0..count {
            q.send(&b, &[i as u8], 3).unwrap();
        }

        let mut buf = [0u8; 8];
        for expected in 0..count {
            let n = q.receive(&b, &mut buf, 0).unwrap();
            prop_assert_eq!(n, 1);
            prop_assert_eq!(buf[0] as usize, expected);
        }
    }
}
