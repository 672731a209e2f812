//! The system-wide name registry mapping queue names to queue objects.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use spin::RwLock;

use crate::attr::Attr;
use crate::message_queue::MessageQueue;

/// Maps queue names to their live `MessageQueue` object.
///
/// One instance lives for the lifetime of the kernel. Lookups are far more
/// common than inserts/removes (every `mq_open` of an already-existing
/// queue is a read), so this uses a reader/writer lock rather than the
/// plain spinlock the queue objects themselves use.
pub struct Registry {
    entries: RwLock<Vec<(String, Arc<MessageQueue>)>>,
}

impl Registry {
    pub const fn new() -> Self {
        Registry { entries: RwLock::new(Vec::new()) }
    }

    /// Canonicalize a caller-supplied queue name into the VFS path it's
    /// resolved under: names are opened relative to `/dev/mqueue/`.
    pub fn canonical_path(name: &str) -> String {
        let trimmed = name.trim_start_matches('/');
        let mut path = crate::MQUEUE_DIR.to_string();
        path.push_str(trimmed);
        path
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<MessageQueue>> {
        self.entries
            .read()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, q)| q.clone())
    }

    /// `mq_open(O_CREAT)` on a name with no existing entry: insert a fresh
    /// queue and return it. If another thread raced us and inserted first,
    /// discard the new object and hand back the winner's queue instead,
    /// keeping exactly one object per name.
    pub fn get_or_create(&self, name: &str, attr: Attr) -> Arc<MessageQueue> {
        let mut guard = self.entries.write();
        if let Some((_, existing)) = guard.iter().find(|(n, _)| n == name) {
            return existing.clone();
        }
        let queue = Arc::new(MessageQueue::new(name.to_string(), attr));
        guard.push((name.to_string(), queue.clone()));
        log::debug!("mq: registered new queue {:?}", name);
        queue
    }

    /// `mq_unlink`: remove the name from the registry so no new `mq_open`
    /// can find it. Existing open fds keep their `Arc<MessageQueue>` alive
    /// until they close it — the queue itself is marked unlinked by the
    /// caller via `MessageQueue::unlink`, independently of this removal.
    pub fn remove(&self, name: &str) -> Option<Arc<MessageQueue>> {
        let mut guard = self.entries.write();
        let pos = guard.iter().position(|(n, _)| n == name)?;
        let (_, queue) = guard.remove(pos);
        log::debug!("mq: unregistered queue {:?}", name);
        Some(queue)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.read().iter().any(|(n, _)| n == name)
    }

    /// Run `f` over a snapshot of every live queue. Used by the thread
    /// teardown hook to sweep a terminated thread's waiter node out of
    /// whichever queue it was blocked on, without holding the registry
    /// lock while each queue's own lock is taken.
    pub fn for_each(&self, mut f: impl FnMut(&Arc<MessageQueue>)) {
        let snapshot: Vec<_> = self.entries.read().iter().map(|(_, q)| q.clone()).collect();
        for queue in &snapshot {
            f(queue);
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attr::MqFlags;

    fn attr() -> Attr {
        Attr::new(MqFlags::empty(), Some(4), Some(64))
    }

    #[test]
    fn canonical_path_strips_leading_slash() {
        assert_eq!(Registry::canonical_path("/jobs"), "/dev/mqueue/jobs");
        assert_eq!(Registry::canonical_path("jobs"), "/dev/mqueue/jobs");
    }

    #[test]
    fn get_or_create_returns_same_object_on_repeat() {
        let reg = Registry::new();
        let a = reg.get_or_create("jobs", attr());
        let b = reg.get_or_create("jobs", attr());
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn remove_drops_name_but_not_the_object_others_hold() {
        let reg = Registry::new();
        let handle = reg.get_or_create("jobs", attr());
        assert!(reg.contains("jobs"));

        let removed = reg.remove("jobs").unwrap();
        assert!(Arc::ptr_eq(&removed, &handle));
        assert!(!reg.contains("jobs"));
        assert!(reg.lookup("jobs").is_none());

        // The caller's own handle is still valid until dropped.
        assert_eq!(handle.attr().max_msgs, 4);
    }

    #[test]
    fn lookup_on_unknown_name_is_none() {
        let reg = Registry::new();
        assert!(reg.lookup("nope").is_none());
    }

    #[test]
    fn for_each_visits_every_live_queue() {
        let reg = Registry::new();
        reg.get_or_create("a", attr());
        reg.get_or_create("b", attr());
        let mut seen = Vec::new();
        reg.for_each(|q| seen.push(q.name.clone()));
        seen.sort();
        assert_eq!(seen, alloc::vec!["a".to_string(), "b".to_string()]);
    }
}
