//! Per-process file descriptor table for mqueue fds
//!
//! The rest of the virtual filesystem (mount points, inodes, real
//! on-disk filesystems) is out of scope here; `mq_open` only needs a VFS
//! path namespace and a table binding small integer fds to the queue
//! object they name, shaped the way `FileHandle` binds a path to an open
//! file elsewhere in this workspace.

use alloc::string::{String, ToString};
use alloc::sync::Arc;
use alloc::vec::Vec;

use bitflags::bitflags;
use spin::Mutex;

use multios_ipc::{Attr, MessageQueue, MqFlags, Registry};

bitflags! {
    /// `mq_open`'s flags word. Only `NON_BLOCKING` is interpreted by this
    /// subsystem; everything else passes through untouched. Queue creation
    /// itself is unconditional (spec §4.5: "look up or create the
    /// `MessageQueue` for `name`") — there is no `O_CREAT`/`O_EXCL` gate,
    /// matching the original source's `mq_open`, which never checks flags
    /// before its `hashmap_get` + create-if-missing.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct OpenFlags: u32 {
        const NON_BLOCKING = 0x800;
    }
}

impl OpenFlags {
    pub fn to_mq_flags(self) -> MqFlags {
        if self.contains(OpenFlags::NON_BLOCKING) {
            MqFlags::NON_BLOCKING
        } else {
            MqFlags::empty()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsError {
    InvalidPath,
    NotFound,
    UnsupportedOperation,
    TooManyOpenFiles,
}

pub type FsResult<T> = Result<T, FsError>;

/// Per-process table of open mqueue fds. One instance per process; the
/// embedding kernel is responsible for tearing it down (closing every
/// live fd) on process exit.
pub struct FdTable {
    entries: Mutex<Vec<Option<Arc<MessageQueue>>>>,
}

impl FdTable {
    pub const fn new() -> Self {
        FdTable { entries: Mutex::new(Vec::new()) }
    }

    /// `mq_open`: unconditionally look up or create the queue for `name`
    /// in `registry`, then bind the result to a fresh fd in this table.
    pub fn open(&self, registry: &Registry, name: &str, attr: Option<Attr>) -> FsResult<i32> {
        if name.is_empty() {
            return Err(FsError::InvalidPath);
        }

        let queue = registry.get_or_create(name, attr.unwrap_or_default());
        self.bind(queue)
    }

    fn bind(&self, queue: Arc<MessageQueue>) -> FsResult<i32> {
        let mut entries = self.entries.lock();
        if let Some(slot) = entries.iter().position(|e| e.is_none()) {
            entries[slot] = Some(queue);
            return Ok(slot as i32);
        }
        if entries.len() >= i32::MAX as usize {
            return Err(FsError::TooManyOpenFiles);
        }
        entries.push(Some(queue));
        Ok((entries.len() - 1) as i32)
    }

    pub fn get(&self, fd: i32) -> FsResult<Arc<MessageQueue>> {
        let entries = self.entries.lock();
        usize::try_from(fd)
            .ok()
            .and_then(|i| entries.get(i))
            .and_then(|e| e.clone())
            .ok_or(FsError::NotFound)
    }

    /// `mq_close`: drop this process's reference. The queue
    /// object itself stays alive as long as any other fd or the registry
    /// still holds it.
    pub fn close(&self, fd: i32) -> FsResult<()> {
        let mut entries = self.entries.lock();
        let slot = usize::try_from(fd).ok().and_then(|i| entries.get_mut(i)).ok_or(FsError::NotFound)?;
        if slot.take().is_none() {
            return Err(FsError::NotFound);
        }
        Ok(())
    }
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

/// `mq_unlink`: drop `name` from the registry and mark the queue
/// object itself unlinked so lingering fds get `Shutdown`.
pub fn unlink<B: multios_ipc::Blocker>(registry: &Registry, blocker: &B, name: &str) -> FsResult<()> {
    let queue = registry.remove(name).ok_or(FsError::NotFound)?;
    queue.unlink(blocker);
    Ok(())
}

/// Canonicalize a raw `mq_open` name argument into its VFS path, for
/// logging and for any VFS-facing caller that wants the fuller path
/// rather than the bare name the registry keys on.
pub fn canonical_path(name: &str) -> String {
    Registry::canonical_path(name)
}
