//! Syscall adapters for the message-queue subsystem.
//!
//! Translates raw syscall arguments (user pointers and plain integers) into
//! calls on [`multios_ipc`], routing through the fd table for the
//! descriptor and [`crate::memory`] for every user/kernel buffer crossing.
//! Everything else in the real MultiOS syscall range (`sys_read`,
//! `sys_poll`, ...) lives elsewhere in the kernel; only the five numbers
//! this subsystem owns are defined here.

use alloc::string::String;
use alloc::vec::Vec;

use multios_ipc::{Attr, MessageQueue, MqError, MqFlags, Registry};

use crate::filesystem::{FdTable, FsError, OpenFlags};
use crate::memory::{self, MmError};
use crate::scheduler::ThreadTable;

pub mod syscall_numbers {
    //! Numbered dispatch slots. `poll` is the closest-numbered real
    //! syscall at 168; the `mq_*` block starts at 277 with no numbers
    //! claimed in between.
    pub const POLL: u32 = 168;
    pub const MQ_OPEN: u32 = 277;
    pub const MQ_CLOSE: u32 = MQ_OPEN + 1;
    pub const MQ_UNLINK: u32 = MQ_OPEN + 2;
    pub const MQ_SEND: u32 = MQ_OPEN + 3;
    pub const MQ_RECEIVE: u32 = MQ_OPEN + 4;
}

/// The wire form of `Attr`: `flags, max_msgs, msg_size, cur_msgs`, in
/// that order, as the caller lays it out across the syscall boundary.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct RawAttr {
    pub flags: i32,
    pub max_msgs: i32,
    pub msg_size: i32,
    pub cur_msgs: i32,
}

impl From<RawAttr> for Attr {
    fn from(raw: RawAttr) -> Self {
        Attr::new(
            MqFlags::from_bits_truncate(raw.flags),
            Some(raw.max_msgs.max(0) as u32),
            Some(raw.msg_size.max(0) as u32),
        )
    }
}

impl From<Attr> for RawAttr {
    fn from(attr: Attr) -> Self {
        RawAttr {
            flags: attr.flags.bits(),
            max_msgs: attr.max_msgs as i32,
            msg_size: attr.msg_size as i32,
            cur_msgs: attr.cur_msgs as i32,
        }
    }
}

/// Everything a syscall handler needs, bundled instead of reached through
/// kernel globals: pass an explicit context for the current thread,
/// process-local fd table, and registry rather than reaching for statics.
pub struct KernelContext<'a> {
    pub registry: &'a Registry,
    pub fds: &'a FdTable,
    pub threads: &'a ThreadTable,
}

fn errno_of_fs(err: FsError) -> isize {
    match err {
        FsError::NotFound | FsError::InvalidPath => MqError::Invalid.to_errno() as isize,
        FsError::TooManyOpenFiles => MqError::Invalid.to_errno() as isize,
        FsError::UnsupportedOperation => MqError::Invalid.to_errno() as isize,
    }
}

fn errno_of_mm(err: MmError) -> isize {
    match err {
        MmError::InvalidAddress | MmError::OutOfRange => MqError::Invalid.to_errno() as isize,
    }
}

/// Read a user-supplied name buffer into an owned `String`. There's no
/// on-wire length field for `name*`, so the adapter layer (unlike the
/// core, which only ever sees an already-owned `&str`) takes the caller's
/// length explicitly rather than assuming a C-style NUL terminator.
fn read_user_name(ptr: usize, len: usize) -> Result<String, isize> {
    let bytes: Vec<u8> = unsafe { memory::copy_from_user(ptr, len) }.map_err(errno_of_mm)?;
    String::from_utf8(bytes).map_err(|_| MqError::Invalid.to_errno() as isize)
}

/// `mq_open` (slot 277): `name*, name_len, flags, attr*?` -> fd or negative errno.
///
/// `attr_ptr == 0` means "no attributes supplied" (reopen of an existing
/// queue, or accept the compiled-in defaults for a new one).
pub fn sys_mq_open(
    ctx: &KernelContext,
    name_ptr: usize,
    name_len: usize,
    flags: u32,
    attr_ptr: usize,
) -> isize {
    let name = match read_user_name(name_ptr, name_len) {
        Ok(n) => n,
        Err(errno) => return errno,
    };

    let open_flags = OpenFlags::from_bits_truncate(flags);
    let requested_attr = if attr_ptr == 0 {
        None
    } else {
        match unsafe { memory::copy_from_user(attr_ptr, core::mem::size_of::<RawAttr>()) } {
            Ok(bytes) => Some(Attr::from(raw_attr_from_bytes(&bytes))),
            Err(e) => return errno_of_mm(e),
        }
    };

    let existing = ctx.registry.lookup(&name);
    if let (Some(queue), Some(attr)) = (&existing, &requested_attr) {
        // Reopening an existing queue with incompatible capacity is a
        // programming error, not a runtime condition — abort rather than
        // silently accepting mismatched attributes.
        if !queue.check_attr_compat(attr) {
            panic!("mq_open: incompatible attr on reopen of an existing queue");
        }
    }

    // The oflag argument seeds the queue's own flags (including
    // non-blocking) at creation time, independent of whether the caller
    // also supplied capacity via `attr`.
    let attr_for_create = Attr::new(
        open_flags.to_mq_flags(),
        requested_attr.map(|a| a.max_msgs),
        requested_attr.map(|a| a.msg_size),
    );
    match ctx.fds.open(ctx.registry, &name, Some(attr_for_create)) {
        Ok(fd) => {
            log::info!("mq_open({:?}) -> fd {}", name, fd);
            fd as isize
        }
        Err(e) => errno_of_fs(e),
    }
}

fn raw_attr_from_bytes(bytes: &[u8]) -> RawAttr {
    let mut buf = [0u8; core::mem::size_of::<RawAttr>()];
    let n = core::cmp::min(buf.len(), bytes.len());
    buf[..n].copy_from_slice(&bytes[..n]);
    // SAFETY: `RawAttr` is `repr(C)` of four `i32`s with no padding and no
    // invalid bit patterns, and `buf` is exactly its size.
    unsafe { core::mem::transmute(buf) }
}

/// `mq_close` (slot 278): `fd` -> 0 or negative errno.
pub fn sys_mq_close(ctx: &KernelContext, fd: i32) -> isize {
    match ctx.fds.close(fd) {
        Ok(()) => 0,
        Err(e) => errno_of_fs(e),
    }
}

/// `mq_unlink` (slot 279): `name*, name_len` -> 0 or negative errno.
pub fn sys_mq_unlink(ctx: &KernelContext, name_ptr: usize, name_len: usize) -> isize {
    let name = match read_user_name(name_ptr, name_len) {
        Ok(n) => n,
        Err(errno) => return errno,
    };
    match crate::filesystem::unlink(ctx.registry, ctx.threads, &name) {
        Ok(()) => 0,
        Err(e) => errno_of_fs(e),
    }
}

/// `mq_send`'s fd resolution: an fd that doesn't name a queue is `BADF`.
fn resolve(ctx: &KernelContext, fd: i32) -> Result<alloc::sync::Arc<MessageQueue>, isize> {
    ctx.fds.get(fd).map_err(|_| MqError::BadFd.to_errno() as isize)
}

/// `mq_receive`'s fd resolution: asymmetric with `send` by spec (§4.4,
/// §7) — an fd that doesn't name a queue is `INVAL`, not `BADF`.
fn resolve_for_receive(ctx: &KernelContext, fd: i32) -> Result<alloc::sync::Arc<MessageQueue>, isize> {
    ctx.fds.get(fd).map_err(|_| MqError::Invalid.to_errno() as isize)
}

/// `mq_send` (slot 280): `fd, buf*, priority, len` -> 0 or negative errno.
pub fn sys_mq_send(ctx: &KernelContext, fd: i32, buf_ptr: usize, priority: u32, len: usize) -> isize {
    let queue = match resolve(ctx, fd) {
        Ok(q) => q,
        Err(errno) => return errno,
    };
    let payload = match unsafe { memory::copy_from_user(buf_ptr, len) } {
        Ok(b) => b,
        Err(e) => return errno_of_mm(e),
    };
    match queue.send(ctx.threads, &payload, priority) {
        Ok(()) => 0,
        Err(e) => e.to_errno() as isize,
    }
}

/// `mq_receive` (slot 281): `fd, buf*, priority, cap` -> bytes copied or
/// negative errno. `priority` is the caller-supplied receiver ordering
/// value, not an output.
pub fn sys_mq_receive(ctx: &KernelContext, fd: i32, buf_ptr: usize, priority: u32, cap: usize) -> isize {
    let queue = match resolve_for_receive(ctx, fd) {
        Ok(q) => q,
        Err(errno) => return errno,
    };
    if (cap as u32) < queue.attr().msg_size {
        return MqError::Invalid.to_errno() as isize;
    }

    let mut kernel_buf = alloc::vec![0u8; cap];
    let n = match queue.receive(ctx.threads, &mut kernel_buf, priority) {
        Ok(n) => n,
        Err(MqError::Shutdown) => return MqError::Shutdown.to_errno() as isize,
        Err(e) => return e.to_errno() as isize,
    };
    match unsafe { memory::copy_to_user(buf_ptr, &kernel_buf[..n]) } {
        Ok(()) => n as isize,
        Err(e) => errno_of_mm(e),
    }
}

/// Route a raw syscall number to its handler. Returns `None` for numbers
/// outside this subsystem's slots — the embedding kernel's own dispatcher
/// owns everything else in the table.
pub fn dispatch(
    ctx: &KernelContext,
    syscall_num: u32,
    a0: usize,
    a1: usize,
    a2: usize,
    a3: usize,
) -> Option<isize> {
    use syscall_numbers::*;
    Some(match syscall_num {
        MQ_OPEN => sys_mq_open(ctx, a0, a1, a2 as u32, a3),
        MQ_CLOSE => sys_mq_close(ctx, a0 as i32),
        MQ_UNLINK => sys_mq_unlink(ctx, a0, a1),
        MQ_SEND => sys_mq_send(ctx, a0 as i32, a1, a2 as u32, a3),
        MQ_RECEIVE => sys_mq_receive(ctx, a0 as i32, a1, a2 as u32, a3),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filesystem::FdTable;
    use crate::scheduler::ThreadTable;

    /// A user buffer backed by a real heap allocation so the `unsafe`
    /// copy primitives have somewhere legitimate to read/write — these
    /// tests stand in for the "user address space" a real process would
    /// provide.
    struct UserBuf(Vec<u8>);
    impl UserBuf {
        fn new(bytes: &[u8]) -> Self {
            UserBuf(bytes.to_vec())
        }
        fn zeroed(len: usize) -> Self {
            UserBuf(alloc::vec![0u8; len])
        }
        fn addr(&self) -> usize {
            self.0.as_ptr() as usize
        }
        fn addr_mut(&mut self) -> usize {
            self.0.as_mut_ptr() as usize
        }
    }

    fn ctx<'a>(registry: &'a Registry, fds: &'a FdTable, threads: &'a ThreadTable) -> KernelContext<'a> {
        KernelContext { registry, fds, threads }
    }

    #[test]
    fn open_send_receive_via_syscall_adapters() {
        let registry = Registry::new();
        let fds = FdTable::new();
        let threads = ThreadTable::new();
        let c = ctx(&registry, &fds, &threads);

        let name = UserBuf::new(b"ping");
        let fd = sys_mq_open(&c, name.addr(), 4, OpenFlags::empty().bits(), 0);
        assert!(fd >= 0);

        let msg = UserBuf::new(b"hello");
        let rc = sys_mq_send(&c, fd as i32, msg.addr(), 0, 5);
        assert_eq!(rc, 0);

        let mut out = UserBuf::zeroed(multios_ipc::DEFAULT_MSG_SIZE as usize);
        let n = sys_mq_receive(&c, fd as i32, out.addr_mut(), 0, multios_ipc::DEFAULT_MSG_SIZE as usize);
        assert_eq!(n, 5);
        assert_eq!(&out.0[..5], b"hello");
    }

    #[test]
    fn send_on_bad_fd_returns_badf_errno() {
        let registry = Registry::new();
        let fds = FdTable::new();
        let threads = ThreadTable::new();
        let c = ctx(&registry, &fds, &threads);

        let msg = UserBuf::new(b"x");
        assert_eq!(sys_mq_send(&c, 99, msg.addr(), 0, 1), MqError::BadFd.to_errno() as isize);
    }

    #[test]
    fn receive_on_bad_fd_returns_invalid_errno() {
        let registry = Registry::new();
        let fds = FdTable::new();
        let threads = ThreadTable::new();
        let c = ctx(&registry, &fds, &threads);

        let mut out = UserBuf::zeroed(8);
        let rc = sys_mq_receive(&c, 99, out.addr_mut(), 0, 8);
        assert_eq!(rc, MqError::Invalid.to_errno() as isize);
    }

    #[test]
    fn receive_with_undersized_capacity_returns_invalid() {
        let registry = Registry::new();
        let fds = FdTable::new();
        let threads = ThreadTable::new();
        let c = ctx(&registry, &fds, &threads);

        let name = UserBuf::new(b"q");
        let fd = sys_mq_open(&c, name.addr(), 1, OpenFlags::empty().bits(), 0);
        let mut out = UserBuf::zeroed(4);
        let rc = sys_mq_receive(&c, fd as i32, out.addr_mut(), 0, 4);
        assert_eq!(rc, MqError::Invalid.to_errno() as isize);
    }

    #[test]
    fn unlink_then_reopen_creates_a_fresh_queue() {
        let registry = Registry::new();
        let fds = FdTable::new();
        let threads = ThreadTable::new();
        let c = ctx(&registry, &fds, &threads);

        let name = UserBuf::new(b"doomed");
        let fd = sys_mq_open(&c, name.addr(), 6, OpenFlags::empty().bits(), 0);
        let msg = UserBuf::new(b"x");
        assert_eq!(sys_mq_send(&c, fd as i32, msg.addr(), 0, 1), 0);

        assert_eq!(sys_mq_unlink(&c, name.addr(), 6), 0);

        let fd2 = sys_mq_open(&c, name.addr(), 6, OpenFlags::NON_BLOCKING.bits(), 0);
        assert_ne!(fd, fd2);
        // The fresh queue is empty; non-blocking keeps this from suspending
        // forever with no second thread around to wake it.
        let mut out = UserBuf::zeroed(multios_ipc::DEFAULT_MSG_SIZE as usize);
        let rc = sys_mq_receive(&c, fd2 as i32, out.addr_mut(), 0, multios_ipc::DEFAULT_MSG_SIZE as usize);
        assert_eq!(rc, MqError::WouldBlock.to_errno() as isize);
    }

    #[test]
    fn dispatch_routes_mq_numbers_and_ignores_others() {
        let registry = Registry::new();
        let fds = FdTable::new();
        let threads = ThreadTable::new();
        let c = ctx(&registry, &fds, &threads);

        assert!(dispatch(&c, syscall_numbers::POLL, 0, 0, 0, 0).is_none());

        let name = UserBuf::new(b"q");
        let fd = dispatch(&c, syscall_numbers::MQ_OPEN, name.addr(), 1, OpenFlags::empty().bits() as usize, 0)
            .unwrap();
        assert!(fd >= 0);
    }
}
