//! MultiOS POSIX-style Message Queue IPC
//!
//! This crate implements the message-queue core of MultiOS's IPC layer:
//! a name registry mapping queue names to queue objects, the queue object
//! itself (messages plus waiting senders/receivers, all priority-ordered),
//! and a blocking engine that enrolls the calling thread into a waiter
//! list and hands off to whatever scheduler the embedding kernel provides.
//!
//! The scheduler, VFS and memory manager are deliberately *not*
//! dependencies of this crate. It only needs the narrow slice of each that
//! [`blocking::Blocker`] describes; the embedding kernel supplies the rest.

#![no_std]

// `proptest`'s macros expand to code that names `std` directly; a
// `#![no_std]` crate has no `std` in its extern prelude to resolve that
// against unless it's bound explicitly, so this is gated behind the `std`
// feature rather than pulled in unconditionally.
#[cfg(all(test, feature = "std"))]
extern crate std;

extern crate alloc;

pub mod attr;
pub mod blocking;
pub mod message_queue;
pub mod registry;


#[cfg(all(test, feature = "std"))]
mod proptests;

pub use attr::{Attr, MqFlags};
pub use blocking::{Blocker, ThreadId};
pub use message_queue::{Msg, MessageQueue};
pub use registry::Registry;

/// Result type for all operations in this crate.
pub type MqResult<T> = Result<T, MqError>;

/// Error taxonomy for the message-queue core.
///
/// These map onto negated errno values at the syscall boundary; this
/// crate never returns an errno directly so it stays usable from contexts
/// that have nothing to do with a Linux-shaped syscall ABI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MqError {
    /// `fd` does not resolve to a queue.
    BadFd,
    /// Null queue on receive, malformed arguments, or unlink of an unknown name.
    Invalid,
    /// Send payload exceeds `attr.msg_size`.
    MsgTooLarge,
    /// Would block and the non-blocking flag is set.
    WouldBlock,
    /// The queue was unlinked during the operation; data (if any) still transferred.
    Shutdown,
}

impl MqError {
    /// Negated-errno projection used by the syscall boundary.
    ///
    /// Values match Linux's `errno.h` so a userspace libc that expects
    /// POSIX semantics gets the numbers it's already coded against.
    pub fn to_errno(self) -> i32 {
        match self {
            MqError::BadFd => -9,        // EBADF
            MqError::Invalid => -22,     // EINVAL
            MqError::MsgTooLarge => -90, // EMSGSIZE
            MqError::WouldBlock => -11,  // EAGAIN
            MqError::Shutdown => -108,   // ESHUTDOWN
        }
    }
}

/// Compiled-in defaults for queue attributes, mirroring the original
/// `MAX_NUMBER_OF_MQ_MESSAGES`/`MAX_MQ_MESSAGE_SIZE` constants.
pub const DEFAULT_MAX_MSGS: u32 = 8;
pub const DEFAULT_MSG_SIZE: u32 = 8192;

/// Directory VFS open paths for queues are resolved under.
pub const MQUEUE_DIR: &str = "/dev/mqueue/";
