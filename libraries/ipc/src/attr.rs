//! Queue attributes (`Attr`): capacity, flags, and the wire layout used
//! to pass them across the syscall boundary.

use bitflags::bitflags;

use crate::{DEFAULT_MAX_MSGS, DEFAULT_MSG_SIZE};

bitflags! {
    /// Flags bitset carried on `Attr`. Only the non-blocking bit is
    /// interpreted by this crate; everything else passes through to the
    /// VFS layer untouched.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MqFlags: i32 {
        /// `O_NONBLOCK`. `send`/`receive` return `WouldBlock` instead of
        /// suspending when this bit is set.
        const NON_BLOCKING = 0x0800;
    }
}

/// Queue attributes (`mq_attr` on the wire).
///
/// Field order on the wire is `flags, max_msgs, msg_size, cur_msgs`; only
/// the first three are meaningful as syscall *inputs*, `cur_msgs` is
/// read-only output state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr {
    pub flags: MqFlags,
    pub max_msgs: u32,
    pub msg_size: u32,
    pub cur_msgs: u32,
}

impl Default for Attr {
    fn default() -> Self {
        Attr {
            flags: MqFlags::empty(),
            max_msgs: DEFAULT_MAX_MSGS,
            msg_size: DEFAULT_MSG_SIZE,
            cur_msgs: 0,
        }
    }
}

impl Attr {
    /// Build the attributes a fresh queue should start with from
    /// caller-supplied open-time input (`None` fields keep the default).
    pub fn new(flags: MqFlags, max_msgs: Option<u32>, msg_size: Option<u32>) -> Self {
        Attr {
            flags,
            max_msgs: max_msgs.unwrap_or(DEFAULT_MAX_MSGS),
            msg_size: msg_size.unwrap_or(DEFAULT_MSG_SIZE),
            cur_msgs: 0,
        }
    }

    /// True when an existing queue's capacity shape matches a caller's
    /// requested attributes on reopen. Flags and `cur_msgs` are excluded:
    /// flags are per-open, `cur_msgs` is derived state.
    pub fn is_congruent_with(&self, other: &Attr) -> bool {
        self.max_msgs == other.max_msgs && self.msg_size == other.msg_size
    }

    pub fn is_non_blocking(&self) -> bool {
        self.flags.contains(MqFlags::NON_BLOCKING)
    }
}
