//! Compiled-in message-queue configuration
//!
//! The original C source spells its defaults as `MAX_NUMBER_OF_MQ_MESSAGES`
//! and `MAX_MQ_MESSAGE_SIZE` macros scattered through `mq_open`. This
//! module gives the kernel-facing names for the same constants
//! `multios_ipc` already defines, so callers that only see `multios-kernel`
//! (not the IPC crate directly) have a named spot to read them from instead
//! of a magic number at the call site.

pub use multios_ipc::{DEFAULT_MAX_MSGS, DEFAULT_MSG_SIZE, MQUEUE_DIR};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_ipc_core() {
        assert_eq!(DEFAULT_MAX_MSGS, multios_ipc::DEFAULT_MAX_MSGS);
        assert_eq!(DEFAULT_MSG_SIZE, multios_ipc::DEFAULT_MSG_SIZE);
        assert_eq!(MQUEUE_DIR, "/dev/mqueue/");
    }
}
