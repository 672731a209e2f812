//! MultiOS kernel core
//!
//! This crate wires the message-queue IPC subsystem ([`multios_ipc`]) into
//! a kernel: a thread table that satisfies [`multios_ipc::Blocker`], a
//! per-process file descriptor table that binds fds to queue objects, and
//! the syscall dispatch surface userspace enters through.

#![no_std]

extern crate alloc;

pub mod filesystem;
pub mod log;
pub mod memory;
pub mod mq_config;
pub mod scheduler;
pub mod syscall;

pub use multios_ipc;

/// Kernel-wide result type.
pub type KernelResult<T> = Result<T, KernelError>;

/// Errors surfaced across the modules this crate composes. Each variant
/// wraps the error type of the subsystem it came from so callers keep the
/// original detail instead of a flattened string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KernelError {
    Memory(memory::MmError),
    Fs(filesystem::FsError),
    Ipc(multios_ipc::MqError),
}

impl From<memory::MmError> for KernelError {
    fn from(e: memory::MmError) -> Self {
        KernelError::Memory(e)
    }
}

impl From<filesystem::FsError> for KernelError {
    fn from(e: filesystem::FsError) -> Self {
        KernelError::Fs(e)
    }
}

impl From<multios_ipc::MqError> for KernelError {
    fn from(e: multios_ipc::MqError) -> Self {
        KernelError::Ipc(e)
    }
}
