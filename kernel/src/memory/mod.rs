//! Minimal user/kernel memory crossing surface
//!
//! The full virtual memory manager (paging, page faults, NUMA, physical
//! frame allocation) is out of scope here — the message-queue syscalls
//! only need to move a caller-supplied buffer across the user/kernel
//! boundary safely. This module is that narrow slice, shaped the way the
//! fuller memory manager validates addresses before touching them.

use alloc::vec::Vec;

/// Errors from the user/kernel copy path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    /// Pointer was null or fell outside the user address ceiling.
    InvalidAddress,
    /// Requested length would read or write past the user address ceiling.
    OutOfRange,
}

pub type MmResult<T> = Result<T, MmError>;

/// Addresses at or above this are kernel-only; no user syscall argument
/// may name a byte at or past it. A stand-in for the real arch-specific
/// higher-half split a full virtual memory manager would enforce.
const USER_ADDRESS_CEILING: usize = 0x0000_8000_0000_0000;

fn validate_address_range(addr: usize, len: usize) -> MmResult<()> {
    if addr == 0 {
        return Err(MmError::InvalidAddress);
    }
    let end = addr.checked_add(len).ok_or(MmError::OutOfRange)?;
    if end > USER_ADDRESS_CEILING {
        return Err(MmError::OutOfRange);
    }
    Ok(())
}

/// Copy `len` bytes from a user-space pointer into a freshly allocated
/// kernel buffer, e.g. for `mq_send`'s message payload.
///
/// # Safety
/// `user_addr` must genuinely point at `len` readable bytes in the
/// calling process's address space. The syscall dispatcher is responsible
/// for that guarantee; this function only checks the address is
/// structurally plausible (non-null, within the user half).
pub unsafe fn copy_from_user(user_addr: usize, len: usize) -> MmResult<Vec<u8>> {
    validate_address_range(user_addr, len)?;
    let mut buf = alloc::vec![0u8; len];
    core::ptr::copy_nonoverlapping(user_addr as *const u8, buf.as_mut_ptr(), len);
    Ok(buf)
}

/// Copy `data` into a user-space buffer, e.g. for `mq_receive`'s output
/// payload.
///
/// # Safety
/// `user_addr` must point at `data.len()` writable bytes in the calling
/// process's address space.
pub unsafe fn copy_to_user(user_addr: usize, data: &[u8]) -> MmResult<()> {
    validate_address_range(user_addr, data.len())?;
    core::ptr::copy_nonoverlapping(data.as_ptr(), user_addr as *mut u8, data.len());
    Ok(())
}
