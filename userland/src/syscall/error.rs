//! Kernel error codes with errno-compatible representation.
//!
//! Every facility on the [`Kernel`](super::Kernel) seam reports failure as a
//! `SyscallError`; callers match on the named constants.

use core::fmt;

/// Kernel error with errno-compatible representation.
#[derive(Clone, Copy, Eq, PartialEq)]
#[repr(transparent)]
pub struct SyscallError(i32);

impl SyscallError {
    /// No such object or assign
    pub const NOT_FOUND: Self = Self(2);
    /// Handle does not name a live object of the expected kind
    pub const INVALID_HANDLE: Self = Self(9);
    /// Non-blocking operation found nothing to do
    pub const WOULD_BLOCK: Self = Self(11);
    /// Out of memory
    pub const NO_MEMORY: Self = Self(12);
    /// Name already registered
    pub const ALREADY_EXISTS: Self = Self(17);
    /// Invalid argument
    pub const INVALID_ARG: Self = Self(22);
    /// The other end of the channel is closed
    pub const PEER_CLOSED: Self = Self(32);
    /// Facility not provided by this kernel
    pub const NOT_SUPPORTED: Self = Self(38);
    /// Message or handle list exceeds the channel limits
    pub const MESSAGE_TOO_LARGE: Self = Self(90);
    /// Deadline expired
    pub const TIMED_OUT: Self = Self(110);

    #[inline]
    pub const fn from_errno(errno: i32) -> Self {
        Self(errno)
    }

    #[inline]
    pub const fn errno(self) -> i32 {
        self.0
    }

    pub const fn as_str(self) -> &'static str {
        match self.0 {
            2 => "Not found",
            9 => "Invalid handle",
            11 => "Operation would block",
            12 => "Out of memory",
            17 => "Already exists",
            22 => "Invalid argument",
            32 => "Peer closed",
            38 => "Not supported",
            90 => "Message too large",
            110 => "Timed out",
            _ => "Unknown error",
        }
    }
}

impl fmt::Debug for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SyscallError({}: {})", self.0, self.as_str())
    }
}

impl fmt::Display for SyscallError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result type for kernel facility calls.
pub type SyscallResult<T> = Result<T, SyscallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_named_codes_describe_themselves() {
        assert_eq!(SyscallError::WOULD_BLOCK.as_str(), "Operation would block");
        assert_eq!(SyscallError::from_errno(32), SyscallError::PEER_CLOSED);
        assert_eq!(SyscallError::from_errno(999).as_str(), "Unknown error");
    }
}
