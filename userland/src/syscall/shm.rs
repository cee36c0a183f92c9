//! Shared-memory views.

use core::fmt;
use core::ptr::NonNull;

use viper_lib::klog_debug;

use super::{Handle, Kernel, SyscallError};

/// A region the kernel mapped into this address space, viewed as pixels.
///
/// A `Mapping` is handed out by [`Kernel::shm_map`] or
/// [`Kernel::map_framebuffer`] and is consumed by [`Kernel::shm_unmap`].
/// It is deliberately not `Clone`: one mapping, one owner.
pub struct Mapping {
    ptr: NonNull<u32>,
    words: usize,
}

impl Mapping {
    /// Wrap a kernel-provided mapping.
    ///
    /// # Safety
    ///
    /// `ptr` must be 4-byte aligned and valid for reads and writes of
    /// `words` `u32`s until the mapping is passed back to the kernel that
    /// created it. Memory behind it may also be reachable through other
    /// mappings of the same object; callers must not hold overlapping
    /// slices from two mappings at the same time.
    pub unsafe fn from_raw(ptr: *mut u32, words: usize) -> Option<Self> {
        NonNull::new(ptr).map(|ptr| Self { ptr, words })
    }

    #[inline]
    pub fn addr(&self) -> usize {
        self.ptr.as_ptr() as usize
    }

    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.words * 4
    }

    #[inline]
    pub fn len_pixels(&self) -> usize {
        self.words
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        unsafe { core::slice::from_raw_parts(self.ptr.as_ptr(), self.words) }
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        unsafe { core::slice::from_raw_parts_mut(self.ptr.as_ptr(), self.words) }
    }
}

impl fmt::Debug for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Mapping({:#x}, {} bytes)", self.addr(), self.len_bytes())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShmError {
    InvalidSize,
    AllocationFailed(SyscallError),
    MappingFailed(SyscallError),
}

/// A shared-memory handle together with this side's mapping of it.
///
/// Release is explicit because it needs the kernel; dropping a
/// `SharedBuffer` without [`release`](Self::release) leaks both.
#[derive(Debug)]
pub struct SharedBuffer {
    handle: Handle,
    mapping: Mapping,
}

impl SharedBuffer {
    /// Allocate `size` bytes of shared memory and map them.
    pub fn create<K: Kernel>(kernel: &K, size: usize) -> Result<Self, ShmError> {
        if size == 0 {
            return Err(ShmError::InvalidSize);
        }
        let handle = kernel.shm_create(size).map_err(ShmError::AllocationFailed)?;
        match kernel.shm_map(handle) {
            Ok(mapping) => Ok(Self { handle, mapping }),
            Err(err) => {
                let _ = kernel.shm_close(handle);
                Err(ShmError::MappingFailed(err))
            }
        }
    }

    /// Map a handle received from a peer. On failure the handle is closed.
    pub fn map<K: Kernel>(kernel: &K, handle: Handle) -> Result<Self, ShmError> {
        match kernel.shm_map(handle) {
            Ok(mapping) => Ok(Self { handle, mapping }),
            Err(err) => {
                let _ = kernel.shm_close(handle);
                Err(ShmError::MappingFailed(err))
            }
        }
    }

    #[inline]
    pub fn handle(&self) -> Handle {
        self.handle
    }

    #[inline]
    pub fn len_bytes(&self) -> usize {
        self.mapping.len_bytes()
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        self.mapping.pixels()
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        self.mapping.pixels_mut()
    }

    /// Unmap and close. Errors are logged; the buffer is gone either way.
    pub fn release<K: Kernel>(self, kernel: &K) {
        let handle = self.handle;
        if let Err(err) = kernel.shm_unmap(self.mapping) {
            klog_debug!("shm: unmap of handle {} failed: {}", handle.raw(), err);
        }
        if let Err(err) = kernel.shm_close(handle) {
            klog_debug!("shm: close of handle {} failed: {}", handle.raw(), err);
        }
    }
}
