//! Kernel facilities used by the display server and its clients.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `error` | `SyscallError`, `SyscallResult` |
//! | `shm` | `Mapping` views and the `SharedBuffer` pairing of handle + mapping |
//! | `sim` | In-memory kernel used by tests and hosted builds |
//!
//! The [`Kernel`] trait is the only seam between user space and the host
//! kernel. Calls never block except `sleep_ms` and `yield_now`.

pub mod error;
pub mod shm;
pub mod sim;

pub use error::{SyscallError, SyscallResult};
pub use shm::{Mapping, SharedBuffer, ShmError};
pub use sim::{SimConfig, SimKernel};

use viper_abi::window::{KeyModifiers, MouseButtons};
use viper_abi::wire::MAX_HANDLES;

/// Opaque reference to a kernel object (channel end, shared memory).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Handle(u32);

impl Handle {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }
}

/// Result of a successful non-blocking receive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Received {
    pub len: usize,
    pub handle_count: usize,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MouseState {
    pub x: i32,
    pub y: i32,
    pub buttons: MouseButtons,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyEvent {
    pub keycode: u16,
    pub modifiers: KeyModifiers,
    pub pressed: bool,
}

/// Geometry of the mapped framebuffer. `pitch` is in bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FramebufferInfo {
    pub width: u32,
    pub height: u32,
    pub pitch: u32,
}

impl FramebufferInfo {
    /// Row pitch in pixels.
    #[inline]
    pub fn stride(&self) -> usize {
        self.pitch as usize / 4
    }
}

pub trait Kernel {
    /// Returns `(send_end, recv_end)`.
    fn channel_create(&self) -> SyscallResult<(Handle, Handle)>;
    /// Queue one message. Attached handles move to the receiver and are no
    /// longer valid in the sender.
    fn channel_send(&self, channel: Handle, data: &[u8], handles: &[Handle]) -> SyscallResult<()>;
    /// Non-blocking receive; `WOULD_BLOCK` when the queue is empty.
    fn channel_recv(
        &self,
        channel: Handle,
        buf: &mut [u8],
        handles: &mut [Handle; MAX_HANDLES],
    ) -> SyscallResult<Received>;
    fn channel_close(&self, channel: Handle) -> SyscallResult<()>;

    fn shm_create(&self, size: usize) -> SyscallResult<Handle>;
    fn shm_map(&self, shm: Handle) -> SyscallResult<Mapping>;
    fn shm_unmap(&self, mapping: Mapping) -> SyscallResult<()>;
    fn shm_close(&self, shm: Handle) -> SyscallResult<()>;
    /// New handle naming the same shared-memory object.
    fn handle_dup(&self, handle: Handle) -> SyscallResult<Handle>;

    fn map_framebuffer(&self) -> SyscallResult<(FramebufferInfo, Mapping)>;
    fn set_mouse_bounds(&self, width: u32, height: u32) -> SyscallResult<()>;
    fn mouse_state(&self) -> SyscallResult<MouseState>;
    fn input_has_event(&self) -> bool;
    fn input_get_event(&self) -> Option<KeyEvent>;
    /// Upload an XRGB cursor image; `NOT_SUPPORTED` without hardware cursor.
    fn set_cursor_image(
        &self,
        pixels: &[u32],
        width: u32,
        height: u32,
        hot_x: u32,
        hot_y: u32,
    ) -> SyscallResult<()>;
    fn move_hw_cursor(&self, x: i32, y: i32) -> SyscallResult<()>;

    fn assign_set(&self, name: &str, handle: Handle) -> SyscallResult<()>;
    /// Each lookup returns a fresh handle the caller owns.
    fn assign_get(&self, name: &str) -> SyscallResult<Handle>;

    fn sleep_ms(&self, ms: u64);
    fn yield_now(&self);
    fn uptime_ms(&self) -> u64;
}
