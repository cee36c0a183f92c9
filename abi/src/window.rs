//! Surface-level flags and the window-list snapshot.

use bitflags::bitflags;

/// Bytes reserved for a NUL-terminated window title on the wire.
pub const TITLE_LEN: usize = 64;

/// Upper bound on entries in one `LIST_WINDOWS` reply.
pub const MAX_LIST_WINDOWS: usize = 16;

bitflags! {
    /// Classification bits carried by `CREATE_SURFACE`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct SurfaceFlags: u32 {
        /// Desktop-class surface: no focus, no window-list entry, z-order 0.
        const SYSTEM = 1 << 0;
        /// Composited without title bar or border.
        const NO_DECORATIONS = 1 << 1;
    }
}

bitflags! {
    /// Edges grabbed by a resize gesture. Corners combine two bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct ResizeEdge: u8 {
        const LEFT = 1;
        const RIGHT = 2;
        const TOP = 4;
        const BOTTOM = 8;
    }
}

bitflags! {
    /// Mouse button bitmask as reported by the kernel.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct MouseButtons: u8 {
        const LEFT = 1 << 0;
        const RIGHT = 1 << 1;
        const MIDDLE = 1 << 2;
    }
}

impl MouseButtons {
    /// Index carried in mouse events: 0 = left, 1 = right, 2 = middle.
    pub fn primary_index(self) -> u8 {
        if self.contains(Self::LEFT) {
            0
        } else if self.contains(Self::RIGHT) {
            1
        } else if self.contains(Self::MIDDLE) {
            2
        } else {
            0
        }
    }
}

bitflags! {
    /// Keyboard modifier state attached to key events.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct KeyModifiers: u8 {
        const SHIFT = 1 << 0;
        const CTRL = 1 << 1;
        const ALT = 1 << 2;
        const META = 1 << 3;
        const CAPS_LOCK = 1 << 4;
    }
}

/// Fixed-capacity, NUL-padded string as laid out on the wire.
///
/// At most `N - 1` bytes are stored so the terminator always fits. Input
/// longer than that is cut at the last char boundary that fits.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FixedStr<const N: usize>([u8; N]);

impl<const N: usize> FixedStr<N> {
    pub const fn empty() -> Self {
        Self([0; N])
    }

    pub fn new(s: &str) -> Self {
        let mut end = s.len().min(N.saturating_sub(1));
        while !s.is_char_boundary(end) {
            end -= 1;
        }
        let mut bytes = [0u8; N];
        bytes[..end].copy_from_slice(&s.as_bytes()[..end]);
        Self(bytes)
    }

    /// Take raw wire bytes, forcing a terminator in the last slot.
    pub fn from_bytes(raw: &[u8; N]) -> Self {
        let mut bytes = *raw;
        if let Some(last) = bytes.last_mut() {
            *last = 0;
        }
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.iter().position(|&b| b == 0).unwrap_or(N)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_str(&self) -> &str {
        let bytes = &self.0[..self.len()];
        match core::str::from_utf8(bytes) {
            Ok(s) => s,
            Err(e) => core::str::from_utf8(&bytes[..e.valid_up_to()]).unwrap_or(""),
        }
    }
}

impl<const N: usize> Default for FixedStr<N> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<const N: usize> core::fmt::Debug for FixedStr<N> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Debug::fmt(self.as_str(), f)
    }
}

pub type Title = FixedStr<TITLE_LEN>;

/// One row of the `LIST_WINDOWS` reply.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowInfo {
    pub surface_id: u32,
    pub flags: SurfaceFlags,
    pub minimized: bool,
    pub maximized: bool,
    pub focused: bool,
    pub title: Title,
}

impl WindowInfo {
    #[inline]
    pub fn title_str(&self) -> &str {
        self.title.as_str()
    }
}
