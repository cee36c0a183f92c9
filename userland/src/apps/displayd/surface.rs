//! Server-side window record.

use viper_abi::damage::DamageRect;
use viper_abi::event::Event;
use viper_abi::protocol::MenuSet;
use viper_abi::window::{SurfaceFlags, Title};
use viper_lib::RingBuffer;

use crate::syscall::{Handle, SharedBuffer};
use crate::theme::{BORDER_WIDTH, TITLE_BAR_HEIGHT};

/// Events held for a surface whose owner has not subscribed yet.
pub const EVENT_QUEUE_SIZE: usize = 32;

/// A queued event and the handle that travels with it (Resize only).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QueuedEvent {
    pub event: Event,
    pub handle: Option<Handle>,
}

pub type EventQueue = RingBuffer<Option<QueuedEvent>, EVENT_QUEUE_SIZE>;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScrollbarState {
    pub enabled: bool,
    pub content_size: i32,
    pub viewport_size: i32,
    pub scroll_pos: i32,
}

impl ScrollbarState {
    /// Drawn and hit-tested only when there is something to scroll.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.enabled && self.content_size > self.viewport_size && self.viewport_size > 0
    }

    #[inline]
    pub fn max_scroll(&self) -> i32 {
        (self.content_size - self.viewport_size).max(0)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Geometry {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

pub struct Surface {
    pub id: u32,
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Row pitch in bytes.
    pub stride: u32,
    pub visible: bool,
    pub minimized: bool,
    pub maximized: bool,
    /// Geometry to return to when un-maximizing.
    pub saved: Geometry,
    pub buffer: SharedBuffer,
    pub event_channel: Option<Handle>,
    pub flags: SurfaceFlags,
    pub z_order: u32,
    pub vscroll: ScrollbarState,
    pub hscroll: ScrollbarState,
    pub menus: MenuSet,
    pub title: Title,
    pub queue: EventQueue,
}

impl Surface {
    pub fn new(id: u32, width: u32, height: u32, buffer: SharedBuffer) -> Self {
        Self {
            id,
            x: 0,
            y: 0,
            width,
            height,
            stride: width * 4,
            visible: true,
            minimized: false,
            maximized: false,
            saved: Geometry::default(),
            buffer,
            event_channel: None,
            flags: SurfaceFlags::empty(),
            z_order: 0,
            vscroll: ScrollbarState::default(),
            hscroll: ScrollbarState::default(),
            menus: MenuSet::default(),
            title: Title::empty(),
            queue: EventQueue::new(),
        }
    }

    #[inline]
    pub fn is_system(&self) -> bool {
        self.flags.contains(SurfaceFlags::SYSTEM)
    }

    #[inline]
    pub fn is_decorated(&self) -> bool {
        !self.flags.intersects(SurfaceFlags::SYSTEM | SurfaceFlags::NO_DECORATIONS)
    }

    /// Composited and hit-testable.
    #[inline]
    pub fn is_shown(&self) -> bool {
        self.visible && !self.minimized
    }

    #[inline]
    pub fn geometry(&self) -> Geometry {
        Geometry {
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
        }
    }

    #[inline]
    pub fn stride_pixels(&self) -> usize {
        self.stride as usize / 4
    }

    pub fn content_rect(&self) -> DamageRect {
        DamageRect::from_xywh(self.x, self.y, self.width, self.height)
    }

    /// Outer box including border and title bar for decorated surfaces.
    pub fn frame_rect(&self) -> DamageRect {
        if !self.is_decorated() {
            return self.content_rect();
        }
        DamageRect::from_xywh(
            self.x - BORDER_WIDTH,
            self.y - TITLE_BAR_HEIGHT - BORDER_WIDTH,
            self.width + 2 * BORDER_WIDTH as u32,
            self.height + TITLE_BAR_HEIGHT as u32 + 2 * BORDER_WIDTH as u32,
        )
    }

    /// Content-local coordinates, when `(x, y)` is inside the content area.
    pub fn local_point(&self, x: i32, y: i32) -> Option<(i32, i32)> {
        let (lx, ly) = (x - self.x, y - self.y);
        if lx >= 0 && ly >= 0 && lx < self.width as i32 && ly < self.height as i32 {
            Some((lx, ly))
        } else {
            None
        }
    }

    pub fn pixels(&self) -> &[u32] {
        self.buffer.pixels()
    }

    /// Part of the content area backed by the pixel buffer. Smaller than
    /// `width`x`height` while a resize drag is in progress.
    pub fn buffer_extent(&self) -> (u32, u32) {
        let stride = self.stride_pixels().max(1);
        let rows = (self.buffer.len_bytes() / 4 / stride) as u32;
        ((stride as u32).min(self.width), rows.min(self.height))
    }

    /// Swap in a new pixel buffer, returning the old one for release.
    pub fn replace_buffer(&mut self, buffer: SharedBuffer, width: u32, height: u32) -> SharedBuffer {
        self.width = width;
        self.height = height;
        self.stride = width * 4;
        core::mem::replace(&mut self.buffer, buffer)
    }
}
