//! displayd: the ViperDOS compositing display server.
//!
//! | Module | Purpose |
//! |--------|---------|
//! | `registry` | Surface table, z-order, focus |
//! | `surface` | Per-window record and pending-event queue |
//! | `cursor` | Software/hardware mouse pointer |
//! | `decorations` | Title bars, buttons, borders, scrollbars |
//! | `menu` | Global menu bar and pulldowns |
//! | `compositor` | Back/front buffers and the composite pass |
//! | `events` | Event delivery, queueing and dead-client reaping |
//! | `input` | Mouse/keyboard polling and the interaction state machine |
//! | `ipc` | Service channel request dispatch |
//!
//! The server is single-threaded: every [`DisplayServer::tick`] polls
//! input, drains up to 16 service messages and composites when something
//! changed. All state is owned by the `DisplayServer` value.

pub mod compositor;
pub mod cursor;
pub mod decorations;
pub mod events;
pub mod input;
pub mod ipc;
pub mod menu;
pub mod registry;
pub mod surface;

#[cfg(test)]
mod tests;

use core::fmt;

use viper_abi::damage::DamageRect;
use viper_abi::event::Event;
use viper_abi::protocol::DISPLAY_ASSIGN;
use viper_gfx::DamageTracker;
use viper_lib::{klog_debug, klog_info, klog_warn};

use crate::syscall::{Handle, Kernel, SharedBuffer, SyscallError};
use crate::theme::{BORDER_WIDTH, COLOR_DESKTOP, MIN_WINDOW_Y};

use compositor::Screen;
use cursor::Cursor;
use input::InputState;
use menu::MenuBar;
use registry::SurfaceRegistry;
use surface::{Geometry, Surface};

/// Pause between loop iterations.
pub const LOOP_SLEEP_MS: u64 = 5;
/// Interval between heartbeat log lines.
pub const HEARTBEAT_INTERVAL_MS: u64 = 5000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BootError {
    Framebuffer(SyscallError),
    OutOfMemory,
    Channel(SyscallError),
    Assign(SyscallError),
}

impl fmt::Display for BootError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Framebuffer(err) => write!(f, "framebuffer unavailable: {}", err),
            Self::OutOfMemory => write!(f, "back buffer allocation failed"),
            Self::Channel(err) => write!(f, "service channel creation failed: {}", err),
            Self::Assign(err) => write!(f, "assign {} failed: {}", DISPLAY_ASSIGN, err),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ServerStats {
    pub loops: u64,
    pub composites: u64,
    pub messages: u64,
}

pub struct DisplayServer<K: Kernel> {
    kernel: K,
    screen: Screen,
    registry: SurfaceRegistry,
    cursor: Cursor,
    menu_bar: MenuBar,
    input: InputState,
    damage: DamageTracker,
    service_send: Handle,
    service_recv: Handle,
    stats: ServerStats,
    last_heartbeat: u64,
}

impl<K: Kernel> DisplayServer<K> {
    /// Map the framebuffer, allocate the back buffer, set up the cursor and
    /// publish the service channel under `DISPLAY`.
    pub fn boot(kernel: K) -> Result<Self, BootError> {
        klog_info!("displayd: starting");

        let (info, front) = kernel.map_framebuffer().map_err(BootError::Framebuffer)?;
        if info.width == 0
            || info.height == 0
            || front.len_pixels() < info.stride() * info.height as usize
        {
            return Err(BootError::Framebuffer(SyscallError::INVALID_ARG));
        }
        klog_info!(
            "displayd: framebuffer {}x{} pitch {}",
            info.width,
            info.height,
            info.pitch
        );

        let screen = Screen::new(info, front).ok_or(BootError::OutOfMemory)?;

        let (cx, cy) = (info.width as i32 / 2, info.height as i32 / 2);
        let mut cursor = Cursor::new(cx, cy);
        cursor.enable_hardware(&kernel);
        if let Err(err) = kernel.set_mouse_bounds(info.width, info.height) {
            klog_warn!("displayd: set_mouse_bounds failed: {}", err);
        }

        let (service_send, service_recv) = kernel.channel_create().map_err(BootError::Channel)?;
        if let Err(err) = kernel.assign_set(DISPLAY_ASSIGN, service_send) {
            let _ = kernel.channel_close(service_send);
            let _ = kernel.channel_close(service_recv);
            return Err(BootError::Assign(err));
        }
        klog_info!("displayd: service registered as {}", DISPLAY_ASSIGN);

        let now = kernel.uptime_ms();
        let mut server = Self {
            kernel,
            screen,
            registry: SurfaceRegistry::new(),
            cursor,
            menu_bar: MenuBar::new(),
            input: InputState::new(cx, cy),
            damage: DamageTracker::new(),
            service_send,
            service_recv,
            stats: ServerStats::default(),
            last_heartbeat: now,
        };
        server.composite();
        Ok(server)
    }

    /// One loop iteration: input, IPC, then composite if anything changed.
    pub fn tick(&mut self) {
        self.stats.loops += 1;
        self.poll_keyboard();
        self.poll_mouse();
        self.poll_service();
        if self.damage.is_dirty() {
            self.composite();
        }
        self.heartbeat();
    }

    pub fn run(mut self) -> ! {
        klog_info!("displayd: entering main loop");
        loop {
            self.tick();
            self.kernel.sleep_ms(LOOP_SLEEP_MS);
        }
    }

    #[inline]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    #[inline]
    pub fn registry(&self) -> &SurfaceRegistry {
        &self.registry
    }

    #[inline]
    pub fn input(&self) -> &InputState {
        &self.input
    }

    #[inline]
    pub fn stats(&self) -> ServerStats {
        self.stats
    }

    #[inline]
    pub fn screen_size(&self) -> (u32, u32) {
        (self.screen.width(), self.screen.height())
    }

    #[inline]
    pub fn service_handle(&self) -> Handle {
        self.service_send
    }

    fn heartbeat(&mut self) {
        let now = self.kernel.uptime_ms();
        if now.saturating_sub(self.last_heartbeat) < HEARTBEAT_INTERVAL_MS {
            return;
        }
        self.last_heartbeat = now;
        klog_info!(
            "displayd: alive, loops={} surfaces={} composites={} messages={}",
            self.stats.loops,
            self.registry.len(),
            self.stats.composites,
            self.stats.messages
        );
    }

    pub(crate) fn request_composite(&mut self) {
        self.damage.set_full_damage();
    }

    pub(crate) fn add_damage(&mut self, rect: DamageRect) {
        self.damage.add(rect);
    }

    /// Rebuild the menu bar layout from the current menu owner. An open
    /// pulldown is closed when the owner changes.
    pub(crate) fn refresh_menu_bar(&mut self) {
        let owner = self.registry.menu_owner();
        if owner != self.menu_bar.owner() {
            self.input.close_menu();
        }
        let menus = owner.and_then(|id| self.registry.get(id)).map(|s| &s.menus);
        self.menu_bar.refresh(owner, menus);
    }

    /// Free a surface and everything it holds. Focus moves to the topmost
    /// remaining window when the destroyed one had it.
    pub(crate) fn destroy_surface(&mut self, id: u32) -> bool {
        let was_focused = self.registry.focused_id() == id;
        let Some(surf) = self.registry.remove(id) else {
            return false;
        };
        klog_debug!("displayd: destroying surface {}", id);
        self.release_surface(surf);
        self.input.forget_surface(id);
        if was_focused {
            let change = self.registry.refocus_topmost();
            self.post_focus_change(change);
        }
        self.request_composite();
        true
    }

    fn release_surface(&mut self, mut surf: Surface) {
        while let Some(queued) = surf.queue.try_pop().flatten() {
            if let Some(handle) = queued.handle {
                let _ = self.kernel.shm_close(handle);
            }
        }
        if let Some(channel) = surf.event_channel.take() {
            let _ = self.kernel.channel_close(channel);
        }
        surf.buffer.release(&self.kernel);
    }

    /// Give `id` a fresh pixel buffer of `width`x`height` and hand the owner
    /// a handle to it through a Resize event. The old buffer is released.
    pub(crate) fn reallocate_surface(&mut self, id: u32, width: u32, height: u32) -> bool {
        if self.registry.get(id).is_none() || width == 0 || height == 0 {
            return false;
        }
        let size = width as usize * 4 * height as usize;
        let mut buffer = match SharedBuffer::create(&self.kernel, size) {
            Ok(buffer) => buffer,
            Err(err) => {
                klog_warn!("displayd: resize of surface {} failed: {:?}", id, err);
                return false;
            }
        };
        buffer.pixels_mut().fill(COLOR_DESKTOP.to_u32());
        let client_handle = match self.kernel.handle_dup(buffer.handle()) {
            Ok(handle) => handle,
            Err(err) => {
                klog_warn!("displayd: handle_dup for surface {} failed: {}", id, err);
                buffer.release(&self.kernel);
                return false;
            }
        };
        let Some(surf) = self.registry.get_mut(id) else {
            let _ = self.kernel.shm_close(client_handle);
            buffer.release(&self.kernel);
            return false;
        };
        let old = surf.replace_buffer(buffer, width, height);
        let stride = surf.stride;
        old.release(&self.kernel);

        self.post_event_with_handle(
            Event::Resize {
                surface_id: id,
                width,
                height,
                stride,
            },
            client_handle,
        );
        self.request_composite();
        true
    }

    /// Maximize to the work area or restore the saved geometry.
    pub(crate) fn toggle_maximize(&mut self, id: u32) {
        let (sw, sh) = self.screen_size();
        let Some(surf) = self.registry.get_mut(id) else {
            return;
        };
        let previous = surf.geometry();
        let was_maximized = surf.maximized;
        let target = if was_maximized {
            surf.saved
        } else {
            surf.saved = previous;
            Geometry {
                x: BORDER_WIDTH,
                y: MIN_WINDOW_Y,
                width: sw.saturating_sub(2 * BORDER_WIDTH as u32),
                height: sh.saturating_sub((MIN_WINDOW_Y + BORDER_WIDTH) as u32),
            }
        };
        let resized = (target.width, target.height) == (previous.width, previous.height)
            || self.reallocate_surface(id, target.width, target.height);
        if let Some(surf) = self.registry.get_mut(id) {
            if resized {
                surf.x = target.x;
                surf.y = target.y;
                surf.maximized = !was_maximized;
            } else {
                klog_warn!("displayd: maximize toggle of surface {} failed", id);
            }
        }
        self.request_composite();
    }

    /// Focus `id` and raise it, notifying both sides of the change.
    pub(crate) fn focus_surface(&mut self, id: u32) {
        let change = self.registry.set_focus(id);
        if change.gained.is_some() {
            self.registry.bring_to_front(id);
        }
        self.post_focus_change(change);
    }
}
