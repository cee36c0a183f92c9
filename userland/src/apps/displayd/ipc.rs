//! Service channel request handling.
//!
//! Every message on the service channel carries, as handle 0, the send end
//! of a reply channel. The server answers on it exactly once and closes it.
//! Further handles are request-specific (an event channel for
//! `CREATE_SURFACE`/`SUBSCRIBE_EVENTS`); unused ones are closed. A message
//! without handles is fire-and-forget.

use viper_abi::damage::DamageRect;
use viper_abi::pixel::PixelFormat;
use viper_abi::protocol::{Envelope, Reply, Request, WindowList, status};
use viper_abi::window::{SurfaceFlags, Title, WindowInfo};
use viper_abi::wire::{MAX_HANDLES, MAX_PAYLOAD};
use viper_lib::{klog_debug, klog_trace, klog_warn};

use super::DisplayServer;
use super::registry::FocusChange;
use super::surface::Surface;
use crate::syscall::{Handle, Kernel, SharedBuffer, SyscallError};
use crate::theme::{
    CASCADE_ORIGIN, CASCADE_STEP_X, CASCADE_STEP_Y, CASCADE_STEPS, COLOR_DESKTOP, MENU_BAR_HEIGHT,
    MIN_WINDOW_Y, SCREEN_BORDER_WIDTH, TITLE_BAR_HEIGHT,
};

/// Service messages handled per loop iteration.
pub const MAX_MESSAGES_PER_TICK: usize = 16;

/// Initial position of a new decorated surface, stepping diagonally so
/// consecutive windows do not cover each other exactly.
pub fn cascade_position(id: u32) -> (i32, i32) {
    let idx = (id % CASCADE_STEPS) as i32;
    (
        SCREEN_BORDER_WIDTH + CASCADE_ORIGIN + idx * CASCADE_STEP_X,
        SCREEN_BORDER_WIDTH + TITLE_BAR_HEIGHT + CASCADE_ORIGIN + idx * CASCADE_STEP_Y,
    )
}

/// A reply plus the handle that travels with it.
struct Response {
    reply: Reply,
    handle: Option<Handle>,
}

impl From<Reply> for Response {
    fn from(reply: Reply) -> Self {
        Self {
            reply,
            handle: None,
        }
    }
}

fn generic(status: i32) -> Response {
    Reply::Generic { status }.into()
}

impl<K: Kernel> DisplayServer<K> {
    pub(crate) fn poll_service(&mut self) {
        let mut buf = [0u8; MAX_PAYLOAD];
        for _ in 0..MAX_MESSAGES_PER_TICK {
            let mut handles = [Handle::from_raw(0); MAX_HANDLES];
            let received = match self.kernel.channel_recv(self.service_recv, &mut buf, &mut handles) {
                Ok(received) => received,
                Err(SyscallError::WOULD_BLOCK) => break,
                Err(err) => {
                    klog_warn!("displayd: service receive failed: {}", err);
                    break;
                }
            };
            self.stats.messages += 1;
            let count = received.handle_count.min(MAX_HANDLES);
            self.handle_message(&buf[..received.len], &handles[..count]);
        }
    }

    fn handle_message(&mut self, data: &[u8], handles: &[Handle]) {
        let (reply_channel, extra) = match handles.split_first() {
            Some((first, rest)) => (Some(*first), rest),
            None => (None, &[][..]),
        };

        let Envelope { request_id, body } = match Request::decode(data) {
            Ok(envelope) => envelope,
            Err(err) => {
                klog_debug!("displayd: dropping malformed request: {}", err);
                if let Some(ch) = reply_channel {
                    let _ = self.kernel.channel_close(ch);
                }
                self.close_handles(extra);
                return;
            }
        };
        klog_trace!("displayd: request {:#x} id {}", body.tag(), request_id);

        let mut attached = extra.first().copied();
        let response = self.dispatch(body, &mut attached);
        if let Some(h) = attached {
            self.close_handle(h);
        }
        self.close_handles(extra.get(1..).unwrap_or(&[]));

        let Some(channel) = reply_channel else {
            if let Some(h) = response.handle {
                let _ = self.kernel.shm_close(h);
            }
            return;
        };
        self.send_reply(channel, request_id, response);
        let _ = self.kernel.channel_close(channel);
    }

    fn send_reply(&mut self, channel: Handle, request_id: u32, response: Response) {
        let mut buf = [0u8; MAX_PAYLOAD];
        let sent = match response.reply.encode(request_id, &mut buf) {
            Ok(len) => self
                .kernel
                .channel_send(channel, &buf[..len], response.handle.as_slice()),
            Err(_) => Err(SyscallError::INVALID_ARG),
        };
        if let Err(err) = sent {
            klog_debug!("displayd: reply {} not delivered: {}", request_id, err);
            if let Some(h) = response.handle {
                let _ = self.kernel.shm_close(h);
            }
        }
    }

    fn close_handle(&self, handle: Handle) {
        if self.kernel.channel_close(handle).is_err() {
            let _ = self.kernel.shm_close(handle);
        }
    }

    fn close_handles(&self, handles: &[Handle]) {
        for &h in handles {
            self.close_handle(h);
        }
    }

    fn dispatch(&mut self, request: Request, attached: &mut Option<Handle>) -> Response {
        match request {
            Request::GetInfo => Reply::Info {
                status: status::OK,
                width: self.screen.width(),
                height: self.screen.height(),
                format: PixelFormat::Xrgb8888.fourcc(),
            }
            .into(),
            Request::CreateSurface {
                width,
                height,
                flags,
                title,
            } => self.create_surface(width, height, flags, title, attached.take()),
            Request::DestroySurface { surface_id } => {
                if self.destroy_surface(surface_id) {
                    generic(status::OK)
                } else {
                    generic(status::NO_SURFACE)
                }
            }
            Request::Present { surface_id, damage } => self.present(surface_id, damage),
            Request::SetGeometry { surface_id, x, y } => self.set_geometry(surface_id, x, y),
            Request::SetVisible {
                surface_id,
                visible,
            } => self.with_surface(surface_id, |surf| surf.visible = visible),
            Request::SetTitle { surface_id, title } => {
                self.with_surface(surface_id, |surf| surf.title = title)
            }
            Request::SubscribeEvents { surface_id } => self.subscribe(surface_id, attached.take()),
            Request::PollEvent { surface_id } => {
                let queued = self.pop_queued(surface_id);
                Response {
                    reply: Reply::PollEvent {
                        event: queued.map(|q| q.event),
                    },
                    handle: queued.and_then(|q| q.handle),
                }
            }
            Request::ListWindows => self.list_windows(),
            Request::RestoreWindow { surface_id } => self.restore_window(surface_id),
            Request::SetScrollbar {
                surface_id,
                vertical,
                enabled,
                content_size,
                viewport_size,
                position,
            } => self.with_surface(surface_id, |surf| {
                let bar = if vertical {
                    &mut surf.vscroll
                } else {
                    &mut surf.hscroll
                };
                bar.enabled = enabled;
                bar.content_size = content_size.max(0);
                bar.viewport_size = viewport_size.max(0);
                bar.scroll_pos = position.clamp(0, bar.max_scroll());
            }),
            Request::SetMenu { surface_id, menus } => {
                let response = self.with_surface(surface_id, |surf| surf.menus = menus);
                self.refresh_menu_bar();
                response
            }
            Request::RequestFocus { surface_id } => match self.registry.get(surface_id) {
                Some(surf) if !surf.is_system() => {
                    self.focus_surface(surface_id);
                    generic(status::OK)
                }
                Some(_) => generic(status::INVALID_ARGUMENT),
                None => generic(status::NO_SURFACE),
            },
        }
    }

    /// Apply `update` to a surface and recomposite when it changed anything.
    fn with_surface(&mut self, id: u32, update: impl FnOnce(&mut Surface)) -> Response {
        let Some(surf) = self.registry.get_mut(id) else {
            return generic(status::NO_SURFACE);
        };
        let before = (surf.visible, surf.title, surf.vscroll, surf.hscroll, surf.menus);
        update(surf);
        let after = (surf.visible, surf.title, surf.vscroll, surf.hscroll, surf.menus);
        if before != after {
            self.request_composite();
        }
        generic(status::OK)
    }

    fn create_surface(
        &mut self,
        width: u32,
        height: u32,
        flags: SurfaceFlags,
        title: Title,
        event_channel: Option<Handle>,
    ) -> Response {
        let fail = |status: i32| -> Response {
            Reply::CreateSurface {
                status,
                surface_id: 0,
                stride: 0,
            }
            .into()
        };
        let reject = |this: &Self, status: i32| {
            if let Some(ch) = event_channel {
                let _ = this.kernel.channel_close(ch);
            }
            fail(status)
        };

        let (sw, sh) = self.screen_size();
        if width == 0 || height == 0 || width > sw || height > sh {
            klog_debug!("displayd: rejecting surface {}x{}", width, height);
            return reject(self, status::INVALID_ARGUMENT);
        }
        if !self.registry.has_free_slot() {
            klog_warn!("displayd: surface table full");
            return reject(self, status::NO_SURFACE);
        }

        let size = width as usize * 4 * height as usize;
        let mut buffer = match SharedBuffer::create(&self.kernel, size) {
            Ok(buffer) => buffer,
            Err(err) => {
                klog_warn!("displayd: shm for {}x{} surface failed: {:?}", width, height, err);
                return reject(self, status::SHM_FAILED);
            }
        };
        let client_handle = match self.kernel.handle_dup(buffer.handle()) {
            Ok(h) => h,
            Err(err) => {
                klog_warn!("displayd: handle_dup failed: {}", err);
                buffer.release(&self.kernel);
                return reject(self, status::SHM_FAILED);
            }
        };
        buffer.pixels_mut().fill(COLOR_DESKTOP.to_u32());

        let id = self.registry.allocate_id();
        let mut surf = Surface::new(id, width, height, buffer);
        surf.flags = flags;
        surf.title = title;
        surf.event_channel = event_channel;
        if surf.is_system() {
            surf.x = 0;
            surf.y = MENU_BAR_HEIGHT;
        } else {
            (surf.x, surf.y) = cascade_position(id);
        }
        let stride = surf.stride;
        let system = surf.is_system();

        if let Err(surf) = self.registry.insert(surf) {
            let _ = self.kernel.shm_close(client_handle);
            self.release_surface(surf);
            return fail(status::NO_SURFACE);
        }
        klog_debug!("displayd: created surface {} ({}x{})", id, width, height);

        if !system {
            // Focused silently; only the previous holder hears about it.
            let change = self.registry.set_focus(id);
            self.post_focus_change(FocusChange {
                gained: None,
                ..change
            });
        }
        self.request_composite();
        Response {
            reply: Reply::CreateSurface {
                status: status::OK,
                surface_id: id,
                stride,
            },
            handle: Some(client_handle),
        }
    }

    fn present(&mut self, id: u32, damage: DamageRect) -> Response {
        let Some(surf) = self.registry.get(id) else {
            return generic(status::NO_SURFACE);
        };
        let content = surf.content_rect();
        let area = if damage.is_valid() {
            damage.offset(content.x0, content.y0)
        } else {
            content
        };
        self.add_damage(area);
        generic(status::OK)
    }

    fn set_geometry(&mut self, id: u32, x: i32, y: i32) -> Response {
        let Some(surf) = self.registry.get_mut(id) else {
            return generic(status::NO_SURFACE);
        };
        surf.x = x;
        surf.y = if surf.is_decorated() {
            y.max(MIN_WINDOW_Y)
        } else {
            y
        };
        self.request_composite();
        generic(status::OK)
    }

    fn subscribe(&mut self, id: u32, channel: Option<Handle>) -> Response {
        let Some(channel) = channel else {
            return generic(status::INVALID_ARGUMENT);
        };
        let Some(surf) = self.registry.get_mut(id) else {
            let _ = self.kernel.channel_close(channel);
            return generic(status::NO_SURFACE);
        };
        if let Some(old) = surf.event_channel.replace(channel) {
            let _ = self.kernel.channel_close(old);
        }
        self.flush_queue(id);
        generic(status::OK)
    }

    fn list_windows(&mut self) -> Response {
        let focused = self.registry.focused_id();
        let mut windows = WindowList::default();
        for surf in self.registry.iter().filter(|s| !s.is_system()) {
            let info = WindowInfo {
                surface_id: surf.id,
                flags: surf.flags,
                minimized: surf.minimized,
                maximized: surf.maximized,
                focused: surf.id == focused,
                title: surf.title,
            };
            if !windows.push(info) {
                break;
            }
        }
        Reply::ListWindows {
            status: status::OK,
            windows,
        }
        .into()
    }

    fn restore_window(&mut self, id: u32) -> Response {
        let Some(surf) = self.registry.get_mut(id) else {
            return generic(status::NO_SURFACE);
        };
        surf.minimized = false;
        if surf.is_system() {
            self.request_composite();
            return generic(status::OK);
        }
        self.registry.bring_to_front(id);
        let change = self.registry.set_focus(id);
        self.post_focus_change(change);
        self.request_composite();
        generic(status::OK)
    }
}
