//! libgui: client side of the display protocol.
//!
//! A [`Display`] is one connection to the `DISPLAY` service. Every request
//! travels with a freshly created reply channel whose send end is attached
//! as handle 0; the call then polls the receive end until the reply arrives
//! or the deadline passes. Each [`Window`] owns its mapped pixel buffer and
//! the receive end of its event channel.
//!
//! All calls on one `Display` must come from one thread.

pub mod control;
pub mod event;
pub mod window;

pub use control::DisplayInfo;
pub use window::Window;

use core::fmt;

use viper_abi::damage::DamageRect;
use viper_abi::protocol::{DISPLAY_ASSIGN, Envelope, Reply, Request, status};
use viper_abi::window::{SurfaceFlags, Title};
use viper_abi::wire::{MAX_HANDLES, MAX_PAYLOAD, ProtocolError};
use viper_lib::{klog_debug, klog_warn};

use crate::syscall::{Handle, Kernel, SharedBuffer, SyscallError};

/// Reply polls before a request times out.
pub const REPLY_POLL_ATTEMPTS: u32 = 500;
/// Sleep between reply polls.
pub const REPLY_POLL_INTERVAL_MS: u64 = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GuiError {
    /// `DISPLAY` is not registered.
    NoDisplay,
    /// No reply within the polling deadline.
    Timeout,
    Channel(SyscallError),
    /// Undecodable, unexpected or mismatched reply.
    Protocol,
    /// The server answered with a non-zero status.
    Status(i32),
    ShmFailed,
    BadSize,
}

impl fmt::Display for GuiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoDisplay => write!(f, "display service not found"),
            Self::Timeout => write!(f, "display server did not reply"),
            Self::Channel(err) => write!(f, "channel error: {}", err),
            Self::Protocol => write!(f, "malformed reply"),
            Self::Status(code) => write!(f, "request failed with status {}", code),
            Self::ShmFailed => write!(f, "shared memory mapping failed"),
            Self::BadSize => write!(f, "invalid window size"),
        }
    }
}

impl From<ProtocolError> for GuiError {
    fn from(_: ProtocolError) -> Self {
        Self::Protocol
    }
}

impl From<SyscallError> for GuiError {
    fn from(err: SyscallError) -> Self {
        Self::Channel(err)
    }
}

pub type GuiResult<T> = Result<T, GuiError>;

fn check_status(status: i32) -> GuiResult<()> {
    if status == status::OK {
        Ok(())
    } else {
        Err(GuiError::Status(status))
    }
}

pub struct Display<K: Kernel> {
    kernel: K,
    service: Handle,
    next_request_id: u32,
}

impl<K: Kernel> Display<K> {
    /// Look up the `DISPLAY` service.
    pub fn connect(kernel: K) -> GuiResult<Self> {
        let service = kernel
            .assign_get(DISPLAY_ASSIGN)
            .map_err(|_| GuiError::NoDisplay)?;
        Ok(Self {
            kernel,
            service,
            next_request_id: 1,
        })
    }

    /// Close the service connection. Windows must be destroyed first.
    pub fn shutdown(self) {
        let _ = self.kernel.channel_close(self.service);
    }

    #[inline]
    pub fn kernel(&self) -> &K {
        &self.kernel
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_request_id;
        self.next_request_id = self.next_request_id.wrapping_add(1).max(1);
        id
    }

    fn close_all(&self, handles: &[Handle]) {
        for &h in handles {
            if self.kernel.channel_close(h).is_err() {
                let _ = self.kernel.shm_close(h);
            }
        }
    }

    /// Send `request` with a private reply channel and wait for the answer.
    /// `extra` handles travel after the reply channel and are consumed
    /// whether or not the request succeeds. Returns the reply and the first
    /// handle attached to it.
    pub fn send_request_recv_reply(
        &mut self,
        request: &Request,
        extra: &[Handle],
    ) -> GuiResult<(Reply, Option<Handle>)> {
        let request_id = self.next_id();
        let mut buf = [0u8; MAX_PAYLOAD];
        let len = match request.encode(request_id, &mut buf) {
            Ok(len) => len,
            Err(err) => {
                self.close_all(extra);
                return Err(err.into());
            }
        };
        if extra.len() >= MAX_HANDLES {
            self.close_all(extra);
            return Err(GuiError::Protocol);
        }

        let (reply_send, reply_recv) = match self.kernel.channel_create() {
            Ok(pair) => pair,
            Err(err) => {
                self.close_all(extra);
                return Err(err.into());
            }
        };
        let mut attached = [reply_send; MAX_HANDLES];
        attached[1..=extra.len()].copy_from_slice(extra);
        if let Err(err) =
            self.kernel
                .channel_send(self.service, &buf[..len], &attached[..=extra.len()])
        {
            self.close_all(&attached[..=extra.len()]);
            let _ = self.kernel.channel_close(reply_recv);
            return Err(err.into());
        }

        let result = self.await_reply(reply_recv, request_id, &mut buf);
        let _ = self.kernel.channel_close(reply_recv);
        result
    }

    fn await_reply(
        &self,
        channel: Handle,
        request_id: u32,
        buf: &mut [u8],
    ) -> GuiResult<(Reply, Option<Handle>)> {
        for _ in 0..REPLY_POLL_ATTEMPTS {
            let mut handles = [Handle::from_raw(0); MAX_HANDLES];
            match self.kernel.channel_recv(channel, buf, &mut handles) {
                Ok(received) => {
                    let count = received.handle_count.min(MAX_HANDLES);
                    let (first, rest) = match handles[..count].split_first() {
                        Some((first, rest)) => (Some(*first), rest),
                        None => (None, &[][..]),
                    };
                    self.close_all(rest);
                    let decoded = Reply::decode(&buf[..received.len]);
                    return match decoded {
                        Ok(Envelope { request_id: id, body }) if id == request_id => Ok((body, first)),
                        other => {
                            klog_debug!("libgui: bad reply to request {}: {:?}", request_id, other);
                            if let Some(h) = first {
                                self.close_all(&[h]);
                            }
                            Err(GuiError::Protocol)
                        }
                    };
                }
                Err(SyscallError::WOULD_BLOCK) => self.kernel.sleep_ms(REPLY_POLL_INTERVAL_MS),
                Err(err) => return Err(err.into()),
            }
        }
        klog_warn!("libgui: request {} timed out", request_id);
        Err(GuiError::Timeout)
    }

    /// Send a request that expects no reply.
    pub fn send_async(&mut self, request: &Request) -> GuiResult<()> {
        let request_id = self.next_id();
        let mut buf = [0u8; MAX_PAYLOAD];
        let len = request.encode(request_id, &mut buf)?;
        self.kernel.channel_send(self.service, &buf[..len], &[])?;
        Ok(())
    }

    /// Request whose reply carries only a status.
    fn request_generic(&mut self, request: &Request, extra: &[Handle]) -> GuiResult<()> {
        match self.send_request_recv_reply(request, extra)? {
            (Reply::Generic { status }, handle) => {
                if let Some(h) = handle {
                    self.close_all(&[h]);
                }
                check_status(status)
            }
            (_, handle) => {
                if let Some(h) = handle {
                    self.close_all(&[h]);
                }
                Err(GuiError::Protocol)
            }
        }
    }

    pub fn create_window(&mut self, title: &str, width: u32, height: u32) -> GuiResult<Window> {
        self.create_window_with_flags(title, width, height, SurfaceFlags::empty())
    }

    /// Create a surface, map its pixels and subscribe to its events. When the
    /// subscription fails the window falls back to `POLL_EVENT`.
    pub fn create_window_with_flags(
        &mut self,
        title: &str,
        width: u32,
        height: u32,
        flags: SurfaceFlags,
    ) -> GuiResult<Window> {
        if width == 0 || height == 0 {
            return Err(GuiError::BadSize);
        }
        let title = Title::new(title);
        let request = Request::CreateSurface {
            width,
            height,
            flags,
            title,
        };
        let (surface_id, stride, handle) = match self.send_request_recv_reply(&request, &[])? {
            (
                Reply::CreateSurface {
                    status,
                    surface_id,
                    stride,
                },
                handle,
            ) if status == status::OK => (surface_id, stride, handle),
            (reply, handle) => {
                if let Some(h) = handle {
                    self.close_all(&[h]);
                }
                return match reply {
                    Reply::CreateSurface { status, .. } => Err(GuiError::Status(status)),
                    _ => Err(GuiError::Protocol),
                };
            }
        };
        let Some(handle) = handle else {
            let _ = self.destroy_surface(surface_id);
            return Err(GuiError::Protocol);
        };

        let buffer = match SharedBuffer::map(&self.kernel, handle) {
            Ok(buffer) => buffer,
            Err(err) => {
                klog_warn!("libgui: mapping surface {} failed: {:?}", surface_id, err);
                let _ = self.destroy_surface(surface_id);
                return Err(GuiError::ShmFailed);
            }
        };
        if stride < width * 4 || buffer.len_bytes() < stride as usize * height as usize {
            buffer.release(&self.kernel);
            let _ = self.destroy_surface(surface_id);
            return Err(GuiError::BadSize);
        }

        let mut window = Window::new(surface_id, width, height, stride, buffer, title);
        match self.subscribe(surface_id) {
            Ok(channel) => window.events = Some(channel),
            Err(err) => klog_warn!(
                "libgui: event subscription for surface {} failed: {}",
                surface_id,
                err
            ),
        }
        Ok(window)
    }

    /// Hand the server the send end of a new event channel.
    fn subscribe(&mut self, surface_id: u32) -> GuiResult<Handle> {
        let (send, recv) = self.kernel.channel_create()?;
        match self.request_generic(&Request::SubscribeEvents { surface_id }, &[send]) {
            Ok(()) => Ok(recv),
            Err(err) => {
                let _ = self.kernel.channel_close(recv);
                Err(err)
            }
        }
    }

    fn destroy_surface(&mut self, surface_id: u32) -> GuiResult<()> {
        self.request_generic(&Request::DestroySurface { surface_id }, &[])
    }

    /// Destroy the surface and release everything the window holds.
    pub fn destroy_window(&mut self, window: Window) -> GuiResult<()> {
        let (id, buffer, events) = window.into_parts();
        let result = self.destroy_surface(id);
        buffer.release(&self.kernel);
        if let Some(channel) = events {
            let _ = self.kernel.channel_close(channel);
        }
        result
    }

    /// Ask for the whole window to be recomposited and wait for the ack.
    pub fn present(&mut self, window: &Window) -> GuiResult<()> {
        self.request_generic(
            &Request::Present {
                surface_id: window.id(),
                damage: DamageRect::invalid(),
            },
            &[],
        )
    }

    /// Present with a window-local damage hint.
    pub fn present_region(
        &mut self,
        window: &Window,
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    ) -> GuiResult<()> {
        self.request_generic(
            &Request::Present {
                surface_id: window.id(),
                damage: DamageRect::from_xywh(x, y, width, height),
            },
            &[],
        )
    }

    /// Present without waiting for the server.
    pub fn present_async(&mut self, window: &Window) -> GuiResult<()> {
        self.send_async(&Request::Present {
            surface_id: window.id(),
            damage: DamageRect::invalid(),
        })
    }
}
