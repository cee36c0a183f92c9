//! Receiving events for a window.
//!
//! Events normally arrive on the window's own channel. A `Resize` carries
//! the handle of the replacement pixel buffer; it is mapped and swapped in
//! before the event reaches the caller.

pub use viper_abi::event::{Event, MouseEventKind};

use viper_abi::event::EVENT_MSG_SIZE;
use viper_abi::protocol::{Reply, Request};
use viper_abi::wire::MAX_HANDLES;
use viper_lib::klog_warn;

use super::{Display, GuiError, GuiResult, Window};
use crate::syscall::{Handle, Kernel, SharedBuffer, SyscallError};

impl<K: Kernel> Display<K> {
    /// Next event for `window`, or `None` after yielding once.
    pub fn poll_event(&mut self, window: &mut Window) -> GuiResult<Option<Event>> {
        let received = match window.events {
            Some(channel) => self.recv_event(channel)?,
            None => self.poll_legacy(window.id())?,
        };
        let Some((event, handle)) = received else {
            self.kernel.yield_now();
            return Ok(None);
        };
        if let Event::Resize {
            width,
            height,
            stride,
            ..
        } = event
        {
            self.apply_resize(window, width, height, stride, handle)?;
        } else if let Some(h) = handle {
            let _ = self.kernel.shm_close(h);
        }
        Ok(Some(event))
    }

    /// Block until an event arrives.
    pub fn wait_event(&mut self, window: &mut Window) -> GuiResult<Event> {
        loop {
            if let Some(event) = self.poll_event(window)? {
                return Ok(event);
            }
        }
    }

    fn recv_event(&self, channel: Handle) -> GuiResult<Option<(Event, Option<Handle>)>> {
        let mut buf = [0u8; EVENT_MSG_SIZE];
        let mut handles = [Handle::from_raw(0); MAX_HANDLES];
        let received = match self.kernel.channel_recv(channel, &mut buf, &mut handles) {
            Ok(received) => received,
            Err(SyscallError::WOULD_BLOCK) => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let count = received.handle_count.min(MAX_HANDLES);
        for &h in handles[..count].iter().skip(1) {
            let _ = self.kernel.shm_close(h);
        }
        let handle = handles[..count].first().copied();
        match Event::decode(&buf[..received.len]) {
            Ok(event) => Ok(Some((event, handle))),
            Err(err) => {
                if let Some(h) = handle {
                    let _ = self.kernel.shm_close(h);
                }
                Err(err.into())
            }
        }
    }

    fn poll_legacy(&mut self, surface_id: u32) -> GuiResult<Option<(Event, Option<Handle>)>> {
        match self.send_request_recv_reply(&Request::PollEvent { surface_id }, &[])? {
            (Reply::PollEvent { event: Some(event) }, handle) => Ok(Some((event, handle))),
            (_, handle) => {
                if let Some(h) = handle {
                    let _ = self.kernel.shm_close(h);
                }
                Ok(None)
            }
        }
    }

    fn apply_resize(
        &self,
        window: &mut Window,
        width: u32,
        height: u32,
        stride: u32,
        handle: Option<Handle>,
    ) -> GuiResult<()> {
        let Some(handle) = handle else {
            klog_warn!("libgui: resize of surface {} without a buffer", window.id());
            return Err(GuiError::Protocol);
        };
        let buffer = SharedBuffer::map(&self.kernel, handle).map_err(|_| GuiError::ShmFailed)?;
        if stride < width * 4 || buffer.len_bytes() < stride as usize * height as usize {
            buffer.release(&self.kernel);
            return Err(GuiError::BadSize);
        }
        let old = window.replace_buffer(buffer, width, height, stride);
        old.release(&self.kernel);
        Ok(())
    }
}
