//! Event delivery.
//!
//! A subscribed surface gets each event as its own message on its event
//! channel. Before subscription events wait in the surface's bounded queue
//! (oldest dropped on overflow) and are flushed in order when the channel
//! arrives. A send that fails with `PEER_CLOSED` means the owner is gone:
//! the surface is destroyed.

use viper_abi::event::{EVENT_MSG_SIZE, Event};
use viper_lib::{klog_debug, klog_info};

use super::DisplayServer;
use super::registry::FocusChange;
use super::surface::QueuedEvent;
use crate::syscall::{Handle, Kernel, SyscallError, SyscallResult};

/// Encode and send one event. On failure the attached handle is closed.
fn send_event<K: Kernel>(
    kernel: &K,
    channel: Handle,
    event: &Event,
    handle: Option<Handle>,
) -> SyscallResult<()> {
    let mut buf = [0u8; EVENT_MSG_SIZE];
    let result = match event.encode(&mut buf) {
        Ok(len) => kernel.channel_send(channel, &buf[..len], handle.as_slice()),
        Err(_) => Err(SyscallError::INVALID_ARG),
    };
    if result.is_err() {
        if let Some(h) = handle {
            let _ = kernel.shm_close(h);
        }
    }
    result
}

impl<K: Kernel> DisplayServer<K> {
    pub(crate) fn post_event(&mut self, event: Event) {
        self.post(event, None);
    }

    /// Post an event that carries a kernel handle (Resize).
    pub(crate) fn post_event_with_handle(&mut self, event: Event, handle: Handle) {
        self.post(event, Some(handle));
    }

    fn post(&mut self, event: Event, handle: Option<Handle>) {
        let id = event.surface_id();
        let Some(surf) = self.registry.get_mut(id) else {
            if let Some(h) = handle {
                let _ = self.kernel.shm_close(h);
            }
            return;
        };

        let Some(channel) = surf.event_channel else {
            let evicted = surf.queue.push_overwrite(Some(QueuedEvent { event, handle }));
            if let Some(old) = evicted.flatten() {
                klog_debug!("displayd: event queue full for surface {}, dropping oldest", id);
                if let Some(h) = old.handle {
                    let _ = self.kernel.shm_close(h);
                }
            }
            return;
        };

        if let Err(err) = send_event(&self.kernel, channel, &event, handle) {
            self.on_send_failure(id, err);
        }
    }

    fn on_send_failure(&mut self, id: u32, err: SyscallError) {
        if err == SyscallError::PEER_CLOSED {
            klog_info!("displayd: owner of surface {} went away, reaping", id);
            self.destroy_surface(id);
        } else {
            klog_debug!("displayd: event to surface {} dropped: {}", id, err);
        }
    }

    /// Send everything queued for `id` to its freshly attached channel.
    pub(crate) fn flush_queue(&mut self, id: u32) {
        loop {
            let Some(surf) = self.registry.get_mut(id) else {
                return;
            };
            let Some(channel) = surf.event_channel else {
                return;
            };
            let Some(queued) = surf.queue.try_pop().flatten() else {
                return;
            };
            if let Err(err) = send_event(&self.kernel, channel, &queued.event, queued.handle) {
                self.on_send_failure(id, err);
                if err == SyscallError::PEER_CLOSED {
                    return;
                }
            }
        }
    }

    /// Oldest queued event for the legacy poll path.
    pub(crate) fn pop_queued(&mut self, id: u32) -> Option<QueuedEvent> {
        self.registry.get_mut(id)?.queue.try_pop().flatten()
    }

    pub(crate) fn post_focus_change(&mut self, change: FocusChange) {
        if let Some(id) = change.lost {
            self.post_event(Event::Focus {
                surface_id: id,
                gained: false,
            });
        }
        if let Some(id) = change.gained {
            self.post_event(Event::Focus {
                surface_id: id,
                gained: true,
            });
        }
        if !change.is_empty() {
            self.request_composite();
        }
    }
}
