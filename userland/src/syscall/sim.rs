//! In-memory kernel.
//!
//! `SimKernel` implements [`Kernel`] inside one address space so the server
//! and any number of clients can run in a single test process. Cloning a
//! `SimKernel` yields another view of the same kernel.
//!
//! Handles live in one global namespace and are reference counted per
//! object: every channel send end, receive end and shared-memory handle is
//! its own entry, and transferring a handle through a channel moves the
//! entry rather than copying it.

use alloc::boxed::Box;
use alloc::collections::{BTreeMap, VecDeque};
use alloc::rc::Rc;
use alloc::string::String;
use alloc::vec;
use alloc::vec::Vec;

use spin::Mutex;
use viper_abi::window::MouseButtons;
use viper_abi::wire::{MAX_HANDLES, MAX_PAYLOAD};

use super::{
    FramebufferInfo, Handle, KeyEvent, Kernel, Mapping, MouseState, Received, SyscallError,
    SyscallResult,
};

type IdleHook = Box<dyn FnMut()>;

#[derive(Clone, Copy, Debug)]
pub struct SimConfig {
    pub width: u32,
    pub height: u32,
    /// Bytes per framebuffer row; rounded up to at least `width * 4`.
    pub pitch: u32,
    pub hw_cursor: bool,
    /// Total bytes of live shared memory allowed, `None` for unlimited.
    pub shm_limit: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            pitch: 640 * 4,
            hw_cursor: false,
            shm_limit: None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Object {
    ChannelSend(usize),
    ChannelRecv(usize),
    Shm(usize),
}

struct SimMessage {
    data: Vec<u8>,
    objects: Vec<Object>,
}

struct SimChannel {
    queue: VecDeque<SimMessage>,
    senders: u32,
    receiver_open: bool,
}

struct SimRegion {
    /// Owned allocation from `Box::into_raw`; null once freed.
    ptr: *mut u32,
    words: usize,
    handles: u32,
    maps: u32,
}

impl SimRegion {
    fn is_live(&self) -> bool {
        !self.ptr.is_null()
    }

    fn free(&mut self) {
        if self.ptr.is_null() {
            return;
        }
        let slice = core::ptr::slice_from_raw_parts_mut(self.ptr, self.words);
        // SAFETY: `ptr`/`words` came from `Box::<[u32]>::into_raw` and the
        // region has not been freed yet.
        drop(unsafe { Box::from_raw(slice) });
        self.ptr = core::ptr::null_mut();
    }
}

struct SimState {
    next_handle: u32,
    handles: BTreeMap<u32, Object>,
    channels: Vec<SimChannel>,
    regions: Vec<SimRegion>,
    shm_bytes: usize,
    shm_limit: Option<usize>,
    assigns: BTreeMap<String, Object>,
    fb_info: FramebufferInfo,
    fb_region: usize,
    mouse: MouseState,
    mouse_bounds: (u32, u32),
    keys: VecDeque<KeyEvent>,
    hw_cursor_supported: bool,
    cursor_image: Option<(u32, u32)>,
    hw_cursor_pos: Option<(i32, i32)>,
    uptime_ms: u64,
}

impl SimState {
    fn alloc_region(&mut self, words: usize) -> usize {
        let boxed = vec![0u32; words].into_boxed_slice();
        let ptr = Box::into_raw(boxed) as *mut u32;
        self.regions.push(SimRegion {
            ptr,
            words,
            handles: 0,
            maps: 0,
        });
        self.regions.len() - 1
    }

    fn install(&mut self, object: Object) -> Handle {
        let raw = self.next_handle;
        self.next_handle += 1;
        self.handles.insert(raw, object);
        Handle::from_raw(raw)
    }

    fn lookup(&self, handle: Handle) -> SyscallResult<Object> {
        self.handles
            .get(&handle.raw())
            .copied()
            .ok_or(SyscallError::INVALID_HANDLE)
    }

    fn retain(&mut self, object: Object) {
        match object {
            Object::ChannelSend(c) => self.channels[c].senders += 1,
            Object::ChannelRecv(c) => self.channels[c].receiver_open = true,
            Object::Shm(r) => self.regions[r].handles += 1,
        }
    }

    fn release(&mut self, object: Object) {
        match object {
            Object::ChannelSend(c) => {
                let ch = &mut self.channels[c];
                ch.senders = ch.senders.saturating_sub(1);
            }
            Object::ChannelRecv(c) => {
                let ch = &mut self.channels[c];
                ch.receiver_open = false;
                let orphaned: Vec<SimMessage> = ch.queue.drain(..).collect();
                for msg in orphaned {
                    for obj in msg.objects {
                        self.release(obj);
                    }
                }
            }
            Object::Shm(r) => {
                self.regions[r].handles = self.regions[r].handles.saturating_sub(1);
                self.maybe_free_region(r);
            }
        }
    }

    fn maybe_free_region(&mut self, r: usize) {
        if r == self.fb_region {
            return;
        }
        let region = &mut self.regions[r];
        if region.handles == 0 && region.maps == 0 && region.is_live() {
            self.shm_bytes = self.shm_bytes.saturating_sub(region.words * 4);
            region.free();
        }
    }

    fn close(&mut self, handle: Handle) -> SyscallResult<Object> {
        let object = self
            .handles
            .remove(&handle.raw())
            .ok_or(SyscallError::INVALID_HANDLE)?;
        self.release(object);
        Ok(object)
    }
}

struct SimInner {
    state: Mutex<SimState>,
    idle_hook: Mutex<Option<IdleHook>>,
}

impl Drop for SimInner {
    fn drop(&mut self) {
        for region in self.state.get_mut().regions.iter_mut() {
            region.free();
        }
    }
}

#[derive(Clone)]
pub struct SimKernel {
    inner: Rc<SimInner>,
}

impl SimKernel {
    pub fn new(config: SimConfig) -> Self {
        let pitch = config.pitch.max(config.width * 4);
        let info = FramebufferInfo {
            width: config.width,
            height: config.height,
            pitch,
        };
        let mut state = SimState {
            next_handle: 1,
            handles: BTreeMap::new(),
            channels: Vec::new(),
            regions: Vec::new(),
            shm_bytes: 0,
            shm_limit: config.shm_limit,
            assigns: BTreeMap::new(),
            fb_info: info,
            fb_region: 0,
            mouse: MouseState::default(),
            mouse_bounds: (config.width, config.height),
            keys: VecDeque::new(),
            hw_cursor_supported: config.hw_cursor,
            cursor_image: None,
            hw_cursor_pos: None,
            uptime_ms: 0,
        };
        state.fb_region = state.alloc_region(info.stride() * info.height as usize);
        Self {
            inner: Rc::new(SimInner {
                state: Mutex::new(state),
                idle_hook: Mutex::new(None),
            }),
        }
    }

    /// Run `hook` whenever any user of this kernel sleeps or yields. The
    /// hook is not re-entered if it sleeps itself.
    pub fn set_idle_hook(&self, hook: impl FnMut() + 'static) {
        *self.inner.idle_hook.lock() = Some(Box::new(hook));
    }

    pub fn clear_idle_hook(&self) {
        *self.inner.idle_hook.lock() = None;
    }

    fn run_idle_hook(&self) {
        let taken = self.inner.idle_hook.lock().take();
        if let Some(mut hook) = taken {
            hook();
            let mut slot = self.inner.idle_hook.lock();
            if slot.is_none() {
                *slot = Some(hook);
            }
        }
    }

    /// Move the mouse; the position is clamped to the current bounds.
    pub fn set_mouse(&self, x: i32, y: i32, buttons: MouseButtons) {
        let mut st = self.inner.state.lock();
        let (w, h) = st.mouse_bounds;
        st.mouse = MouseState {
            x: x.clamp(0, w.saturating_sub(1) as i32),
            y: y.clamp(0, h.saturating_sub(1) as i32),
            buttons,
        };
    }

    pub fn push_key(&self, event: KeyEvent) {
        self.inner.state.lock().keys.push_back(event);
    }

    /// Framebuffer pixel as scanned out, or `None` off screen.
    pub fn framebuffer_pixel(&self, x: u32, y: u32) -> Option<u32> {
        let st = self.inner.state.lock();
        let info = st.fb_info;
        if x >= info.width || y >= info.height {
            return None;
        }
        let region = &st.regions[st.fb_region];
        let idx = y as usize * info.stride() + x as usize;
        if idx >= region.words {
            return None;
        }
        // SAFETY: the framebuffer region lives as long as the kernel and
        // `idx` is in bounds.
        Some(unsafe { region.ptr.add(idx).read() })
    }

    pub fn framebuffer_info(&self) -> FramebufferInfo {
        self.inner.state.lock().fb_info
    }

    pub fn hw_cursor_position(&self) -> Option<(i32, i32)> {
        self.inner.state.lock().hw_cursor_pos
    }

    pub fn cursor_image_size(&self) -> Option<(u32, u32)> {
        self.inner.state.lock().cursor_image
    }

    pub fn open_handles(&self) -> usize {
        self.inner.state.lock().handles.len()
    }

    /// Shared-memory objects still allocated, framebuffer excluded.
    pub fn live_shm_objects(&self) -> usize {
        let st = self.inner.state.lock();
        st.regions
            .iter()
            .enumerate()
            .filter(|(i, r)| *i != st.fb_region && r.is_live())
            .count()
    }

    /// Outstanding shared-memory mappings, framebuffer excluded.
    pub fn active_mappings(&self) -> usize {
        let st = self.inner.state.lock();
        st.regions
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != st.fb_region)
            .map(|(_, r)| r.maps as usize)
            .sum()
    }

    /// Messages waiting on the channel whose receive end is `recv`.
    pub fn pending_messages(&self, recv: Handle) -> usize {
        let st = self.inner.state.lock();
        match st.handles.get(&recv.raw()) {
            Some(Object::ChannelRecv(c)) => st.channels[*c].queue.len(),
            _ => 0,
        }
    }

    pub fn set_shm_limit(&self, limit: Option<usize>) {
        self.inner.state.lock().shm_limit = limit;
    }
}

impl Default for SimKernel {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl Kernel for SimKernel {
    fn channel_create(&self) -> SyscallResult<(Handle, Handle)> {
        let mut st = self.inner.state.lock();
        st.channels.push(SimChannel {
            queue: VecDeque::new(),
            senders: 0,
            receiver_open: false,
        });
        let idx = st.channels.len() - 1;
        st.retain(Object::ChannelSend(idx));
        st.retain(Object::ChannelRecv(idx));
        let send = st.install(Object::ChannelSend(idx));
        let recv = st.install(Object::ChannelRecv(idx));
        Ok((send, recv))
    }

    fn channel_send(&self, channel: Handle, data: &[u8], handles: &[Handle]) -> SyscallResult<()> {
        if data.len() > MAX_PAYLOAD || handles.len() > MAX_HANDLES {
            return Err(SyscallError::MESSAGE_TOO_LARGE);
        }
        let mut st = self.inner.state.lock();
        let Object::ChannelSend(c) = st.lookup(channel)? else {
            return Err(SyscallError::INVALID_HANDLE);
        };
        if !st.channels[c].receiver_open {
            return Err(SyscallError::PEER_CLOSED);
        }
        for (i, h) in handles.iter().enumerate() {
            if *h == channel || handles[..i].contains(h) {
                return Err(SyscallError::INVALID_ARG);
            }
            st.lookup(*h)?;
        }
        let mut objects = Vec::with_capacity(handles.len());
        for h in handles {
            if let Some(obj) = st.handles.remove(&h.raw()) {
                objects.push(obj);
            }
        }
        st.channels[c].queue.push_back(SimMessage {
            data: data.to_vec(),
            objects,
        });
        Ok(())
    }

    fn channel_recv(
        &self,
        channel: Handle,
        buf: &mut [u8],
        handles: &mut [Handle; MAX_HANDLES],
    ) -> SyscallResult<Received> {
        let mut st = self.inner.state.lock();
        let Object::ChannelRecv(c) = st.lookup(channel)? else {
            return Err(SyscallError::INVALID_HANDLE);
        };
        let ch = &mut st.channels[c];
        let Some(front) = ch.queue.front() else {
            return Err(if ch.senders == 0 {
                SyscallError::PEER_CLOSED
            } else {
                SyscallError::WOULD_BLOCK
            });
        };
        if front.data.len() > buf.len() {
            return Err(SyscallError::MESSAGE_TOO_LARGE);
        }
        let Some(msg) = ch.queue.pop_front() else {
            return Err(SyscallError::WOULD_BLOCK);
        };
        buf[..msg.data.len()].copy_from_slice(&msg.data);
        let handle_count = msg.objects.len();
        for (slot, obj) in handles.iter_mut().zip(msg.objects) {
            *slot = st.install(obj);
        }
        Ok(Received {
            len: msg.data.len(),
            handle_count,
        })
    }

    fn channel_close(&self, channel: Handle) -> SyscallResult<()> {
        let mut st = self.inner.state.lock();
        match st.lookup(channel)? {
            Object::ChannelSend(_) | Object::ChannelRecv(_) => st.close(channel).map(|_| ()),
            Object::Shm(_) => Err(SyscallError::INVALID_HANDLE),
        }
    }

    fn shm_create(&self, size: usize) -> SyscallResult<Handle> {
        if size == 0 {
            return Err(SyscallError::INVALID_ARG);
        }
        let words = size.div_ceil(4);
        let mut st = self.inner.state.lock();
        if let Some(limit) = st.shm_limit {
            if st.shm_bytes + words * 4 > limit {
                return Err(SyscallError::NO_MEMORY);
            }
        }
        let r = st.alloc_region(words);
        st.shm_bytes += words * 4;
        st.retain(Object::Shm(r));
        Ok(st.install(Object::Shm(r)))
    }

    fn shm_map(&self, shm: Handle) -> SyscallResult<Mapping> {
        let mut st = self.inner.state.lock();
        let Object::Shm(r) = st.lookup(shm)? else {
            return Err(SyscallError::INVALID_HANDLE);
        };
        let region = &mut st.regions[r];
        // SAFETY: the region stays allocated while `maps > 0`.
        let mapping = unsafe { Mapping::from_raw(region.ptr, region.words) }
            .ok_or(SyscallError::INVALID_HANDLE)?;
        region.maps += 1;
        Ok(mapping)
    }

    fn shm_unmap(&self, mapping: Mapping) -> SyscallResult<()> {
        let mut st = self.inner.state.lock();
        let fb = st.fb_region;
        let found = st
            .regions
            .iter()
            .enumerate()
            .position(|(i, r)| i != fb && r.is_live() && r.ptr as usize == mapping.addr());
        let Some(r) = found else {
            return Err(SyscallError::INVALID_ARG);
        };
        if st.regions[r].maps == 0 {
            return Err(SyscallError::INVALID_ARG);
        }
        st.regions[r].maps -= 1;
        st.maybe_free_region(r);
        Ok(())
    }

    fn shm_close(&self, shm: Handle) -> SyscallResult<()> {
        let mut st = self.inner.state.lock();
        match st.lookup(shm)? {
            Object::Shm(_) => st.close(shm).map(|_| ()),
            _ => Err(SyscallError::INVALID_HANDLE),
        }
    }

    fn handle_dup(&self, handle: Handle) -> SyscallResult<Handle> {
        let mut st = self.inner.state.lock();
        let object = st.lookup(handle)?;
        if let Object::ChannelRecv(_) = object {
            return Err(SyscallError::INVALID_ARG);
        }
        st.retain(object);
        Ok(st.install(object))
    }

    fn map_framebuffer(&self) -> SyscallResult<(FramebufferInfo, Mapping)> {
        let st = self.inner.state.lock();
        let region = &st.regions[st.fb_region];
        // SAFETY: the framebuffer region is never freed before the kernel.
        let mapping = unsafe { Mapping::from_raw(region.ptr, region.words) }
            .ok_or(SyscallError::NOT_FOUND)?;
        Ok((st.fb_info, mapping))
    }

    fn set_mouse_bounds(&self, width: u32, height: u32) -> SyscallResult<()> {
        if width == 0 || height == 0 {
            return Err(SyscallError::INVALID_ARG);
        }
        self.inner.state.lock().mouse_bounds = (width, height);
        Ok(())
    }

    fn mouse_state(&self) -> SyscallResult<MouseState> {
        Ok(self.inner.state.lock().mouse)
    }

    fn input_has_event(&self) -> bool {
        !self.inner.state.lock().keys.is_empty()
    }

    fn input_get_event(&self) -> Option<KeyEvent> {
        self.inner.state.lock().keys.pop_front()
    }

    fn set_cursor_image(
        &self,
        pixels: &[u32],
        width: u32,
        height: u32,
        _hot_x: u32,
        _hot_y: u32,
    ) -> SyscallResult<()> {
        let mut st = self.inner.state.lock();
        if !st.hw_cursor_supported {
            return Err(SyscallError::NOT_SUPPORTED);
        }
        if pixels.len() < (width * height) as usize {
            return Err(SyscallError::INVALID_ARG);
        }
        st.cursor_image = Some((width, height));
        Ok(())
    }

    fn move_hw_cursor(&self, x: i32, y: i32) -> SyscallResult<()> {
        let mut st = self.inner.state.lock();
        if st.cursor_image.is_none() {
            return Err(SyscallError::NOT_SUPPORTED);
        }
        st.hw_cursor_pos = Some((x, y));
        Ok(())
    }

    fn assign_set(&self, name: &str, handle: Handle) -> SyscallResult<()> {
        let mut st = self.inner.state.lock();
        if st.assigns.contains_key(name) {
            return Err(SyscallError::ALREADY_EXISTS);
        }
        let object = st.lookup(handle)?;
        if let Object::ChannelRecv(_) = object {
            return Err(SyscallError::INVALID_ARG);
        }
        st.retain(object);
        st.assigns.insert(String::from(name), object);
        Ok(())
    }

    fn assign_get(&self, name: &str) -> SyscallResult<Handle> {
        let mut st = self.inner.state.lock();
        let object = *st.assigns.get(name).ok_or(SyscallError::NOT_FOUND)?;
        st.retain(object);
        Ok(st.install(object))
    }

    fn sleep_ms(&self, ms: u64) {
        self.inner.state.lock().uptime_ms += ms;
        self.run_idle_hook();
    }

    fn yield_now(&self) {
        self.run_idle_hook();
    }

    fn uptime_ms(&self) -> u64 {
        self.inner.state.lock().uptime_ms
    }
}
