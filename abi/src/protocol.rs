//! Display service request/reply protocol.
//!
//! A request is `[tag u32][request_id u32][body]`; the matching reply echoes
//! `request_id` verbatim. Handles travel out of band: handle 0 of every
//! request is the reply channel, any further handles belong to the request.
//! The tag space is closed and compiled in; there is no versioning.

use crate::damage::DamageRect;
use crate::event::{EVENT_MSG_SIZE, Event};
use crate::wire::{ProtocolError, WireReader, WireResult, WireWriter};
use crate::window::{
    FixedStr, MAX_LIST_WINDOWS, SurfaceFlags, TITLE_LEN, Title, WindowInfo,
};

/// Well-known assign under which the service channel is published.
pub const DISPLAY_ASSIGN: &str = "DISPLAY";

pub const MAX_MENUS: usize = 8;
pub const MAX_MENU_ITEMS: usize = 16;
pub const MENU_TITLE_LEN: usize = 24;
pub const MENU_LABEL_LEN: usize = 32;
pub const MENU_SHORTCUT_LEN: usize = 16;

pub mod tag {
    pub const GET_INFO: u32 = 1;
    pub const CREATE_SURFACE: u32 = 2;
    pub const DESTROY_SURFACE: u32 = 3;
    pub const PRESENT: u32 = 4;
    pub const SET_GEOMETRY: u32 = 5;
    pub const SET_VISIBLE: u32 = 6;
    pub const SET_TITLE: u32 = 7;
    pub const SUBSCRIBE_EVENTS: u32 = 10;
    pub const POLL_EVENT: u32 = 11;
    pub const LIST_WINDOWS: u32 = 12;
    pub const RESTORE_WINDOW: u32 = 13;
    pub const SET_SCROLLBAR: u32 = 14;
    pub const SET_MENU: u32 = 15;
    pub const REQUEST_FOCUS: u32 = 16;

    pub const INFO_REPLY: u32 = 0x81;
    pub const CREATE_SURFACE_REPLY: u32 = 0x82;
    pub const GENERIC_REPLY: u32 = 0x83;
    pub const POLL_EVENT_REPLY: u32 = 0x84;
    pub const LIST_WINDOWS_REPLY: u32 = 0x85;
}

pub mod status {
    pub const OK: i32 = 0;
    /// Surface table full, or no surface with the given id.
    pub const NO_SURFACE: i32 = -1;
    pub const SHM_FAILED: i32 = -2;
    pub const INVALID_ARGUMENT: i32 = -3;
}

pub type MenuTitle = FixedStr<MENU_TITLE_LEN>;
pub type MenuLabel = FixedStr<MENU_LABEL_LEN>;
pub type MenuShortcut = FixedStr<MENU_SHORTCUT_LEN>;

/// One row in a pulldown. `action == 0` never produces a menu event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MenuItem {
    pub label: MenuLabel,
    pub shortcut: MenuShortcut,
    pub action: u8,
    pub enabled: bool,
    pub checked: bool,
}

impl MenuItem {
    pub fn new(label: &str, shortcut: &str, action: u8) -> Self {
        Self {
            label: MenuLabel::new(label),
            shortcut: MenuShortcut::new(shortcut),
            action,
            enabled: true,
            checked: false,
        }
    }

    pub fn separator() -> Self {
        Self {
            label: MenuLabel::new("-"),
            ..Self::default()
        }
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub fn is_separator(&self) -> bool {
        self.label.is_empty() || self.label.as_str() == "-"
    }

    /// Rows the user can pick: enabled, not a separator, non-zero action.
    pub fn is_selectable(&self) -> bool {
        self.enabled && !self.is_separator() && self.action != 0
    }

    fn write_to(&self, w: &mut WireWriter<'_>) -> WireResult<()> {
        w.put_bytes(self.label.as_bytes())?;
        w.put_bytes(self.shortcut.as_bytes())?;
        w.put_u8(self.action)?;
        w.put_bool(self.enabled)?;
        w.put_bool(self.checked)?;
        w.pad(1)
    }

    fn read_from(r: &mut WireReader<'_>) -> WireResult<Self> {
        let label = MenuLabel::from_bytes(&r.get_array()?);
        let shortcut = MenuShortcut::from_bytes(&r.get_array()?);
        let action = r.get_u8()?;
        let enabled = r.get_bool()?;
        let checked = r.get_bool()?;
        r.skip(1)?;
        Ok(Self {
            label,
            shortcut,
            action,
            enabled,
            checked,
        })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MenuDef {
    pub title: MenuTitle,
    item_count: u8,
    items: [MenuItem; MAX_MENU_ITEMS],
}

impl MenuDef {
    pub fn new(title: &str) -> Self {
        Self {
            title: MenuTitle::new(title),
            ..Self::default()
        }
    }

    /// Append an item; returns false once the menu is full.
    pub fn push(&mut self, item: MenuItem) -> bool {
        let idx = self.item_count as usize;
        if idx >= MAX_MENU_ITEMS {
            return false;
        }
        self.items[idx] = item;
        self.item_count += 1;
        true
    }

    pub fn with_item(mut self, item: MenuItem) -> Self {
        self.push(item);
        self
    }

    pub fn items(&self) -> &[MenuItem] {
        &self.items[..self.item_count as usize]
    }

    fn write_to(&self, w: &mut WireWriter<'_>) -> WireResult<()> {
        w.put_bytes(self.title.as_bytes())?;
        w.put_u8(self.item_count)?;
        w.pad(3)?;
        for item in &self.items {
            item.write_to(w)?;
        }
        Ok(())
    }

    fn read_from(r: &mut WireReader<'_>) -> WireResult<Self> {
        let title = MenuTitle::from_bytes(&r.get_array()?);
        let item_count = r.get_u8()?.min(MAX_MENU_ITEMS as u8);
        r.skip(3)?;
        let mut items = [MenuItem::default(); MAX_MENU_ITEMS];
        for item in items.iter_mut() {
            *item = MenuItem::read_from(r)?;
        }
        Ok(Self {
            title,
            item_count,
            items,
        })
    }
}

/// Up to `MAX_MENUS` menu definitions for one surface.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MenuSet {
    count: u8,
    menus: [MenuDef; MAX_MENUS],
}

impl MenuSet {
    pub fn from_slice(menus: &[MenuDef]) -> Self {
        let mut set = Self::default();
        for menu in menus.iter().take(MAX_MENUS) {
            set.menus[set.count as usize] = *menu;
            set.count += 1;
        }
        set
    }

    pub fn menus(&self) -> &[MenuDef] {
        &self.menus[..self.count as usize]
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Fixed-capacity window-list snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WindowList {
    count: u8,
    entries: [WindowInfo; MAX_LIST_WINDOWS],
}

impl WindowList {
    pub fn push(&mut self, info: WindowInfo) -> bool {
        let idx = self.count as usize;
        if idx >= MAX_LIST_WINDOWS {
            return false;
        }
        self.entries[idx] = info;
        self.count += 1;
        true
    }

    pub fn as_slice(&self) -> &[WindowInfo] {
        &self.entries[..self.count as usize]
    }

    pub fn len(&self) -> usize {
        self.count as usize
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Request {
    GetInfo,
    CreateSurface {
        width: u32,
        height: u32,
        flags: SurfaceFlags,
        title: Title,
    },
    DestroySurface {
        surface_id: u32,
    },
    /// `damage` is advisory and surface-local.
    Present {
        surface_id: u32,
        damage: DamageRect,
    },
    SetGeometry {
        surface_id: u32,
        x: i32,
        y: i32,
    },
    SetVisible {
        surface_id: u32,
        visible: bool,
    },
    SetTitle {
        surface_id: u32,
        title: Title,
    },
    SubscribeEvents {
        surface_id: u32,
    },
    PollEvent {
        surface_id: u32,
    },
    ListWindows,
    RestoreWindow {
        surface_id: u32,
    },
    SetScrollbar {
        surface_id: u32,
        vertical: bool,
        enabled: bool,
        content_size: i32,
        viewport_size: i32,
        position: i32,
    },
    SetMenu {
        surface_id: u32,
        menus: MenuSet,
    },
    RequestFocus {
        surface_id: u32,
    },
}

/// A decoded message together with its correlation id.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope<T> {
    pub request_id: u32,
    pub body: T,
}

impl Request {
    pub fn tag(&self) -> u32 {
        match self {
            Self::GetInfo => tag::GET_INFO,
            Self::CreateSurface { .. } => tag::CREATE_SURFACE,
            Self::DestroySurface { .. } => tag::DESTROY_SURFACE,
            Self::Present { .. } => tag::PRESENT,
            Self::SetGeometry { .. } => tag::SET_GEOMETRY,
            Self::SetVisible { .. } => tag::SET_VISIBLE,
            Self::SetTitle { .. } => tag::SET_TITLE,
            Self::SubscribeEvents { .. } => tag::SUBSCRIBE_EVENTS,
            Self::PollEvent { .. } => tag::POLL_EVENT,
            Self::ListWindows => tag::LIST_WINDOWS,
            Self::RestoreWindow { .. } => tag::RESTORE_WINDOW,
            Self::SetScrollbar { .. } => tag::SET_SCROLLBAR,
            Self::SetMenu { .. } => tag::SET_MENU,
            Self::RequestFocus { .. } => tag::REQUEST_FOCUS,
        }
    }

    pub fn encode(&self, request_id: u32, buf: &mut [u8]) -> WireResult<usize> {
        let mut w = WireWriter::new(buf);
        w.put_u32(self.tag())?;
        w.put_u32(request_id)?;
        match *self {
            Self::GetInfo | Self::ListWindows => {}
            Self::CreateSurface {
                width,
                height,
                flags,
                ref title,
            } => {
                w.put_u32(width)?;
                w.put_u32(height)?;
                w.put_u32(flags.bits())?;
                w.put_bytes(title.as_bytes())?;
            }
            Self::DestroySurface { surface_id }
            | Self::SubscribeEvents { surface_id }
            | Self::PollEvent { surface_id }
            | Self::RestoreWindow { surface_id }
            | Self::RequestFocus { surface_id } => w.put_u32(surface_id)?,
            Self::Present { surface_id, damage } => {
                w.put_u32(surface_id)?;
                w.put_i32(damage.x0)?;
                w.put_i32(damage.y0)?;
                w.put_u32(damage.width() as u32)?;
                w.put_u32(damage.height() as u32)?;
            }
            Self::SetGeometry { surface_id, x, y } => {
                w.put_u32(surface_id)?;
                w.put_i32(x)?;
                w.put_i32(y)?;
            }
            Self::SetVisible {
                surface_id,
                visible,
            } => {
                w.put_u32(surface_id)?;
                w.put_u32(visible as u32)?;
            }
            Self::SetTitle {
                surface_id,
                ref title,
            } => {
                w.put_u32(surface_id)?;
                w.put_bytes(title.as_bytes())?;
            }
            Self::SetScrollbar {
                surface_id,
                vertical,
                enabled,
                content_size,
                viewport_size,
                position,
            } => {
                w.put_u32(surface_id)?;
                w.put_bool(vertical)?;
                w.put_bool(enabled)?;
                w.pad(2)?;
                w.put_i32(content_size)?;
                w.put_i32(viewport_size)?;
                w.put_i32(position)?;
            }
            Self::SetMenu {
                surface_id,
                ref menus,
            } => {
                w.put_u32(surface_id)?;
                w.put_u8(menus.count)?;
                w.pad(3)?;
                for menu in &menus.menus {
                    menu.write_to(&mut w)?;
                }
            }
        }
        Ok(w.finish())
    }

    pub fn decode(buf: &[u8]) -> WireResult<Envelope<Self>> {
        let mut r = WireReader::new(buf);
        let tag = r.get_u32()?;
        let request_id = r.get_u32()?;
        let body = match tag {
            tag::GET_INFO => Self::GetInfo,
            tag::LIST_WINDOWS => Self::ListWindows,
            tag::CREATE_SURFACE => Self::CreateSurface {
                width: r.get_u32()?,
                height: r.get_u32()?,
                flags: SurfaceFlags::from_bits_truncate(r.get_u32()?),
                title: Title::from_bytes(&r.get_array::<TITLE_LEN>()?),
            },
            tag::DESTROY_SURFACE => Self::DestroySurface {
                surface_id: r.get_u32()?,
            },
            tag::SUBSCRIBE_EVENTS => Self::SubscribeEvents {
                surface_id: r.get_u32()?,
            },
            tag::POLL_EVENT => Self::PollEvent {
                surface_id: r.get_u32()?,
            },
            tag::RESTORE_WINDOW => Self::RestoreWindow {
                surface_id: r.get_u32()?,
            },
            tag::REQUEST_FOCUS => Self::RequestFocus {
                surface_id: r.get_u32()?,
            },
            tag::PRESENT => {
                let surface_id = r.get_u32()?;
                let x = r.get_i32()?;
                let y = r.get_i32()?;
                let w = r.get_u32()?;
                let h = r.get_u32()?;
                Self::Present {
                    surface_id,
                    damage: DamageRect::from_xywh(x, y, w, h),
                }
            }
            tag::SET_GEOMETRY => Self::SetGeometry {
                surface_id: r.get_u32()?,
                x: r.get_i32()?,
                y: r.get_i32()?,
            },
            tag::SET_VISIBLE => Self::SetVisible {
                surface_id: r.get_u32()?,
                visible: r.get_u32()? != 0,
            },
            tag::SET_TITLE => Self::SetTitle {
                surface_id: r.get_u32()?,
                title: Title::from_bytes(&r.get_array::<TITLE_LEN>()?),
            },
            tag::SET_SCROLLBAR => {
                let surface_id = r.get_u32()?;
                let vertical = r.get_bool()?;
                let enabled = r.get_bool()?;
                r.skip(2)?;
                Self::SetScrollbar {
                    surface_id,
                    vertical,
                    enabled,
                    content_size: r.get_i32()?,
                    viewport_size: r.get_i32()?,
                    position: r.get_i32()?,
                }
            }
            tag::SET_MENU => {
                let surface_id = r.get_u32()?;
                let count = r.get_u8()?.min(MAX_MENUS as u8);
                r.skip(3)?;
                let mut menus = MenuSet {
                    count,
                    ..MenuSet::default()
                };
                for menu in menus.menus.iter_mut() {
                    *menu = MenuDef::read_from(&mut r)?;
                }
                Self::SetMenu { surface_id, menus }
            }
            other => return Err(ProtocolError::UnknownType(other)),
        };
        Ok(Envelope { request_id, body })
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Reply {
    Info {
        status: i32,
        width: u32,
        height: u32,
        format: u32,
    },
    CreateSurface {
        status: i32,
        surface_id: u32,
        stride: u32,
    },
    Generic {
        status: i32,
    },
    PollEvent {
        event: Option<Event>,
    },
    ListWindows {
        status: i32,
        windows: WindowList,
    },
}

impl Reply {
    pub fn tag(&self) -> u32 {
        match self {
            Self::Info { .. } => tag::INFO_REPLY,
            Self::CreateSurface { .. } => tag::CREATE_SURFACE_REPLY,
            Self::Generic { .. } => tag::GENERIC_REPLY,
            Self::PollEvent { .. } => tag::POLL_EVENT_REPLY,
            Self::ListWindows { .. } => tag::LIST_WINDOWS_REPLY,
        }
    }

    pub fn status(&self) -> i32 {
        match *self {
            Self::Info { status, .. }
            | Self::CreateSurface { status, .. }
            | Self::Generic { status }
            | Self::ListWindows { status, .. } => status,
            Self::PollEvent { .. } => status::OK,
        }
    }

    pub fn encode(&self, request_id: u32, buf: &mut [u8]) -> WireResult<usize> {
        let mut w = WireWriter::new(buf);
        w.put_u32(self.tag())?;
        w.put_u32(request_id)?;
        match *self {
            Self::Info {
                status,
                width,
                height,
                format,
            } => {
                w.put_i32(status)?;
                w.put_u32(width)?;
                w.put_u32(height)?;
                w.put_u32(format)?;
            }
            Self::CreateSurface {
                status,
                surface_id,
                stride,
            } => {
                w.put_i32(status)?;
                w.put_u32(surface_id)?;
                w.put_u32(stride)?;
            }
            Self::Generic { status } => w.put_i32(status)?,
            Self::PollEvent { event } => {
                w.put_u32(event.is_some() as u32)?;
                let mut slot = [0u8; EVENT_MSG_SIZE];
                if let Some(ev) = event {
                    ev.encode(&mut slot)?;
                }
                w.put_bytes(&slot)?;
            }
            Self::ListWindows {
                status,
                ref windows,
            } => {
                w.put_i32(status)?;
                w.put_u32(windows.count as u32)?;
                for info in &windows.entries {
                    w.put_u32(info.surface_id)?;
                    w.put_u32(info.flags.bits())?;
                    w.put_bool(info.minimized)?;
                    w.put_bool(info.maximized)?;
                    w.put_bool(info.focused)?;
                    w.pad(1)?;
                    w.put_bytes(info.title.as_bytes())?;
                }
            }
        }
        Ok(w.finish())
    }

    pub fn decode(buf: &[u8]) -> WireResult<Envelope<Self>> {
        let mut r = WireReader::new(buf);
        let tag = r.get_u32()?;
        let request_id = r.get_u32()?;
        let body = match tag {
            tag::INFO_REPLY => Self::Info {
                status: r.get_i32()?,
                width: r.get_u32()?,
                height: r.get_u32()?,
                format: r.get_u32()?,
            },
            tag::CREATE_SURFACE_REPLY => Self::CreateSurface {
                status: r.get_i32()?,
                surface_id: r.get_u32()?,
                stride: r.get_u32()?,
            },
            tag::GENERIC_REPLY => Self::Generic {
                status: r.get_i32()?,
            },
            tag::POLL_EVENT_REPLY => {
                let has_event = r.get_u32()? != 0;
                let slot = r.get_bytes(EVENT_MSG_SIZE)?;
                let event = if has_event {
                    Some(Event::decode(slot)?)
                } else {
                    None
                };
                Self::PollEvent { event }
            }
            tag::LIST_WINDOWS_REPLY => {
                let status = r.get_i32()?;
                let count = (r.get_u32()? as usize).min(MAX_LIST_WINDOWS);
                let mut windows = WindowList::default();
                for idx in 0..MAX_LIST_WINDOWS {
                    let info = WindowInfo {
                        surface_id: r.get_u32()?,
                        flags: SurfaceFlags::from_bits_truncate(r.get_u32()?),
                        minimized: r.get_bool()?,
                        maximized: r.get_bool()?,
                        focused: {
                            let focused = r.get_bool()?;
                            r.skip(1)?;
                            focused
                        },
                        title: Title::from_bytes(&r.get_array::<TITLE_LEN>()?),
                    };
                    if idx < count {
                        windows.push(info);
                    }
                }
                Self::ListWindows { status, windows }
            }
            other => return Err(ProtocolError::UnknownType(other)),
        };
        Ok(Envelope { request_id, body })
    }
}
