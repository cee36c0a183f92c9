//! Events pushed from the display server to a surface's owner.
//!
//! On an event channel each event is one message: a type tag, the target
//! surface id, then the per-kind body. The legacy `POLL_EVENT` reply embeds
//! the same bytes.

use crate::wire::{ProtocolError, WireReader, WireResult, WireWriter};
use crate::window::{KeyModifiers, MouseButtons};

/// Upper bound on one encoded event, tag included.
pub const EVENT_MSG_SIZE: usize = 64;

pub mod tag {
    pub const KEY: u32 = 0x100;
    pub const MOUSE: u32 = 0x101;
    pub const FOCUS: u32 = 0x102;
    pub const CLOSE: u32 = 0x103;
    pub const RESIZE: u32 = 0x104;
    pub const SCROLL: u32 = 0x105;
    pub const MENU: u32 = 0x106;
}

#[repr(u8)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseEventKind {
    Move = 0,
    ButtonDown = 1,
    ButtonUp = 2,
}

impl MouseEventKind {
    pub fn from_raw(raw: u8) -> WireResult<Self> {
        match raw {
            0 => Ok(Self::Move),
            1 => Ok(Self::ButtonDown),
            2 => Ok(Self::ButtonUp),
            _ => Err(ProtocolError::InvalidField),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Key {
        surface_id: u32,
        keycode: u16,
        modifiers: KeyModifiers,
        pressed: bool,
    },
    Mouse {
        surface_id: u32,
        /// Content-local coordinates.
        x: i32,
        y: i32,
        dx: i32,
        dy: i32,
        buttons: MouseButtons,
        kind: MouseEventKind,
        /// 0 = left, 1 = right, 2 = middle.
        button: u8,
    },
    Focus {
        surface_id: u32,
        gained: bool,
    },
    Close {
        surface_id: u32,
    },
    /// Delivered together with the handle of the replacement pixel buffer.
    Resize {
        surface_id: u32,
        width: u32,
        height: u32,
        stride: u32,
    },
    Scroll {
        surface_id: u32,
        position: i32,
        vertical: bool,
    },
    Menu {
        surface_id: u32,
        menu_index: u8,
        item_index: u8,
        action: u8,
    },
}

impl Event {
    pub fn tag(&self) -> u32 {
        match self {
            Self::Key { .. } => tag::KEY,
            Self::Mouse { .. } => tag::MOUSE,
            Self::Focus { .. } => tag::FOCUS,
            Self::Close { .. } => tag::CLOSE,
            Self::Resize { .. } => tag::RESIZE,
            Self::Scroll { .. } => tag::SCROLL,
            Self::Menu { .. } => tag::MENU,
        }
    }

    pub fn surface_id(&self) -> u32 {
        match *self {
            Self::Key { surface_id, .. }
            | Self::Mouse { surface_id, .. }
            | Self::Focus { surface_id, .. }
            | Self::Close { surface_id }
            | Self::Resize { surface_id, .. }
            | Self::Scroll { surface_id, .. }
            | Self::Menu { surface_id, .. } => surface_id,
        }
    }

    pub fn write_to(&self, w: &mut WireWriter<'_>) -> WireResult<()> {
        w.put_u32(self.tag())?;
        w.put_u32(self.surface_id())?;
        match *self {
            Self::Key {
                keycode,
                modifiers,
                pressed,
                ..
            } => {
                w.put_u16(keycode)?;
                w.put_u8(modifiers.bits())?;
                w.put_bool(pressed)?;
            }
            Self::Mouse {
                x,
                y,
                dx,
                dy,
                buttons,
                kind,
                button,
                ..
            } => {
                w.put_i32(x)?;
                w.put_i32(y)?;
                w.put_i32(dx)?;
                w.put_i32(dy)?;
                w.put_u8(buttons.bits())?;
                w.put_u8(kind as u8)?;
                w.put_u8(button)?;
                w.pad(1)?;
            }
            Self::Focus { gained, .. } => {
                w.put_bool(gained)?;
                w.pad(3)?;
            }
            Self::Close { .. } => {}
            Self::Resize {
                width,
                height,
                stride,
                ..
            } => {
                w.put_u32(width)?;
                w.put_u32(height)?;
                w.put_u32(stride)?;
            }
            Self::Scroll {
                position, vertical, ..
            } => {
                w.put_i32(position)?;
                w.put_bool(vertical)?;
                w.pad(3)?;
            }
            Self::Menu {
                menu_index,
                item_index,
                action,
                ..
            } => {
                w.put_u8(menu_index)?;
                w.put_u8(item_index)?;
                w.put_u8(action)?;
                w.pad(1)?;
            }
        }
        Ok(())
    }

    pub fn encode(&self, buf: &mut [u8]) -> WireResult<usize> {
        let mut w = WireWriter::new(buf);
        self.write_to(&mut w)?;
        Ok(w.finish())
    }

    pub fn read_from(r: &mut WireReader<'_>) -> WireResult<Self> {
        let tag = r.get_u32()?;
        let surface_id = r.get_u32()?;
        let event = match tag {
            tag::KEY => {
                let keycode = r.get_u16()?;
                let modifiers = KeyModifiers::from_bits_truncate(r.get_u8()?);
                let pressed = r.get_bool()?;
                Self::Key {
                    surface_id,
                    keycode,
                    modifiers,
                    pressed,
                }
            }
            tag::MOUSE => {
                let x = r.get_i32()?;
                let y = r.get_i32()?;
                let dx = r.get_i32()?;
                let dy = r.get_i32()?;
                let buttons = MouseButtons::from_bits_truncate(r.get_u8()?);
                let kind = MouseEventKind::from_raw(r.get_u8()?)?;
                let button = r.get_u8()?;
                r.skip(1)?;
                Self::Mouse {
                    surface_id,
                    x,
                    y,
                    dx,
                    dy,
                    buttons,
                    kind,
                    button,
                }
            }
            tag::FOCUS => {
                let gained = r.get_bool()?;
                r.skip(3)?;
                Self::Focus { surface_id, gained }
            }
            tag::CLOSE => Self::Close { surface_id },
            tag::RESIZE => Self::Resize {
                surface_id,
                width: r.get_u32()?,
                height: r.get_u32()?,
                stride: r.get_u32()?,
            },
            tag::SCROLL => {
                let position = r.get_i32()?;
                let vertical = r.get_bool()?;
                r.skip(3)?;
                Self::Scroll {
                    surface_id,
                    position,
                    vertical,
                }
            }
            tag::MENU => {
                let menu_index = r.get_u8()?;
                let item_index = r.get_u8()?;
                let action = r.get_u8()?;
                r.skip(1)?;
                Self::Menu {
                    surface_id,
                    menu_index,
                    item_index,
                    action,
                }
            }
            other => return Err(ProtocolError::UnknownType(other)),
        };
        Ok(event)
    }

    pub fn decode(buf: &[u8]) -> WireResult<Self> {
        Self::read_from(&mut WireReader::new(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mouse_event_layout() {
        let ev = Event::Mouse {
            surface_id: 7,
            x: 10,
            y: 20,
            dx: -1,
            dy: 2,
            buttons: MouseButtons::LEFT,
            kind: MouseEventKind::ButtonDown,
            button: 0,
        };
        let mut buf = [0u8; EVENT_MSG_SIZE];
        let len = ev.encode(&mut buf).unwrap();
        assert_eq!(len, 28);
        assert_eq!(&buf[0..4], &tag::MOUSE.to_le_bytes());
        assert_eq!(&buf[4..8], &7u32.to_le_bytes());
        assert_eq!(buf[25], 1);
        assert_eq!(Event::decode(&buf[..len]), Ok(ev));
    }

    #[test]
    fn test_close_is_header_only() {
        let mut buf = [0u8; EVENT_MSG_SIZE];
        let len = Event::Close { surface_id: 3 }.encode(&mut buf).unwrap();
        assert_eq!(len, 8);
    }

    #[test]
    fn test_unknown_tag_rejected() {
        let mut buf = [0u8; 8];
        buf[0..4].copy_from_slice(&0x1FFu32.to_le_bytes());
        assert_eq!(Event::decode(&buf), Err(ProtocolError::UnknownType(0x1FF)));
    }

    #[test]
    fn test_bad_mouse_kind_rejected() {
        let mut buf = [0u8; 28];
        buf[0..4].copy_from_slice(&tag::MOUSE.to_le_bytes());
        buf[25] = 9;
        assert_eq!(Event::decode(&buf), Err(ProtocolError::InvalidField));
    }
}
