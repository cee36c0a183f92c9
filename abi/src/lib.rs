//! ViperDOS display ABI
//!
//! Types shared between the display server and its clients: the request,
//! reply and event wire formats, surface and input flag sets, colour and
//! canvas abstractions, and the embedded bitmap font. Both sides link this
//! crate so the byte layout has a single source of truth.
//!
//! Everything here is plain data with explicit little-endian encoding; no
//! type depends on the host's struct layout.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod damage;
pub mod draw;
pub mod event;
pub mod font;
pub mod pixel;
pub mod protocol;
pub mod window;
pub mod wire;

pub use damage::{DamageRect, MAX_DAMAGE_REGIONS};
pub use draw::{Canvas, Color32, EncodedPixel};
pub use event::{EVENT_MSG_SIZE, Event, MouseEventKind};
pub use pixel::*;
pub use protocol::{
    DISPLAY_ASSIGN, Envelope, MAX_MENU_ITEMS, MAX_MENUS, MenuDef, MenuItem, MenuSet, Reply,
    Request, WindowList,
};
pub use window::*;
pub use wire::{MAX_HANDLES, MAX_PAYLOAD, ProtocolError, WireResult};
