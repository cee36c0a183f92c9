//! Software rendering shared by the display server and its clients.

#![cfg_attr(not(test), no_std)]
#![forbid(unsafe_code)]

pub mod canvas_font;
pub mod canvas_ops;
pub mod damage;
pub mod draw_buffer;

pub use damage::DamageTracker;
pub use draw_buffer::DrawBuffer;
