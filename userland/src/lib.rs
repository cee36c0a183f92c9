//! ViperDOS windowing userland: the `displayd` compositing server, the
//! `libgui` client library and the kernel facility seam they share.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod apps;
pub mod libgui;
pub mod syscall;
pub mod theme;
