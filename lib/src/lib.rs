//! Small runtime utilities shared by ViperDOS user-space services.

#![cfg_attr(not(test), no_std)]

pub mod klog;
pub mod ring_buffer;

pub use klog::{
    KlogLevel, klog_get_level, klog_init, klog_is_enabled, klog_register_backend, klog_set_level,
};
pub use ring_buffer::RingBuffer;
