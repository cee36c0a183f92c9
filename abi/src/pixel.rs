//! Pixel formats understood by the display pipeline.

use crate::draw::{Color32, EncodedPixel};

/// Construct an ARGB colour value: 0xAARRGGBB.
#[inline]
pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> u32 {
    ((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32)
}

/// Construct an opaque ARGB colour value (alpha=0xFF).
#[inline]
pub const fn rgb(r: u8, g: u8, b: u8) -> u32 {
    rgba(r, g, b, 0xFF)
}

/// DRM fourcc for XRGB8888 (`'X' 'R' '2' '4'`), reported by `GET_INFO`.
pub const FOURCC_XRGB8888: u32 = 0x3432_5258;
/// DRM fourcc for ARGB8888 (`'A' 'R' '2' '4'`).
pub const FOURCC_ARGB8888: u32 = 0x3432_5241;

/// 32-bit little-endian pixel layouts. Memory order is `[B, G, R, X/A]`.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PixelFormat {
    /// Alpha byte is meaningful.
    Argb8888 = FOURCC_ARGB8888,
    /// Alpha byte is padding; written as 0xFF.
    #[default]
    Xrgb8888 = FOURCC_XRGB8888,
}

impl PixelFormat {
    #[inline]
    pub fn from_fourcc(val: u32) -> Option<Self> {
        match val {
            FOURCC_ARGB8888 => Some(Self::Argb8888),
            FOURCC_XRGB8888 => Some(Self::Xrgb8888),
            _ => None,
        }
    }

    #[inline]
    pub const fn fourcc(self) -> u32 {
        self as u32
    }

    #[inline]
    pub const fn bytes_per_pixel(self) -> u8 {
        4
    }

    /// Encode a `Color32` (0xAARRGGBB) into this format.
    #[inline]
    pub fn encode(self, color: Color32) -> EncodedPixel {
        match self {
            Self::Argb8888 => EncodedPixel(color.0),
            Self::Xrgb8888 => EncodedPixel(0xFF00_0000 | (color.0 & 0x00FF_FFFF)),
        }
    }

    /// Inverse of `encode`; padding reads back as opaque.
    #[inline]
    pub fn decode(self, pixel: EncodedPixel) -> Color32 {
        match self {
            Self::Argb8888 => Color32(pixel.0),
            Self::Xrgb8888 => Color32(0xFF00_0000 | (pixel.0 & 0x00FF_FFFF)),
        }
    }
}
