use crate::damage::DamageRect;
use crate::pixel::PixelFormat;

/// Colour as seen by clients and the theme: `0xAARRGGBB`.
///
/// The display pipeline is XRGB8888, so the top byte is carried through
/// untouched and never blended.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Color32(pub u32);

impl Color32 {
    pub const TRANSPARENT: Self = Self(0x00000000);
    pub const BLACK: Self = Self(0xFF000000);
    pub const WHITE: Self = Self(0xFFFFFFFF);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self(((a as u32) << 24) | ((r as u32) << 16) | ((g as u32) << 8) | (b as u32))
    }

    #[inline]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 0xFF)
    }

    #[inline]
    pub const fn red(self) -> u8 {
        (self.0 >> 16) as u8
    }

    #[inline]
    pub const fn green(self) -> u8 {
        (self.0 >> 8) as u8
    }

    #[inline]
    pub const fn blue(self) -> u8 {
        self.0 as u8
    }

    #[inline]
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

impl From<u32> for Color32 {
    #[inline]
    fn from(value: u32) -> Self {
        Self(value)
    }
}

/// A colour already encoded for the target's `PixelFormat`.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
#[repr(transparent)]
pub struct EncodedPixel(pub u32);

impl EncodedPixel {
    #[inline]
    pub const fn to_u32(self) -> u32 {
        self.0
    }
}

#[inline]
fn clip_row_span_bounds(
    width: u32,
    height: u32,
    row: i32,
    x0: i32,
    x1: i32,
) -> Option<(usize, usize, usize)> {
    if row < 0 || row >= height as i32 {
        return None;
    }
    let x0 = x0.max(0);
    let x1 = x1.min(width as i32 - 1);
    if x0 > x1 {
        return None;
    }
    Some((row as usize, x0 as usize, x1 as usize))
}

/// Drawing surface made of 32-bit pixel words.
///
/// Implementors expose geometry plus indexed word access; every higher-level
/// primitive is a default method that clips against `width`/`height` before
/// touching memory, so signed and off-screen coordinates are always safe.
///
/// The display server binds this trait to its back buffer during a composite
/// and to the front buffer for cursor work; clients bind it to their shared
/// pixel buffer.
pub trait Canvas {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Row stride in pixels (pitch / 4). Always `>= width`.
    fn stride(&self) -> usize;

    /// Write one word at a linear pixel index. Callers stay in bounds.
    fn write_pixel_at(&mut self, index: usize, pixel: EncodedPixel);

    /// Read one word at a linear pixel index. Callers stay in bounds.
    fn read_pixel_at(&self, index: usize) -> EncodedPixel;

    #[inline]
    fn pixel_format(&self) -> PixelFormat {
        PixelFormat::Xrgb8888
    }

    #[inline]
    fn clip_row_span(&self, row: i32, x0: i32, x1: i32) -> Option<(usize, usize, usize)> {
        clip_row_span_bounds(self.width(), self.height(), row, x0, x1)
    }

    /// Fill columns `x0..=x1` of `row`, clipped.
    #[inline]
    fn fill_row_span(&mut self, row: i32, x0: i32, x1: i32, pixel: EncodedPixel) {
        let Some((row, x0, x1)) = self.clip_row_span(row, x0, x1) else {
            return;
        };
        let row_start = row * self.stride();
        for x in x0..=x1 {
            self.write_pixel_at(row_start + x, pixel);
        }
    }

    #[inline]
    fn clear_canvas(&mut self, color: Color32) {
        let pixel = self.pixel_format().encode(color);
        let w = self.width() as i32;
        for row in 0..self.height() as i32 {
            self.fill_row_span(row, 0, w - 1, pixel);
        }
    }

    #[inline]
    fn put_pixel(&mut self, x: i32, y: i32, color: Color32) {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return;
        }
        let pixel = self.pixel_format().encode(color);
        let index = y as usize * self.stride() + x as usize;
        self.write_pixel_at(index, pixel);
    }

    #[inline]
    fn get_pixel(&self, x: i32, y: i32) -> Option<Color32> {
        if x < 0 || y < 0 || x >= self.width() as i32 || y >= self.height() as i32 {
            return None;
        }
        let index = y as usize * self.stride() + x as usize;
        Some(self.pixel_format().decode(self.read_pixel_at(index)))
    }

    /// Horizontal line, endpoints inclusive and unordered.
    #[inline]
    fn hline(&mut self, x0: i32, x1: i32, y: i32, color: Color32) {
        let (x0, x1) = if x0 <= x1 { (x0, x1) } else { (x1, x0) };
        let pixel = self.pixel_format().encode(color);
        self.fill_row_span(y, x0, x1, pixel);
    }

    /// Vertical line, endpoints inclusive and unordered.
    #[inline]
    fn vline(&mut self, x: i32, y0: i32, y1: i32, color: Color32) {
        if x < 0 || x >= self.width() as i32 {
            return;
        }
        let (y0, y1) = if y0 <= y1 { (y0, y1) } else { (y1, y0) };
        let y0 = y0.max(0);
        let y1 = y1.min(self.height() as i32 - 1);
        let pixel = self.pixel_format().encode(color);
        for y in y0..=y1 {
            let index = y as usize * self.stride() + x as usize;
            self.write_pixel_at(index, pixel);
        }
    }

    /// Hook for buffers that track what changed. Direct framebuffers ignore it.
    #[inline]
    fn report_damage(&mut self, _rect: DamageRect) {}

    /// Solid rectangle fill with signed origin, clipped.
    #[inline]
    fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color32) {
        if w <= 0 || h <= 0 {
            return;
        }
        let x0 = x.max(0);
        let y0 = y.max(0);
        let x1 = x.saturating_add(w - 1).min(self.width() as i32 - 1);
        let y1 = y.saturating_add(h - 1).min(self.height() as i32 - 1);
        if x0 > x1 || y0 > y1 {
            return;
        }
        let pixel = self.pixel_format().encode(color);
        for row in y0..=y1 {
            self.fill_row_span(row, x0, x1, pixel);
        }
    }
}
