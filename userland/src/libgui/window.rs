//! Client-side window record and drawing into its pixel buffer.
//!
//! Drawing never talks to the server; call [`Display::present`] to show the
//! result.
//!
//! [`Display::present`]: super::Display::present

use viper_abi::draw::{Canvas, Color32};
use viper_abi::window::Title;
use viper_gfx::{DrawBuffer, canvas_font, canvas_ops};

use crate::syscall::{Handle, SharedBuffer};

/// One surface as seen by its owner. Release it with
/// [`Display::destroy_window`](super::Display::destroy_window).
#[derive(Debug)]
pub struct Window {
    id: u32,
    width: u32,
    height: u32,
    /// Bytes per row.
    stride: u32,
    buffer: SharedBuffer,
    /// Receive end of the event channel; `None` uses `POLL_EVENT`.
    pub(super) events: Option<Handle>,
    title: Title,
}

impl Window {
    pub(super) fn new(
        id: u32,
        width: u32,
        height: u32,
        stride: u32,
        buffer: SharedBuffer,
        title: Title,
    ) -> Self {
        Self {
            id,
            width,
            height,
            stride,
            buffer,
            events: None,
            title,
        }
    }

    pub(super) fn into_parts(self) -> (u32, SharedBuffer, Option<Handle>) {
        (self.id, self.buffer, self.events)
    }

    /// Install the buffer delivered with a Resize event, returning the old
    /// one for release.
    pub(super) fn replace_buffer(
        &mut self,
        buffer: SharedBuffer,
        width: u32,
        height: u32,
        stride: u32,
    ) -> SharedBuffer {
        self.width = width;
        self.height = height;
        self.stride = stride;
        core::mem::replace(&mut self.buffer, buffer)
    }

    pub(super) fn set_local_title(&mut self, title: Title) {
        self.title = title;
    }

    #[inline]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Row pitch in bytes.
    #[inline]
    pub fn stride(&self) -> u32 {
        self.stride
    }

    #[inline]
    pub fn stride_pixels(&self) -> usize {
        self.stride as usize / 4
    }

    #[inline]
    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    #[inline]
    pub fn has_event_channel(&self) -> bool {
        self.events.is_some()
    }

    #[inline]
    pub fn pixels(&self) -> &[u32] {
        self.buffer.pixels()
    }

    #[inline]
    pub fn pixels_mut(&mut self) -> &mut [u32] {
        self.buffer.pixels_mut()
    }

    /// Drawing view over the pixel buffer.
    pub fn canvas(&mut self) -> Option<DrawBuffer<'_>> {
        let (w, h, stride) = (self.width, self.height, self.stride_pixels());
        DrawBuffer::new(self.buffer.pixels_mut(), w, h, stride)
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, color: Color32) {
        if let Some(mut c) = self.canvas() {
            c.put_pixel(x, y, color);
        }
    }

    pub fn get_pixel(&mut self, x: i32, y: i32) -> Option<Color32> {
        self.canvas()?.get_pixel(x, y)
    }

    pub fn clear(&mut self, color: Color32) {
        let (w, h) = (self.width as i32, self.height as i32);
        self.fill_rect(0, 0, w, h, color);
    }

    pub fn fill_rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color32) {
        if let Some(mut c) = self.canvas() {
            canvas_ops::fill_rect(&mut c, x, y, w, h, color);
        }
    }

    pub fn rect(&mut self, x: i32, y: i32, w: i32, h: i32, color: Color32) {
        if let Some(mut c) = self.canvas() {
            canvas_ops::rect(&mut c, x, y, w, h, color);
        }
    }

    pub fn hline(&mut self, x0: i32, x1: i32, y: i32, color: Color32) {
        if let Some(mut c) = self.canvas() {
            canvas_ops::hline(&mut c, x0, x1, y, color);
        }
    }

    pub fn vline(&mut self, x: i32, y0: i32, y1: i32, color: Color32) {
        if let Some(mut c) = self.canvas() {
            canvas_ops::vline(&mut c, x, y0, y1, color);
        }
    }

    /// Transparent text; only glyph pixels are written.
    pub fn draw_text(&mut self, x: i32, y: i32, text: &str, color: Color32) {
        if let Some(mut c) = self.canvas() {
            canvas_font::draw_text(&mut c, x, y, text, color);
        }
    }

    /// Opaque 8x8 character cell.
    pub fn draw_char(&mut self, x: i32, y: i32, ch: u8, fg: Color32, bg: Color32) {
        if let Some(mut c) = self.canvas() {
            canvas_font::draw_char(&mut c, x, y, ch, fg, bg);
        }
    }

    /// Opaque character scaled in half units (2 = 8x8, 3 = 12x12).
    pub fn draw_char_scaled(
        &mut self,
        x: i32,
        y: i32,
        ch: u8,
        fg: Color32,
        bg: Color32,
        scale: u32,
    ) {
        if let Some(mut c) = self.canvas() {
            canvas_font::draw_char_scaled(&mut c, x, y, ch, fg, bg, scale);
        }
    }

    /// Opaque scaled text. Returns the pen advance in pixels.
    pub fn draw_text_scaled(
        &mut self,
        x: i32,
        y: i32,
        text: &str,
        fg: Color32,
        bg: Color32,
        scale: u32,
    ) -> i32 {
        let advance = (viper_abi::font::FONT_WIDTH as u32 * scale / 2) as i32;
        let Some(mut c) = self.canvas() else {
            return 0;
        };
        let mut pen = x;
        for &ch in text.as_bytes() {
            canvas_font::draw_char_scaled(&mut c, pen, y, ch, fg, bg, scale);
            pen += advance;
        }
        pen - x
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::SimKernel;

    fn window(k: &SimKernel, w: u32, h: u32) -> Window {
        let buffer = SharedBuffer::create(k, (w * 4 * h) as usize).unwrap();
        Window::new(7, w, h, w * 4, buffer, Title::new("test"))
    }

    #[test]
    fn test_fill_and_clip() {
        let k = SimKernel::default();
        let mut win = window(&k, 20, 10);
        let red = Color32::rgb(0xFF, 0, 0);
        win.clear(Color32::BLACK);
        win.fill_rect(15, 5, 20, 20, red);
        assert_eq!(win.get_pixel(19, 9), Some(red));
        assert_eq!(win.get_pixel(14, 9), Some(Color32::BLACK));
        assert_eq!(win.get_pixel(20, 9), None);
        win.into_parts().1.release(&k);
    }

    #[test]
    fn test_outline_and_lines() {
        let k = SimKernel::default();
        let mut win = window(&k, 16, 16);
        win.clear(Color32::BLACK);
        win.rect(2, 2, 10, 10, Color32::WHITE);
        assert_eq!(win.get_pixel(2, 2), Some(Color32::WHITE));
        assert_eq!(win.get_pixel(11, 11), Some(Color32::WHITE));
        assert_eq!(win.get_pixel(5, 5), Some(Color32::BLACK));
        win.hline(0, 15, 14, Color32::WHITE);
        win.vline(14, 0, 3, Color32::WHITE);
        assert_eq!(win.get_pixel(8, 14), Some(Color32::WHITE));
        assert_eq!(win.get_pixel(14, 3), Some(Color32::WHITE));
        win.into_parts().1.release(&k);
    }

    #[test]
    fn test_scaled_text_advance() {
        let k = SimKernel::default();
        let mut win = window(&k, 64, 16);
        let advance = win.draw_text_scaled(0, 0, "AB", Color32::WHITE, Color32::BLACK, 3);
        assert_eq!(advance, 24);
        win.into_parts().1.release(&k);
    }

    #[test]
    fn test_replace_buffer_updates_geometry() {
        let k = SimKernel::default();
        let mut win = window(&k, 8, 8);
        let bigger = SharedBuffer::create(&k, 16 * 4 * 12).unwrap();
        let old = win.replace_buffer(bigger, 16, 12, 64);
        old.release(&k);
        assert_eq!((win.width(), win.height(), win.stride()), (16, 12, 64));
        assert_eq!(win.stride_pixels(), 16);
        assert!(win.pixels().len() >= 16 * 12);
        win.into_parts().1.release(&k);
    }
}
