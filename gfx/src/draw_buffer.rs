use viper_abi::damage::DamageRect;
use viper_abi::draw::{Canvas, EncodedPixel};

use crate::DamageTracker;

/// Bounds-checked view over a block of 32-bit pixels.
///
/// `DrawBuffer` borrows a caller-supplied `&mut [u32]`, typically a mapped
/// shared-memory surface, the server's back buffer or the framebuffer, and
/// records every drawn rectangle in its own damage tracker.
pub struct DrawBuffer<'a> {
    data: &'a mut [u32],
    width: u32,
    height: u32,
    stride: usize,
    damage: DamageTracker,
}

impl<'a> DrawBuffer<'a> {
    /// `stride` is in pixels. Returns `None` when the slice is too short.
    pub fn new(data: &'a mut [u32], width: u32, height: u32, stride: usize) -> Option<Self> {
        if stride < width as usize {
            return None;
        }
        let required = stride.checked_mul(height as usize)?;
        if data.len() < required {
            return None;
        }
        Some(Self {
            data,
            width,
            height,
            stride,
            damage: DamageTracker::new(),
        })
    }

    pub fn data(&self) -> &[u32] {
        self.data
    }

    pub fn data_mut(&mut self) -> &mut [u32] {
        self.data
    }

    pub fn damage(&self) -> &DamageTracker {
        &self.damage
    }

    pub fn clear_damage(&mut self) {
        self.damage.clear();
    }

    /// Copy a `src_w`×`src_h` block (row pitch `src_stride` pixels) so its
    /// top-left lands on `(dst_x, dst_y)`. Rows and columns that fall off
    /// this buffer are skipped.
    pub fn blit_from(
        &mut self,
        src: &[u32],
        src_w: u32,
        src_h: u32,
        src_stride: usize,
        dst_x: i32,
        dst_y: i32,
    ) {
        let dst = DamageRect::from_xywh(dst_x, dst_y, src_w, src_h)
            .clip(self.width as i32, self.height as i32);
        if !dst.is_valid() {
            return;
        }
        let span = dst.width() as usize;
        let src_col = (dst.x0 - dst_x) as usize;
        for y in dst.y0..=dst.y1 {
            let src_row = (y - dst_y) as usize;
            let src_off = src_row * src_stride + src_col;
            let Some(src_span) = src.get(src_off..src_off + span) else {
                continue;
            };
            let dst_off = y as usize * self.stride + dst.x0 as usize;
            self.data[dst_off..dst_off + span].copy_from_slice(src_span);
        }
        self.damage.add(dst);
    }

    /// Copy a clipped rectangle out of this buffer into `out` (packed,
    /// row pitch `w`). Pixels outside the buffer are left untouched in `out`.
    pub fn read_rect(&self, x: i32, y: i32, w: u32, h: u32, out: &mut [u32]) {
        let area = DamageRect::from_xywh(x, y, w, h).clip(self.width as i32, self.height as i32);
        if !area.is_valid() {
            return;
        }
        let span = area.width() as usize;
        for row in area.y0..=area.y1 {
            let out_off = (row - y) as usize * w as usize + (area.x0 - x) as usize;
            let src_off = row as usize * self.stride + area.x0 as usize;
            if let Some(dst) = out.get_mut(out_off..out_off + span) {
                dst.copy_from_slice(&self.data[src_off..src_off + span]);
            }
        }
    }
}

impl Canvas for DrawBuffer<'_> {
    #[inline]
    fn width(&self) -> u32 {
        self.width
    }

    #[inline]
    fn height(&self) -> u32 {
        self.height
    }

    #[inline]
    fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    fn write_pixel_at(&mut self, index: usize, pixel: EncodedPixel) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = pixel.to_u32();
        }
    }

    #[inline]
    fn read_pixel_at(&self, index: usize) -> EncodedPixel {
        EncodedPixel(self.data.get(index).copied().unwrap_or(0))
    }

    #[inline]
    fn fill_row_span(&mut self, row: i32, x0: i32, x1: i32, pixel: EncodedPixel) {
        let Some((row, x0, x1)) = self.clip_row_span(row, x0, x1) else {
            return;
        };
        let start = row * self.stride + x0;
        let end = row * self.stride + x1 + 1;
        if let Some(span) = self.data.get_mut(start..end) {
            span.fill(pixel.to_u32());
        }
    }

    #[inline]
    fn report_damage(&mut self, rect: DamageRect) {
        self.damage.add(rect);
    }
}
