//! Back buffer, front buffer and the composite pass.
//!
//! Both buffers are drawn through the same [`Canvas`] API; the screen keeps
//! track of which one is currently bound. A composite renders the whole
//! scene into the back buffer, copies it to the framebuffer, then switches
//! to the front buffer for the cursor overlay.

use alloc::vec::Vec;

use viper_abi::draw::Canvas;
use viper_gfx::{DrawBuffer, canvas_ops};

use super::DisplayServer;
use super::decorations::{draw_decorations, draw_scrollbars};
use super::menu::{draw_menu_bar, draw_pulldown, pulldown_rect};
use super::surface::Surface;
use crate::syscall::{FramebufferInfo, Kernel, Mapping};
use crate::theme::{COLOR_DESKTOP, COLOR_SCREEN_BORDER, DEFAULT_MENU_TEXT, SCREEN_BORDER_WIDTH};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Binding {
    Back,
    Front,
}

pub struct Screen {
    info: FramebufferInfo,
    front: Mapping,
    back: Vec<u32>,
    binding: Binding,
}

impl Screen {
    /// `None` when the back buffer cannot be allocated.
    pub fn new(info: FramebufferInfo, front: Mapping) -> Option<Self> {
        let len = info.width as usize * info.height as usize;
        let mut back = Vec::new();
        back.try_reserve_exact(len).ok()?;
        back.resize(len, 0);
        Some(Self {
            info,
            front,
            back,
            binding: Binding::Front,
        })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.info.width
    }

    #[inline]
    pub fn height(&self) -> u32 {
        self.info.height
    }

    #[inline]
    pub fn info(&self) -> FramebufferInfo {
        self.info
    }

    pub fn bind(&mut self, binding: Binding) {
        self.binding = binding;
    }

    #[inline]
    pub fn binding(&self) -> Binding {
        self.binding
    }

    /// Drawing view over the bound buffer.
    pub fn target(&mut self) -> Option<DrawBuffer<'_>> {
        let (w, h) = (self.info.width, self.info.height);
        match self.binding {
            Binding::Back => DrawBuffer::new(&mut self.back, w, h, w as usize),
            Binding::Front => DrawBuffer::new(self.front.pixels_mut(), w, h, self.info.stride()),
        }
    }

    /// Copy the back buffer to the framebuffer, honouring its pitch.
    pub fn flip(&mut self) {
        let w = self.info.width as usize;
        let stride = self.info.stride();
        if w == 0 {
            return;
        }
        let front = self.front.pixels_mut();
        for (row, src) in self.back.chunks_exact(w).enumerate() {
            let off = row * stride;
            if let Some(dst) = front.get_mut(off..off + w) {
                dst.copy_from_slice(src);
            }
        }
    }
}

/// Border bands around the screen edge, desktop colour inside.
pub fn draw_desktop<T: Canvas>(target: &mut T) {
    let (w, h) = (target.width() as i32, target.height() as i32);
    let b = SCREEN_BORDER_WIDTH;
    canvas_ops::fill_rect(target, 0, 0, w, b, COLOR_SCREEN_BORDER);
    canvas_ops::fill_rect(target, 0, h - b, w, b, COLOR_SCREEN_BORDER);
    canvas_ops::fill_rect(target, 0, b, b, h - 2 * b, COLOR_SCREEN_BORDER);
    canvas_ops::fill_rect(target, w - b, b, b, h - 2 * b, COLOR_SCREEN_BORDER);
    canvas_ops::fill_rect(target, b, b, w - 2 * b, h - 2 * b, COLOR_DESKTOP);
}

/// Decorations, pixel content and scrollbars of one surface.
pub fn draw_surface(back: &mut DrawBuffer<'_>, surf: &Surface, focused: bool) {
    draw_decorations(back, surf, focused);

    let (bw, bh) = surf.buffer_extent();
    back.blit_from(surf.pixels(), bw, bh, surf.stride_pixels(), surf.x, surf.y);
    // Uncovered content while a resize drag outgrows the buffer.
    let (w, h) = (surf.width as i32, surf.height as i32);
    let (bw, bh) = (bw as i32, bh as i32);
    if bw < w {
        canvas_ops::fill_rect(back, surf.x + bw, surf.y, w - bw, h, COLOR_DESKTOP);
    }
    if bh < h {
        canvas_ops::fill_rect(back, surf.x, surf.y + bh, bw, h - bh, COLOR_DESKTOP);
    }

    draw_scrollbars(back, surf);
}

impl<K: Kernel> DisplayServer<K> {
    pub fn composite(&mut self) {
        self.refresh_menu_bar();

        self.screen.bind(Binding::Back);
        let Some(mut back) = self.screen.target() else {
            return;
        };
        draw_desktop(&mut back);

        let focused = self.registry.focused_id();
        for id in self.registry.z_sorted() {
            if let Some(surf) = self.registry.get(id) {
                draw_surface(&mut back, surf, id == focused);
            }
        }

        let owner_menus = self
            .menu_bar
            .owner()
            .and_then(|id| self.registry.get(id))
            .map(|s| &s.menus);
        let right_text = self
            .registry
            .focused()
            .map(|s| s.title.as_str())
            .filter(|t| !t.is_empty())
            .unwrap_or(DEFAULT_MENU_TEXT);
        let open = self.input.open_menu();
        let layout = self.menu_bar.layout();
        draw_menu_bar(&mut back, owner_menus, layout, open.map(|(m, _)| m), right_text);

        if let (Some((index, hovered)), Some(menus)) = (open, owner_menus) {
            if let Some(def) = menus.menus().get(index) {
                if let Some(rect) = pulldown_rect(layout, def, index) {
                    draw_pulldown(&mut back, &rect, def, hovered);
                }
            }
        }
        drop(back);

        self.screen.flip();
        self.screen.bind(Binding::Front);
        self.cursor.invalidate_saved();
        if let Some(mut front) = self.screen.target() {
            self.cursor.save_under(&front);
            self.cursor.draw(&mut front);
        }

        self.damage.clear();
        self.stats.composites += 1;
    }

    /// Cursor-only update on the front buffer; no composite.
    pub(super) fn move_cursor(&mut self, x: i32, y: i32) {
        self.screen.bind(Binding::Front);
        let Some(mut front) = self.screen.target() else {
            return;
        };
        self.cursor.restore_under(&mut front);
        self.cursor.move_to(&self.kernel, x, y);
        self.cursor.save_under(&front);
        self.cursor.draw(&mut front);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syscall::{SharedBuffer, SimKernel};
    use viper_abi::draw::Color32;

    #[test]
    fn test_desktop_bands() {
        let mut px = vec![0u32; 100 * 80];
        let mut fb = DrawBuffer::new(&mut px, 100, 80, 100).unwrap();
        draw_desktop(&mut fb);
        assert_eq!(fb.get_pixel(0, 0), Some(COLOR_SCREEN_BORDER));
        assert_eq!(fb.get_pixel(99, 40), Some(COLOR_SCREEN_BORDER));
        assert_eq!(fb.get_pixel(50, 79), Some(COLOR_SCREEN_BORDER));
        assert_eq!(fb.get_pixel(50, 40), Some(COLOR_DESKTOP));
    }

    #[test]
    fn test_partial_buffer_fills_remainder() {
        let k = SimKernel::default();
        let mut buffer = SharedBuffer::create(&k, 10 * 10 * 4).unwrap();
        buffer.pixels_mut().fill(0xFF11_2233);
        let mut surf = Surface::new(1, 10, 10, buffer);
        surf.flags = viper_abi::window::SurfaceFlags::NO_DECORATIONS;
        surf.x = 5;
        surf.y = 5;
        // Mid resize: frame grew, buffer did not.
        surf.width = 16;
        surf.height = 14;

        let mut px = vec![0u32; 40 * 40];
        let mut fb = DrawBuffer::new(&mut px, 40, 40, 40).unwrap();
        draw_surface(&mut fb, &surf, false);
        assert_eq!(fb.get_pixel(5, 5), Some(Color32(0xFF11_2233)));
        assert_eq!(fb.get_pixel(14, 14), Some(Color32(0xFF11_2233)));
        assert_eq!(fb.get_pixel(18, 6), Some(COLOR_DESKTOP));
        assert_eq!(fb.get_pixel(6, 17), Some(COLOR_DESKTOP));
        assert_eq!(fb.get_pixel(25, 6), Some(Color32::BLACK));
        surf.buffer.release(&k);
    }
}
