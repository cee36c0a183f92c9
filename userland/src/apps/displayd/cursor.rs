//! Mouse pointer: a 24x24 arrow drawn over the front buffer, or uploaded to
//! the hardware cursor when the kernel offers one.

use viper_abi::draw::{Canvas, Color32};
use viper_gfx::DrawBuffer;
use viper_lib::{klog_debug, klog_info};

use crate::syscall::Kernel;
use crate::theme::{COLOR_CURSOR_FILL, COLOR_CURSOR_OUTLINE, CURSOR_SIZE};

const CURSOR_PIXELS: usize = CURSOR_SIZE * CURSOR_SIZE;

// '#' outline, 'o' fill, '.' transparent. Hotspot is the top-left pixel.
const CURSOR_BITMAP: [&[u8; CURSOR_SIZE]; CURSOR_SIZE] = [
    b"#.......................",
    b"##......................",
    b"#o#.....................",
    b"#oo#....................",
    b"#ooo#...................",
    b"#oooo#..................",
    b"#ooooo#.................",
    b"#oooooo#................",
    b"#ooooooo#...............",
    b"#oooooooo#..............",
    b"#ooooooooo#.............",
    b"#oooooooooo#............",
    b"#ooooooooooo#...........",
    b"#oooooooooooo#..........",
    b"#ooooooooooooo#.........",
    b"#oooooo########.........",
    b"#ooo#oo#................",
    b"#oo##oo#................",
    b"#o#..#oo#...............",
    b"##...#oo#...............",
    b"#.....#oo#..............",
    b"......#oo#..............",
    b".......#oo#.............",
    b".......###..............",
];

fn bitmap_color(col: usize, row: usize) -> Option<Color32> {
    match CURSOR_BITMAP[row][col] {
        b'#' => Some(COLOR_CURSOR_OUTLINE),
        b'o' => Some(COLOR_CURSOR_FILL),
        _ => None,
    }
}

/// XRGB image for hardware upload; transparent pixels are zero.
pub fn cursor_image() -> [u32; CURSOR_PIXELS] {
    let mut image = [0u32; CURSOR_PIXELS];
    for (i, px) in image.iter_mut().enumerate() {
        if let Some(color) = bitmap_color(i % CURSOR_SIZE, i / CURSOR_SIZE) {
            *px = color.to_u32();
        }
    }
    image
}

pub struct Cursor {
    x: i32,
    y: i32,
    saved: [u32; CURSOR_PIXELS],
    saved_at: Option<(i32, i32)>,
    software: bool,
}

impl Cursor {
    pub fn new(x: i32, y: i32) -> Self {
        Self {
            x,
            y,
            saved: [0; CURSOR_PIXELS],
            saved_at: None,
            software: true,
        }
    }

    #[inline]
    pub fn position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    /// False once the hardware cursor took over.
    #[inline]
    pub fn is_software(&self) -> bool {
        self.software
    }

    /// Try to hand the pointer to the hardware cursor.
    pub fn enable_hardware<K: Kernel>(&mut self, kernel: &K) -> bool {
        let image = cursor_image();
        let size = CURSOR_SIZE as u32;
        match kernel.set_cursor_image(&image, size, size, 0, 0) {
            Ok(()) => {
                self.software = false;
                let _ = kernel.move_hw_cursor(self.x, self.y);
                klog_info!("displayd: hardware cursor enabled");
                true
            }
            Err(err) => {
                klog_debug!("displayd: hardware cursor unavailable ({}), using software", err);
                false
            }
        }
    }

    /// Update the position; the hardware cursor follows immediately.
    pub fn move_to<K: Kernel>(&mut self, kernel: &K, x: i32, y: i32) {
        self.x = x;
        self.y = y;
        if !self.software {
            let _ = kernel.move_hw_cursor(x, y);
        }
    }

    /// Remember the pixels the cursor is about to cover.
    pub fn save_under(&mut self, front: &DrawBuffer<'_>) {
        if !self.software {
            return;
        }
        let size = CURSOR_SIZE as u32;
        front.read_rect(self.x, self.y, size, size, &mut self.saved);
        self.saved_at = Some((self.x, self.y));
    }

    /// Put back what `save_under` captured, wherever the cursor was then.
    pub fn restore_under(&mut self, front: &mut DrawBuffer<'_>) {
        let Some((x, y)) = self.saved_at.take() else {
            return;
        };
        let size = CURSOR_SIZE as u32;
        front.blit_from(&self.saved, size, size, CURSOR_SIZE, x, y);
    }

    /// Forget the saved tile; used after the front buffer was repainted.
    pub fn invalidate_saved(&mut self) {
        self.saved_at = None;
    }

    pub fn draw<T: Canvas>(&self, front: &mut T) {
        if !self.software {
            return;
        }
        for row in 0..CURSOR_SIZE {
            for col in 0..CURSOR_SIZE {
                if let Some(color) = bitmap_color(col, row) {
                    front.put_pixel(self.x + col as i32, self.y + row as i32, color);
                }
            }
        }
    }
}
