//! Text rendering with the embedded 8x8 font.

use viper_abi::damage::DamageRect;
use viper_abi::draw::{Canvas, Color32};
use viper_abi::font::{FONT_HEIGHT, FONT_WIDTH, glyph, glyph_or_space};

#[inline]
fn cell_damage<T: Canvas>(target: &mut T, x: i32, y: i32, size: i32) -> Option<DamageRect> {
    let rect = DamageRect::from_xywh(x, y, size as u32, size as u32)
        .clip(target.width() as i32, target.height() as i32);
    if !rect.is_valid() {
        return None;
    }
    target.report_damage(rect);
    Some(rect)
}

/// Opaque glyph: set bits get `fg`, clear bits get `bg`. Characters outside
/// 32..=127 render as a space.
pub fn draw_char<T: Canvas>(
    target: &mut T,
    x: i32,
    y: i32,
    ch: u8,
    fg: Color32,
    bg: Color32,
) -> Option<DamageRect> {
    let rows = glyph_or_space(ch);
    for (row, &bits) in rows.iter().enumerate() {
        for col in 0..FONT_WIDTH {
            let color = if bits & (0x80 >> col) != 0 { fg } else { bg };
            target.put_pixel(x + col, y + row as i32, color);
        }
    }
    cell_damage(target, x, y, FONT_WIDTH)
}

/// Transparent glyph: only set bits are written.
pub fn draw_glyph<T: Canvas>(target: &mut T, x: i32, y: i32, ch: u8, fg: Color32) -> bool {
    let Some(rows) = glyph(ch) else {
        return false;
    };
    for (row, &bits) in rows.iter().enumerate() {
        for col in 0..FONT_WIDTH {
            if bits & (0x80 >> col) != 0 {
                target.put_pixel(x + col, y + row as i32, fg);
            }
        }
    }
    true
}

/// Draw a string left to right, leaving background pixels untouched.
/// Unprintable bytes are skipped and do not advance the pen.
pub fn draw_text<T: Canvas>(
    target: &mut T,
    x: i32,
    y: i32,
    text: &str,
    fg: Color32,
) -> Option<DamageRect> {
    let mut pen = x;
    for &ch in text.as_bytes() {
        if draw_glyph(target, pen, y, ch, fg) {
            pen += FONT_WIDTH;
        }
    }
    if pen == x {
        return None;
    }
    let rect = DamageRect::from_xywh(x, y, (pen - x) as u32, FONT_HEIGHT as u32)
        .clip(target.width() as i32, target.height() as i32);
    if !rect.is_valid() {
        return None;
    }
    target.report_damage(rect);
    Some(rect)
}

/// Nearest-neighbour scaled glyph. `scale` is in half units: 2 draws the
/// 8x8 cell, 3 draws 12x12, 4 draws 16x16.
pub fn draw_char_scaled<T: Canvas>(
    target: &mut T,
    x: i32,
    y: i32,
    ch: u8,
    fg: Color32,
    bg: Color32,
    scale: u32,
) -> Option<DamageRect> {
    if scale == 0 {
        return None;
    }
    let rows = glyph_or_space(ch);
    let size = (FONT_WIDTH as u32 * scale / 2) as i32;
    for dy in 0..size {
        let src_row = ((dy as u32 * 2 / scale) as usize).min(7);
        let bits = rows[src_row];
        for dx in 0..size {
            let src_col = (dx as u32 * 2 / scale).min(7);
            let color = if bits & (0x80 >> src_col) != 0 { fg } else { bg };
            target.put_pixel(x + dx, y + dy, color);
        }
    }
    cell_damage(target, x, y, size)
}
