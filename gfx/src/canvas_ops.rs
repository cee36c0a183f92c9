use viper_abi::damage::DamageRect;
use viper_abi::draw::{Canvas, Color32};

#[inline]
fn emit<T: Canvas>(target: &mut T, damage: DamageRect) -> Option<DamageRect> {
    if !damage.is_valid() {
        return None;
    }
    target.report_damage(damage);
    Some(damage)
}

#[inline]
fn clipped<T: Canvas>(target: &T, x: i32, y: i32, w: i32, h: i32) -> DamageRect {
    if w <= 0 || h <= 0 {
        return DamageRect::invalid();
    }
    DamageRect::from_xywh(x, y, w as u32, h as u32)
        .clip(target.width() as i32, target.height() as i32)
}

pub fn fill_rect<T: Canvas>(
    target: &mut T,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    color: Color32,
) -> Option<DamageRect> {
    target.fill_rect(x, y, w, h, color);
    let damage = clipped(target, x, y, w, h);
    emit(target, damage)
}

/// One-pixel rectangle outline built from four lines.
pub fn rect<T: Canvas>(
    target: &mut T,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    color: Color32,
) -> Option<DamageRect> {
    if w <= 0 || h <= 0 {
        return None;
    }
    target.hline(x, x + w - 1, y, color);
    target.hline(x, x + w - 1, y + h - 1, color);
    target.vline(x, y, y + h - 1, color);
    target.vline(x + w - 1, y, y + h - 1, color);
    let damage = clipped(target, x, y, w, h);
    emit(target, damage)
}

pub fn hline<T: Canvas>(target: &mut T, x0: i32, x1: i32, y: i32, color: Color32) -> Option<DamageRect> {
    target.hline(x0, x1, y, color);
    let (lo, hi) = (x0.min(x1), x0.max(x1));
    let damage = clipped(target, lo, y, hi - lo + 1, 1);
    emit(target, damage)
}

pub fn vline<T: Canvas>(target: &mut T, x: i32, y0: i32, y1: i32, color: Color32) -> Option<DamageRect> {
    target.vline(x, y0, y1, color);
    let (lo, hi) = (y0.min(y1), y0.max(y1));
    let damage = clipped(target, x, lo, 1, hi - lo + 1);
    emit(target, damage)
}

/// Raised 3-D frame: `light` on the top and left edges, `dark` on the
/// bottom and right edges.
pub fn bevel<T: Canvas>(
    target: &mut T,
    x: i32,
    y: i32,
    w: i32,
    h: i32,
    light: Color32,
    dark: Color32,
) -> Option<DamageRect> {
    if w <= 0 || h <= 0 {
        return None;
    }
    target.hline(x, x + w - 1, y, light);
    target.vline(x, y, y + h - 1, light);
    target.hline(x, x + w - 1, y + h - 1, dark);
    target.vline(x + w - 1, y, y + h - 1, dark);
    let damage = clipped(target, x, y, w, h);
    emit(target, damage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DrawBuffer;

    #[test]
    fn test_rect_outline_leaves_interior() {
        let mut px = [0u32; 25];
        let mut buf = DrawBuffer::new(&mut px, 5, 5, 5).unwrap();
        let d = rect(&mut buf, 0, 0, 5, 5, Color32::WHITE);
        assert_eq!(d, Some(DamageRect::from_xywh(0, 0, 5, 5)));
        assert_eq!(buf.get_pixel(0, 4), Some(Color32::WHITE));
        assert_eq!(buf.get_pixel(4, 0), Some(Color32::WHITE));
        assert_eq!(buf.get_pixel(2, 2), Some(Color32::BLACK));
    }

    #[test]
    fn test_offscreen_fill_reports_nothing() {
        let mut px = [0u32; 16];
        let mut buf = DrawBuffer::new(&mut px, 4, 4, 4).unwrap();
        assert_eq!(fill_rect(&mut buf, -10, -10, 5, 5, Color32::WHITE), None);
        assert!(!buf.damage().is_dirty());
    }

    #[test]
    fn test_bevel_colours_edges() {
        let light = Color32(0xFFCCDDEE);
        let dark = Color32(0xFF334455);
        let mut px = [0u32; 16];
        let mut buf = DrawBuffer::new(&mut px, 4, 4, 4).unwrap();
        bevel(&mut buf, 0, 0, 4, 4, light, dark);
        assert_eq!(buf.get_pixel(1, 0), Some(light));
        assert_eq!(buf.get_pixel(0, 2), Some(light));
        assert_eq!(buf.get_pixel(2, 3), Some(dark));
        assert_eq!(buf.get_pixel(3, 1), Some(dark));
    }
}
